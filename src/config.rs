// src/config.rs
// Batch submission configuration and validation

use crate::format::{OutputFormat, SubtitleLayout};
use crate::provider::ProviderId;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

/// Default number of jobs allowed to run concurrently. Kept small to avoid
/// provider rate-limit storms.
pub const DEFAULT_CONCURRENCY: usize = 3;
/// Default per-call timeout for one provider request.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(300);

/// Rejected before any job is created; fatal to the whole submission.
#[derive(Debug, Error)]
pub enum ConfigurationError {
    #[error("no input files")]
    NoInputFiles,

    #[error("concurrency limit must be at least 1")]
    InvalidConcurrency,

    #[error("API key for provider '{0}' is missing")]
    MissingApiKey(ProviderId),

    #[error("unknown provider: {0}")]
    UnknownProvider(String),

    #[error("unknown output format: {0}")]
    UnknownOutputFormat(String),

    #[error("unknown proxy kind: {0}")]
    UnknownProxyKind(String),

    #[error("proxy host is empty")]
    EmptyProxyHost,

    #[error("proxy port is out of range")]
    InvalidProxyPort,

    #[error("proxy credentials are incomplete (username and password must be set together)")]
    PartialProxyCredentials,

    #[error("invalid proxy address: {0}")]
    InvalidProxyAddress(String),

    #[error("failed to build HTTP client: {0}")]
    ClientBuild(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProxyKind {
    None,
    Http,
    Socks5,
}

impl FromStr for ProxyKind {
    type Err = ConfigurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "none" => Ok(ProxyKind::None),
            "http" | "https" => Ok(ProxyKind::Http),
            "socks5" => Ok(ProxyKind::Socks5),
            other => Err(ConfigurationError::UnknownProxyKind(other.to_string())),
        }
    }
}

/// Outbound proxy settings, read-only for the lifetime of a batch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProxyConfig {
    pub kind: ProxyKind,
    pub host: String,
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
}

impl ProxyConfig {
    /// Direct connection, no proxy.
    pub fn direct() -> Self {
        Self {
            kind: ProxyKind::None,
            host: String::new(),
            port: 0,
            username: None,
            password: None,
        }
    }

    pub fn new(kind: ProxyKind, host: impl Into<String>, port: u16) -> Self {
        Self {
            kind,
            host: host.into(),
            port,
            username: None,
            password: None,
        }
    }

    pub fn with_credentials(
        mut self,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        self.username = Some(username.into());
        self.password = Some(password.into());
        self
    }

    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if self.kind == ProxyKind::None {
            return Ok(());
        }
        if self.host.trim().is_empty() {
            return Err(ConfigurationError::EmptyProxyHost);
        }
        if self.port == 0 {
            return Err(ConfigurationError::InvalidProxyPort);
        }
        if self.username.is_some() != self.password.is_some() {
            return Err(ConfigurationError::PartialProxyCredentials);
        }
        Ok(())
    }
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self::direct()
    }
}

/// Everything the orchestrator needs to run one batch. Immutable once
/// submitted; changing any of it means starting a new batch.
#[derive(Debug, Clone)]
pub struct BatchRequest {
    pub files: Vec<PathBuf>,
    pub provider: ProviderId,
    /// API key for the selected provider, supplied by the credential
    /// collaborator. Never persisted here.
    pub api_key: String,
    pub proxy: ProxyConfig,
    pub output_format: OutputFormat,
    /// Language hint passed to the provider; `None` means auto-detect.
    pub language: Option<String>,
    /// Provider model override; `None` uses the provider default.
    pub model: Option<String>,
    pub layout: SubtitleLayout,
    pub concurrency: usize,
    pub request_timeout: Duration,
}

impl BatchRequest {
    pub fn new(files: Vec<PathBuf>, provider: ProviderId, api_key: impl Into<String>) -> Self {
        Self {
            files,
            provider,
            api_key: api_key.into(),
            proxy: ProxyConfig::direct(),
            output_format: OutputFormat::Srt,
            language: None,
            model: None,
            layout: SubtitleLayout::default(),
            concurrency: DEFAULT_CONCURRENCY,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if self.files.is_empty() {
            return Err(ConfigurationError::NoInputFiles);
        }
        if self.concurrency == 0 {
            return Err(ConfigurationError::InvalidConcurrency);
        }
        if self.api_key.trim().is_empty() {
            return Err(ConfigurationError::MissingApiKey(self.provider));
        }
        self.proxy.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn direct_proxy_skips_address_checks() {
        assert!(ProxyConfig::direct().validate().is_ok());
    }

    #[test]
    fn empty_host_is_rejected() {
        let proxy = ProxyConfig::new(ProxyKind::Http, "  ", 8080);
        assert!(matches!(
            proxy.validate(),
            Err(ConfigurationError::EmptyProxyHost)
        ));
    }

    #[test]
    fn zero_port_is_rejected() {
        let proxy = ProxyConfig::new(ProxyKind::Socks5, "127.0.0.1", 0);
        assert!(matches!(
            proxy.validate(),
            Err(ConfigurationError::InvalidProxyPort)
        ));
    }

    #[test]
    fn partial_credentials_are_rejected() {
        let mut proxy = ProxyConfig::new(ProxyKind::Http, "proxy.local", 3128);
        proxy.username = Some("user".to_string());
        assert!(matches!(
            proxy.validate(),
            Err(ConfigurationError::PartialProxyCredentials)
        ));
    }

    #[test]
    fn full_credentials_pass() {
        let proxy =
            ProxyConfig::new(ProxyKind::Socks5, "proxy.local", 1080).with_credentials("u", "p");
        assert!(proxy.validate().is_ok());
    }

    #[test]
    fn proxy_kind_parses_known_values() {
        assert_eq!("none".parse::<ProxyKind>().unwrap(), ProxyKind::None);
        assert_eq!("HTTP".parse::<ProxyKind>().unwrap(), ProxyKind::Http);
        assert_eq!("socks5".parse::<ProxyKind>().unwrap(), ProxyKind::Socks5);
        assert!("socks4".parse::<ProxyKind>().is_err());
    }

    #[test]
    fn request_requires_api_key() {
        let request = BatchRequest::new(vec![PathBuf::from("a.mp3")], ProviderId::Groq, "");
        assert!(matches!(
            request.validate(),
            Err(ConfigurationError::MissingApiKey(ProviderId::Groq))
        ));
    }

    #[test]
    fn request_requires_files() {
        let request = BatchRequest::new(vec![], ProviderId::Groq, "gsk_test");
        assert!(matches!(
            request.validate(),
            Err(ConfigurationError::NoInputFiles)
        ));
    }
}
