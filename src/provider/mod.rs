// src/provider/mod.rs
// Speech-to-text provider clients

mod deepgram;
mod groq;

pub use deepgram::DeepgramProvider;
pub use groq::GroqProvider;

use crate::config::ConfigurationError;
use crate::transcript::Transcript;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;
use thiserror::Error;

/// Per-job provider failure, classified so the orchestrator can decide
/// whether the job is worth one more attempt.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("authentication failed")]
    AuthFailed,

    #[error("rate limit exceeded")]
    RateLimited,

    #[error("quota exceeded")]
    QuotaExceeded,

    #[error("unsupported audio: {0}")]
    UnsupportedFormat(String),

    #[error("network failure: {0}")]
    NetworkFailure(String),

    #[error("provider error: {0}")]
    Unknown(String),
}

impl ProviderError {
    /// Eligible for the single automatic retry.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ProviderError::NetworkFailure(_) | ProviderError::RateLimited
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderId {
    Groq,
    Deepgram,
}

impl fmt::Display for ProviderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProviderId::Groq => write!(f, "groq"),
            ProviderId::Deepgram => write!(f, "deepgram"),
        }
    }
}

impl FromStr for ProviderId {
    type Err = ConfigurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "groq" => Ok(ProviderId::Groq),
            "deepgram" => Ok(ProviderId::Deepgram),
            other => Err(ConfigurationError::UnknownProvider(other.to_string())),
        }
    }
}

/// Sink for per-call progress updates, percentage in [0, 100]. Providers
/// report monotonically and never after `transcribe` returns.
pub type ProgressSink = dyn Fn(u8) + Send + Sync;

/// Unified provider capability: one audio file in, one canonical
/// transcript out.
#[async_trait]
pub trait SpeechProvider: Send + Sync {
    async fn transcribe(
        &self,
        path: &Path,
        language: Option<&str>,
        on_progress: &ProgressSink,
    ) -> Result<Transcript, ProviderError>;

    /// Human-readable provider name.
    fn name(&self) -> &str;
}

/// Provider factory. Adding a backend means adding a variant here, not
/// patching conditionals elsewhere.
pub fn create(
    id: ProviderId,
    api_key: String,
    client: reqwest::Client,
    model: Option<String>,
) -> Arc<dyn SpeechProvider> {
    match id {
        ProviderId::Groq => Arc::new(GroqProvider::new(api_key, client, model)),
        ProviderId::Deepgram => Arc::new(DeepgramProvider::new(api_key, client, model)),
    }
}

/// Progress checkpoints shared by the provider variants.
pub(crate) mod stage {
    pub const PREPARING: u8 = 10;
    pub const UPLOADING: u8 = 30;
    pub const PROCESSING: u8 = 50;
    pub const FORMATTING: u8 = 80;
}

/// Read the audio file to be uploaded. Files are sent to providers as-is;
/// an empty file is rejected before any network traffic.
pub(crate) async fn read_audio(path: &Path) -> Result<Vec<u8>, ProviderError> {
    let bytes = tokio::fs::read(path)
        .await
        .map_err(|e| ProviderError::Unknown(format!("cannot read {}: {}", path.display(), e)))?;
    if bytes.is_empty() {
        return Err(ProviderError::UnsupportedFormat(format!(
            "{} is empty",
            path.display()
        )));
    }
    Ok(bytes)
}

pub(crate) fn file_name_of(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "audio".to_string())
}

/// Map an HTTP error status to the provider error taxonomy.
pub(crate) fn classify_status(status: reqwest::StatusCode, body: &str) -> ProviderError {
    match status.as_u16() {
        401 | 403 => ProviderError::AuthFailed,
        429 => ProviderError::RateLimited,
        402 => ProviderError::QuotaExceeded,
        400 | 413 | 415 => ProviderError::UnsupportedFormat(truncate(body, 200)),
        _ => ProviderError::Unknown(format!("HTTP {}: {}", status, truncate(body, 200))),
    }
}

/// Map a reqwest transport error. Timeouts and connection problems are
/// retryable; response decoding problems are not.
pub(crate) fn classify_transport(err: reqwest::Error) -> ProviderError {
    if err.is_timeout() || err.is_connect() || err.is_request() {
        ProviderError::NetworkFailure(err.to_string())
    } else {
        ProviderError::Unknown(err.to_string())
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        s.chars().take(max).collect()
    }
}
