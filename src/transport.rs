// src/transport.rs
// Outbound HTTP client construction, optionally routed through a proxy

use crate::config::{ConfigurationError, ProxyConfig, ProxyKind};
use reqwest::{Client, Proxy};
use std::time::Duration;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(20);

/// Build the HTTP client shared by every worker in a batch. Pure
/// construction; no network traffic happens here.
pub fn build_client(
    proxy: &ProxyConfig,
    request_timeout: Duration,
) -> Result<Client, ConfigurationError> {
    proxy.validate()?;

    let mut builder = Client::builder()
        .timeout(request_timeout)
        .connect_timeout(CONNECT_TIMEOUT);

    if let Some(url) = proxy_url(proxy) {
        let mut p = Proxy::all(url.as_str())
            .map_err(|e| ConfigurationError::InvalidProxyAddress(e.to_string()))?;
        if let (Some(user), Some(pass)) = (&proxy.username, &proxy.password) {
            p = p.basic_auth(user, pass);
        }
        builder = builder.proxy(p);
        tracing::info!("transport: proxying through {}", url);
    }

    builder
        .build()
        .map_err(|e| ConfigurationError::ClientBuild(e.to_string()))
}

/// Proxy URL for reqwest. `socks5h` so hostname resolution also happens on
/// the proxy side.
fn proxy_url(proxy: &ProxyConfig) -> Option<String> {
    match proxy.kind {
        ProxyKind::None => None,
        ProxyKind::Http => Some(format!("http://{}:{}", proxy.host, proxy.port)),
        ProxyKind::Socks5 => Some(format!("socks5h://{}:{}", proxy.host, proxy.port)),
    }
}
