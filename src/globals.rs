//! Global shared resources
//!
//! This module provides singleton instances of expensive-to-create resources:
//! - HTTP client with connection pooling and compression, shared by the
//!   upstream fetcher (server side) and the API client (reader side)

use anyhow::Result;
use reqwest::Client;
use std::sync::OnceLock;
use std::time::Duration;

/// Global HTTP client - reuses connections across requests
static HTTP_CLIENT: OnceLock<Client> = OnceLock::new();

/// Get or create the global HTTP client
///
/// Features:
/// - Connection pooling (reuses TCP connections to the source host)
/// - Gzip/Brotli decompression
/// - TCP and HTTP/2 keepalive
/// - Proper User-Agent
///
/// No overall request timeout is configured; requests rely on the
/// transport defaults.
pub fn get_http_client() -> &'static Client {
    HTTP_CLIENT.get_or_init(|| {
        Client::builder()
            // Connection pooling
            .pool_max_idle_per_host(8)
            .pool_idle_timeout(Duration::from_secs(120))
            // TCP/HTTP keepalive
            .tcp_keepalive(Some(Duration::from_secs(60)))
            .http2_keep_alive_interval(Some(Duration::from_secs(30)))
            .http2_keep_alive_timeout(Duration::from_secs(10))
            // Compression
            .gzip(true)
            .brotli(true)
            .user_agent(concat!(
                "Mozilla/5.0 (compatible; ada-reader/",
                env!("CARGO_PKG_VERSION"),
                "; +https://github.com/user/ada-reader)"
            ))
            .build()
            .expect("Failed to create HTTP client")
    })
}

/// Initialize all global resources upfront
///
/// Call this at startup to avoid initialization delays during first use.
pub fn init_globals() -> Result<()> {
    let _ = get_http_client();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_http_client_singleton() {
        let client1 = get_http_client();
        let client2 = get_http_client();
        assert!(std::ptr::eq(client1, client2));
    }
}
