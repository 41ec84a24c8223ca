//! Per-call request for [`WebsocketBridge::send`](crate::WebsocketBridge::send).
//!
//! Provides a fluent API mirroring the parameters of a synchronous HTTP
//! adapter call: URL, headers, timeout hint, TLS settings and proxies.
//!
//! # Example
//!
//! ```
//! use std::time::Duration;
//! use wsbridge::{BridgeRequest, ProxyConfig};
//!
//! let request = BridgeRequest::new("wss://echo.example.com/ws")
//!     .header("Authorization", "Bearer token")
//!     .timeout(Duration::from_secs(5))
//!     .proxy(ProxyConfig::socks5("127.0.0.1", 1080))
//!     .insecure();
//!
//! assert_eq!(request.headers.len(), 1);
//! assert!(!request.tls.verify);
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::path::PathBuf;
use std::time::Duration;

use crate::transport::{ProxyConfig, TlsCredential, TlsOptions};

// ============================================================================
// BridgeRequest
// ============================================================================

/// Everything needed to open one session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BridgeRequest {
    /// Target URL, `ws://` or `wss://`.
    pub url: String,
    /// Extra handshake headers, in order.
    pub headers: Vec<(String, String)>,
    /// Connect timeout; the bridge default applies when unset.
    pub timeout: Option<Duration>,
    /// TLS settings for `wss://` targets.
    pub tls: TlsOptions,
    /// Proxies; only the first one is used.
    pub proxies: Vec<ProxyConfig>,
}

impl BridgeRequest {
    /// Creates a request for `url` with default settings.
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            headers: Vec::new(),
            timeout: None,
            tls: TlsOptions::default(),
            proxies: Vec::new(),
        }
    }

    /// Appends a handshake header.
    #[inline]
    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Appends several handshake headers.
    #[must_use]
    pub fn headers<I, N, V>(mut self, headers: I) -> Self
    where
        I: IntoIterator<Item = (N, V)>,
        N: Into<String>,
        V: Into<String>,
    {
        self.headers
            .extend(headers.into_iter().map(|(name, value)| (name.into(), value.into())));
        self
    }

    /// Sets the connect timeout.
    #[inline]
    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Replaces the TLS settings.
    #[inline]
    #[must_use]
    pub fn tls(mut self, tls: TlsOptions) -> Self {
        self.tls = tls;
        self
    }

    /// Disables server certificate and host name verification.
    #[inline]
    #[must_use]
    pub fn insecure(mut self) -> Self {
        self.tls.verify = false;
        self
    }

    /// Presents a client certificate from one PEM file holding both the
    /// certificate chain and the key.
    #[inline]
    #[must_use]
    pub fn client_cert(mut self, path: impl Into<PathBuf>) -> Self {
        self.tls.credential = Some(TlsCredential::CertPath(path.into()));
        self
    }

    /// Presents a client certificate from separate certificate and key
    /// files.
    #[must_use]
    pub fn client_cert_bundle(
        mut self,
        cert_file: impl Into<PathBuf>,
        key_file: impl Into<PathBuf>,
        key_password: Option<String>,
    ) -> Self {
        self.tls.credential = Some(TlsCredential::Bundle {
            cert_file: cert_file.into(),
            key_file: key_file.into(),
            key_password,
        });
        self
    }

    /// Appends a proxy.
    #[inline]
    #[must_use]
    pub fn proxy(mut self, proxy: ProxyConfig) -> Self {
        self.proxies.push(proxy);
        self
    }

    /// Appends several proxies.
    #[must_use]
    pub fn proxies(mut self, proxies: impl IntoIterator<Item = ProxyConfig>) -> Self {
        self.proxies.extend(proxies);
        self
    }

    /// Returns the connect timeout, falling back to `default`.
    #[inline]
    #[must_use]
    pub fn effective_timeout(&self, default: Duration) -> Duration {
        self.timeout.unwrap_or(default)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let request = BridgeRequest::new("ws://localhost:8000");
        assert!(request.headers.is_empty());
        assert!(request.proxies.is_empty());
        assert!(request.tls.is_default());
        assert_eq!(
            request.effective_timeout(Duration::from_secs(10)),
            Duration::from_secs(10)
        );
    }

    #[test]
    fn test_headers_keep_order() {
        let request = BridgeRequest::new("ws://localhost")
            .header("X-First", "1")
            .headers([("X-Second", "2"), ("X-Third", "3")]);
        let names: Vec<_> = request.headers.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, ["X-First", "X-Second", "X-Third"]);
    }

    #[test]
    fn test_client_cert_bundle() {
        let request = BridgeRequest::new("wss://localhost").client_cert_bundle(
            "cert.pem",
            "key.pem",
            Some("secret".to_string()),
        );
        assert!(matches!(
            request.tls.credential,
            Some(TlsCredential::Bundle { ref key_password, .. }) if key_password.as_deref() == Some("secret")
        ));
    }

    #[test]
    fn test_timeout_override() {
        let request = BridgeRequest::new("ws://localhost").timeout(Duration::from_millis(250));
        assert_eq!(
            request.effective_timeout(Duration::from_secs(10)),
            Duration::from_millis(250)
        );
    }
}
