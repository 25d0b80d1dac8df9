//! Native client configuration.
//!
//! [`ClientConfig`] carries the fields a store client is constructed from.
//! It is produced by the compatibility layer's configuration normalization
//! and handed to a [`StoreConnector`](crate::StoreConnector) unchanged.

use std::{path::PathBuf, time::Duration};

/// Protocol selector for the v3 API.
pub const PROTOCOL_V3: &str = "v3";

/// HTTP path prefix of the v3 gateway.
pub const API_PREFIX_V3: &str = "/v3";

/// Scheme prefix of a unix-socket proxy address.
pub const UNIX_SOCKET_SCHEME: &str = "unix:";

/// Default request timeout (30 seconds).
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Connection parameters for a store client.
///
/// Immutable once built; a new client is constructed for every change.
#[derive(Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Endpoint URLs.
    pub http_host: Vec<String>,
    /// Protocol selector, always [`PROTOCOL_V3`].
    pub protocol: String,
    /// Gateway path prefix, always [`API_PREFIX_V3`].
    pub api_prefix: String,
    /// Request timeout.
    pub timeout: Duration,
    /// Verify the server certificate chain.
    pub ssl_verify: bool,
    /// Client certificate for mutual TLS.
    pub ssl_cert_path: Option<PathBuf>,
    /// Client private key for mutual TLS.
    pub ssl_key_path: Option<PathBuf>,
    /// Server name sent during the TLS handshake.
    pub sni: Option<String>,
    /// User name for store authentication.
    pub user: Option<String>,
    /// Password for store authentication.
    pub password: Option<String>,
    /// Local proxy address (`unix:<path>`) requests are routed through.
    pub unix_socket_proxy: Option<String>,
}

impl ClientConfig {
    /// Returns the filesystem path of the proxy socket, if proxying is configured.
    #[must_use]
    pub fn proxy_socket_path(&self) -> Option<PathBuf> {
        self.unix_socket_proxy.as_deref().map(proxy_socket_path)
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            http_host: Vec::new(),
            protocol: PROTOCOL_V3.to_owned(),
            api_prefix: API_PREFIX_V3.to_owned(),
            timeout: DEFAULT_TIMEOUT,
            ssl_verify: true,
            ssl_cert_path: None,
            ssl_key_path: None,
            sni: None,
            user: None,
            password: None,
            unix_socket_proxy: None,
        }
    }
}

impl std::fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientConfig")
            .field("http_host", &self.http_host)
            .field("protocol", &self.protocol)
            .field("api_prefix", &self.api_prefix)
            .field("timeout", &self.timeout)
            .field("ssl_verify", &self.ssl_verify)
            .field("ssl_cert_path", &self.ssl_cert_path)
            .field("ssl_key_path", &self.ssl_key_path)
            .field("sni", &self.sni)
            .field("user", &self.user)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("unix_socket_proxy", &self.unix_socket_proxy)
            .finish()
    }
}

/// Strips the `unix:` scheme from a proxy address.
///
/// # Examples
///
/// ```
/// use std::path::PathBuf;
/// use etcd_compat_store::config::proxy_socket_path;
///
/// assert_eq!(
///     proxy_socket_path("unix:/usr/local/apisix/conf/config_listen.sock"),
///     PathBuf::from("/usr/local/apisix/conf/config_listen.sock"),
/// );
/// ```
#[must_use]
pub fn proxy_socket_path(address: &str) -> PathBuf {
    PathBuf::from(address.strip_prefix(UNIX_SOCKET_SCHEME).unwrap_or(address))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_select_v3_and_verify() {
        let config = ClientConfig::default();
        assert_eq!(config.protocol, PROTOCOL_V3);
        assert_eq!(config.api_prefix, API_PREFIX_V3);
        assert!(config.ssl_verify);
        assert_eq!(config.timeout, DEFAULT_TIMEOUT);
        assert!(config.proxy_socket_path().is_none());
    }

    #[test]
    fn debug_redacts_password() {
        let config = ClientConfig {
            user: Some("root".into()),
            password: Some("hunter2".into()),
            ..ClientConfig::default()
        };
        let rendered = format!("{config:?}");
        assert!(!rendered.contains("hunter2"));
        assert!(rendered.contains("<redacted>"));
    }

    #[test]
    fn proxy_path_without_scheme_is_kept() {
        assert_eq!(proxy_socket_path("/tmp/a.sock"), PathBuf::from("/tmp/a.sock"));
    }
}
