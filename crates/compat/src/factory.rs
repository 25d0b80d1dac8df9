//! Store client construction.
//!
//! [`ClientFactory`] turns the local `etcd` configuration into a native
//! [`ClientConfig`], asks a [`StoreConnector`] for a session, and wraps it in
//! [`GatedStoreOperations`]. The result is a [`ClientHandle`] tagged with the
//! configured key prefix.

use std::{
    path::{Path, PathBuf},
    sync::Arc,
    time::Duration,
};

use etcd_compat_store::{
    ClientConfig, StoreClient, StoreConnector,
    config::{UNIX_SOCKET_SCHEME, proxy_socket_path},
};

use crate::{
    config::{ConfigSource, DeploymentRole, LocalConfig},
    error::Result,
    gate::WriteGate,
    gated::GatedStoreOperations,
};

/// Endpoint used when requests are routed through the local config server.
pub const PROXY_HOST: &str = "http://127.0.0.1:2379";

/// Location of the config server socket, relative to the runtime directory.
pub const PROXY_SOCKET: &str = "conf/config_listen.sock";

/// Which request-serving subsystem the process runs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Subsystem {
    /// HTTP proxy; may route through the local config server.
    #[default]
    Http,
    /// Stream (L4) proxy; always connects directly.
    Stream,
}

/// How a client reaches the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Routing {
    /// Through the local config server when the role allows it.
    Proxied,
    /// Straight to the configured endpoints.
    Direct,
}

/// An open store session plus the key prefix it was built with.
#[derive(Clone)]
pub struct ClientHandle {
    client: Arc<dyn StoreClient>,
    prefix: Arc<str>,
}

impl ClientHandle {
    /// Pairs `client` with `prefix`.
    #[must_use]
    pub fn new(client: Arc<dyn StoreClient>, prefix: impl Into<Arc<str>>) -> Self {
        Self { client, prefix: prefix.into() }
    }

    /// Returns the session.
    #[must_use]
    pub fn client(&self) -> &Arc<dyn StoreClient> {
        &self.client
    }

    /// Returns the key prefix.
    #[must_use]
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Prepends the prefix to `key`.
    #[must_use]
    pub fn full_key(&self, key: &str) -> String {
        format!("{}{key}", self.prefix)
    }

    /// Returns the proxy socket path the session routes through, if any.
    #[must_use]
    pub fn proxy_socket_path(&self) -> Option<PathBuf> {
        self.client.unix_socket_proxy().map(proxy_socket_path)
    }

    /// Returns `true` if both handles share one session.
    #[must_use]
    pub fn same_session(&self, other: &ClientHandle) -> bool {
        Arc::ptr_eq(&self.client, &other.client)
    }
}

impl std::fmt::Debug for ClientHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientHandle")
            .field("prefix", &self.prefix)
            .field("unix_socket_proxy", &self.client.unix_socket_proxy())
            .finish()
    }
}

/// Maps the local configuration onto native client fields.
///
/// Returns the client configuration and the key prefix. With
/// [`Routing::Proxied`], a traditional node running the HTTP subsystem is
/// pointed at the config server socket under `runtime_dir`.
#[must_use]
pub fn normalize(
    config: &LocalConfig,
    routing: Routing,
    subsystem: Subsystem,
    runtime_dir: &Path,
) -> (ClientConfig, String) {
    let etcd = config.etcd();
    let tls = etcd.tls().cloned().unwrap_or_default();

    let mut client = ClientConfig {
        http_host: etcd.host().to_vec(),
        timeout: etcd.timeout(),
        ssl_verify: tls.verify != Some(false),
        ssl_key_path: tls.cert.as_ref().and(tls.key.clone()),
        ssl_cert_path: tls.cert,
        sni: tls.sni,
        user: etcd.user().map(str::to_owned),
        password: etcd.password().map(str::to_owned),
        ..ClientConfig::default()
    };

    if routing == Routing::Proxied
        && config.role() == DeploymentRole::Traditional
        && subsystem == Subsystem::Http
    {
        let socket = runtime_dir.join(PROXY_SOCKET);
        client.unix_socket_proxy = Some(format!("{UNIX_SOCKET_SCHEME}{}", socket.display()));
        client.http_host = vec![PROXY_HOST.to_owned()];
    }

    (client, etcd.prefix().to_owned())
}

/// Builds gated store clients from the current local configuration.
#[derive(Clone)]
pub struct ClientFactory {
    connector: Arc<dyn StoreConnector>,
    source: Arc<dyn ConfigSource>,
    runtime_dir: PathBuf,
    subsystem: Subsystem,
}

#[bon::bon]
impl ClientFactory {
    /// Creates a factory.
    ///
    /// `runtime_dir` is the process working directory under which the
    /// config server socket lives.
    #[builder]
    pub fn new(
        connector: Arc<dyn StoreConnector>,
        source: Arc<dyn ConfigSource>,
        #[builder(into)] runtime_dir: PathBuf,
        #[builder(default)] subsystem: Subsystem,
    ) -> Self {
        Self { connector, source, runtime_dir, subsystem }
    }

    /// Returns the configuration source shared with the write gate.
    #[must_use]
    pub fn source(&self) -> &Arc<dyn ConfigSource> {
        &self.source
    }

    /// Builds a client with the configured timeout.
    ///
    /// # Errors
    ///
    /// Returns [`CompatError::Config`](crate::CompatError::Config) if the
    /// configuration cannot be loaded, the connector's error if the session
    /// cannot be opened, or
    /// [`CompatError::MissingOperation`](crate::CompatError::MissingOperation)
    /// if the session cannot be gated.
    pub async fn build(&self, routing: Routing) -> Result<ClientHandle> {
        self.build_with_timeout(routing, None).await
    }

    /// Builds a client, overriding the configured timeout when `timeout` is set.
    ///
    /// # Errors
    ///
    /// See [`build`](Self::build).
    #[tracing::instrument(skip(self))]
    pub async fn build_with_timeout(
        &self,
        routing: Routing,
        timeout: Option<Duration>,
    ) -> Result<ClientHandle> {
        let local = self.source.load()?;
        let (mut config, prefix) = normalize(&local, routing, self.subsystem, &self.runtime_dir);
        if let Some(timeout) = timeout {
            config.timeout = timeout;
        }

        let client = self.connector.connect(&config).await?;
        let gated = GatedStoreOperations::new(client, WriteGate::new(Arc::clone(&self.source)))?;
        Ok(ClientHandle::new(Arc::new(gated), prefix))
    }
}

impl std::fmt::Debug for ClientFactory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientFactory")
            .field("runtime_dir", &self.runtime_dir)
            .field("subsystem", &self.subsystem)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use etcd_compat_store::{MemoryConnector, MemoryStore, StoreError};
    use rstest::rstest;

    use super::*;
    use crate::{
        config::{EtcdSection, StaticConfig, TlsSection},
        error::CompatError,
    };

    fn local(role: DeploymentRole, tls: Option<TlsSection>) -> LocalConfig {
        let etcd = EtcdSection::builder()
            .host(vec!["https://etcd-0:2379", "https://etcd-1:2379"])
            .prefix("/apisix")
            .timeout(Duration::from_secs(7))
            .user("root")
            .password("pw")
            .maybe_tls(tls)
            .build()
            .unwrap();
        LocalConfig::new(etcd, role)
    }

    #[test]
    fn normalize_forces_v3_and_splits_prefix() {
        let (config, prefix) = normalize(
            &local(DeploymentRole::ControlPlane, None),
            Routing::Proxied,
            Subsystem::Http,
            Path::new("/usr/local/apisix"),
        );
        assert_eq!(prefix, "/apisix");
        assert_eq!(config.protocol, "v3");
        assert_eq!(config.api_prefix, "/v3");
        assert_eq!(config.http_host, ["https://etcd-0:2379", "https://etcd-1:2379"]);
        assert_eq!(config.timeout, Duration::from_secs(7));
        assert!(config.ssl_verify);
        assert_eq!(config.user.as_deref(), Some("root"));
        assert!(config.unix_socket_proxy.is_none());
    }

    #[test]
    fn normalize_maps_tls_block() {
        let tls = TlsSection {
            cert: Some("/certs/client.crt".into()),
            key: Some("/certs/client.key".into()),
            verify: Some(false),
            sni: Some("etcd.internal".into()),
        };
        let (config, _) = normalize(
            &local(DeploymentRole::ControlPlane, Some(tls)),
            Routing::Direct,
            Subsystem::Http,
            Path::new("/"),
        );
        assert!(!config.ssl_verify);
        assert_eq!(config.ssl_cert_path, Some(PathBuf::from("/certs/client.crt")));
        assert_eq!(config.ssl_key_path, Some(PathBuf::from("/certs/client.key")));
        assert_eq!(config.sni.as_deref(), Some("etcd.internal"));
    }

    #[test]
    fn normalize_ignores_key_without_cert() {
        let tls = TlsSection { key: Some("/certs/client.key".into()), ..TlsSection::default() };
        let (config, _) = normalize(
            &local(DeploymentRole::ControlPlane, Some(tls)),
            Routing::Direct,
            Subsystem::Http,
            Path::new("/"),
        );
        assert!(config.ssl_cert_path.is_none());
        assert!(config.ssl_key_path.is_none());
        assert!(config.ssl_verify);
    }

    #[rstest]
    #[case::traditional_http(DeploymentRole::Traditional, Routing::Proxied, Subsystem::Http, true)]
    #[case::traditional_direct(DeploymentRole::Traditional, Routing::Direct, Subsystem::Http, false)]
    #[case::traditional_stream(DeploymentRole::Traditional, Routing::Proxied, Subsystem::Stream, false)]
    #[case::control_plane(DeploymentRole::ControlPlane, Routing::Proxied, Subsystem::Http, false)]
    #[case::data_plane(DeploymentRole::DataPlane, Routing::Proxied, Subsystem::Http, false)]
    fn proxy_routing_rules(
        #[case] role: DeploymentRole,
        #[case] routing: Routing,
        #[case] subsystem: Subsystem,
        #[case] proxied: bool,
    ) {
        let (config, _) =
            normalize(&local(role, None), routing, subsystem, Path::new("/usr/local/apisix"));
        if proxied {
            assert_eq!(
                config.unix_socket_proxy.as_deref(),
                Some("unix:/usr/local/apisix/conf/config_listen.sock")
            );
            assert_eq!(config.http_host, [PROXY_HOST]);
        } else {
            assert!(config.unix_socket_proxy.is_none());
            assert_eq!(config.http_host.len(), 2);
        }
    }

    #[tokio::test]
    async fn build_returns_gated_handle_with_prefix() {
        let connector = MemoryConnector::new(MemoryStore::new());
        let factory = ClientFactory::builder()
            .connector(Arc::new(connector.clone()))
            .source(Arc::new(StaticConfig::new(local(DeploymentRole::Traditional, None))))
            .runtime_dir("/usr/local/apisix")
            .build();

        let handle = factory.build(Routing::Proxied).await.unwrap();
        assert_eq!(handle.prefix(), "/apisix");
        assert_eq!(handle.full_key("/routes/1"), "/apisix/routes/1");
        assert_eq!(
            handle.proxy_socket_path(),
            Some(PathBuf::from("/usr/local/apisix/conf/config_listen.sock"))
        );

        let direct = factory.build_with_timeout(Routing::Direct, Some(Duration::from_secs(1))).await;
        assert!(direct.unwrap().proxy_socket_path().is_none());
        assert_eq!(connector.connections()[1].timeout, Duration::from_secs(1));
    }

    #[tokio::test]
    async fn build_propagates_connector_error() {
        let connector = MemoryConnector::new(MemoryStore::new());
        connector.fail_with(StoreError::connection("connection refused"));
        let factory = ClientFactory::builder()
            .connector(Arc::new(connector))
            .source(Arc::new(StaticConfig::new(local(DeploymentRole::Traditional, None))))
            .runtime_dir("/tmp")
            .build();

        let err = factory.build(Routing::Direct).await.unwrap_err();
        assert!(matches!(err, CompatError::Store(StoreError::Connection { .. })));
        assert_eq!(err.to_string(), "Connection error: connection refused");
    }
}
