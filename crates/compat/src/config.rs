//! Local process configuration.
//!
//! [`LocalConfig`] is the slice of the process configuration this crate
//! reads: the `etcd` connection section and the deployment role. It is
//! obtained through a [`ConfigSource`] on every use so that role changes and
//! unreadable configuration are observed by the next decision.
//!
//! # Example
//!
//! ```
//! use etcd_compat::config::{DeploymentRole, EtcdSection, LocalConfig};
//!
//! let etcd = EtcdSection::builder()
//!     .host(vec!["http://127.0.0.1:2379"])
//!     .prefix("/apisix")
//!     .build()?;
//! let config = LocalConfig::new(etcd, DeploymentRole::Traditional);
//! assert_eq!(config.etcd().prefix(), "/apisix");
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use std::{
    fmt,
    path::{Path, PathBuf},
    sync::Arc,
    time::Duration,
};

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default key prefix.
pub const DEFAULT_PREFIX: &str = "/apisix";

/// Default request timeout (30 seconds).
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Configuration loading and validation failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("failed to read configuration file {}: {message}", path.display())]
    Read {
        /// File that was read.
        path: PathBuf,
        /// Underlying I/O failure.
        message: String,
    },

    /// The configuration could not be decoded.
    #[error("failed to parse configuration: {0}")]
    Parse(String),

    /// A field failed validation.
    #[error("invalid configuration: {0}")]
    Invalid(String),

    /// The source has no configuration to offer.
    #[error("configuration unavailable: {0}")]
    Unavailable(String),
}

/// Deployment role of the running node.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeploymentRole {
    /// Serves traffic and administers configuration.
    #[default]
    Traditional,
    /// Administers configuration only.
    ControlPlane,
    /// Serves traffic only.
    DataPlane,
}

impl DeploymentRole {
    /// Returns the configuration spelling of the role.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Traditional => "traditional",
            Self::ControlPlane => "control_plane",
            Self::DataPlane => "data_plane",
        }
    }
}

impl fmt::Display for DeploymentRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// TLS block of the `etcd` section.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TlsSection {
    /// Client certificate path.
    #[serde(default)]
    pub cert: Option<PathBuf>,
    /// Client private key path. Ignored without `cert`.
    #[serde(default)]
    pub key: Option<PathBuf>,
    /// Set to `false` to skip server certificate verification.
    #[serde(default)]
    pub verify: Option<bool>,
    /// Server name for the TLS handshake.
    #[serde(default)]
    pub sni: Option<String>,
}

/// The `etcd` section of the local configuration.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EtcdSection {
    /// Endpoint URLs.
    pub(crate) host: Vec<String>,

    /// Prefix prepended to every key.
    #[serde(default = "default_prefix")]
    pub(crate) prefix: String,

    /// Request timeout.
    #[serde(with = "humantime_serde", default = "default_timeout")]
    pub(crate) timeout: Duration,

    /// User name for store authentication.
    #[serde(default)]
    pub(crate) user: Option<String>,

    /// Password for store authentication.
    #[serde(default)]
    pub(crate) password: Option<String>,

    /// TLS settings.
    #[serde(default)]
    pub(crate) tls: Option<TlsSection>,
}

fn default_prefix() -> String {
    DEFAULT_PREFIX.to_owned()
}

fn default_timeout() -> Duration {
    DEFAULT_TIMEOUT
}

#[bon::bon]
impl EtcdSection {
    /// Creates a new section, validating all fields.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] if:
    /// - No hosts are provided
    /// - The prefix is non-empty and does not start with `/`
    /// - The timeout is zero
    #[builder]
    pub fn new(
        #[builder(with = |iter: impl IntoIterator<Item = impl Into<String>>| {
            iter.into_iter().map(Into::into).collect()
        })]
        host: Vec<String>,
        #[builder(into, default = default_prefix())] prefix: String,
        #[builder(default = DEFAULT_TIMEOUT)] timeout: Duration,
        #[builder(into)] user: Option<String>,
        #[builder(into)] password: Option<String>,
        tls: Option<TlsSection>,
    ) -> Result<Self, ConfigError> {
        let section = Self { host, prefix, timeout, user, password, tls };
        section.validate()?;
        Ok(section)
    }

    /// Checks invariants that deserialization cannot express.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] describing the first violation.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.host.is_empty() {
            return Err(ConfigError::Invalid("etcd.host requires at least one endpoint".into()));
        }
        if !self.prefix.is_empty() && !self.prefix.starts_with('/') {
            return Err(ConfigError::Invalid(format!(
                "etcd.prefix must start with '/', got {:?}",
                self.prefix
            )));
        }
        if self.timeout.is_zero() {
            return Err(ConfigError::Invalid("etcd.timeout must be non-zero".into()));
        }
        Ok(())
    }

    /// Returns the endpoint URLs.
    #[must_use]
    pub fn host(&self) -> &[String] {
        &self.host
    }

    /// Returns the key prefix.
    #[must_use]
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Returns the request timeout.
    #[must_use]
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Returns the user name, if any.
    #[must_use]
    pub fn user(&self) -> Option<&str> {
        self.user.as_deref()
    }

    /// Returns the password, if any.
    #[must_use]
    pub fn password(&self) -> Option<&str> {
        self.password.as_deref()
    }

    /// Returns the TLS block, if any.
    #[must_use]
    pub fn tls(&self) -> Option<&TlsSection> {
        self.tls.as_ref()
    }
}

impl fmt::Debug for EtcdSection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EtcdSection")
            .field("host", &self.host)
            .field("prefix", &self.prefix)
            .field("timeout", &self.timeout)
            .field("user", &self.user)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("tls", &self.tls)
            .finish()
    }
}

/// The `deployment` section of the local configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DeploymentSection {
    /// Role of this node.
    #[serde(default)]
    pub role: DeploymentRole,
}

/// The configuration this crate consumes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LocalConfig {
    etcd: EtcdSection,
    #[serde(default)]
    deployment: DeploymentSection,
}

impl LocalConfig {
    /// Creates a configuration from its sections.
    #[must_use]
    pub fn new(etcd: EtcdSection, role: DeploymentRole) -> Self {
        Self { etcd, deployment: DeploymentSection { role } }
    }

    /// Decodes and validates a JSON document.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] for malformed JSON or unknown fields,
    /// and [`ConfigError::Invalid`] when validation fails.
    pub fn from_json(raw: &str) -> Result<Self, ConfigError> {
        let config: Self =
            serde_json::from_str(raw).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.etcd.validate()?;
        Ok(config)
    }

    /// Returns the `etcd` section.
    #[must_use]
    pub fn etcd(&self) -> &EtcdSection {
        &self.etcd
    }

    /// Returns the deployment role.
    #[must_use]
    pub fn role(&self) -> DeploymentRole {
        self.deployment.role
    }
}

/// Supplies the current local configuration.
///
/// Implementations are consulted on every write authorization and every
/// client construction; they must not cache failures.
pub trait ConfigSource: Send + Sync {
    /// Returns the current configuration.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] when the configuration cannot be produced.
    fn load(&self) -> Result<Arc<LocalConfig>, ConfigError>;
}

/// A fixed configuration.
#[derive(Debug, Clone)]
pub struct StaticConfig(Arc<LocalConfig>);

impl StaticConfig {
    /// Wraps `config`.
    #[must_use]
    pub fn new(config: LocalConfig) -> Self {
        Self(Arc::new(config))
    }
}

impl ConfigSource for StaticConfig {
    fn load(&self) -> Result<Arc<LocalConfig>, ConfigError> {
        Ok(Arc::clone(&self.0))
    }
}

/// A JSON file re-read on every load.
#[derive(Debug, Clone)]
pub struct JsonFileConfig {
    path: PathBuf,
}

impl JsonFileConfig {
    /// Reads configuration from `path`.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Returns the file path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ConfigSource for JsonFileConfig {
    fn load(&self) -> Result<Arc<LocalConfig>, ConfigError> {
        let raw = std::fs::read_to_string(&self.path)
            .map_err(|e| ConfigError::Read { path: self.path.clone(), message: e.to_string() })?;
        LocalConfig::from_json(&raw).map(Arc::new)
    }
}

/// A configuration that can be replaced or made unavailable at runtime.
#[derive(Debug)]
pub struct SharedConfig {
    current: RwLock<Result<Arc<LocalConfig>, ConfigError>>,
}

impl SharedConfig {
    /// Starts with `config`.
    #[must_use]
    pub fn new(config: LocalConfig) -> Self {
        Self { current: RwLock::new(Ok(Arc::new(config))) }
    }

    /// Replaces the configuration.
    pub fn set(&self, config: LocalConfig) {
        *self.current.write() = Ok(Arc::new(config));
    }

    /// Makes every following load fail with `error`.
    pub fn fail(&self, error: ConfigError) {
        *self.current.write() = Err(error);
    }
}

impl ConfigSource for SharedConfig {
    fn load(&self) -> Result<Arc<LocalConfig>, ConfigError> {
        self.current.read().clone()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use std::io::Write;

    use super::*;

    fn section() -> EtcdSection {
        EtcdSection::builder().host(vec!["http://127.0.0.1:2379"]).build().unwrap()
    }

    #[test]
    fn test_builder_defaults() {
        let etcd = section();
        assert_eq!(etcd.prefix(), DEFAULT_PREFIX);
        assert_eq!(etcd.timeout(), Duration::from_secs(30));
        assert!(etcd.tls().is_none());
    }

    #[test]
    fn test_validation_empty_hosts() {
        let result = EtcdSection::builder().host(Vec::<String>::new()).build();
        assert!(matches!(result, Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_validation_relative_prefix() {
        let result = EtcdSection::builder().host(vec!["http://a:2379"]).prefix("apisix").build();
        assert!(matches!(result, Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_empty_prefix_is_allowed() {
        let etcd = EtcdSection::builder().host(vec!["http://a:2379"]).prefix("").build().unwrap();
        assert_eq!(etcd.prefix(), "");
    }

    #[test]
    fn test_debug_redacts_password() {
        let etcd = EtcdSection::builder()
            .host(vec!["http://a:2379"])
            .user("root")
            .password("s3cret")
            .build()
            .unwrap();
        assert!(!format!("{etcd:?}").contains("s3cret"));
    }

    #[test]
    fn test_from_json_with_humantime_timeout() {
        let config = LocalConfig::from_json(
            r#"{
                "etcd": {
                    "host": ["https://etcd-0:2379"],
                    "timeout": "5s",
                    "tls": { "verify": false, "sni": "etcd.local" }
                },
                "deployment": { "role": "data_plane" }
            }"#,
        )
        .unwrap();

        assert_eq!(config.role(), DeploymentRole::DataPlane);
        assert_eq!(config.etcd().timeout(), Duration::from_secs(5));
        assert_eq!(config.etcd().prefix(), DEFAULT_PREFIX);
        assert_eq!(config.etcd().tls().and_then(|t| t.verify), Some(false));
    }

    #[test]
    fn test_from_json_rejects_unknown_fields() {
        let result = LocalConfig::from_json(r#"{"etcd": {"host": ["h"], "hosts": []}}"#);
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_missing_deployment_defaults_to_traditional() {
        let config = LocalConfig::from_json(r#"{"etcd": {"host": ["http://h:2379"]}}"#).unwrap();
        assert_eq!(config.role(), DeploymentRole::Traditional);
    }

    #[test]
    fn test_json_file_is_reread_on_every_load() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"etcd": {{"host": ["http://h:2379"]}}}}"#).unwrap();
        let source = JsonFileConfig::new(file.path());
        assert_eq!(source.load().unwrap().role(), DeploymentRole::Traditional);

        std::fs::write(
            file.path(),
            r#"{"etcd": {"host": ["http://h:2379"]}, "deployment": {"role": "control_plane"}}"#,
        )
        .unwrap();
        assert_eq!(source.load().unwrap().role(), DeploymentRole::ControlPlane);
    }

    #[test]
    fn test_missing_file_is_read_error() {
        let source = JsonFileConfig::new("/nonexistent/config.json");
        let err = source.load().unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
        assert!(err.to_string().contains("/nonexistent/config.json"));
    }

    #[test]
    fn test_shared_config_can_fail_and_recover() {
        let shared = SharedConfig::new(LocalConfig::new(section(), DeploymentRole::Traditional));
        shared.fail(ConfigError::Unavailable("reloading".into()));
        assert!(shared.load().is_err());

        shared.set(LocalConfig::new(section(), DeploymentRole::DataPlane));
        assert_eq!(shared.load().unwrap().role(), DeploymentRole::DataPlane);
    }
}
