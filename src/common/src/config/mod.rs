use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};

use once_cell::sync::OnceCell;

use crate::keyspace::KeyspaceName;

pub static CONFIG: OnceCell<Configuration> = OnceCell::new();

/// File consulted by [`Configuration::load`] in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "keymeter.toml";

/// Prefix of environment variables overriding configuration values.
pub const ENV_PREFIX: &str = "KEYMETER__";

/// Storage backend the process runs against.
///
/// Parsed case-insensitively from [`Configuration::store`]. Only the
/// [`StoreBackend::Cluster`] backend is keyspace-aware.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StoreBackend {
    /// Distributed cluster backed by the metadata service.
    Cluster,
    /// Local, in-process storage.
    Local,
    /// Anything else; treated as single-tenant.
    Other(String),
}

impl StoreBackend {
    pub const CLUSTER: &'static str = "cluster";
    pub const LOCAL: &'static str = "local";

    pub fn is_cluster(&self) -> bool {
        matches!(self, StoreBackend::Cluster)
    }

    pub fn is_local(&self) -> bool {
        matches!(self, StoreBackend::Local)
    }
}

impl FromStr for StoreBackend {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase();
        Ok(match normalized.as_str() {
            Self::CLUSTER => StoreBackend::Cluster,
            Self::LOCAL => StoreBackend::Local,
            _ => StoreBackend::Other(normalized),
        })
    }
}

impl fmt::Display for StoreBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreBackend::Cluster => f.write_str(Self::CLUSTER),
            StoreBackend::Local => f.write_str(Self::LOCAL),
            StoreBackend::Other(name) => f.write_str(name),
        }
    }
}

/// Settings for the metadata service client
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MetadataClientConfig {
    /// Upper bound for a single metadata request
    #[serde(with = "humantime_serde")]
    pub server_timeout: Duration,
}

impl Default for MetadataClientConfig {
    fn default() -> Self {
        Self {
            server_timeout: Duration::from_secs(3),
        }
    }
}

/// TLS material used to talk to the cluster. Unset paths disable TLS.
#[derive(Clone, Debug, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct SecurityConfig {
    pub cluster_ssl_ca: Option<PathBuf>,
    pub cluster_ssl_cert: Option<PathBuf>,
    pub cluster_ssl_key: Option<PathBuf>,
}

impl SecurityConfig {
    pub fn is_tls_enabled(&self) -> bool {
        self.cluster_ssl_ca.is_some()
            || self.cluster_ssl_cert.is_some()
            || self.cluster_ssl_key.is_some()
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Configuration {
    /// Keyspace this process serves. Empty disables keyspace labelling.
    pub keyspace_name: String,
    /// Storage backend name, see [`StoreBackend`]
    pub store: String,
    /// Metadata service endpoints, e.g. `10.0.0.1:2379,10.0.0.2:2379`
    pub path: String,
    /// Metadata client settings
    pub metadata_client: MetadataClientConfig,
    /// Cluster TLS settings
    pub security: SecurityConfig,
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            keyspace_name: String::new(),
            store: StoreBackend::LOCAL.to_string(),
            path: String::from("127.0.0.1:2379"),
            metadata_client: MetadataClientConfig::default(),
            security: SecurityConfig::default(),
        }
    }
}

impl Configuration {
    pub fn store_backend(&self) -> StoreBackend {
        match self.store.parse() {
            Ok(backend) => backend,
            Err(never) => match never {},
        }
    }

    pub fn keyspace(&self) -> KeyspaceName {
        KeyspaceName::new(self.keyspace_name.clone())
    }

    /// Whether registration has to look the keyspace up in the metadata service.
    pub fn requires_keyspace_lookup(&self) -> bool {
        !self.keyspace().is_empty() && self.store_backend().is_cluster()
    }

    fn figment() -> Figment {
        Figment::from(Serialized::defaults(Configuration::default()))
    }

    pub fn load() -> Result<Self, Box<figment::Error>> {
        let config = Self::figment()
            .merge(Toml::file(DEFAULT_CONFIG_FILE))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()
            .map_err(Box::new)?;

        Ok(config)
    }

    /// Load configuration from an explicit TOML file, still honouring env overrides.
    pub fn load_from_path(path: &Path) -> Result<Self, Box<figment::Error>> {
        let config = Self::figment()
            .merge(Toml::file_exact(path))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()
            .map_err(Box::new)?;

        Ok(config)
    }

    /// Process-wide configuration, loaded on first access.
    pub fn global() -> Result<&'static Configuration, Box<figment::Error>> {
        CONFIG.get_or_try_init(Configuration::load)
    }
}
