//! Test configuration builder for creating test setups quickly.

use std::path::PathBuf;
use std::time::Duration;

use crate::config::{Configuration, SecurityConfig, StoreBackend};

/// Builder for creating test configurations.
///
/// Starts from [`Configuration::default`], i.e. a single-tenant process on
/// the local backend.
///
/// # Example
///
/// ```rust,ignore
/// use common::testing::TestConfigBuilder;
///
/// let config = TestConfigBuilder::new()
///     .cluster("pd-0:2379,pd-1:2379")
///     .with_keyspace("tenant_7")
///     .build();
/// ```
#[derive(Debug, Clone)]
pub struct TestConfigBuilder {
    config: Configuration,
}

impl Default for TestConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl TestConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: Configuration::default(),
        }
    }

    /// Run against the distributed cluster reachable at `path`.
    pub fn cluster(mut self, path: &str) -> Self {
        self.config.store = StoreBackend::CLUSTER.to_string();
        self.config.path = path.to_string();
        self
    }

    /// Run against the local in-process backend.
    pub fn local(mut self) -> Self {
        self.config.store = StoreBackend::LOCAL.to_string();
        self
    }

    pub fn with_store(mut self, store: &str) -> Self {
        self.config.store = store.to_string();
        self
    }

    pub fn with_keyspace(mut self, keyspace_name: &str) -> Self {
        self.config.keyspace_name = keyspace_name.to_string();
        self
    }

    pub fn with_path(mut self, path: &str) -> Self {
        self.config.path = path.to_string();
        self
    }

    pub fn with_server_timeout(mut self, timeout: Duration) -> Self {
        self.config.metadata_client.server_timeout = timeout;
        self
    }

    /// Enable cluster TLS with the given CA, certificate and key files.
    pub fn with_tls(mut self, ca: PathBuf, cert: PathBuf, key: PathBuf) -> Self {
        self.config.security = SecurityConfig {
            cluster_ssl_ca: Some(ca),
            cluster_ssl_cert: Some(cert),
            cluster_ssl_key: Some(key),
        };
        self
    }

    /// Build the configuration.
    pub fn build(self) -> Configuration {
        self.config
    }
}
