//! Startup registration of process metrics.
//!
//! Resolution, labelling and fan-out happen in that order and at most once.
//! Any failure aborts before the first subsystem instrument exists, so a
//! process never runs with partially labelled metrics.

use std::sync::Arc;
use std::time::Duration;

use common::config::{Configuration, SecurityConfig, StoreBackend};
use common::path::{PathError, parse_path};
use common::self_monitoring::RegistryError;
use common::{KeyspaceName, MetricsRegistry};
use metadata::{ClientOptions, MetadataConnector, MetadataError, ScopedClient, SecurityOption};

use crate::initializer::{InitializerError, InitializerSet};
use crate::labels::{KeyspaceLabel, apply_keyspace_label};
use crate::resolver::{KeyspaceResolver, ResolutionOutcome, ResolveError, RetryPolicy};

/// Metadata request timeout used by [`MetricsRegistrar::register_for_tool`].
pub const TOOL_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, thiserror::Error)]
pub enum RegistrationError {
    #[error("failed to load configuration")]
    Config(#[from] Box<figment::Error>),
    #[error("invalid metadata connection path")]
    InvalidPath(#[from] PathError),
    #[error("failed to connect to the metadata service")]
    Connect(#[source] MetadataError),
    #[error(transparent)]
    Resolve(#[from] ResolveError),
    #[error("failed to apply keyspace label")]
    Label(#[from] RegistryError),
    #[error(transparent)]
    Initializer(#[from] InitializerError),
}

/// What a successful registration did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Registration {
    pub label: Option<KeyspaceLabel>,
    pub initializers_run: usize,
}

impl Registration {
    pub fn keyspace_id(&self) -> Option<&str> {
        self.label.as_ref().map(KeyspaceLabel::value)
    }
}

pub fn security_option(config: &SecurityConfig) -> SecurityOption {
    SecurityOption {
        ca_path: config.cluster_ssl_ca.clone(),
        cert_path: config.cluster_ssl_cert.clone(),
        key_path: config.cluster_ssl_key.clone(),
    }
}

pub struct MetricsRegistrar {
    connector: Arc<dyn MetadataConnector>,
    initializers: InitializerSet,
    resolver: KeyspaceResolver,
}

impl MetricsRegistrar {
    pub fn new(connector: Arc<dyn MetadataConnector>, initializers: InitializerSet) -> Self {
        Self {
            connector,
            initializers,
            resolver: KeyspaceResolver::default(),
        }
    }

    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.resolver = KeyspaceResolver::new(policy);
        self
    }

    pub fn retry_policy(&self) -> &RetryPolicy {
        self.resolver.policy()
    }

    /// Register metrics using the process-wide configuration.
    pub async fn register(
        &self,
        registry: &MetricsRegistry,
    ) -> Result<Registration, RegistrationError> {
        let config = Configuration::global()?;
        self.register_with_config(config, registry).await
    }

    pub async fn register_with_config(
        &self,
        config: &Configuration,
        registry: &MetricsRegistry,
    ) -> Result<Registration, RegistrationError> {
        let backend = config.store_backend();
        let keyspace = config.keyspace();

        let outcome = if keyspace.is_empty() || !backend.is_cluster() {
            log::info!("Skipping keyspace lookup (keyspace '{keyspace}', store '{backend}')");
            ResolutionOutcome::NoKeyspace
        } else {
            let path = parse_path(&config.path)?;
            let options = ClientOptions {
                timeout: config.metadata_client.server_timeout,
            };
            self.resolve(
                &path.endpoints,
                &security_option(&config.security),
                options,
                &keyspace,
            )
            .await?
        };

        self.finish(registry, outcome, &backend)
    }

    /// Register metrics for an out-of-process tool such as a backup utility.
    ///
    /// Does not read the process configuration: endpoints and keyspace are
    /// explicit, TLS is off and requests time out after [`TOOL_CONNECT_TIMEOUT`].
    pub async fn register_for_tool(
        &self,
        endpoints: &[String],
        keyspace_name: &str,
        registry: &MetricsRegistry,
    ) -> Result<Registration, RegistrationError> {
        let keyspace = KeyspaceName::new(keyspace_name);

        let outcome = if keyspace.is_empty() {
            log::info!("Skipping keyspace lookup, no keyspace given");
            ResolutionOutcome::NoKeyspace
        } else {
            let options = ClientOptions {
                timeout: TOOL_CONNECT_TIMEOUT,
            };
            self.resolve(endpoints, &SecurityOption::default(), options, &keyspace)
                .await?
        };

        self.finish(registry, outcome, &StoreBackend::Cluster)
    }

    async fn resolve(
        &self,
        endpoints: &[String],
        security: &SecurityOption,
        options: ClientOptions,
        keyspace: &KeyspaceName,
    ) -> Result<ResolutionOutcome, RegistrationError> {
        log::info!(
            "Resolving keyspace '{keyspace}' via metadata service at {}",
            endpoints.join(",")
        );
        let client = self
            .connector
            .connect(endpoints, security, options)
            .await
            .map_err(RegistrationError::Connect)?;
        let client = ScopedClient::new(client);

        Ok(self.resolver.resolve(&*client, keyspace).await)
    }

    fn finish(
        &self,
        registry: &MetricsRegistry,
        outcome: ResolutionOutcome,
        backend: &StoreBackend,
    ) -> Result<Registration, RegistrationError> {
        let label = KeyspaceLabel::decide(&outcome)?;
        apply_keyspace_label(registry, label.as_ref())?;
        let initializers_run = self.initializers.run(registry, backend)?;

        Ok(Registration {
            label,
            initializers_run,
        })
    }
}
