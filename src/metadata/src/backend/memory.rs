use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Mutex;

use crate::{
    ClientOptions, KeyspaceMeta, KeyspaceState, MetadataClient, MetadataConnector, MetadataError,
    SecurityOption,
};

/// Id reserved for the default keyspace; user keyspaces start after it.
pub const DEFAULT_KEYSPACE_ID: u32 = 0;

struct ServiceState {
    bootstrapped: bool,
    next_id: u32,
    keyspaces: HashMap<String, KeyspaceMeta>,
    latency: Duration,
}

/// Metadata service kept entirely in process memory.
///
/// Starts un-bootstrapped, like a freshly started cluster.
#[derive(Clone)]
pub struct InMemoryMetadataService {
    state: Arc<Mutex<ServiceState>>,
}

impl Default for InMemoryMetadataService {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryMetadataService {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(ServiceState {
                bootstrapped: false,
                next_id: DEFAULT_KEYSPACE_ID + 1,
                keyspaces: HashMap::new(),
                latency: Duration::ZERO,
            })),
        }
    }

    pub async fn bootstrap(&self) {
        let mut state = self.state.lock().await;
        if !state.bootstrapped {
            log::info!("Bootstrapping in-memory metadata service");
            state.bootstrapped = true;
        }
    }

    pub async fn is_bootstrapped(&self) -> bool {
        self.state.lock().await.bootstrapped
    }

    /// Delay applied to every lookup, to simulate a slow service.
    pub async fn set_latency(&self, latency: Duration) {
        self.state.lock().await.latency = latency;
    }

    pub async fn create_keyspace(&self, name: &str) -> Result<KeyspaceMeta, MetadataError> {
        let mut state = self.state.lock().await;
        if !state.bootstrapped {
            return Err(MetadataError::NotBootstrapped);
        }
        if name.trim().is_empty() {
            return Err(MetadataError::InvalidArgument(
                "keyspace name must not be empty".to_string(),
            ));
        }
        if state.keyspaces.contains_key(name) {
            let message = format!("keyspace '{name}' already exists");
            return Err(MetadataError::InvalidArgument(message));
        }

        let meta = KeyspaceMeta::new(state.next_id, name);
        state.next_id += 1;
        state.keyspaces.insert(name.to_string(), meta.clone());
        log::debug!("Created keyspace '{}' with id {}", meta.name, meta.id);
        Ok(meta)
    }

    pub async fn update_keyspace_state(
        &self,
        name: &str,
        new_state: KeyspaceState,
    ) -> Result<KeyspaceMeta, MetadataError> {
        let mut state = self.state.lock().await;
        let meta = state
            .keyspaces
            .get_mut(name)
            .ok_or_else(|| MetadataError::KeyspaceNotFound {
                name: name.to_string(),
            })?;
        meta.state = new_state;
        meta.state_changed_at = Utc::now();
        Ok(meta.clone())
    }

    async fn lookup(&self, name: &str) -> Result<KeyspaceMeta, MetadataError> {
        let latency = self.state.lock().await.latency;
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }

        let state = self.state.lock().await;
        if !state.bootstrapped {
            return Err(MetadataError::NotBootstrapped);
        }
        state
            .keyspaces
            .get(name)
            .cloned()
            .ok_or_else(|| MetadataError::KeyspaceNotFound {
                name: name.to_string(),
            })
    }
}

/// Connects clients to an [`InMemoryMetadataService`].
#[derive(Clone, Default)]
pub struct InMemoryConnector {
    service: InMemoryMetadataService,
}

impl InMemoryConnector {
    pub fn new(service: InMemoryMetadataService) -> Self {
        Self { service }
    }

    pub fn service(&self) -> &InMemoryMetadataService {
        &self.service
    }
}

#[async_trait]
impl MetadataConnector for InMemoryConnector {
    async fn connect(
        &self,
        endpoints: &[String],
        security: &SecurityOption,
        options: ClientOptions,
    ) -> Result<Box<dyn MetadataClient>, MetadataError> {
        if endpoints.is_empty() {
            return Err(MetadataError::InvalidArgument(
                "at least one metadata endpoint is required".to_string(),
            ));
        }
        security.validate()?;

        log::debug!(
            "Connected to in-memory metadata service via {} (timeout {:?}, tls {})",
            endpoints.join(","),
            options.timeout,
            security.is_enabled()
        );
        Ok(Box::new(InMemoryClient {
            service: self.service.clone(),
            timeout: options.timeout,
            closed: AtomicBool::new(false),
        }))
    }
}

pub struct InMemoryClient {
    service: InMemoryMetadataService,
    timeout: Duration,
    closed: AtomicBool,
}

impl InMemoryClient {
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MetadataClient for InMemoryClient {
    async fn load_keyspace(&self, name: &str) -> Result<KeyspaceMeta, MetadataError> {
        if self.is_closed() {
            return Err(MetadataError::Closed);
        }
        if name.is_empty() {
            return Err(MetadataError::InvalidArgument(
                "keyspace name must not be empty".to_string(),
            ));
        }

        tokio::time::timeout(self.timeout, self.service.lookup(name))
            .await
            .map_err(|_| MetadataError::Timeout(self.timeout))?
    }

    fn close(&self) {
        if !self.closed.swap(true, Ordering::SeqCst) {
            log::debug!("In-memory metadata client closed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn endpoints() -> Vec<String> {
        vec!["127.0.0.1:2379".to_string()]
    }

    async fn connect(connector: &InMemoryConnector, timeout: Duration) -> Box<dyn MetadataClient> {
        connector
            .connect(
                &endpoints(),
                &SecurityOption::default(),
                ClientOptions { timeout },
            )
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_lookup_before_bootstrap() {
        let connector = InMemoryConnector::default();
        let client = connect(&connector, Duration::from_secs(1)).await;

        assert_eq!(
            client.load_keyspace("tenant_7").await,
            Err(MetadataError::NotBootstrapped)
        );
        assert_eq!(
            connector.service().create_keyspace("tenant_7").await,
            Err(MetadataError::NotBootstrapped)
        );
    }

    #[tokio::test]
    async fn test_create_and_load_keyspaces() {
        let service = InMemoryMetadataService::new();
        service.bootstrap().await;
        let first = service.create_keyspace("tenant_7").await.unwrap();
        let second = service.create_keyspace("tenant_8").await.unwrap();
        assert_eq!(first.id, 1);
        assert_eq!(second.id, 2);
        assert!(service.create_keyspace("tenant_7").await.is_err());

        let connector = InMemoryConnector::new(service);
        let client = connect(&connector, Duration::from_secs(1)).await;
        assert_eq!(client.load_keyspace("tenant_8").await.unwrap(), second);
        assert_eq!(
            client.load_keyspace("missing").await,
            Err(MetadataError::KeyspaceNotFound {
                name: "missing".to_string()
            })
        );
    }

    #[tokio::test]
    async fn test_update_keyspace_state() {
        let service = InMemoryMetadataService::new();
        service.bootstrap().await;
        service.create_keyspace("tenant_7").await.unwrap();

        let meta = service
            .update_keyspace_state("tenant_7", KeyspaceState::Disabled)
            .await
            .unwrap();
        assert_eq!(meta.state, KeyspaceState::Disabled);
        assert!(
            service
                .update_keyspace_state("missing", KeyspaceState::Archived)
                .await
                .is_err()
        );
    }

    #[tokio::test]
    async fn test_lookup_times_out() {
        let service = InMemoryMetadataService::new();
        service.bootstrap().await;
        service.create_keyspace("tenant_7").await.unwrap();
        service.set_latency(Duration::from_millis(200)).await;

        let connector = InMemoryConnector::new(service);
        let client = connect(&connector, Duration::from_millis(20)).await;
        assert_eq!(
            client.load_keyspace("tenant_7").await,
            Err(MetadataError::Timeout(Duration::from_millis(20)))
        );
    }

    #[tokio::test]
    async fn test_closed_client_rejects_calls() {
        let connector = InMemoryConnector::default();
        connector.service().bootstrap().await;
        let client = connect(&connector, Duration::from_secs(1)).await;

        client.close();
        client.close();
        assert_eq!(
            client.load_keyspace("tenant_7").await,
            Err(MetadataError::Closed)
        );
    }

    #[tokio::test]
    async fn test_connect_validates_arguments() {
        let connector = InMemoryConnector::default();
        let no_endpoints = connector
            .connect(&[], &SecurityOption::default(), ClientOptions::default())
            .await;
        assert!(matches!(no_endpoints, Err(MetadataError::InvalidArgument(_))));

        let bad_tls = SecurityOption {
            ca_path: Some("/nonexistent/ca.pem".into()),
            ..Default::default()
        };
        let result = connector
            .connect(&endpoints(), &bad_tls, ClientOptions::default())
            .await;
        assert!(matches!(result, Err(MetadataError::Security(_))));
    }
}
