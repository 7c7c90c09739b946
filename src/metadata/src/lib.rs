//! Client seam to the cluster metadata service.
//!
//! The metadata service owns cluster bootstrap state and the keyspace table.
//! keymeter only needs one call from it, [`MetadataClient::load_keyspace`],
//! plus an explicit connect/close lifecycle.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub mod backend;
pub mod error;
pub mod scoped;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use error::{MetadataError, RetryClass, classify};
pub use scoped::ScopedClient;

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum KeyspaceState {
    #[default]
    Enabled,
    Disabled,
    Archived,
    Tombstone,
}

/// Keyspace record as stored by the metadata service.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct KeyspaceMeta {
    pub id: u32,
    pub name: String,
    pub state: KeyspaceState,
    pub created_at: DateTime<Utc>,
    pub state_changed_at: DateTime<Utc>,
    pub config: BTreeMap<String, String>,
}

impl KeyspaceMeta {
    pub fn new(id: u32, name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id,
            name: name.into(),
            state: KeyspaceState::Enabled,
            created_at: now,
            state_changed_at: now,
            config: BTreeMap::new(),
        }
    }
}

/// TLS material for the metadata connection. All paths are optional.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SecurityOption {
    pub ca_path: Option<PathBuf>,
    pub cert_path: Option<PathBuf>,
    pub key_path: Option<PathBuf>,
}

impl SecurityOption {
    pub fn is_enabled(&self) -> bool {
        self.ca_path.is_some() || self.cert_path.is_some() || self.key_path.is_some()
    }

    /// Check that the configured files can be used to set up TLS.
    pub fn validate(&self) -> Result<(), MetadataError> {
        if self.cert_path.is_some() != self.key_path.is_some() {
            return Err(MetadataError::Security(
                "certificate and key must be configured together".to_string(),
            ));
        }
        for path in [&self.ca_path, &self.cert_path, &self.key_path]
            .into_iter()
            .flatten()
        {
            if !path.is_file() {
                return Err(MetadataError::Security(format!("cannot read {}", path.display())));
            }
        }
        Ok(())
    }
}

/// Per-client settings applied to every request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClientOptions {
    pub timeout: Duration,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(3),
        }
    }
}

#[async_trait]
pub trait MetadataClient: Send + Sync {
    /// Look up a keyspace by name.
    async fn load_keyspace(&self, name: &str) -> Result<KeyspaceMeta, MetadataError>;

    /// Release the connection. Calling it more than once has no further effect.
    fn close(&self);
}

#[async_trait]
pub trait MetadataConnector: Send + Sync {
    async fn connect(
        &self,
        endpoints: &[String],
        security: &SecurityOption,
        options: ClientOptions,
    ) -> Result<Box<dyn MetadataClient>, MetadataError>;
}
