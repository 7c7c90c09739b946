//! Keyspace names.
//!
//! A keyspace partitions a shared cluster between tenants. Deployments without
//! multi-tenancy leave the name empty, which is detected with
//! [`KeyspaceName::is_empty`] rather than by comparing raw strings.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Name of a logical tenant/namespace on a shared cluster.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct KeyspaceName(String);

impl KeyspaceName {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// True when no keyspace is configured. Surrounding whitespace is ignored.
    pub fn is_empty(&self) -> bool {
        is_keyspace_name_empty(&self.0)
    }

    /// The name with surrounding whitespace removed, as sent to the metadata service.
    pub fn as_str(&self) -> &str {
        self.0.trim()
    }
}

impl fmt::Display for KeyspaceName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&str> for KeyspaceName {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<String> for KeyspaceName {
    fn from(name: String) -> Self {
        Self::new(name)
    }
}

pub fn is_keyspace_name_empty(name: &str) -> bool {
    name.trim().is_empty()
}
