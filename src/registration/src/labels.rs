//! Decides whether process metrics carry a `keyspace_id` label.

use common::MetricsRegistry;
use common::self_monitoring::RegistryError;
use metadata::KeyspaceMeta;

use crate::resolver::{ResolutionOutcome, ResolveError};

pub const KEYSPACE_ID_LABEL: &str = "keyspace_id";

/// The constant `keyspace_id` label of a multi-tenant process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyspaceLabel {
    value: String,
}

impl KeyspaceLabel {
    pub fn for_keyspace(meta: &KeyspaceMeta) -> Self {
        Self {
            value: meta.id.to_string(),
        }
    }

    /// `None` for single-tenant processes, which get no keyspace dimension at all.
    pub fn decide(outcome: &ResolutionOutcome) -> Result<Option<Self>, ResolveError> {
        match outcome {
            ResolutionOutcome::NoKeyspace => Ok(None),
            ResolutionOutcome::Resolved(meta) => Ok(Some(Self::for_keyspace(meta))),
            ResolutionOutcome::Failed(err) => Err(err.clone()),
        }
    }

    pub fn key(&self) -> &'static str {
        KEYSPACE_ID_LABEL
    }

    pub fn value(&self) -> &str {
        &self.value
    }
}

/// Fix the registry's constant labels. Must run before any instrument is created.
pub fn apply_keyspace_label(
    registry: &MetricsRegistry,
    label: Option<&KeyspaceLabel>,
) -> Result<(), RegistryError> {
    match label {
        Some(label) => registry.set_const_label(label.key(), label.value()),
        None => {
            log::info!("Registering metrics without a {KEYSPACE_ID_LABEL} label");
            registry.seal_labels();
            Ok(())
        }
    }
}
