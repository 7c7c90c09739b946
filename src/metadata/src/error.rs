use std::time::Duration;

/// Failures reported by a [`MetadataClient`](crate::MetadataClient).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MetadataError {
    #[error("metadata cluster is not bootstrapped")]
    NotBootstrapped,
    #[error("keyspace '{name}' does not exist")]
    KeyspaceNotFound { name: String },
    #[error("metadata request timed out after {0:?}")]
    Timeout(Duration),
    #[error("transport error: {0}")]
    Transport(String),
    #[error("security setup failed: {0}")]
    Security(String),
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error("metadata client is closed")]
    Closed,
    #[error("metadata service error: {0}")]
    Other(String),
}

/// Whether a failed lookup may succeed when repeated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryClass {
    Retryable,
    Fatal,
}

/// Classify a lookup failure.
///
/// Only the two states produced by a cluster that is still starting up are
/// retryable: missing bootstrap and a keyspace that has not been created yet.
pub fn classify(error: &MetadataError) -> RetryClass {
    match error {
        MetadataError::NotBootstrapped | MetadataError::KeyspaceNotFound { .. } => {
            RetryClass::Retryable
        }
        MetadataError::Timeout(_)
        | MetadataError::Transport(_)
        | MetadataError::Security(_)
        | MetadataError::InvalidArgument(_)
        | MetadataError::Closed
        | MetadataError::Other(_) => RetryClass::Fatal,
    }
}

impl MetadataError {
    pub fn is_retryable(&self) -> bool {
        classify(self) == RetryClass::Retryable
    }
}
