//! Keyspace lookup with a bounded, fixed-interval retry.

use std::fmt;
use std::time::Duration;

use common::KeyspaceName;
use metadata::{KeyspaceMeta, MetadataClient, MetadataError, RetryClass};

pub const DEFAULT_MAX_ATTEMPTS: u32 = 30;
pub const DEFAULT_RETRY_INTERVAL: Duration = Duration::from_millis(500);

/// Immutable retry settings for keyspace lookups.
#[derive(Clone, Copy)]
pub struct RetryPolicy {
    max_attempts: u32,
    interval: Duration,
    classify: fn(&MetadataError) -> RetryClass,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ATTEMPTS, DEFAULT_RETRY_INTERVAL)
    }
}

impl fmt::Debug for RetryPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryPolicy")
            .field("max_attempts", &self.max_attempts)
            .field("interval", &self.interval)
            .finish_non_exhaustive()
    }
}

impl RetryPolicy {
    /// `max_attempts` counts the first call; values below 1 are raised to 1.
    pub fn new(max_attempts: u32, interval: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            interval,
            classify: metadata::classify,
        }
    }

    pub fn with_classifier(mut self, classify: fn(&MetadataError) -> RetryClass) -> Self {
        self.classify = classify;
        self
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn classify(&self, error: &MetadataError) -> RetryClass {
        (self.classify)(error)
    }

    /// Total time spent sleeping when every attempt fails with a retryable error.
    pub fn max_backoff(&self) -> Duration {
        self.interval * (self.max_attempts - 1)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ResolveError {
    #[error("keyspace name is empty")]
    EmptyKeyspace,
    #[error("loading keyspace '{keyspace}' failed on attempt {attempt}")]
    Fatal {
        keyspace: String,
        attempt: u32,
        #[source]
        source: MetadataError,
    },
    #[error("loading keyspace '{keyspace}' still failing after {attempts} attempts")]
    Exhausted {
        keyspace: String,
        attempts: u32,
        #[source]
        last: MetadataError,
    },
}

impl ResolveError {
    /// The metadata error seen on the final attempt, if a lookup was made.
    pub fn last_error(&self) -> Option<&MetadataError> {
        match self {
            ResolveError::EmptyKeyspace => None,
            ResolveError::Fatal { source, .. } => Some(source),
            ResolveError::Exhausted { last, .. } => Some(last),
        }
    }
}

/// Result of deciding which keyspace, if any, the process belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolutionOutcome {
    /// Multi-tenancy is off or the store backend has no keyspaces.
    NoKeyspace,
    Resolved(KeyspaceMeta),
    Failed(ResolveError),
}

impl ResolutionOutcome {
    pub fn keyspace_meta(&self) -> Option<&KeyspaceMeta> {
        match self {
            ResolutionOutcome::Resolved(meta) => Some(meta),
            _ => None,
        }
    }

    pub fn into_result(self) -> Result<Option<KeyspaceMeta>, ResolveError> {
        match self {
            ResolutionOutcome::NoKeyspace => Ok(None),
            ResolutionOutcome::Resolved(meta) => Ok(Some(meta)),
            ResolutionOutcome::Failed(err) => Err(err),
        }
    }
}

/// Looks a keyspace up, riding out a metadata service that is still starting.
#[derive(Debug, Clone, Default)]
pub struct KeyspaceResolver {
    policy: RetryPolicy,
}

impl KeyspaceResolver {
    pub fn new(policy: RetryPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    pub async fn resolve(
        &self,
        client: &dyn MetadataClient,
        name: &KeyspaceName,
    ) -> ResolutionOutcome {
        if name.is_empty() {
            return ResolutionOutcome::Failed(ResolveError::EmptyKeyspace);
        }
        let keyspace = name.as_str();
        let max_attempts = self.policy.max_attempts();
        let interval = self.policy.interval();

        let mut attempt = 1;
        let last_error = loop {
            log::debug!("Loading keyspace '{keyspace}' (attempt {attempt}/{max_attempts})");

            let error = match client.load_keyspace(keyspace).await {
                Ok(meta) => {
                    if attempt > 1 {
                        log::info!("Loaded keyspace '{keyspace}' after {attempt} attempts");
                    }
                    return ResolutionOutcome::Resolved(meta);
                }
                Err(error) => error,
            };

            if self.policy.classify(&error) == RetryClass::Fatal {
                log::error!("Loading keyspace '{keyspace}' failed: {error}");
                return ResolutionOutcome::Failed(ResolveError::Fatal {
                    keyspace: keyspace.to_string(),
                    attempt,
                    source: error,
                });
            }

            if attempt >= max_attempts {
                break error;
            }

            log::warn!("Keyspace '{keyspace}' unavailable ({attempt}/{max_attempts}): {error}");
            tokio::time::sleep(interval).await;
            attempt += 1;
        };

        log::error!("Keyspace '{keyspace}' still unavailable after {max_attempts} attempts");
        ResolutionOutcome::Failed(ResolveError::Exhausted {
            keyspace: keyspace.to_string(),
            attempts: max_attempts,
            last: last_error,
        })
    }
}
