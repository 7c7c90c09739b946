//! Keyspace-aware metrics registration.
//!
//! At startup a process asks the metadata service which keyspace it serves,
//! labels its metrics with the keyspace id (or not at all for single-tenant
//! deployments) and then lets every subsystem create its instruments.
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use common::{MetricsRegistry, self_monitoring::ProcessMetrics};
//! use metadata::backend::InMemoryConnector;
//! use registration::{InitializerSet, MetricsRegistrar};
//!
//! let registrar = MetricsRegistrar::new(
//!     Arc::new(InMemoryConnector::default()),
//!     InitializerSet::new().with(ProcessMetrics::new()),
//! );
//! let registry = MetricsRegistry::default();
//! registrar.register(&registry).await?;
//! ```

pub mod initializer;
pub mod labels;
pub mod registrar;
pub mod resolver;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use initializer::{InitializerError, InitializerSet};
pub use labels::{KEYSPACE_ID_LABEL, KeyspaceLabel, apply_keyspace_label};
pub use registrar::{MetricsRegistrar, Registration, RegistrationError, TOOL_CONNECT_TIMEOUT};
pub use resolver::{KeyspaceResolver, ResolutionOutcome, ResolveError, RetryPolicy};
