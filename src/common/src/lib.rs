pub mod cli;
pub mod config;
pub mod keyspace;
pub mod path;
pub mod self_monitoring;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use keyspace::KeyspaceName;
pub use self_monitoring::{MetricsInitializer, MetricsRegistry};
