//! Metrics infrastructure shared by every keymeter subsystem.
//!
//! Subsystems never create instruments from a global meter. They implement
//! [`MetricsInitializer`] and receive the [`MetricsRegistry`] once the
//! constant label set of the process has been decided.

pub mod metrics;
pub mod registry;

pub use metrics::ProcessMetrics;
pub use registry::{
    InstrumentDescriptor, InstrumentKind, LabeledCounter, LabeledGauge, LabeledHistogram,
    MetricsRegistry, RegistryError,
};

/// A subsystem that owns metric instruments.
///
/// `init_metrics` is called exactly once per process, after the constant
/// labels of the registry are fixed. Implementations must not depend on other
/// initializers having run.
pub trait MetricsInitializer: Send + Sync {
    /// Short name used in logs and errors.
    fn name(&self) -> &str;

    fn init_metrics(&self, registry: &MetricsRegistry) -> anyhow::Result<()>;
}
