//! Test doubles for subsystem initializers.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use common::{MetricsInitializer, MetricsRegistry};

#[derive(Default)]
struct Recording {
    calls: AtomicUsize,
    labels_seen: Mutex<Vec<(String, String)>>,
}

/// Initializer that creates one counter and records how often it ran.
///
/// Clones share their counters.
#[derive(Clone)]
pub struct RecordingInitializer {
    name: String,
    fail: bool,
    recording: Arc<Recording>,
}

impl RecordingInitializer {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            fail: false,
            recording: Arc::default(),
        }
    }

    /// Initializer whose `init_metrics` always returns an error.
    pub fn failing(name: &str) -> Self {
        Self {
            fail: true,
            ..Self::new(name)
        }
    }

    pub fn calls(&self) -> usize {
        self.recording.calls.load(Ordering::SeqCst)
    }

    /// Constant labels of the registry at the time the initializer ran.
    pub fn labels_seen(&self) -> Vec<(String, String)> {
        self.recording
            .labels_seen
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

impl MetricsInitializer for RecordingInitializer {
    fn name(&self) -> &str {
        &self.name
    }

    fn init_metrics(&self, registry: &MetricsRegistry) -> anyhow::Result<()> {
        self.recording.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            anyhow::bail!("{} instruments could not be created", self.name);
        }

        let counter = registry.u64_counter(
            "keymeter.testing",
            &format!("keymeter.{}.events", self.name),
            "Events recorded by a test subsystem",
        );
        counter.add(0, &[]);
        *self
            .recording
            .labels_seen
            .lock()
            .unwrap_or_else(|e| e.into_inner()) = registry.const_labels();
        Ok(())
    }
}
