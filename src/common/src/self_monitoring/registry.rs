//! Process-wide metrics registry with constant labels.
//!
//! Constant labels are fixed once, before the first instrument is created,
//! and every instrument handed out by the registry carries them on each
//! recorded data point.

use std::sync::{Arc, Mutex, MutexGuard};

use once_cell::sync::OnceCell;
use opentelemetry::KeyValue;
use opentelemetry::metrics::{Counter, Gauge, Histogram, Meter, MeterProvider, ObservableGauge};
use opentelemetry_sdk::metrics::SdkMeterProvider;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("constant label {key}=\"{existing}\" already set, cannot change to \"{requested}\"")]
    LabelConflict {
        key: String,
        existing: String,
        requested: String,
    },
    #[error("constant labels are sealed, instruments were already created without {key}")]
    Sealed { key: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstrumentKind {
    Counter,
    Histogram,
    Gauge,
    ObservableGauge,
}

/// Name and baked-in constant labels of an instrument created through the registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstrumentDescriptor {
    pub scope: &'static str,
    pub name: String,
    pub kind: InstrumentKind,
    pub labels: Vec<(String, String)>,
}

impl InstrumentDescriptor {
    pub fn label(&self, key: &str) -> Option<&str> {
        self.labels
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

pub struct MetricsRegistry {
    meter_provider: SdkMeterProvider,
    const_labels: OnceCell<Arc<[KeyValue]>>,
    instruments: Mutex<Vec<InstrumentDescriptor>>,
}

impl Default for MetricsRegistry {
    fn default() -> Self {
        Self::new(SdkMeterProvider::builder().build())
    }
}

impl MetricsRegistry {
    pub fn new(meter_provider: SdkMeterProvider) -> Self {
        Self {
            meter_provider,
            const_labels: OnceCell::new(),
            instruments: Mutex::new(Vec::new()),
        }
    }

    pub fn meter_provider(&self) -> &SdkMeterProvider {
        &self.meter_provider
    }

    /// Install a constant label on all instruments created from now on.
    ///
    /// Setting the identical label again is accepted. A different value, or a
    /// label arriving after the label set was sealed, is rejected.
    pub fn set_const_label(&self, key: &str, value: &str) -> Result<(), RegistryError> {
        let labels: Arc<[KeyValue]> = Arc::from(vec![KeyValue::new(
            key.to_string(),
            value.to_string(),
        )]);
        if self.const_labels.set(labels).is_ok() {
            log::info!("Metrics constant label set: {key}=\"{value}\"");
            return Ok(());
        }

        let Some(existing) = self.const_labels.get() else {
            return Err(RegistryError::Sealed {
                key: key.to_string(),
            });
        };
        match existing.iter().find(|kv| kv.key.as_str() == key) {
            Some(kv) if kv.value.as_str() == value => Ok(()),
            Some(kv) => Err(RegistryError::LabelConflict {
                key: key.to_string(),
                existing: kv.value.as_str().into_owned(),
                requested: value.to_string(),
            }),
            None => Err(RegistryError::Sealed {
                key: key.to_string(),
            }),
        }
    }

    /// Freeze the constant label set. Without a prior label this leaves it empty.
    pub fn seal_labels(&self) {
        self.labels();
    }

    pub fn const_labels(&self) -> Vec<(String, String)> {
        self.labels()
            .iter()
            .map(|kv| (kv.key.as_str().to_string(), kv.value.as_str().into_owned()))
            .collect()
    }

    pub fn const_label(&self, key: &str) -> Option<String> {
        self.const_labels
            .get()?
            .iter()
            .find(|kv| kv.key.as_str() == key)
            .map(|kv| kv.value.as_str().into_owned())
    }

    /// Instruments created so far, in creation order.
    pub fn instruments(&self) -> Vec<InstrumentDescriptor> {
        self.catalogue().clone()
    }

    pub fn u64_counter(
        &self,
        scope: &'static str,
        name: &str,
        description: &str,
    ) -> LabeledCounter {
        let labels = self.track(scope, name, InstrumentKind::Counter);
        let counter = self
            .meter(scope)
            .u64_counter(name.to_string())
            .with_description(description.to_string())
            .build();
        LabeledCounter { counter, labels }
    }

    pub fn f64_histogram(
        &self,
        scope: &'static str,
        name: &str,
        description: &str,
        unit: &str,
    ) -> LabeledHistogram {
        let labels = self.track(scope, name, InstrumentKind::Histogram);
        let histogram = self
            .meter(scope)
            .f64_histogram(name.to_string())
            .with_description(description.to_string())
            .with_unit(unit.to_string())
            .build();
        LabeledHistogram { histogram, labels }
    }

    pub fn f64_gauge(
        &self,
        scope: &'static str,
        name: &str,
        description: &str,
        unit: &str,
    ) -> LabeledGauge {
        let labels = self.track(scope, name, InstrumentKind::Gauge);
        let gauge = self
            .meter(scope)
            .f64_gauge(name.to_string())
            .with_description(description.to_string())
            .with_unit(unit.to_string())
            .build();
        LabeledGauge { gauge, labels }
    }

    /// Gauge sampled by `observe` whenever the exporter collects.
    pub fn f64_observable_gauge<F>(
        &self,
        scope: &'static str,
        name: &str,
        description: &str,
        unit: &str,
        observe: F,
    ) -> ObservableGauge<f64>
    where
        F: Fn() -> f64 + Send + Sync + 'static,
    {
        let labels = self.track(scope, name, InstrumentKind::ObservableGauge);
        self.meter(scope)
            .f64_observable_gauge(name.to_string())
            .with_description(description.to_string())
            .with_unit(unit.to_string())
            .with_callback(move |observer| observer.observe(observe(), &labels))
            .build()
    }

    pub fn shutdown(&self) {
        if let Err(e) = self.meter_provider.force_flush() {
            log::warn!("Failed to flush meter provider: {e}");
        }
        if let Err(e) = self.meter_provider.shutdown() {
            log::warn!("Failed to shutdown meter provider: {e}");
        }
    }

    fn meter(&self, scope: &'static str) -> Meter {
        self.meter_provider.meter(scope)
    }

    fn labels(&self) -> &Arc<[KeyValue]> {
        self.const_labels.get_or_init(|| Arc::from(Vec::new()))
    }

    fn catalogue(&self) -> MutexGuard<'_, Vec<InstrumentDescriptor>> {
        self.instruments
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn track(&self, scope: &'static str, name: &str, kind: InstrumentKind) -> Arc<[KeyValue]> {
        let labels = Arc::clone(self.labels());
        self.catalogue().push(InstrumentDescriptor {
            scope,
            name: name.to_string(),
            kind,
            labels: labels
                .iter()
                .map(|kv| (kv.key.as_str().to_string(), kv.value.as_str().into_owned()))
                .collect(),
        });
        labels
    }
}

fn merge(labels: &[KeyValue], attributes: &[KeyValue]) -> Vec<KeyValue> {
    labels.iter().chain(attributes).cloned().collect()
}

#[derive(Clone)]
pub struct LabeledCounter {
    counter: Counter<u64>,
    labels: Arc<[KeyValue]>,
}

impl LabeledCounter {
    pub fn add(&self, value: u64, attributes: &[KeyValue]) {
        self.counter.add(value, &merge(&self.labels, attributes));
    }
}

#[derive(Clone)]
pub struct LabeledHistogram {
    histogram: Histogram<f64>,
    labels: Arc<[KeyValue]>,
}

impl LabeledHistogram {
    pub fn record(&self, value: f64, attributes: &[KeyValue]) {
        self.histogram
            .record(value, &merge(&self.labels, attributes));
    }
}

#[derive(Clone)]
pub struct LabeledGauge {
    gauge: Gauge<f64>,
    labels: Arc<[KeyValue]>,
}

impl LabeledGauge {
    pub fn record(&self, value: f64, attributes: &[KeyValue]) {
        self.gauge.record(value, &merge(&self.labels, attributes));
    }
}
