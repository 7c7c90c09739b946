//! System resource and uptime gauges for the running process.

use std::sync::{Arc, Mutex};
use std::time::Instant;

use once_cell::sync::OnceCell;
use opentelemetry::metrics::ObservableGauge;
use sysinfo::System;

use super::{MetricsInitializer, MetricsRegistry};

const SCOPE: &str = "keymeter.process";

struct ProcessGauges {
    _cpu_gauge: ObservableGauge<f64>,
    _memory_gauge: ObservableGauge<f64>,
    _uptime_gauge: ObservableGauge<f64>,
}

impl ProcessGauges {
    fn new(registry: &MetricsRegistry) -> Self {
        let mut system = System::new();
        // CPU usage is a delta between two refreshes, take the baseline now.
        system.refresh_cpu_usage();
        let system = Arc::new(Mutex::new(system));
        let start_time = Instant::now();

        let cpu_src = Arc::clone(&system);
        let cpu_gauge = registry.f64_observable_gauge(
            SCOPE,
            "keymeter.process.cpu_utilization",
            "Global CPU utilization percentage",
            "1",
            move || {
                let mut sys = cpu_src.lock().unwrap_or_else(|e| e.into_inner());
                sys.refresh_cpu_usage();
                sys.global_cpu_usage() as f64
            },
        );

        let mem_src = Arc::clone(&system);
        let memory_gauge = registry.f64_observable_gauge(
            SCOPE,
            "keymeter.process.memory_usage",
            "System used memory in bytes",
            "By",
            move || {
                let mut sys = mem_src.lock().unwrap_or_else(|e| e.into_inner());
                sys.refresh_memory();
                sys.used_memory() as f64
            },
        );

        let uptime_gauge = registry.f64_observable_gauge(
            SCOPE,
            "keymeter.process.uptime",
            "Process uptime in seconds",
            "s",
            move || start_time.elapsed().as_secs_f64(),
        );

        Self {
            _cpu_gauge: cpu_gauge,
            _memory_gauge: memory_gauge,
            _uptime_gauge: uptime_gauge,
        }
    }
}

/// CPU, memory and uptime gauges sampled on every collection.
#[derive(Default)]
pub struct ProcessMetrics {
    gauges: OnceCell<ProcessGauges>,
}

impl ProcessMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_registered(&self) -> bool {
        self.gauges.get().is_some()
    }
}

impl MetricsInitializer for ProcessMetrics {
    fn name(&self) -> &str {
        "process"
    }

    fn init_metrics(&self, registry: &MetricsRegistry) -> anyhow::Result<()> {
        if self.is_registered() {
            log::debug!("Process metrics already registered");
            return Ok(());
        }

        // Concurrent callers block here until the first one has registered.
        self.gauges.get_or_init(|| ProcessGauges::new(registry));
        Ok(())
    }
}
