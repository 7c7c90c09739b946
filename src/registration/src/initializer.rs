use std::sync::Arc;

use common::config::StoreBackend;
use common::{MetricsInitializer, MetricsRegistry};

#[derive(Debug, thiserror::Error)]
#[error("failed to initialize {name} metrics")]
pub struct InitializerError {
    pub name: String,
    #[source]
    pub source: anyhow::Error,
}

/// The closed list of subsystems whose instruments are created at startup.
#[derive(Clone, Default)]
pub struct InitializerSet {
    common: Vec<Arc<dyn MetricsInitializer>>,
    local_store: Vec<Arc<dyn MetricsInitializer>>,
}

impl InitializerSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an initializer that runs for every store backend.
    pub fn with(self, initializer: impl MetricsInitializer + 'static) -> Self {
        self.with_shared(Arc::new(initializer))
    }

    pub fn with_shared(mut self, initializer: Arc<dyn MetricsInitializer>) -> Self {
        self.common.push(initializer);
        self
    }

    /// Add an initializer that only runs on the local store backend.
    pub fn with_local_store(self, initializer: impl MetricsInitializer + 'static) -> Self {
        self.with_local_store_shared(Arc::new(initializer))
    }

    pub fn with_local_store_shared(mut self, initializer: Arc<dyn MetricsInitializer>) -> Self {
        self.local_store.push(initializer);
        self
    }

    pub fn len(&self) -> usize {
        self.common.len() + self.local_store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Initializers that apply to `backend`, common ones first.
    pub fn for_backend<'a>(
        &'a self,
        backend: &StoreBackend,
    ) -> impl Iterator<Item = &'a Arc<dyn MetricsInitializer>> + 'a {
        let local: &'a [Arc<dyn MetricsInitializer>] = if backend.is_local() {
            &self.local_store
        } else {
            &[]
        };
        self.common.iter().chain(local)
    }

    /// Run every initializer for `backend`, stopping at the first failure.
    ///
    /// Returns the number of initializers that ran.
    pub fn run(
        &self,
        registry: &MetricsRegistry,
        backend: &StoreBackend,
    ) -> Result<usize, InitializerError> {
        let mut ran = 0;
        for initializer in self.for_backend(backend) {
            log::debug!("Initializing {} metrics", initializer.name());
            initializer
                .init_metrics(registry)
                .map_err(|source| InitializerError {
                    name: initializer.name().to_string(),
                    source,
                })?;
            ran += 1;
        }
        log::info!("Initialized metrics of {ran} subsystems for the {backend} store");
        Ok(ran)
    }
}
