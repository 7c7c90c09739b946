//! Embedded metadata service used by the `keymeter` binary.

use std::sync::Arc;

use common::self_monitoring::ProcessMetrics;
use common::{KeyspaceName, MetricsRegistry};
use metadata::MetadataError;
use metadata::backend::{InMemoryConnector, InMemoryMetadataService};
use registration::{InitializerSet, MetricsRegistrar, Registration};

/// Bootstrap an in-memory metadata service and create the given keyspaces.
///
/// Empty names are skipped. Ids are assigned in order, starting at 1.
pub async fn seeded_service(keyspaces: &[&str]) -> Result<InMemoryMetadataService, MetadataError> {
    let service = InMemoryMetadataService::new();
    service.bootstrap().await;
    for name in keyspaces {
        let name = KeyspaceName::new(*name);
        if name.is_empty() {
            continue;
        }
        let meta = service.create_keyspace(name.as_str()).await?;
        log::info!("Seeded keyspace '{}' with id {}", meta.name, meta.id);
    }
    Ok(service)
}

/// Registrar with the built-in process gauges, backed by `service`.
pub fn registrar(service: InMemoryMetadataService) -> MetricsRegistrar {
    MetricsRegistrar::new(
        Arc::new(InMemoryConnector::new(service)),
        InitializerSet::new().with(ProcessMetrics::new()),
    )
}

/// Human-readable summary of a finished registration.
pub fn describe(registration: &Registration, registry: &MetricsRegistry) -> Vec<String> {
    let keyspace = match registration.keyspace_id() {
        Some(id) => format!("keyspace_id: {id}"),
        None => "keyspace_id: <none>".to_string(),
    };
    let mut lines = vec![
        keyspace,
        format!("initializers run: {}", registration.initializers_run),
    ];
    for instrument in registry.instruments() {
        let labels = instrument
            .labels
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join(",");
        let (name, kind) = (&instrument.name, instrument.kind);
        lines.push(format!("{name} ({kind:?}) {{{labels}}}"));
    }
    lines
}
