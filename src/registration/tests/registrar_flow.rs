use std::sync::Arc;
use std::time::Duration;

use common::MetricsRegistry;
use common::config::StoreBackend;
use common::testing::TestConfigBuilder;
use metadata::backend::{InMemoryConnector, InMemoryMetadataService};
use metadata::testing::{ScriptedConnector, ScriptedMetadataClient};
use metadata::{KeyspaceMeta, MetadataConnector, MetadataError};
use registration::testing::RecordingInitializer;
use registration::{
    InitializerSet, MetricsRegistrar, RegistrationError, ResolveError, RetryPolicy,
    TOOL_CONNECT_TIMEOUT,
};

const INTERVAL: Duration = Duration::from_millis(10);

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn registrar(
    connector: impl MetadataConnector + 'static,
    set: InitializerSet,
) -> MetricsRegistrar {
    MetricsRegistrar::new(Arc::new(connector), set)
        .with_retry_policy(RetryPolicy::new(5, INTERVAL))
}

#[tokio::test]
async fn test_cluster_config_passes_endpoints_timeout_and_tls() {
    init_logging();
    let dir = tempfile::tempdir().unwrap();
    let (ca, cert, key) = (
        dir.path().join("ca.pem"),
        dir.path().join("cert.pem"),
        dir.path().join("key.pem"),
    );
    let connector = ScriptedConnector::new(
        ScriptedMetadataClient::new().then_ok(KeyspaceMeta::new(42, "tenant_7")),
    );
    let config = TestConfigBuilder::new()
        .cluster("cluster://pd-0:2379,pd-1:2379")
        .with_keyspace("tenant_7")
        .with_server_timeout(Duration::from_secs(4))
        .with_tls(ca.clone(), cert.clone(), key.clone())
        .build();

    let registry = MetricsRegistry::default();
    let registration = registrar(connector.clone(), InitializerSet::new())
        .register_with_config(&config, &registry)
        .await
        .unwrap();

    assert_eq!(registration.keyspace_id(), Some("42"));
    let (endpoints, security, options) = connector.last_connection().unwrap();
    assert_eq!(endpoints, vec!["pd-0:2379", "pd-1:2379"]);
    assert_eq!(options.timeout, Duration::from_secs(4));
    assert_eq!(security.ca_path, Some(ca));
    assert_eq!(security.cert_path, Some(cert));
    assert_eq!(security.key_path, Some(key));
    assert_eq!(connector.client().closes(), 1);
}

#[tokio::test]
async fn test_local_store_skips_lookup_and_runs_local_initializers() {
    init_logging();
    let connector = ScriptedConnector::new(ScriptedMetadataClient::new());
    let common = RecordingInitializer::new("session");
    let local = RecordingInitializer::new("local-store");
    let set = InitializerSet::new()
        .with(common.clone())
        .with_local_store(local.clone());
    let config = TestConfigBuilder::new()
        .local()
        .with_keyspace("tenant_7")
        .build();

    let registry = MetricsRegistry::default();
    let registration = registrar(connector.clone(), set)
        .register_with_config(&config, &registry)
        .await
        .unwrap();

    assert_eq!(registration.label, None);
    assert_eq!(registration.initializers_run, 2);
    assert_eq!(connector.connects(), 0);
    assert_eq!(common.calls(), 1);
    assert_eq!(local.calls(), 1);
    assert!(common.labels_seen().is_empty());
}

#[tokio::test]
async fn test_other_store_backend_is_single_tenant() {
    let connector = ScriptedConnector::new(ScriptedMetadataClient::new());
    let local = RecordingInitializer::new("local-store");
    let config = TestConfigBuilder::new()
        .with_store("MockStore")
        .with_keyspace("tenant_7")
        .build();
    assert_eq!(
        config.store_backend(),
        StoreBackend::Other("mockstore".to_string())
    );

    let registry = MetricsRegistry::default();
    let set = InitializerSet::new().with_local_store(local.clone());
    let registration = registrar(connector.clone(), set)
        .register_with_config(&config, &registry)
        .await
        .unwrap();

    assert_eq!(registration.keyspace_id(), None);
    assert_eq!(connector.connects(), 0);
    assert_eq!(local.calls(), 0);
}

#[tokio::test]
async fn test_malformed_path_is_fatal_without_connecting() {
    let connector = ScriptedConnector::new(ScriptedMetadataClient::new());
    let subsystem = RecordingInitializer::new("executor");
    let config = TestConfigBuilder::new()
        .cluster("pd-0:notaport")
        .with_keyspace("tenant_7")
        .build();

    let registry = MetricsRegistry::default();
    let set = InitializerSet::new().with(subsystem.clone());
    let err = registrar(connector.clone(), set)
        .register_with_config(&config, &registry)
        .await
        .unwrap_err();

    assert!(matches!(err, RegistrationError::InvalidPath(_)));
    assert_eq!(connector.connects(), 0);
    assert_eq!(subsystem.calls(), 0);
    assert!(registry.instruments().is_empty());
}

#[tokio::test]
async fn test_connect_failure_is_fatal() {
    let connector = ScriptedConnector::failing(MetadataError::Security("bad ca".to_string()));
    let subsystem = RecordingInitializer::new("executor");
    let config = TestConfigBuilder::new()
        .cluster("pd-0:2379")
        .with_keyspace("tenant_7")
        .build();

    let set = InitializerSet::new().with(subsystem.clone());
    let err = registrar(connector.clone(), set)
        .register_with_config(&config, &MetricsRegistry::default())
        .await
        .unwrap_err();

    match err {
        RegistrationError::Connect(MetadataError::Security(_)) => {}
        other => panic!("expected a TLS connect error, got {other:?}"),
    }
    assert_eq!(connector.client().calls(), 0);
    assert_eq!(subsystem.calls(), 0);
}

#[tokio::test]
async fn test_exhausted_retries_abort_and_close_client() {
    let connector = ScriptedConnector::new(
        ScriptedMetadataClient::new().otherwise_err(MetadataError::KeyspaceNotFound {
            name: "tenant_7".to_string(),
        }),
    );
    let subsystem = RecordingInitializer::new("executor");
    let config = TestConfigBuilder::new()
        .cluster("pd-0:2379")
        .with_keyspace("tenant_7")
        .build();

    let registry = MetricsRegistry::default();
    let set = InitializerSet::new().with(subsystem.clone());
    let err = registrar(connector.clone(), set)
        .register_with_config(&config, &registry)
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        RegistrationError::Resolve(ResolveError::Exhausted { attempts: 5, .. })
    ));
    assert_eq!(connector.client().calls(), 5);
    assert_eq!(connector.client().closes(), 1);
    assert_eq!(subsystem.calls(), 0);
    assert_eq!(registry.const_label("keyspace_id"), None);
}

#[tokio::test]
async fn test_initializer_failure_aborts_fan_out() {
    let connector = ScriptedConnector::new(ScriptedMetadataClient::new());
    let broken = RecordingInitializer::failing("planner");
    let after = RecordingInitializer::new("server");
    let config = TestConfigBuilder::new().build();

    let set = InitializerSet::new()
        .with(broken.clone())
        .with(after.clone());
    let err = registrar(connector, set)
        .register_with_config(&config, &MetricsRegistry::default())
        .await
        .unwrap_err();

    match err {
        RegistrationError::Initializer(err) => assert_eq!(err.name, "planner"),
        other => panic!("expected initializer error, got {other:?}"),
    }
    assert_eq!(after.calls(), 0);
}

#[tokio::test]
async fn test_tool_entry_point_uses_fixed_timeout_and_no_tls() {
    let connector = ScriptedConnector::new(
        ScriptedMetadataClient::new().then_ok(KeyspaceMeta::new(11, "tenant_b")),
    );
    let local = RecordingInitializer::new("local-store");
    let subsystem = RecordingInitializer::new("backup");
    let endpoints = vec!["10.0.0.1:2379".to_string()];

    let registry = MetricsRegistry::default();
    let set = InitializerSet::new()
        .with(subsystem.clone())
        .with_local_store(local.clone());
    let registration = registrar(connector.clone(), set)
        .register_for_tool(&endpoints, "tenant_b", &registry)
        .await
        .unwrap();

    assert_eq!(registration.keyspace_id(), Some("11"));
    let (seen, security, options) = connector.last_connection().unwrap();
    assert_eq!(seen, endpoints);
    assert!(!security.is_enabled());
    assert_eq!(options.timeout, TOOL_CONNECT_TIMEOUT);
    assert_eq!(connector.client().closes(), 1);
    assert_eq!(subsystem.calls(), 1);
    assert_eq!(local.calls(), 0);
    assert_eq!(
        subsystem.labels_seen(),
        vec![("keyspace_id".to_string(), "11".to_string())]
    );
}

#[tokio::test]
async fn test_tool_entry_point_without_keyspace() {
    let connector = ScriptedConnector::new(ScriptedMetadataClient::new());
    let subsystem = RecordingInitializer::new("backup");

    let registry = MetricsRegistry::default();
    let set = InitializerSet::new().with(subsystem.clone());
    let registration = registrar(connector.clone(), set)
        .register_for_tool(&["10.0.0.1:2379".to_string()], "", &registry)
        .await
        .unwrap();

    assert_eq!(registration.label, None);
    assert_eq!(connector.connects(), 0);
    assert_eq!(subsystem.calls(), 1);
}

#[tokio::test]
async fn test_in_memory_service_bootstrapped_while_waiting() {
    init_logging();
    let service = InMemoryMetadataService::new();
    let background = service.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(15)).await;
        background.bootstrap().await;
        tokio::time::sleep(Duration::from_millis(15)).await;
        background.create_keyspace("tenant_7").await.unwrap();
    });

    let subsystem = RecordingInitializer::new("session");
    let config = TestConfigBuilder::new()
        .cluster("127.0.0.1:2379")
        .with_keyspace("tenant_7")
        .build();

    let registry = MetricsRegistry::default();
    let registration = MetricsRegistrar::new(
        Arc::new(InMemoryConnector::new(service)),
        InitializerSet::new().with(subsystem.clone()),
    )
    .with_retry_policy(RetryPolicy::new(50, INTERVAL))
    .register_with_config(&config, &registry)
    .await
    .unwrap();

    assert_eq!(registration.keyspace_id(), Some("1"));
    assert!(
        registry
            .instruments()
            .iter()
            .all(|i| i.label("keyspace_id") == Some("1"))
    );
}

#[tokio::test]
async fn test_in_memory_connector_rejects_missing_tls_files() {
    let config = TestConfigBuilder::new()
        .cluster("127.0.0.1:2379")
        .with_keyspace("tenant_7")
        .with_tls(
            "/nonexistent/ca.pem".into(),
            "/nonexistent/cert.pem".into(),
            "/nonexistent/key.pem".into(),
        )
        .build();

    let connector = Arc::new(InMemoryConnector::default());
    let err = MetricsRegistrar::new(connector, InitializerSet::new())
        .register_with_config(&config, &MetricsRegistry::default())
        .await
        .unwrap_err();

    match err {
        RegistrationError::Connect(MetadataError::Security(_)) => {}
        other => panic!("expected a TLS connect error, got {other:?}"),
    }
}
