//! Scripted metadata clients for tests.
//!
//! Available with the `testing` feature:
//!
//! ```toml
//! [dev-dependencies]
//! metadata = { path = "../metadata", features = ["testing"] }
//! ```

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::{
    ClientOptions, KeyspaceMeta, MetadataClient, MetadataConnector, MetadataError, SecurityOption,
};

type Reply = Result<KeyspaceMeta, MetadataError>;

#[derive(Default)]
struct Script {
    replies: Mutex<VecDeque<Reply>>,
    fallback: Mutex<Option<Reply>>,
    requested: Mutex<Vec<String>>,
    calls: AtomicUsize,
    closes: AtomicUsize,
}

/// Client replaying a fixed sequence of lookup results.
///
/// Clones share the script and counters, so a test can keep one handle and
/// give another away.
#[derive(Clone, Default)]
pub struct ScriptedMetadataClient {
    script: Arc<Script>,
}

impl ScriptedMetadataClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn then_ok(self, meta: KeyspaceMeta) -> Self {
        self.push(Ok(meta))
    }

    pub fn then_err(self, error: MetadataError) -> Self {
        self.push(Err(error))
    }

    /// Fail with `error` `times` times in a row.
    pub fn then_err_times(self, error: MetadataError, times: usize) -> Self {
        (0..times).fold(self, |client, _| client.then_err(error.clone()))
    }

    /// Reply used once the scripted sequence is exhausted.
    pub fn otherwise_err(self, error: MetadataError) -> Self {
        *lock(&self.script.fallback) = Some(Err(error));
        self
    }

    pub fn calls(&self) -> usize {
        self.script.calls.load(Ordering::SeqCst)
    }

    pub fn closes(&self) -> usize {
        self.script.closes.load(Ordering::SeqCst)
    }

    /// Keyspace names passed to `load_keyspace`, in call order.
    pub fn requested(&self) -> Vec<String> {
        lock(&self.script.requested).clone()
    }

    fn push(self, reply: Reply) -> Self {
        lock(&self.script.replies).push_back(reply);
        self
    }
}

#[async_trait]
impl MetadataClient for ScriptedMetadataClient {
    async fn load_keyspace(&self, name: &str) -> Result<KeyspaceMeta, MetadataError> {
        self.script.calls.fetch_add(1, Ordering::SeqCst);
        lock(&self.script.requested).push(name.to_string());
        if self.closes() > 0 {
            return Err(MetadataError::Closed);
        }

        let next = lock(&self.script.replies).pop_front();
        match next {
            Some(reply) => reply,
            None => lock(&self.script.fallback)
                .clone()
                .unwrap_or_else(|| Err(MetadataError::Other("script exhausted".to_string()))),
        }
    }

    fn close(&self) {
        self.script.closes.fetch_add(1, Ordering::SeqCst);
    }
}

#[derive(Default)]
struct ConnectorState {
    connect_error: Mutex<Option<MetadataError>>,
    connections: Mutex<Vec<(Vec<String>, SecurityOption, ClientOptions)>>,
}

/// Connector handing out clones of one [`ScriptedMetadataClient`].
#[derive(Clone, Default)]
pub struct ScriptedConnector {
    client: ScriptedMetadataClient,
    state: Arc<ConnectorState>,
}

impl ScriptedConnector {
    pub fn new(client: ScriptedMetadataClient) -> Self {
        Self {
            client,
            state: Arc::default(),
        }
    }

    /// Connector whose `connect` always fails with `error`.
    pub fn failing(error: MetadataError) -> Self {
        let connector = Self::default();
        *lock(&connector.state.connect_error) = Some(error);
        connector
    }

    pub fn client(&self) -> &ScriptedMetadataClient {
        &self.client
    }

    pub fn connects(&self) -> usize {
        lock(&self.state.connections).len()
    }

    /// Arguments of the most recent `connect` call.
    pub fn last_connection(&self) -> Option<(Vec<String>, SecurityOption, ClientOptions)> {
        lock(&self.state.connections).last().cloned()
    }
}

#[async_trait]
impl MetadataConnector for ScriptedConnector {
    async fn connect(
        &self,
        endpoints: &[String],
        security: &SecurityOption,
        options: ClientOptions,
    ) -> Result<Box<dyn MetadataClient>, MetadataError> {
        lock(&self.state.connections).push((endpoints.to_vec(), security.clone(), options));
        if let Some(error) = lock(&self.state.connect_error).clone() {
            return Err(error);
        }
        Ok(Box::new(self.client.clone()))
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
}
