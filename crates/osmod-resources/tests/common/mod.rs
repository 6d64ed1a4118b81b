//! Shared setup for the resource scenario tests
//!
//! `MutationLog` forwards to a MemoryCloud and keeps every mutating call,
//! so scenarios can assert on the exact request that was sent.

#![allow(dead_code)]

use async_trait::async_trait;
use osmod_core::{CloudClient, Engine, EngineConfig, Filters, MemoryCloud, ModuleRegistry};
use osmod_core::{ResourceKind, Result};
use serde_json::{Map, Value, json};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// A mutating call: action, kind and request body (empty for deletes)
pub type Mutation = (&'static str, ResourceKind, Value);

#[derive(Clone)]
pub struct MutationLog {
    inner: MemoryCloud,
    calls: Arc<Mutex<Vec<Mutation>>>,
}

impl MutationLog {
    pub fn new(inner: MemoryCloud) -> Self {
        Self {
            inner,
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn memory(&self) -> &MemoryCloud {
        &self.inner
    }

    pub fn calls(&self) -> Vec<Mutation> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, action: &'static str, kind: ResourceKind, body: Value) {
        self.calls.lock().unwrap().push((action, kind, body));
    }
}

#[async_trait]
impl CloudClient for MutationLog {
    async fn list(&self, kind: ResourceKind, filters: &Filters) -> Result<Vec<Value>> {
        self.inner.list(kind, filters).await
    }

    async fn get(&self, kind: ResourceKind, id: &str) -> Result<Option<Value>> {
        self.inner.get(kind, id).await
    }

    async fn create(&self, kind: ResourceKind, body: Map<String, Value>) -> Result<Value> {
        self.record("create", kind, Value::Object(body.clone()));
        self.inner.create(kind, body).await
    }

    async fn update(
        &self,
        kind: ResourceKind,
        id: &str,
        patch: Map<String, Value>,
    ) -> Result<Value> {
        self.record("update", kind, Value::Object(patch.clone()));
        self.inner.update(kind, id, patch).await
    }

    async fn delete(&self, kind: ResourceKind, id: &str) -> Result<()> {
        self.record("delete", kind, json!({}));
        self.inner.delete(kind, id).await
    }

    fn cloud_name(&self) -> &str {
        "mutation-log"
    }
}

/// Registry with every resource module and alias
pub fn registry() -> Arc<ModuleRegistry> {
    let registry = ModuleRegistry::with_builtin_clouds();
    osmod_resources::register(&registry);
    Arc::new(registry)
}

/// Engine over a fresh logged memory cloud
pub fn setup() -> (Engine, MutationLog) {
    setup_with(EngineConfig::new())
}

pub fn setup_with(config: EngineConfig) -> (Engine, MutationLog) {
    let cloud = MutationLog::new(MemoryCloud::new().with_settle_polls(2));
    let config = config.with_poll_interval(Duration::from_millis(1));
    let engine = Engine::new(registry(), Box::new(cloud.clone()), &config).expect("valid config");
    (engine, cloud)
}
