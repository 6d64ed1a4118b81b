//! Test doubles and common utilities for contract tests
//!
//! `RecordingCloud` wraps the in-memory cloud and records every call, so
//! tests can assert on the exact number and payload of mutating calls.
//! `WidgetModule` is a minimal resource kind wired through the generic
//! reconciler.

#![allow(dead_code)]

use async_trait::async_trait;
use osmod_core::error::Result;
use osmod_core::reconcile::{Diff, Managed, Reconcile, Resource};
use osmod_core::traits::{CloudClient, Filters, Invocation, ResourceKind};
use osmod_core::{ArgumentSpec, Engine, EngineConfig, MemoryCloud, ModuleRegistry, ParamSpec};
use osmod_core::{Params, WaitPolicy};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// One mutating call seen by the cloud
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Create {
        kind: ResourceKind,
        body: Map<String, Value>,
    },
    Update {
        kind: ResourceKind,
        id: String,
        patch: Map<String, Value>,
    },
    Delete {
        kind: ResourceKind,
        id: String,
    },
}

/// A cloud that records calls and forwards them to a MemoryCloud
#[derive(Clone)]
pub struct RecordingCloud {
    inner: MemoryCloud,
    mutations: Arc<Mutex<Vec<Call>>>,
    reads: Arc<AtomicUsize>,
    forced: Arc<Mutex<Map<String, Value>>>,
}

impl RecordingCloud {
    pub fn new(inner: MemoryCloud) -> Self {
        Self {
            inner,
            mutations: Arc::new(Mutex::new(Vec::new())),
            reads: Arc::new(AtomicUsize::new(0)),
            forced: Arc::new(Mutex::new(Map::new())),
        }
    }

    /// Overwrite a field in every snapshot the cloud returns
    pub fn force(&self, field: &str, value: Value) {
        self.forced.lock().unwrap().insert(field.to_string(), value);
    }

    fn apply_forced(&self, mut snapshot: Value) -> Value {
        if let Some(object) = snapshot.as_object_mut() {
            for (field, value) in self.forced.lock().unwrap().iter() {
                object.insert(field.clone(), value.clone());
            }
        }
        snapshot
    }

    /// The wrapped cloud, for seeding and inspection
    pub fn memory(&self) -> &MemoryCloud {
        &self.inner
    }

    /// Every mutating call, in order
    pub fn mutations(&self) -> Vec<Call> {
        self.mutations.lock().unwrap().clone()
    }

    pub fn mutation_count(&self) -> usize {
        self.mutations.lock().unwrap().len()
    }

    /// Number of list and get calls
    pub fn read_count(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    pub fn clear(&self) {
        self.mutations.lock().unwrap().clear();
        self.reads.store(0, Ordering::SeqCst);
    }
}

#[async_trait]
impl CloudClient for RecordingCloud {
    async fn list(&self, kind: ResourceKind, filters: &Filters) -> Result<Vec<Value>> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        self.inner.list(kind, filters).await
    }

    async fn get(&self, kind: ResourceKind, id: &str) -> Result<Option<Value>> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        Ok(self.inner.get(kind, id).await?.map(|s| self.apply_forced(s)))
    }

    async fn create(&self, kind: ResourceKind, body: Map<String, Value>) -> Result<Value> {
        self.mutations.lock().unwrap().push(Call::Create {
            kind,
            body: body.clone(),
        });
        Ok(self.apply_forced(self.inner.create(kind, body).await?))
    }

    async fn update(
        &self,
        kind: ResourceKind,
        id: &str,
        patch: Map<String, Value>,
    ) -> Result<Value> {
        self.mutations.lock().unwrap().push(Call::Update {
            kind,
            id: id.to_string(),
            patch: patch.clone(),
        });
        Ok(self.apply_forced(self.inner.update(kind, id, patch).await?))
    }

    async fn delete(&self, kind: ResourceKind, id: &str) -> Result<()> {
        self.mutations.lock().unwrap().push(Call::Delete {
            kind,
            id: id.to_string(),
        });
        self.inner.delete(kind, id).await
    }

    fn cloud_name(&self) -> &str {
        "recording"
    }
}

/// Snapshot of a widget
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Widget {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub tier: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Resource for Widget {
    fn id(&self) -> &str {
        &self.id
    }
}

/// A resource kind with one updatable field (`description`) and one
/// immutable field (`tier`)
pub struct WidgetModule {
    pub name: &'static str,
    pub kind: ResourceKind,
    pub wait: Option<WaitPolicy>,
}

impl WidgetModule {
    /// Plain widget stored as a security group
    pub fn plain() -> Self {
        Self {
            name: "widget",
            kind: ResourceKind::SecurityGroup,
            wait: None,
        }
    }

    /// Widget stored as a load balancer, waiting on its provisioning status
    pub fn waited() -> Self {
        Self {
            name: "waited_widget",
            kind: ResourceKind::LoadBalancer,
            wait: Some(WaitPolicy::new(
                "provisioning_status",
                &["ACTIVE"],
                &["ERROR"],
            )),
        }
    }
}

#[async_trait]
impl Reconcile for WidgetModule {
    type Record = Widget;

    fn kind(&self) -> ResourceKind {
        self.kind
    }

    fn module_name(&self) -> &'static str {
        self.name
    }

    fn result_key(&self) -> &'static str {
        "widget"
    }

    fn argument_spec(&self) -> ArgumentSpec {
        ArgumentSpec::cloud_module()
            .state()
            .param(ParamSpec::str("name").required())
            .param(ParamSpec::str("description"))
            .param(ParamSpec::str("tier").choices(&["gold", "silver"]).default("gold"))
    }

    async fn create_body(
        &self,
        inv: &Invocation<'_>,
        _scope: &Filters,
    ) -> Result<Map<String, Value>> {
        let mut body = Map::new();
        for field in ["name", "description", "tier"] {
            if let Some(value) = inv.params.get(field) {
                body.insert(field.to_string(), value.clone());
            }
        }
        Ok(body)
    }

    async fn diff(
        &self,
        _inv: &Invocation<'_>,
        desired: &Params,
        current: &Widget,
    ) -> Result<Diff> {
        let mut diff = Diff::new(self.kind);
        diff.update("description", desired.get("description"), &current.description)
            .immutable("tier", desired.get("tier"), &current.tier);
        Ok(diff)
    }

    fn wait_policy(&self) -> Option<WaitPolicy> {
        self.wait
    }

    fn wait_on_delete(&self) -> bool {
        self.wait.is_some()
    }
}

/// Registry holding the widget modules and an old alias for the plain one
pub fn registry() -> Arc<ModuleRegistry> {
    let registry = ModuleRegistry::with_builtin_clouds();
    registry.register_module(Box::new(Managed(WidgetModule::plain())));
    registry.register_module(Box::new(Managed(WidgetModule::waited())));
    registry.register_alias("os_widget", "widget");
    Arc::new(registry)
}

/// Engine over a recording cloud with fast polling
pub fn engine(cloud: &RecordingCloud) -> Engine {
    engine_with(cloud, EngineConfig::new())
}

pub fn engine_with(cloud: &RecordingCloud, config: EngineConfig) -> Engine {
    let config = config.with_poll_interval(Duration::from_millis(1));
    Engine::new(registry(), Box::new(cloud.clone()), &config).expect("valid engine config")
}

/// Memory cloud whose pending resources settle after `polls` reads
pub fn recording_cloud(polls: u32) -> RecordingCloud {
    RecordingCloud::new(MemoryCloud::new().with_settle_polls(polls))
}
