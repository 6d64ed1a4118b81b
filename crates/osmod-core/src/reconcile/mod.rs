//! Declarative reconciliation of a single cloud resource
//!
//! Each resource kind implements [`Reconcile`]: how to find the existing
//! resource, how to build a create request and which fields may change.
//! [`plan`] turns desired and observed state into one of four actions and
//! [`apply`] carries it out with at most one mutating call:
//!
//! | state   | observed | action |
//! |---------|----------|--------|
//! | present | absent   | create |
//! | present | exists   | update, or no-op if nothing differs |
//! | absent  | absent   | no-op  |
//! | absent  | exists   | delete |
//!
//! In check mode the same decision is made and reported, but nothing is
//! sent to the cloud.

mod diff;

pub use diff::{Diff, same};

use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::locator;
use crate::params::{ArgumentSpec, Params};
use crate::result::ModuleResult;
use crate::traits::{Filters, Invocation, Module, ResourceKind};
use crate::waiter::{self, WaitPolicy};

/// Typed snapshot of one remote resource
pub trait Resource: DeserializeOwned + Serialize + Clone + Send + Sync {
    fn id(&self) -> &str;
}

/// Requested lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DesiredState {
    Present,
    Absent,
}

impl DesiredState {
    /// Read the `state` parameter (defaults to present)
    pub fn from_params(params: &Params) -> Result<Self> {
        match params.str("state").unwrap_or("present") {
            "present" => Ok(Self::Present),
            "absent" => Ok(Self::Absent),
            other => Err(Error::validation(format!(
                "value of state must be one of: present, absent, got: {}",
                other
            ))),
        }
    }
}

/// Per resource kind reconciliation hooks
#[async_trait]
pub trait Reconcile: Send + Sync {
    type Record: Resource;

    fn kind(&self) -> ResourceKind;

    /// Canonical module name
    fn module_name(&self) -> &'static str;

    /// Key under which the resource is returned
    fn result_key(&self) -> &'static str;

    fn argument_spec(&self) -> ArgumentSpec;

    /// Scope filters for the lookup (resolved project, domain, ...)
    async fn scope(&self, _inv: &Invocation<'_>) -> Result<Filters> {
        Ok(Filters::new())
    }

    /// Find the existing resource
    async fn locate(
        &self,
        inv: &Invocation<'_>,
        scope: &Filters,
    ) -> Result<Option<Self::Record>> {
        let name = inv
            .params
            .str("name")
            .ok_or_else(|| Error::validation("missing required arguments: name"))?;
        locator::find_one(inv.cloud, self.kind(), name, scope).await
    }

    /// Request body for a create, from the full parameters (defaults applied)
    async fn create_body(
        &self,
        inv: &Invocation<'_>,
        scope: &Filters,
    ) -> Result<Map<String, Value>>;

    /// Compare the explicitly supplied parameters with the observed resource
    async fn diff(
        &self,
        inv: &Invocation<'_>,
        desired: &Params,
        current: &Self::Record,
    ) -> Result<Diff>;

    /// Status transition to wait for after create and update
    fn wait_policy(&self) -> Option<WaitPolicy> {
        None
    }

    /// Whether a delete waits until the resource is gone
    fn wait_on_delete(&self) -> bool {
        false
    }

    /// Shape the returned resource (formatter hook)
    fn present_value(&self, record: &Self::Record) -> Value {
        serde_json::to_value(record).unwrap_or(Value::Null)
    }

    /// Additional top-level return values
    fn extra_returns(&self, _record: &Self::Record, result: ModuleResult) -> ModuleResult {
        result
    }
}

/// Action decided by the reconciler
#[derive(Debug, Clone)]
pub enum Plan<T> {
    Create { body: Map<String, Value> },
    Update { current: T, payload: Map<String, Value> },
    Delete { current: T },
    Noop { current: Option<T> },
}

impl<T> Plan<T> {
    pub fn is_change(&self) -> bool {
        !matches!(self, Plan::Noop { .. })
    }

    pub fn action(&self) -> &'static str {
        match self {
            Plan::Create { .. } => "create",
            Plan::Update { .. } => "update",
            Plan::Delete { .. } => "delete",
            Plan::Noop { .. } => "noop",
        }
    }
}

/// Decide what has to happen
pub async fn plan<R: Reconcile>(module: &R, inv: &Invocation<'_>) -> Result<Plan<R::Record>> {
    let state = DesiredState::from_params(&inv.params)?;
    let scope = module.scope(inv).await?;
    let current = module.locate(inv, &scope).await?;

    let plan = match (state, current) {
        (DesiredState::Present, None) => Plan::Create {
            body: module.create_body(inv, &scope).await?,
        },
        (DesiredState::Present, Some(current)) => {
            let payload = module
                .diff(inv, &inv.params.explicit(), &current)
                .await?
                .into_payload()?;
            if payload.is_empty() {
                Plan::Noop {
                    current: Some(current),
                }
            } else {
                Plan::Update { current, payload }
            }
        }
        (DesiredState::Absent, None) => Plan::Noop { current: None },
        (DesiredState::Absent, Some(current)) => Plan::Delete { current },
    };

    debug!("{}: planned {}", module.module_name(), plan.action());
    Ok(plan)
}

/// Carry out a plan
pub async fn apply<R: Reconcile>(
    module: &R,
    inv: &Invocation<'_>,
    plan: Plan<R::Record>,
) -> Result<ModuleResult> {
    let kind = module.kind();

    if inv.check_mode {
        debug!("{}: check mode, skipping {}", module.module_name(), plan.action());
        let changed = plan.is_change();
        return Ok(match plan {
            Plan::Noop {
                current: Some(current),
            }
            | Plan::Update { current, .. } => {
                present(module, ModuleResult::changed_if(changed), &current)
            }
            _ => ModuleResult::changed_if(changed),
        });
    }

    match plan {
        Plan::Create { body } => {
            let snapshot = inv.cloud.create(kind, body).await?;
            let snapshot = settle(module, inv, snapshot).await?;
            let record: R::Record = locator::decode(inv.cloud, kind, snapshot)?;
            info!("{}: created {} {}", module.module_name(), kind, record.id());
            Ok(present(module, ModuleResult::changed(), &record))
        }
        Plan::Update { current, payload } => {
            let fields: Vec<&str> = payload.keys().map(String::as_str).collect();
            info!(
                "{}: updating {} {} ({})",
                module.module_name(),
                kind,
                current.id(),
                fields.join(", ")
            );
            let snapshot = inv.cloud.update(kind, current.id(), payload).await?;
            let snapshot = settle(module, inv, snapshot).await?;
            let record: R::Record = locator::decode(inv.cloud, kind, snapshot)?;
            Ok(present(module, ModuleResult::changed(), &record))
        }
        Plan::Delete { current } => {
            info!("{}: deleting {} {}", module.module_name(), kind, current.id());
            inv.cloud.delete(kind, current.id()).await?;
            if module.wait_on_delete() && inv.wait.enabled {
                waiter::wait_for_deletion(inv.cloud, kind, current.id(), &inv.wait).await?;
            }
            Ok(ModuleResult::changed())
        }
        Plan::Noop { current } => Ok(match current {
            Some(current) => present(module, ModuleResult::unchanged(), &current),
            None => ModuleResult::unchanged(),
        }),
    }
}

async fn settle<R: Reconcile>(module: &R, inv: &Invocation<'_>, snapshot: Value) -> Result<Value> {
    match module.wait_policy() {
        Some(policy) if inv.wait.enabled => {
            let id = snapshot
                .get("id")
                .and_then(Value::as_str)
                .ok_or_else(|| {
                    Error::cloud(
                        inv.cloud.cloud_name(),
                        format!("{} in server response has no id", module.kind()),
                    )
                })?
                .to_string();
            waiter::wait_for_status(inv.cloud, module.kind(), &id, &policy, &inv.wait).await
        }
        _ => Ok(snapshot),
    }
}

fn present<R: Reconcile>(module: &R, result: ModuleResult, record: &R::Record) -> ModuleResult {
    let result = result.with(module.result_key(), module.present_value(record));
    module.extra_returns(record, result)
}

/// Adapts a [`Reconcile`] implementation into a [`Module`]
pub struct Managed<R>(pub R);

#[async_trait]
impl<R: Reconcile> Module for Managed<R> {
    fn name(&self) -> &'static str {
        self.0.module_name()
    }

    fn argument_spec(&self) -> ArgumentSpec {
        self.0.argument_spec()
    }

    async fn run(&self, inv: &Invocation<'_>) -> Result<ModuleResult> {
        let plan = plan(&self.0, inv).await?;
        apply(&self.0, inv, plan).await
    }
}
