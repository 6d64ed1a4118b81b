// # Health Monitor Module
//
// Ensures a health monitor exists on a load balancer pool.
//
// The pool and the monitor type are fixed at creation. `resp_timeout` is sent
// as the API's `timeout` field, which would otherwise clash with the
// module's own wait timeout.

use async_trait::async_trait;
use osmod_core::locator;
use osmod_core::{
    ArgumentSpec, Diff, Filters, Invocation, ParamSpec, Params, Reconcile, Resource, ResourceKind,
    Result, WaitPolicy,
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::PROVISIONING_WAIT;
use crate::util::copy_params;

const MONITOR_TYPES: &[&str] = &[
    "HTTP",
    "HTTPS",
    "PING",
    "SCTP",
    "TCP",
    "TLS-HELLO",
    "UDP-CONNECT",
];

/// Parameter name -> API field name, for fields that can be updated
const UPDATABLE: &[(&str, &str)] = &[
    ("delay", "delay"),
    ("max_retries", "max_retries"),
    ("max_retries_down", "max_retries_down"),
    ("resp_timeout", "timeout"),
    ("http_method", "http_method"),
    ("url_path", "url_path"),
    ("expected_codes", "expected_codes"),
    ("admin_state_up", "is_admin_state_up"),
];

/// Health monitor snapshot
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthMonitor {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub pool_id: Option<String>,
    #[serde(default, rename = "type")]
    pub monitor_type: Option<String>,
    #[serde(default)]
    pub delay: Option<i64>,
    #[serde(default)]
    pub max_retries: Option<i64>,
    #[serde(default)]
    pub max_retries_down: Option<i64>,
    #[serde(default)]
    pub timeout: Option<i64>,
    #[serde(default)]
    pub http_method: Option<String>,
    #[serde(default)]
    pub url_path: Option<String>,
    #[serde(default)]
    pub expected_codes: Option<String>,
    #[serde(default)]
    pub is_admin_state_up: Option<bool>,
    #[serde(default)]
    pub provisioning_status: Option<String>,
    /// API spelling of `is_admin_state_up`
    #[serde(default, skip_serializing)]
    admin_state_up: Option<bool>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Resource for HealthMonitor {
    fn id(&self) -> &str {
        &self.id
    }
}

impl HealthMonitor {
    /// Administrative state under either spelling, the SDK one taking precedence
    pub fn admin_state_up(&self) -> Option<bool> {
        self.is_admin_state_up.or(self.admin_state_up)
    }

    /// Observed value of an updatable API field
    fn field(&self, field: &str) -> Value {
        let value = match field {
            "delay" => self.delay.map(Value::from),
            "max_retries" => self.max_retries.map(Value::from),
            "max_retries_down" => self.max_retries_down.map(Value::from),
            "timeout" => self.timeout.map(Value::from),
            "http_method" => self.http_method.clone().map(Value::from),
            "url_path" => self.url_path.clone().map(Value::from),
            "expected_codes" => self.expected_codes.clone().map(Value::from),
            "is_admin_state_up" => self.admin_state_up().map(Value::from),
            _ => None,
        };
        value.unwrap_or(Value::Null)
    }
}

pub struct HealthMonitorModule;

#[async_trait]
impl Reconcile for HealthMonitorModule {
    type Record = HealthMonitor;

    fn kind(&self) -> ResourceKind {
        ResourceKind::HealthMonitor
    }

    fn module_name(&self) -> &'static str {
        "lb_health_monitor"
    }

    fn result_key(&self) -> &'static str {
        "health_monitor"
    }

    fn argument_spec(&self) -> ArgumentSpec {
        ArgumentSpec::cloud_module()
            .state()
            .param(ParamSpec::str("name").required())
            .param(ParamSpec::str("pool"))
            .param(
                ParamSpec::str("type")
                    .choices(MONITOR_TYPES)
                    .alias("monitor_type"),
            )
            .param(ParamSpec::int("delay"))
            .param(ParamSpec::int("max_retries"))
            .param(ParamSpec::int("max_retries_down"))
            .param(ParamSpec::int("resp_timeout"))
            .param(ParamSpec::str("http_method"))
            .param(ParamSpec::str("url_path"))
            .param(ParamSpec::str("expected_codes"))
            .param(ParamSpec::bool("admin_state_up").alias("is_admin_state_up"))
            .required_if(
                "state",
                "present",
                &["pool", "type", "delay", "max_retries", "resp_timeout"],
            )
    }

    async fn create_body(
        &self,
        inv: &Invocation<'_>,
        _scope: &Filters,
    ) -> Result<Map<String, Value>> {
        let mut body = Map::new();
        copy_params(&inv.params, &[("name", "name"), ("type", "type")], &mut body);
        copy_params(&inv.params, UPDATABLE, &mut body);
        if let Some(pool) =
            locator::resolve_opt(inv.cloud, ResourceKind::Pool, inv.params.str("pool")).await?
        {
            body.insert("pool_id".to_string(), Value::from(pool));
        }
        Ok(body)
    }

    async fn diff(
        &self,
        inv: &Invocation<'_>,
        desired: &Params,
        current: &HealthMonitor,
    ) -> Result<Diff> {
        let mut diff = Diff::new(self.kind());
        for (param, field) in UPDATABLE {
            diff.update(field, desired.get(param), &current.field(field));
        }
        diff.immutable("type", desired.get("type"), &current.monitor_type);

        if let Some(pool) =
            locator::resolve_opt(inv.cloud, ResourceKind::Pool, desired.str("pool")).await?
        {
            if current.pool_id.as_deref() != Some(pool.as_str()) {
                diff.reject("pool");
            }
        }
        Ok(diff)
    }

    fn wait_policy(&self) -> Option<WaitPolicy> {
        Some(PROVISIONING_WAIT)
    }

    fn present_value(&self, record: &HealthMonitor) -> Value {
        let mut value = serde_json::to_value(record).unwrap_or(Value::Null);
        if let Value::Object(map) = &mut value {
            let admin_state_up = record.field("is_admin_state_up");
            map.insert("is_admin_state_up".to_string(), admin_state_up.clone());
            map.insert("admin_state_up".to_string(), admin_state_up);
        }
        value
    }
}
