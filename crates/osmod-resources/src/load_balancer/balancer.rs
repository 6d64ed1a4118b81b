// # Load Balancer Module
//
// Ensures a load balancer exists on a VIP network, subnet or port.
//
// Related VIP resources are given by name or ID and resolved before any
// change. Everything that places the load balancer (VIP, provider, flavor,
// availability zone) is fixed at creation; only the description and the
// administrative state can be updated.

use async_trait::async_trait;
use osmod_core::locator;
use osmod_core::{
    ArgumentSpec, Diff, Filters, Invocation, ModuleResult, ParamSpec, Params, Reconcile,
    Resource, ResourceKind, Result, WaitPolicy,
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::PROVISIONING_WAIT;
use crate::util::copy_params;

/// Load balancer snapshot
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoadBalancer {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub vip_network_id: Option<String>,
    #[serde(default)]
    pub vip_subnet_id: Option<String>,
    #[serde(default)]
    pub vip_port_id: Option<String>,
    #[serde(default)]
    pub vip_address: Option<String>,
    #[serde(default)]
    pub provider: Option<String>,
    #[serde(default)]
    pub flavor_id: Option<String>,
    #[serde(default)]
    pub availability_zone: Option<String>,
    #[serde(default)]
    pub is_admin_state_up: Option<bool>,
    #[serde(default)]
    pub provisioning_status: Option<String>,
    #[serde(default)]
    pub operating_status: Option<String>,
    /// API spelling of `is_admin_state_up`
    #[serde(default, skip_serializing)]
    admin_state_up: Option<bool>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Resource for LoadBalancer {
    fn id(&self) -> &str {
        &self.id
    }
}

impl LoadBalancer {
    /// Administrative state under either spelling, the SDK one taking precedence
    pub fn admin_state_up(&self) -> Option<bool> {
        self.is_admin_state_up.or(self.admin_state_up)
    }
}

/// VIP parameter, kind it names and the field holding its ID
const VIP_REFERENCES: &[(&str, ResourceKind, &str)] = &[
    ("vip_network", ResourceKind::Network, "vip_network_id"),
    ("vip_subnet", ResourceKind::Subnet, "vip_subnet_id"),
    ("vip_port", ResourceKind::Port, "vip_port_id"),
];

/// Resolve the supplied VIP references to `(field, id)` pairs
async fn vip_ids(inv: &Invocation<'_>, params: &Params) -> Result<Vec<(&'static str, String)>> {
    let mut ids = Vec::new();
    for (param, kind, field) in VIP_REFERENCES {
        if let Some(id) = locator::resolve_opt(inv.cloud, *kind, params.str(param)).await? {
            ids.push((*field, id));
        }
    }
    Ok(ids)
}

pub struct LoadBalancerModule;

#[async_trait]
impl Reconcile for LoadBalancerModule {
    type Record = LoadBalancer;

    fn kind(&self) -> ResourceKind {
        ResourceKind::LoadBalancer
    }

    fn module_name(&self) -> &'static str {
        "load_balancer"
    }

    fn result_key(&self) -> &'static str {
        "load_balancer"
    }

    fn argument_spec(&self) -> ArgumentSpec {
        ArgumentSpec::cloud_module()
            .state()
            .param(ParamSpec::str("name").required())
            .param(ParamSpec::str("description"))
            .param(ParamSpec::str("vip_network"))
            .param(ParamSpec::str("vip_subnet"))
            .param(ParamSpec::str("vip_port"))
            .param(ParamSpec::str("vip_address"))
            .param(ParamSpec::str("provider"))
            .param(ParamSpec::str("flavor"))
            .param(ParamSpec::str("availability_zone"))
            .param(ParamSpec::bool("admin_state_up").alias("is_admin_state_up"))
            .required_if_any("state", "present", &["vip_network", "vip_subnet", "vip_port"])
    }

    async fn create_body(
        &self,
        inv: &Invocation<'_>,
        _scope: &Filters,
    ) -> Result<Map<String, Value>> {
        let mut body = Map::new();
        copy_params(
            &inv.params,
            &[
                ("name", "name"),
                ("description", "description"),
                ("vip_address", "vip_address"),
                ("provider", "provider"),
                ("flavor", "flavor_id"),
                ("availability_zone", "availability_zone"),
                ("admin_state_up", "is_admin_state_up"),
            ],
            &mut body,
        );
        for (field, id) in vip_ids(inv, &inv.params).await? {
            body.insert(field.to_string(), Value::from(id));
        }
        Ok(body)
    }

    async fn diff(
        &self,
        inv: &Invocation<'_>,
        desired: &Params,
        current: &LoadBalancer,
    ) -> Result<Diff> {
        let mut diff = Diff::new(self.kind());
        diff.update("description", desired.get("description"), &current.description)
            .update(
                "is_admin_state_up",
                desired.get("admin_state_up"),
                &current.admin_state_up(),
            )
            .immutable("vip_address", desired.get("vip_address"), &current.vip_address)
            .immutable("provider", desired.get("provider"), &current.provider)
            .immutable("flavor", desired.get("flavor"), &current.flavor_id)
            .immutable(
                "availability_zone",
                desired.get("availability_zone"),
                &current.availability_zone,
            );

        for (field, id) in vip_ids(inv, desired).await? {
            let observed = match field {
                "vip_network_id" => &current.vip_network_id,
                "vip_subnet_id" => &current.vip_subnet_id,
                _ => &current.vip_port_id,
            };
            if observed.as_deref() != Some(id.as_str()) {
                diff.reject(field.trim_end_matches("_id"));
            }
        }
        Ok(diff)
    }

    fn wait_policy(&self) -> Option<WaitPolicy> {
        Some(PROVISIONING_WAIT)
    }

    fn wait_on_delete(&self) -> bool {
        true
    }

    fn present_value(&self, record: &LoadBalancer) -> Value {
        let mut value = serde_json::to_value(record).unwrap_or(Value::Null);
        if let Value::Object(map) = &mut value {
            let admin_state_up = record
                .admin_state_up()
                .map(Value::from)
                .unwrap_or(Value::Null);
            map.insert("is_admin_state_up".to_string(), admin_state_up.clone());
            map.insert("admin_state_up".to_string(), admin_state_up);
        }
        value
    }

    fn extra_returns(&self, record: &LoadBalancer, result: ModuleResult) -> ModuleResult {
        result.with("id", record.id.clone())
    }
}
