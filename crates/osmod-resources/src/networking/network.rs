// # Network Module
//
// Ensures a network exists with the given administrative settings.
//
// The networking SDK reports booleans as `is_admin_state_up`,
// `is_router_external`, `is_shared` and `is_port_security_enabled`; they
// are read under either name, sent under the SDK name and returned under
// both. Provider attributes (network type, physical network, segmentation
// ID) are read as `provider_*` or `provider:*` and are fixed at creation.

use async_trait::async_trait;
use osmod_core::{
    ArgumentSpec, Diff, Filters, Invocation, ModuleResult, ParamSpec, Params, Reconcile, Resource,
    ResourceKind, Result,
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::project_scope;
use crate::util::copy_params;

/// Network snapshot
///
/// Flags are kept under both spellings as observed; the accessors prefer
/// the SDK name, which is the one this module writes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Network {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub is_admin_state_up: Option<bool>,
    #[serde(default)]
    pub is_router_external: Option<bool>,
    #[serde(default)]
    pub is_shared: Option<bool>,
    #[serde(default)]
    pub mtu: Option<i64>,
    #[serde(default)]
    pub is_port_security_enabled: Option<bool>,
    #[serde(default)]
    pub dns_domain: Option<String>,
    #[serde(default)]
    pub provider_network_type: Option<String>,
    #[serde(default)]
    pub provider_physical_network: Option<String>,
    #[serde(default)]
    pub provider_segmentation_id: Option<i64>,
    #[serde(default)]
    pub project_id: Option<String>,
    #[serde(default, skip_serializing)]
    admin_state_up: Option<bool>,
    #[serde(default, skip_serializing)]
    external: Option<bool>,
    #[serde(default, rename = "router:external", skip_serializing)]
    router_external: Option<bool>,
    #[serde(default, skip_serializing)]
    shared: Option<bool>,
    #[serde(default, skip_serializing)]
    port_security_enabled: Option<bool>,
    #[serde(default, rename = "provider:network_type", skip_serializing)]
    api_network_type: Option<String>,
    #[serde(default, rename = "provider:physical_network", skip_serializing)]
    api_physical_network: Option<String>,
    #[serde(default, rename = "provider:segmentation_id", skip_serializing)]
    api_segmentation_id: Option<i64>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Resource for Network {
    fn id(&self) -> &str {
        &self.id
    }
}

impl Network {
    pub fn admin_state_up(&self) -> Option<bool> {
        self.is_admin_state_up.or(self.admin_state_up)
    }

    pub fn external(&self) -> Option<bool> {
        self.is_router_external
            .or(self.external)
            .or(self.router_external)
    }

    pub fn shared(&self) -> Option<bool> {
        self.is_shared.or(self.shared)
    }

    pub fn port_security_enabled(&self) -> Option<bool> {
        self.is_port_security_enabled.or(self.port_security_enabled)
    }

    pub fn network_type(&self) -> Option<&str> {
        self.provider_network_type
            .as_deref()
            .or(self.api_network_type.as_deref())
    }

    pub fn physical_network(&self) -> Option<&str> {
        self.provider_physical_network
            .as_deref()
            .or(self.api_physical_network.as_deref())
    }

    pub fn segmentation_id(&self) -> Option<i64> {
        self.provider_segmentation_id.or(self.api_segmentation_id)
    }

    /// `(SDK name, parameter name, value)` for every flag
    fn flags(&self) -> [(&'static str, &'static str, Option<bool>); 4] {
        [
            ("is_admin_state_up", "admin_state_up", self.admin_state_up()),
            ("is_router_external", "external", self.external()),
            ("is_shared", "shared", self.shared()),
            (
                "is_port_security_enabled",
                "port_security_enabled",
                self.port_security_enabled(),
            ),
        ]
    }
}

/// Parameter name -> SDK field name
const FIELDS: &[(&str, &str)] = &[
    ("name", "name"),
    ("admin_state_up", "is_admin_state_up"),
    ("external", "is_router_external"),
    ("shared", "is_shared"),
    ("mtu", "mtu"),
    ("port_security_enabled", "is_port_security_enabled"),
    ("dns_domain", "dns_domain"),
    ("provider_network_type", "provider_network_type"),
    ("provider_physical_network", "provider_physical_network"),
    ("provider_segmentation_id", "provider_segmentation_id"),
];

pub struct NetworkModule;

#[async_trait]
impl Reconcile for NetworkModule {
    type Record = Network;

    fn kind(&self) -> ResourceKind {
        ResourceKind::Network
    }

    fn module_name(&self) -> &'static str {
        "network"
    }

    fn result_key(&self) -> &'static str {
        "network"
    }

    fn argument_spec(&self) -> ArgumentSpec {
        ArgumentSpec::cloud_module()
            .state()
            .param(ParamSpec::str("name").required())
            .param(ParamSpec::bool("admin_state_up"))
            .param(ParamSpec::bool("external"))
            .param(ParamSpec::bool("shared"))
            .param(ParamSpec::int("mtu").alias("mtu_size"))
            .param(ParamSpec::bool("port_security_enabled"))
            .param(ParamSpec::str("dns_domain"))
            .param(ParamSpec::str("provider_network_type"))
            .param(ParamSpec::str("provider_physical_network"))
            .param(ParamSpec::int("provider_segmentation_id"))
            .param(ParamSpec::str("project"))
            .required_together(&["provider_network_type", "provider_physical_network"])
    }

    async fn scope(&self, inv: &Invocation<'_>) -> Result<Filters> {
        project_scope(inv).await
    }

    async fn create_body(
        &self,
        inv: &Invocation<'_>,
        scope: &Filters,
    ) -> Result<Map<String, Value>> {
        let mut body = Map::new();
        copy_params(&inv.params, FIELDS, &mut body);
        for (field, value) in scope.iter() {
            body.insert(field.clone(), value.clone());
        }
        Ok(body)
    }

    async fn diff(
        &self,
        _inv: &Invocation<'_>,
        desired: &Params,
        current: &Network,
    ) -> Result<Diff> {
        let mut diff = Diff::new(self.kind());
        for (field, param, observed) in current.flags() {
            diff.update(field, desired.get(param), &observed);
        }
        diff.update("mtu", desired.get("mtu"), &current.mtu)
            .update("dns_domain", desired.get("dns_domain"), &current.dns_domain)
            .immutable(
                "provider_network_type",
                desired.get("provider_network_type"),
                &current.network_type(),
            )
            .immutable(
                "provider_physical_network",
                desired.get("provider_physical_network"),
                &current.physical_network(),
            )
            .immutable(
                "provider_segmentation_id",
                desired.get("provider_segmentation_id"),
                &current.segmentation_id(),
            );
        Ok(diff)
    }

    fn present_value(&self, record: &Network) -> Value {
        let mut value = serde_json::to_value(record).unwrap_or(Value::Null);
        if let Value::Object(map) = &mut value {
            for (field, param, observed) in record.flags() {
                let observed = observed.map(Value::from).unwrap_or(Value::Null);
                map.insert(field.to_string(), observed.clone());
                map.insert(param.to_string(), observed);
            }
            let provider = [
                ("provider_network_type", record.network_type().map(Value::from)),
                ("provider_physical_network", record.physical_network().map(Value::from)),
                ("provider_segmentation_id", record.segmentation_id().map(Value::from)),
            ];
            for (field, observed) in provider {
                map.insert(field.to_string(), observed.unwrap_or(Value::Null));
            }
        }
        value
    }

    fn extra_returns(&self, record: &Network, result: ModuleResult) -> ModuleResult {
        result.with("id", record.id.clone())
    }
}
