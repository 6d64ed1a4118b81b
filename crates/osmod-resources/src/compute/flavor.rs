// # Compute Flavor Module
//
// Ensures a flavor exists with the given sizing.
//
// Sizing attributes (ram, vcpus, disk, ephemeral, swap, rxtx_factor,
// is_public, id) cannot change after creation; asking for a different
// value is an error. `description` and `extra_specs` are updated in place,
// `extra_specs` as a whole.
//
// The compute API reports "no swap" as an empty string, which is read as 0.
// `ephemeral` and `is_public` are also read under their extension names.

use async_trait::async_trait;
use osmod_core::{
    ArgumentSpec, Diff, Filters, Invocation, ParamSpec, Params, Reconcile, Resource, ResourceKind,
    Result,
};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::util::copy_params;

/// Flavor snapshot
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Flavor {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub ram: Option<i64>,
    #[serde(default)]
    pub vcpus: Option<i64>,
    #[serde(default)]
    pub disk: Option<i64>,
    #[serde(default)]
    pub ephemeral: Option<i64>,
    #[serde(default, deserialize_with = "swap_size")]
    pub swap: Option<i64>,
    #[serde(default)]
    pub rxtx_factor: Option<f64>,
    #[serde(default)]
    pub is_public: Option<bool>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub extra_specs: Option<Map<String, Value>>,
    #[serde(default, rename = "OS-FLV-EXT-DATA:ephemeral", skip_serializing)]
    ext_ephemeral: Option<i64>,
    #[serde(default, rename = "os-flavor-access:is_public", skip_serializing)]
    ext_is_public: Option<bool>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Resource for Flavor {
    fn id(&self) -> &str {
        &self.id
    }
}

impl Flavor {
    pub fn ephemeral_size(&self) -> Option<i64> {
        self.ephemeral.or(self.ext_ephemeral)
    }

    pub fn public(&self) -> Option<bool> {
        self.is_public.or(self.ext_is_public)
    }
}

fn swap_size<'de, D>(deserializer: D) -> std::result::Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) if s.is_empty() => Ok(Some(0)),
        Some(Value::String(s)) => s
            .parse()
            .map(Some)
            .map_err(|_| serde::de::Error::custom(format!("invalid swap size: {}", s))),
        Some(Value::Number(n)) => n
            .as_i64()
            .map(Some)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid swap size: {}", n))),
        Some(other) => Err(serde::de::Error::custom(format!(
            "invalid swap size: {}",
            other
        ))),
    }
}

pub struct FlavorModule;

#[async_trait]
impl Reconcile for FlavorModule {
    type Record = Flavor;

    fn kind(&self) -> ResourceKind {
        ResourceKind::Flavor
    }

    fn module_name(&self) -> &'static str {
        "compute_flavor"
    }

    fn result_key(&self) -> &'static str {
        "flavor"
    }

    fn argument_spec(&self) -> ArgumentSpec {
        ArgumentSpec::cloud_module()
            .state()
            .param(ParamSpec::str("name").required())
            .param(ParamSpec::str("id").default("auto").alias("flavorid"))
            .param(ParamSpec::int("ram"))
            .param(ParamSpec::int("vcpus"))
            .param(ParamSpec::int("disk").default(0))
            .param(ParamSpec::int("ephemeral").default(0))
            .param(ParamSpec::int("swap").default(0))
            .param(ParamSpec::float("rxtx_factor").default(1.0))
            .param(ParamSpec::bool("is_public").default(true))
            .param(ParamSpec::str("description"))
            .param(ParamSpec::dict("extra_specs"))
            .required_if("state", "present", &["ram", "vcpus"])
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
                ("id", "id"),
                ("ram", "ram"),
                ("vcpus", "vcpus"),
                ("disk", "disk"),
                ("ephemeral", "ephemeral"),
                ("swap", "swap"),
                ("rxtx_factor", "rxtx_factor"),
                ("is_public", "is_public"),
                ("description", "description"),
                ("extra_specs", "extra_specs"),
            ],
            &mut body,
        );
        Ok(body)
    }

    async fn diff(
        &self,
        _inv: &Invocation<'_>,
        desired: &Params,
        current: &Flavor,
    ) -> Result<Diff> {
        let mut diff = Diff::new(self.kind());
        diff.update("description", desired.get("description"), &current.description)
            .update("extra_specs", desired.get("extra_specs"), &current.extra_specs)
            .immutable("ram", desired.get("ram"), &current.ram)
            .immutable("vcpus", desired.get("vcpus"), &current.vcpus)
            .immutable("disk", desired.get("disk"), &current.disk)
            .immutable("ephemeral", desired.get("ephemeral"), &current.ephemeral_size())
            .immutable("swap", desired.get("swap"), &current.swap)
            .immutable("rxtx_factor", desired.get("rxtx_factor"), &current.rxtx_factor)
            .immutable("is_public", desired.get("is_public"), &current.public());

        // "auto" lets the cloud pick; any other ID must match
        if let Some(id) = desired.str("id") {
            if id != "auto" && id != current.id {
                diff.reject("id");
            }
        }
        Ok(diff)
    }

    fn present_value(&self, record: &Flavor) -> Value {
        let mut value = serde_json::to_value(record).unwrap_or(Value::Null);
        if let Value::Object(map) = &mut value {
            let ephemeral = record.ephemeral_size().map(Value::from);
            let is_public = record.public().map(Value::from);
            map.insert("ephemeral".to_string(), ephemeral.unwrap_or(Value::Null));
            map.insert("is_public".to_string(), is_public.unwrap_or(Value::Null));
        }
        value
    }
}
