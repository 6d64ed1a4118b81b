// # DNS Zone Module
//
// Ensures a DNS zone exists with the given SOA settings.
//
// Zones go through `PENDING` after every change; the module waits for
// `ACTIVE` unless `wait` is false. The zone type (primary or secondary)
// cannot change after creation.

use async_trait::async_trait;
use osmod_core::{
    ArgumentSpec, Diff, Filters, Invocation, ParamSpec, ParamType, Params, Reconcile, Resource,
    ResourceKind, Result, WaitPolicy,
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::util::copy_params;

const ZONE_WAIT: WaitPolicy = WaitPolicy::new("status", &["ACTIVE"], &["ERROR"]);

/// Zone snapshot
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Zone {
    pub id: String,
    pub name: String,
    #[serde(default, rename = "type")]
    pub zone_type: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub ttl: Option<i64>,
    #[serde(default)]
    pub masters: Option<Vec<String>>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Resource for Zone {
    fn id(&self) -> &str {
        &self.id
    }
}

pub struct ZoneModule;

#[async_trait]
impl Reconcile for ZoneModule {
    type Record = Zone;

    fn kind(&self) -> ResourceKind {
        ResourceKind::Zone
    }

    fn module_name(&self) -> &'static str {
        "dns_zone"
    }

    fn result_key(&self) -> &'static str {
        "zone"
    }

    fn argument_spec(&self) -> ArgumentSpec {
        ArgumentSpec::cloud_module()
            .state()
            .param(ParamSpec::str("name").required())
            .param(
                ParamSpec::str("zone_type")
                    .choices(&["primary", "secondary"])
                    .alias("type"),
            )
            .param(ParamSpec::str("email"))
            .param(ParamSpec::str("description"))
            .param(ParamSpec::int("ttl"))
            .param(ParamSpec::list("masters", ParamType::Str))
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
                ("email", "email"),
                ("description", "description"),
                ("ttl", "ttl"),
                ("masters", "masters"),
            ],
            &mut body,
        );
        if let Some(zone_type) = inv.params.str("zone_type") {
            body.insert("type".to_string(), Value::from(zone_type.to_uppercase()));
        }
        Ok(body)
    }

    async fn diff(&self, _inv: &Invocation<'_>, desired: &Params, current: &Zone) -> Result<Diff> {
        let mut diff = Diff::new(self.kind());
        diff.update("email", desired.get("email"), &current.email)
            .update("description", desired.get("description"), &current.description)
            .update("ttl", desired.get("ttl"), &current.ttl)
            .update("masters", desired.get("masters"), &current.masters);

        // The API reports the type in upper case
        if let Some(zone_type) = desired.str("zone_type") {
            let observed = current.zone_type.as_deref().unwrap_or("PRIMARY");
            if !zone_type.eq_ignore_ascii_case(observed) {
                diff.reject("zone_type");
            }
        }
        Ok(diff)
    }

    fn wait_policy(&self) -> Option<WaitPolicy> {
        Some(ZONE_WAIT)
    }

    fn wait_on_delete(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::testing::run;
    use osmod_core::MemoryCloud;
    use serde_json::json;

    #[tokio::test]
    async fn test_create_waits_for_active() {
        let cloud = MemoryCloud::new().with_settle_polls(2);
        let result = run(
            ZoneModule,
            &cloud,
            json!({"name": "example.net.", "email": "admin@example.net", "ttl": 7200}),
        )
        .await
        .unwrap();

        let zone = result.get("zone").unwrap();
        assert_eq!(zone["status"], json!("ACTIVE"));
        assert_eq!(zone["ttl"], json!(7200));
        assert_eq!(zone["type"], json!("PRIMARY"));
    }

    #[tokio::test]
    async fn test_type_is_compared_case_insensitively() {
        let cloud = MemoryCloud::new();
        cloud
            .seed(
                ResourceKind::Zone,
                json!({"name": "example.net.", "type": "SECONDARY", "masters": ["10.0.0.1"]}),
            )
            .await;

        let same = run(
            ZoneModule,
            &cloud,
            json!({"name": "example.net.", "zone_type": "secondary", "masters": "10.0.0.1"}),
        )
        .await
        .unwrap();
        assert!(!same.changed);

        let err = run(
            ZoneModule,
            &cloud,
            json!({"name": "example.net.", "zone_type": "primary"}),
        )
        .await
        .unwrap_err();
        assert_eq!(
            err.to_string(),
            "cannot update immutable zone attributes: zone_type"
        );
    }

    #[tokio::test]
    async fn test_update_ttl() {
        let cloud = MemoryCloud::new().with_settle_polls(1);
        cloud
            .seed(
                ResourceKind::Zone,
                json!({"name": "example.net.", "ttl": 3600, "status": "ACTIVE"}),
            )
            .await;

        let result = run(ZoneModule, &cloud, json!({"name": "example.net.", "ttl": 300}))
            .await
            .unwrap();

        assert!(result.changed);
        let zone = result.get("zone").unwrap();
        assert_eq!(zone["ttl"], json!(300));
        assert_eq!(zone["status"], json!("ACTIVE"));
    }

    #[tokio::test]
    async fn test_error_status_fails() {
        let cloud = MemoryCloud::new();
        let id = cloud
            .seed(
                ResourceKind::Zone,
                json!({"name": "example.net.", "ttl": 3600, "status": "ACTIVE"}),
            )
            .await;
        let cloud = cloud.with_settle_polls(0);
        cloud
            .set_field(ResourceKind::Zone, &id, "status", json!("ERROR"))
            .await
            .unwrap();

        let err = run(ZoneModule, &cloud, json!({"name": "example.net.", "ttl": 60}))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("failure status ERROR"));
    }
}
