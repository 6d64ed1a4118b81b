// # Volume Module
//
// Ensures a block storage volume exists.
//
// A new volume is either blank or built from exactly one source: an image,
// a volume snapshot or another volume. Existing volumes can only grow;
// asking for a smaller size is an immutable-field error, as are changes to
// the volume type, availability zone or multi-attach flag.
//
// The block storage API reports `bootable` as the string "true"/"false".
// Flags are read under either name, sent under the SDK name and returned
// under both.

use async_trait::async_trait;
use osmod_core::locator;
use osmod_core::{
    ArgumentSpec, Diff, Filters, Invocation, ParamSpec, Params, Reconcile, Resource, ResourceKind,
    Result, WaitPolicy,
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::util::{copy_params, lenient_bool};

const VOLUME_WAIT: WaitPolicy = WaitPolicy::new("status", &["available", "in-use"], &["error"]);

/// Volume snapshot as returned by the block storage API
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Volume {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub size: Option<i64>,
    #[serde(default)]
    pub volume_type: Option<String>,
    #[serde(default)]
    pub availability_zone: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub metadata: Option<Map<String, Value>>,
    #[serde(default, deserialize_with = "lenient_bool")]
    pub is_bootable: Option<bool>,
    #[serde(default)]
    pub is_multiattach: Option<bool>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default, skip_serializing, deserialize_with = "lenient_bool")]
    bootable: Option<bool>,
    #[serde(default, skip_serializing)]
    multiattach: Option<bool>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Resource for Volume {
    fn id(&self) -> &str {
        &self.id
    }
}

impl Volume {
    pub fn bootable(&self) -> Option<bool> {
        self.is_bootable.or(self.bootable)
    }

    pub fn multiattach(&self) -> Option<bool> {
        self.is_multiattach.or(self.multiattach)
    }
}

pub struct VolumeModule;

#[async_trait]
impl Reconcile for VolumeModule {
    type Record = Volume;

    fn kind(&self) -> ResourceKind {
        ResourceKind::Volume
    }

    fn module_name(&self) -> &'static str {
        "volume"
    }

    fn result_key(&self) -> &'static str {
        "volume"
    }

    fn argument_spec(&self) -> ArgumentSpec {
        ArgumentSpec::cloud_module()
            .state()
            .param(ParamSpec::str("name").required().alias("display_name"))
            .param(ParamSpec::int("size"))
            .param(ParamSpec::str("volume_type"))
            .param(ParamSpec::str("image"))
            .param(ParamSpec::str("snapshot").alias("snapshot_id"))
            .param(ParamSpec::str("volume"))
            .param(ParamSpec::str("availability_zone"))
            .param(ParamSpec::str("description").alias("display_description"))
            .param(ParamSpec::dict("metadata"))
            .param(ParamSpec::bool("is_bootable").alias("bootable"))
            .param(ParamSpec::bool("is_multiattach"))
            .mutually_exclusive(&["image", "snapshot", "volume"])
            .required_if("state", "present", &["size"])
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
                ("size", "size"),
                ("volume_type", "volume_type"),
                ("availability_zone", "availability_zone"),
                ("description", "description"),
                ("metadata", "metadata"),
                ("is_bootable", "is_bootable"),
                ("is_multiattach", "is_multiattach"),
            ],
            &mut body,
        );

        let sources = [
            ("image", ResourceKind::Image, "image_id"),
            ("snapshot", ResourceKind::VolumeSnapshot, "snapshot_id"),
            ("volume", ResourceKind::Volume, "source_volid"),
        ];
        for (param, kind, field) in sources {
            if let Some(id) = locator::resolve_opt(inv.cloud, kind, inv.params.str(param)).await? {
                body.insert(field.to_string(), Value::from(id));
            }
        }
        Ok(body)
    }

    async fn diff(
        &self,
        _inv: &Invocation<'_>,
        desired: &Params,
        current: &Volume,
    ) -> Result<Diff> {
        let mut diff = Diff::new(self.kind());
        diff.update("description", desired.get("description"), &current.description)
            .update("metadata", desired.get("metadata"), &current.metadata)
            .update("is_bootable", desired.get("is_bootable"), &current.bootable())
            .immutable("volume_type", desired.get("volume_type"), &current.volume_type)
            .immutable(
                "availability_zone",
                desired.get("availability_zone"),
                &current.availability_zone,
            )
            .immutable(
                "is_multiattach",
                desired.get("is_multiattach"),
                &current.multiattach(),
            );

        if let (Some(size), Some(observed)) = (desired.int("size"), current.size) {
            if size > observed {
                diff.set("size", size);
            } else if size < observed {
                diff.reject("size");
            }
        }
        Ok(diff)
    }

    fn wait_policy(&self) -> Option<WaitPolicy> {
        Some(VOLUME_WAIT)
    }

    fn wait_on_delete(&self) -> bool {
        true
    }

    fn present_value(&self, record: &Volume) -> Value {
        let mut value = serde_json::to_value(record).unwrap_or(Value::Null);
        if let Value::Object(map) = &mut value {
            let flags = [
                ("is_bootable", "bootable", record.bootable()),
                ("is_multiattach", "multiattach", record.multiattach()),
            ];
            for (field, api_field, observed) in flags {
                let observed = observed.map(Value::from).unwrap_or(Value::Null);
                map.insert(field.to_string(), observed.clone());
                map.insert(api_field.to_string(), observed);
            }
        }
        value
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::testing::{run, run_with};
    use osmod_core::{CloudClient, Error, MemoryCloud};
    use serde_json::json;

    #[tokio::test]
    async fn test_create_from_snapshot() {
        let cloud = MemoryCloud::new().with_settle_polls(2);
        let snapshot = cloud
            .seed(
                ResourceKind::VolumeSnapshot,
                json!({"name": "nightly", "status": "available"}),
            )
            .await;

        let result = run(
            VolumeModule,
            &cloud,
            json!({"name": "data", "size": 10, "snapshot": "nightly"}),
        )
        .await
        .unwrap();

        assert!(result.changed);
        let volume = result.get("volume").unwrap();
        assert_eq!(volume["status"], json!("available"));
        assert_eq!(volume["snapshot_id"], json!(snapshot));
    }

    #[tokio::test]
    async fn test_missing_source_image() {
        let cloud = MemoryCloud::new();
        let err = run(
            VolumeModule,
            &cloud,
            json!({"name": "data", "size": 10, "image": "cirros"}),
        )
        .await
        .unwrap_err();

        assert!(matches!(err, Error::Precondition { kind: ResourceKind::Image, .. }));
        assert!(cloud.is_empty().await);
    }

    #[tokio::test]
    async fn test_sources_are_exclusive() {
        let cloud = MemoryCloud::new();
        let err = run(
            VolumeModule,
            &cloud,
            json!({"name": "data", "size": 10, "image": "cirros", "volume": "base"}),
        )
        .await
        .unwrap_err();
        assert!(err.is_validation());
    }

    #[tokio::test]
    async fn test_size_only_grows() {
        let cloud = MemoryCloud::new().with_settle_polls(0);
        let id = cloud
            .seed(
                ResourceKind::Volume,
                json!({"name": "data", "size": 10, "status": "available"}),
            )
            .await;

        let grown = run(VolumeModule, &cloud, json!({"name": "data", "size": 20}))
            .await
            .unwrap();
        assert!(grown.changed);
        let stored = cloud.get(ResourceKind::Volume, &id).await.unwrap().unwrap();
        assert_eq!(stored["size"], json!(20));

        let err = run(VolumeModule, &cloud, json!({"name": "data", "size": 5}))
            .await
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "cannot update immutable volume attributes: size"
        );
    }

    #[tokio::test]
    async fn test_string_bootable_flag() {
        let cloud = MemoryCloud::new();
        cloud
            .seed(
                ResourceKind::Volume,
                json!({"name": "boot", "size": 1, "bootable": "true", "status": "available"}),
            )
            .await;

        let result = run(
            VolumeModule,
            &cloud,
            json!({"name": "boot", "size": 1, "is_bootable": true}),
        )
        .await
        .unwrap();
        assert!(!result.changed);
        assert_eq!(result.get("volume").unwrap()["is_bootable"], json!(true));
    }

    #[tokio::test]
    async fn test_api_spelling_survives_update() {
        let cloud = MemoryCloud::new().with_settle_polls(0);
        let id = cloud
            .seed(
                ResourceKind::Volume,
                json!({
                    "name": "boot", "size": 1, "status": "available",
                    "bootable": "false", "multiattach": false,
                }),
            )
            .await;
        let args = json!({"name": "boot", "size": 1, "is_bootable": true, "is_multiattach": false});

        let first = run(VolumeModule, &cloud, args.clone()).await.unwrap();
        assert!(first.changed);
        let volume = first.get("volume").unwrap();
        assert_eq!(volume["is_bootable"], json!(true));
        assert_eq!(volume["bootable"], json!(true));

        let second = run(VolumeModule, &cloud, args).await.unwrap();
        assert!(!second.changed, "unexpected result: {:?}", second);

        let stored = cloud.get(ResourceKind::Volume, &id).await.unwrap().unwrap();
        assert_eq!(stored["bootable"], json!("false"));
        assert_eq!(stored["is_bootable"], json!(true));
    }

    #[tokio::test]
    async fn test_check_mode_delete() {
        let cloud = MemoryCloud::new();
        cloud
            .seed(ResourceKind::Volume, json!({"name": "data", "size": 1}))
            .await;

        let result = run_with(
            VolumeModule,
            &cloud,
            json!({"name": "data", "state": "absent"}),
            true,
        )
        .await
        .unwrap();
        assert!(result.changed);
        assert_eq!(cloud.len().await, 1);

        let result = run(VolumeModule, &cloud, json!({"name": "data", "state": "absent"}))
            .await
            .unwrap();
        assert!(result.changed);
        assert!(cloud.is_empty().await);
    }
}
