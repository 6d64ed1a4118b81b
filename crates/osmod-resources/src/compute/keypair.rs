// # Keypair Module
//
// Ensures an SSH keypair exists under the given name.
//
// The public key comes from `public_key` or is read from
// `public_key_file`. Without either, the cloud generates a key and returns
// the private half once, on creation. A keypair's key cannot be replaced:
// asking for a different public key is an error, delete the keypair first.

use async_trait::async_trait;
use osmod_core::{
    ArgumentSpec, Diff, Error, Filters, Invocation, ModuleResult, ParamSpec, Params, Reconcile,
    Resource, ResourceKind, Result,
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Keypair snapshot
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Keypair {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub public_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub private_key: Option<String>,
    #[serde(default)]
    pub fingerprint: Option<String>,
    #[serde(default, rename = "type")]
    pub key_type: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Resource for Keypair {
    fn id(&self) -> &str {
        &self.id
    }
}

/// Public key from the parameters, reading `public_key_file` if given
async fn desired_public_key(params: &Params) -> Result<Option<String>> {
    if let Some(key) = params.str("public_key") {
        return Ok(Some(key.trim().to_string()));
    }
    match params.str("public_key_file") {
        Some(path) => {
            let key = tokio::fs::read_to_string(path).await.map_err(|e| {
                Error::validation(format!("unable to read public_key_file {}: {}", path, e))
            })?;
            Ok(Some(key.trim().to_string()))
        }
        None => Ok(None),
    }
}

pub struct KeypairModule;

#[async_trait]
impl Reconcile for KeypairModule {
    type Record = Keypair;

    fn kind(&self) -> ResourceKind {
        ResourceKind::Keypair
    }

    fn module_name(&self) -> &'static str {
        "keypair"
    }

    fn result_key(&self) -> &'static str {
        "keypair"
    }

    fn argument_spec(&self) -> ArgumentSpec {
        ArgumentSpec::cloud_module()
            .state()
            .param(ParamSpec::str("name").required())
            .param(ParamSpec::str("public_key"))
            .param(ParamSpec::str("public_key_file"))
            .mutually_exclusive(&["public_key", "public_key_file"])
    }

    async fn create_body(
        &self,
        inv: &Invocation<'_>,
        _scope: &Filters,
    ) -> Result<Map<String, Value>> {
        let mut body = Map::new();
        if let Some(name) = inv.params.get("name") {
            body.insert("name".to_string(), name.clone());
        }
        if let Some(key) = desired_public_key(&inv.params).await? {
            body.insert("public_key".to_string(), Value::from(key));
        }
        Ok(body)
    }

    async fn diff(
        &self,
        _inv: &Invocation<'_>,
        desired: &Params,
        current: &Keypair,
    ) -> Result<Diff> {
        let mut diff = Diff::new(self.kind());
        if let Some(key) = desired_public_key(desired).await? {
            let observed = current.public_key.as_deref().map(str::trim);
            if observed != Some(key.as_str()) {
                diff.reject("public_key");
            }
        }
        Ok(diff)
    }

    fn extra_returns(&self, record: &Keypair, result: ModuleResult) -> ModuleResult {
        result.with("id", record.id.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::testing::run;
    use osmod_core::MemoryCloud;
    use serde_json::json;
    use std::io::Write;

    const KEY: &str = "ssh-ed25519 AAAAC3NzaC1lZDI1NTE5AAAAIOr deploy@example";

    #[tokio::test]
    async fn test_generated_key_returns_private_half_once() {
        let cloud = MemoryCloud::new();
        let created = run(KeypairModule, &cloud, json!({"name": "deploy"}))
            .await
            .unwrap();

        assert!(created.changed);
        assert_eq!(created.get("id"), Some(&json!("deploy")));
        assert!(created.get("keypair").unwrap()["private_key"].is_string());

        let again = run(KeypairModule, &cloud, json!({"name": "deploy"}))
            .await
            .unwrap();
        assert!(!again.changed);
        assert!(again.get("keypair").unwrap().get("private_key").is_none());
    }

    #[tokio::test]
    async fn test_key_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "{}", KEY).unwrap();
        let path = file.path().to_str().unwrap().to_string();

        let cloud = MemoryCloud::new();
        let created = run(
            KeypairModule,
            &cloud,
            json!({"name": "deploy", "public_key_file": path}),
        )
        .await
        .unwrap();
        assert_eq!(created.get("keypair").unwrap()["public_key"], json!(KEY));

        // Trailing newline in the file does not count as a difference
        let again = run(
            KeypairModule,
            &cloud,
            json!({"name": "deploy", "public_key": KEY}),
        )
        .await
        .unwrap();
        assert!(!again.changed);
    }

    #[tokio::test]
    async fn test_different_key_is_rejected() {
        let cloud = MemoryCloud::new();
        cloud
            .seed(ResourceKind::Keypair, json!({"name": "deploy", "public_key": KEY}))
            .await;

        let err = run(
            KeypairModule,
            &cloud,
            json!({"name": "deploy", "public_key": "ssh-rsa AAAAB3Nza other"}),
        )
        .await
        .unwrap_err();
        assert_eq!(
            err.to_string(),
            "cannot update immutable keypair attributes: public_key"
        );
    }

    #[tokio::test]
    async fn test_key_sources_are_exclusive() {
        let cloud = MemoryCloud::new();
        let err = run(
            KeypairModule,
            &cloud,
            json!({"name": "deploy", "public_key": KEY, "public_key_file": "/tmp/key.pub"}),
        )
        .await
        .unwrap_err();
        assert!(err.is_validation());
    }
}
