// # Project Module
//
// Ensures an identity project exists, optionally inside a domain.
//
// The identity API calls the flag `enabled` while the SDK calls it
// `is_enabled`. Both names are accepted as parameters, read from the
// observed project and returned.

use async_trait::async_trait;
use osmod_core::{
    ArgumentSpec, Diff, Filters, Invocation, ParamSpec, Params, Reconcile, Resource, ResourceKind,
    Result,
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::domain_scope;
use crate::util::copy_params;

/// Project snapshot
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Project {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub domain_id: Option<String>,
    #[serde(default)]
    pub is_enabled: Option<bool>,
    /// Identity API spelling of `is_enabled`
    #[serde(default, skip_serializing)]
    enabled: Option<bool>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Resource for Project {
    fn id(&self) -> &str {
        &self.id
    }
}

impl Project {
    /// Enabled flag under either spelling, the SDK one taking precedence
    pub fn enabled(&self) -> Option<bool> {
        self.is_enabled.or(self.enabled)
    }
}

/// Project as returned to the caller, with the `enabled` mirror
pub(crate) fn present(project: &Project) -> Value {
    let mut value = serde_json::to_value(project).unwrap_or(Value::Null);
    if let Value::Object(map) = &mut value {
        let enabled = project.enabled().map(Value::from).unwrap_or(Value::Null);
        map.insert("is_enabled".to_string(), enabled.clone());
        map.insert("enabled".to_string(), enabled);
    }
    value
}

pub struct ProjectModule;

#[async_trait]
impl Reconcile for ProjectModule {
    type Record = Project;

    fn kind(&self) -> ResourceKind {
        ResourceKind::Project
    }

    fn module_name(&self) -> &'static str {
        "project"
    }

    fn result_key(&self) -> &'static str {
        "project"
    }

    fn argument_spec(&self) -> ArgumentSpec {
        ArgumentSpec::cloud_module()
            .state()
            .param(ParamSpec::str("name").required())
            .param(ParamSpec::str("domain").alias("domain_id"))
            .param(ParamSpec::str("description"))
            .param(ParamSpec::bool("is_enabled").alias("enabled").default(true))
    }

    async fn scope(&self, inv: &Invocation<'_>) -> Result<Filters> {
        domain_scope(inv).await
    }

    async fn create_body(
        &self,
        inv: &Invocation<'_>,
        scope: &Filters,
    ) -> Result<Map<String, Value>> {
        let mut body = Map::new();
        copy_params(
            &inv.params,
            &[
                ("name", "name"),
                ("description", "description"),
                ("is_enabled", "is_enabled"),
            ],
            &mut body,
        );
        for (field, value) in scope.iter() {
            body.insert(field.clone(), value.clone());
        }
        Ok(body)
    }

    async fn diff(
        &self,
        _inv: &Invocation<'_>,
        desired: &Params,
        current: &Project,
    ) -> Result<Diff> {
        let mut diff = Diff::new(self.kind());
        diff.update("description", desired.get("description"), &current.description)
            .update("is_enabled", desired.get("is_enabled"), &current.enabled());
        Ok(diff)
    }

    fn present_value(&self, record: &Project) -> Value {
        present(record)
    }
}
