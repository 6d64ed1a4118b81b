// # Security Group Module
//
// Ensures a security group exists with the given description and
// statefulness, optionally inside a named project.
//
// Only `description` and `stateful` can change after creation. The project
// is part of the lookup scope, so the same name in another project is a
// different group.

use async_trait::async_trait;
use osmod_core::{
    ArgumentSpec, Diff, Filters, Invocation, ParamSpec, Params, Reconcile, Resource, ResourceKind,
    Result,
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::project_scope;
use crate::util::copy_params;

/// Security group snapshot
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityGroup {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub stateful: Option<bool>,
    #[serde(default)]
    pub project_id: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Resource for SecurityGroup {
    fn id(&self) -> &str {
        &self.id
    }
}

pub struct SecurityGroupModule;

#[async_trait]
impl Reconcile for SecurityGroupModule {
    type Record = SecurityGroup;

    fn kind(&self) -> ResourceKind {
        ResourceKind::SecurityGroup
    }

    fn module_name(&self) -> &'static str {
        "security_group"
    }

    fn result_key(&self) -> &'static str {
        "security_group"
    }

    fn argument_spec(&self) -> ArgumentSpec {
        ArgumentSpec::cloud_module()
            .state()
            .param(ParamSpec::str("name").required())
            .param(ParamSpec::str("description"))
            .param(ParamSpec::str("project"))
            .param(ParamSpec::bool("stateful"))
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
        copy_params(
            &inv.params,
            &[
                ("name", "name"),
                ("description", "description"),
                ("stateful", "stateful"),
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
        current: &SecurityGroup,
    ) -> Result<Diff> {
        let mut diff = Diff::new(self.kind());
        diff.update("description", desired.get("description"), &current.description)
            .update("stateful", desired.get("stateful"), &current.stateful);
        Ok(diff)
    }
}
