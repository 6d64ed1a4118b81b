// # Info Modules
//
// Read-only listing modules (`*_info`). They accept an optional name or ID
// and a dictionary of equality filters, return every matching resource
// under a plural key and never report a change. Check mode makes no
// difference to them.

use async_trait::async_trait;
use osmod_core::locator;
use osmod_core::{
    ArgumentSpec, Filters, Invocation, Module, ModuleResult, ParamSpec, Resource, ResourceKind,
    Result,
};
use serde_json::Value;
use tracing::debug;

use crate::block_storage::Volume;
use crate::compute::Flavor;
use crate::dns::Zone;
use crate::identity::{self, Project};
use crate::networking::SecurityGroup;

/// Lists resources of one kind
pub struct InfoModule<R> {
    name: &'static str,
    kind: ResourceKind,
    result_key: &'static str,
    present: fn(&R) -> Value,
}

impl<R: Resource> InfoModule<R> {
    pub fn new(name: &'static str, kind: ResourceKind, result_key: &'static str) -> Self {
        Self {
            name,
            kind,
            result_key,
            present: |record| serde_json::to_value(record).unwrap_or(Value::Null),
        }
    }

    /// Shape each returned resource
    pub fn with_present(mut self, present: fn(&R) -> Value) -> Self {
        self.present = present;
        self
    }
}

#[async_trait]
impl<R: Resource + 'static> Module for InfoModule<R> {
    fn name(&self) -> &'static str {
        self.name
    }

    fn argument_spec(&self) -> ArgumentSpec {
        ArgumentSpec::new()
            .param(ParamSpec::str("name").alias("id"))
            .param(ParamSpec::dict("filters"))
    }

    async fn run(&self, inv: &Invocation<'_>) -> Result<ModuleResult> {
        let mut filters = Filters::new();
        if let Some(extra) = inv.params.dict("filters") {
            for (field, value) in extra {
                filters.insert(field.clone(), value.clone());
            }
        }

        let key = inv.params.str("name");
        let mut found = Vec::new();
        for snapshot in inv.cloud.list(self.kind, &filters).await? {
            let matches = key.is_none_or(|key| {
                ["id", "name"]
                    .iter()
                    .any(|field| snapshot.get(field).and_then(Value::as_str) == Some(key))
            });
            if matches {
                let record: R = locator::decode(inv.cloud, self.kind, snapshot)?;
                found.push((self.present)(&record));
            }
        }

        debug!("{}: {} {} found", self.name, found.len(), self.kind);
        Ok(ModuleResult::unchanged().with(self.result_key, found))
    }
}

/// Every listing module
pub fn modules() -> Vec<Box<dyn Module>> {
    vec![
        Box::new(InfoModule::<SecurityGroup>::new(
            "security_group_info",
            ResourceKind::SecurityGroup,
            "security_groups",
        )),
        Box::new(InfoModule::<Flavor>::new(
            "compute_flavor_info",
            ResourceKind::Flavor,
            "flavors",
        )),
        Box::new(InfoModule::<Zone>::new(
            "dns_zone_info",
            ResourceKind::Zone,
            "zones",
        )),
        Box::new(
            InfoModule::<Project>::new("project_info", ResourceKind::Project, "projects")
                .with_present(identity::present),
        ),
        Box::new(InfoModule::<Volume>::new(
            "volume_info",
            ResourceKind::Volume,
            "volumes",
        )),
    ]
}
