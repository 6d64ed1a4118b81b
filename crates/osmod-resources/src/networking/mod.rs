//! Networking service (security groups, networks)

mod network;
mod security_group;

pub use network::{Network, NetworkModule};
pub use security_group::{SecurityGroup, SecurityGroupModule};

use osmod_core::locator;
use osmod_core::{Filters, Invocation, ResourceKind, Result};

/// Lookup scope from the optional `project` parameter
pub(crate) async fn project_scope(inv: &Invocation<'_>) -> Result<Filters> {
    match inv.params.str("project") {
        Some(project) => {
            let id =
                locator::resolve_id(inv.cloud, ResourceKind::Project, project, &Filters::new())
                    .await?;
            Ok(Filters::new().with("project_id", id))
        }
        None => Ok(Filters::new()),
    }
}
