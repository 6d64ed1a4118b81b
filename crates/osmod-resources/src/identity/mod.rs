//! Identity service (projects)

mod project;

pub(crate) use project::present;
pub use project::{Project, ProjectModule};

use osmod_core::locator;
use osmod_core::{Filters, Invocation, ResourceKind, Result};

/// Lookup scope from the optional `domain` parameter
pub(crate) async fn domain_scope(inv: &Invocation<'_>) -> Result<Filters> {
    match inv.params.str("domain") {
        Some(domain) => {
            let id = locator::resolve_id(inv.cloud, ResourceKind::Domain, domain, &Filters::new())
                .await?;
            Ok(Filters::new().with("domain_id", id))
        }
        None => Ok(Filters::new()),
    }
}
