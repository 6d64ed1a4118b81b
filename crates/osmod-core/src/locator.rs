//! Resource lookup by name or ID
//!
//! A lookup key is tried as an ID first and then as a name. The optional
//! scope filters (project, domain, pool, ...) apply to both paths. Finding
//! more than one match is a user error and is never resolved by picking one.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

use crate::error::{Error, Result};
use crate::traits::{CloudClient, Filters, ResourceKind};

/// Minimal view of a related resource
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reference {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Deserialize a raw snapshot into a typed record
///
/// A snapshot that does not fit the record is a malformed server response
/// and is reported as a cloud error.
pub fn decode<T: DeserializeOwned>(
    cloud: &dyn CloudClient,
    kind: ResourceKind,
    snapshot: Value,
) -> Result<T> {
    serde_json::from_value(snapshot).map_err(|e| {
        Error::cloud(
            cloud.cloud_name(),
            format!("malformed {} in server response: {}", kind, e),
        )
    })
}

/// Find zero or one resource by name or ID
///
/// # Returns
///
/// - `Ok(Some(T))`: Exactly one match
/// - `Ok(None)`: No match
/// - `Err(Error::Ambiguous)`: Several resources share the name
pub async fn find_one<T: DeserializeOwned>(
    cloud: &dyn CloudClient,
    kind: ResourceKind,
    name_or_id: &str,
    filters: &Filters,
) -> Result<Option<T>> {
    if let Some(snapshot) = cloud.get(kind, name_or_id).await? {
        let in_scope = snapshot
            .as_object()
            .is_some_and(|object| filters.matches(object));
        if in_scope {
            debug!("Found {} '{}' by id", kind, name_or_id);
            return decode(cloud, kind, snapshot).map(Some);
        }
    }

    let mut by_name = cloud
        .list(kind, &filters.clone().with("name", name_or_id))
        .await?;

    match by_name.len() {
        0 => {
            debug!("No {} named '{}'", kind, name_or_id);
            Ok(None)
        }
        1 => {
            let snapshot = by_name.remove(0);
            debug!("Found {} '{}' by name", kind, name_or_id);
            decode(cloud, kind, snapshot).map(Some)
        }
        count => Err(Error::ambiguous(kind, name_or_id, count)),
    }
}

/// Find exactly one resource, absence being a precondition error
pub async fn require<T: DeserializeOwned>(
    cloud: &dyn CloudClient,
    kind: ResourceKind,
    name_or_id: &str,
    filters: &Filters,
) -> Result<T> {
    find_one(cloud, kind, name_or_id, filters)
        .await?
        .ok_or_else(|| Error::precondition(kind, name_or_id))
}

/// Resolve a related resource to its ID
pub async fn resolve_id(
    cloud: &dyn CloudClient,
    kind: ResourceKind,
    name_or_id: &str,
    filters: &Filters,
) -> Result<String> {
    require::<Reference>(cloud, kind, name_or_id, filters)
        .await
        .map(|reference| reference.id)
}

/// Resolve an optional related resource to its ID
pub async fn resolve_opt(
    cloud: &dyn CloudClient,
    kind: ResourceKind,
    name_or_id: Option<&str>,
) -> Result<Option<String>> {
    match name_or_id {
        Some(key) => resolve_id(cloud, kind, key, &Filters::new()).await.map(Some),
        None => Ok(None),
    }
}
