// # Cloud Client Trait
//
// Defines the boundary to the external cloud SDK.
//
// ## Implementations
//
// - In-memory: `osmod_core::cloud::MemoryCloud`
// - JSON file: `osmod_core::cloud::FileCloud`
// - Real clouds: any adapter over an OpenStack SDK
//
// ## Usage
//
// ```rust,ignore
// use osmod_core::traits::{CloudClient, Filters, ResourceKind};
//
// async fn show(cloud: &dyn CloudClient) -> osmod_core::Result<()> {
//     let groups = cloud
//         .list(ResourceKind::SecurityGroup, &Filters::new().with("name", "web"))
//         .await?;
//     println!("{} match", groups.len());
//     Ok(())
// }
// ```

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;

/// Cloud resource kinds touched by modules and related-resource lookups
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    SecurityGroup,
    Network,
    Subnet,
    Port,
    Flavor,
    Keypair,
    Zone,
    Volume,
    VolumeSnapshot,
    Image,
    LoadBalancer,
    Pool,
    HealthMonitor,
    Project,
    Domain,
}

impl ResourceKind {
    /// All kinds, in declaration order
    pub const ALL: [ResourceKind; 15] = [
        ResourceKind::SecurityGroup,
        ResourceKind::Network,
        ResourceKind::Subnet,
        ResourceKind::Port,
        ResourceKind::Flavor,
        ResourceKind::Keypair,
        ResourceKind::Zone,
        ResourceKind::Volume,
        ResourceKind::VolumeSnapshot,
        ResourceKind::Image,
        ResourceKind::LoadBalancer,
        ResourceKind::Pool,
        ResourceKind::HealthMonitor,
        ResourceKind::Project,
        ResourceKind::Domain,
    ];

    /// Stable snake_case name
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceKind::SecurityGroup => "security_group",
            ResourceKind::Network => "network",
            ResourceKind::Subnet => "subnet",
            ResourceKind::Port => "port",
            ResourceKind::Flavor => "flavor",
            ResourceKind::Keypair => "keypair",
            ResourceKind::Zone => "zone",
            ResourceKind::Volume => "volume",
            ResourceKind::VolumeSnapshot => "volume_snapshot",
            ResourceKind::Image => "image",
            ResourceKind::LoadBalancer => "load_balancer",
            ResourceKind::Pool => "pool",
            ResourceKind::HealthMonitor => "health_monitor",
            ResourceKind::Project => "project",
            ResourceKind::Domain => "domain",
        }
    }

    /// Parse a snake_case name back into a kind
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|kind| kind.as_str() == name)
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Equality filters for `CloudClient::list`
///
/// A resource matches when every filter field is present on it with an
/// equal JSON value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filters(BTreeMap<String, Value>);

impl Filters {
    /// Create an empty filter set
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a filter
    pub fn with(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(field.into(), value.into());
        self
    }

    /// Add a filter only when a value is present
    pub fn with_opt(self, field: impl Into<String>, value: Option<impl Into<Value>>) -> Self {
        match value {
            Some(value) => self.with(field, value),
            None => self,
        }
    }

    /// Insert a filter in place
    pub fn insert(&mut self, field: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(field.into(), value.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    /// Check a raw snapshot against every filter
    pub fn matches(&self, resource: &Map<String, Value>) -> bool {
        self.0
            .iter()
            .all(|(field, expected)| resource.get(field) == Some(expected))
    }
}

/// Trait for cloud client implementations
///
/// This is the only way modules talk to a cloud. Snapshots cross this
/// boundary as JSON objects; modules deserialize them into typed records.
///
/// # Trust Level: External
///
/// The client owns authentication, endpoint discovery, retries, pagination
/// and wire protocol translation. Modules never duplicate any of that.
///
/// ## Forbidden Capabilities
/// - ❌ Deciding whether a change is needed (owned by the reconciler)
/// - ❌ Waiting for status transitions (owned by the waiter)
/// - ❌ Hiding errors: every failure must be returned
#[async_trait]
pub trait CloudClient: Send + Sync {
    /// List resources of a kind matching all filters
    async fn list(&self, kind: ResourceKind, filters: &Filters) -> Result<Vec<Value>, crate::Error>;

    /// Fetch one resource by ID
    ///
    /// # Returns
    ///
    /// - `Ok(Some(Value))`: The current snapshot
    /// - `Ok(None)`: No resource with this ID
    /// - `Err(Error)`: The request failed
    async fn get(&self, kind: ResourceKind, id: &str) -> Result<Option<Value>, crate::Error>;

    /// Create a resource and return the server's representation
    async fn create(
        &self,
        kind: ResourceKind,
        body: Map<String, Value>,
    ) -> Result<Value, crate::Error>;

    /// Apply a partial update and return the server's representation
    async fn update(
        &self,
        kind: ResourceKind,
        id: &str,
        patch: Map<String, Value>,
    ) -> Result<Value, crate::Error>;

    /// Delete a resource
    async fn delete(&self, kind: ResourceKind, id: &str) -> Result<(), crate::Error>;

    /// Name of the cloud (for logging and error messages)
    fn cloud_name(&self) -> &str;
}

/// Helper trait for constructing cloud clients from configuration
#[async_trait]
pub trait CloudClientFactory: Send + Sync {
    /// Create a CloudClient from configuration
    async fn create(
        &self,
        config: &crate::config::CloudConfig,
    ) -> Result<Box<dyn CloudClient>, crate::Error>;
}
