//! Module registry and alias table
//!
//! The registry maps module names to implementations and cloud types to
//! client factories, so neither the engine nor the runner needs a
//! hardcoded if-else chain.
//!
//! ## Name Resolution
//!
//! A requested module name is resolved in this order:
//!
//! 1. The `openstack.cloud.` collection prefix is stripped
//! 2. An exact module name
//! 3. An entry in the alias table (old `os_*` names), which adds a
//!    deprecation warning to the result
//!
//! ## Usage
//!
//! ```rust,ignore
//! use osmod_core::registry::ModuleRegistry;
//!
//! let registry = ModuleRegistry::with_builtin_clouds();
//! osmod_resources::register(&registry);
//!
//! let resolved = registry.resolve("os_zone")?;
//! assert_eq!(resolved.module.name(), "dns_zone");
//! ```

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use crate::cloud::{FileCloudFactory, MemoryCloudFactory};
use crate::config::CloudConfig;
use crate::error::{Error, Result};
use crate::traits::{CloudClient, CloudClientFactory, Module};

/// Collection prefix accepted in front of every module name
pub const COLLECTION_PREFIX: &str = "openstack.cloud.";

/// A module looked up by name
#[derive(Clone)]
pub struct Resolved {
    /// The implementation
    pub module: Arc<dyn Module>,
    /// Deprecation notice when the module was requested by an old name
    pub deprecation: Option<String>,
}

/// Registry of modules, aliases and cloud client factories
///
/// ## Thread Safety
///
/// The registry uses interior mutability with RwLock, allowing concurrent
/// reads and exclusive writes.
#[derive(Default)]
pub struct ModuleRegistry {
    modules: RwLock<HashMap<String, Arc<dyn Module>>>,

    /// Old name -> canonical name
    aliases: RwLock<HashMap<String, String>>,

    clouds: RwLock<HashMap<String, Arc<dyn CloudClientFactory>>>,
}

impl ModuleRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry with the `memory` and `file` clouds registered
    pub fn with_builtin_clouds() -> Self {
        let registry = Self::new();
        registry.register_cloud("memory", Box::new(MemoryCloudFactory));
        registry.register_cloud("file", Box::new(FileCloudFactory));
        registry
    }

    /// Register a module under its own name
    pub fn register_module(&self, module: Box<dyn Module>) {
        let name = module.name().to_string();
        let mut modules = self.modules.write().unwrap_or_else(PoisonError::into_inner);
        if modules.insert(name.clone(), Arc::from(module)).is_some() {
            tracing::warn!("Module '{}' registered twice, keeping the last one", name);
        }
    }

    /// Register an old name for a module
    pub fn register_alias(&self, alias: impl Into<String>, target: impl Into<String>) {
        let mut aliases = self.aliases.write().unwrap_or_else(PoisonError::into_inner);
        aliases.insert(alias.into(), target.into());
    }

    /// Register a cloud client factory
    ///
    /// # Parameters
    ///
    /// - `name`: Cloud type name (e.g., "memory", "file", or a custom factory name)
    /// - `factory`: Factory object for creating cloud clients
    pub fn register_cloud(&self, name: impl Into<String>, factory: Box<dyn CloudClientFactory>) {
        let mut clouds = self.clouds.write().unwrap_or_else(PoisonError::into_inner);
        clouds.insert(name.into(), Arc::from(factory));
    }

    /// Look up a module by name, collection name or alias
    ///
    /// # Returns
    ///
    /// - `Ok(Resolved)`: The module, with a deprecation notice for aliases
    /// - `Err(Error::Validation)`: No module answers to the name
    pub fn resolve(&self, requested: &str) -> Result<Resolved> {
        let name = requested
            .strip_prefix(COLLECTION_PREFIX)
            .unwrap_or(requested);

        let modules = self.modules.read().unwrap_or_else(PoisonError::into_inner);
        if let Some(module) = modules.get(name) {
            return Ok(Resolved {
                module: Arc::clone(module),
                deprecation: None,
            });
        }

        let aliases = self.aliases.read().unwrap_or_else(PoisonError::into_inner);
        let target = aliases
            .get(name)
            .ok_or_else(|| Error::validation(format!("Unknown module: {}", requested)))?;
        let module = modules.get(target).ok_or_else(|| {
            Error::config(format!(
                "Alias '{}' points to unregistered module '{}'",
                name, target
            ))
        })?;

        Ok(Resolved {
            module: Arc::clone(module),
            deprecation: Some(format!(
                "{} has been renamed to {}{}. Update the module name, the old name will be removed.",
                name, COLLECTION_PREFIX, target
            )),
        })
    }

    /// Create a cloud client from configuration
    ///
    /// # Returns
    ///
    /// - `Ok(Box<dyn CloudClient>)`: Created client instance
    /// - `Err(Error)`: If the cloud type is not registered or creation fails
    pub async fn create_cloud(&self, config: &CloudConfig) -> Result<Box<dyn CloudClient>> {
        let cloud_type = config.type_name();

        let factory = {
            let clouds = self.clouds.read().unwrap_or_else(PoisonError::into_inner);
            clouds
                .get(cloud_type)
                .cloned()
                .ok_or_else(|| Error::config(format!("Unknown cloud type: {}", cloud_type)))?
        };

        factory.create(config).await
    }

    /// All module names, sorted
    pub fn list_modules(&self) -> Vec<String> {
        let modules = self.modules.read().unwrap_or_else(PoisonError::into_inner);
        let mut names: Vec<String> = modules.keys().cloned().collect();
        names.sort();
        names
    }

    /// All aliases with their targets, sorted by alias
    pub fn list_aliases(&self) -> Vec<(String, String)> {
        let aliases = self.aliases.read().unwrap_or_else(PoisonError::into_inner);
        let mut pairs: Vec<(String, String)> = aliases
            .iter()
            .map(|(alias, target)| (alias.clone(), target.clone()))
            .collect();
        pairs.sort();
        pairs
    }

    /// All cloud types, sorted
    pub fn list_clouds(&self) -> Vec<String> {
        let clouds = self.clouds.read().unwrap_or_else(PoisonError::into_inner);
        let mut names: Vec<String> = clouds.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn has_module(&self, name: &str) -> bool {
        self.resolve(name).is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::ArgumentSpec;
    use crate::result::ModuleResult;
    use crate::traits::Invocation;
    use async_trait::async_trait;

    struct PingModule;

    #[async_trait]
    impl Module for PingModule {
        fn name(&self) -> &'static str {
            "ping"
        }

        fn argument_spec(&self) -> ArgumentSpec {
            ArgumentSpec::new()
        }

        async fn run(&self, _inv: &Invocation<'_>) -> Result<ModuleResult> {
            Ok(ModuleResult::unchanged().with("ping", "pong"))
        }
    }

    #[test]
    fn test_resolve_exact_and_collection_name() {
        let registry = ModuleRegistry::new();
        registry.register_module(Box::new(PingModule));

        let exact = registry.resolve("ping").unwrap();
        assert_eq!(exact.module.name(), "ping");
        assert!(exact.deprecation.is_none());

        let fqcn = registry.resolve("openstack.cloud.ping").unwrap();
        assert_eq!(fqcn.module.name(), "ping");
    }

    #[test]
    fn test_alias_carries_deprecation() {
        let registry = ModuleRegistry::new();
        registry.register_module(Box::new(PingModule));
        registry.register_alias("os_ping", "ping");

        let resolved = registry.resolve("os_ping").unwrap();
        assert_eq!(resolved.module.name(), "ping");
        assert!(
            resolved
                .deprecation
                .unwrap()
                .starts_with("os_ping has been renamed to openstack.cloud.ping")
        );
        assert_eq!(
            registry.list_aliases(),
            vec![("os_ping".to_string(), "ping".to_string())]
        );
    }

    #[test]
    fn test_unknown_module() {
        let registry = ModuleRegistry::new();
        let err = registry.resolve("nope").err().unwrap();
        assert!(err.is_validation());

        registry.register_alias("os_nope", "nope");
        assert!(matches!(
            registry.resolve("os_nope").err().unwrap(),
            Error::Config(_)
        ));
    }

    #[tokio::test]
    async fn test_builtin_clouds() {
        let registry = ModuleRegistry::with_builtin_clouds();
        assert_eq!(registry.list_clouds(), vec!["file", "memory"]);

        let cloud = registry.create_cloud(&CloudConfig::default()).await.unwrap();
        assert_eq!(cloud.cloud_name(), "memory");

        let custom = CloudConfig::Custom {
            factory: "sdk".to_string(),
            config: serde_json::json!({}),
        };
        assert!(registry.create_cloud(&custom).await.is_err());
    }
}
