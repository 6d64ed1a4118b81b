// # osmod-resources
//
// OpenStack resource modules, grouped by service.
//
// Each resource module implements `Reconcile` for one resource kind and is
// registered wrapped in `Managed`. The `*_info` modules list resources and
// never change anything.
//
// ## Registration
//
// ```rust
// use osmod_core::ModuleRegistry;
//
// let registry = ModuleRegistry::with_builtin_clouds();
// osmod_resources::register(&registry);
// assert!(registry.has_module("openstack.cloud.dns_zone"));
// assert!(registry.has_module("os_zone"));
// ```

pub mod block_storage;
pub mod compute;
pub mod dns;
pub mod identity;
pub mod info;
pub mod load_balancer;
pub mod networking;

mod util;

use osmod_core::{Managed, ModuleRegistry};

/// Old module names and the modules they were renamed to
pub const ALIASES: &[(&str, &str)] = &[
    ("os_security_group", "security_group"),
    ("os_network", "network"),
    ("os_nova_flavor", "compute_flavor"),
    ("os_flavor_info", "compute_flavor_info"),
    ("os_keypair", "keypair"),
    ("os_zone", "dns_zone"),
    ("os_volume", "volume"),
    ("os_loadbalancer", "load_balancer"),
    ("os_lb_health_monitor", "lb_health_monitor"),
    ("os_project", "project"),
    ("os_project_info", "project_info"),
];

/// Register every module and the alias table
pub fn register(registry: &ModuleRegistry) {
    registry.register_module(Box::new(Managed(networking::SecurityGroupModule)));
    registry.register_module(Box::new(Managed(networking::NetworkModule)));
    registry.register_module(Box::new(Managed(compute::FlavorModule)));
    registry.register_module(Box::new(Managed(compute::KeypairModule)));
    registry.register_module(Box::new(Managed(dns::ZoneModule)));
    registry.register_module(Box::new(Managed(block_storage::VolumeModule)));
    registry.register_module(Box::new(Managed(load_balancer::LoadBalancerModule)));
    registry.register_module(Box::new(Managed(load_balancer::HealthMonitorModule)));
    registry.register_module(Box::new(Managed(identity::ProjectModule)));

    for module in info::modules() {
        registry.register_module(module);
    }

    for (alias, target) in ALIASES {
        registry.register_alias(*alias, *target);
    }

    tracing::debug!(
        "Registered {} modules and {} aliases",
        registry.list_modules().len(),
        ALIASES.len()
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_alias_resolves() {
        let registry = ModuleRegistry::new();
        register(&registry);

        for (alias, target) in ALIASES {
            let resolved = registry.resolve(alias).unwrap_or_else(|e| panic!("{alias}: {e}"));
            assert_eq!(resolved.module.name(), *target);
            assert!(resolved.deprecation.is_some());
        }
    }

    #[test]
    fn test_module_list() {
        let registry = ModuleRegistry::new();
        register(&registry);

        assert_eq!(
            registry.list_modules(),
            vec![
                "compute_flavor",
                "compute_flavor_info",
                "dns_zone",
                "dns_zone_info",
                "keypair",
                "lb_health_monitor",
                "load_balancer",
                "network",
                "project",
                "project_info",
                "security_group",
                "security_group_info",
                "volume",
                "volume_info",
            ]
        );
    }
}
