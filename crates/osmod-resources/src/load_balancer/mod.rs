//! Load balancing service (load balancers, health monitors)
//!
//! Both kinds report progress in `provisioning_status`, moving through
//! `PENDING_*` states until `ACTIVE` or `ERROR`.

mod balancer;
mod health_monitor;

pub use balancer::{LoadBalancer, LoadBalancerModule};
pub use health_monitor::{HealthMonitor, HealthMonitorModule};

use osmod_core::WaitPolicy;

pub(crate) const PROVISIONING_WAIT: WaitPolicy =
    WaitPolicy::new("provisioning_status", &["ACTIVE"], &["ERROR"]);
