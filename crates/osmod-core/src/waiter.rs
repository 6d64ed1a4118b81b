//! Status polling for resources with a remote state machine
//!
//! Load balancers, DNS zones, volumes and health monitors are not usable
//! right after the mutating call returns: they move through pending states
//! (e.g. `PENDING_CREATE -> ACTIVE`) on the server side. The waiter polls
//! the resource at a fixed interval, one request at a time, until it
//! reaches a success or failure status or the caller's timeout elapses.

use serde_json::Value;
use std::time::Duration;
use tracing::debug;

use crate::error::{Error, Result};
use crate::params::{DEFAULT_TIMEOUT_SECS, Params};
use crate::traits::{CloudClient, ResourceKind};

/// Default delay between two polls
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(2);

/// Which status field to watch and which values end the wait
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitPolicy {
    /// Field holding the status (e.g. "provisioning_status")
    pub status_field: &'static str,
    /// Terminal success statuses
    pub success: &'static [&'static str],
    /// Terminal failure statuses
    pub failure: &'static [&'static str],
}

impl WaitPolicy {
    pub const fn new(
        status_field: &'static str,
        success: &'static [&'static str],
        failure: &'static [&'static str],
    ) -> Self {
        Self {
            status_field,
            success,
            failure,
        }
    }

    /// Status of a raw snapshot, if it carries one
    pub fn status_of<'a>(&self, snapshot: &'a Value) -> Option<&'a str> {
        snapshot.get(self.status_field).and_then(Value::as_str)
    }

    pub fn is_success(&self, status: &str) -> bool {
        self.success.iter().any(|s| s.eq_ignore_ascii_case(status))
    }

    pub fn is_failure(&self, status: &str) -> bool {
        self.failure.iter().any(|s| s.eq_ignore_ascii_case(status))
    }
}

/// Wait settings for one invocation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitConfig {
    /// Whether to wait at all
    pub enabled: bool,
    /// Upper bound for the whole wait
    pub timeout: Duration,
    /// Delay between two polls
    pub interval: Duration,
}

impl Default for WaitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS as u64),
            interval: DEFAULT_POLL_INTERVAL,
        }
    }
}

impl WaitConfig {
    /// Derive settings from the `wait` and `timeout` module parameters
    pub fn from_params(params: &Params, interval: Duration) -> Self {
        let timeout_secs = params
            .int("timeout")
            .unwrap_or(DEFAULT_TIMEOUT_SECS)
            .max(0) as u64;
        Self {
            enabled: params.bool("wait").unwrap_or(true),
            timeout: Duration::from_secs(timeout_secs),
            interval,
        }
    }

    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::default()
        }
    }
}

/// Poll until the resource reaches a terminal status
///
/// # Returns
///
/// - `Ok(Value)`: The snapshot that carried a success status
/// - `Err(Error::Cloud)`: The resource reached a failure status
/// - `Err(Error::Precondition)`: The resource disappeared while waiting
/// - `Err(Error::Timeout)`: The timeout elapsed first
pub async fn wait_for_status(
    cloud: &dyn CloudClient,
    kind: ResourceKind,
    id: &str,
    policy: &WaitPolicy,
    config: &WaitConfig,
) -> Result<Value> {
    debug!(
        "Waiting up to {:?} for {} {} to reach {:?}",
        config.timeout, kind, id, policy.success
    );

    match tokio::time::timeout(config.timeout, poll_status(cloud, kind, id, policy, config)).await
    {
        Ok(result) => result,
        Err(_) => Err(Error::Timeout {
            kind,
            id: id.to_string(),
            secs: config.timeout.as_secs(),
        }),
    }
}

async fn poll_status(
    cloud: &dyn CloudClient,
    kind: ResourceKind,
    id: &str,
    policy: &WaitPolicy,
    config: &WaitConfig,
) -> Result<Value> {
    loop {
        let snapshot = cloud
            .get(kind, id)
            .await?
            .ok_or_else(|| Error::precondition(kind, id))?;

        let status = policy.status_of(&snapshot).unwrap_or_default();
        if policy.is_success(status) {
            debug!("{} {} reached {}", kind, id, status);
            return Ok(snapshot);
        }
        if policy.is_failure(status) {
            return Err(Error::cloud(
                cloud.cloud_name(),
                format!("{} {} transitioned to failure status {}", kind, id, status),
            ));
        }

        debug!("{} {} is {}, polling again", kind, id, status);
        tokio::time::sleep(config.interval).await;
    }
}

/// Poll until the resource is gone
pub async fn wait_for_deletion(
    cloud: &dyn CloudClient,
    kind: ResourceKind,
    id: &str,
    config: &WaitConfig,
) -> Result<()> {
    let poll = async {
        while cloud.get(kind, id).await?.is_some() {
            tokio::time::sleep(config.interval).await;
        }
        Ok::<(), Error>(())
    };

    match tokio::time::timeout(config.timeout, poll).await {
        Ok(result) => result,
        Err(_) => Err(Error::Timeout {
            kind,
            id: id.to_string(),
            secs: config.timeout.as_secs(),
        }),
    }
}
