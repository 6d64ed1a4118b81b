// # Module Trait
//
// A module is one declarative automation primitive (e.g. `security_group`).
// The engine normalizes the raw arguments against `argument_spec()` and
// hands the module an `Invocation`; the module returns a `ModuleResult`.

use async_trait::async_trait;

use crate::params::{ArgumentSpec, Params};
use crate::result::ModuleResult;
use crate::traits::CloudClient;
use crate::waiter::WaitConfig;

/// Everything a module needs for one run
///
/// Built fresh by the engine for every invocation and dropped afterwards.
pub struct Invocation<'a> {
    /// Normalized parameters
    pub params: Params,
    /// Dry-run: decide, but issue no mutating call
    pub check_mode: bool,
    /// Cloud client handle
    pub cloud: &'a dyn CloudClient,
    /// Wait settings derived from `wait`/`timeout`
    pub wait: WaitConfig,
}

impl<'a> Invocation<'a> {
    pub fn new(params: Params, cloud: &'a dyn CloudClient) -> Self {
        let wait = WaitConfig::from_params(&params, WaitConfig::default().interval);
        Self {
            params,
            check_mode: false,
            cloud,
            wait,
        }
    }

    pub fn with_check_mode(mut self, check_mode: bool) -> Self {
        self.check_mode = check_mode;
        self
    }

    pub fn with_wait(mut self, wait: WaitConfig) -> Self {
        self.wait = wait;
        self
    }
}

/// Trait for module implementations
///
/// # Contract
///
/// - At most one mutating cloud call per run (plus read-only polling)
/// - Zero mutating calls in check mode
/// - No state kept between runs
#[async_trait]
pub trait Module: Send + Sync {
    /// Canonical module name (e.g. "security_group")
    fn name(&self) -> &'static str;

    /// Parameter schema
    fn argument_spec(&self) -> ArgumentSpec;

    /// Whether check mode is honoured
    fn supports_check_mode(&self) -> bool {
        true
    }

    /// Run the module
    async fn run(&self, invocation: &Invocation<'_>) -> Result<ModuleResult, crate::Error>;
}
