//! Module invocation engine
//!
//! The Engine is responsible for:
//! - Resolving the requested module name (aliases included)
//! - Normalizing the raw arguments against the module's schema
//! - Deciding check mode and wait settings
//! - Running the module against the injected cloud client
//! - Turning every error into a failed result
//!
//! ## Flow
//!
//! ```text
//! raw args ──► ModuleRegistry::resolve ──► ArgumentSpec::normalize
//!                                                   │
//!                                                   ▼
//!                    ModuleResult ◄── Module::run(Invocation)
//!                                                   │
//!                                                   ▼
//!                                             CloudClient
//! ```
//!
//! Nothing is retried and nothing is kept between two runs.

use serde_json::{Map, Value};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{Instrument, debug, error, info, info_span, warn};

use crate::config::EngineConfig;
use crate::error::{Error, Result};
use crate::registry::ModuleRegistry;
use crate::result::ModuleResult;
use crate::traits::{CloudClient, Invocation};
use crate::waiter::WaitConfig;

/// Host-internal argument carrying the check mode flag
pub const CHECK_MODE_ARG: &str = "_ansible_check_mode";

/// Events emitted by the Engine
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEvent {
    /// A module run started
    Started { module: String, check_mode: bool },

    /// A module run finished
    Finished { module: String, changed: bool },

    /// A module run failed
    Failed { module: String, error: String },
}

/// Runs modules against one cloud
///
/// ## Lifecycle
///
/// 1. Create with [`Engine::new()`]
/// 2. Call [`Engine::run()`] once per module invocation
/// 3. Drop to cleanup
pub struct Engine {
    registry: Arc<ModuleRegistry>,

    cloud: Box<dyn CloudClient>,

    /// Force check mode for every run
    check_mode: bool,

    /// Delay between two status polls
    poll_interval: Duration,

    /// Event sender for external monitoring
    event_tx: Option<mpsc::Sender<EngineEvent>>,
}

impl Engine {
    /// Create a new engine
    ///
    /// # Parameters
    ///
    /// - `registry`: Modules and aliases
    /// - `cloud`: Cloud client every module talks to
    /// - `config`: Engine configuration
    pub fn new(
        registry: Arc<ModuleRegistry>,
        cloud: Box<dyn CloudClient>,
        config: &EngineConfig,
    ) -> Result<Self> {
        config.validate()?;

        Ok(Self {
            registry,
            cloud,
            check_mode: config.check_mode,
            poll_interval: config.wait.poll_interval(),
            event_tx: None,
        })
    }

    /// Emit engine events on a bounded channel
    pub fn with_events(mut self, capacity: usize) -> (Self, mpsc::Receiver<EngineEvent>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        self.event_tx = Some(tx);
        (self, rx)
    }

    pub fn registry(&self) -> &ModuleRegistry {
        &self.registry
    }

    pub fn cloud(&self) -> &dyn CloudClient {
        self.cloud.as_ref()
    }

    /// Run a module
    ///
    /// Never fails: any error becomes a result with `failed = true` and the
    /// error message in `msg`.
    pub async fn run(&self, module: &str, args: &Value) -> ModuleResult {
        let span = info_span!("module", name = %module, cloud = %self.cloud.cloud_name());

        async {
            let mut warnings = Vec::new();
            let mut result = match self.invoke(module, args, &mut warnings).await {
                Ok(result) => {
                    self.emit_event(EngineEvent::Finished {
                        module: module.to_string(),
                        changed: result.changed,
                    });
                    result
                }
                Err(e) => {
                    error!("{}", e);
                    self.emit_event(EngineEvent::Failed {
                        module: module.to_string(),
                        error: e.to_string(),
                    });
                    ModuleResult::failed(e.to_string())
                }
            };

            for warning in warnings.into_iter().rev() {
                result.warnings.insert(0, warning);
            }
            result
        }
        .instrument(span)
        .await
    }

    /// Run a module, keeping the error typed
    pub async fn try_run(&self, module: &str, args: &Value) -> Result<ModuleResult> {
        let mut warnings = Vec::new();
        let mut result = self.invoke(module, args, &mut warnings).await?;
        for warning in warnings.into_iter().rev() {
            result.warnings.insert(0, warning);
        }
        Ok(result)
    }

    async fn invoke(
        &self,
        requested: &str,
        args: &Value,
        warnings: &mut Vec<String>,
    ) -> Result<ModuleResult> {
        let resolved = self.registry.resolve(requested)?;
        if let Some(deprecation) = resolved.deprecation {
            warn!("{}", deprecation);
            warnings.push(deprecation);
        }
        let module = resolved.module;

        let empty = Map::new();
        let raw = match args {
            Value::Object(map) => map,
            Value::Null => &empty,
            other => {
                return Err(Error::validation(format!(
                    "module arguments must be a mapping, got: {}",
                    other
                )));
            }
        };

        let check_mode = self.check_mode || requests_check_mode(raw);
        self.emit_event(EngineEvent::Started {
            module: module.name().to_string(),
            check_mode,
        });

        if check_mode && !module.supports_check_mode() {
            info!("{} does not support check mode, skipping", module.name());
            return Ok(ModuleResult::unchanged()
                .with("skipped", true)
                .with_msg(format!(
                    "remote module ({}) does not support check mode",
                    module.name()
                )));
        }

        let spec = module.argument_spec();
        let params = spec.normalize(raw)?;
        debug!("Parameters: {}", spec.redact(&params));

        let wait = WaitConfig::from_params(&params, self.poll_interval);
        let invocation = Invocation::new(params, self.cloud.as_ref())
            .with_check_mode(check_mode)
            .with_wait(wait);

        let result = module.run(&invocation).await?;
        info!(
            "{} finished (changed={}{})",
            module.name(),
            result.changed,
            if check_mode { ", check mode" } else { "" }
        );
        Ok(result)
    }

    fn emit_event(&self, event: EngineEvent) {
        if let Some(tx) = &self.event_tx {
            if tx.try_send(event).is_err() {
                warn!("Event channel full, dropping event");
            }
        }
    }
}

/// Whether the host asked for a dry run
fn requests_check_mode(raw: &Map<String, Value>) -> bool {
    match raw.get(CHECK_MODE_ARG) {
        Some(Value::Bool(flag)) => *flag,
        Some(Value::String(flag)) => matches!(
            flag.to_ascii_lowercase().as_str(),
            "true" | "yes" | "on" | "1"
        ),
        Some(Value::Number(n)) => n.as_i64() == Some(1),
        _ => false,
    }
}
