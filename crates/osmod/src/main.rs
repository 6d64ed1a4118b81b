// # osmod - module runner
//
// Thin command line front end for the module engine. All reconciliation
// logic lives in osmod-core and osmod-resources; this binary only:
// 1. Reads configuration from environment variables
// 2. Initializes logging and the runtime
// 3. Registers the resource modules and builds the cloud client
// 4. Runs one module and prints its result as JSON
//
// ## Usage
//
// ```bash
// osmod <module> <args.json>   # args from a file, or `-` for stdin
// osmod --list                 # module names and old aliases
// ```
//
// ## Configuration
//
// - `OSMOD_CLOUD_TYPE`: Cloud backend (memory, file)
// - `OSMOD_CLOUD_STATE_PATH`: State file (for file)
// - `OSMOD_SETTLE_POLLS`: Status polls before a pending resource settles
// - `OSMOD_POLL_INTERVAL_MS`: Delay between two status polls
// - `OSMOD_CHECK_MODE`: Run without mutating anything (true/false)
// - `OSMOD_LOG_LEVEL`: trace, debug, info, warn, error
//
// ## Example
//
// ```bash
// export OSMOD_CLOUD_TYPE=file
// export OSMOD_CLOUD_STATE_PATH=/var/lib/osmod/cloud.json
// echo '{"name": "example.net.", "ttl": 7200}' | osmod dns_zone -
// ```
//
// ## Exit codes
//
// - 0: The module ran (changed or not)
// - 1: Configuration or usage error
// - 2: The module failed

use anyhow::{Context, Result};
use osmod_core::{CloudConfig, Engine, EngineConfig, ModuleRegistry, ModuleResult};
use serde_json::Value;
use std::env;
use std::io::Read;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tracing::{Level, debug, error};
use tracing_subscriber::FmtSubscriber;

#[derive(Debug, Clone, Copy)]
enum OsmodExitCode {
    Success = 0,
    ConfigError = 1,
    ModuleFailed = 2,
}

impl From<OsmodExitCode> for ExitCode {
    fn from(code: OsmodExitCode) -> Self {
        ExitCode::from(code as u8)
    }
}

/// Application configuration
#[derive(Debug)]
struct Config {
    cloud_type: String,
    cloud_state_path: Option<String>,
    settle_polls: u32,
    poll_interval_ms: u64,
    check_mode: bool,
    log_level: String,
}

impl Config {
    /// Load configuration from environment variables
    fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        Ok(Self {
            cloud_type: lookup("OSMOD_CLOUD_TYPE").unwrap_or_else(|| "memory".to_string()),
            cloud_state_path: lookup("OSMOD_CLOUD_STATE_PATH"),
            settle_polls: lookup("OSMOD_SETTLE_POLLS")
                .map(|s| s.parse())
                .transpose()
                .context("OSMOD_SETTLE_POLLS must be a non-negative integer")?
                .unwrap_or(1),
            poll_interval_ms: lookup("OSMOD_POLL_INTERVAL_MS")
                .map(|s| s.parse())
                .transpose()
                .context("OSMOD_POLL_INTERVAL_MS must be a positive integer")?
                .unwrap_or(2000),
            check_mode: lookup("OSMOD_CHECK_MODE")
                .map(|s| parse_flag(&s))
                .transpose()?
                .unwrap_or(false),
            log_level: lookup("OSMOD_LOG_LEVEL").unwrap_or_else(|| "warn".to_string()),
        })
    }

    /// Validate the configuration
    fn validate(&self) -> Result<()> {
        match self.cloud_type.as_str() {
            "memory" => {}
            "file" => {
                if self.cloud_state_path.as_ref().is_none_or(|p| p.is_empty()) {
                    anyhow::bail!(
                        "OSMOD_CLOUD_STATE_PATH is required when OSMOD_CLOUD_TYPE=file. \
                        Set it via: export OSMOD_CLOUD_STATE_PATH=/var/lib/osmod/cloud.json"
                    );
                }
            }
            other => anyhow::bail!(
                "OSMOD_CLOUD_TYPE '{}' is not supported. Supported types: memory, file",
                other
            ),
        }

        if self.poll_interval_ms == 0 {
            anyhow::bail!("OSMOD_POLL_INTERVAL_MS must be greater than 0");
        }

        match self.log_level.to_lowercase().as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            _ => anyhow::bail!(
                "OSMOD_LOG_LEVEL '{}' is not valid. \
                Valid levels: trace, debug, info, warn, error",
                self.log_level
            ),
        }

        Ok(())
    }

    fn engine_config(&self) -> EngineConfig {
        let cloud = match self.cloud_state_path.as_ref() {
            Some(path) if self.cloud_type == "file" => CloudConfig::File {
                path: path.clone(),
                settle_polls: self.settle_polls,
            },
            _ => CloudConfig::Memory {
                settle_polls: self.settle_polls,
            },
        };

        EngineConfig::new()
            .with_cloud(cloud)
            .with_check_mode(self.check_mode)
            .with_poll_interval(Duration::from_millis(self.poll_interval_ms))
    }
}

fn parse_flag(value: &str) -> Result<bool> {
    match value.to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        other => anyhow::bail!("OSMOD_CHECK_MODE '{}' is not a boolean", other),
    }
}

/// What the command line asks for
#[derive(Debug, PartialEq)]
enum Command {
    List,
    Run { module: String, args_path: String },
}

fn parse_args(args: &[String]) -> Result<Command> {
    match args {
        [flag] if flag == "--list" => Ok(Command::List),
        [module, args_path] => Ok(Command::Run {
            module: module.clone(),
            args_path: args_path.clone(),
        }),
        _ => anyhow::bail!("usage: osmod <module> <args.json|->\n       osmod --list"),
    }
}

fn read_module_args(path: &str) -> Result<Value> {
    let text = if path == "-" {
        let mut text = String::new();
        std::io::stdin()
            .read_to_string(&mut text)
            .context("failed to read module arguments from stdin")?;
        text
    } else {
        std::fs::read_to_string(path)
            .with_context(|| format!("failed to read module arguments from {}", path))?
    };

    if text.trim().is_empty() {
        return Ok(Value::Null);
    }
    serde_json::from_str(&text).context("module arguments are not valid JSON")
}

fn main() -> ExitCode {
    let argv: Vec<String> = env::args().skip(1).collect();
    let command = match parse_args(&argv) {
        Ok(command) => command,
        Err(e) => {
            eprintln!("{}", e);
            return OsmodExitCode::ConfigError.into();
        }
    };

    let config = match Config::from_env().and_then(|c| c.validate().map(|_| c)) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Configuration error: {:#}", e);
            return OsmodExitCode::ConfigError.into();
        }
    };

    let log_level = match config.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "error" => Level::ERROR,
        _ => Level::WARN,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_writer(std::io::stderr)
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
        return OsmodExitCode::ConfigError.into();
    }

    let registry = ModuleRegistry::with_builtin_clouds();
    osmod_resources::register(&registry);

    let (module, args_path) = match command {
        Command::List => {
            for name in registry.list_modules() {
                println!("{}", name);
            }
            for (alias, target) in registry.list_aliases() {
                println!("{} -> {}", alias, target);
            }
            return OsmodExitCode::Success.into();
        }
        Command::Run { module, args_path } => (module, args_path),
    };

    let args = match read_module_args(&args_path) {
        Ok(args) => args,
        Err(e) => {
            eprintln!("{:#}", e);
            return OsmodExitCode::ConfigError.into();
        }
    };

    let rt = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to create tokio runtime: {}", e);
            return OsmodExitCode::ConfigError.into();
        }
    };

    let result = rt.block_on(run_module(Arc::new(registry), &config, &module, &args));

    match result {
        Ok(result) => {
            println!("{}", result.to_json());
            if result.failed {
                OsmodExitCode::ModuleFailed.into()
            } else {
                OsmodExitCode::Success.into()
            }
        }
        Err(e) => {
            eprintln!("Configuration error: {:#}", e);
            OsmodExitCode::ConfigError.into()
        }
    }
}

/// Build the engine and run one module
///
/// Errors are setup failures only; module errors come back as a failed
/// result.
async fn run_module(
    registry: Arc<ModuleRegistry>,
    config: &Config,
    module: &str,
    args: &Value,
) -> Result<ModuleResult> {
    let engine_config = config.engine_config();
    debug!("Engine configuration: {:?}", engine_config);

    let cloud = registry
        .create_cloud(&engine_config.cloud)
        .await
        .context("failed to create cloud client")?;
    let engine = Engine::new(registry, cloud, &engine_config)?;

    Ok(engine.run(module, args).await)
}
