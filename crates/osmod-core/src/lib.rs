// # osmod-core
//
// Core library for declarative OpenStack resource modules.
//
// ## Architecture Overview
//
// Every module invocation follows the same shape:
//
// normalizer -> locator -> reconciler -> (mutator) -> formatter
//
// - **ArgumentSpec**: Validates and defaults the raw module arguments
// - **CloudClient**: Trait for the external cloud SDK (injected, never global)
// - **locator**: Finds zero or one existing resource by name or ID
// - **Reconcile**: Per resource kind hooks; `plan` decides, `apply` mutates once
// - **waiter**: Sequential status polling for resources with a remote state machine
// - **ModuleResult**: The changed/failed/data structure handed back to the host
// - **ModuleRegistry**: Module names, the deprecated alias table and cloud factories
// - **Engine**: Runs one module invocation end to end
//
// ## Design Principles
//
// 1. **No shared state**: Each invocation starts from a fresh lookup
// 2. **At most one mutation**: Create, update or delete, never a mix
// 3. **Fail fast**: Validation and immutable-field errors happen before any mutation
// 4. **Errors as values**: Every step returns `Result`, the engine turns errors into failed results

pub mod cloud;
pub mod config;
pub mod engine;
pub mod error;
pub mod locator;
pub mod params;
pub mod reconcile;
pub mod registry;
pub mod result;
pub mod traits;
pub mod waiter;

// Re-export core types for convenience
pub use cloud::{FileCloud, MemoryCloud};
pub use config::{CloudConfig, EngineConfig, WaitDefaults};
pub use engine::{Engine, EngineEvent};
pub use error::{Error, Result};
pub use params::{ArgumentSpec, ParamSpec, ParamType, Params};
pub use reconcile::{Diff, Managed, Plan, Reconcile, Resource};
pub use registry::ModuleRegistry;
pub use result::ModuleResult;
pub use traits::{CloudClient, Filters, Invocation, Module, ResourceKind};
pub use waiter::{WaitConfig, WaitPolicy};
