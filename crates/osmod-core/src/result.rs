//! Module result as handed back to the automation host
//!
//! Serializes flat: `changed`, `failed`, `msg`, `warnings` and every data
//! key side by side at the top level.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Outcome of one module invocation
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModuleResult {
    /// Whether the module changed (or in check mode, would change) anything
    pub changed: bool,

    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub failed: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub msg: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,

    /// Module specific return values
    #[serde(flatten)]
    pub data: Map<String, Value>,
}

impl ModuleResult {
    pub fn unchanged() -> Self {
        Self::default()
    }

    pub fn changed() -> Self {
        Self::changed_if(true)
    }

    pub fn changed_if(changed: bool) -> Self {
        Self {
            changed,
            ..Self::default()
        }
    }

    /// Failed invocation carrying a human-readable message
    pub fn failed(msg: impl Into<String>) -> Self {
        Self {
            failed: true,
            msg: Some(msg.into()),
            ..Self::default()
        }
    }

    /// Add a return value
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.data.insert(key.into(), value.into());
        self
    }

    pub fn with_msg(mut self, msg: impl Into<String>) -> Self {
        self.msg = Some(msg.into());
        self
    }

    /// Add a warning shown by the host
    pub fn warn(&mut self, warning: impl Into<String>) {
        self.warnings.push(warning.into());
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.data.get(key)
    }

    pub fn to_json(&self) -> Value {
        serde_json::to_value(self).unwrap_or_else(|e| {
            Value::from(format!("unserializable module result: {}", e))
        })
    }
}
