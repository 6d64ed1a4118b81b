//! Configuration types for osmod
//!
//! This module defines the configuration structures of the engine and the
//! cloud client backends.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Main engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Cloud client configuration
    pub cloud: CloudConfig,

    /// Polling settings for waitable resources
    #[serde(default)]
    pub wait: WaitDefaults,

    /// Run every module in check mode
    #[serde(default)]
    pub check_mode: bool,
}

impl EngineConfig {
    /// Create a new configuration with defaults
    pub fn new() -> Self {
        Self {
            cloud: CloudConfig::default(),
            wait: WaitDefaults::default(),
            check_mode: false,
        }
    }

    /// Set the cloud configuration
    pub fn with_cloud(mut self, cloud: CloudConfig) -> Self {
        self.cloud = cloud;
        self
    }

    /// Enable or disable check mode
    pub fn with_check_mode(mut self, check_mode: bool) -> Self {
        self.check_mode = check_mode;
        self
    }

    /// Set the poll interval
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.wait.poll_interval_ms = interval.as_millis() as u64;
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        self.cloud.validate()?;
        self.wait.validate()?;
        Ok(())
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Cloud client configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CloudConfig {
    /// In-process cloud (not persistent)
    Memory {
        /// Number of status polls before a pending resource settles
        #[serde(default = "default_settle_polls")]
        settle_polls: u32,
    },

    /// Cloud state persisted to a JSON file
    File {
        /// Path to the state file
        path: String,
        /// Number of status polls before a pending resource settles
        #[serde(default = "default_settle_polls")]
        settle_polls: u32,
    },

    /// Custom cloud client
    Custom {
        /// Factory name to use
        factory: String,
        /// Custom configuration data
        config: serde_json::Value,
    },
}

impl CloudConfig {
    /// Validate the cloud configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        match self {
            CloudConfig::Memory { .. } => Ok(()),
            CloudConfig::File { path, .. } => {
                if path.is_empty() {
                    return Err(crate::Error::config("File cloud path cannot be empty"));
                }
                Ok(())
            }
            CloudConfig::Custom { factory, config } => {
                if factory.is_empty() {
                    return Err(crate::Error::config("Custom cloud factory cannot be empty"));
                }
                if config.is_null() {
                    return Err(crate::Error::config("Custom cloud config cannot be null"));
                }
                Ok(())
            }
        }
    }

    /// Get the cloud type name
    pub fn type_name(&self) -> &str {
        match self {
            CloudConfig::Memory { .. } => "memory",
            CloudConfig::File { .. } => "file",
            CloudConfig::Custom { factory, .. } => factory,
        }
    }
}

impl Default for CloudConfig {
    fn default() -> Self {
        CloudConfig::Memory {
            settle_polls: default_settle_polls(),
        }
    }
}

/// Polling settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WaitDefaults {
    /// Delay between two status polls (in milliseconds)
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

impl WaitDefaults {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.poll_interval_ms == 0 {
            return Err(crate::Error::config("Poll interval must be > 0"));
        }
        Ok(())
    }
}

impl Default for WaitDefaults {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval_ms(),
        }
    }
}

fn default_settle_polls() -> u32 {
    1
}

fn default_poll_interval_ms() -> u64 {
    2000
}
