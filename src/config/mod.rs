//! # Configuration
//!
//! TOML configuration for the `humannpc` binary. Every section has defaults, so
//! an empty file is a valid configuration.
//!
//! ```toml
//! [storage]
//! data_file = "data/humannpc.json"
//!
//! [lifecycle]
//! kit_delay_ms = 1000
//! default_respawn_seconds = 60.0
//! interaction_distance = 3.0
//!
//! [permissions]
//! admin_permission = "humannpc.admin"
//!
//! [permissions.grants]
//! "76561198000000001" = ["humannpc.admin"]
//!
//! [logging]
//! level = "info"
//! file = "humannpc.log"
//! security_file = "humannpc-security.log"
//!
//! [templates]
//! stock_examples = true
//! ```

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;
use tokio::fs;

use crate::npc::{ManagerSettings, PERMISSION_ADMIN};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub lifecycle: LifecycleConfig,
    #[serde(default)]
    pub permissions: PermissionsConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub templates: TemplatesConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub data_file: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_file: "data/humannpc.json".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LifecycleConfig {
    /// Delay between a spawn and the kit being applied.
    pub kit_delay_ms: u64,
    /// Respawn delay given to newly created NPCs.
    pub default_respawn_seconds: f32,
    /// Interaction distance given to newly created NPCs.
    pub interaction_distance: f32,
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self {
            kit_delay_ms: 1000,
            default_respawn_seconds: 60.0,
            interaction_distance: 3.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PermissionsConfig {
    pub admin_permission: String,
    /// user id => granted permission names
    pub grants: BTreeMap<String, Vec<String>>,
}

impl Default for PermissionsConfig {
    fn default() -> Self {
        Self {
            admin_permission: PERMISSION_ADMIN.to_string(),
            grants: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
    /// Receives a copy of every record logged on the `security` target.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub security_file: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: Some("humannpc.log".to_string()),
            security_file: Some("humannpc-security.log".to_string()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TemplatesConfig {
    /// Register the stock example templates at start.
    pub stock_examples: bool,
}

impl Default for TemplatesConfig {
    fn default() -> Self {
        Self {
            stock_examples: true,
        }
    }
}

impl Config {
    /// Load configuration from a file
    pub async fn load(path: &str) -> Result<Self> {
        let content = fs::read_to_string(path)
            .await
            .map_err(|e| anyhow!("Failed to read config file {}: {}", path, e))?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| anyhow!("Failed to parse config file {}: {}", path, e))?;

        Ok(config)
    }

    /// Create a default configuration file
    pub async fn create_default(path: &str) -> Result<()> {
        let config = Config::default();
        let content = toml::to_string_pretty(&config)
            .map_err(|e| anyhow!("Failed to serialize default config: {}", e))?;

        fs::write(path, content)
            .await
            .map_err(|e| anyhow!("Failed to write config file {}: {}", path, e))?;

        Ok(())
    }

    pub fn manager_settings(&self) -> ManagerSettings {
        ManagerSettings {
            kit_delay: Duration::from_millis(self.lifecycle.kit_delay_ms),
            admin_permission: self.permissions.admin_permission.clone(),
            respawn_delay_seconds: self.lifecycle.default_respawn_seconds,
            interaction_distance: self.lifecycle.interaction_distance,
        }
    }
}
