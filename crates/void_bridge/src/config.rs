//! Bridge configuration
//!
//! # Example Config File
//!
//! ```toml
//! [bridge]
//! side = "client"                          # server, client
//! bootstrap_binding = "bootstrap.js"       # evaluated last, matched by suffix
//! broadcast_export = "entity:addEntityToAll"
//! max_conversion_depth = 64
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::binding::BindingScope;

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),
}

/// Which end of the network this process is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    /// Authoritative server, may write every namespace
    Server,
    /// Client mirror, synchronized namespaces are read-only
    Client,
}

impl Side {
    /// Binding scope loaded in addition to the shared bindings
    pub fn binding_scope(&self) -> BindingScope {
        match self {
            Self::Server => BindingScope::Server,
            Self::Client => BindingScope::Client,
        }
    }
}

impl Default for Side {
    fn default() -> Self {
        Self::Server
    }
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Server => write!(f, "server"),
            Self::Client => write!(f, "client"),
        }
    }
}

impl std::str::FromStr for Side {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "server" => Ok(Self::Server),
            "client" => Ok(Self::Client),
            _ => Err(format!("Unknown side: {}", s)),
        }
    }
}

/// Runtime-wide bridge settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    /// Side this process runs on
    pub side: Side,
    /// Name suffix of the binding skipped by `initialize_bindings`
    pub bootstrap_binding: String,
    /// Export called with every entity created through `createEntity`
    pub broadcast_export: String,
    /// Maximum nesting of arrays/objects converted to native values
    pub max_conversion_depth: usize,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            side: Side::Server,
            bootstrap_binding: "bootstrap.js".to_string(),
            broadcast_export: "entity:addEntityToAll".to_string(),
            max_conversion_depth: 64,
        }
    }
}

/// Raw TOML file layout
#[derive(Debug, Default, Deserialize)]
struct ConfigFile {
    #[serde(default)]
    bridge: BridgeConfig,
}

impl BridgeConfig {
    /// Default configuration for a side
    pub fn for_side(side: Side) -> Self {
        Self {
            side,
            ..Self::default()
        }
    }

    /// Parse from a TOML document with a `[bridge]` table
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let file: ConfigFile = toml::from_str(content)?;
        file.bridge.validate()?;
        Ok(file.bridge)
    }

    /// Load from a TOML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.bootstrap_binding.is_empty() {
            return Err(ConfigError::Validation(
                "bootstrap_binding must not be empty".to_string(),
            ));
        }
        if self.broadcast_export.is_empty() {
            return Err(ConfigError::Validation(
                "broadcast_export must not be empty".to_string(),
            ));
        }
        if self.max_conversion_depth == 0 {
            return Err(ConfigError::Validation(
                "max_conversion_depth must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Whether a binding name refers to the bootstrap binding
    pub fn is_bootstrap(&self, binding_name: &str) -> bool {
        binding_name.ends_with(&self.bootstrap_binding)
    }
}
