//! Exposer configuration.
//!
//! Defaults are usable as-is; with the `config` feature the same settings
//! can be loaded from TOML:
//!
//! ```toml
//! [events]
//! add_prefix = "on"
//! remove_prefix = "off"
//!
//! [proxy]
//! name_prefix = "Proxy"
//! prebuild_nested = false
//! ```

#[cfg(feature = "config")]
use serde::Deserialize;
#[cfg(feature = "config")]
use std::path::Path;

/// Settings shared by every proxy an exposer builds.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "config", derive(Deserialize))]
#[cfg_attr(feature = "config", serde(default))]
pub struct ExposerConfig {
    /// Event subscription naming.
    pub events: EventConfig,
    /// Proxy synthesis settings.
    pub proxy: ProxyConfig,
}

/// Prefixes used to name event subscribe/unsubscribe functions.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "config", derive(Deserialize))]
#[cfg_attr(feature = "config", serde(default))]
pub struct EventConfig {
    /// Prefix of the subscribe function (`add` + `Clicked`).
    pub add_prefix: String,
    /// Prefix of the unsubscribe function (`remove` + `Clicked`).
    pub remove_prefix: String,
}

impl Default for EventConfig {
    fn default() -> Self {
        Self {
            add_prefix: "add".to_string(),
            remove_prefix: "remove".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "config", derive(Deserialize))]
#[cfg_attr(feature = "config", serde(default))]
pub struct ProxyConfig {
    /// Prefix of the class name reported by proxy objects.
    pub name_prefix: String,
    /// Build proxies for class types reachable from a member signature at
    /// the same time as the proxy that references them.
    pub prebuild_nested: bool,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            name_prefix: "InstanceProxy".to_string(),
            prebuild_nested: true,
        }
    }
}

#[cfg(feature = "config")]
impl ExposerConfig {
    /// Load configuration from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::Io(path.as_ref().display().to_string(), e))?;
        Self::from_str(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn from_str(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(ConfigError::Parse)
    }
}

/// Configuration error.
#[cfg(feature = "config")]
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// IO error reading config file.
    #[error("Failed to read config file '{0}': {1}")]
    Io(String, #[source] std::io::Error),
    /// TOML parse error.
    #[error("Failed to parse config: {0}")]
    Parse(#[source] toml::de::Error),
}
