//! Configuration file schema and resolution
//!
//! Resolution priority order:
//! 1. Command-line argument (highest priority)
//! 2. `TRUEFRAME_CONFIG` environment variable
//! 3. User config file (`<config dir>/trueframe/config.toml`)
//! 4. System config file (`/etc/trueframe/config.toml`, Linux only)
//! 5. Compiled defaults (fallback)
//!
//! A missing config file is never fatal: the resolver logs a warning and the
//! compiled defaults are used. An explicitly named file (command line or
//! environment) must exist and parse.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Environment variable naming an explicit config file
pub const CONFIG_ENV_VAR: &str = "TRUEFRAME_CONFIG";

/// Config file name searched for in the standard locations
pub const CONFIG_FILE_NAME: &str = "config.toml";

// ============================================================================
// Schema
// ============================================================================

/// Top-level TOML configuration
///
/// Every section is optional; absent keys take their compiled default.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TomlConfig {
    /// Logging settings
    pub logging: LoggingConfig,
    /// Risk tier thresholds
    pub risk: RiskConfig,
    /// Static-image fusion profile overrides
    pub image: ProfileConfig,
    /// Video fusion profile overrides
    pub video: ProfileConfig,
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter directive when `RUST_LOG` is unset (default: "info")
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

/// Risk classifier thresholds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RiskConfig {
    /// Scores at or above this value are High risk (default: 0.65)
    pub high: f64,
    /// Scores at or above this value (and below `high`) are Medium risk (default: 0.40)
    pub medium: f64,
}

impl Default for RiskConfig {
    fn default() -> Self {
        Self {
            high: 0.65,
            medium: 0.40,
        }
    }
}

/// Per-profile fusion overrides
///
/// Method names are plain strings here; the fusion crate validates them
/// against the profile's closed method set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProfileConfig {
    /// Base weight overrides (method id → weight)
    pub weights: BTreeMap<String, f64>,
    /// Methods switched off for this profile
    pub disabled: Vec<String>,
    /// Apply extremity, agreement, anomaly and heartbeat rules (default: true)
    pub dynamic_weighting: bool,
    /// Hand inapplicable methods' weight to their declared target (default: true)
    pub redistribute_inapplicable: bool,
}

impl Default for ProfileConfig {
    fn default() -> Self {
        Self {
            weights: BTreeMap::new(),
            disabled: Vec::new(),
            dynamic_weighting: true,
            redistribute_inapplicable: true,
        }
    }
}

// ============================================================================
// Resolution
// ============================================================================

/// Where the effective configuration came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    /// `--config` command-line argument
    CommandLine(PathBuf),
    /// `TRUEFRAME_CONFIG` environment variable
    Environment(PathBuf),
    /// First existing file among the standard search paths
    Discovered(PathBuf),
    /// No file found; compiled defaults
    CompiledDefaults,
}

impl ConfigSource {
    /// Path of the file to read, if any
    pub fn path(&self) -> Option<&Path> {
        match self {
            ConfigSource::CommandLine(p)
            | ConfigSource::Environment(p)
            | ConfigSource::Discovered(p) => Some(p),
            ConfigSource::CompiledDefaults => None,
        }
    }

    /// Whether the file was named explicitly (and therefore must exist)
    pub fn is_explicit(&self) -> bool {
        matches!(
            self,
            ConfigSource::CommandLine(_) | ConfigSource::Environment(_)
        )
    }
}

/// Config file resolver
///
/// # Example
/// ```rust,no_run
/// use trueframe_common::config::ConfigResolver;
///
/// let config = ConfigResolver::new("trueframe-fusion").load()?;
/// assert!(config.risk.high >= config.risk.medium);
/// # Ok::<(), trueframe_common::Error>(())
/// ```
#[derive(Debug, Clone)]
pub struct ConfigResolver {
    module_name: String,
    cli_path: Option<PathBuf>,
    search_paths: Vec<PathBuf>,
}

impl ConfigResolver {
    /// Create resolver for a module with the platform search paths
    pub fn new(module_name: impl Into<String>) -> Self {
        Self {
            module_name: module_name.into(),
            cli_path: None,
            search_paths: default_search_paths(),
        }
    }

    /// Set the command-line config path (highest priority)
    pub fn with_cli_path(mut self, path: Option<PathBuf>) -> Self {
        self.cli_path = path;
        self
    }

    /// Replace the standard search paths
    pub fn with_search_paths(mut self, paths: Vec<PathBuf>) -> Self {
        self.search_paths = paths;
        self
    }

    /// Determine which config source applies, without reading it
    pub fn resolve(&self) -> ConfigSource {
        if let Some(path) = &self.cli_path {
            return ConfigSource::CommandLine(path.clone());
        }

        if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
            if !path.trim().is_empty() {
                return ConfigSource::Environment(PathBuf::from(path));
            }
        }

        self.search_paths
            .iter()
            .find(|p| p.is_file())
            .map(|p| ConfigSource::Discovered(p.clone()))
            .unwrap_or(ConfigSource::CompiledDefaults)
    }

    /// Resolve and load the configuration
    ///
    /// # Errors
    /// - `Error::Config` if an explicitly named file does not exist
    /// - `Error::Io` if the file cannot be read
    /// - `Error::TomlParse` if the file is not valid TOML for [`TomlConfig`]
    pub fn load(&self) -> Result<TomlConfig> {
        let source = self.resolve();

        let path = match source.path() {
            Some(path) => path,
            None => {
                warn!(
                    module = %self.module_name,
                    "No config file found, using compiled defaults"
                );
                return Ok(TomlConfig::default());
            }
        };

        if source.is_explicit() && !path.is_file() {
            return Err(Error::Config(format!(
                "Config file not found: {}",
                path.display()
            )));
        }

        let config = load_toml_config(path)?;
        info!(
            module = %self.module_name,
            path = %path.display(),
            "Loaded configuration"
        );
        Ok(config)
    }
}

/// Read and parse a TOML config file
pub fn load_toml_config(path: &Path) -> Result<TomlConfig> {
    let content = std::fs::read_to_string(path)?;
    Ok(toml::from_str(&content)?)
}

/// Platform search paths, most specific first
fn default_search_paths() -> Vec<PathBuf> {
    let mut paths = Vec::new();

    if let Some(dir) = dirs::config_dir() {
        paths.push(dir.join("trueframe").join(CONFIG_FILE_NAME));
    }

    if cfg!(target_os = "linux") {
        paths.push(PathBuf::from("/etc/trueframe").join(CONFIG_FILE_NAME));
    }

    paths
}
