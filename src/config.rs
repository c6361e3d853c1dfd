// src/config.rs

//! Client configuration
//!
//! Configuration is a small TOML file. The first file found wins:
//!
//! 1. `--config <path>` on the command line
//! 2. `$CANVAS_CONFIG`
//! 3. `canvas/canvas.toml` in the user's config directory
//! 4. `/etc/canvas/canvas.toml`
//!
//! A missing file means defaults. Command line flags override file values.
//!
//! ```toml
//! db_path = "/var/lib/canvas/canvas.db"
//! owner = "firnsy"
//! machine = "firnsy:lounge"
//!
//! [sync]
//! mode = "additive"
//! with_deps = false
//! all = false
//!
//! [agent]
//! package_manager = "dnf"
//! repo_dir = "/etc/yum.repos.d"
//! assume_yes = false
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::error::{Error, Result};
use crate::sync::SyncMode;

/// Default database location
pub const DEFAULT_DB_PATH: &str = "/var/lib/canvas/canvas.db";

/// System-wide configuration file
pub const SYSTEM_CONFIG_PATH: &str = "/etc/canvas/canvas.toml";

/// Environment variable naming a configuration file
pub const CONFIG_ENV: &str = "CANVAS_CONFIG";

fn default_db_path() -> String {
    DEFAULT_DB_PATH.to_string()
}

fn default_package_manager() -> String {
    "dnf".to_string()
}

fn default_repo_dir() -> PathBuf {
    PathBuf::from("/etc/yum.repos.d")
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanvasConfig {
    #[serde(default = "default_db_path")]
    pub db_path: String,

    /// Owner assumed for bare template and machine names
    #[serde(default)]
    pub owner: Option<String>,

    /// Identity of the machine this client runs on (`owner:name`)
    #[serde(default)]
    pub machine: Option<String>,

    #[serde(default)]
    pub sync: SyncConfig,

    #[serde(default)]
    pub agent: AgentConfig,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncConfig {
    #[serde(default)]
    pub mode: SyncMode,

    /// Expand immediate dependencies of added packages
    #[serde(default)]
    pub with_deps: bool,

    /// Include dependency-installed packages in a machine's live composition
    #[serde(default)]
    pub all: bool,
}

/// Package manager settings for the RPM agent
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentConfig {
    #[serde(default = "default_package_manager")]
    pub package_manager: String,

    #[serde(default = "default_repo_dir")]
    pub repo_dir: PathBuf,

    /// Pass `-y` to the package manager
    #[serde(default)]
    pub assume_yes: bool,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            package_manager: default_package_manager(),
            repo_dir: default_repo_dir(),
            assume_yes: false,
        }
    }
}

impl Default for CanvasConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            owner: None,
            machine: None,
            sync: SyncConfig::default(),
            agent: AgentConfig::default(),
        }
    }
}

impl CanvasConfig {
    /// Parse a configuration file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::ConfigError(format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Candidate file locations, highest precedence first
    pub fn search_paths(explicit: Option<&Path>) -> Vec<PathBuf> {
        let mut paths = Vec::new();
        if let Some(path) = explicit {
            paths.push(path.to_path_buf());
        }
        if let Some(path) = std::env::var_os(CONFIG_ENV) {
            paths.push(PathBuf::from(path));
        }
        if let Some(dir) = dirs::config_dir() {
            paths.push(dir.join("canvas").join("canvas.toml"));
        }
        paths.push(PathBuf::from(SYSTEM_CONFIG_PATH));
        paths
    }

    /// Load the first configuration file found, or defaults
    ///
    /// An explicitly requested file must exist.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            if !path.exists() {
                return Err(Error::ConfigError(format!(
                    "config file {} does not exist",
                    path.display()
                )));
            }
        }

        for path in Self::search_paths(explicit) {
            if path.is_file() {
                debug!("Loading configuration from {}", path.display());
                return Self::from_file(&path);
            }
        }

        debug!("No configuration file found, using defaults");
        Ok(Self::default())
    }

    /// Owner for bare names: configured owner, else `$USER`, else `root`
    pub fn default_owner(&self) -> String {
        self.owner
            .clone()
            .or_else(|| std::env::var("USER").ok())
            .filter(|o| !o.is_empty())
            .unwrap_or_else(|| "root".to_string())
    }
}
