//! File-based configuration provider (YAML)
//!
//! Looks for an explicit `--config` path first, then workspace-level
//! `.config/toolrelay/config.yaml`, then user-level
//! `<config_dir>/toolrelay/config.yaml`.

use std::fs;
use std::path::{Path, PathBuf};

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use super::error::{ConfigError, ConfigResult};
use crate::types::{BackendConfig, ServerConfig, TurnSettings};

/// Configuration file structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigFile {
    /// Completion backends; the first is active at startup
    #[serde(default = "default_backends")]
    pub backends: Vec<BackendConfig>,

    /// Tool servers to connect at startup
    #[serde(default)]
    pub servers: Vec<ServerConfig>,

    /// Per-turn limits
    #[serde(default)]
    pub turn: TurnSettings,

    /// Instruction preamble placed ahead of the tool grammar
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_prompt: Option<String>,
}

fn default_backends() -> Vec<BackendConfig> {
    vec![BackendConfig::chutes(), BackendConfig::openrouter()]
}

/// Filesystem, Brave search and GitHub servers launched through `npx`
fn default_servers() -> Vec<ServerConfig> {
    vec![
        ServerConfig::stdio(
            "filesystem",
            "npx",
            ["-y", "@modelcontextprotocol/server-filesystem", "."],
        ),
        ServerConfig::stdio(
            "brave_search",
            "npx",
            ["-y", "@modelcontextprotocol/server-brave-search"],
        )
        .with_env("BRAVE_API_KEY", "${BRAVE_API_KEY}"),
        ServerConfig::stdio("github", "npx", ["-y", "@modelcontextprotocol/server-github"])
            .with_env("GITHUB_PERSONAL_ACCESS_TOKEN", "${github}"),
    ]
}

impl Default for ConfigFile {
    fn default() -> Self {
        Self {
            backends: default_backends(),
            servers: default_servers(),
            turn: TurnSettings::default(),
            system_prompt: None,
        }
    }
}

impl ConfigFile {
    /// Parse a YAML document
    pub fn from_yaml(content: &str) -> ConfigResult<Self> {
        serde_yaml::from_str(content)
            .map_err(|e| ConfigError::Other(format!("Failed to parse YAML: {}", e)))
    }

    /// Serialize to YAML
    pub fn to_yaml(&self) -> ConfigResult<String> {
        serde_yaml::to_string(self)
            .map_err(|e| ConfigError::Other(format!("Failed to serialize YAML: {}", e)))
    }

    /// Look up a backend by name (case-insensitive)
    pub fn backend(&self, name: &str) -> ConfigResult<&BackendConfig> {
        self.backends
            .iter()
            .find(|b| b.name.eq_ignore_ascii_case(name))
            .ok_or_else(|| ConfigError::BackendNotFound(name.to_string()))
    }
}

/// Config level
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigLevel {
    /// User-level config (~/.config/toolrelay/config.yaml)
    User,
    /// Workspace-level config (.config/toolrelay/config.yaml in workspace root)
    Workspace,
    /// Path passed on the command line
    Explicit,
}

impl ConfigLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConfigLevel::User => "user",
            ConfigLevel::Workspace => "workspace",
            ConfigLevel::Explicit => "explicit",
        }
    }
}

/// File-based configuration provider
///
/// A missing file reads as [`ConfigFile::default`]; the file is only
/// created on the first write.
///
/// ```no_run
/// use toolrelay_core::config::FileConfigProvider;
///
/// let user_config = FileConfigProvider::user();
/// let workspace_config = FileConfigProvider::workspace("/path/to/workspace");
/// ```
pub struct FileConfigProvider {
    path: PathBuf,
    level: ConfigLevel,
    cache: RwLock<Option<ConfigFile>>,
}

impl FileConfigProvider {
    pub fn new(path: impl Into<PathBuf>, level: ConfigLevel) -> Self {
        Self {
            path: path.into(),
            level,
            cache: RwLock::new(None),
        }
    }

    /// User-level config provider (`<config_dir>/toolrelay/config.yaml`)
    pub fn user() -> Self {
        let config_dir = dirs::config_dir().unwrap_or_else(|| {
            dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".config")
        });
        Self::new(config_dir.join("toolrelay").join("config.yaml"), ConfigLevel::User)
    }

    /// Workspace-level config provider (`.config/toolrelay/config.yaml`)
    pub fn workspace(workspace_root: impl AsRef<Path>) -> Self {
        let path = workspace_root
            .as_ref()
            .join(".config")
            .join("toolrelay")
            .join("config.yaml");
        Self::new(path, ConfigLevel::Workspace)
    }

    /// Pick the config to use: explicit path, else an existing workspace
    /// file under `workspace_root`, else the user file
    pub fn discover(explicit: Option<PathBuf>, workspace_root: impl AsRef<Path>) -> Self {
        if let Some(path) = explicit {
            return Self::new(path, ConfigLevel::Explicit);
        }
        let workspace = Self::workspace(workspace_root);
        if workspace.exists() {
            return workspace;
        }
        Self::user()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn level(&self) -> ConfigLevel {
        self.level
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    fn load(&self) -> ConfigResult<ConfigFile> {
        if !self.path.exists() {
            return Ok(ConfigFile::default());
        }

        let content = fs::read_to_string(&self.path)?;
        ConfigFile::from_yaml(&content)
    }

    /// Write `config` to disk and refresh the cache
    pub fn save(&self, config: &ConfigFile) -> ConfigResult<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        fs::write(&self.path, config.to_yaml()?)?;
        *self.cache.write() = Some(config.clone());
        Ok(())
    }

    /// Cached config, loading it on first use
    pub fn config(&self) -> ConfigResult<ConfigFile> {
        if let Some(config) = self.cache.read().as_ref() {
            return Ok(config.clone());
        }
        self.reload()
    }

    /// Reload config from disk (invalidate cache)
    pub fn reload(&self) -> ConfigResult<ConfigFile> {
        let config = self.load()?;
        *self.cache.write() = Some(config.clone());
        Ok(config)
    }

    /// Copy the current file to `config.yaml.backup`
    pub fn backup(&self) -> ConfigResult<Option<PathBuf>> {
        if !self.exists() {
            return Ok(None);
        }

        let backup_path = self.path.with_extension("yaml.backup");
        fs::copy(&self.path, &backup_path)?;
        Ok(Some(backup_path))
    }
}

impl std::fmt::Debug for FileConfigProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileConfigProvider")
            .field("path", &self.path)
            .field("level", &self.level)
            .field("exists", &self.exists())
            .finish()
    }
}
