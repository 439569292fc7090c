use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

const CONFIG_FILE: &str = "config.toml";
const USAGE_FILE: &str = "usage.json";
const APP_QUALIFIER: &str = "com";
const APP_ORGANIZATION: &str = "launchkit";
const APP_NAME: &str = "launchkit";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub search: SearchConfig,

    #[serde(default)]
    pub cache: CacheConfig,

    #[serde(default)]
    pub hooks: HooksConfig,

    #[serde(default)]
    pub apps: AppsConfig,

    #[serde(default)]
    pub history: HistoryConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Maximum results returned for a default (untriggered) query
    #[serde(default = "default_max_results")]
    pub max_results: usize,

    /// Maximum results returned for a triggered provider query
    #[serde(default = "default_max_command_results")]
    pub max_command_results: usize,

    /// Base debounce delay in milliseconds for queries of 4+ characters.
    /// Shorter queries use fixed shorter delays (0/50/100ms).
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            max_results: default_max_results(),
            max_command_results: default_max_command_results(),
            debounce_ms: default_debounce_ms(),
        }
    }
}

fn default_max_results() -> usize {
    10
}

fn default_max_command_results() -> usize {
    20
}

fn default_debounce_ms() -> u64 {
    150
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Maximum number of cached result lists
    #[serde(default = "default_cache_capacity")]
    pub capacity: usize,

    /// Longest time-to-live in seconds, granted to sub-50ms results.
    /// Slower results get a fraction of this (1/3 or 1/6).
    #[serde(default = "default_cache_max_age_secs")]
    pub max_age_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            capacity: default_cache_capacity(),
            max_age_secs: default_cache_max_age_secs(),
        }
    }
}

fn default_cache_capacity() -> usize {
    128
}

fn default_cache_max_age_secs() -> u64 {
    1800
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HooksConfig {
    /// Maximum number of hook batches executing concurrently
    #[serde(default = "default_hook_max_concurrent")]
    pub max_concurrent: usize,

    /// Milliseconds to wait for an execution slot before failing the hook.
    /// 0 waits indefinitely.
    #[serde(default)]
    pub acquire_timeout_ms: u64,
}

impl Default for HooksConfig {
    fn default() -> Self {
        Self {
            max_concurrent: default_hook_max_concurrent(),
            acquire_timeout_ms: 0,
        }
    }
}

fn default_hook_max_concurrent() -> usize {
    10
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppsConfig {
    /// Extra directories to scan for .desktop entries, in addition to the
    /// standard XDG application directories
    #[serde(default)]
    pub extra_dirs: Vec<PathBuf>,

    /// Include entries marked NoDisplay=true
    #[serde(default)]
    pub include_hidden: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HistoryConfig {
    /// Override path for the usage-history file (default: platform data dir)
    #[serde(default)]
    pub file: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Enable file logging
    #[serde(default)]
    pub enabled: bool,

    /// Also log to stderr
    #[serde(default = "default_log_stderr")]
    pub stderr: bool,

    /// File log level: trace, debug, info, warn, error
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log directory (relative paths resolve under the platform data dir)
    #[serde(default = "default_log_directory")]
    pub directory: PathBuf,

    /// Log file name prefix
    #[serde(default = "default_log_file_prefix")]
    pub file_prefix: String,

    /// Rotation strategy: hourly, daily, minutely, never
    #[serde(default = "default_log_rotation")]
    pub rotation: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            stderr: default_log_stderr(),
            level: default_log_level(),
            directory: default_log_directory(),
            file_prefix: default_log_file_prefix(),
            rotation: default_log_rotation(),
        }
    }
}

fn default_log_stderr() -> bool {
    true
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_directory() -> PathBuf {
    PathBuf::from("logs")
}

fn default_log_file_prefix() -> String {
    "launchkit.log".to_string()
}

fn default_log_rotation() -> String {
    "daily".to_string()
}

impl Config {
    /// Get the platform config directory (~/.config/launchkit or equivalent).
    pub fn config_dir() -> Result<PathBuf> {
        ProjectDirs::from(APP_QUALIFIER, APP_ORGANIZATION, APP_NAME)
            .map(|dirs| dirs.config_dir().to_path_buf())
            .ok_or_else(|| anyhow::anyhow!("Could not determine home directory"))
    }

    /// Get the platform data directory (~/.local/share/launchkit or equivalent).
    pub fn data_dir() -> Result<PathBuf> {
        ProjectDirs::from(APP_QUALIFIER, APP_ORGANIZATION, APP_NAME)
            .map(|dirs| dirs.data_dir().to_path_buf())
            .ok_or_else(|| anyhow::anyhow!("Could not determine home directory"))
    }

    /// Load configuration from the platform config directory.
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_dir()?.join(CONFIG_FILE))
    }

    /// Load configuration from an explicit path. A missing file yields defaults.
    pub fn load_from(config_path: &Path) -> Result<Self> {
        if config_path.exists() {
            let content = std::fs::read_to_string(config_path)
                .with_context(|| format!("Failed to read config from {:?}", config_path))?;

            toml::from_str(&content)
                .with_context(|| format!("Failed to parse config from {:?}", config_path))
        } else {
            Ok(Config::default())
        }
    }

    /// Save configuration to the platform config directory.
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_dir()?.join(CONFIG_FILE))
    }

    /// Save configuration to an explicit path.
    pub fn save_to(&self, config_path: &Path) -> Result<()> {
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory {:?}", parent))?;
        }

        let content =
            toml::to_string_pretty(self).with_context(|| "Failed to serialize config")?;

        std::fs::write(config_path, content)
            .with_context(|| format!("Failed to write config to {:?}", config_path))?;

        Ok(())
    }

    /// Resolve the usage-history file path, honoring the config override.
    pub fn usage_path(&self) -> Result<PathBuf> {
        match &self.history.file {
            Some(path) => Ok(path.clone()),
            None => Ok(Self::data_dir()?.join(USAGE_FILE)),
        }
    }
}
