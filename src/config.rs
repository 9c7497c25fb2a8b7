//! Configuration for the outbox CLI.
//!
//! Configuration sources (highest priority first):
//! 1. Environment variables (OUTBOX_HOME)
//! 2. Config file (.outbox/config.yaml)
//! 3. Defaults (~/.outbox)
//!
//! Config file discovery:
//! - Searches current directory and parents for .outbox/config.yaml
//! - `paths.home` is relative to the .outbox/ directory

use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::core::{DelimitedTopics, Translator};

/// Global cached configuration (stores Result to handle init errors)
static CONFIG: OnceLock<Result<ResolvedConfig, String>> = OnceLock::new();

const HOME_ENV: &str = "OUTBOX_HOME";
const DEFAULT_SEPARATOR: &str = "-";
const DEFAULT_MAX_PAYLOAD_BYTES: usize = 1_048_576; // 1MB

/// Raw config file schema (matches YAML structure)
#[derive(Debug, Clone, Deserialize)]
pub struct ConfigFile {
    pub version: String,
    #[serde(default)]
    pub paths: PathsConfig,
    #[serde(default)]
    pub topic: Option<TopicConfig>,
    #[serde(default)]
    pub limits: Option<LimitsConfig>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PathsConfig {
    /// Outbox state directory (relative to .outbox/)
    pub home: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TopicConfig {
    pub separator: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LimitsConfig {
    pub max_payload_bytes: Option<usize>,
}

/// Resolved configuration with absolute paths
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    /// Directory holding the outbox log
    pub home: PathBuf,
    /// Separator used when deriving topics
    pub topic_separator: String,
    /// Largest payload the translator will encode
    pub max_payload_bytes: usize,
    /// Path to config file (if found)
    pub config_file: Option<PathBuf>,
}

impl ResolvedConfig {
    /// Translator using the configured topic separator and payload limit
    pub fn translator(&self) -> Translator<DelimitedTopics> {
        Translator::new(DelimitedTopics::new(self.topic_separator.clone()))
            .with_max_payload_bytes(self.max_payload_bytes)
    }
}

/// Find config file by searching current directory and parents
fn find_config_file() -> Option<PathBuf> {
    let mut current = std::env::current_dir().ok()?;

    loop {
        let config_path = current.join(".outbox").join("config.yaml");
        if config_path.exists() {
            return Some(config_path);
        }

        if !current.pop() {
            break;
        }
    }

    None
}

/// Load and parse config file
fn load_config_file(path: &Path) -> Result<ConfigFile> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    serde_yaml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))
}

/// Resolve a path that may be relative to the config file's directory
fn resolve_path(base: &Path, path_str: &str) -> PathBuf {
    let path = PathBuf::from(path_str);
    if path.is_absolute() {
        path
    } else {
        base.join(path)
            .canonicalize()
            .unwrap_or_else(|_| base.join(path_str))
    }
}

/// Merge the given sources into a resolved configuration
fn resolve(
    config_file: Option<PathBuf>,
    env_home: Option<String>,
    default_home: PathBuf,
) -> Result<ResolvedConfig> {
    let parsed = match config_file {
        Some(ref path) => Some(load_config_file(path)?),
        None => None,
    };

    let home = if let Some(env_home) = env_home {
        PathBuf::from(env_home)
    } else if let (Some(path), Some(home)) = (
        config_file.as_ref(),
        parsed.as_ref().and_then(|c| c.paths.home.as_ref()),
    ) {
        let outbox_dir = path.parent().unwrap_or(Path::new("."));
        resolve_path(outbox_dir, home)
    } else {
        default_home
    };

    let topic_separator = parsed
        .as_ref()
        .and_then(|c| c.topic.as_ref())
        .and_then(|t| t.separator.clone())
        .unwrap_or_else(|| DEFAULT_SEPARATOR.to_string());

    if topic_separator.is_empty() {
        anyhow::bail!("topic.separator must not be empty");
    }

    let max_payload_bytes = parsed
        .as_ref()
        .and_then(|c| c.limits.as_ref())
        .and_then(|l| l.max_payload_bytes)
        .unwrap_or(DEFAULT_MAX_PAYLOAD_BYTES);

    Ok(ResolvedConfig {
        home,
        topic_separator,
        max_payload_bytes,
        config_file,
    })
}

/// Load configuration from all sources
fn load_config() -> Result<ResolvedConfig> {
    let default_home = dirs::home_dir()
        .context("Failed to determine home directory")?
        .join(".outbox");

    resolve(
        find_config_file(),
        std::env::var(HOME_ENV).ok(),
        default_home,
    )
}

/// Get the global configuration (loads once, then cached)
pub fn config() -> Result<&'static ResolvedConfig> {
    let result = CONFIG.get_or_init(|| load_config().map_err(|e| format!("{:#}", e)));

    match result {
        Ok(config) => Ok(config),
        Err(e) => anyhow::bail!("{}", e),
    }
}

/// Force reload configuration (bypasses the cache)
pub fn reload_config() -> Result<ResolvedConfig> {
    load_config()
}

/// Get the outbox home directory
pub fn outbox_home() -> Result<PathBuf> {
    Ok(config()?.home.clone())
}
