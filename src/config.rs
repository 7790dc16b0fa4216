//! Configuration for marinelib storage locations and limits.
//!
//! Configuration sources (highest priority first):
//! 1. Environment variables (MARINELIB_HOME, MARINELIB_DB, MARINELIB_BLOBS)
//! 2. Config file (.marinelib/config.yaml)
//! 3. Defaults (~/.marinelib)
//!
//! Config file discovery:
//! - Searches current directory and parents for .marinelib/config.yaml
//! - `home` is relative to the .marinelib/ directory, other paths to the
//!   project root (the parent of .marinelib/)

use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::core::UploadPolicy;

/// Global cached configuration (stores Result to handle init errors)
static CONFIG: OnceLock<Result<ResolvedConfig, String>> = OnceLock::new();

const CONFIG_DIR: &str = ".marinelib";
const DATABASE_FILE: &str = "catalog.db";
const BLOBS_DIR: &str = "blobs";

/// Raw config file schema (matches YAML structure)
#[derive(Debug, Clone, Deserialize)]
pub struct ConfigFile {
    pub version: String,
    #[serde(default)]
    pub paths: PathsConfig,
    #[serde(default)]
    pub uploads: Option<UploadsConfig>,
    #[serde(default)]
    pub queries: Option<QueriesConfig>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PathsConfig {
    /// Catalog state directory (relative to .marinelib/)
    pub home: Option<String>,
    /// SQLite database file (relative to project root)
    pub database: Option<String>,
    /// Blob directory (relative to project root)
    pub blobs: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UploadsConfig {
    pub max_file_bytes: Option<u64>,
    pub denylist_patterns: Option<Vec<String>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct QueriesConfig {
    pub popular_limit: Option<usize>,
    pub recent_limit: Option<usize>,
    pub related_limit: Option<usize>,
}

/// Default result sizes for ranked listings
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QuerySettings {
    pub popular_limit: usize,
    pub recent_limit: usize,
    pub related_limit: usize,
}

impl Default for QuerySettings {
    fn default() -> Self {
        Self {
            popular_limit: 10,
            recent_limit: 10,
            related_limit: 5,
        }
    }
}

/// Resolved configuration with absolute paths
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    /// Catalog state directory
    pub home: PathBuf,
    /// SQLite database file
    pub database: PathBuf,
    /// Blob directory
    pub blobs: PathBuf,
    /// Path to config file (if found)
    pub config_file: Option<PathBuf>,
    pub uploads: UploadPolicy,
    pub queries: QuerySettings,
}

/// Environment overrides, captured once so resolution stays testable
#[derive(Debug, Clone, Default)]
struct EnvOverrides {
    home: Option<PathBuf>,
    database: Option<PathBuf>,
    blobs: Option<PathBuf>,
}

impl EnvOverrides {
    fn from_env() -> Self {
        let var = |name: &str| std::env::var(name).ok().map(PathBuf::from);
        Self {
            home: var("MARINELIB_HOME"),
            database: var("MARINELIB_DB"),
            blobs: var("MARINELIB_BLOBS"),
        }
    }
}

/// Find config file by searching current directory and parents
fn find_config_file() -> Option<PathBuf> {
    let mut current = std::env::current_dir().ok()?;

    loop {
        let config_path = current.join(CONFIG_DIR).join("config.yaml");
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

/// Resolve a path that may be relative to the config file's parent
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

/// Merge the three sources into absolute settings
fn resolve(
    file: Option<(&Path, ConfigFile)>,
    env: EnvOverrides,
    default_home: PathBuf,
) -> ResolvedConfig {
    let Some((config_path, config)) = file else {
        let home = env.home.unwrap_or(default_home);
        return ResolvedConfig {
            database: env.database.unwrap_or_else(|| home.join(DATABASE_FILE)),
            blobs: env.blobs.unwrap_or_else(|| home.join(BLOBS_DIR)),
            home,
            config_file: None,
            uploads: UploadPolicy::default(),
            queries: QuerySettings::default(),
        };
    };

    let config_dir = config_path.parent().unwrap_or(Path::new("."));
    // Base directory is the parent of .marinelib/ (i.e., grandparent of config.yaml)
    let base_dir = config_dir.parent().unwrap_or(Path::new("."));

    let home = env
        .home
        .or_else(|| config.paths.home.as_deref().map(|h| resolve_path(config_dir, h)))
        .unwrap_or(default_home);

    let database = env
        .database
        .or_else(|| config.paths.database.as_deref().map(|p| resolve_path(base_dir, p)))
        .unwrap_or_else(|| home.join(DATABASE_FILE));

    let blobs = env
        .blobs
        .or_else(|| config.paths.blobs.as_deref().map(|p| resolve_path(base_dir, p)))
        .unwrap_or_else(|| home.join(BLOBS_DIR));

    let mut uploads = UploadPolicy::default();
    if let Some(section) = config.uploads {
        if let Some(max) = section.max_file_bytes {
            uploads.max_file_bytes = max;
        }
        if let Some(patterns) = section.denylist_patterns {
            uploads.denylist_patterns = patterns;
        }
    }

    let defaults = QuerySettings::default();
    let queries = match config.queries {
        Some(q) => QuerySettings {
            popular_limit: q.popular_limit.unwrap_or(defaults.popular_limit),
            recent_limit: q.recent_limit.unwrap_or(defaults.recent_limit),
            related_limit: q.related_limit.unwrap_or(defaults.related_limit),
        },
        None => defaults,
    };

    ResolvedConfig {
        home,
        database,
        blobs,
        config_file: Some(config_path.to_path_buf()),
        uploads,
        queries,
    }
}

/// Load configuration from all sources
fn load_config() -> Result<ResolvedConfig> {
    let default_home = dirs::home_dir()
        .context("Failed to determine home directory")?
        .join(CONFIG_DIR);

    let env = EnvOverrides::from_env();
    match find_config_file() {
        Some(path) => {
            let file = load_config_file(&path)?;
            Ok(resolve(Some((&path, file)), env, default_home))
        }
        None => Ok(resolve(None, env, default_home)),
    }
}

/// Get the global configuration (loads once, then cached)
pub fn config() -> Result<&'static ResolvedConfig> {
    let result = CONFIG.get_or_init(|| load_config().map_err(|e| e.to_string()));

    match result {
        Ok(config) => Ok(config),
        Err(e) => anyhow::bail!("{}", e),
    }
}

/// Force reload configuration (useful for testing)
pub fn reload_config() -> Result<ResolvedConfig> {
    load_config()
}
