//! Layered configuration for the planner front-ends.
//!
//! Priority, highest first:
//! 1. command-line arguments
//! 2. environment variables (through clap's `env` attribute)
//! 3. TOML file (`~/.config/day-planner/config.toml` or `--config`)
//! 4. compiled defaults

use crate::persistence::{
    DEFAULT_STORAGE_KEY, JsonFileBlobStore, MemoryBlobStore, PersistenceResult, TaskBlobStore,
};
use serde::Deserialize;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:3000";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    ReadFile {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse config file: {0}")]
    ParseToml(#[from] toml::de::Error),
    #[error("unknown storage backend '{0}' (expected json, sqlite or memory)")]
    UnknownBackend(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    #[default]
    Json,
    Sqlite,
    Memory,
}

impl FromStr for StorageBackend {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "json" => Ok(StorageBackend::Json),
            "sqlite" => Ok(StorageBackend::Sqlite),
            "memory" => Ok(StorageBackend::Memory),
            other => Err(ConfigError::UnknownBackend(other.to_string())),
        }
    }
}

impl fmt::Display for StorageBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            StorageBackend::Json => "json",
            StorageBackend::Sqlite => "sqlite",
            StorageBackend::Memory => "memory",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct PlannerConfigFile {
    log_level: Option<String>,
    storage: StorageFileConfig,
    server: ServerFileConfig,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct StorageFileConfig {
    backend: Option<StorageBackend>,
    path: Option<PathBuf>,
    key: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ServerFileConfig {
    bind_addr: Option<String>,
}

#[derive(clap::Parser, Debug, Default)]
#[command(version, about = "Day planner")]
pub struct PlannerCliArgs {
    /// Path to config file (default: `~/.config/day-planner/config.toml`).
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Storage backend: json, sqlite or memory.
    #[arg(long, env = "DAY_PLANNER_STORAGE")]
    pub storage: Option<String>,

    /// File backing the json or sqlite store.
    #[arg(long, env = "DAY_PLANNER_DATA")]
    pub data_path: Option<PathBuf>,

    /// Address for the HTTP server.
    #[arg(short, long, env = "DAY_PLANNER_HTTP_ADDR")]
    pub bind: Option<String>,

    /// Log level filter (trace, debug, info, warn, error).
    #[arg(long, env = "DAY_PLANNER_LOG")]
    pub log_level: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    pub path: PathBuf,
    pub key: String,
}

impl StorageConfig {
    pub fn open(&self) -> PersistenceResult<Box<dyn TaskBlobStore + Send + Sync>> {
        match self.backend {
            StorageBackend::Json => Ok(Box::new(JsonFileBlobStore::new(&self.path))),
            StorageBackend::Memory => Ok(Box::new(MemoryBlobStore::new())),
            #[cfg(feature = "sqlite")]
            StorageBackend::Sqlite => Ok(Box::new(
                crate::persistence::sqlite::SqliteBlobStore::with_key(&self.path, &self.key)?,
            )),
            #[cfg(not(feature = "sqlite"))]
            StorageBackend::Sqlite => Err(crate::persistence::PersistenceError::InvalidData(
                "built without the `sqlite` feature".into(),
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannerConfig {
    pub storage: StorageConfig,
    pub bind_addr: String,
    pub log_level: String,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            storage: StorageConfig {
                backend: StorageBackend::Json,
                path: default_data_path(StorageBackend::Json),
                key: DEFAULT_STORAGE_KEY.to_string(),
            },
            bind_addr: DEFAULT_BIND_ADDR.to_string(),
            log_level: "info".to_string(),
        }
    }
}

impl PlannerConfig {
    pub fn load(cli: &PlannerCliArgs) -> Result<Self, ConfigError> {
        let file = load_config_file(cli.config.as_deref())?;
        Self::resolve(cli, &file)
    }

    fn resolve(cli: &PlannerCliArgs, file: &PlannerConfigFile) -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let backend = match cli.storage.as_deref() {
            Some(raw) => raw.parse()?,
            None => file.storage.backend.unwrap_or(defaults.storage.backend),
        };
        let path = cli
            .data_path
            .clone()
            .or_else(|| file.storage.path.clone())
            .unwrap_or_else(|| default_data_path(backend));

        Ok(Self {
            storage: StorageConfig {
                backend,
                path,
                key: file
                    .storage
                    .key
                    .clone()
                    .unwrap_or(defaults.storage.key),
            },
            bind_addr: cli
                .bind
                .clone()
                .or_else(|| file.server.bind_addr.clone())
                .unwrap_or(defaults.bind_addr),
            log_level: cli
                .log_level
                .clone()
                .or_else(|| file.log_level.clone())
                .unwrap_or(defaults.log_level),
        })
    }
}

fn default_data_path(backend: StorageBackend) -> PathBuf {
    let file_name = match backend {
        StorageBackend::Sqlite => "tasks.sqlite3",
        StorageBackend::Json | StorageBackend::Memory => "tasks.json",
    };
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("day-planner")
        .join(file_name)
}

fn load_config_file(explicit_path: Option<&Path>) -> Result<PlannerConfigFile, ConfigError> {
    let path = if let Some(p) = explicit_path {
        let contents = std::fs::read_to_string(p).map_err(|e| ConfigError::ReadFile {
            path: p.to_path_buf(),
            source: e,
        })?;
        return Ok(toml::from_str(&contents)?);
    } else {
        let Some(config_dir) = dirs::config_dir() else {
            return Ok(PlannerConfigFile::default());
        };
        config_dir.join("day-planner").join("config.toml")
    };

    match std::fs::read_to_string(&path) {
        Ok(contents) => Ok(toml::from_str(&contents)?),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(PlannerConfigFile::default()),
        Err(e) => Err(ConfigError::ReadFile { path, source: e }),
    }
}
