//! Server and client configuration.
//!
//! Options live in a TOML file and take effect only at process start;
//! command-line flags override file values in the binary layer.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::errors::ServerError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Debug,
    #[default]
    Info,
    Warning,
    Error,
    Critical,
}

impl LogLevel {
    pub fn to_filter(self) -> tracing::level_filters::LevelFilter {
        use tracing::level_filters::LevelFilter;
        match self {
            LogLevel::Debug => LevelFilter::DEBUG,
            LogLevel::Info => LevelFilter::INFO,
            LogLevel::Warning => LevelFilter::WARN,
            LogLevel::Error | LogLevel::Critical => LevelFilter::ERROR,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub hostname: String,
    pub port: u16,
    pub methylome_dir: PathBuf,
    pub index_dir: PathBuf,
    pub log_file: Option<PathBuf>,
    pub pid_file: Option<PathBuf>,
    pub log_level: LogLevel,
    /// Worker threads for the runtime; 0 means one per core.
    pub n_threads: usize,
    /// Cache capacity: maximum number of resident methylomes.
    pub max_resident: usize,
    /// Smallest accepted bin size in bp.
    pub min_bin_size: u32,
    /// Largest accepted interval count per request.
    pub max_intervals: u32,
    /// Per-connection inactivity deadline in seconds.
    pub idle_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            hostname: "localhost".to_string(),
            port: 5000,
            methylome_dir: PathBuf::from("."),
            index_dir: PathBuf::from("."),
            log_file: None,
            pid_file: None,
            log_level: LogLevel::default(),
            n_threads: 0,
            max_resident: 32,
            min_bin_size: 100,
            max_intervals: 2_000_000,
            idle_timeout_secs: 10,
        }
    }
}

impl ServerConfig {
    pub fn load(path: &Path) -> Result<Self, ServerError> {
        let text = std::fs::read_to_string(path)?;
        toml::from_str(&text)
            .map_err(|e| ServerError::Config(format!("{}: {}", path.display(), e)))
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub hostname: String,
    pub port: u16,
    pub index_dir: PathBuf,
    pub metadata_file: Option<PathBuf>,
    /// Methylome directory for local mode.
    pub methylome_dir: Option<PathBuf>,
    pub log_file: Option<PathBuf>,
    pub log_level: LogLevel,
}

impl Default for ClientConfig {
    fn default() -> Self {
        ClientConfig {
            hostname: "localhost".to_string(),
            port: 5000,
            index_dir: PathBuf::from("."),
            metadata_file: None,
            methylome_dir: None,
            log_file: None,
            log_level: LogLevel::default(),
        }
    }
}

impl ClientConfig {
    pub fn load(path: &Path) -> Result<Self, ServerError> {
        let text = std::fs::read_to_string(path)?;
        toml::from_str(&text)
            .map_err(|e| ServerError::Config(format!("{}: {}", path.display(), e)))
    }
}
