use crate::{
    error::{CoreError, Result},
    model::MetricToggles,
};
use serde::Deserialize;
use std::{
    collections::BTreeMap,
    fs, io,
    path::{Path, PathBuf},
    time::Duration,
};

/// Environment variable consulted when no `--config` path is given
pub const CONFIG_ENV: &str = "METRICSD_CONFIG";

/// Daemon configuration, loaded once at startup and never mutated
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Seconds to sleep between ticks
    #[serde(default = "default_interval")]
    pub collection_interval: u64,

    /// Which metrics to sample. Missing flags are disabled.
    #[serde(default)]
    pub metrics: MetricToggles,

    /// Time-series database target
    pub database: DatabaseConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Supported time-series backends
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DatabaseType {
    #[default]
    Influxdb,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    #[serde(rename = "type", default)]
    pub kind: DatabaseType,

    /// Write endpoint the payload is POSTed to
    pub url: String,

    #[serde(default)]
    pub auth: Option<AuthConfig>,

    /// Series name written at the start of every line
    #[serde(default = "default_measurement")]
    pub measurement: String,

    /// Extra tags appended to every line
    #[serde(default)]
    pub tags: BTreeMap<String, String>,

    /// Request timeout in seconds, 0 disables it
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

#[derive(Clone, Deserialize)]
pub struct AuthConfig {
    pub username: String,
    pub password: String,
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Append-only log file. Logs go to stderr when unset.
    #[serde(default)]
    pub log_file: Option<PathBuf>,

    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            log_file: None,
            log_level: default_log_level(),
        }
    }
}

fn default_interval() -> u64 {
    10
}

fn default_measurement() -> String {
    "system_metrics".to_string()
}

fn default_timeout() -> u64 {
    10
}

fn default_log_level() -> String {
    "INFO".to_string()
}

impl Config {
    /// Resolve the config path and load it.
    ///
    /// An explicit path wins, then `METRICSD_CONFIG`, then the first existing
    /// file among [`Config::default_config_paths`].
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let path = match explicit {
            Some(path) => path.to_path_buf(),
            None => Self::resolve_path()?,
        };
        Self::load_from_file(&path)
    }

    /// Load configuration from a specific JSON file
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path).map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => CoreError::ConfigNotFound {
                path: path.to_path_buf(),
            },
            _ => CoreError::config(format!(
                "Failed to read config file {}: {}",
                path.display(),
                e
            )),
        })?;

        let config = Self::from_json(&contents).map_err(|e| match e {
            CoreError::ConfigParse { source, .. } => CoreError::ConfigParse {
                path: path.to_path_buf(),
                source,
            },
            other => other,
        })?;

        Ok(config)
    }

    /// Parse and validate a JSON document
    pub fn from_json(contents: &str) -> Result<Self> {
        let config: Self =
            serde_json::from_str(contents).map_err(|source| CoreError::ConfigParse {
                path: PathBuf::new(),
                source,
            })?;

        config.validate()?;
        Ok(config)
    }

    fn resolve_path() -> Result<PathBuf> {
        if let Some(path) = std::env::var_os(CONFIG_ENV) {
            if !path.is_empty() {
                return Ok(PathBuf::from(path));
            }
        }

        let candidates = Self::default_config_paths();
        if let Some(found) = candidates.iter().find(|path| path.exists()) {
            return Ok(found.clone());
        }

        Err(CoreError::ConfigNotFound {
            path: candidates
                .into_iter()
                .next()
                .unwrap_or_else(|| PathBuf::from("metricsd.json")),
        })
    }

    /// Default configuration file search paths
    pub fn default_config_paths() -> Vec<PathBuf> {
        let mut paths = Vec::new();

        // XDG config directory
        if let Some(config_dir) = dirs::config_dir() {
            paths.push(config_dir.join("metricsd").join("config.json"));
        }

        paths.push(PathBuf::from("/etc/metricsd/config.json"));

        // Current directory
        paths.push(PathBuf::from("metricsd.json"));

        paths
    }

    /// Validate configuration values
    fn validate(&self) -> Result<()> {
        if self.collection_interval == 0 {
            return Err(CoreError::config(
                "collection_interval must be greater than zero",
            ));
        }

        let url = self.database.url.trim();
        if url.is_empty() {
            return Err(CoreError::config("database.url must not be empty"));
        }
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(CoreError::config(format!(
                "database.url must be an http:// or https:// URL, got '{}'",
                url
            )));
        }

        if self.database.measurement.trim().is_empty() {
            return Err(CoreError::config("database.measurement must not be empty"));
        }

        if self.database.tags.keys().any(|key| key.is_empty()) {
            return Err(CoreError::config("database.tags keys must not be empty"));
        }

        self.logging.level_filter()?;

        Ok(())
    }

    /// Sleep between ticks as a Duration
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.collection_interval)
    }
}

impl DatabaseConfig {
    pub fn timeout(&self) -> Option<Duration> {
        match self.timeout_secs {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        }
    }
}

impl LoggingConfig {
    /// Map the configured level name onto a tracing filter directive.
    ///
    /// Accepts the usual names case-insensitively, plus `WARNING` and
    /// `CRITICAL` as aliases for `warn` and `error`.
    pub fn level_filter(&self) -> Result<&'static str> {
        match self.log_level.trim().to_ascii_uppercase().as_str() {
            "TRACE" => Ok("trace"),
            "DEBUG" => Ok("debug"),
            "INFO" => Ok("info"),
            "WARN" | "WARNING" => Ok("warn"),
            "ERROR" | "CRITICAL" => Ok("error"),
            "OFF" => Ok("off"),
            other => Err(CoreError::config(format!(
                "Unknown logging.log_level '{}'",
                other
            ))),
        }
    }
}
