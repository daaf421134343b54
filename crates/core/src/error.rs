use crate::model::MetricKind;
use std::{fmt, path::PathBuf};
use thiserror::Error;

/// Core errors for the metrics daemon
#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Configuration file not found: {}", .path.display())]
    ConfigNotFound { path: PathBuf },

    #[error("Failed to parse config file {}: {source}", .path.display())]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("System information error: {0}")]
    SystemInfo(String),

    #[error("No reading supplied for enabled metric '{0}'")]
    MissingReading(MetricKind),

    #[error("Metric '{0}' produced a non-finite value")]
    NonFiniteValue(MetricKind),

    #[error("Endpoint answered with HTTP {status}: {body}")]
    UnexpectedStatus { status: u16, body: String },

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Logging setup error: {0}")]
    Logging(String),

    #[cfg(feature = "linux_procfs")]
    #[error("Procfs error: {0}")]
    Procfs(#[from] procfs::ProcError),

    #[cfg(unix)]
    #[error("Unix system error: {0}")]
    Unix(#[from] nix::Error),
}

pub type Result<T> = std::result::Result<T, CoreError>;

impl CoreError {
    pub fn config<S: Into<String>>(msg: S) -> Self {
        Self::Config(msg.into())
    }

    pub fn system_info<S: Into<String>>(msg: S) -> Self {
        Self::SystemInfo(msg.into())
    }

    pub fn transport<S: Into<String>>(msg: S) -> Self {
        Self::Transport(msg.into())
    }

    pub fn logging<S: Into<String>>(msg: S) -> Self {
        Self::Logging(msg.into())
    }
}

/// Pipeline stage a tick failed in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Sample,
    Format,
    Forward,
}

impl Stage {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Sample => "sample",
            Self::Format => "format",
            Self::Forward => "forward",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Failure of a single tick, tagged with the stage that produced it.
///
/// The loop driver logs these and moves on to the next tick; nothing is
/// retried.
#[derive(Error, Debug)]
#[error("{stage} stage failed: {source}")]
pub struct TickError {
    stage: Stage,
    #[source]
    source: CoreError,
}

impl TickError {
    pub fn new(stage: Stage, source: CoreError) -> Self {
        Self { stage, source }
    }

    pub fn sample(source: CoreError) -> Self {
        Self::new(Stage::Sample, source)
    }

    pub fn format(source: CoreError) -> Self {
        Self::new(Stage::Format, source)
    }

    pub fn forward(source: CoreError) -> Self {
        Self::new(Stage::Forward, source)
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    pub fn inner(&self) -> &CoreError {
        &self.source
    }
}
