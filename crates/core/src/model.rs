use serde::Deserialize;
use std::fmt;

/// Metric kinds the sampler knows how to read, in wire order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetricKind {
    Cpu,
    Memory,
    Disk,
    Network,
}

impl MetricKind {
    pub const ALL: [MetricKind; 4] = [Self::Cpu, Self::Memory, Self::Disk, Self::Network];

    /// Tag value used on the wire (`metric=<name>`)
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Cpu => "cpu",
            Self::Memory => "memory",
            Self::Disk => "disk",
            Self::Network => "network",
        }
    }
}

impl fmt::Display for MetricKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-metric enable flags. Anything not set in the config file is disabled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct MetricToggles {
    pub cpu: bool,
    pub memory: bool,
    pub disk: bool,
    pub network: bool,
}

impl MetricToggles {
    pub fn all() -> Self {
        Self {
            cpu: true,
            memory: true,
            disk: true,
            network: true,
        }
    }

    pub fn is_enabled(&self, kind: MetricKind) -> bool {
        match kind {
            MetricKind::Cpu => self.cpu,
            MetricKind::Memory => self.memory,
            MetricKind::Disk => self.disk,
            MetricKind::Network => self.network,
        }
    }

    /// Enabled kinds in wire order
    pub fn enabled(&self) -> impl Iterator<Item = MetricKind> {
        let toggles = *self;
        MetricKind::ALL
            .into_iter()
            .filter(move |kind| toggles.is_enabled(*kind))
    }

    pub fn enabled_count(&self) -> usize {
        self.enabled().count()
    }
}

/// Cumulative network byte counters since boot
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NetworkCounters {
    pub bytes_sent: u64,
    pub bytes_recv: u64,
}

/// One tick's worth of readings. Only enabled metrics are populated.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Readings {
    pub cpu_percent: Option<f64>,
    pub memory_percent: Option<f64>,
    pub disk_percent: Option<f64>,
    pub network: Option<NetworkCounters>,
}

/// Field value on a line protocol line
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FieldValue {
    Float(f64),
    Unsigned(u64),
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            // `{:?}` keeps a trailing `.0` on whole numbers
            Self::Float(value) => write!(f, "{:?}", value),
            Self::Unsigned(value) => write!(f, "{}", value),
        }
    }
}

/// A single sample: metric tag plus its fields
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    pub kind: MetricKind,
    pub fields: Vec<(&'static str, FieldValue)>,
}

impl Sample {
    pub fn gauge(kind: MetricKind, value: f64) -> Self {
        Self {
            kind,
            fields: vec![("value", FieldValue::Float(value))],
        }
    }

    pub fn network(counters: NetworkCounters) -> Self {
        Self {
            kind: MetricKind::Network,
            fields: vec![
                ("bytes_sent", FieldValue::Unsigned(counters.bytes_sent)),
                ("bytes_recv", FieldValue::Unsigned(counters.bytes_recv)),
            ],
        }
    }
}

/// Samples of one tick sharing a single nanosecond timestamp
#[derive(Debug, Clone, PartialEq)]
pub struct MetricBatch {
    pub timestamp_ns: u64,
    pub samples: Vec<Sample>,
}

impl MetricBatch {
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}
