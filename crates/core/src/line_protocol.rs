//! Line protocol encoding for the time-series target.
//!
//! One line per enabled metric:
//!
//! ```text
//! system_metrics,metric=cpu value=42.5 1718000000000000000
//! system_metrics,metric=network bytes_sent=1024,bytes_recv=2048 1718000000000000000
//! ```
//!
//! Every line of a batch carries the same nanosecond timestamp.

use crate::{
    config::DatabaseConfig,
    error::{CoreError, Result},
    model::{MetricBatch, MetricKind, MetricToggles, Readings, Sample},
};
use std::{collections::BTreeMap, fmt::Write};

/// Encoder holding the series name and the static tag suffix
#[derive(Debug, Clone)]
pub struct LineProtocol {
    measurement: String,
    extra_tags: String,
}

impl LineProtocol {
    pub fn new(measurement: &str, tags: &BTreeMap<String, String>) -> Self {
        let mut extra_tags = String::new();
        for (key, value) in tags {
            extra_tags.push(',');
            extra_tags.push_str(&escape_tag(key));
            extra_tags.push('=');
            extra_tags.push_str(&escape_tag(value));
        }

        Self {
            measurement: escape_measurement(measurement),
            extra_tags,
        }
    }

    pub fn from_config(database: &DatabaseConfig) -> Self {
        Self::new(&database.measurement, &database.tags)
    }

    /// Pair each enabled metric with its reading.
    ///
    /// Fails if an enabled metric has no reading or a gauge is NaN/infinite.
    pub fn batch(
        &self,
        toggles: &MetricToggles,
        readings: &Readings,
        timestamp_ns: u64,
    ) -> Result<MetricBatch> {
        let mut samples = Vec::with_capacity(toggles.enabled_count());

        for kind in toggles.enabled() {
            let sample = match kind {
                MetricKind::Cpu => gauge(kind, readings.cpu_percent)?,
                MetricKind::Memory => gauge(kind, readings.memory_percent)?,
                MetricKind::Disk => gauge(kind, readings.disk_percent)?,
                MetricKind::Network => readings
                    .network
                    .map(Sample::network)
                    .ok_or(CoreError::MissingReading(kind))?,
            };
            samples.push(sample);
        }

        Ok(MetricBatch {
            timestamp_ns,
            samples,
        })
    }

    /// Render a batch, lines joined by `\n` without a trailing newline.
    /// An empty batch renders as an empty string.
    pub fn encode(&self, batch: &MetricBatch) -> String {
        let mut out = String::new();

        for (i, sample) in batch.samples.iter().enumerate() {
            if i > 0 {
                out.push('\n');
            }
            self.write_line(&mut out, sample, batch.timestamp_ns);
        }

        out
    }

    /// Build and render in one step
    pub fn format(
        &self,
        toggles: &MetricToggles,
        readings: &Readings,
        timestamp_ns: u64,
    ) -> Result<String> {
        let batch = self.batch(toggles, readings, timestamp_ns)?;
        Ok(self.encode(&batch))
    }

    fn write_line(&self, out: &mut String, sample: &Sample, timestamp_ns: u64) {
        out.push_str(&self.measurement);
        out.push_str(",metric=");
        out.push_str(sample.kind.as_str());
        out.push_str(&self.extra_tags);
        out.push(' ');

        for (i, (name, value)) in sample.fields.iter().enumerate() {
            if i > 0 {
                out.push(',');
            }
            // Writing into a String cannot fail
            let _ = write!(out, "{}={}", name, value);
        }

        let _ = write!(out, " {}", timestamp_ns);
    }
}

fn gauge(kind: MetricKind, reading: Option<f64>) -> Result<Sample> {
    let value = reading.ok_or(CoreError::MissingReading(kind))?;
    if !value.is_finite() {
        return Err(CoreError::NonFiniteValue(kind));
    }
    Ok(Sample::gauge(kind, value))
}

fn escape_measurement(raw: &str) -> String {
    escape(raw, &[',', ' '])
}

fn escape_tag(raw: &str) -> String {
    escape(raw, &[',', '=', ' '])
}

fn escape(raw: &str, special: &[char]) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        if special.contains(&c) {
            out.push('\\');
        }
        out.push(c);
    }
    out
}
