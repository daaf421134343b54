//! The collect, format, forward loop.
//!
//! Each tick is independent: a fresh clock reading, a fresh sample, one POST.
//! A failure in any stage is logged with the stage name and the tick is
//! dropped. The loop then sleeps the full interval before the next tick.

use crate::{
    clock::TimestampClock,
    config::Config,
    error::TickError,
    forwarder::Forwarder,
    line_protocol::LineProtocol,
    metrics::Sampler,
};
use std::time::Duration;
use tracing::{debug, error, info};

/// Blocks between ticks
pub trait Sleeper {
    fn sleep(&mut self, duration: Duration);
}

/// Sleeps the calling thread
#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadSleeper;

impl Sleeper for ThreadSleeper {
    fn sleep(&mut self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

/// What a successful tick sent
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TickReport {
    pub timestamp_ns: u64,
    pub lines: usize,
    pub payload_bytes: usize,
}

/// Loop driver owning every per-tick collaborator
pub struct Agent<'a, S, F, Z = ThreadSleeper> {
    config: &'a Config,
    encoder: LineProtocol,
    sampler: S,
    forwarder: F,
    sleeper: Z,
    clock: TimestampClock,
}

impl<'a, S, F> Agent<'a, S, F, ThreadSleeper>
where
    S: Sampler,
    F: Forwarder,
{
    pub fn new(config: &'a Config, sampler: S, forwarder: F) -> Self {
        Self::with_sleeper(config, sampler, forwarder, ThreadSleeper)
    }
}

impl<'a, S, F, Z> Agent<'a, S, F, Z>
where
    S: Sampler,
    F: Forwarder,
    Z: Sleeper,
{
    pub fn with_sleeper(config: &'a Config, sampler: S, forwarder: F, sleeper: Z) -> Self {
        Self {
            config,
            encoder: LineProtocol::from_config(&config.database),
            sampler,
            forwarder,
            sleeper,
            clock: TimestampClock::new(),
        }
    }

    /// Run one sample, format, forward pass
    pub fn tick(&mut self) -> Result<TickReport, TickError> {
        let toggles = &self.config.metrics;

        let readings = self.sampler.sample(toggles).map_err(TickError::sample)?;
        let timestamp_ns = self.clock.next();

        let batch = self
            .encoder
            .batch(toggles, &readings, timestamp_ns)
            .map_err(TickError::format)?;
        let payload = self.encoder.encode(&batch);
        if batch.is_empty() {
            debug!(timestamp_ns, "No metrics enabled, forwarding empty payload");
        } else {
            debug!(timestamp_ns, payload = %payload, "Formatted payload");
        }

        self.forwarder
            .forward(&payload)
            .map_err(TickError::forward)?;

        Ok(TickReport {
            timestamp_ns,
            lines: batch.len(),
            payload_bytes: payload.len(),
        })
    }

    /// Run one tick and log its outcome. Returns whether it succeeded.
    pub fn run_once(&mut self) -> bool {
        match self.tick() {
            Ok(report) => {
                info!(
                    lines = report.lines,
                    bytes = report.payload_bytes,
                    timestamp_ns = report.timestamp_ns,
                    "Metrics forwarded"
                );
                true
            }
            Err(e) => {
                error!(stage = %e.stage(), error = %e, "Tick failed, dropping sample");
                false
            }
        }
    }

    /// Tick then sleep the full interval, `limit` times or forever when
    /// `limit` is `None`. [`Agent::run`] is the daemon's unbounded entry.
    ///
    /// Returns the number of successful ticks.
    pub fn run_ticks(&mut self, limit: Option<u64>) -> u64 {
        let interval = self.config.interval();
        let mut ran = 0u64;
        let mut succeeded = 0u64;

        while limit.map_or(true, |limit| ran < limit) {
            if self.run_once() {
                succeeded += 1;
            }
            ran += 1;
            self.sleeper.sleep(interval);
        }

        succeeded
    }

    /// Loop until the process is killed
    pub fn run(&mut self) -> ! {
        info!(
            interval_secs = self.config.collection_interval,
            metrics = ?self.config.metrics.enabled().collect::<Vec<_>>(),
            "Starting collection loop"
        );
        let interval = self.config.interval();
        loop {
            self.run_once();
            self.sleeper.sleep(interval);
        }
    }

    pub fn sampler(&self) -> &S {
        &self.sampler
    }

    pub fn forwarder(&self) -> &F {
        &self.forwarder
    }

    pub fn sleeper(&self) -> &Z {
        &self.sleeper
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        error::{CoreError, Result, Stage},
        model::NetworkCounters,
    };
    use std::{
        cell::RefCell,
        io,
        sync::{Arc, Mutex},
    };

    struct FixedSampler {
        fail: bool,
        network: NetworkCounters,
    }

    impl FixedSampler {
        fn ok() -> Self {
            Self {
                fail: false,
                network: NetworkCounters::default(),
            }
        }
    }

    impl Sampler for FixedSampler {
        fn cpu_percent(&mut self) -> Result<f64> {
            if self.fail {
                return Err(CoreError::system_info("cpu counters unavailable"));
            }
            Ok(42.5)
        }

        fn memory_percent(&mut self) -> Result<f64> {
            Ok(50.0)
        }

        fn disk_percent(&mut self) -> Result<f64> {
            Ok(f64::INFINITY)
        }

        fn network_counters(&mut self) -> Result<NetworkCounters> {
            self.network.bytes_sent += 100;
            self.network.bytes_recv += 200;
            Ok(self.network)
        }
    }

    /// Records payloads and answers with a canned status
    struct StubForwarder {
        status: Option<u16>,
        payloads: RefCell<Vec<String>>,
    }

    impl StubForwarder {
        fn answering(status: u16) -> Self {
            Self {
                status: Some(status),
                payloads: RefCell::new(Vec::new()),
            }
        }

        fn unreachable() -> Self {
            Self {
                status: None,
                payloads: RefCell::new(Vec::new()),
            }
        }
    }

    impl Forwarder for StubForwarder {
        fn forward(&self, payload: &str) -> Result<()> {
            self.payloads.borrow_mut().push(payload.to_string());
            match self.status {
                Some(204) => Ok(()),
                Some(status) => Err(CoreError::UnexpectedStatus {
                    status,
                    body: String::new(),
                }),
                None => Err(CoreError::transport("connection refused")),
            }
        }
    }

    #[derive(Default)]
    struct RecordingSleeper {
        slept: Vec<Duration>,
    }

    impl Sleeper for RecordingSleeper {
        fn sleep(&mut self, duration: Duration) {
            self.slept.push(duration);
        }
    }

    #[derive(Clone, Default)]
    struct LogBuffer(Arc<Mutex<Vec<u8>>>);

    impl io::Write for LogBuffer {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl LogBuffer {
        fn contents(&self) -> String {
            String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
        }
    }

    fn capture_logs<T>(f: impl FnOnce() -> T) -> (T, String) {
        let buffer = LogBuffer::default();
        let writer = buffer.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || writer.clone())
            .with_ansi(false)
            .with_max_level(tracing::Level::INFO)
            .finish();

        let result = tracing::subscriber::with_default(subscriber, f);
        (result, buffer.contents())
    }

    fn config(metrics: &str, interval: u64) -> Config {
        Config::from_json(&format!(
            r#"{{"collection_interval": {interval}, "metrics": {metrics},
                "database": {{"url": "http://x/write", "auth": {{"username": "a", "password": "b"}}}}}}"#
        ))
        .unwrap()
    }

    #[test]
    fn successful_tick_logs_info_and_sleeps_interval() {
        let config = config(r#"{"cpu": true}"#, 3);
        let mut agent = Agent::with_sleeper(
            &config,
            FixedSampler::ok(),
            StubForwarder::answering(204),
            RecordingSleeper::default(),
        );

        let (succeeded, logs) = capture_logs(|| agent.run_ticks(Some(1)));

        assert_eq!(succeeded, 1);
        assert_eq!(logs.matches(" INFO ").count(), 1);
        assert_eq!(logs.matches(" ERROR ").count(), 0);
        assert!(logs.contains("Metrics forwarded"));
        assert_eq!(agent.sleeper().slept, vec![Duration::from_secs(3)]);

        let payloads = agent.forwarder().payloads.borrow();
        assert_eq!(payloads.len(), 1);
        assert!(payloads[0].starts_with("system_metrics,metric=cpu value=42.5 "));
    }

    #[test]
    fn rejected_write_logs_error_and_keeps_full_sleep() {
        let config = config(r#"{"cpu": true, "memory": true}"#, 5);
        let mut agent = Agent::with_sleeper(
            &config,
            FixedSampler::ok(),
            StubForwarder::answering(500),
            RecordingSleeper::default(),
        );

        let (succeeded, logs) = capture_logs(|| agent.run_ticks(Some(2)));

        assert_eq!(succeeded, 0);
        assert_eq!(logs.matches(" ERROR ").count(), 2);
        assert!(logs.contains("stage=forward"));
        assert_eq!(
            agent.sleeper().slept,
            vec![Duration::from_secs(5), Duration::from_secs(5)]
        );
        // Each tick makes exactly one attempt, nothing is re-sent
        assert_eq!(agent.forwarder().payloads.borrow().len(), 2);
    }

    #[test]
    fn transport_failure_is_a_forward_stage_error() {
        let config = config(r#"{"memory": true}"#, 1);
        let mut agent = Agent::with_sleeper(
            &config,
            FixedSampler::ok(),
            StubForwarder::unreachable(),
            RecordingSleeper::default(),
        );

        let err = agent.tick().unwrap_err();
        assert_eq!(err.stage(), Stage::Forward);
        assert!(matches!(err.inner(), CoreError::Transport(_)));
    }

    #[test]
    fn sampler_failure_is_a_sample_stage_error() {
        let config = config(r#"{"cpu": true}"#, 1);
        let mut agent = Agent::with_sleeper(
            &config,
            FixedSampler {
                fail: true,
                network: NetworkCounters::default(),
            },
            StubForwarder::answering(204),
            RecordingSleeper::default(),
        );

        let err = agent.tick().unwrap_err();
        assert_eq!(err.stage(), Stage::Sample);
        assert!(agent.forwarder().payloads.borrow().is_empty());
    }

    #[test]
    fn non_finite_reading_is_a_format_stage_error() {
        let config = config(r#"{"disk": true}"#, 1);
        let mut agent = Agent::with_sleeper(
            &config,
            FixedSampler::ok(),
            StubForwarder::answering(204),
            RecordingSleeper::default(),
        );

        let (ok, logs) = capture_logs(|| agent.run_once());
        assert!(!ok);
        assert!(logs.contains("stage=format"));
        assert!(agent.forwarder().payloads.borrow().is_empty());
    }

    #[test]
    fn nothing_enabled_still_posts_empty_body() {
        let config = config("{}", 1);
        let mut agent = Agent::with_sleeper(
            &config,
            FixedSampler::ok(),
            StubForwarder::answering(204),
            RecordingSleeper::default(),
        );

        let report = agent.tick().unwrap();
        assert_eq!(report.lines, 0);
        assert_eq!(report.payload_bytes, 0);
        assert_eq!(agent.forwarder().payloads.borrow().as_slice(), [""]);
    }

    #[test]
    fn consecutive_ticks_have_increasing_timestamps() {
        let config = config(r#"{"cpu": true, "network": true}"#, 1);
        let mut agent = Agent::with_sleeper(
            &config,
            FixedSampler::ok(),
            StubForwarder::answering(204),
            RecordingSleeper::default(),
        );

        let first = agent.tick().unwrap();
        let second = agent.tick().unwrap();
        assert!(second.timestamp_ns > first.timestamp_ns);

        let payloads = agent.forwarder().payloads.borrow();
        for (payload, report) in payloads.iter().zip([&first, &second]) {
            for line in payload.lines() {
                assert!(line.ends_with(&format!(" {}", report.timestamp_ns)));
            }
        }
    }

    #[test]
    fn failure_does_not_affect_next_tick() {
        let config = config(r#"{"network": true}"#, 2);
        let mut agent = Agent::with_sleeper(
            &config,
            FixedSampler::ok(),
            StubForwarder::answering(503),
            RecordingSleeper::default(),
        );
        assert!(agent.tick().is_err());

        agent.forwarder.status = Some(204);
        let report = agent.tick().unwrap();
        assert_eq!(report.lines, 1);

        let payloads = agent.forwarder().payloads.borrow();
        assert!(payloads[1].contains("bytes_sent=200,bytes_recv=400"));
    }
}
