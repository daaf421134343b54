use std::time::{SystemTime, UNIX_EPOCH};

/// Hands out one nanosecond epoch timestamp per tick.
///
/// Consecutive timestamps are strictly increasing even if the wall clock
/// stalls or steps backwards.
#[derive(Debug, Default)]
pub struct TimestampClock {
    last: Option<u64>,
}

impl TimestampClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next(&mut self) -> u64 {
        self.advance(wall_clock_ns())
    }

    fn advance(&mut self, now: u64) -> u64 {
        let stamp = match self.last {
            Some(last) if now <= last => last.saturating_add(1),
            _ => now,
        };
        self.last = Some(stamp);
        stamp
    }
}

/// Nanoseconds since the Unix epoch, 0 if the clock is set before it
pub fn wall_clock_ns() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| u64::try_from(elapsed.as_nanos()).unwrap_or(u64::MAX))
        .unwrap_or(0)
}
