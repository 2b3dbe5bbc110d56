//! Monotonic elapsed-time sources for the run timer
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use std::time::Instant;

/// An elapsed-time source with start/restart/query semantics. The run timer
/// only ever reads milliseconds since the last (re)start.
pub trait Clock {
    /// Begin measuring from now
    fn start(&mut self);

    /// Begin measuring from now, discarding the previous measurement
    fn restart(&mut self);

    /// Milliseconds since the last (re)start, 0 if never started
    fn elapsed_ms(&self) -> i64;

    /// Whether the clock has ever been started
    fn is_valid(&self) -> bool;
}

/// Wall-clock independent implementation over [`std::time::Instant`]
#[derive(Debug, Default)]
pub struct MonotonicClock {
    started_at: Option<Instant>,
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Clock for MonotonicClock {
    fn start(&mut self) {
        self.started_at = Some(Instant::now());
    }

    fn restart(&mut self) {
        self.started_at = Some(Instant::now());
    }

    fn elapsed_ms(&self) -> i64 {
        match self.started_at {
            Some(at) => at.elapsed().as_millis() as i64,
            None => 0,
        }
    }

    fn is_valid(&self) -> bool {
        self.started_at.is_some()
    }
}

/// Shared hand-driven time source backing a [`ManualClock`]; keep a clone to
/// move time forward after the clock has been handed to a timer
#[derive(Debug, Clone, Default)]
pub struct ManualTime(Arc<AtomicI64>);

impl ManualTime {
    pub fn new() -> Self {
        Self::default()
    }

    /// Move the "wall clock" forward by `ms`
    pub fn advance(&self, ms: i64) {
        self.0.fetch_add(ms, Ordering::SeqCst);
    }

    fn now_ms(&self) -> i64 {
        self.0.load(Ordering::SeqCst)
    }
}

/// Hand-driven clock for tests: elapsed time only moves when its
/// [`ManualTime`] handle is advanced
#[derive(Debug, Default)]
pub struct ManualClock {
    time: ManualTime,
    started_at_ms: i64,
    started: bool,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// A clone of the time handle driving this clock
    pub fn handle(&self) -> ManualTime {
        self.time.clone()
    }
}

impl Clock for ManualClock {
    fn start(&mut self) {
        self.started_at_ms = self.time.now_ms();
        self.started = true;
    }

    fn restart(&mut self) {
        self.started_at_ms = self.time.now_ms();
        self.started = true;
    }

    fn elapsed_ms(&self) -> i64 {
        if self.started {
            self.time.now_ms() - self.started_at_ms
        } else {
            0
        }
    }

    fn is_valid(&self) -> bool {
        self.started
    }
}
