//! The run timer: elapsed-time measurement with pause/resume bookkeeping
use crate::clock::Clock;
use crate::command::Command;
use log::debug;

/// Callback registered for elapsed-time updates, in milliseconds
pub type ElapsedObserver = Box<dyn FnMut(i64) + Send>;

/// Owns the monotonic clock and the running/paused state of the stopwatch.
///
/// Elapsed time is the sum of `banked_ms` (time accumulated before the last
/// pause) and the clock reading since the last (re)start. Pause folds the
/// clock into `banked_ms` and resume restarts the clock, so pausing never
/// loses or double-counts time.
pub struct RunTimer<C: Clock> {
    clock: C,
    running: bool,
    paused: bool,
    banked_ms: i64,
    ticking: bool,
    observers: Vec<ElapsedObserver>,
}

impl<C: Clock> RunTimer<C> {
    pub fn new(clock: C) -> Self {
        Self {
            clock,
            running: false,
            paused: false,
            banked_ms: 0,
            ticking: false,
            observers: Vec::new(),
        }
    }

    /// Register an observer for elapsed-time updates. Observers only read the
    /// stream, they never feed anything back.
    pub fn subscribe<F>(&mut self, observer: F)
    where
        F: FnMut(i64) + Send + 'static,
    {
        self.observers.push(Box::new(observer));
    }

    /// (Re)initialize the clock and start emitting from zero
    pub fn start(&mut self) {
        if self.clock.is_valid() {
            self.clock.restart();
        } else {
            self.clock.start();
        }
        self.banked_ms = 0;
        self.ticking = true;
        self.running = true;
        self.paused = false;
        self.emit(0);
    }

    /// Dispatch a control command. Commands that do not concern the timer
    /// (`UNSPLIT`, `SKIP`, `LOCK`) are no-ops at this layer.
    pub fn handle_control(&mut self, command: Command) {
        match command {
            Command::StartSplit => self.on_start_split(),
            Command::Pause => self.on_pause(),
            Command::Resume => self.on_resume(),
            Command::Stop => self.on_stop(),
            Command::Reset => self.on_reset(),
            Command::Unsplit | Command::Skip | Command::Lock => {}
        }
    }

    fn on_start_split(&mut self) {
        // only the first STARTSPLIT of a run starts the stopwatch
        if self.running {
            return;
        }
        self.start();
        debug!("timer started");
    }

    fn on_pause(&mut self) {
        if !self.running || self.paused {
            return;
        }
        self.banked_ms += self.clock.elapsed_ms();
        self.ticking = false;
        self.paused = true;
        let frozen = self.banked_ms;
        self.emit(frozen);
        debug!("timer paused at {frozen}ms");
    }

    fn on_resume(&mut self) {
        if !self.running || !self.paused {
            return;
        }
        // restart so the clock measures only the post-resume interval
        self.clock.restart();
        self.ticking = true;
        self.paused = false;
        let resumed_at = self.banked_ms;
        self.emit(resumed_at);
        debug!("timer resumed at {resumed_at}ms");
    }

    fn on_stop(&mut self) {
        if !self.running {
            return;
        }
        // a paused timer already holds its elapsed value in the banked offset
        let finished = if self.paused {
            self.banked_ms
        } else {
            self.banked_ms + self.clock.elapsed_ms()
        };
        self.ticking = false;
        self.running = false;
        self.paused = false;
        self.banked_ms = 0;
        self.emit(finished);
        debug!("timer stopped at {finished}ms");
    }

    fn on_reset(&mut self) {
        self.ticking = false;
        self.running = false;
        self.paused = false;
        self.banked_ms = 0;
        self.emit(0);
        debug!("timer reset");
    }

    /// Periodic tick: emit the live elapsed value while running and not
    /// paused. Returns the emitted value, if any.
    pub fn tick(&mut self) -> Option<i64> {
        if !self.ticking || !self.running || self.paused {
            return None;
        }
        let elapsed = self.banked_ms + self.clock.elapsed_ms();
        self.emit(elapsed);
        Some(elapsed)
    }

    /// The elapsed value at this instant, without emitting an update
    pub fn current_elapsed_ms(&self) -> i64 {
        if self.running && !self.paused {
            self.banked_ms + self.clock.elapsed_ms()
        } else {
            self.banked_ms
        }
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    /// Stop ticking; safe to call more than once
    pub fn quit(&mut self) {
        self.ticking = false;
    }

    fn emit(&mut self, elapsed_ms: i64) {
        for observer in &mut self.observers {
            observer(elapsed_ms);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::{ManualClock, ManualTime};
    use std::sync::{Arc, Mutex};

    fn timer_with_log() -> (RunTimer<ManualClock>, ManualTime, Arc<Mutex<Vec<i64>>>) {
        let clock = ManualClock::new();
        let time = clock.handle();
        let mut timer = RunTimer::new(clock);
        let log = Arc::new(Mutex::new(Vec::new()));
        let sink = log.clone();
        timer.subscribe(move |elapsed| sink.lock().unwrap().push(elapsed));
        (timer, time, log)
    }

    #[test]
    fn start_split_starts_once() {
        let (mut timer, time, log) = timer_with_log();
        timer.handle_control(Command::StartSplit);
        assert!(timer.is_running());
        assert_eq!(*log.lock().unwrap(), vec![0]);

        time.advance(100);
        // second STARTSPLIT while running must not restart the clock
        timer.handle_control(Command::StartSplit);
        assert_eq!(timer.current_elapsed_ms(), 100);
    }

    #[test]
    fn pause_is_idempotent() {
        let (mut timer, time, log) = timer_with_log();
        timer.handle_control(Command::StartSplit);
        time.advance(400);
        timer.handle_control(Command::Pause);
        timer.handle_control(Command::Pause);
        assert!(timer.is_paused());
        assert!(timer.is_running());
        assert_eq!(*log.lock().unwrap(), vec![0, 400]);
        assert_eq!(timer.current_elapsed_ms(), 400);
    }

    #[test]
    fn pause_resume_conserves_elapsed_time() {
        let (mut timer, time, _log) = timer_with_log();
        timer.handle_control(Command::StartSplit);
        time.advance(1_000);
        timer.handle_control(Command::Pause);

        // wall clock keeps moving while paused
        time.advance(5_000);
        assert_eq!(timer.current_elapsed_ms(), 1_000);

        timer.handle_control(Command::Resume);
        time.advance(500);
        assert_eq!(timer.current_elapsed_ms(), 1_500);
    }

    #[test]
    fn several_pause_cycles_accumulate() {
        let (mut timer, time, _log) = timer_with_log();
        timer.handle_control(Command::StartSplit);
        for _ in 0..3 {
            time.advance(200);
            timer.handle_control(Command::Pause);
            time.advance(10_000);
            timer.handle_control(Command::Resume);
        }
        assert_eq!(timer.current_elapsed_ms(), 600);
    }

    #[test]
    fn stop_freezes_the_finishing_time() {
        let (mut timer, time, log) = timer_with_log();
        timer.handle_control(Command::StartSplit);
        time.advance(3_800);
        timer.handle_control(Command::Stop);
        assert!(!timer.is_running());
        assert_eq!(log.lock().unwrap().last(), Some(&3_800));
        // elapsed no longer advances
        time.advance(1_000);
        assert_eq!(timer.current_elapsed_ms(), 0);
        assert!(timer.tick().is_none());
    }

    #[test]
    fn stop_while_paused_uses_frozen_offset() {
        let (mut timer, time, log) = timer_with_log();
        timer.handle_control(Command::StartSplit);
        time.advance(2_000);
        timer.handle_control(Command::Pause);
        time.advance(9_000);
        timer.handle_control(Command::Stop);
        assert_eq!(log.lock().unwrap().last(), Some(&2_000));
    }

    #[test]
    fn reset_always_emits_zero() {
        let (mut timer, time, log) = timer_with_log();
        timer.handle_control(Command::Reset);
        timer.handle_control(Command::StartSplit);
        time.advance(700);
        timer.handle_control(Command::Reset);
        assert!(!timer.is_running());
        assert_eq!(*log.lock().unwrap(), vec![0, 0, 0]);
    }

    #[test]
    fn stop_when_not_running_is_silent() {
        let (mut timer, _time, log) = timer_with_log();
        timer.handle_control(Command::Stop);
        timer.handle_control(Command::Resume);
        assert!(log.lock().unwrap().is_empty());
    }

    #[test]
    fn unrelated_commands_are_noops() {
        let (mut timer, _time, log) = timer_with_log();
        timer.handle_control(Command::Unsplit);
        timer.handle_control(Command::Skip);
        timer.handle_control(Command::Lock);
        assert!(log.lock().unwrap().is_empty());
        assert!(!timer.is_running());
    }

    #[test]
    fn tick_emits_only_while_running_unpaused() {
        let (mut timer, time, log) = timer_with_log();
        assert!(timer.tick().is_none());
        timer.handle_control(Command::StartSplit);
        time.advance(42);
        assert_eq!(timer.tick(), Some(42));
        timer.handle_control(Command::Pause);
        assert!(timer.tick().is_none());
        assert_eq!(*log.lock().unwrap(), vec![0, 42, 42]);
    }

    #[test]
    fn quit_is_idempotent() {
        let (mut timer, _time, _log) = timer_with_log();
        timer.handle_control(Command::StartSplit);
        timer.quit();
        timer.quit();
        assert!(timer.tick().is_none());
    }
}
