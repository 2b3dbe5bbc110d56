//! Wires the run timer, the split sequence and the run record together,
//! preserving command/tick ordering
use crate::clock::{Clock, MonotonicClock};
use crate::command::Command;
use crate::game::Game;
use crate::splits::{SequenceEvent, SplitSequence};
use crate::timer::RunTimer;
use log::{error, warn};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

/// Callback for run-finished / run-reset notifications
pub type RunObserver = Box<dyn FnMut() + Send>;

/// Owns the `{timer, splits, game}` triple and processes every control
/// command and tick against all of them under one `&mut self`, so an index
/// advance is always visible before the next tick and the new split's segment
/// start is captured from the elapsed value at the instant of the command.
pub struct Session<C: Clock = MonotonicClock> {
    timer: RunTimer<C>,
    splits: SplitSequence,
    game: Game,
    finish_observers: Vec<RunObserver>,
    reset_observers: Vec<RunObserver>,
}

impl Session<MonotonicClock> {
    pub fn new(game: Game) -> Session<MonotonicClock> {
        Session::with_clock(game, MonotonicClock::new())
    }
}

impl<C: Clock> Session<C> {
    pub fn with_clock(game: Game, clock: C) -> Session<C> {
        let splits = SplitSequence::new(&game);
        Session {
            timer: RunTimer::new(clock),
            splits,
            game,
            finish_observers: Vec::new(),
            reset_observers: Vec::new(),
        }
    }

    /// Subscribe to the elapsed-milliseconds broadcast
    pub fn subscribe_elapsed<F>(&mut self, observer: F)
    where
        F: FnMut(i64) + Send + 'static,
    {
        self.timer.subscribe(observer);
    }

    pub fn on_finish<F>(&mut self, observer: F)
    where
        F: FnMut() + Send + 'static,
    {
        self.finish_observers.push(Box::new(observer));
    }

    pub fn on_reset<F>(&mut self, observer: F)
    where
        F: FnMut() + Send + 'static,
    {
        self.reset_observers.push(Box::new(observer));
    }

    /// Fan a command out to the timer first, then to the split sequence with
    /// the elapsed value read at this very instant.
    pub fn handle_control(&mut self, command: Command) {
        self.timer.handle_control(command);
        let elapsed = self.timer.current_elapsed_ms();
        match self.splits.handle_control(command, elapsed, &mut self.game) {
            Some(SequenceEvent::Started) => {
                // one attempt per run start, completed or abandoned
                self.game.add_attempt();
            }
            Some(SequenceEvent::Finished) => {
                // freeze the timer on the finishing time
                self.timer.handle_control(Command::Stop);
                for observer in &mut self.finish_observers {
                    observer();
                }
            }
            Some(SequenceEvent::Reset) => {
                for observer in &mut self.reset_observers {
                    observer();
                }
            }
            _ => {}
        }
    }

    /// One periodic tick: broadcast the elapsed value and refresh the active
    /// split's live comparison
    pub fn tick(&mut self) {
        if let Some(elapsed) = self.timer.tick() {
            self.splits.tick(elapsed, &self.game);
        }
    }

    pub fn game(&self) -> &Game {
        &self.game
    }

    pub fn splits(&self) -> &SplitSequence {
        &self.splits
    }

    pub fn current_elapsed_ms(&self) -> i64 {
        self.timer.current_elapsed_ms()
    }

    pub fn is_running(&self) -> bool {
        self.timer.is_running()
    }

    pub fn is_paused(&self) -> bool {
        self.timer.is_paused()
    }

    /// Cooperative shutdown; safe to call more than once
    pub fn quit(&mut self) {
        self.timer.quit();
    }
}

/// Background 1ms tick driver over a shared session. Dropping the ticker
/// stops the thread.
pub struct Ticker {
    stop: Arc<AtomicBool>,
    handle: Option<thread::JoinHandle<()>>,
}

impl Ticker {
    /// Start ticking `session` every `interval` until shutdown
    pub fn spawn<C>(session: Arc<Mutex<Session<C>>>, interval: Duration) -> Ticker
    where
        C: Clock + Send + 'static,
    {
        let stop = Arc::new(AtomicBool::new(false));
        let stop_flag = stop.clone();
        let handle = thread::spawn(move || {
            while !stop_flag.load(Ordering::Relaxed) {
                match session.lock() {
                    Ok(mut session) => session.tick(),
                    Err(e) => {
                        error!("session lock poisoned, stopping ticker: {e}");
                        break;
                    }
                }
                thread::sleep(interval);
            }
        });
        Ticker {
            stop,
            handle: Some(handle),
        }
    }

    /// Stop the tick thread; idempotent
    pub fn shutdown(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                warn!("ticker thread panicked before shutdown");
            }
        }
    }
}

impl Drop for Ticker {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
        self.handle.take();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::{ManualClock, ManualTime};
    use crate::game::tests::TEST_GAME_JSON;
    use crate::splits::Phase;

    fn test_session() -> (Session<ManualClock>, ManualTime) {
        let game = Game::from_json_str(TEST_GAME_JSON).unwrap();
        let clock = ManualClock::new();
        let time = clock.handle();
        (Session::with_clock(game, clock), time)
    }

    #[test]
    fn start_counts_one_attempt_and_starts_both_machines() {
        let (mut session, time) = test_session();
        session.handle_control(Command::StartSplit);
        assert!(session.is_running());
        assert_eq!(session.splits().phase(), Phase::Running);
        assert_eq!(session.game().session_attempts, 1);
        assert_eq!(session.game().lifetime_attempts, 2);

        // advancing within the run is not another attempt
        time.advance(500);
        session.handle_control(Command::StartSplit);
        assert_eq!(session.game().session_attempts, 1);
    }

    #[test]
    fn segment_start_uses_the_elapsed_value_at_the_press() {
        let (mut session, time) = test_session();
        session.handle_control(Command::StartSplit);
        time.advance(700);
        session.tick();
        // clock moves between the tick and the press
        time.advance(250);
        session.handle_control(Command::StartSplit);
        assert_eq!(session.splits().live(0).current_segment_ms, 950);
        assert_eq!(session.splits().live(1).segment_start_ms, 950);
    }

    #[test]
    fn finishing_stops_the_timer_and_notifies() {
        let (mut session, time) = test_session();
        let finishes = Arc::new(Mutex::new(0));
        let counter = finishes.clone();
        session.on_finish(move || *counter.lock().unwrap() += 1);

        session.handle_control(Command::StartSplit);
        time.advance(900);
        session.handle_control(Command::StartSplit);
        time.advance(1_700);
        session.handle_control(Command::StartSplit);
        time.advance(1_200);
        session.handle_control(Command::StartSplit);

        assert_eq!(session.splits().phase(), Phase::Finished);
        assert!(!session.is_running());
        assert_eq!(*finishes.lock().unwrap(), 1);
        // reconciliation reached the record: 3800 < 4000 was a PB
        assert_eq!(session.game().splits[2].pb_time_ms, 3_800);
    }

    #[test]
    fn reset_notifies_and_returns_everything_to_zero() {
        let (mut session, time) = test_session();
        let resets = Arc::new(Mutex::new(0));
        let counter = resets.clone();
        session.on_reset(move || *counter.lock().unwrap() += 1);

        session.handle_control(Command::StartSplit);
        time.advance(400);
        session.handle_control(Command::Reset);

        assert_eq!(*resets.lock().unwrap(), 1);
        assert!(!session.is_running());
        assert_eq!(session.splits().phase(), Phase::NotStarted);
        assert_eq!(session.current_elapsed_ms(), 0);
    }

    #[test]
    fn pause_freezes_the_live_comparison() {
        let (mut session, time) = test_session();
        session.handle_control(Command::StartSplit);
        time.advance(300);
        session.tick();
        session.handle_control(Command::Pause);
        time.advance(10_000);
        session.tick();
        assert_eq!(session.splits().live(0).current_time_ms, 300);
        session.handle_control(Command::Resume);
        time.advance(100);
        session.tick();
        assert_eq!(session.splits().live(0).current_time_ms, 400);
    }

    #[test]
    fn ticker_shutdown_is_idempotent() {
        let game = Game::from_json_str(TEST_GAME_JSON).unwrap();
        let session = Arc::new(Mutex::new(Session::new(game)));
        let mut ticker = Ticker::spawn(session, Duration::from_millis(1));
        ticker.shutdown();
        ticker.shutdown();
    }
}
