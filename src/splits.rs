//! The split sequence: index progression, live comparison against stored
//! bests and reconciliation of achieved times back into the run record
use crate::command::Command;
use crate::game::Game;
use log::{debug, info};

/// Deltas are hidden until the runner is within this many milliseconds of the
/// comparison checkpoint, to avoid noisy "way behind" readings early in a
/// long segment.
pub const DELTA_WINDOW_MS: i64 = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    NotStarted,
    Running,
    Finished,
}

/// Comparison rank of a finalized segment, what the UI colors communicate.
/// Gold outranks saved time, saved time outranks lost time; gold and saved
/// each carry an ahead/behind shading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SegmentRank {
    /// No finalized time for this attempt yet
    #[default]
    Neutral,
    /// Best-ever segment, also faster than the PB pace
    GoldAhead,
    /// Best-ever segment even though the run is behind pace
    GoldBehind,
    /// Faster than the PB's segment without being a gold
    SavedTime,
    /// Cumulative time at or past the PB checkpoint
    LostTime,
    /// Slower segment but still ahead of the PB pace overall
    Ahead,
}

/// Per-split live state for the current attempt, all zero outside a run
#[derive(Debug, Clone, Default)]
pub struct LiveSplit {
    /// Cumulative elapsed time at the last update of this split
    pub current_time_ms: i64,
    /// Duration of this split's segment so far
    pub current_segment_ms: i64,
    /// Elapsed value at the instant this split became current
    pub segment_start_ms: i64,
    /// Signed difference against the PB checkpoint, when displayable
    pub delta_ms: Option<i64>,
    pub rank: SegmentRank,
}

/// What a control command did to the sequence, for collaborators to react to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SequenceEvent {
    Started,
    Advanced,
    SteppedBack,
    Finished,
    Reset,
    Stopped,
}

/// State machine over `{NotStarted, Running, Finished}` owning the current
/// split index and the per-split live comparisons.
pub struct SplitSequence {
    live: Vec<LiveSplit>,
    index: usize,
    phase: Phase,
}

impl SplitSequence {
    pub fn new(game: &Game) -> SplitSequence {
        SplitSequence {
            live: vec![LiveSplit::default(); game.splits.len()],
            index: 0,
            phase: Phase::NotStarted,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn current_index(&self) -> usize {
        self.index
    }

    pub fn len(&self) -> usize {
        self.live.len()
    }

    pub fn is_empty(&self) -> bool {
        self.live.is_empty()
    }

    pub fn live(&self, i: usize) -> &LiveSplit {
        &self.live[i]
    }

    /// Update the active split's live comparison from a timer tick
    pub fn tick(&mut self, elapsed_ms: i64, game: &Game) {
        if self.phase != Phase::Running {
            return;
        }
        let record = &game.splits[self.index];
        let live = &mut self.live[self.index];
        live.current_segment_ms = elapsed_ms - live.segment_start_ms;
        live.current_time_ms = elapsed_ms;

        let delta = elapsed_ms - record.pb_time_ms;
        live.delta_ms = if delta >= -DELTA_WINDOW_MS {
            Some(delta)
        } else {
            None
        };
    }

    /// Dispatch a control command. `elapsed_ms` must be the timer's elapsed
    /// value at the instant of the command, so segment accounting does not
    /// drift against stale ticks.
    pub fn handle_control(
        &mut self,
        command: Command,
        elapsed_ms: i64,
        game: &mut Game,
    ) -> Option<SequenceEvent> {
        match command {
            Command::StartSplit => Some(self.on_start_split(elapsed_ms, game)),
            Command::Unsplit => self.on_unsplit(),
            Command::Reset => Some(self.on_reset()),
            Command::Stop => Some(self.on_stop(game)),
            Command::Skip | Command::Lock | Command::Pause | Command::Resume => None,
        }
    }

    fn on_start_split(&mut self, elapsed_ms: i64, game: &mut Game) -> SequenceEvent {
        match self.phase {
            Phase::NotStarted | Phase::Finished => {
                // fresh attempt: everything back to zero, decorations included
                for live in &mut self.live {
                    *live = LiveSplit::default();
                }
                self.index = 0;
                self.live[0].segment_start_ms = elapsed_ms;
                self.phase = Phase::Running;
                info!("run started");
                SequenceEvent::Started
            }
            Phase::Running => {
                self.finalize_current(elapsed_ms, game);
                if self.index == self.live.len() - 1 {
                    self.finish(elapsed_ms, game);
                    SequenceEvent::Finished
                } else {
                    self.index += 1;
                    self.live[self.index].segment_start_ms = elapsed_ms;
                    debug!("advanced to split {}", self.index);
                    SequenceEvent::Advanced
                }
            }
        }
    }

    /// Freeze the current split's time and classify its finished segment
    fn finalize_current(&mut self, elapsed_ms: i64, game: &Game) {
        let record = &game.splits[self.index];
        let live = &mut self.live[self.index];
        live.current_segment_ms = elapsed_ms - live.segment_start_ms;
        live.current_time_ms = elapsed_ms;
        // a finalized split always shows its delta, window rule or not
        live.delta_ms = Some(elapsed_ms - record.pb_time_ms);
        live.rank = classify(live.current_segment_ms, live.current_time_ms, record);
        debug!(
            "split {} finalized: segment {}ms, rank {:?}",
            self.index, live.current_segment_ms, live.rank
        );
    }

    /// Terminal finish through the last split: reconcile achieved times into
    /// the record. PB fields only move on a strict overall improvement; golds
    /// move for any segment faster than its stored best.
    fn finish(&mut self, elapsed_ms: i64, game: &mut Game) {
        let last = game.splits.len() - 1;
        let is_new_personal_best = game.splits[last].pb_time_ms > elapsed_ms;

        for (live, record) in self.live.iter_mut().zip(game.splits.iter_mut()) {
            if is_new_personal_best {
                record.pb_time_ms = live.current_time_ms;
                record.pb_segment_ms = live.current_segment_ms;
            }
            if live.current_segment_ms < record.gold_segment_ms {
                record.gold_segment_ms = live.current_segment_ms;
            }
            live.current_time_ms = 0;
            live.current_segment_ms = 0;
        }
        game.recompute_totals();

        self.phase = Phase::Finished;
        if is_new_personal_best {
            info!("run finished in {elapsed_ms}ms: new personal best");
        } else {
            info!("run finished in {elapsed_ms}ms");
        }
    }

    fn on_unsplit(&mut self) -> Option<SequenceEvent> {
        if self.phase != Phase::Running || self.index == 0 {
            return None;
        }
        // the in-progress segment is discarded, not finalized
        self.live[self.index] = LiveSplit::default();
        self.index -= 1;
        self.live[self.index].rank = SegmentRank::Neutral;
        debug!("stepped back to split {}", self.index);
        Some(SequenceEvent::SteppedBack)
    }

    /// Discard the in-progress attempt without touching stored bests
    fn on_reset(&mut self) -> SequenceEvent {
        for live in &mut self.live {
            *live = LiveSplit::default();
        }
        self.index = 0;
        self.phase = Phase::NotStarted;
        info!("run reset");
        SequenceEvent::Reset
    }

    /// End the run early. Gold improvements are kept even on an aborted run;
    /// PB fields never move here.
    fn on_stop(&mut self, game: &mut Game) -> SequenceEvent {
        let mut golds = 0;
        for (live, record) in self.live.iter_mut().zip(game.splits.iter_mut()) {
            if live.current_segment_ms != 0 && live.current_segment_ms < record.gold_segment_ms {
                record.gold_segment_ms = live.current_segment_ms;
                golds += 1;
            }
            *live = LiveSplit::default();
        }
        if golds > 0 {
            game.recompute_totals();
            info!("run stopped early, {golds} gold segment(s) saved");
        } else {
            info!("run stopped early");
        }
        self.index = 0;
        self.phase = Phase::NotStarted;
        SequenceEvent::Stopped
    }
}

/// The four-tier comparison: gold beats saved time beats lost time, with
/// ahead/behind shading inside the gold and non-gold tiers
fn classify(segment_ms: i64, cumulative_ms: i64, record: &crate::game::SplitRecord) -> SegmentRank {
    if segment_ms < record.gold_segment_ms {
        if segment_ms < record.pb_segment_ms {
            SegmentRank::GoldAhead
        } else {
            SegmentRank::GoldBehind
        }
    } else if segment_ms < record.pb_segment_ms {
        SegmentRank::SavedTime
    } else if cumulative_ms >= record.pb_time_ms {
        SegmentRank::LostTime
    } else {
        SegmentRank::Ahead
    }
}
