//! The fixed-timestep simulation driver.
//!
//! [`Simulation`] owns the board, the event timeline, and the checkpoint
//! ring, and advances them in lockstep with the peer. Each tick:
//!
//! 1. The tick counter advances; simulation time is recomputed as
//!    `tick_count * tick_dt` (multiplication, not accumulation, so the
//!    two peers cannot drift apart through repeated addition).
//! 2. The board runs its two-phase advance.
//! 3. Due events drain from the timeline into the board, in order.
//! 4. On the checkpoint cadence, a hashed snapshot joins the ring.
//!
//! An event whose apparition time has already passed triggers a rollback:
//! the newest checkpoint from before the apparition is restored, the
//! timeline cursor rewinds, and the missed ticks re-simulate with the
//! late event now in place. Both peers end up with the state they would
//! have had if the event had arrived on time.

use tracing::debug;

use crate::board::Board;
use crate::event::GameEvent;
use crate::snapshot::{BoardSnapshot, CheckpointRing};
use crate::timeline::{Admission, Timeline};
use crate::SimError;

/// Fixed tick duration: 25 simulation ticks per second of synced time.
pub const TICK_DT: f64 = 1.0 / 25.0;

// ---------------------------------------------------------------------------
// SimConfig
// ---------------------------------------------------------------------------

/// Tuning knobs for the simulation driver.
#[derive(Debug, Clone)]
pub struct SimConfig {
    /// Seconds per tick. Must be positive and finite.
    pub tick_dt: f64,
    /// A checkpoint is recorded every this many ticks.
    pub checkpoint_interval_ticks: u64,
    /// Seconds of checkpoint history retained for rollback.
    pub checkpoint_horizon: f64,
}

impl Default for SimConfig {
    /// 25 Hz ticks, a checkpoint every 5 ticks (0.2 s), 4 seconds of
    /// rollback history.
    fn default() -> Self {
        Self {
            tick_dt: TICK_DT,
            checkpoint_interval_ticks: 5,
            checkpoint_horizon: 4.0,
        }
    }
}

// ---------------------------------------------------------------------------
// Simulation
// ---------------------------------------------------------------------------

/// The deterministic lockstep driver: board + timeline + checkpoints.
pub struct Simulation {
    board: Board,
    timeline: Timeline,
    checkpoints: CheckpointRing,
    tick_count: u64,
    config: SimConfig,
}

impl Simulation {
    /// A fresh simulation with the six towers placed and a tick-zero
    /// checkpoint recorded.
    ///
    /// # Panics
    ///
    /// Panics if `tick_dt` is not positive and finite, or if the
    /// checkpoint interval is zero.
    pub fn new(config: SimConfig) -> Self {
        assert!(
            config.tick_dt > 0.0 && config.tick_dt.is_finite(),
            "tick_dt must be positive and finite, got {}",
            config.tick_dt
        );
        assert!(
            config.checkpoint_interval_ticks > 0,
            "checkpoint interval must be at least one tick"
        );
        let board = Board::new();
        let mut checkpoints = CheckpointRing::new(config.checkpoint_horizon);
        checkpoints.record(BoardSnapshot::capture(&board, 0, 0.0));
        Self {
            board,
            timeline: Timeline::new(),
            checkpoints,
            tick_count: 0,
            config,
        }
    }

    /// Execute one simulation tick.
    pub fn execute_tick(&mut self) {
        self.tick_count += 1;
        let now = self.sim_time();

        self.board.tick(self.config.tick_dt);
        for event in self.timeline.drain_due(now) {
            self.board.apply_event(&event);
        }

        if self.tick_count % self.config.checkpoint_interval_ticks == 0 {
            self.checkpoints
                .record(BoardSnapshot::capture(&self.board, self.tick_count, now));
        }
    }

    /// Advance until the executed tick count matches the wall clock:
    /// `floor(elapsed / tick_dt)` total ticks. Returns how many ticks ran
    /// this call (several, after a missed frame; zero, mid-tick).
    pub fn advance_to(&mut self, elapsed: f64) -> u64 {
        let expected = if elapsed <= 0.0 {
            0
        } else {
            (elapsed / self.config.tick_dt).floor() as u64
        };
        let mut executed = 0;
        while self.tick_count < expected {
            self.execute_tick();
            executed += 1;
        }
        executed
    }

    /// Schedule an event. An on-time event simply joins the timeline; a
    /// late one (apparition already passed) triggers rollback
    /// re-simulation before this call returns.
    ///
    /// # Errors
    ///
    /// [`SimError::EventBeyondHorizon`] when the event predates the
    /// oldest retained checkpoint. The board state is untouched and the
    /// event never takes effect; callers log and carry on.
    pub fn submit(&mut self, event: GameEvent) -> Result<Admission, SimError> {
        let apparition = event.apparition_time();
        match self.timeline.add(event) {
            Admission::Scheduled => Ok(Admission::Scheduled),
            Admission::Late => {
                self.roll_back_and_replay(apparition)?;
                Ok(Admission::Late)
            }
        }
    }

    fn roll_back_and_replay(&mut self, apparition: f64) -> Result<(), SimError> {
        let target = self.tick_count;

        let (board, tick_count, sim_time) = {
            let snapshot = self.checkpoints.latest_before(apparition).ok_or(
                SimError::EventBeyondHorizon {
                    apparition,
                    oldest: self.checkpoints.oldest_time().unwrap_or(0.0),
                },
            )?;
            snapshot.verify()?;
            (snapshot.board.clone(), snapshot.tick_count, snapshot.sim_time)
        };

        debug!(
            apparition,
            restored_tick = tick_count,
            replay_to = target,
            "late event: rolling back and re-simulating"
        );

        self.board = board;
        self.tick_count = tick_count;
        self.checkpoints.discard_after(tick_count);
        self.timeline.rewind(sim_time);

        while self.tick_count < target {
            self.execute_tick();
        }
        Ok(())
    }

    // -- accessors ----------------------------------------------------------

    /// Read-only board access for the presenter and the win-state check.
    pub fn board(&self) -> &Board {
        &self.board
    }

    /// The number of ticks executed so far.
    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    /// Current simulation time, computed from the tick counter.
    pub fn sim_time(&self) -> f64 {
        self.tick_count as f64 * self.config.tick_dt
    }

    /// The event timeline (inspection only).
    pub fn timeline(&self) -> &Timeline {
        &self.timeline
    }

    /// BLAKE3 digest of the current board state, for determinism checks.
    pub fn state_hash(&self) -> String {
        crate::snapshot::state_hash(&self.board, self.tick_count)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
