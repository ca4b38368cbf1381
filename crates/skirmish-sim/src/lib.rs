//! Skirmish Sim -- deterministic lockstep simulation core for the arena game.
//!
//! Two peers each run a full copy of this simulation and exchange only
//! user-origin events (card placements). Given the same event sequence and
//! the same tick count, both copies converge to bit-identical board state.
//! Determinism rests on three rules, enforced throughout the crate:
//!
//! - Fixed tick duration; simulation time is computed as
//!   `tick_count * tick_dt`, never accumulated.
//! - Entities advance in a two-phase tick (read-only `update`, then
//!   mutating `execute`) in ascending-id order, so iteration order never
//!   leaks into outcomes.
//! - Every tie (targeting, event ordering) is broken explicitly by
//!   ascending entity id or by `(apparition time, owner, insertion order)`.
//!
//! # Quick Start
//!
//! ```
//! use skirmish_sim::prelude::*;
//!
//! let mut sim = Simulation::new(SimConfig::default());
//!
//! // Player 1 schedules a Knight at (3, 8), effective 0.2 s later.
//! let event = GameEvent::spawn_unit(UnitKind::Knight, Cell::new(3, 8), PlayerId::One, 0.0);
//! sim.submit(event).unwrap();
//!
//! // Advance past the apparition time: 6 ticks of 1/25 s.
//! for _ in 0..6 {
//!     sim.execute_tick();
//! }
//!
//! assert_eq!(sim.board().troop_count(), 1);
//! ```

#![deny(unsafe_code)]

pub mod board;
pub mod elixir;
pub mod entity;
pub mod event;
pub mod grid;
pub mod player;
pub mod projectile;
pub mod sim;
pub mod snapshot;
pub mod timeline;
pub mod tower;
pub mod troop;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors produced by simulation operations.
#[derive(Debug, thiserror::Error)]
pub enum SimError {
    /// A late event fell behind the oldest retained checkpoint, so the
    /// board cannot be rewound far enough to replay it.
    #[error(
        "event with apparition time {apparition:.3} is older than the oldest \
         checkpoint at {oldest:.3}; cannot roll back"
    )]
    EventBeyondHorizon {
        /// The apparition time of the late event.
        apparition: f64,
        /// The simulation time of the oldest retained checkpoint.
        oldest: f64,
    },

    /// A checkpoint failed its integrity check on restore.
    #[error("checkpoint hash mismatch: recorded {recorded} but recomputed {recomputed}")]
    CheckpointHashMismatch {
        /// The hash stored with the checkpoint.
        recorded: String,
        /// The hash recomputed from the checkpoint's data.
        recomputed: String,
    },
}

// ---------------------------------------------------------------------------
// Prelude
// ---------------------------------------------------------------------------

/// Convenience re-exports for common usage.
pub mod prelude {
    pub use crate::board::{Board, WinState};
    pub use crate::elixir::{Card, Deck, ElixirMeter, Menu};
    pub use crate::entity::{Entity, EntityId, EntityKind, Posture, UnitKind};
    pub use crate::event::{EventKind, GameEvent, EVENT_DELAY};
    pub use crate::grid::{Cell, Vec2, GRID_COLS, GRID_ROWS};
    pub use crate::player::PlayerId;
    pub use crate::sim::{SimConfig, Simulation, TICK_DT};
    pub use crate::snapshot::BoardSnapshot;
    pub use crate::timeline::{Admission, Timeline};
    pub use crate::SimError;
}
