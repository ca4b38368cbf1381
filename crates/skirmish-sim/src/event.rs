//! User-origin events: the only thing the peers exchange.
//!
//! An event records what a player did (today: deploy a unit on a cell),
//! the simulation time at which they did it, and a fixed scheduling
//! `delay`. The event becomes effective at its *apparition time*,
//! `timestamp + delay`. The delay is the lockstep safety margin: as long
//! as the datagram crosses the wire faster than the delay, both peers see
//! the apparition in their future and apply it on the same tick without
//! any rollback.

use serde::{Deserialize, Serialize};

use crate::entity::UnitKind;
use crate::grid::Cell;
use crate::player::PlayerId;

/// Scheduling delay for user-origin events, in seconds.
pub const EVENT_DELAY: f64 = 0.2;

// ---------------------------------------------------------------------------
// EventKind
// ---------------------------------------------------------------------------

/// What the event does when drained into the board.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventKind {
    /// Deploy `unit` centered on `cell`.
    SpawnUnit { unit: UnitKind, cell: Cell },
}

// ---------------------------------------------------------------------------
// GameEvent
// ---------------------------------------------------------------------------

/// An immutable scheduled action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameEvent {
    pub kind: EventKind,
    /// Simulation time at which the event originated.
    pub timestamp: f64,
    /// Seconds between origin and effect.
    pub delay: f64,
    pub owner: PlayerId,
}

impl GameEvent {
    /// A spawn event with the standard lockstep delay.
    pub fn spawn_unit(unit: UnitKind, cell: Cell, owner: PlayerId, timestamp: f64) -> Self {
        Self {
            kind: EventKind::SpawnUnit { unit, cell },
            timestamp,
            delay: EVENT_DELAY,
            owner,
        }
    }

    /// The simulated instant at which the event takes effect.
    pub fn apparition_time(&self) -> f64 {
        self.timestamp + self.delay
    }

    /// Identity for duplicate suppression at the peer layer. Two events
    /// are the same iff origin time, owner, and payload all match.
    pub fn identity(&self) -> EventIdentity {
        EventIdentity {
            timestamp_bits: self.timestamp.to_bits(),
            owner: self.owner,
            kind: self.kind,
        }
    }
}

/// Hashable identity of an event; see [`GameEvent::identity`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EventIdentity {
    timestamp_bits: u64,
    owner: PlayerId,
    kind: EventKind,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
