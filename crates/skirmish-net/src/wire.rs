//! JSON wire formats.
//!
//! Field names and shapes are the protocol; every struct here serializes
//! to exactly the layout the peers exchange:
//!
//! ```json
//! { "host_ip": "192.168.0.12" }                      // discovery, 1 Hz
//! { "request": "connect" }                           // handshake request
//! { "status": "connected", "host_time": 1700000000.5 }
//! { "timestamp": 1700000012.3,                       // game datagram
//!   "data": { "event_type": "spawn_unit",
//!             "timestamp": 1700000012.1,
//!             "delay": 0.2,
//!             "data": { "entity_type": "Caballero",
//!                       "grid_position": [3, 8],
//!                       "player_id": "1" } } }
//! ```
//!
//! Wire timestamps are absolute synced seconds; the simulation works in
//! seconds since game start. [`EventMsg::from_event`] and
//! [`EventMsg::to_event`] convert at the boundary using the shared
//! `game_start` instant (the handshake's `host_time`).

use serde::{Deserialize, Serialize};

use skirmish_sim::entity::UnitKind;
use skirmish_sim::event::{EventKind, GameEvent};
use skirmish_sim::grid::Cell;
use skirmish_sim::player::PlayerId;

/// The only event type currently on the wire.
pub const EVENT_TYPE_SPAWN_UNIT: &str = "spawn_unit";

/// Handshake request verb.
pub const REQUEST_CONNECT: &str = "connect";

/// Handshake success status.
pub const STATUS_CONNECTED: &str = "connected";

// ---------------------------------------------------------------------------
// Discovery & handshake
// ---------------------------------------------------------------------------

/// Host announcement, broadcast at 1 Hz.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiscoveryMsg {
    pub host_ip: String,
}

/// Client-to-host connect request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectRequest {
    pub request: String,
}

impl ConnectRequest {
    pub fn new() -> Self {
        Self {
            request: REQUEST_CONNECT.to_owned(),
        }
    }

    pub fn is_connect(&self) -> bool {
        self.request == REQUEST_CONNECT
    }
}

impl Default for ConnectRequest {
    fn default() -> Self {
        Self::new()
    }
}

/// Host-to-client handshake reply. `host_time` doubles as the shared
/// game-start instant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectReply {
    pub status: String,
    pub host_time: f64,
}

// ---------------------------------------------------------------------------
// Game datagrams
// ---------------------------------------------------------------------------

/// Envelope for one game event, stamped with the synced send time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameDatagram {
    pub timestamp: f64,
    pub data: EventMsg,
}

/// One user-origin event as it crosses the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventMsg {
    pub event_type: String,
    /// Origin instant in absolute synced seconds.
    pub timestamp: f64,
    pub delay: f64,
    pub data: SpawnMsg,
}

/// Payload of a `spawn_unit` event. `entity_type` serializes to the card
/// names (`"Caballero"`, `"Mago"`, `"Mosquetera"`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpawnMsg {
    pub entity_type: UnitKind,
    pub grid_position: [i32; 2],
    pub player_id: PlayerId,
}

impl EventMsg {
    /// Encode a simulation event for the wire, shifting its game-relative
    /// origin to absolute synced time.
    pub fn from_event(event: &GameEvent, game_start: f64) -> Self {
        let EventKind::SpawnUnit { unit, cell } = event.kind;
        Self {
            event_type: EVENT_TYPE_SPAWN_UNIT.to_owned(),
            timestamp: game_start + event.timestamp,
            delay: event.delay,
            data: SpawnMsg {
                entity_type: unit,
                grid_position: [cell.col, cell.row],
                player_id: event.owner,
            },
        }
    }

    /// Decode into a simulation event with a game-relative origin.
    /// Returns `None` for unknown event types; the receiver treats those
    /// as no-ops.
    pub fn to_event(&self, game_start: f64) -> Option<GameEvent> {
        if self.event_type != EVENT_TYPE_SPAWN_UNIT {
            return None;
        }
        let [col, row] = self.grid_position();
        Some(GameEvent {
            kind: EventKind::SpawnUnit {
                unit: self.data.entity_type,
                cell: Cell::new(col, row),
            },
            timestamp: self.timestamp - game_start,
            delay: self.delay,
            owner: self.data.player_id,
        })
    }

    fn grid_position(&self) -> [i32; 2] {
        self.data.grid_position
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
