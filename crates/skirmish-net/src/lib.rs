//! Skirmish Net -- UDP peer plumbing for the two-player lockstep game.
//!
//! Three concerns, one crate:
//!
//! - **Discovery**: the host advertises itself with a 1 Hz broadcast;
//!   the client collects announcements for a window and picks one.
//! - **Handshake**: one request/reply round-trip on the control port
//!   that connects the pair and negotiates the client's clock offset
//!   ([`clock::offset_from_handshake`]).
//! - **Game channel**: a pair of datagram sockets (host receives on
//!   base+10, client on base+11) carrying JSON-encoded spawn events. A
//!   background receiver thread parses datagrams and feeds an mpsc inbox
//!   that the game loop drains once per frame; malformed datagrams are
//!   logged and dropped, never fatal.
//!
//! The wire formats live in [`wire`] and match the JSON layouts exactly;
//! the authoritative payload types come from `skirmish-sim`.

#![deny(unsafe_code)]

use std::time::Duration;

pub mod clock;
pub mod discovery;
pub mod peer;
pub mod wire;

/// Default base port; the four channels derive from it.
pub const BASE_PORT: u16 = 10224;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors produced by transport operations.
#[derive(Debug, thiserror::Error)]
pub enum NetError {
    /// Socket-level failure.
    #[error("socket error: {0}")]
    Io(#[from] std::io::Error),

    /// A message could not be encoded, or a handshake reply could not be
    /// decoded. (Malformed *game* datagrams are dropped with a warning
    /// instead -- they never surface as errors.)
    #[error("datagram codec failure: {0}")]
    Codec(#[from] serde_json::Error),

    /// The discovery window closed without a single host announcement.
    #[error("no host announced itself within the discovery window")]
    NoHostFound,

    /// The handshake (or host-side accept) deadline passed.
    #[error("connection timed out")]
    ConnectionTimeout,

    /// The host answered the handshake with something other than
    /// `"connected"`.
    #[error("host rejected the handshake with status {status:?}")]
    HandshakeRejected { status: String },
}

// ---------------------------------------------------------------------------
// NetConfig
// ---------------------------------------------------------------------------

/// Transport configuration.
#[derive(Debug, Clone)]
pub struct NetConfig {
    /// Base port P; control is P, loopback control P+1, game data P+10
    /// (host) and P+11 (client).
    pub base_port: u16,
    /// Both peers on one machine: discovery moves to the loopback
    /// address and the P+1 control variant.
    pub local_test: bool,
    /// How long the client collects host announcements.
    pub discovery_timeout: Duration,
    /// Deadline for one handshake round-trip (and the host's wait for a
    /// client, per attempt).
    pub handshake_timeout: Duration,
    /// Cadence of host announcements.
    pub broadcast_interval: Duration,
}

impl Default for NetConfig {
    fn default() -> Self {
        Self {
            base_port: BASE_PORT,
            local_test: false,
            discovery_timeout: Duration::from_secs(5),
            handshake_timeout: Duration::from_secs(5),
            broadcast_interval: Duration::from_secs(1),
        }
    }
}

impl NetConfig {
    /// The control channel the host listens on.
    pub fn control_port(&self) -> u16 {
        self.base_port
    }

    /// Where discovery announcements land: the control port, or its
    /// loopback variant when both peers share a machine.
    pub fn discovery_port(&self) -> u16 {
        if self.local_test {
            self.base_port + 1
        } else {
            self.base_port
        }
    }

    /// Game-data port the host receives on.
    pub fn host_data_port(&self) -> u16 {
        self.base_port + 10
    }

    /// Game-data port the client receives on.
    pub fn client_data_port(&self) -> u16 {
        self.base_port + 11
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ports_derive_from_the_base() {
        let config = NetConfig::default();
        assert_eq!(config.control_port(), 10224);
        assert_eq!(config.discovery_port(), 10224);
        assert_eq!(config.host_data_port(), 10234);
        assert_eq!(config.client_data_port(), 10235);
    }

    #[test]
    fn local_test_moves_discovery_to_the_loopback_variant() {
        let config = NetConfig {
            local_test: true,
            ..Default::default()
        };
        assert_eq!(config.discovery_port(), 10225);
        assert_eq!(config.control_port(), 10224);
    }
}
