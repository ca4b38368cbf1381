//! Player identity.
//!
//! The arena hosts exactly two players. Player [`One`](PlayerId::One) owns
//! the north half of the grid (rows 0-15) and acts as the network host;
//! player [`Two`](PlayerId::Two) owns the south half (rows 16-31). The
//! serialized form is the bare string `"1"` / `"2"`, matching the wire
//! format.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// PlayerId
// ---------------------------------------------------------------------------

/// One of the two peers. Ordered so that ties broken "by owner ascending"
/// resolve player 1 before player 2.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum PlayerId {
    /// The host peer; owns rows 0-15.
    #[serde(rename = "1")]
    One,
    /// The client peer; owns rows 16-31.
    #[serde(rename = "2")]
    Two,
}

impl PlayerId {
    /// The other player.
    pub fn opponent(self) -> PlayerId {
        match self {
            PlayerId::One => PlayerId::Two,
            PlayerId::Two => PlayerId::One,
        }
    }

    /// Whether this player's half of the arena contains `row`.
    ///
    /// Player 1 owns rows 0-15, player 2 owns rows 16-31. Rows outside the
    /// grid belong to nobody.
    pub fn owns_row(self, row: i32) -> bool {
        match self {
            PlayerId::One => (0..16).contains(&row),
            PlayerId::Two => (16..32).contains(&row),
        }
    }
}

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlayerId::One => write!(f, "1"),
            PlayerId::Two => write!(f, "2"),
        }
    }
}

impl FromStr for PlayerId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "1" => Ok(PlayerId::One),
            "2" => Ok(PlayerId::Two),
            other => Err(format!("player id must be \"1\" or \"2\", got {other:?}")),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
