//! Board snapshots with BLAKE3 hashing, and the rollback checkpoint ring.
//!
//! A [`BoardSnapshot`] is a full copy of the board at a tick boundary plus
//! a BLAKE3 digest of its serialized form. The digest serves two masters:
//! integrity checking before a rollback restore, and determinism
//! verification in tests (two boards fed the same events must hash
//! identically at every tick).
//!
//! The [`CheckpointRing`] retains recent snapshots inside a sliding time
//! horizon. When an event arrives late, the simulation restores the
//! newest checkpoint from before the event's apparition time and
//! re-simulates forward.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::board::Board;
use crate::SimError;

// ---------------------------------------------------------------------------
// Hashing
// ---------------------------------------------------------------------------

/// BLAKE3 hex digest of the serialized board state and tick counter --
/// everything that affects simulation determinism.
pub fn state_hash(board: &Board, tick_count: u64) -> String {
    // A wrapper struct keeps the byte stream canonical.
    #[derive(Serialize)]
    struct HashableState<'a> {
        board: &'a Board,
        tick_count: u64,
    }

    let bytes = serde_json::to_vec(&HashableState { board, tick_count })
        .expect("board state is always JSON-serializable");
    blake3::hash(&bytes).to_hex().to_string()
}

// ---------------------------------------------------------------------------
// BoardSnapshot
// ---------------------------------------------------------------------------

/// A serializable copy of the board at a tick boundary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoardSnapshot {
    /// Ticks executed at the time of capture.
    pub tick_count: u64,
    /// Simulation time at the time of capture.
    pub sim_time: f64,
    /// The full board state.
    pub board: Board,
    /// BLAKE3 hex digest (64 lowercase hex chars) of the board and tick
    /// counter. The hash field itself is not part of the digest.
    pub hash: String,
}

impl BoardSnapshot {
    /// Capture the board as it stands.
    pub fn capture(board: &Board, tick_count: u64, sim_time: f64) -> Self {
        Self {
            tick_count,
            sim_time,
            board: board.clone(),
            hash: state_hash(board, tick_count),
        }
    }

    /// Recompute the digest and compare it to the recorded one.
    pub fn verify(&self) -> Result<(), SimError> {
        let recomputed = state_hash(&self.board, self.tick_count);
        if recomputed != self.hash {
            return Err(SimError::CheckpointHashMismatch {
                recorded: self.hash.clone(),
                recomputed,
            });
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// CheckpointRing
// ---------------------------------------------------------------------------

/// Recent checkpoints inside a sliding horizon, oldest first.
#[derive(Debug, Clone)]
pub struct CheckpointRing {
    horizon: f64,
    ring: VecDeque<BoardSnapshot>,
}

impl CheckpointRing {
    /// An empty ring retaining `horizon` seconds of history.
    pub fn new(horizon: f64) -> Self {
        Self {
            horizon,
            ring: VecDeque::new(),
        }
    }

    /// Append a checkpoint and evict those that have aged out of the
    /// horizon. At least one checkpoint is always retained.
    pub fn record(&mut self, snapshot: BoardSnapshot) {
        let newest = snapshot.sim_time;
        self.ring.push_back(snapshot);
        while self.ring.len() > 1 {
            let oldest = self.ring.front().expect("ring is non-empty");
            if newest - oldest.sim_time <= self.horizon {
                break;
            }
            self.ring.pop_front();
        }
    }

    /// The newest checkpoint taken strictly before `t`. Strict, because a
    /// checkpoint taken exactly at `t` already covers the tick that an
    /// event appearing at `t` belongs to.
    pub fn latest_before(&self, t: f64) -> Option<&BoardSnapshot> {
        self.ring.iter().rev().find(|s| s.sim_time < t)
    }

    /// Drop every checkpoint newer than `tick_count` (after a restore,
    /// history past the restore point is stale).
    pub fn discard_after(&mut self, tick_count: u64) {
        while self
            .ring
            .back()
            .map_or(false, |s| s.tick_count > tick_count)
        {
            self.ring.pop_back();
        }
    }

    /// Simulation time of the oldest retained checkpoint.
    pub fn oldest_time(&self) -> Option<f64> {
        self.ring.front().map(|s| s.sim_time)
    }

    pub fn len(&self) -> usize {
        self.ring.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ring.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::UnitKind;
    use crate::grid::Cell;
    use crate::player::PlayerId;

    // -- 1. Hashing -----------------------------------------------------------

    #[test]
    fn identical_boards_hash_identically() {
        let a = Board::new();
        let b = Board::new();
        assert_eq!(state_hash(&a, 0), state_hash(&b, 0));
        assert_eq!(state_hash(&a, 0).len(), 64);
    }

    #[test]
    fn divergent_boards_hash_differently() {
        let a = Board::new();
        let mut b = Board::new();
        b.spawn(UnitKind::Knight, Cell::new(3, 8), PlayerId::One);
        assert_ne!(state_hash(&a, 0), state_hash(&b, 0));
    }

    #[test]
    fn tick_count_feeds_the_hash() {
        let a = Board::new();
        assert_ne!(state_hash(&a, 0), state_hash(&a, 1));
    }

    // -- 2. Snapshot integrity ---------------------------------------------------

    #[test]
    fn capture_verifies_clean() {
        let board = Board::new();
        let snapshot = BoardSnapshot::capture(&board, 7, 0.28);
        assert!(snapshot.verify().is_ok());
    }

    #[test]
    fn tampering_fails_verification() {
        let board = Board::new();
        let mut snapshot = BoardSnapshot::capture(&board, 7, 0.28);
        snapshot.tick_count = 8;
        assert!(matches!(
            snapshot.verify(),
            Err(SimError::CheckpointHashMismatch { .. })
        ));
    }

    // -- 3. Ring retention --------------------------------------------------------

    fn snap(board: &Board, tick: u64, time: f64) -> BoardSnapshot {
        BoardSnapshot::capture(board, tick, time)
    }

    #[test]
    fn ring_evicts_beyond_horizon() {
        let board = Board::new();
        let mut ring = CheckpointRing::new(4.0);
        for i in 0..50 {
            ring.record(snap(&board, i * 5, i as f64 * 0.2));
        }
        // Newest at 9.8 s; everything older than 5.8 s is gone.
        assert!(ring.oldest_time().unwrap() >= 5.8 - 1e-9);
        assert!(ring.len() <= 21);
    }

    #[test]
    fn ring_always_keeps_one() {
        let board = Board::new();
        let mut ring = CheckpointRing::new(0.0);
        ring.record(snap(&board, 5, 0.2));
        ring.record(snap(&board, 10, 0.4));
        assert_eq!(ring.len(), 1);
        assert_eq!(ring.oldest_time(), Some(0.4));
    }

    #[test]
    fn latest_before_is_strict() {
        let board = Board::new();
        let mut ring = CheckpointRing::new(10.0);
        ring.record(snap(&board, 5, 0.2));
        ring.record(snap(&board, 10, 0.4));
        ring.record(snap(&board, 15, 0.6));

        assert_eq!(ring.latest_before(0.5).unwrap().tick_count, 10);
        // Exactly at a checkpoint time: that checkpoint already covers the
        // event's tick, so the previous one is returned.
        assert_eq!(ring.latest_before(0.4).unwrap().tick_count, 5);
        assert!(ring.latest_before(0.1).is_none());
    }

    #[test]
    fn discard_after_truncates_the_tail() {
        let board = Board::new();
        let mut ring = CheckpointRing::new(10.0);
        for i in 1..=5 {
            ring.record(snap(&board, i * 5, i as f64 * 0.2));
        }
        ring.discard_after(10);
        assert_eq!(ring.len(), 2);
        assert_eq!(ring.latest_before(99.0).unwrap().tick_count, 10);
    }
}
