//! The game driver: connection, placement arbitration, and the frame
//! pump.
//!
//! Player `1` hosts (announce + accept); player `2` discovers and
//! connects. Both sides take the handshake's `host_time` as the shared
//! game-start instant, so event timestamps, elixir, and the tick count
//! all key off the same synced zero.
//!
//! Each frame, [`Game::pump`]:
//!
//! 1. drains the network inbox, converting wire events to simulation
//!    events (duplicates suppressed by event identity, late arrivals
//!    recovered by rollback re-simulation);
//! 2. advances the simulation to `floor((synced_now - game_start) /
//!    tick_dt)` ticks, catching up over missed frames;
//! 3. reports the board's win state for this player.
//!
//! Placement is arbitrated entirely locally: an inadmissible cell or an
//! unaffordable card clears the selection and emits nothing -- rejections
//! never reach the wire.

use std::collections::HashSet;
use std::thread;
use std::time::Duration;

use anyhow::Context;
use tracing::{debug, info, warn};

use skirmish_net::peer::Peer;
use skirmish_net::wire::EventMsg;
use skirmish_net::NetConfig;
use skirmish_sim::board::{Board, WinState};
use skirmish_sim::elixir::{Card, Menu, HAND_SIZE};
use skirmish_sim::entity::UnitKind;
use skirmish_sim::event::{EventIdentity, GameEvent};
use skirmish_sim::grid::Cell;
use skirmish_sim::player::PlayerId;
use skirmish_sim::sim::{SimConfig, Simulation};
use skirmish_sim::timeline::Admission;

/// Connection attempts before giving up (exit code 1).
const CONNECT_ATTEMPTS: u32 = 5;
/// Pause between connection attempts.
const RETRY_DELAY: Duration = Duration::from_secs(2);
/// Frame cadence of [`Game::run`]; the simulation itself ticks at 25 Hz
/// of synced time regardless.
const FRAME_INTERVAL: Duration = Duration::from_millis(16);

// ---------------------------------------------------------------------------
// PlacementOutcome
// ---------------------------------------------------------------------------

/// What happened to a local placement intent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlacementOutcome {
    /// The card was charged and the spawn event scheduled on both peers.
    Deployed(UnitKind),
    /// The cell is out of bounds, an obstacle, occupied, or outside this
    /// player's half. Selection cleared, nothing charged or sent.
    RejectedCell,
    /// No card selected, or not enough elixir. Selection cleared,
    /// nothing charged or sent.
    RejectedCard,
}

// ---------------------------------------------------------------------------
// Game
// ---------------------------------------------------------------------------

/// A connected, running game: one peer, one simulation, one menu.
pub struct Game {
    player: PlayerId,
    peer: Peer,
    sim: Simulation,
    menu: Menu,
    game_start: f64,
    /// Identities of every event already scheduled, for duplicate
    /// suppression of re-sent datagrams.
    seen: HashSet<EventIdentity>,
}

impl Game {
    /// Connect as `player`: host for `1`, discovering client for `2`.
    /// Five attempts at two-second intervals, then an error the binary
    /// maps to exit code 1.
    pub fn connect(player: PlayerId, config: NetConfig) -> anyhow::Result<Game> {
        let mut last_err = None;
        for attempt in 1..=CONNECT_ATTEMPTS {
            info!(attempt, player = %player, "connecting");
            let result = match player {
                PlayerId::One => Peer::host(&config),
                PlayerId::Two => Peer::client(&config),
            };
            match result {
                Ok(peer) => return Ok(Self::from_peer(player, peer)),
                Err(err) => {
                    warn!(%err, attempt, "connection attempt failed");
                    last_err = Some(err);
                    if attempt < CONNECT_ATTEMPTS {
                        thread::sleep(RETRY_DELAY);
                    }
                }
            }
        }
        let err = last_err.expect("at least one connection attempt ran");
        Err(err).context("failed to connect after five attempts")
    }

    fn from_peer(player: PlayerId, peer: Peer) -> Game {
        let game_start = peer.game_start();
        // Both peers hold the same host_time bits, hence the same deck.
        let menu = Menu::new(game_start.to_bits());
        info!(player = %player, game_start, "game starting");
        Game {
            player,
            peer,
            sim: Simulation::new(SimConfig::default()),
            menu,
            game_start,
            seen: HashSet::new(),
        }
    }

    /// Seconds of synced time since game start.
    fn elapsed(&self) -> f64 {
        self.peer.clock().now() - self.game_start
    }

    // -- input surface -------------------------------------------------------

    /// Select a card slot in the hand.
    pub fn select_card(&mut self, slot: usize) {
        self.menu.select(slot);
    }

    /// Try to deploy the selected card on `cell`. All gating is local;
    /// only an admitted placement produces a network event.
    ///
    /// # Errors
    ///
    /// Only on transport failure while sending the event -- peer loss is
    /// terminal for the process.
    pub fn place_card(&mut self, cell: Cell) -> anyhow::Result<PlacementOutcome> {
        if !self.sim.board().valid_placement(self.player, cell) {
            debug!(?cell, "placement rejected: cell not allowed");
            self.menu.clear_selection();
            return Ok(PlacementOutcome::RejectedCell);
        }

        let elapsed = self.elapsed();
        let Some(unit) = self.menu.play_selected(elapsed) else {
            debug!("placement rejected: no card selected or not enough elixir");
            return Ok(PlacementOutcome::RejectedCard);
        };

        let event = GameEvent::spawn_unit(unit, cell, self.player, elapsed);
        self.seen.insert(event.identity());
        self.peer
            .send_event(EventMsg::from_event(&event, self.game_start))
            .context("sending placement to peer")?;
        if let Err(err) = self.sim.submit(event) {
            warn!(%err, "local placement could not be scheduled");
        }
        debug!(?unit, ?cell, "card deployed");
        Ok(PlacementOutcome::Deployed(unit))
    }

    // -- frame pump ----------------------------------------------------------

    /// One frame of work: drain the inbox, catch the simulation up to
    /// synced time, and report the terminal state.
    pub fn pump(&mut self) -> WinState {
        while let Some(datagram) = self.peer.try_recv() {
            match datagram.data.to_event(self.game_start) {
                Some(event) => {
                    if !self.seen.insert(event.identity()) {
                        debug!("duplicate event suppressed");
                        continue;
                    }
                    match self.sim.submit(event) {
                        Ok(Admission::Scheduled) => {}
                        Ok(Admission::Late) => debug!("late event recovered by rollback"),
                        Err(err) => warn!(%err, "dropping unrecoverable event"),
                    }
                }
                None => {
                    warn!(event_type = %datagram.data.event_type, "ignoring unknown event type");
                }
            }
        }

        self.sim.advance_to(self.elapsed());
        self.sim.board().win_state(self.player)
    }

    /// Pump frames until the game reaches a terminal state.
    pub fn run(&mut self) -> WinState {
        loop {
            let state = self.pump();
            if state != WinState::Continuing {
                info!(?state, player = %self.player, "game over");
                return state;
            }
            thread::sleep(FRAME_INTERVAL);
        }
    }

    // -- presenter surface ----------------------------------------------------

    /// This player's identity.
    pub fn player(&self) -> PlayerId {
        self.player
    }

    /// Immutable view of the current tick's board.
    pub fn board(&self) -> &Board {
        self.sim.board()
    }

    /// The visible hand.
    pub fn hand(&self) -> [Card; HAND_SIZE] {
        self.menu.hand()
    }

    /// Elixir available right now.
    pub fn elixir(&mut self) -> f64 {
        let elapsed = self.elapsed();
        self.menu.elixir(elapsed)
    }

    /// Ticks executed so far.
    pub fn tick_count(&self) -> u64 {
        self.sim.tick_count()
    }

    /// BLAKE3 digest of the board, for convergence checks.
    pub fn state_hash(&self) -> String {
        self.sim.state_hash()
    }
}
