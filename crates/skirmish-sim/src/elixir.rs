//! The elixir arbiter, deck, and card menu.
//!
//! Elixir is a pure function of synced wall-clock time: at `elapsed`
//! seconds into the game, `current = clamp(initial + elapsed/1.5 - used -
//! wasted, 0, max)`. There is no per-frame accumulator to drift -- both
//! peers evaluating the same instant get the same meter. `wasted` grows
//! (never shrinks) whenever the meter would overflow its cap, so elixir
//! generated while full is lost rather than banked.
//!
//! The deck is presentation-side state: eight cards drawn with a PCG
//! seeded from the handshake so both peers render the same deck, four
//! visible at a time. The authoritative object that crosses the wire is
//! the spawn event, never the card.

use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use crate::entity::UnitKind;

/// Elixir on hand at game start.
pub const INITIAL_ELIXIR: f64 = 7.0;
/// Meter cap.
pub const MAX_ELIXIR: f64 = 10.0;
/// Seconds to generate one point of elixir.
pub const SECONDS_PER_ELIXIR: f64 = 1.5;
/// Cards in a deck.
pub const DECK_SIZE: usize = 8;
/// Cards visible at a time.
pub const HAND_SIZE: usize = 4;

// ---------------------------------------------------------------------------
// ElixirMeter
// ---------------------------------------------------------------------------

/// Tracks spending and overflow waste; the current level is re-derived
/// from elapsed time on every query.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ElixirMeter {
    used: f64,
    wasted: f64,
}

impl ElixirMeter {
    pub fn new() -> Self {
        Self::default()
    }

    /// The elixir available at `elapsed` seconds into the game. Updates
    /// the waste ledger when the meter is pinned at the cap.
    pub fn current(&mut self, elapsed: f64) -> f64 {
        let generated = elapsed.max(0.0) / SECONDS_PER_ELIXIR;
        let mut current = INITIAL_ELIXIR + generated - self.used - self.wasted;
        if current > MAX_ELIXIR {
            self.wasted = (INITIAL_ELIXIR + generated) - MAX_ELIXIR - self.used;
            current = MAX_ELIXIR;
        }
        self.wasted = self.wasted.max(0.0);
        current.clamp(0.0, MAX_ELIXIR)
    }

    /// Whether `cost` is affordable at `elapsed`.
    pub fn can_afford(&mut self, cost: u32, elapsed: f64) -> bool {
        self.current(elapsed) >= cost as f64
    }

    /// Atomically charge `cost` if affordable. Returns whether the charge
    /// went through; a refusal changes nothing.
    pub fn try_spend(&mut self, cost: u32, elapsed: f64) -> bool {
        if self.can_afford(cost, elapsed) {
            self.used += cost as f64;
            true
        } else {
            false
        }
    }

    /// Total elixir spent on cards.
    pub fn used(&self) -> f64 {
        self.used
    }

    /// Total elixir lost to the cap. Nondecreasing.
    pub fn wasted(&self) -> f64 {
        self.wasted
    }
}

// ---------------------------------------------------------------------------
// Card / Deck
// ---------------------------------------------------------------------------

/// A deployable card.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Card {
    pub unit: UnitKind,
}

impl Card {
    /// Elixir cost: Knight 3, Musketeer 4, Wizard 5.
    pub fn cost(&self) -> u32 {
        self.unit.cost()
    }
}

/// Eight cards drawn from the allowed set with a seeded PCG, so the two
/// peers derive the same deck from the handshake.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Deck {
    cards: Vec<Card>,
}

impl Deck {
    const ALLOWED: [UnitKind; 3] = [UnitKind::Wizard, UnitKind::Knight, UnitKind::Musketeer];

    /// Generate the deck for `seed`.
    pub fn generate(seed: u64) -> Self {
        let mut rng = Pcg32::seed_from_u64(seed);
        let cards = (0..DECK_SIZE)
            .map(|_| Card {
                unit: *Self::ALLOWED
                    .choose(&mut rng)
                    .expect("allowed card set is non-empty"),
            })
            .collect();
        Self { cards }
    }

    pub fn card(&self, index: usize) -> Card {
        self.cards[index]
    }

    pub fn len(&self) -> usize {
        self.cards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Menu
// ---------------------------------------------------------------------------

/// The local placement arbiter: the deck, a selection, and the elixir
/// meter. The visible hand is the deck's first four cards and the window
/// never moves; a played slot offers the same card again. Everything
/// here is local-only; a rejection never reaches the wire.
#[derive(Debug, Clone)]
pub struct Menu {
    meter: ElixirMeter,
    deck: Deck,
    selected: Option<usize>,
}

impl Menu {
    /// A fresh menu over the deck derived from `seed`.
    pub fn new(seed: u64) -> Self {
        Self {
            meter: ElixirMeter::new(),
            deck: Deck::generate(seed),
            selected: None,
        }
    }

    /// Select a hand slot. Out-of-range slots clear the selection.
    pub fn select(&mut self, slot: usize) {
        self.selected = (slot < HAND_SIZE).then_some(slot);
    }

    /// The currently selected card, if any.
    pub fn selected_card(&self) -> Option<Card> {
        self.selected.map(|slot| self.deck.card(slot))
    }

    /// Drop the selection (placement rejected, or deliberately cancelled).
    pub fn clear_selection(&mut self) {
        self.selected = None;
    }

    /// Elixir available at `elapsed` seconds into the game.
    pub fn elixir(&mut self, elapsed: f64) -> f64 {
        self.meter.current(elapsed)
    }

    /// The visible hand: the deck's first four cards, for the presenter.
    pub fn hand(&self) -> [Card; HAND_SIZE] {
        std::array::from_fn(|i| self.deck.card(i))
    }

    /// Commit the selected card: charge its cost. Returns the unit to
    /// deploy, or `None` (with the selection cleared and nothing
    /// charged) when no card is selected or elixir falls short.
    pub fn play_selected(&mut self, elapsed: f64) -> Option<UnitKind> {
        let slot = self.selected.take()?;
        let card = self.deck.card(slot);
        if !self.meter.try_spend(card.cost(), elapsed) {
            return None;
        }
        Some(card.unit)
    }

    /// The underlying meter, for HUD display.
    pub fn meter(&self) -> &ElixirMeter {
        &self.meter
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
