//! Skirmish Game -- top-level wiring for the two-player lockstep arena.
//!
//! This crate connects the deterministic simulation (`skirmish-sim`) to
//! the UDP peer plumbing (`skirmish-net`) and drives tick cadence from
//! synced wall-clock time. The [`Game`] type is the embedding surface: a
//! presenter reads [`Game::board`] for drawing, an input layer calls
//! [`Game::select_card`] / [`Game::place_card`] with grid cells, and the
//! frame loop calls [`Game::pump`] (or hands control to [`Game::run`]).

#![deny(unsafe_code)]

pub mod game;

pub use game::{Game, PlacementOutcome};
