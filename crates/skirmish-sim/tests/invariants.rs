//! Property tests for the simulation's universal invariants.
//!
//! Random event sequences are fed to full simulations and the invariants
//! that lockstep play depends on are checked after every tick: life
//! bounds, delay-window immobility, projectile lifetimes, determinism,
//! win-state consistency, elixir accounting, and timeline conservation.

use proptest::prelude::*;

use skirmish_sim::elixir::{ElixirMeter, INITIAL_ELIXIR, MAX_ELIXIR, SECONDS_PER_ELIXIR};
use skirmish_sim::prelude::*;
use skirmish_sim::projectile::PROJECTILE_MAX_DURATION;

fn arb_unit() -> impl Strategy<Value = UnitKind> {
    prop_oneof![
        Just(UnitKind::Knight),
        Just(UnitKind::Musketeer),
        Just(UnitKind::Wizard),
    ]
}

fn arb_owner() -> impl Strategy<Value = PlayerId> {
    prop_oneof![Just(PlayerId::One), Just(PlayerId::Two)]
}

/// Spawn events with origins on the first six seconds of the game and
/// cells anywhere on the grid (the board itself filters the bad ones).
fn arb_event() -> impl Strategy<Value = GameEvent> {
    (0..150u32, arb_owner(), 0..GRID_COLS, 0..GRID_ROWS, arb_unit()).prop_map(
        |(slot, owner, col, row, unit)| {
            GameEvent::spawn_unit(unit, Cell::new(col, row), owner, slot as f64 * 0.04)
        },
    )
}

fn run_with(events: &[GameEvent], ticks: u64) -> Simulation {
    let mut sim = Simulation::new(SimConfig::default());
    for event in events {
        sim.submit(event.clone()).expect("up-front events are never late");
    }
    for _ in 0..ticks {
        sim.execute_tick();
    }
    sim
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    // -- life bounds ---------------------------------------------------------

    #[test]
    fn live_entities_keep_life_in_bounds(
        events in prop::collection::vec(arb_event(), 0..12)
    ) {
        let mut sim = Simulation::new(SimConfig::default());
        for event in &events {
            sim.submit(event.clone()).unwrap();
        }
        for _ in 0..200 {
            sim.execute_tick();
            for entity in sim.board().entities() {
                if let (Some(life), Some(max)) = (entity.life(), entity.max_life()) {
                    prop_assert!(life > 0, "dead entities must be reaped");
                    prop_assert!(life <= max, "life never exceeds max_life");
                }
            }
        }
    }

    // -- delay-window immobility ----------------------------------------------

    #[test]
    fn delayed_troops_do_not_move(
        events in prop::collection::vec(arb_event(), 0..10)
    ) {
        let mut sim = Simulation::new(SimConfig::default());
        for event in &events {
            sim.submit(event.clone()).unwrap();
        }
        for _ in 0..120 {
            let before: std::collections::HashMap<EntityId, Vec2> = sim
                .board()
                .entities()
                .iter()
                .map(|e| (e.id(), e.pos()))
                .collect();
            sim.execute_tick();
            for entity in sim.board().entities() {
                if let EntityKind::Troop(troop) = entity.kind() {
                    if troop.delay > 0.0 {
                        if let Some(&old) = before.get(&entity.id()) {
                            prop_assert_eq!(entity.pos(), old);
                        }
                    }
                }
            }
        }
    }

    // -- projectile lifetime -----------------------------------------------------

    #[test]
    fn projectiles_never_outlive_max_duration(
        events in prop::collection::vec(arb_event(), 0..12)
    ) {
        let mut sim = Simulation::new(SimConfig::default());
        for event in &events {
            sim.submit(event.clone()).unwrap();
        }
        for _ in 0..250 {
            sim.execute_tick();
            for entity in sim.board().entities() {
                let elapsed = match entity.kind() {
                    EntityKind::Projectile(p) => Some(p.elapsed),
                    EntityKind::AreaProjectile(p) => Some(p.elapsed),
                    _ => None,
                };
                if let Some(elapsed) = elapsed {
                    prop_assert!(elapsed <= PROJECTILE_MAX_DURATION + 1e-9);
                }
            }
        }
    }

    // -- determinism --------------------------------------------------------------

    #[test]
    fn identical_inputs_give_identical_state(
        events in prop::collection::vec(arb_event(), 0..10)
    ) {
        let a = run_with(&events, 200);
        let b = run_with(&events, 200);
        prop_assert_eq!(a.state_hash(), b.state_hash());
        prop_assert_eq!(a.board().entities().len(), b.board().entities().len());
    }

    // -- win-state consistency ------------------------------------------------------

    #[test]
    fn win_states_mirror_each_other(
        events in prop::collection::vec(arb_event(), 0..12)
    ) {
        let sim = run_with(&events, 200);
        let a = sim.board().win_state(PlayerId::One);
        let b = sim.board().win_state(PlayerId::Two);
        prop_assert_eq!(
            a == WinState::Continuing,
            b == WinState::Continuing,
            "the game is live for both players or for neither"
        );
        let one_holds = sim
            .board()
            .towers()
            .iter()
            .any(|t| t.owner == PlayerId::One && t.alive);
        let two_holds = sim
            .board()
            .towers()
            .iter()
            .any(|t| t.owner == PlayerId::Two && t.alive);
        if one_holds && !two_holds {
            prop_assert_eq!(a, WinState::Won);
            prop_assert_eq!(b, WinState::Lost);
        }
        if two_holds && !one_holds {
            prop_assert_eq!(a, WinState::Lost);
            prop_assert_eq!(b, WinState::Won);
        }
    }

    // -- elixir accounting ------------------------------------------------------------

    #[test]
    fn elixir_matches_the_closed_form(
        spends in prop::collection::vec((3u32..=5, 1u32..200), 0..20)
    ) {
        let mut meter = ElixirMeter::new();
        let mut t = 0.0;
        let mut prev_wasted = 0.0;
        for (cost, dt_slots) in spends {
            t += dt_slots as f64 * 0.05;
            meter.try_spend(cost, t);

            let current = meter.current(t);
            let expected = (INITIAL_ELIXIR + t / SECONDS_PER_ELIXIR
                - meter.used()
                - meter.wasted())
            .clamp(0.0, MAX_ELIXIR);
            prop_assert!((current - expected).abs() < 1e-9);
            prop_assert!(meter.wasted() >= prev_wasted - 1e-12);
            prev_wasted = meter.wasted();
        }
    }

    // -- timeline conservation -----------------------------------------------------------

    #[test]
    fn timeline_drains_everything_exactly_once(
        stamps in prop::collection::vec(0..250u32, 0..40)
    ) {
        let mut timeline = Timeline::new();
        for &slot in &stamps {
            timeline.add(GameEvent::spawn_unit(
                UnitKind::Knight,
                Cell::new(3, 8),
                PlayerId::One,
                slot as f64 * 0.04,
            ));
        }

        let horizon = 11.0;
        let expected = stamps
            .iter()
            .filter(|&&slot| slot as f64 * 0.04 + EVENT_DELAY <= horizon)
            .count();

        let mut drained = 0;
        let mut last_apparition = f64::NEG_INFINITY;
        let dt = 1.0 / 25.0;
        let mut now = 0.0;
        while now < horizon {
            now = (now + dt).min(horizon);
            for event in timeline.drain_due(now) {
                prop_assert!(
                    event.apparition_time() >= last_apparition,
                    "drain order is nondecreasing in apparition time"
                );
                last_apparition = event.apparition_time();
                drained += 1;
            }
        }
        prop_assert_eq!(drained, expected);
    }
}
