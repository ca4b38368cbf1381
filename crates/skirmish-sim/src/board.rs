//! The authoritative simulated world.
//!
//! The board owns every entity exclusively and advances them with a
//! three-step tick:
//!
//! 1. **Phase A (update)** -- every entity, in ascending-id order, reads an
//!    immutable [`WorldView`] of the tick-start world and revises only its
//!    own state.
//! 2. **Phase B (execute)** -- every entity, in the same order, acts:
//!    movement, cooldowns, damage to others via
//!    [`receive_damage`](Entity::receive_damage), and projectile emission
//!    into a staging buffer.
//! 3. **Phase C (reap)** -- the persistent tower registry is synced,
//!    inactive entities are dropped, and staged spawns join the live set.
//!
//! Separating the read-only pass from the mutating pass keeps outcomes
//! independent of iteration order; the only cross-entity writes are
//! subtractive damage, which commutes within a tick.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::entity::{Entity, EntityId, Neighbors, Sighting, Staging, UnitKind, WorldView};
use crate::event::{EventKind, GameEvent};
use crate::grid::{build_obstacles, Cell, Vec2, CENTRAL_FOOTPRINTS, LATERAL_FOOTPRINTS};
use crate::player::PlayerId;
use crate::tower::{Tower, TowerKind};

// ---------------------------------------------------------------------------
// TowerRecord
// ---------------------------------------------------------------------------

/// One entry of the persistent tower registry. Records outlive the tower
/// entities they mirror, so win-state queries and the central tower's
/// dormancy gate stay O(1) even after a tower has been reaped.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TowerRecord {
    pub id: EntityId,
    pub owner: PlayerId,
    pub kind: TowerKind,
    pub alive: bool,
}

// ---------------------------------------------------------------------------
// WinState
// ---------------------------------------------------------------------------

/// Terminal-condition report for one player.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WinState {
    /// Both players still hold at least one tower.
    Continuing,
    /// The opponent has no live tower.
    Won,
    /// This player has no live tower.
    Lost,
}

// ---------------------------------------------------------------------------
// Board
// ---------------------------------------------------------------------------

/// The simulated arena: grid obstacles, the entity collection, and the
/// tower registry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Board {
    /// Live entities in ascending-id order.
    entities: Vec<Entity>,
    /// Persistent mirror of the six towers.
    towers: Vec<TowerRecord>,
    /// Static blocked cells: river minus bridges, plus tower footprints.
    obstacles: BTreeSet<Cell>,
    /// Next entity id to allocate. Ids are never reused.
    next_id: u64,
}

impl Board {
    /// Build the initial board: obstacles plus the six towers, created
    /// here (not via the timeline) as the fixed t=0 population.
    pub fn new() -> Self {
        let mut board = Self {
            entities: Vec::new(),
            towers: Vec::new(),
            obstacles: build_obstacles(),
            next_id: 1,
        };
        board.setup();
        board
    }

    fn setup(&mut self) {
        let north = [
            (TowerKind::Central, CENTRAL_FOOTPRINTS[0].center()),
            (TowerKind::Lateral, LATERAL_FOOTPRINTS[0].center()),
            (TowerKind::Lateral, LATERAL_FOOTPRINTS[1].center()),
        ];
        let south = [
            (TowerKind::Central, CENTRAL_FOOTPRINTS[1].center()),
            (TowerKind::Lateral, LATERAL_FOOTPRINTS[2].center()),
            (TowerKind::Lateral, LATERAL_FOOTPRINTS[3].center()),
        ];
        for (owner, side) in [(PlayerId::One, north), (PlayerId::Two, south)] {
            for (kind, pos) in side {
                self.place_tower(owner, kind, pos);
            }
        }
    }

    fn place_tower(&mut self, owner: PlayerId, kind: TowerKind, pos: Vec2) {
        let id = self.allocate_id();
        self.entities.push(Entity::new(
            id,
            owner,
            pos,
            crate::entity::EntityKind::Tower(Tower::new(kind)),
        ));
        self.towers.push(TowerRecord {
            id,
            owner,
            kind,
            alive: true,
        });
    }

    fn allocate_id(&mut self) -> EntityId {
        let id = EntityId(self.next_id);
        self.next_id += 1;
        id
    }

    // -- queries -------------------------------------------------------------

    /// Live entities in ascending-id order. This is the presenter's whole
    /// read surface.
    pub fn entities(&self) -> &[Entity] {
        &self.entities
    }

    /// Look up a live entity by id.
    pub fn entity(&self, id: EntityId) -> Option<&Entity> {
        self.entities.iter().find(|e| e.id() == id)
    }

    /// The persistent tower registry.
    pub fn towers(&self) -> &[TowerRecord] {
        &self.towers
    }

    /// The static obstacle set.
    pub fn obstacles(&self) -> &BTreeSet<Cell> {
        &self.obstacles
    }

    /// Number of live troops.
    pub fn troop_count(&self) -> usize {
        self.entities
            .iter()
            .filter(|e| matches!(e.kind(), crate::entity::EntityKind::Troop(_)))
            .count()
    }

    fn cell_occupied(&self, cell: Cell) -> bool {
        self.entities
            .iter()
            .any(|e| e.targetable() && e.cell() == cell)
    }

    /// Whether `owner` may deploy a troop on `cell`: in bounds, not an
    /// obstacle, not already holding a troop or tower, and inside the
    /// owner's half.
    pub fn valid_placement(&self, owner: PlayerId, cell: Cell) -> bool {
        cell.in_bounds()
            && owner.owns_row(cell.row)
            && !self.obstacles.contains(&cell)
            && !self.cell_occupied(cell)
    }

    /// Terminal-condition report for `owner`, answered from the tower
    /// registry.
    pub fn win_state(&self, owner: PlayerId) -> WinState {
        let holds = |p: PlayerId| self.towers.iter().any(|t| t.owner == p && t.alive);
        if !holds(owner.opponent()) {
            WinState::Won
        } else if !holds(owner) {
            WinState::Lost
        } else {
            WinState::Continuing
        }
    }

    // -- mutation ------------------------------------------------------------

    /// Deploy a troop centered on `cell`. The cell is re-validated here at
    /// drain time; a violation makes the spawn a logged no-op -- both
    /// peers reach the same verdict from the same state, so skipping is
    /// deterministic.
    pub fn spawn(&mut self, unit: UnitKind, cell: Cell, owner: PlayerId) {
        if !cell.in_bounds() || self.obstacles.contains(&cell) || self.cell_occupied(cell) {
            debug!(%owner, ?cell, ?unit, "spawn dropped: cell unavailable");
            return;
        }
        let id = self.allocate_id();
        self.entities.push(Entity::troop(id, owner, unit, cell));
    }

    /// Apply a drained timeline event to the world.
    pub fn apply_event(&mut self, event: &GameEvent) {
        match &event.kind {
            EventKind::SpawnUnit { unit, cell } => self.spawn(*unit, *cell, event.owner),
        }
    }

    /// Advance the world by one tick of `dt` seconds (Phases A, B, C).
    pub fn tick(&mut self, dt: f64) {
        // Phase A: plan against the tick-start view.
        let view = self.view();
        for entity in &mut self.entities {
            entity.update(dt, &view);
        }

        // Phase B: act. The slice is split around the executing entity so
        // it can damage others without aliasing itself; spawns go to the
        // staging buffer.
        let mut staging = Staging::new(self.next_id);
        for i in 0..self.entities.len() {
            let (before, rest) = self.entities.split_at_mut(i);
            let (me, after) = rest.split_first_mut().expect("index is in range");
            let mut others = Neighbors::new(before, after);
            me.execute(dt, &self.obstacles, &mut others, &mut staging);
        }
        let (next_id, staged) = staging.finish();
        self.next_id = next_id;

        // Phase C: sync the tower registry, reap, admit staged spawns.
        for record in &mut self.towers {
            if record.alive {
                let live = self
                    .entities
                    .iter()
                    .any(|e| e.id() == record.id && e.active());
                if !live {
                    record.alive = false;
                }
            }
        }
        self.entities.retain(|e| e.active());
        self.entities.extend(staged);
    }

    /// Snapshot the tick-start world for Phase A: one sighting per live
    /// targetable entity plus the per-side lateral-tower-destroyed flags.
    fn view(&self) -> WorldView {
        let sightings: Vec<Sighting> = self
            .entities
            .iter()
            .filter(|e| e.targetable())
            .map(|e| Sighting {
                id: e.id(),
                owner: e.owner(),
                pos: e.pos(),
                life: e.life().unwrap_or(0),
                body_radius: e.body_radius(),
            })
            .collect();
        let lateral_down = [
            self.lateral_tower_down(PlayerId::One),
            self.lateral_tower_down(PlayerId::Two),
        ];
        WorldView::new(sightings, lateral_down)
    }

    fn lateral_tower_down(&self, owner: PlayerId) -> bool {
        self.towers
            .iter()
            .any(|t| t.owner == owner && t.kind == TowerKind::Lateral && !t.alive)
    }
}

impl Default for Board {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
