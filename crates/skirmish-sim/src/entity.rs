//! The tagged entity model and the two-phase update/execute contract.
//!
//! Every object on the board is an [`Entity`]: a small common core (id,
//! owner, position, active flag) plus an [`EntityKind`] variant carrying
//! the behaviour-specific state. The board advances entities in two
//! phases:
//!
//! - **Phase A** (`update`): each entity reads a [`WorldView`] -- an
//!   immutable snapshot of the tick-start world -- and writes only its own
//!   state (target, cooldown, posture, delay, victims). Because nobody
//!   else's state changes during the phase, iteration order cannot leak
//!   into the outcome.
//! - **Phase B** (`execute`): each entity may move itself, apply damage to
//!   other entities through the narrow [`Entity::receive_damage`]
//!   capability (reached via [`Neighbors`]), and emit new entities into
//!   the [`Staging`] buffer. Staged spawns join the live set only after
//!   the phase completes.
//!
//! Targets are held as [`EntityId`]s and looked up per tick; entities
//! never borrow each other.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::grid::{Cell, Vec2};
use crate::player::PlayerId;
use crate::projectile::{AreaProjectile, Projectile};
use crate::tower::Tower;
use crate::troop::Troop;

// ---------------------------------------------------------------------------
// EntityId
// ---------------------------------------------------------------------------

/// A board-unique, monotonically increasing entity identifier.
///
/// Ids are allocated in creation order and never reused, so "ascending id"
/// is a stable, peer-identical tie-break for targeting and iteration.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct EntityId(pub u64);

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "e{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// UnitKind
// ---------------------------------------------------------------------------

/// The deployable troop types. The serialized names are the wire-format
/// card names.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum UnitKind {
    /// Melee bruiser.
    #[serde(rename = "Caballero")]
    Knight,
    /// Long-range single-target shooter.
    #[serde(rename = "Mosquetera")]
    Musketeer,
    /// Mid-range splash caster.
    #[serde(rename = "Mago")]
    Wizard,
}

impl UnitKind {
    /// Elixir cost of the card that deploys this unit.
    pub fn cost(self) -> u32 {
        match self {
            UnitKind::Knight => 3,
            UnitKind::Musketeer => 4,
            UnitKind::Wizard => 5,
        }
    }
}

// ---------------------------------------------------------------------------
// Posture
// ---------------------------------------------------------------------------

/// Behavioural state of a tower or troop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Posture {
    Idle,
    Moving,
    Attacking,
}

// ---------------------------------------------------------------------------
// Spell
// ---------------------------------------------------------------------------

/// A timed area effect. Counts its duration down and expires; spells are
/// never targetable. No card in the current set deploys one, but the
/// board supports them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Spell {
    /// Remaining lifetime in seconds.
    pub duration: f64,
    pub damage: i32,
    pub radius: f64,
}

// ---------------------------------------------------------------------------
// EntityKind
// ---------------------------------------------------------------------------

/// The behaviour-specific half of an entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum EntityKind {
    Tower(Tower),
    Troop(Troop),
    Projectile(Projectile),
    AreaProjectile(AreaProjectile),
    Spell(Spell),
}

// ---------------------------------------------------------------------------
// Entity
// ---------------------------------------------------------------------------

/// A board entity: common core plus kind-specific state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    id: EntityId,
    owner: PlayerId,
    pos: Vec2,
    active: bool,
    kind: EntityKind,
}

impl Entity {
    /// Construct an entity at an explicit position (towers sit on their
    /// footprint center rather than a cell center).
    pub(crate) fn new(id: EntityId, owner: PlayerId, pos: Vec2, kind: EntityKind) -> Self {
        Self {
            id,
            owner,
            pos,
            active: true,
            kind,
        }
    }

    /// Construct a troop centered on `cell`.
    pub(crate) fn troop(id: EntityId, owner: PlayerId, unit: UnitKind, cell: Cell) -> Self {
        Self::new(id, owner, cell.center(), EntityKind::Troop(Troop::new(unit)))
    }

    /// Construct a spell effect centered on `cell`.
    pub(crate) fn spell(id: EntityId, owner: PlayerId, cell: Cell, spell: Spell) -> Self {
        Self::new(id, owner, cell.center(), EntityKind::Spell(spell))
    }

    // -- read-only capabilities ---------------------------------------------

    pub fn id(&self) -> EntityId {
        self.id
    }

    pub fn owner(&self) -> PlayerId {
        self.owner
    }

    pub fn pos(&self) -> Vec2 {
        self.pos
    }

    /// The grid cell containing this entity.
    pub fn cell(&self) -> Cell {
        self.pos.cell()
    }

    pub fn active(&self) -> bool {
        self.active
    }

    /// Kind-specific state, for presenters and tests.
    pub fn kind(&self) -> &EntityKind {
        &self.kind
    }

    /// Remaining hit points. `None` for projectiles and spells.
    pub fn life(&self) -> Option<i32> {
        match &self.kind {
            EntityKind::Tower(t) => Some(t.life),
            EntityKind::Troop(t) => Some(t.life),
            _ => None,
        }
    }

    /// Hit points at creation, for HUD bars. `None` for projectiles and
    /// spells.
    pub fn max_life(&self) -> Option<i32> {
        match &self.kind {
            EntityKind::Tower(t) => Some(t.max_life),
            EntityKind::Troop(t) => Some(t.max_life),
            _ => None,
        }
    }

    /// Current behavioural posture, where the kind has one.
    pub fn posture(&self) -> Option<Posture> {
        match &self.kind {
            EntityKind::Tower(t) => Some(t.posture),
            EntityKind::Troop(t) => Some(t.posture),
            _ => None,
        }
    }

    /// Whether this entity can be acquired as a target. Only live towers
    /// and troops qualify; projectiles and spells never do.
    pub fn targetable(&self) -> bool {
        self.active && matches!(self.kind, EntityKind::Tower(_) | EntityKind::Troop(_))
    }

    /// Disc radius for range tests: towers count as a disc of half their
    /// footprint size, everything else as a point.
    pub fn body_radius(&self) -> f64 {
        match &self.kind {
            EntityKind::Tower(t) => t.size / 2.0,
            _ => 0.0,
        }
    }

    // -- mutating capabilities ----------------------------------------------

    /// Subtract `amount` hit points; the entity deactivates the moment its
    /// life reaches zero. No-op for kinds without life.
    pub(crate) fn receive_damage(&mut self, amount: i32) {
        let life = match &mut self.kind {
            EntityKind::Tower(t) => &mut t.life,
            EntityKind::Troop(t) => &mut t.life,
            _ => return,
        };
        *life -= amount;
        if *life <= 0 {
            self.active = false;
        }
    }

    /// Phase A: read the tick-start view, write only own state.
    pub(crate) fn update(&mut self, dt: f64, view: &WorldView) {
        if !self.active {
            return;
        }
        if let Some(life) = self.life() {
            if life <= 0 {
                self.active = false;
                return;
            }
        }
        let owner = self.owner;
        let pos = self.pos;
        match &mut self.kind {
            EntityKind::Tower(t) => t.update(owner, pos, view),
            EntityKind::Troop(t) => t.update(dt, owner, pos, view),
            EntityKind::Projectile(p) => p.update(view),
            EntityKind::AreaProjectile(p) => p.update(owner, pos, view),
            EntityKind::Spell(s) => {
                if s.duration <= 0.0 {
                    self.active = false;
                } else {
                    s.duration -= dt;
                }
            }
        }
    }

    /// Phase B: act on the world. May move self, damage others through
    /// [`Neighbors`], and stage new entities.
    pub(crate) fn execute(
        &mut self,
        dt: f64,
        obstacles: &BTreeSet<Cell>,
        others: &mut Neighbors<'_>,
        staging: &mut Staging,
    ) {
        if !self.active {
            return;
        }
        let owner = self.owner;
        match &mut self.kind {
            EntityKind::Tower(t) => t.execute(dt, owner, self.pos, others, staging),
            EntityKind::Troop(t) => {
                t.execute(dt, owner, &mut self.pos, obstacles, others, staging)
            }
            EntityKind::Projectile(p) => {
                if p.execute(dt, &mut self.pos, others) {
                    self.active = false;
                }
            }
            EntityKind::AreaProjectile(p) => {
                if p.execute(dt, &mut self.pos, others) {
                    self.active = false;
                }
            }
            EntityKind::Spell(_) => {}
        }
    }
}

// ---------------------------------------------------------------------------
// Sighting / WorldView
// ---------------------------------------------------------------------------

/// What Phase A sees of one targetable entity: the tick-start core of a
/// live tower or troop. Projectiles and spells never appear in a view.
#[derive(Debug, Clone, Copy)]
pub struct Sighting {
    pub id: EntityId,
    pub owner: PlayerId,
    pub pos: Vec2,
    pub life: i32,
    /// Disc radius for range tests (towers only).
    pub body_radius: f64,
}

/// Immutable snapshot of the world at the start of a tick, handed to every
/// entity's `update`. Sightings are in ascending-id order.
#[derive(Debug, Clone)]
pub struct WorldView {
    sightings: Vec<Sighting>,
    lateral_down: [bool; 2],
}

impl WorldView {
    pub(crate) fn new(sightings: Vec<Sighting>, lateral_down: [bool; 2]) -> Self {
        Self {
            sightings,
            lateral_down,
        }
    }

    /// Look up a sighting by entity id.
    pub fn get(&self, id: EntityId) -> Option<&Sighting> {
        self.sightings
            .binary_search_by_key(&id, |s| s.id)
            .ok()
            .map(|i| &self.sightings[i])
    }

    /// The sighting for `id`, provided the entity is still alive.
    pub fn target_alive(&self, id: EntityId) -> Option<&Sighting> {
        self.get(id).filter(|s| s.life > 0)
    }

    /// The nearest entity hostile to `owner`, by centroid distance from
    /// `from`, ties broken by ascending id. No range limit; callers gate
    /// range themselves.
    pub fn nearest_hostile(&self, owner: PlayerId, from: Vec2) -> Option<&Sighting> {
        self.sightings
            .iter()
            .filter(|s| s.owner != owner)
            .min_by(|a, b| {
                from.distance_to(a.pos)
                    .total_cmp(&from.distance_to(b.pos))
                    .then(a.id.cmp(&b.id))
            })
    }

    /// Iterate all sightings in ascending-id order.
    pub fn iter(&self) -> impl Iterator<Item = &Sighting> {
        self.sightings.iter()
    }

    /// Whether one of `owner`'s lateral towers has been destroyed. Fed
    /// from the board's persistent tower registry, so towers count as
    /// destroyed even after they have been reaped from the live set.
    pub fn lateral_tower_destroyed(&self, owner: PlayerId) -> bool {
        self.lateral_down[match owner {
            PlayerId::One => 0,
            PlayerId::Two => 1,
        }]
    }
}

// ---------------------------------------------------------------------------
// Neighbors
// ---------------------------------------------------------------------------

/// Mutable access to every entity except the one currently executing.
/// Built by the board by splitting the entity slice around the executing
/// index, so Phase B can read live state and apply damage without ever
/// aliasing the executor.
pub struct Neighbors<'a> {
    before: &'a mut [Entity],
    after: &'a mut [Entity],
}

impl<'a> Neighbors<'a> {
    pub(crate) fn new(before: &'a mut [Entity], after: &'a mut [Entity]) -> Self {
        Self { before, after }
    }

    /// Find an entity by id. Returns dead-but-unreaped entities too; the
    /// caller checks `active()` where it matters.
    pub fn get(&self, id: EntityId) -> Option<&Entity> {
        self.before
            .iter()
            .chain(self.after.iter())
            .find(|e| e.id == id)
    }

    /// Find an entity by id for mutation (damage delivery).
    pub fn get_mut(&mut self, id: EntityId) -> Option<&mut Entity> {
        self.before
            .iter_mut()
            .chain(self.after.iter_mut())
            .find(|e| e.id == id)
    }
}

// ---------------------------------------------------------------------------
// Staging
// ---------------------------------------------------------------------------

/// Deferred-spawn buffer for Phase B. New entities receive their ids here,
/// in execution order, and are appended to the live set in Phase C.
pub struct Staging {
    next_id: u64,
    entries: Vec<Entity>,
}

impl Staging {
    pub(crate) fn new(next_id: u64) -> Self {
        Self {
            next_id,
            entries: Vec::new(),
        }
    }

    fn allocate(&mut self) -> EntityId {
        let id = EntityId(self.next_id);
        self.next_id += 1;
        id
    }

    /// Stage a single-target projectile.
    pub(crate) fn spawn_projectile(
        &mut self,
        owner: PlayerId,
        from: Vec2,
        speed: f64,
        target: EntityId,
        target_pos: Vec2,
        damage: i32,
    ) {
        let id = self.allocate();
        self.entries.push(Entity::new(
            id,
            owner,
            from,
            EntityKind::Projectile(Projectile::new(speed, target, target_pos, damage)),
        ));
    }

    /// Stage an area projectile.
    pub(crate) fn spawn_area_projectile(
        &mut self,
        owner: PlayerId,
        from: Vec2,
        speed: f64,
        target: EntityId,
        target_pos: Vec2,
        damage: i32,
        radius: f64,
    ) {
        let id = self.allocate();
        self.entries.push(Entity::new(
            id,
            owner,
            from,
            EntityKind::AreaProjectile(AreaProjectile::new(
                speed, target, target_pos, damage, radius,
            )),
        ));
    }

    /// Dissolve into the allocated-id watermark and the staged entities.
    pub(crate) fn finish(self) -> (u64, Vec<Entity>) {
        (self.next_id, self.entries)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn sighting(id: u64, owner: PlayerId, x: f64, y: f64) -> Sighting {
        Sighting {
            id: EntityId(id),
            owner,
            pos: Vec2::new(x, y),
            life: 100,
            body_radius: 0.0,
        }
    }

    // -- 1. View lookups ----------------------------------------------------

    #[test]
    fn view_lookup_by_id() {
        let view = WorldView::new(
            vec![
                sighting(1, PlayerId::One, 0.0, 0.0),
                sighting(4, PlayerId::Two, 5.0, 5.0),
            ],
            [false, false],
        );
        assert!(view.get(EntityId(1)).is_some());
        assert!(view.get(EntityId(4)).is_some());
        assert!(view.get(EntityId(2)).is_none());
    }

    #[test]
    fn target_alive_requires_positive_life() {
        let mut dead = sighting(3, PlayerId::Two, 1.0, 1.0);
        dead.life = 0;
        let view = WorldView::new(vec![dead], [false, false]);
        assert!(view.get(EntityId(3)).is_some());
        assert!(view.target_alive(EntityId(3)).is_none());
    }

    // -- 2. Nearest-hostile selection ----------------------------------------

    #[test]
    fn nearest_hostile_picks_closest() {
        let view = WorldView::new(
            vec![
                sighting(1, PlayerId::One, 0.0, 0.0),
                sighting(2, PlayerId::Two, 3.0, 0.0),
                sighting(3, PlayerId::Two, 2.0, 0.0),
            ],
            [false, false],
        );
        let found = view
            .nearest_hostile(PlayerId::One, Vec2::new(0.0, 0.0))
            .unwrap();
        assert_eq!(found.id, EntityId(3));
    }

    #[test]
    fn nearest_hostile_ties_break_by_ascending_id() {
        let view = WorldView::new(
            vec![
                sighting(5, PlayerId::Two, 2.0, 0.0),
                sighting(9, PlayerId::Two, -2.0, 0.0),
            ],
            [false, false],
        );
        let found = view
            .nearest_hostile(PlayerId::One, Vec2::new(0.0, 0.0))
            .unwrap();
        assert_eq!(found.id, EntityId(5));
    }

    #[test]
    fn nearest_hostile_ignores_friendlies() {
        let view = WorldView::new(
            vec![
                sighting(1, PlayerId::One, 0.5, 0.0),
                sighting(2, PlayerId::Two, 9.0, 0.0),
            ],
            [false, false],
        );
        let found = view
            .nearest_hostile(PlayerId::One, Vec2::new(0.0, 0.0))
            .unwrap();
        assert_eq!(found.id, EntityId(2));
    }

    // -- 3. Damage capability ------------------------------------------------

    #[test]
    fn damage_deactivates_at_zero() {
        let mut knight = Entity::troop(
            EntityId(7),
            PlayerId::One,
            UnitKind::Knight,
            Cell::new(3, 8),
        );
        knight.receive_damage(1765);
        assert!(knight.active());
        assert_eq!(knight.life(), Some(1));
        knight.receive_damage(1);
        assert!(!knight.active());
    }

    #[test]
    fn troop_spawns_centered_with_full_stats() {
        let e = Entity::troop(
            EntityId(1),
            PlayerId::One,
            UnitKind::Knight,
            Cell::new(3, 8),
        );
        assert_eq!(e.pos(), Vec2::new(3.5, 8.5));
        assert_eq!(e.life(), Some(1766));
        assert_eq!(e.max_life(), Some(1766));
        assert!(e.targetable());
    }

    // -- 4. Staging ids -----------------------------------------------------

    #[test]
    fn staging_allocates_sequential_ids() {
        let mut staging = Staging::new(10);
        staging.spawn_projectile(
            PlayerId::One,
            Vec2::new(0.0, 0.0),
            5.0,
            EntityId(2),
            Vec2::new(1.0, 1.0),
            109,
        );
        staging.spawn_projectile(
            PlayerId::One,
            Vec2::new(0.0, 0.0),
            5.0,
            EntityId(2),
            Vec2::new(1.0, 1.0),
            109,
        );
        let (next, staged) = staging.finish();
        assert_eq!(next, 12);
        assert_eq!(staged[0].id(), EntityId(10));
        assert_eq!(staged[1].id(), EntityId(11));
    }

    #[test]
    fn projectiles_are_not_targetable() {
        let mut staging = Staging::new(1);
        staging.spawn_projectile(
            PlayerId::One,
            Vec2::new(0.0, 0.0),
            5.0,
            EntityId(99),
            Vec2::new(1.0, 1.0),
            10,
        );
        let (_, staged) = staging.finish();
        assert!(!staged[0].targetable());
    }

    // -- 5. Spells ------------------------------------------------------------

    #[test]
    fn spell_counts_down_and_expires() {
        let view = WorldView::new(vec![], [false, false]);
        let mut spell = Entity::spell(
            EntityId(9),
            PlayerId::One,
            Cell::new(9, 12),
            Spell {
                duration: 0.1,
                damage: 100,
                radius: 2.0,
            },
        );
        assert_eq!(spell.pos(), Vec2::new(9.5, 12.5));

        spell.update(0.04, &view);
        spell.update(0.04, &view);
        spell.update(0.04, &view);
        assert!(spell.active(), "a sliver of duration remains");

        spell.update(0.04, &view);
        assert!(!spell.active(), "expired spells deactivate");
    }

    #[test]
    fn spells_are_never_targetable() {
        let spell = Entity::spell(
            EntityId(9),
            PlayerId::Two,
            Cell::new(9, 20),
            Spell {
                duration: 3.0,
                damage: 100,
                radius: 2.0,
            },
        );
        assert!(spell.active());
        assert!(!spell.targetable());
        assert!(spell.life().is_none());
    }

    #[test]
    fn card_costs() {
        assert_eq!(UnitKind::Knight.cost(), 3);
        assert_eq!(UnitKind::Musketeer.cost(), 4);
        assert_eq!(UnitKind::Wizard.cost(), 5);
    }

    #[test]
    fn unit_kind_uses_wire_names() {
        assert_eq!(
            serde_json::to_string(&UnitKind::Knight).unwrap(),
            "\"Caballero\""
        );
        assert_eq!(
            serde_json::to_string(&UnitKind::Wizard).unwrap(),
            "\"Mago\""
        );
        assert_eq!(
            serde_json::from_str::<UnitKind>("\"Mosquetera\"").unwrap(),
            UnitKind::Musketeer
        );
    }
}
