//! Tower behaviour: the central (king) and lateral (princess) towers.
//!
//! Towers never move. Each tick they keep or acquire the nearest hostile
//! troop-or-tower within range (ties by ascending id) and, when their
//! cooldown allows, fire a single-target projectile at it.
//!
//! The central tower starts dormant: it only becomes eligible to attack
//! once it has taken damage or one of its own side's lateral towers has
//! been destroyed. While dormant it holds no target and its cooldown is
//! pinned at zero.

use serde::{Deserialize, Serialize};

use crate::entity::{Neighbors, Posture, Staging, WorldView};
use crate::grid::Vec2;
use crate::player::PlayerId;

/// Flight speed of tower projectiles, in cells per second.
pub const TOWER_PROJECTILE_SPEED: f64 = 5.0;

// ---------------------------------------------------------------------------
// TowerKind
// ---------------------------------------------------------------------------

/// Which of the two tower archetypes this is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TowerKind {
    /// The king tower on the 4x4 footprint; dormant until provoked.
    Central,
    /// A princess tower on a 3x3 footprint; always eligible.
    Lateral,
}

// ---------------------------------------------------------------------------
// Tower
// ---------------------------------------------------------------------------

/// Kind-specific state of a tower entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tower {
    pub kind: TowerKind,
    /// Footprint edge length in cells; range tests treat the tower as a
    /// disc of radius `size / 2`.
    pub size: f64,
    pub life: i32,
    pub max_life: i32,
    pub damage: i32,
    /// Seconds between shots.
    pub hit_speed: f64,
    pub attack_range: f64,
    /// Seconds until the next permitted shot.
    pub cooldown: f64,
    pub posture: Posture,
    pub target: Option<crate::entity::EntityId>,
}

impl Tower {
    pub(crate) fn new(kind: TowerKind) -> Self {
        let (size, life, hit_speed) = match kind {
            TowerKind::Central => (4.0, 4824, 1.0),
            TowerKind::Lateral => (3.0, 3052, 0.8),
        };
        Self {
            kind,
            size,
            life,
            max_life: life,
            damage: 109,
            hit_speed,
            attack_range: 7.5 + size / 2.0,
            cooldown: 0.0,
            posture: Posture::Idle,
            target: None,
        }
    }

    /// Range test against a sighting, treating the tower as a disc.
    fn in_range(&self, pos: Vec2, target_pos: Vec2) -> bool {
        pos.distance_to(target_pos) - self.size / 2.0 <= self.attack_range
    }

    /// The dormancy gate. Lateral towers are always eligible; the central
    /// tower wakes up once damaged or once an own-side lateral is down.
    fn can_attack(&self, owner: PlayerId, view: &WorldView) -> bool {
        match self.kind {
            TowerKind::Lateral => true,
            TowerKind::Central => {
                self.life < self.max_life || view.lateral_tower_destroyed(owner)
            }
        }
    }

    pub(crate) fn update(&mut self, owner: PlayerId, pos: Vec2, view: &WorldView) {
        if !self.can_attack(owner, view) {
            self.posture = Posture::Idle;
            self.cooldown = 0.0;
            self.target = None;
            return;
        }

        let retained = self
            .target
            .and_then(|id| view.target_alive(id))
            .map(|s| s.owner != owner && self.in_range(pos, s.pos))
            .unwrap_or(false);

        if retained {
            self.posture = Posture::Attacking;
            return;
        }

        self.posture = Posture::Idle;
        self.target = None;
        if let Some(found) = view.nearest_hostile(owner, pos) {
            if self.in_range(pos, found.pos) {
                self.target = Some(found.id);
                self.posture = Posture::Attacking;
            }
        }
    }

    pub(crate) fn execute(
        &mut self,
        dt: f64,
        owner: PlayerId,
        pos: Vec2,
        others: &mut Neighbors<'_>,
        staging: &mut Staging,
    ) {
        self.cooldown -= dt;
        if self.cooldown > 0.0 {
            return;
        }
        let Some(target) = self.target else {
            return;
        };
        let Some(entity) = others.get(target) else {
            return;
        };
        if entity.life().map_or(false, |l| l > 0) {
            staging.spawn_projectile(
                owner,
                pos,
                TOWER_PROJECTILE_SPEED,
                target,
                entity.pos(),
                self.damage,
            );
            self.cooldown = self.hit_speed;
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::{EntityId, Sighting};

    fn view_with(sightings: Vec<Sighting>, lateral_down: [bool; 2]) -> WorldView {
        WorldView::new(sightings, lateral_down)
    }

    fn hostile(id: u64, x: f64, y: f64) -> Sighting {
        Sighting {
            id: EntityId(id),
            owner: PlayerId::Two,
            pos: Vec2::new(x, y),
            life: 1000,
            body_radius: 0.0,
        }
    }

    // -- 1. Stats -----------------------------------------------------------

    #[test]
    fn central_stats() {
        let t = Tower::new(TowerKind::Central);
        assert_eq!(t.life, 4824);
        assert_eq!(t.hit_speed, 1.0);
        assert_eq!(t.attack_range, 9.5);
        assert_eq!(t.damage, 109);
    }

    #[test]
    fn lateral_stats() {
        let t = Tower::new(TowerKind::Lateral);
        assert_eq!(t.life, 3052);
        assert_eq!(t.hit_speed, 0.8);
        assert_eq!(t.attack_range, 9.0);
    }

    // -- 2. Dormancy gate ----------------------------------------------------

    #[test]
    fn central_tower_starts_dormant() {
        let mut t = Tower::new(TowerKind::Central);
        let pos = Vec2::new(9.0, 3.0);
        let view = view_with(vec![hostile(10, 9.0, 6.0)], [false, false]);
        t.update(PlayerId::One, pos, &view);
        assert_eq!(t.posture, Posture::Idle);
        assert!(t.target.is_none());
    }

    #[test]
    fn central_tower_wakes_when_damaged() {
        let mut t = Tower::new(TowerKind::Central);
        t.life -= 1;
        let pos = Vec2::new(9.0, 3.0);
        let view = view_with(vec![hostile(10, 9.0, 6.0)], [false, false]);
        t.update(PlayerId::One, pos, &view);
        assert_eq!(t.posture, Posture::Attacking);
        assert_eq!(t.target, Some(EntityId(10)));
    }

    #[test]
    fn central_tower_wakes_when_own_lateral_falls() {
        let mut t = Tower::new(TowerKind::Central);
        let pos = Vec2::new(9.0, 3.0);
        let view = view_with(vec![hostile(10, 9.0, 6.0)], [true, false]);
        t.update(PlayerId::One, pos, &view);
        assert_eq!(t.posture, Posture::Attacking);
    }

    #[test]
    fn opponent_lateral_loss_does_not_wake_central() {
        let mut t = Tower::new(TowerKind::Central);
        let pos = Vec2::new(9.0, 3.0);
        let view = view_with(vec![hostile(10, 9.0, 6.0)], [false, true]);
        t.update(PlayerId::One, pos, &view);
        assert_eq!(t.posture, Posture::Idle);
    }

    // -- 3. Acquisition and range --------------------------------------------

    #[test]
    fn lateral_acquires_nearest_in_range() {
        let mut t = Tower::new(TowerKind::Lateral);
        let pos = Vec2::new(3.5, 6.5);
        let view = view_with(
            vec![hostile(10, 3.5, 12.5), hostile(11, 3.5, 10.5)],
            [false, false],
        );
        t.update(PlayerId::One, pos, &view);
        assert_eq!(t.target, Some(EntityId(11)));
        assert_eq!(t.posture, Posture::Attacking);
    }

    #[test]
    fn lateral_ignores_out_of_range() {
        let mut t = Tower::new(TowerKind::Lateral);
        let pos = Vec2::new(3.5, 6.5);
        // Distance 12 minus disc radius 1.5 is 10.5, beyond range 9.
        let view = view_with(vec![hostile(10, 3.5, 18.5)], [false, false]);
        t.update(PlayerId::One, pos, &view);
        assert!(t.target.is_none());
        assert_eq!(t.posture, Posture::Idle);
    }

    #[test]
    fn disc_radius_extends_reach() {
        let mut t = Tower::new(TowerKind::Lateral);
        let pos = Vec2::new(3.5, 6.5);
        // Distance 10.3 > range 9, but 10.3 - 1.5 = 8.8 <= 9.
        let view = view_with(vec![hostile(10, 3.5, 16.8)], [false, false]);
        t.update(PlayerId::One, pos, &view);
        assert_eq!(t.target, Some(EntityId(10)));
    }

    #[test]
    fn dead_target_is_dropped() {
        let mut t = Tower::new(TowerKind::Lateral);
        t.target = Some(EntityId(10));
        let pos = Vec2::new(3.5, 6.5);
        let mut corpse = hostile(10, 3.5, 8.5);
        corpse.life = 0;
        let view = view_with(vec![corpse], [false, false]);
        t.update(PlayerId::One, pos, &view);
        assert!(t.target.is_none());
        assert_eq!(t.posture, Posture::Idle);
    }
}
