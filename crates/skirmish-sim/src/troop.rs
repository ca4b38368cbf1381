//! Troop behaviour: knights, musketeers, and wizards.
//!
//! A freshly deployed troop is inert for its 1-second delay window. After
//! that it alternates between chasing the nearest hostile troop-or-tower
//! and attacking it once in range. Steering is purely local: each tick a
//! moving troop picks the passable 8-neighbour cell whose center is
//! closest to its target and steps toward it -- there is no global
//! pathfinder.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::entity::{EntityId, Neighbors, Posture, Staging, UnitKind, WorldView};
use crate::grid::{Cell, Vec2};
use crate::player::PlayerId;

/// Seconds a freshly spawned troop stays inert.
pub const DEPLOY_DELAY: f64 = 1.0;

// ---------------------------------------------------------------------------
// AttackStyle
// ---------------------------------------------------------------------------

/// How a troop delivers its damage.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum AttackStyle {
    /// Damage written directly to the target (knight).
    Melee,
    /// Single-target projectile (musketeer).
    Shot { speed: f64 },
    /// Area projectile that records victims on approach (wizard).
    Splash { speed: f64, radius: f64 },
}

// ---------------------------------------------------------------------------
// Troop
// ---------------------------------------------------------------------------

/// Kind-specific state of a troop entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Troop {
    pub unit: UnitKind,
    pub life: i32,
    pub max_life: i32,
    pub damage: i32,
    /// Movement speed in cells per second.
    pub speed: f64,
    pub range: f64,
    /// Seconds between attacks.
    pub hit_speed: f64,
    pub style: AttackStyle,
    /// Seconds until the next permitted attack.
    pub cooldown: f64,
    /// Remaining pre-activation grace.
    pub delay: f64,
    pub posture: Posture,
    pub target: Option<EntityId>,
}

impl Troop {
    pub(crate) fn new(unit: UnitKind) -> Self {
        let (life, damage, range, hit_speed, style) = match unit {
            UnitKind::Knight => (1766, 202, 1.0, 1.2, AttackStyle::Melee),
            UnitKind::Musketeer => (721, 217, 6.0, 1.0, AttackStyle::Shot { speed: 15.0 }),
            UnitKind::Wizard => (
                755,
                281,
                5.5,
                1.4,
                AttackStyle::Splash {
                    speed: 10.0,
                    radius: 1.5,
                },
            ),
        };
        Self {
            unit,
            life,
            max_life: life,
            damage,
            speed: 1.0,
            range,
            hit_speed,
            style,
            cooldown: 0.0,
            delay: DEPLOY_DELAY,
            posture: Posture::Idle,
            target: None,
        }
    }

    /// Range test. When the target is a tower its disc radius shrinks the
    /// effective distance.
    fn in_range(&self, pos: Vec2, target_pos: Vec2, target_radius: f64) -> bool {
        pos.distance_to(target_pos) - target_radius <= self.range
    }

    pub(crate) fn update(&mut self, dt: f64, owner: PlayerId, pos: Vec2, view: &WorldView) {
        if self.delay > 0.0 {
            self.posture = Posture::Idle;
            self.cooldown = 0.0;
            self.delay -= dt;
            return;
        }

        match self.target.and_then(|id| view.target_alive(id)) {
            Some(s) if s.owner != owner && self.in_range(pos, s.pos, s.body_radius) => {
                self.posture = Posture::Attacking;
            }
            Some(_) => self.posture = Posture::Moving,
            None => {
                self.target = None;
                self.posture = Posture::Moving;
            }
        }

        // Acquisition: chase the nearest hostile even when it is out of
        // range. Only a troop mid-swing keeps its current target.
        if self.posture != Posture::Attacking {
            if let Some(found) = view.nearest_hostile(owner, pos) {
                self.target = Some(found.id);
            }
        }
    }

    pub(crate) fn execute(
        &mut self,
        dt: f64,
        owner: PlayerId,
        pos: &mut Vec2,
        obstacles: &BTreeSet<Cell>,
        others: &mut Neighbors<'_>,
        staging: &mut Staging,
    ) {
        match self.posture {
            Posture::Attacking => {
                self.cooldown -= dt;
                if self.cooldown <= 0.0 {
                    if let Some(target) = self.target {
                        self.attack(owner, *pos, target, others, staging);
                    }
                    self.cooldown = self.hit_speed;
                }
            }
            Posture::Moving => self.step(dt, pos, obstacles, others),
            Posture::Idle => {}
        }
    }

    fn attack(
        &self,
        owner: PlayerId,
        pos: Vec2,
        target: EntityId,
        others: &mut Neighbors<'_>,
        staging: &mut Staging,
    ) {
        match self.style {
            AttackStyle::Melee => {
                if let Some(victim) = others.get_mut(target) {
                    if victim.life().map_or(false, |l| l > 0) {
                        victim.receive_damage(self.damage);
                    }
                }
            }
            AttackStyle::Shot { speed } => {
                if let Some(victim) = others.get(target) {
                    staging.spawn_projectile(owner, pos, speed, target, victim.pos(), self.damage);
                }
            }
            AttackStyle::Splash { speed, radius } => {
                if let Some(victim) = others.get(target) {
                    staging.spawn_area_projectile(
                        owner,
                        pos,
                        speed,
                        target,
                        victim.pos(),
                        self.damage,
                        radius,
                    );
                }
            }
        }
    }

    /// Local steering: walk toward the passable 8-neighbour cell whose
    /// center is closest to the target, clamped so the step never
    /// overshoots the waypoint.
    fn step(
        &self,
        dt: f64,
        pos: &mut Vec2,
        obstacles: &BTreeSet<Cell>,
        others: &Neighbors<'_>,
    ) {
        let Some(target) = self.target else {
            return;
        };
        let Some(goal) = others.get(target).map(|e| e.pos()) else {
            return;
        };

        let here = pos.cell();
        let mut best: Option<(f64, Vec2)> = None;
        for dx in -1..=1 {
            for dy in -1..=1 {
                if dx == 0 && dy == 0 {
                    continue;
                }
                let cell = Cell::new(here.col + dx, here.row + dy);
                if !cell.in_bounds() || obstacles.contains(&cell) {
                    continue;
                }
                let wp = cell.center();
                let d = goal.distance_to(wp);
                if best.map_or(true, |(bd, _)| d < bd) {
                    best = Some((d, wp));
                }
            }
        }
        let Some((_, wp)) = best else {
            return;
        };

        let dx = wp.x - pos.x;
        let dy = wp.y - pos.y;
        let dist = dx.hypot(dy);
        if dist < 1e-9 {
            return;
        }
        let step = (self.speed * dt).min(dist);
        pos.x += dx / dist * step;
        pos.y += dy / dist * step;
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
