//! Projectiles: single-target shots and area shells.
//!
//! A [`Projectile`] homes on its target while the target lives (the aim
//! point refreshes every update) and delivers its damage on arrival. An
//! [`AreaProjectile`] flies to the spot its target occupied at launch and
//! records every hostile that strays within its blast radius during the
//! approach; on impact the whole victims list takes the damage, wherever
//! those victims have moved since. A victim is recorded at most once, so
//! leaving and re-entering the radius cannot double it up.

use serde::{Deserialize, Serialize};

use crate::entity::{EntityId, Neighbors, WorldView};
use crate::grid::Vec2;
use crate::player::PlayerId;

/// Seconds after which an undelivered projectile expires.
pub const PROJECTILE_MAX_DURATION: f64 = 5.0;

/// Remaining distance below which a projectile counts as arrived.
const IMPACT_EPSILON: f64 = 0.05;

/// Advance `pos` toward `aim` by at most `speed * dt`, clamped so the
/// step never overshoots. Sets `reached` when the step covers the whole
/// remaining distance.
fn fly(pos: &mut Vec2, aim: Vec2, speed: f64, dt: f64, reached: &mut bool) {
    let dx = aim.x - pos.x;
    let dy = aim.y - pos.y;
    let dist = dx.hypot(dy);

    let mut step = speed * dt;
    if step >= dist {
        *reached = true;
        step = dist;
    }
    if dist < 1e-6 {
        return;
    }
    pos.x += dx / dist * step;
    pos.y += dy / dist * step;
}

// ---------------------------------------------------------------------------
// Projectile
// ---------------------------------------------------------------------------

/// A single-target shot fired by a tower, musketeer, or similar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Projectile {
    /// Flight speed in cells per second.
    pub speed: f64,
    /// The entity this shot was aimed at.
    pub target: EntityId,
    /// Current aim point; tracks the target while it lives, then freezes
    /// at the last known position.
    pub target_pos: Vec2,
    pub damage: i32,
    pub max_duration: f64,
    pub elapsed: f64,
    pub reached_target: bool,
}

impl Projectile {
    pub(crate) fn new(speed: f64, target: EntityId, target_pos: Vec2, damage: i32) -> Self {
        Self {
            speed,
            target,
            target_pos,
            damage,
            max_duration: PROJECTILE_MAX_DURATION,
            elapsed: 0.0,
            reached_target: false,
        }
    }

    pub(crate) fn update(&mut self, view: &WorldView) {
        if let Some(s) = view.target_alive(self.target) {
            self.target_pos = s.pos;
        }
    }

    /// Returns `true` when the projectile should deactivate.
    pub(crate) fn execute(
        &mut self,
        dt: f64,
        pos: &mut Vec2,
        others: &mut Neighbors<'_>,
    ) -> bool {
        self.elapsed += dt;
        fly(pos, self.target_pos, self.speed, dt, &mut self.reached_target);

        let mut expired = false;
        let remaining = pos.distance_to(self.target_pos);
        if remaining < IMPACT_EPSILON || self.reached_target {
            match others.get_mut(self.target) {
                Some(victim) if victim.active() => {
                    victim.receive_damage(self.damage);
                    expired = true;
                }
                // Target already gone: the shot fizzles undelivered.
                _ => expired = true,
            }
        }
        if self.elapsed > self.max_duration {
            expired = true;
        }
        expired
    }
}

// ---------------------------------------------------------------------------
// AreaProjectile
// ---------------------------------------------------------------------------

/// A splash shell. The flight destination is fixed at launch; the victims
/// list grows during the approach and is drained once on impact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AreaProjectile {
    pub speed: f64,
    pub target: EntityId,
    /// Flight destination: the target's position at launch.
    pub target_pos: Vec2,
    pub damage: i32,
    pub radius: f64,
    pub max_duration: f64,
    pub elapsed: f64,
    pub reached_target: bool,
    /// Hostiles caught within the radius during the approach, in the order
    /// they were first seen. Each appears at most once.
    pub victims: Vec<EntityId>,
}

impl AreaProjectile {
    pub(crate) fn new(
        speed: f64,
        target: EntityId,
        target_pos: Vec2,
        damage: i32,
        radius: f64,
    ) -> Self {
        Self {
            speed,
            target,
            target_pos,
            damage,
            radius,
            max_duration: PROJECTILE_MAX_DURATION,
            elapsed: 0.0,
            reached_target: false,
            victims: Vec::new(),
        }
    }

    pub(crate) fn update(&mut self, owner: PlayerId, pos: Vec2, view: &WorldView) {
        // The sweep keys off the target's current position (falling back
        // to the launch aim once the target is gone), not the frozen
        // flight destination.
        let aim = view
            .get(self.target)
            .map(|s| s.pos)
            .unwrap_or(self.target_pos);
        if pos.distance_to(aim) < self.radius {
            for s in view.iter() {
                if s.owner != owner
                    && pos.distance_to(s.pos) <= self.radius
                    && !self.victims.contains(&s.id)
                {
                    self.victims.push(s.id);
                }
            }
        }
    }

    /// Returns `true` when the shell should deactivate.
    pub(crate) fn execute(
        &mut self,
        dt: f64,
        pos: &mut Vec2,
        others: &mut Neighbors<'_>,
    ) -> bool {
        self.elapsed += dt;
        fly(pos, self.target_pos, self.speed, dt, &mut self.reached_target);

        let mut expired = false;
        let remaining = pos.distance_to(self.target_pos);
        if remaining < IMPACT_EPSILON || self.reached_target {
            for &victim in &self.victims {
                if let Some(entity) = others.get_mut(victim) {
                    if entity.active() {
                        entity.receive_damage(self.damage);
                    }
                }
            }
            expired = true;
        }
        if self.elapsed > self.max_duration {
            expired = true;
        }
        expired
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
