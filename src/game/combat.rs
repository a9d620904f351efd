//! Combat system - move table, hit detection, damage and knockback

use rand::Rng;
use serde::{Deserialize, Serialize};

use super::fighter::Fighter;
use super::particles::{Particle, ParticleSystem};
use super::physics::{Rect, Vector2};

/// Ticks an attacker must wait before throwing another move
pub const ATTACK_COOLDOWN: u32 = 25;
/// Ticks a defender ignores input after being hit
pub const HIT_STUN: u32 = 15;
/// Horizontal knockback speed, signed by the attacker's facing
pub const KNOCKBACK_X: f32 = 10.0;
/// Vertical knockback velocity (upward)
pub const KNOCKBACK_Y: f32 = -5.0;

/// Attack kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MoveKind {
    /// Punch: short reach, low damage
    Light,
    /// Kick: longer reach, more damage
    Heavy,
}

/// Fixed stats for a move
#[derive(Debug, Clone, Copy)]
pub struct MoveStats {
    /// How far the hitbox extends past the attacker's leading edge
    pub reach: f32,
    pub damage: f32,
}

impl MoveStats {
    pub fn for_kind(kind: MoveKind) -> Self {
        match kind {
            MoveKind::Light => Self {
                reach: 60.0,
                damage: 8.0,
            },
            MoveKind::Heavy => Self {
                reach: 80.0,
                damage: 12.0,
            },
        }
    }
}

/// A landed hit, applied to the defender when the tick commits
#[derive(Debug, Clone, PartialEq)]
pub struct HitResult {
    pub attacker_id: u8,
    pub defender_id: u8,
    pub kind: MoveKind,
    pub damage: f32,
    pub stun: u32,
    /// Replaces the defender's velocity outright
    pub knockback: Vector2,
}

impl HitResult {
    /// Apply damage, stun and knockback. Health is not clamped at zero
    pub fn apply_to(&self, defender: &mut Fighter) {
        defender.health -= self.damage;
        defender.hit_stun = self.stun;
        defender.vel = self.knockback;
        defender.refresh_state();
    }
}

/// Combat resolution
pub struct CombatSystem;

impl CombatSystem {
    /// Reach-wide band from the attacker's leading edge, spanning its full height
    pub fn hitbox(attacker: &Fighter, reach: f32) -> Rect {
        let x = if attacker.facing > 0 {
            attacker.pos.x + attacker.width
        } else {
            attacker.pos.x - reach
        };
        Rect::new(x, attacker.pos.y, reach, attacker.height)
    }

    /// Test a move thrown by `attacker` against `defender` at this instant.
    ///
    /// On a hit a burst of particles is appended to `particles` at the
    /// defender's centre and the hit is returned for the caller to apply.
    /// A miss leaves everything untouched.
    pub fn resolve<R: Rng + ?Sized>(
        attacker: &Fighter,
        defender: &Fighter,
        kind: MoveKind,
        particles: &mut Vec<Particle>,
        rng: &mut R,
    ) -> Option<HitResult> {
        let stats = MoveStats::for_kind(kind);
        let hurtbox = defender.bounds();

        if !Self::hitbox(attacker, stats.reach).overlaps(&hurtbox) {
            return None;
        }

        ParticleSystem::spawn_burst(particles, hurtbox.center(), &defender.color, rng);

        Some(HitResult {
            attacker_id: attacker.id,
            defender_id: defender.id,
            kind,
            damage: stats.damage,
            stun: HIT_STUN,
            knockback: Vector2::new(KNOCKBACK_X * attacker.facing as f32, KNOCKBACK_Y),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::fighter::FighterState;
    use crate::game::particles::PARTICLES_PER_HIT;
    use crate::game::physics::GROUND_Y;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn grounded(id: u8, x: f32, facing: i8) -> Fighter {
        let mut rng = ChaCha8Rng::seed_from_u64(id as u64);
        let mut f = Fighter::new(id, "Test", "#60a5fa", x, &mut rng);
        f.pos.y = GROUND_Y - f.height;
        f.facing = facing;
        f
    }

    #[test]
    fn heavy_outclasses_light() {
        let light = MoveStats::for_kind(MoveKind::Light);
        let heavy = MoveStats::for_kind(MoveKind::Heavy);
        assert!(heavy.reach >= light.reach);
        assert!(heavy.damage >= light.damage);
    }

    #[test]
    fn hitbox_follows_facing() {
        let right = grounded(1, 200.0, 1);
        assert_eq!(CombatSystem::hitbox(&right, 60.0), Rect::new(260.0, right.pos.y, 60.0, 80.0));

        let left = grounded(1, 200.0, -1);
        assert_eq!(CombatSystem::hitbox(&left, 60.0), Rect::new(140.0, left.pos.y, 60.0, 80.0));
    }

    #[test]
    fn light_hit_at_close_range() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let a = grounded(1, 200.0, 1);
        let mut b = grounded(2, 260.0, -1);
        let mut particles = Vec::new();

        let hit = CombatSystem::resolve(&a, &b, MoveKind::Light, &mut particles, &mut rng)
            .expect("defender is within reach");
        assert_eq!(hit.damage, 8.0);
        assert_eq!(hit.knockback, Vector2::new(10.0, -5.0));
        assert_eq!(particles.len(), PARTICLES_PER_HIT);
        assert!(particles.iter().all(|p| p.pos == b.bounds().center()));

        hit.apply_to(&mut b);
        assert_eq!(b.health, 92.0);
        assert_eq!(b.hit_stun, HIT_STUN);
        assert_eq!(b.vel, Vector2::new(10.0, -5.0));
        assert_eq!(b.state(), FighterState::Hit);
    }

    #[test]
    fn knockback_overwrites_existing_velocity() {
        let a = grounded(1, 500.0, -1);
        let mut b = grounded(2, 430.0, 1);
        b.vel = Vector2::new(3.0, 7.0);
        let mut rng = ChaCha8Rng::seed_from_u64(2);

        let hit = CombatSystem::resolve(&a, &b, MoveKind::Heavy, &mut Vec::new(), &mut rng)
            .expect("defender is within reach");
        hit.apply_to(&mut b);
        assert_eq!(b.vel, Vector2::new(-10.0, -5.0));
        assert_eq!(b.health, 88.0);
    }

    #[test]
    fn miss_is_silent() {
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let a = grounded(1, 200.0, 1);
        let b = grounded(2, 400.0, -1);
        let mut particles = Vec::new();

        assert!(CombatSystem::resolve(&a, &b, MoveKind::Light, &mut particles, &mut rng).is_none());
        assert!(particles.is_empty());
    }

    #[test]
    fn facing_away_misses() {
        let mut rng = ChaCha8Rng::seed_from_u64(4);
        let a = grounded(1, 200.0, -1);
        let b = grounded(2, 260.0, -1);
        assert!(CombatSystem::resolve(&a, &b, MoveKind::Heavy, &mut Vec::new(), &mut rng).is_none());
    }

    #[test]
    fn damage_can_drive_health_negative() {
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        let a = grounded(1, 200.0, 1);
        let mut b = grounded(2, 260.0, -1);
        b.health = 3.0;
        let hit = CombatSystem::resolve(&a, &b, MoveKind::Heavy, &mut Vec::new(), &mut rng)
            .expect("defender is within reach");
        hit.apply_to(&mut b);
        assert_eq!(b.health, -9.0);
        assert_eq!(b.state(), FighterState::Fallen);
    }
}
