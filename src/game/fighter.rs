//! Fighter entity and per-tick simulation

use std::f32::consts::TAU;

use rand::Rng;
use serde::{Deserialize, Serialize};

use super::combat::{CombatSystem, HitResult, MoveKind, ATTACK_COOLDOWN};
use super::input::InputIntent;
use super::particles::Particle;
use super::physics::{
    PhysicsSystem, Rect, Vector2, GROUND_Y, JUMP_VELOCITY, WALK_ACCEL, WALK_THRESHOLD,
};

pub const MAX_HEALTH: f32 = 100.0;
pub const FIGHTER_WIDTH: f32 = 60.0;
pub const FIGHTER_HEIGHT: f32 = 80.0;
/// Spawn height above the ground line (fighters drop in)
pub const SPAWN_DROP: f32 = 100.0;

const WOBBLE_STEP: f32 = 0.15;
const WOBBLE_TILT: f32 = 0.05;
const LEAN_PER_SPEED: f32 = 0.05;
const ROTATION_DAMPING: f32 = 0.2;

/// Display-facing state label, derived from the fighter's flags and counters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FighterState {
    Idle,
    Walking,
    Jumping,
    Attacking,
    Hit,
    Fallen,
}

/// One player's full simulation state
#[derive(Debug, Clone)]
pub struct Fighter {
    pub id: u8,
    pub name: String,
    pub color: String,

    // Kinematics
    pub pos: Vector2,
    pub vel: Vector2,
    pub width: f32,
    pub height: f32,
    /// +1 facing right, -1 facing left
    pub facing: i8,

    // Combat
    pub health: f32,
    pub max_health: f32,
    pub is_jumping: bool,
    pub attack_cooldown: u32,
    pub hit_stun: u32,
    pub wins: u32,

    state: FighterState,

    // Cosmetic only
    pub rotation: f32,
    pub wobble_offset: f32,
}

impl Fighter {
    /// Create a fighter standing `SPAWN_DROP` above the ground at `x`.
    /// Player 1 faces right, everyone else faces left
    pub fn new<R: Rng + ?Sized>(id: u8, name: &str, color: &str, x: f32, rng: &mut R) -> Self {
        Self {
            id,
            name: name.to_string(),
            color: color.to_string(),
            pos: Vector2::new(x, GROUND_Y - SPAWN_DROP),
            vel: Vector2::ZERO,
            width: FIGHTER_WIDTH,
            height: FIGHTER_HEIGHT,
            facing: if id == 1 { 1 } else { -1 },
            health: MAX_HEALTH,
            max_health: MAX_HEALTH,
            is_jumping: false,
            attack_cooldown: 0,
            hit_stun: 0,
            wins: 0,
            state: FighterState::Idle,
            rotation: 0.0,
            wobble_offset: rng.gen_range(0.0..TAU),
        }
    }

    pub fn state(&self) -> FighterState {
        self.state
    }

    /// Hurtbox: the full bounding box
    pub fn bounds(&self) -> Rect {
        Rect::new(self.pos.x, self.pos.y, self.width, self.height)
    }

    pub fn is_knocked_out(&self) -> bool {
        self.health <= 0.0
    }

    /// The state label implied by the current flags and counters.
    ///
    /// An airborne fighter reads as jumping even while drifting sideways.
    pub fn derive_state(&self) -> FighterState {
        if self.is_knocked_out() {
            FighterState::Fallen
        } else if self.hit_stun > 0 {
            FighterState::Hit
        } else if self.attack_cooldown > 0 {
            FighterState::Attacking
        } else if self.is_jumping {
            FighterState::Jumping
        } else if self.vel.x.abs() > WALK_THRESHOLD {
            FighterState::Walking
        } else {
            FighterState::Idle
        }
    }

    pub(crate) fn refresh_state(&mut self) {
        self.state = self.derive_state();
    }

    /// Advance one tick.
    ///
    /// `opponent` is the opponent as it was before this tick started. A move
    /// that connects is returned instead of being written into the opponent;
    /// the session applies it once both fighters have been updated.
    pub fn update<R: Rng + ?Sized>(
        &mut self,
        intent: &InputIntent,
        opponent: &Fighter,
        particles: &mut Vec<Particle>,
        rng: &mut R,
    ) -> Option<HitResult> {
        let mut hit = None;

        if self.hit_stun > 0 {
            self.hit_stun -= 1;
        } else {
            hit = self.handle_input(intent, opponent, particles, rng);
        }

        let (pos, vel) = PhysicsSystem::integrate(self.pos, self.vel);
        let contact = PhysicsSystem::resolve_world(pos, vel, self.width, self.height);
        self.pos = contact.pos;
        self.vel = contact.vel;
        if contact.grounded {
            self.is_jumping = false;
        }

        self.refresh_state();

        self.attack_cooldown = self.attack_cooldown.saturating_sub(1);

        self.wobble();

        hit
    }

    fn handle_input<R: Rng + ?Sized>(
        &mut self,
        intent: &InputIntent,
        opponent: &Fighter,
        particles: &mut Vec<Particle>,
        rng: &mut R,
    ) -> Option<HitResult> {
        // Both directions are additive; right is evaluated last and wins facing
        if intent.left {
            self.vel.x -= WALK_ACCEL;
            self.facing = -1;
        }
        if intent.right {
            self.vel.x += WALK_ACCEL;
            self.facing = 1;
        }

        if intent.up && !self.is_jumping {
            self.vel.y = JUMP_VELOCITY;
            self.is_jumping = true;
        }

        if self.attack_cooldown > 0 {
            return None;
        }

        let kind = if intent.light_attack {
            MoveKind::Light
        } else if intent.heavy_attack {
            MoveKind::Heavy
        } else {
            return None;
        };

        self.attack_cooldown = ATTACK_COOLDOWN;
        CombatSystem::resolve(self, opponent, kind, particles, rng)
    }

    fn wobble(&mut self) {
        self.wobble_offset += WOBBLE_STEP;
        let target = self.vel.x * LEAN_PER_SPEED + self.wobble_offset.sin() * WOBBLE_TILT;
        self.rotation += (target - self.rotation) * ROTATION_DAMPING;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::combat::HIT_STUN;
    use crate::game::physics::{ARENA_WIDTH, FRICTION, GRAVITY, MAX_WALK_SPEED};
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn rng() -> ChaCha8Rng {
        ChaCha8Rng::seed_from_u64(42)
    }

    fn on_ground(id: u8, x: f32) -> Fighter {
        let mut f = Fighter::new(id, "Gloop", "#60a5fa", x, &mut rng());
        f.pos.y = GROUND_Y - f.height;
        f
    }

    fn far_away() -> Fighter {
        on_ground(2, 900.0)
    }

    fn intent(f: impl FnOnce(&mut InputIntent)) -> InputIntent {
        let mut i = InputIntent::default();
        f(&mut i);
        i
    }

    #[test]
    fn spawns_facing_each_other_with_full_health() {
        let mut r = rng();
        let p1 = Fighter::new(1, "Bean-o", "#f87171", 200.0, &mut r);
        let p2 = Fighter::new(2, "Gloop", "#60a5fa", ARENA_WIDTH - 260.0, &mut r);
        assert_eq!(p1.facing, 1);
        assert_eq!(p2.facing, -1);
        assert_eq!(p1.health, MAX_HEALTH);
        assert_eq!(p1.pos.y, GROUND_Y - SPAWN_DROP);
        assert!((0.0..TAU).contains(&p1.wobble_offset));
    }

    #[test]
    fn walking_right_accelerates_and_faces_right() {
        let mut f = on_ground(1, 300.0);
        f.facing = -1;
        f.update(&intent(|i| i.right = true), &far_away(), &mut Vec::new(), &mut rng());

        assert_eq!(f.facing, 1);
        assert_eq!(f.vel.x, WALK_ACCEL * FRICTION);
        assert_eq!(f.state(), FighterState::Walking);
    }

    #[test]
    fn both_directions_cancel_and_right_wins_facing() {
        let mut f = on_ground(1, 300.0);
        f.facing = -1;
        let both = intent(|i| {
            i.left = true;
            i.right = true;
        });
        f.update(&both, &far_away(), &mut Vec::new(), &mut rng());

        assert_eq!(f.facing, 1);
        assert_eq!(f.vel.x, 0.0);
        assert_eq!(f.state(), FighterState::Idle);
    }

    #[test]
    fn speed_is_capped() {
        let mut f = on_ground(1, 100.0);
        let right = intent(|i| i.right = true);
        for _ in 0..200 {
            f.update(&right, &far_away(), &mut Vec::new(), &mut rng());
            assert!(f.vel.x <= MAX_WALK_SPEED);
        }
    }

    #[test]
    fn jump_only_from_ground() {
        let mut f = on_ground(1, 300.0);
        let up = intent(|i| i.up = true);

        f.update(&up, &far_away(), &mut Vec::new(), &mut rng());
        assert!(f.is_jumping);
        assert_eq!(f.vel.y, JUMP_VELOCITY + GRAVITY);
        assert_eq!(f.state(), FighterState::Jumping);

        // Holding jump in the air does not re-launch
        let vy = f.vel.y;
        f.update(&up, &far_away(), &mut Vec::new(), &mut rng());
        assert_eq!(f.vel.y, vy + GRAVITY);
    }

    #[test]
    fn airborne_drift_decays_until_landing() {
        let mut f = on_ground(1, 300.0);
        f.pos.y = 200.0;
        f.vel = Vector2::new(5.0, 0.0);
        f.is_jumping = true;
        let idle = InputIntent::default();

        let mut ticks = 0;
        while f.is_jumping {
            let before = f.vel;
            f.update(&idle, &far_away(), &mut Vec::new(), &mut rng());
            assert_eq!(f.vel.x, before.x * FRICTION);
            if f.is_jumping {
                assert_eq!(f.vel.y, before.y + GRAVITY);
            } else {
                assert_eq!(f.vel.y, 0.0);
                assert_eq!(f.pos.y, GROUND_Y - f.height);
            }
            ticks += 1;
            assert!(ticks < 1000, "fighter never landed");
        }
    }

    #[test]
    fn stun_suppresses_all_input() {
        let mut f = on_ground(1, 300.0);
        f.hit_stun = 3;
        let everything = InputIntent {
            left: true,
            right: true,
            up: true,
            light_attack: true,
            heavy_attack: true,
        };

        let hit = f.update(&everything, &on_ground(2, 360.0), &mut Vec::new(), &mut rng());
        assert!(hit.is_none());
        assert_eq!(f.hit_stun, 2);
        assert_eq!(f.vel.x, 0.0);
        assert!(!f.is_jumping);
        assert_eq!(f.attack_cooldown, 0);
        assert_eq!(f.state(), FighterState::Hit);
    }

    #[test]
    fn last_stun_tick_falls_through_to_cooldown_label() {
        let mut f = on_ground(1, 300.0);
        f.hit_stun = 1;
        f.attack_cooldown = 5;

        f.update(&InputIntent::default(), &far_away(), &mut Vec::new(), &mut rng());
        assert_eq!(f.hit_stun, 0);
        assert_eq!(f.attack_cooldown, 4);
        assert_eq!(f.state(), FighterState::Attacking);
    }

    #[test]
    fn attack_starts_cooldown_and_punch_wins_ties() {
        let mut f = on_ground(1, 200.0);
        let target = on_ground(2, 260.0);
        let mut particles = Vec::new();

        let both = intent(|i| {
            i.light_attack = true;
            i.heavy_attack = true;
        });
        let hit = f.update(&both, &target, &mut particles, &mut rng());

        let hit = hit.expect("target within punch reach");
        assert_eq!(hit.kind, MoveKind::Light);
        assert_eq!(f.state(), FighterState::Attacking);
        assert_eq!(f.attack_cooldown, ATTACK_COOLDOWN - 1);
    }

    #[test]
    fn cannot_attack_during_cooldown() {
        let mut f = on_ground(1, 200.0);
        let target = on_ground(2, 260.0);
        let punch = intent(|i| i.light_attack = true);

        assert!(f.update(&punch, &target, &mut Vec::new(), &mut rng()).is_some());
        for _ in 1..ATTACK_COOLDOWN {
            assert!(f.update(&punch, &target, &mut Vec::new(), &mut rng()).is_none());
        }
        assert_eq!(f.attack_cooldown, 0);
        assert!(f.update(&punch, &target, &mut Vec::new(), &mut rng()).is_some());
    }

    #[test]
    fn counters_never_increase_without_an_event() {
        let mut f = on_ground(1, 200.0);
        f.hit_stun = HIT_STUN;
        f.attack_cooldown = 10;
        let mut r = ChaCha8Rng::seed_from_u64(9);

        for _ in 0..40 {
            let i = InputIntent {
                left: r.gen(),
                right: r.gen(),
                up: r.gen(),
                light_attack: false,
                heavy_attack: false,
            };
            let (stun, cooldown) = (f.hit_stun, f.attack_cooldown);
            f.update(&i, &far_away(), &mut Vec::new(), &mut r);
            assert!(f.hit_stun <= stun);
            assert!(f.attack_cooldown <= cooldown);
        }
        assert_eq!(f.hit_stun, 0);
        assert_eq!(f.attack_cooldown, 0);
    }

    #[test]
    fn random_inputs_stay_inside_arena() {
        let mut r = ChaCha8Rng::seed_from_u64(1234);
        let mut f = Fighter::new(1, "Pudding", "#a78bfa", 200.0, &mut r);
        let opponent = on_ground(2, 500.0);

        for _ in 0..5000 {
            let i = InputIntent {
                left: r.gen_bool(0.5),
                right: r.gen_bool(0.4),
                up: r.gen_bool(0.1),
                light_attack: r.gen_bool(0.05),
                heavy_attack: r.gen_bool(0.05),
            };
            if r.gen_bool(0.02) {
                f.vel = Vector2::new(r.gen_range(-40.0..40.0), r.gen_range(-40.0..40.0));
            }
            f.update(&i, &opponent, &mut Vec::new(), &mut r);
            assert!(f.pos.x >= 0.0);
            assert!(f.pos.x + f.width <= ARENA_WIDTH);
            assert!(f.pos.y + f.height <= GROUND_Y);
        }
    }

    #[test]
    fn wobble_is_cosmetic() {
        let mut a = on_ground(1, 300.0);
        let mut b = a.clone();
        b.wobble_offset += 1.3;
        b.rotation = 0.4;
        let right = intent(|i| i.right = true);

        for _ in 0..30 {
            a.update(&right, &far_away(), &mut Vec::new(), &mut rng());
            b.update(&right, &far_away(), &mut Vec::new(), &mut rng());
        }
        assert_eq!(a.pos, b.pos);
        assert_eq!(a.vel, b.vel);
        assert_eq!(a.state(), b.state());
    }
}
