//! Arena physics: vectors, bounding boxes and the per-tick integration step

use std::ops::{Add, AddAssign};

use serde::{Deserialize, Serialize};

/// Arena width in pixels
pub const ARENA_WIDTH: f32 = 1000.0;
/// Arena height in pixels
pub const ARENA_HEIGHT: f32 = 600.0;
/// Y coordinate of the ground line (bottom edges rest here)
pub const GROUND_Y: f32 = 500.0;

/// Downward acceleration added to vertical velocity every tick
pub const GRAVITY: f32 = 0.5;
/// Horizontal velocity multiplier applied every tick
pub const FRICTION: f32 = 0.85;
/// Horizontal acceleration per tick while a direction is held
pub const WALK_ACCEL: f32 = 0.8;
/// Horizontal speed cap
pub const MAX_WALK_SPEED: f32 = 6.0;
/// Vertical velocity set on jump (negative is up)
pub const JUMP_VELOCITY: f32 = -15.0;
/// Below this horizontal speed a grounded fighter reads as idle
pub const WALK_THRESHOLD: f32 = 0.5;

/// 2D position or velocity in arena pixel space
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vector2 {
    pub x: f32,
    pub y: f32,
}

impl Vector2 {
    pub const ZERO: Self = Self { x: 0.0, y: 0.0 };

    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

impl Add for Vector2 {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl AddAssign for Vector2 {
    fn add_assign(&mut self, rhs: Self) {
        self.x += rhs.x;
        self.y += rhs.y;
    }
}

/// Axis-aligned rectangle anchored at its top-left corner
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub const fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self { x, y, width, height }
    }

    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }

    pub fn center(&self) -> Vector2 {
        Vector2::new(self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    /// Strict overlap test; boxes that only touch along an edge do not overlap
    pub fn overlaps(&self, other: &Rect) -> bool {
        self.x < other.right()
            && self.right() > other.x
            && self.y < other.bottom()
            && self.bottom() > other.y
    }
}

/// Result of resolving a body against the arena bounds
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WorldContact {
    pub pos: Vector2,
    pub vel: Vector2,
    /// True when the body came to rest on the ground this tick
    pub grounded: bool,
}

/// Physics system for fighter movement
pub struct PhysicsSystem;

impl PhysicsSystem {
    /// Apply friction, gravity and the speed cap, then integrate position.
    /// Returns (new_pos, new_vel)
    pub fn integrate(pos: Vector2, vel: Vector2) -> (Vector2, Vector2) {
        let mut vel = Vector2::new(vel.x * FRICTION, vel.y + GRAVITY);
        vel.x = vel.x.clamp(-MAX_WALK_SPEED, MAX_WALK_SPEED);
        (pos + vel, vel)
    }

    /// Clamp a `width` x `height` body onto the ground and between the walls.
    /// No bounce and no wraparound
    pub fn resolve_world(pos: Vector2, vel: Vector2, width: f32, height: f32) -> WorldContact {
        let mut pos = pos;
        let mut vel = vel;
        let mut grounded = false;

        if pos.y + height > GROUND_Y {
            pos.y = GROUND_Y - height;
            vel.y = 0.0;
            grounded = true;
        }

        if pos.x < 0.0 {
            pos.x = 0.0;
        }
        if pos.x + width > ARENA_WIDTH {
            pos.x = ARENA_WIDTH - width;
        }

        WorldContact { pos, vel, grounded }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integrate_applies_friction_then_gravity() {
        let (pos, vel) = PhysicsSystem::integrate(Vector2::new(100.0, 100.0), Vector2::new(4.0, -2.0));
        assert_eq!(vel, Vector2::new(4.0 * FRICTION, -2.0 + GRAVITY));
        assert_eq!(pos, Vector2::new(100.0 + 4.0 * FRICTION, 100.0 - 2.0 + GRAVITY));
    }

    #[test]
    fn integrate_caps_horizontal_speed() {
        let (_, vel) = PhysicsSystem::integrate(Vector2::ZERO, Vector2::new(50.0, 0.0));
        assert_eq!(vel.x, MAX_WALK_SPEED);
        let (_, vel) = PhysicsSystem::integrate(Vector2::ZERO, Vector2::new(-50.0, 0.0));
        assert_eq!(vel.x, -MAX_WALK_SPEED);
    }

    #[test]
    fn world_rests_body_on_ground() {
        let contact = PhysicsSystem::resolve_world(Vector2::new(10.0, 470.0), Vector2::new(0.0, 8.0), 60.0, 80.0);
        assert!(contact.grounded);
        assert_eq!(contact.pos.y, GROUND_Y - 80.0);
        assert_eq!(contact.vel.y, 0.0);
    }

    #[test]
    fn world_clamps_both_walls() {
        let left = PhysicsSystem::resolve_world(Vector2::new(-12.0, 0.0), Vector2::ZERO, 60.0, 80.0);
        assert_eq!(left.pos.x, 0.0);
        assert!(!left.grounded);

        let right = PhysicsSystem::resolve_world(Vector2::new(990.0, 0.0), Vector2::ZERO, 60.0, 80.0);
        assert_eq!(right.pos.x, ARENA_WIDTH - 60.0);
    }

    #[test]
    fn touching_edges_do_not_overlap() {
        let a = Rect::new(0.0, 0.0, 10.0, 10.0);
        let b = Rect::new(10.0, 0.0, 10.0, 10.0);
        assert!(!a.overlaps(&b));
        assert!(a.overlaps(&Rect::new(9.5, 9.5, 10.0, 10.0)));
    }
}
