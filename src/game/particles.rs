//! Hit debris particles

use rand::Rng;
use serde::Serialize;

use super::physics::Vector2;

/// Particles spawned per successful hit
pub const PARTICLES_PER_HIT: usize = 10;
/// Downward acceleration applied to particles each tick
pub const PARTICLE_GRAVITY: f32 = 0.2;
/// Half-width of the random velocity spread on each axis
pub const PARTICLE_SPREAD: f32 = 5.0;
/// Particle lifetime range in ticks (upper bound exclusive)
pub const PARTICLE_LIFE: std::ops::Range<i32> = 20..40;
/// Particle radius range in pixels
pub const PARTICLE_SIZE: std::ops::Range<f32> = 4.0..10.0;

/// Ephemeral visual debris, owned by the session's particle collection
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Particle {
    pub pos: Vector2,
    pub vel: Vector2,
    /// Remaining ticks; expired once `<= 0`
    pub life: i32,
    pub color: String,
    pub size: f32,
}

impl Particle {
    pub fn is_alive(&self) -> bool {
        self.life > 0
    }
}

/// Particle spawning and stepping
pub struct ParticleSystem;

impl ParticleSystem {
    /// Append a burst of [`PARTICLES_PER_HIT`] particles centred at `origin`
    pub fn spawn_burst<R: Rng + ?Sized>(
        sink: &mut Vec<Particle>,
        origin: Vector2,
        color: &str,
        rng: &mut R,
    ) {
        sink.reserve(PARTICLES_PER_HIT);
        for _ in 0..PARTICLES_PER_HIT {
            sink.push(Particle {
                pos: origin,
                vel: Vector2::new(
                    rng.gen_range(-PARTICLE_SPREAD..PARTICLE_SPREAD),
                    rng.gen_range(-PARTICLE_SPREAD..PARTICLE_SPREAD),
                ),
                life: rng.gen_range(PARTICLE_LIFE),
                color: color.to_string(),
                size: rng.gen_range(PARTICLE_SIZE),
            });
        }
    }

    /// Advance every particle one tick and drop the ones that expired.
    ///
    /// Filtering happens on the output, so an expired particle never reaches
    /// the next tick and its neighbours are never skipped.
    pub fn advance(particles: Vec<Particle>) -> Vec<Particle> {
        particles
            .into_iter()
            .filter(Particle::is_alive)
            .map(|mut p| {
                p.pos += p.vel;
                p.vel.y += PARTICLE_GRAVITY;
                p.life -= 1;
                p
            })
            .filter(Particle::is_alive)
            .collect()
    }
}
