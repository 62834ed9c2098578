use std::ops::Deref;

use glam::Vec2;
use rand::Rng;

/// A single particle as laid out in the device buffer.
#[repr(C)]
#[derive(bytemuck::Pod, bytemuck::Zeroable, Clone, Copy, Debug, PartialEq)]
pub struct Particle {
    pub position: Vec2,
    pub velocity: Vec2,
}

impl Particle {
    pub const SIZE: usize = std::mem::size_of::<Particle>();

    pub fn new(position: Vec2, velocity: Vec2) -> Self {
        Self { position, velocity }
    }
}

/// A fixed-length sequence of particles.
///
/// Only read access is handed out, the length is decided at construction
/// and every later replacement has to match it.
#[derive(Clone, Debug, PartialEq)]
pub struct ParticleSet {
    particles: Vec<Particle>,
}

impl ParticleSet {
    pub fn new(particles: Vec<Particle>) -> Self {
        Self { particles }
    }

    /// Scatters `count` particles uniformly over `[0, bounds.x) x [0, bounds.y)`
    /// with velocity components in `[-1, 1)`.
    pub fn random<R: Rng + ?Sized>(count: usize, bounds: Vec2, rng: &mut R) -> Self {
        let particles = (0..count)
            .map(|_| {
                let position = Vec2::new(sample(rng, 0.0, bounds.x), sample(rng, 0.0, bounds.y));
                let velocity = Vec2::new(rng.gen_range(-1f32..1f32), rng.gen_range(-1f32..1f32));
                Particle::new(position, velocity)
            })
            .collect();

        Self { particles }
    }

    pub fn as_slice(&self) -> &[Particle] {
        &self.particles
    }

    pub fn byte_len(&self) -> u64 {
        (self.particles.len() * Particle::SIZE) as u64
    }

    pub fn centroid(&self) -> Vec2 {
        if self.particles.is_empty() {
            return Vec2::ZERO;
        }

        let sum: Vec2 = self.particles.iter().map(|p| p.position).sum();
        sum / self.particles.len() as f32
    }

    /// Swaps in `other` wholesale. `other` receives the previous contents.
    pub(crate) fn replace_with(&mut self, other: &mut Vec<Particle>) {
        assert_eq!(
            self.particles.len(),
            other.len(),
            "particle set length is fixed"
        );
        std::mem::swap(&mut self.particles, other);
    }
}

impl Deref for ParticleSet {
    type Target = [Particle];

    fn deref(&self) -> &Self::Target {
        &self.particles
    }
}

// `gen_range` panics on an empty range, which a zero-sized window would produce.
fn sample<R: Rng + ?Sized>(rng: &mut R, low: f32, high: f32) -> f32 {
    if high > low {
        rng.gen_range(low..high)
    } else {
        low
    }
}
