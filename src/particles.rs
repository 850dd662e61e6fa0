//! # Ambient Particle Field Simulation
//!
//! A fixed number of slots, each holding one drifting point particle. Every
//! tick a particle moves by its velocity, ages by one, and follows a
//! three-segment opacity curve:
//!
//! ```text
//! opacity
//!   max ┤      ┌───────────────┐
//!       │     ╱                 ╲
//!     0 ┼────╱───────────────────╲───▶ age
//!       0  fade_in          max_lifetime
//!                       └fade_out┘
//! ```
//!
//! When a particle's age reaches its lifetime the slot is refilled in place
//! with a fresh particle, so slot indices stay stable and the field never
//! empties. Edges reflect: crossing a bound negates that velocity component.
//! The position is not clamped, so a particle may sit up to one step outside
//! the canvas for a single frame.
//!
//! ## Determinism
//! All randomness flows through the store's own RNG, which callers inject.
//! [`ParticleStore::seeded`] uses `Pcg32`, so a seed fully determines every
//! trajectory.

use crate::config::ParticleConfig;
use log::debug;
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;

/// One particle slot.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParticleRecord {
    pub x: f32,
    pub y: f32,
    pub vx: f32,
    pub vy: f32,
    pub radius: f32,
    /// Ticks since spawn
    pub age: u32,
    /// Age at which the slot respawns
    pub max_lifetime: f32,
    pub opacity: f32,
}

impl ParticleRecord {
    /// A new transparent particle anywhere on a `width`×`height` canvas.
    pub fn spawn<R: Rng + ?Sized>(rng: &mut R, config: &ParticleConfig, width: f32, height: f32) -> Self {
        let between = |rng: &mut R, lo: f32, hi: f32| lo + rng.random::<f32>() * (hi - lo);
        Self {
            x: rng.random::<f32>() * width,
            y: rng.random::<f32>() * height,
            vx: (rng.random::<f32>() - 0.5) * config.max_speed,
            vy: (rng.random::<f32>() - 0.5) * config.max_speed,
            radius: between(rng, config.min_radius, config.max_radius),
            age: 0,
            max_lifetime: between(rng, config.min_lifetime, config.max_lifetime),
            opacity: 0.0,
        }
    }
}

/// Opacity at `age` on the fade-in / plateau / fade-out curve.
pub fn lifecycle_opacity(age: u32, max_lifetime: f32, config: &ParticleConfig) -> f32 {
    let age = age as f32;
    let fade_in = config.fade_in_ticks as f32;
    let fade_out = config.fade_out_ticks as f32;
    let fade_out_start = max_lifetime - fade_out;
    // A NaN or negative ceiling collapses to zero
    let ceiling = config.max_opacity.max(0.0);

    let opacity = if age < fade_in {
        age / fade_in * config.max_opacity
    } else if age > fade_out_start {
        (max_lifetime - age) / fade_out * config.max_opacity
    } else {
        config.max_opacity
    };
    opacity.clamp(0.0, ceiling)
}

/// Fixed-size particle population bounded by a canvas.
#[derive(Debug, Clone)]
pub struct ParticleStore<R = Pcg32> {
    particles: Vec<ParticleRecord>,
    config: ParticleConfig,
    width: u32,
    height: u32,
    rng: R,
}

impl ParticleStore<Pcg32> {
    /// A staggered population driven by a seeded `Pcg32`.
    pub fn seeded(config: ParticleConfig, width: u32, height: u32, seed: u64) -> Self {
        Self::new(config, width, height, Pcg32::seed_from_u64(seed))
    }
}

impl<R: Rng> ParticleStore<R> {
    /// A population whose ages are spread across their lifetimes, so the
    /// field does not fade in all at once.
    pub fn new(config: ParticleConfig, width: u32, height: u32, rng: R) -> Self {
        let mut store = Self::empty(config, width, height, rng);
        store.populate(true);
        store
    }

    /// A population where every particle starts at age zero.
    pub fn fresh(config: ParticleConfig, width: u32, height: u32, rng: R) -> Self {
        let mut store = Self::empty(config, width, height, rng);
        store.populate(false);
        store
    }

    /// Adopt explicit records; `rng` is used for later respawns.
    pub fn from_records(
        config: ParticleConfig,
        width: u32,
        height: u32,
        particles: Vec<ParticleRecord>,
        rng: R,
    ) -> Self {
        Self {
            particles,
            config,
            width,
            height,
            rng,
        }
    }

    fn empty(config: ParticleConfig, width: u32, height: u32, rng: R) -> Self {
        Self::from_records(config, width, height, Vec::new(), rng)
    }

    fn populate(&mut self, stagger: bool) {
        let (w, h) = (self.width as f32, self.height as f32);
        self.particles.clear();
        for _ in 0..self.config.count {
            let mut p = ParticleRecord::spawn(&mut self.rng, &self.config, w, h);
            if stagger {
                p.age = (self.rng.random::<f32>() * p.max_lifetime) as u32;
                if p.age as f32 >= p.max_lifetime {
                    p.age = 0;
                }
                p.opacity = lifecycle_opacity(p.age, p.max_lifetime, &self.config);
            }
            self.particles.push(p);
        }
    }

    /// Adopt new canvas bounds and reseed the whole population.
    pub fn resize(&mut self, width: u32, height: u32) {
        debug!("Particle field resized to {}x{}", width, height);
        self.width = width;
        self.height = height;
        self.populate(true);
    }

    pub fn records(&self) -> &[ParticleRecord] {
        &self.particles
    }

    pub fn config(&self) -> &ParticleConfig {
        &self.config
    }

    pub fn bounds(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn len(&self) -> usize {
        self.particles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.particles.is_empty()
    }

    /// Advance one tick; see [`step`].
    pub fn step(&mut self) {
        step(self);
    }
}

/// Advance every particle by one tick.
///
/// Per slot: move, age, recompute opacity, then either respawn in place (age
/// reached lifetime) or reflect off any crossed edge.
pub fn step<R: Rng>(store: &mut ParticleStore<R>) {
    let ParticleStore {
        particles,
        config,
        width,
        height,
        rng,
    } = store;
    let (w, h) = (*width as f32, *height as f32);

    for p in particles.iter_mut() {
        p.x += p.vx;
        p.y += p.vy;
        p.age += 1;

        if p.age as f32 >= p.max_lifetime {
            *p = ParticleRecord::spawn(rng, config, w, h);
            continue;
        }
        p.opacity = lifecycle_opacity(p.age, p.max_lifetime, config);

        if p.x < 0.0 || p.x > w {
            p.vx = -p.vx;
        }
        if p.y < 0.0 || p.y > h {
            p.vy = -p.vy;
        }
    }
}
