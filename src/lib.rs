//! # Moon Clock Core Library
//!
//! This library renders a time-driven, shaded moon disc and a soft ambient
//! particle field into RGBA pixel buffers. It is the engine behind a decorative
//! "moon-phase clock": callers hand it a wall-clock instant and canvas
//! dimensions, and get back pixels plus a handful of textual readouts.
//!
//! ## Pipelines
//!
//! Two independent pipelines share no state:
//!
//! ### Phase clock (≈1 Hz)
//! 1. [`lunar::AgeCalculator`] turns an instant into a [`lunar::MoonAge`]
//! 2. [`lunar::phase_bucket`] names the phase
//! 3. [`shader::SurfaceShader`] shades every disc pixel under a light that
//!    sweeps once per synodic month, pulling base colors from a
//!    [`sampler::Sampler`] (photo texture or procedural relief)
//!
//! ### Particle field (per display frame)
//! 1. [`particles::step`] advances position, age and fade curve of every slot
//! 2. [`field_renderer::draw_field`] draws proximity links and particle discs
//!
//! [`driver`] wires both onto independent timers with injectable clocks.
//!
//! ## Core Types
//! - [`Rgb`]: an 8-bit color triple shared by samplers and surfaces
//! - [`Readouts`]: the textual outputs refreshed on every clock tick

use serde::{Deserialize, Serialize};

pub mod canvas;
pub mod config;
pub mod driver;
pub mod field_renderer;
pub mod lunar;
pub mod particles;
pub mod readout;
pub mod renderer;
pub mod sampler;
pub mod shader;

#[cfg(test)]
mod tests;

/// An 8-bit RGB color.
///
/// # Example
/// ```
/// use moon_clock_lib::Rgb;
///
/// let warm_white = Rgb::new(255, 252, 240);
/// assert!(warm_white.luminance() > 250.0);
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const WHITE: Rgb = Rgb::new(255, 255, 255);

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Relative luminance (Rec. 709 weights) on the 0–255 scale.
    pub fn luminance(self) -> f32 {
        0.2126 * self.r as f32 + 0.7152 * self.g as f32 + 0.0722 * self.b as f32
    }

    /// Linear interpolation toward `other`; `t` is clamped to [0, 1].
    pub fn lerp(self, other: Rgb, t: f32) -> Rgb {
        let t = t.clamp(0.0, 1.0);
        let mix = |a: u8, b: u8| (a as f32 + (b as f32 - a as f32) * t).round() as u8;
        Rgb::new(mix(self.r, other.r), mix(self.g, other.g), mix(self.b, other.b))
    }
}

/// Textual outputs of one phase-clock tick.
///
/// ```
/// use moon_clock_lib::Readouts;
///
/// let readouts = Readouts {
///     time: "21:04:09".into(),
///     date: "Thu · 15 Oct 2026".into(),
///     phase: "Waxing Gibbous".into(),
///     age: "Moon Age: 11.3".into(),
/// };
/// assert!(readouts.age.starts_with("Moon Age"));
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Readouts {
    /// Zero-padded 24-hour `HH:MM:SS`
    pub time: String,
    /// `Dow · D Mon YYYY`
    pub date: String,
    /// Human-readable phase bucket label
    pub phase: String,
    /// `Moon Age: NN.N`
    pub age: String,
}
