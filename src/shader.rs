//! Per-pixel moon shading.
//!
//! Every disc pixel is lifted onto the unit sphere and lit by a directional
//! light that orbits once per synodic month ([`LightDirection`]). The raw
//! Lambert term goes through a soft terminator, is floored by an ambient
//! earthshine term and attenuated toward the limb, then multiplies the
//! sampler's base color.
//!
//! Cost is O(size²). Fine for a few hundred pixels per axis at 1 Hz, far too
//! slow for per-frame use.

use crate::canvas::{GradientStop, PixelBuffer, Surface};
use crate::lunar::{LightDirection, MoonAge};
use crate::sampler::{Sampler, SurfaceKind, SurfaceSampler};
use crate::Rgb;

/// One decorative halo ring around the disc.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GlowLayer {
    /// Outer edge of the halo as a multiple of the disc radius
    pub radius_multiplier: f32,
    /// Opacity at the disc edge
    pub opacity: f32,
}

/// Halo rings, widest and faintest first.
pub const GLOW_LAYERS: [GlowLayer; 3] = [
    GlowLayer {
        radius_multiplier: 1.25,
        opacity: 0.03,
    },
    GlowLayer {
        radius_multiplier: 1.15,
        opacity: 0.05,
    },
    GlowLayer {
        radius_multiplier: 1.08,
        opacity: 0.08,
    },
];

/// Halos start slightly inside the silhouette so there is no seam.
const GLOW_INNER_FRACTION: f32 = 0.95;

impl GlowLayer {
    fn stops(&self) -> [GradientStop; 3] {
        [
            GradientStop::new(0.0, Rgb::new(255, 252, 240), self.opacity),
            GradientStop::new(0.5, Rgb::new(255, 250, 230), self.opacity * 0.5),
            GradientStop::new(1.0, Rgb::new(255, 248, 220), 0.0),
        ]
    }
}

/// Brightness falloff toward the silhouette.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LimbDarkening {
    /// `base + gain * nz`
    Depth { base: f32, gain: f32 },
    /// `1 - strength * (dist / radius)²`
    Radial { strength: f32 },
}

impl LimbDarkening {
    pub fn factor(&self, nz: f32, radial: f32) -> f32 {
        match *self {
            LimbDarkening::Depth { base, gain } => base + gain * nz,
            LimbDarkening::Radial { strength } => 1.0 - strength * radial * radial,
        }
    }
}

/// Tuning constants for one surface strategy.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShadingProfile {
    /// Half-width of the terminator ramp in dot-product units
    pub terminator_width: f32,
    /// Fraction of full brightness left on the night side
    pub ambient: f32,
    pub limb: LimbDarkening,
    /// Red attenuation at full shadow
    pub shadow_red: f32,
    /// Blue boost at full shadow
    pub shadow_blue: f32,
}

impl ShadingProfile {
    /// Constants tuned for the photo texture.
    pub const fn textured() -> Self {
        Self {
            terminator_width: 0.12,
            ambient: 0.08,
            limb: LimbDarkening::Depth {
                base: 0.85,
                gain: 0.15,
            },
            shadow_red: 0.05,
            shadow_blue: 0.1,
        }
    }

    /// Constants tuned for the procedural relief, whose samples already span
    /// night and lit grays.
    pub const fn procedural() -> Self {
        Self {
            terminator_width: 0.1,
            ambient: 0.05,
            limb: LimbDarkening::Radial { strength: 0.25 },
            shadow_red: 0.08,
            shadow_blue: 0.06,
        }
    }

    pub const fn for_kind(kind: SurfaceKind) -> Self {
        match kind {
            SurfaceKind::Texture => Self::textured(),
            SurfaceKind::Procedural => Self::procedural(),
        }
    }
}

/// Linear ramp across `[-width, width]`, clamped, then smoothstepped.
pub fn terminator_ramp(dot: f32, width: f32) -> f32 {
    let t = ((dot + width) / (2.0 * width)).clamp(0.0, 1.0);
    t * t * (3.0 - 2.0 * t)
}

/// Shades moon discs with a fixed sampler strategy.
#[derive(Debug, Clone)]
pub struct SurfaceShader {
    sampler: Sampler,
    profile: ShadingProfile,
    glow: Vec<GlowLayer>,
}

impl SurfaceShader {
    /// Pair the sampler with its matching profile and the default halo.
    pub fn new(sampler: Sampler) -> Self {
        let profile = ShadingProfile::for_kind(sampler.kind());
        Self::with_profile(sampler, profile)
    }

    pub fn with_profile(sampler: Sampler, profile: ShadingProfile) -> Self {
        Self {
            sampler,
            profile,
            glow: GLOW_LAYERS.to_vec(),
        }
    }

    pub fn sampler(&self) -> &Sampler {
        &self.sampler
    }

    pub fn profile(&self) -> &ShadingProfile {
        &self.profile
    }

    /// Color of one point of the visible hemisphere.
    ///
    /// `(nx, ny)` must lie within the unit disc; `nz` is recovered here and
    /// clamped so silhouette rounding never takes the root of a negative.
    pub fn shade(&self, nx: f32, ny: f32, light: &LightDirection) -> Rgb {
        let p = &self.profile;
        let nz = (1.0 - nx * nx - ny * ny).max(0.0).sqrt();

        let light_factor = terminator_ramp(light.dot(nx, ny, nz), p.terminator_width);
        let limb = p.limb.factor(nz, nx.hypot(ny));
        let brightness = (p.ambient + (1.0 - p.ambient) * light_factor) * limb;

        // Earthshine reads slightly blue
        let shadow = 1.0 - light_factor;
        let base = self.sampler.sample(nx, ny);
        let channel = |v: f32| v.floor().clamp(0.0, 255.0) as u8;
        Rgb::new(
            channel(base.r as f32 * brightness * (1.0 - shadow * p.shadow_red)),
            channel(base.g as f32 * brightness),
            channel(base.b as f32 * brightness * (1.0 + shadow * p.shadow_blue)),
        )
    }

    /// Render the disc into a fresh `size`×`size` buffer.
    ///
    /// Pixels farther than `radius` from the center stay fully transparent;
    /// all others are opaque. A zero size or non-positive radius yields an
    /// empty buffer.
    pub fn render(&self, size: u32, radius: f32, age: MoonAge) -> PixelBuffer {
        let mut buffer = PixelBuffer::new(size, size);
        if size == 0 || radius <= 0.0 {
            return buffer;
        }

        let center = size as f32 / 2.0;
        let light = LightDirection::from_age(age);

        for y in 0..size {
            let dy = y as f32 - center;
            for x in 0..size {
                let dx = x as f32 - center;
                if (dx * dx + dy * dy).sqrt() > radius {
                    continue;
                }
                let c = self.shade(dx / radius, dy / radius, &light);
                buffer.set_pixel(x, y, [c.r, c.g, c.b, 255]);
            }
        }
        buffer
    }

    /// Paint the halo rings around a disc centered at `center`.
    pub fn draw_glow<S: Surface>(&self, surface: &mut S, center: (f32, f32), radius: f32) {
        for layer in &self.glow {
            surface.fill_radial_gradient(
                center,
                radius * GLOW_INNER_FRACTION,
                radius * layer.radius_multiplier,
                &layer.stops(),
            );
        }
    }

    /// Clear `surface`, paint the halo, then composite the shaded disc on top.
    ///
    /// The disc is centered in the largest square that fits the surface.
    pub fn draw<S: Surface>(&self, surface: &mut S, radius: f32, age: MoonAge) {
        let (width, height) = surface.dimensions();
        surface.clear();

        let size = width.min(height);
        if size == 0 || radius <= 0.0 {
            return;
        }
        let origin = (((width - size) / 2) as i32, ((height - size) / 2) as i32);
        let half = size as f32 / 2.0;

        self.draw_glow(surface, (origin.0 as f32 + half, origin.1 as f32 + half), radius);
        let disc = self.render(size, radius, age);
        surface.draw_buffer(&disc, origin);
    }
}
