//! # Moon Surface Sampling
//!
//! A sampler answers one question: what color is the moon's surface at a point
//! of the visible hemisphere? Points are addressed by orthographic sphere
//! coordinates `(nx, ny)` in [-1, 1], the same coordinates the shader derives
//! from pixel offsets. Samplers never see the light direction; all shading is
//! applied afterwards by [`crate::shader::SurfaceShader`].
//!
//! ## Strategies
//!
//! ### Photo texture ([`TextureSampler`])
//! - Backed by a [`MoonTexture`] decoded once at startup and owned by the
//!   sampler for the renderer's lifetime
//! - The `(nx, ny)` → texel mapping is a deliberate shortcut: the sphere
//!   coordinates are treated as planar UVs over the central half of an
//!   equirectangular map. It is not a true orthographic unprojection, and the
//!   silhouette look depends on it, so it should stay as is.
//! - Without a texture (missing file, decode failure) every sample is a fixed
//!   neutral gray. Rendering never fails because of the texture.
//!
//! ### Procedural relief ([`ProceduralReliefSampler`])
//! - A fixed table of maria and craters, each darkening a circular patch
//! - Output blends between a night-side and a lit-side gray, so this variant
//!   already carries part of the day/night contrast and is paired with its own
//!   [`crate::shader::ShadingProfile`]. The two strategies are not numerically
//!   interchangeable.

use crate::Rgb;
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::{io, path::Path};
use thiserror::Error;

/// Color lookup on the visible hemisphere.
pub trait SurfaceSampler {
    /// Base color at sphere coordinates `(nx, ny)`, both in [-1, 1].
    fn sample(&self, nx: f32, ny: f32) -> Rgb;
}

/// Which sampler a renderer is built with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SurfaceKind {
    #[default]
    Texture,
    Procedural,
}

/// Errors while loading the moon texture.
///
/// These never escape the renderer: [`TextureSampler::load_or_fallback`] logs
/// them and switches to the neutral fallback color.
#[derive(Error, Debug)]
pub enum TextureError {
    /// Texture file could not be read
    #[error("texture IO: {0}")]
    Io(#[from] io::Error),

    /// Bytes are not a decodable image
    #[error("texture decode: {0}")]
    Decode(#[from] image::ImageError),

    /// Image has a zero dimension
    #[error("texture is empty")]
    Empty,

    /// Pixel data does not match the stated dimensions
    #[error("texture data has {actual} bytes, expected {expected}")]
    Malformed { expected: usize, actual: usize },

    /// Background decode task died
    #[error("texture decode task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// A decoded RGB moon map.
#[derive(Debug, Clone)]
pub struct MoonTexture {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
}

impl MoonTexture {
    /// Wrap tightly packed RGB bytes.
    pub fn from_rgb(width: u32, height: u32, pixels: Vec<u8>) -> Result<Self, TextureError> {
        if width == 0 || height == 0 {
            return Err(TextureError::Empty);
        }
        let expected = width as usize * height as usize * 3;
        if pixels.len() != expected {
            return Err(TextureError::Malformed {
                expected,
                actual: pixels.len(),
            });
        }
        Ok(Self {
            width,
            height,
            pixels,
        })
    }

    /// Decode any supported image format (JPEG, PNG).
    pub fn decode(bytes: &[u8]) -> Result<Self, TextureError> {
        let rgb = image::load_from_memory(bytes)?.to_rgb8();
        let (width, height) = rgb.dimensions();
        Self::from_rgb(width, height, rgb.into_raw())
    }

    /// Read and decode a texture file. Decoding runs on the blocking pool.
    pub async fn load<P: AsRef<Path>>(path: P) -> Result<Self, TextureError> {
        let bytes = tokio::fs::read(path).await?;
        tokio::task::spawn_blocking(move || Self::decode(&bytes)).await?
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn texel(&self, x: u32, y: u32) -> Rgb {
        let i = (y as usize * self.width as usize + x as usize) * 3;
        Rgb::new(self.pixels[i], self.pixels[i + 1], self.pixels[i + 2])
    }
}

/// Neutral gray used when no texture is available.
pub const FALLBACK_COLOR: Rgb = Rgb::new(180, 178, 165);

/// Image-backed sampler with a gray fallback.
#[derive(Debug, Clone, Default)]
pub struct TextureSampler {
    texture: Option<MoonTexture>,
}

impl TextureSampler {
    pub fn new(texture: MoonTexture) -> Self {
        Self {
            texture: Some(texture),
        }
    }

    /// A sampler that always returns [`FALLBACK_COLOR`].
    pub fn fallback() -> Self {
        Self { texture: None }
    }

    /// Load the texture at `path`, degrading to the fallback on any failure.
    pub async fn load_or_fallback<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref();
        match MoonTexture::load(path).await {
            Ok(texture) => {
                let (w, h) = texture.dimensions();
                info!("Moon texture loaded from {}: {}x{}", path.display(), w, h);
                Self::new(texture)
            }
            Err(e) => {
                warn!("Failed to load moon texture {}: {}", path.display(), e);
                warn!("Using flat fallback surface color");
                Self::fallback()
            }
        }
    }

    pub fn has_texture(&self) -> bool {
        self.texture.is_some()
    }

    /// Texel addressed by sphere coordinates, or `None` without a texture.
    ///
    /// `(nx, ny)` become UVs in [0, 1]; `u` spans the central half of the map
    /// horizontally, `v` the full height. Both wrap. This is a cheap remap
    /// that looks right on the disc, not a true orthographic unprojection of
    /// an equirectangular map.
    pub fn texel_index(&self, nx: f32, ny: f32) -> Option<(u32, u32)> {
        let texture = self.texture.as_ref()?;
        let (w, h) = (texture.width as f32, texture.height as f32);
        let u = (nx + 1.0) / 2.0;
        let v = (ny + 1.0) / 2.0;

        let x = ((u * w * 0.5 + w * 0.25).floor() as i64).rem_euclid(texture.width as i64);
        let y = ((v * h).floor() as i64).rem_euclid(texture.height as i64);
        Some((x as u32, y as u32))
    }
}

impl SurfaceSampler for TextureSampler {
    fn sample(&self, nx: f32, ny: f32) -> Rgb {
        match (&self.texture, self.texel_index(nx, ny)) {
            (Some(texture), Some((x, y))) => texture.texel(x, y),
            _ => FALLBACK_COLOR,
        }
    }
}

/// Relief feature category.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReliefKind {
    /// Broad basaltic plain: soft quadratic falloff
    Mare,
    /// Impact crater: linear falloff from a dark floor
    Crater,
}

/// One circular darkening patch in disc-normalized coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReliefFeature {
    pub cx: f32,
    pub cy: f32,
    pub radius: f32,
    pub depth: f32,
    pub kind: ReliefKind,
}

impl ReliefFeature {
    const fn mare(cx: f32, cy: f32, radius: f32, depth: f32) -> Self {
        Self {
            cx,
            cy,
            radius,
            depth,
            kind: ReliefKind::Mare,
        }
    }

    const fn crater(cx: f32, cy: f32, radius: f32, depth: f32) -> Self {
        Self {
            cx,
            cy,
            radius,
            depth,
            kind: ReliefKind::Crater,
        }
    }

    /// Darkening contributed at `(nx, ny)`; zero outside the radius.
    pub fn darkening(&self, nx: f32, ny: f32) -> f32 {
        let d = (nx - self.cx).hypot(ny - self.cy);
        if d > self.radius {
            return 0.0;
        }
        let r = d / self.radius;
        match self.kind {
            ReliefKind::Mare => self.depth * (1.0 - r * r),
            ReliefKind::Crater => self.depth * (1.0 - r),
        }
    }
}

/// Near-side maria and a few prominent craters, +y pointing down the disc.
pub const LUNAR_FEATURES: [ReliefFeature; 14] = [
    ReliefFeature::mare(-0.62, -0.05, 0.36, 0.30), // Oceanus Procellarum
    ReliefFeature::mare(-0.32, -0.42, 0.28, 0.34), // Imbrium
    ReliefFeature::mare(0.02, -0.74, 0.24, 0.22),  // Frigoris
    ReliefFeature::mare(0.16, -0.38, 0.17, 0.32),  // Serenitatis
    ReliefFeature::mare(0.32, -0.08, 0.21, 0.30),  // Tranquillitatis
    ReliefFeature::mare(0.66, -0.30, 0.12, 0.34),  // Crisium
    ReliefFeature::mare(0.56, 0.14, 0.15, 0.26),   // Fecunditatis
    ReliefFeature::mare(0.30, 0.28, 0.13, 0.24),   // Nectaris
    ReliefFeature::mare(-0.20, 0.34, 0.18, 0.24),  // Nubium
    ReliefFeature::mare(-0.44, 0.30, 0.15, 0.22),  // Humorum
    ReliefFeature::crater(-0.12, 0.70, 0.06, 0.16),  // Tycho
    ReliefFeature::crater(-0.35, -0.12, 0.07, 0.18), // Copernicus
    ReliefFeature::crater(-0.60, -0.10, 0.04, 0.12), // Kepler
    ReliefFeature::crater(-0.08, -0.76, 0.05, 0.20), // Plato
];

/// Upper bound on summed darkening.
pub const MAX_DARKENING: f32 = 0.55;

/// Surface gray with no light reaching it.
pub const NIGHT_SURFACE: Rgb = Rgb::new(62, 64, 72);

/// Surface gray of bright highlands.
pub const LIT_SURFACE: Rgb = Rgb::new(226, 222, 212);

/// Analytic crater/mare field.
#[derive(Debug, Clone)]
pub struct ProceduralReliefSampler {
    features: Vec<ReliefFeature>,
    max_darkening: f32,
}

impl Default for ProceduralReliefSampler {
    fn default() -> Self {
        Self::new(LUNAR_FEATURES.to_vec(), MAX_DARKENING)
    }
}

impl ProceduralReliefSampler {
    pub fn new(features: Vec<ReliefFeature>, max_darkening: f32) -> Self {
        Self {
            features,
            max_darkening,
        }
    }

    pub fn features(&self) -> &[ReliefFeature] {
        &self.features
    }

    /// Total capped darkening at `(nx, ny)`.
    pub fn darkening(&self, nx: f32, ny: f32) -> f32 {
        self.features
            .iter()
            .map(|f| f.darkening(nx, ny))
            .sum::<f32>()
            .min(self.max_darkening)
    }
}

impl SurfaceSampler for ProceduralReliefSampler {
    fn sample(&self, nx: f32, ny: f32) -> Rgb {
        NIGHT_SURFACE.lerp(LIT_SURFACE, 1.0 - self.darkening(nx, ny))
    }
}

/// The sampler strategy chosen at construction.
#[derive(Debug, Clone)]
pub enum Sampler {
    Texture(TextureSampler),
    Procedural(ProceduralReliefSampler),
}

impl Sampler {
    pub fn kind(&self) -> SurfaceKind {
        match self {
            Sampler::Texture(_) => SurfaceKind::Texture,
            Sampler::Procedural(_) => SurfaceKind::Procedural,
        }
    }
}

impl SurfaceSampler for Sampler {
    fn sample(&self, nx: f32, ny: f32) -> Rgb {
        match self {
            Sampler::Texture(s) => s.sample(nx, ny),
            Sampler::Procedural(s) => s.sample(nx, ny),
        }
    }
}

impl From<TextureSampler> for Sampler {
    fn from(s: TextureSampler) -> Self {
        Sampler::Texture(s)
    }
}

impl From<ProceduralReliefSampler> for Sampler {
    fn from(s: ProceduralReliefSampler) -> Self {
        Sampler::Procedural(s)
    }
}
