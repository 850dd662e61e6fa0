//! # Configuration Management
//!
//! This module handles loading and parsing configuration from the
//! moon-clock.toml file. It provides a centralized way to configure the phase
//! clock reference, disc rendering and the particle field.
//!
//! Every table and field is optional: anything missing takes its default, and
//! an unreadable or invalid file falls back to the full default configuration.

use crate::lunar::{reference_full_moon, REFERENCE_AGE_DAYS};
use crate::sampler::SurfaceKind;
use chrono::{DateTime, Utc};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Default configuration file name, resolved against the working directory.
pub const CONFIG_FILE: &str = "moon-clock.toml";

/// Largest render buffer edge, after supersampling.
pub const MAX_RENDER_SIZE: u32 = 8192;

/// Largest particle canvas edge.
pub const MAX_CANVAS_SIZE: u32 = 16384;

/// A configuration value outside the range the renderers can work with.
#[derive(Debug, Error, PartialEq)]
#[error("invalid {field}: {reason}")]
pub struct ConfigError {
    pub field: &'static str,
    pub reason: String,
}

fn invalid(field: &'static str, reason: impl Into<String>) -> ConfigError {
    ConfigError {
        field,
        reason: reason.into(),
    }
}

/// `value` must be finite and within `[lo, hi]`.
fn check_range(field: &'static str, value: f32, lo: f32, hi: f32) -> Result<(), ConfigError> {
    if value.is_finite() && (lo..=hi).contains(&value) {
        Ok(())
    } else {
        Err(invalid(field, format!("{value} is not within [{lo}, {hi}]")))
    }
}

/// Application configuration loaded from moon-clock.toml
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    /// Phase clock timing and lunar reference
    pub clock: ClockConfig,
    /// Moon disc rendering
    pub disc: DiscConfig,
    /// Ambient particle field
    pub particles: ParticleConfig,
}

/// Phase clock configuration
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ClockConfig {
    /// Interval between disc re-renders in milliseconds
    pub tick_interval_ms: u64,
    /// A known exact full-moon instant (RFC 3339)
    pub reference_full_moon: DateTime<Utc>,
    /// Moon age in days at `reference_full_moon`
    pub reference_age_days: f64,
}

impl Default for ClockConfig {
    fn default() -> Self {
        ClockConfig {
            tick_interval_ms: 1000,
            reference_full_moon: reference_full_moon(),
            reference_age_days: REFERENCE_AGE_DAYS,
        }
    }
}

/// Moon disc configuration
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct DiscConfig {
    /// Displayed canvas edge length in pixels
    pub display_size: u32,
    /// Gap between the disc and the canvas edge in display pixels
    pub margin: u32,
    /// Render resolution multiplier; the disc is shaded at
    /// `display_size * supersample` and can be box-filtered back down
    pub supersample: u32,
    /// Surface strategy
    pub surface: SurfaceKind,
    /// Moon texture for the `texture` surface
    pub texture_path: PathBuf,
}

impl Default for DiscConfig {
    fn default() -> Self {
        DiscConfig {
            display_size: 200,
            margin: 15,
            supersample: 3,
            surface: SurfaceKind::Texture,
            texture_path: PathBuf::from("images/moon-texture.jpg"),
        }
    }
}

impl DiscConfig {
    /// Edge length of the render buffer.
    pub fn render_size(&self) -> u32 {
        self.display_size.saturating_mul(self.supersample.max(1))
    }

    /// Disc radius in render pixels.
    pub fn render_radius(&self) -> f32 {
        let display_radius = self.display_size as f32 / 2.0 - self.margin as f32;
        display_radius.max(0.0) * self.supersample.max(1) as f32
    }
}

/// Particle field configuration
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ParticleConfig {
    /// Fixed population size
    pub count: usize,
    /// Pairs closer than this (pixels) are linked
    pub connection_distance: f32,
    /// Link opacity at zero distance, before the min-opacity factor
    pub connection_opacity: f32,
    /// Link stroke width in pixels
    pub line_width: f32,
    /// Ticks to fade in from transparent
    pub fade_in_ticks: u32,
    /// Ticks to fade out before respawn
    pub fade_out_ticks: u32,
    /// Plateau opacity
    pub max_opacity: f32,
    /// Each velocity component is drawn from `±max_speed / 2` pixels per tick
    pub max_speed: f32,
    pub min_radius: f32,
    pub max_radius: f32,
    /// Lifetime range in ticks
    pub min_lifetime: f32,
    pub max_lifetime: f32,
    /// Frame driver interval in milliseconds
    pub frame_interval_ms: u64,
    /// Canvas size in pixels
    pub width: u32,
    pub height: u32,
    /// Fixed RNG seed for reproducible trajectories
    pub seed: Option<u64>,
}

impl Default for ParticleConfig {
    fn default() -> Self {
        ParticleConfig {
            count: 40,
            connection_distance: 120.0,
            connection_opacity: 0.3,
            line_width: 0.5,
            fade_in_ticks: 60,
            fade_out_ticks: 60,
            max_opacity: 0.6,
            max_speed: 0.6,
            min_radius: 1.0,
            max_radius: 3.0,
            min_lifetime: 200.0,
            max_lifetime: 500.0,
            frame_interval_ms: 16,
            width: 800,
            height: 600,
            seed: None,
        }
    }
}

impl ClockConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.reference_age_days.is_finite() {
            return Err(invalid("clock.reference_age_days", "must be a finite number"));
        }
        Ok(())
    }
}

impl DiscConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        match self.display_size.checked_mul(self.supersample.max(1)) {
            Some(size) if size <= MAX_RENDER_SIZE => Ok(()),
            _ => Err(invalid(
                "disc.display_size * disc.supersample",
                format!("exceeds {MAX_RENDER_SIZE} pixels"),
            )),
        }
    }
}

impl ParticleConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_range("particles.max_opacity", self.max_opacity, 0.0, 1.0)?;
        check_range("particles.connection_opacity", self.connection_opacity, 0.0, 1.0)?;
        check_range("particles.connection_distance", self.connection_distance, 0.0, f32::MAX)?;
        check_range("particles.line_width", self.line_width, 0.0, f32::MAX)?;
        check_range("particles.max_speed", self.max_speed, 0.0, f32::MAX)?;
        check_range("particles.min_radius", self.min_radius, 0.0, f32::MAX)?;
        check_range("particles.max_radius", self.max_radius, self.min_radius, f32::MAX)?;
        check_range("particles.min_lifetime", self.min_lifetime, 1.0, f32::MAX)?;
        check_range("particles.max_lifetime", self.max_lifetime, self.min_lifetime, f32::MAX)?;
        if self.width > MAX_CANVAS_SIZE || self.height > MAX_CANVAS_SIZE {
            return Err(invalid(
                "particles.width/height",
                format!("exceeds {MAX_CANVAS_SIZE} pixels"),
            ));
        }
        Ok(())
    }
}

impl Config {
    /// Check every table; the first offending field is reported.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.clock.validate()?;
        self.disc.validate()?;
        self.particles.validate()
    }

    /// Load configuration from moon-clock.toml
    /// Falls back to default configuration if file doesn't exist or is invalid
    pub fn load() -> Self {
        Self::load_from_path(CONFIG_FILE)
    }

    /// Load configuration from specified path
    /// Falls back to default configuration if file doesn't exist, doesn't
    /// parse, or holds out-of-range values
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref();
        match fs::read_to_string(path) {
            Ok(contents) => match toml::from_str::<Config>(&contents) {
                Ok(config) => match config.validate() {
                    Ok(()) => {
                        info!("Loaded configuration from {}", path.display());
                        config
                    }
                    Err(e) => {
                        warn!("Rejected config file {}: {}", path.display(), e);
                        warn!("Using default configuration");
                        Self::default()
                    }
                },
                Err(e) => {
                    warn!("Invalid config file format: {}", e);
                    warn!("Using default configuration");
                    Self::default()
                }
            },
            Err(_) => {
                info!("No config file at {}, using default configuration", path.display());
                Self::default()
            }
        }
    }

    /// Save current configuration to `path`
    pub fn save<P: AsRef<Path>>(&self, path: P) -> anyhow::Result<()> {
        let contents = toml::to_string_pretty(self)?;
        fs::write(path.as_ref(), contents)?;
        info!("Configuration saved to {}", path.as_ref().display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.clock.tick_interval_ms, 1000);
        assert_eq!(config.clock.reference_age_days, 14.77);
        assert_eq!(config.disc.surface, SurfaceKind::Texture);
        assert_eq!(config.particles.count, 40);
        assert_eq!(config.particles.connection_distance, 120.0);
        assert_eq!(config.particles.max_opacity, 0.6);
    }

    #[test]
    fn test_render_geometry() {
        let mut disc = DiscConfig::default();
        assert_eq!(disc.render_size(), 600);
        assert_eq!(disc.render_radius(), 255.0);

        disc.supersample = 1;
        assert_eq!(disc.render_size(), 200);
        assert_eq!(disc.render_radius(), 85.0);

        disc.margin = 500;
        assert_eq!(disc.render_radius(), 0.0);
    }

    #[test]
    fn test_config_roundtrip() {
        let config = Config::default();
        let toml_str = toml::to_string(&config).unwrap();
        let parsed: Config = toml::from_str(&toml_str).unwrap();
        assert_eq!(config, parsed);
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
[disc]
surface = "procedural"
supersample = 1

[particles]
count = 12
seed = 7
"#
        )
        .unwrap();

        let config = Config::load_from_path(file.path());
        assert_eq!(config.disc.surface, SurfaceKind::Procedural);
        assert_eq!(config.disc.supersample, 1);
        assert_eq!(config.disc.display_size, 200);
        assert_eq!(config.particles.count, 12);
        assert_eq!(config.particles.seed, Some(7));
        assert_eq!(config.particles.fade_in_ticks, 60);
        assert_eq!(config.clock, ClockConfig::default());
    }

    #[test]
    fn test_reference_instant_parses_rfc3339() {
        let config: Config = toml::from_str(
            r#"
[clock]
reference_full_moon = "2026-02-01T22:09:00Z"
reference_age_days = 14.8
"#,
        )
        .unwrap();
        assert_eq!(config.clock.reference_full_moon.to_rfc3339(), "2026-02-01T22:09:00+00:00");
        assert_eq!(config.clock.tick_interval_ms, 1000);
    }

    #[test]
    fn test_invalid_file_falls_back() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "particles = [not toml").unwrap();
        assert_eq!(Config::load_from_path(file.path()), Config::default());
    }

    #[test]
    fn test_default_config_is_valid() {
        assert_eq!(Config::default().validate(), Ok(()));
    }

    #[test]
    fn test_negative_max_opacity_falls_back() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[particles]\nmax_opacity = -0.5\ncount = 5").unwrap();

        let config = Config::load_from_path(file.path());
        assert_eq!(config, Config::default());

        // The fallback drives the particle field without trouble
        let mut store = crate::particles::ParticleStore::seeded(config.particles, 100, 100, 1);
        store.step();
        assert!(store.records().iter().all(|p| (0.0..=0.6).contains(&p.opacity)));
    }

    #[test]
    fn test_out_of_range_particle_values_are_rejected() {
        let cases: [(&str, fn(&mut ParticleConfig)); 5] = [
            ("particles.max_opacity", |p| p.max_opacity = f32::NAN),
            ("particles.max_opacity", |p| p.max_opacity = 1.5),
            ("particles.connection_opacity", |p| p.connection_opacity = -0.1),
            ("particles.max_radius", |p| p.max_radius = 0.5),
            ("particles.max_lifetime", |p| p.max_lifetime = 100.0),
        ];
        for (field, tweak) in cases {
            let mut particles = ParticleConfig::default();
            tweak(&mut particles);
            assert_eq!(particles.validate().unwrap_err().field, field);
        }
    }

    #[test]
    fn test_oversized_render_is_rejected() {
        let disc = DiscConfig {
            display_size: u32::MAX,
            supersample: 3,
            ..DiscConfig::default()
        };
        assert_eq!(disc.render_size(), u32::MAX);
        assert!(disc.validate().is_err());

        let disc = DiscConfig {
            display_size: 4000,
            supersample: 3,
            ..DiscConfig::default()
        };
        assert!(disc.validate().is_err());
    }

    #[test]
    fn test_oversized_display_falls_back() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[disc]\ndisplay_size = 4000000000\nsupersample = 3").unwrap();
        assert_eq!(Config::load_from_path(file.path()).disc, DiscConfig::default());
    }

    #[test]
    fn test_load_nonexistent_file() {
        let config = Config::load_from_path("/nonexistent/path");
        // Should fallback to default
        assert_eq!(config.particles.count, 40);
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        let mut config = Config::default();
        config.particles.seed = Some(99);
        config.save(&path).unwrap();
        assert_eq!(Config::load_from_path(&path), config);
    }
}
