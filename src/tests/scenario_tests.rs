//! # End-to-End Scenarios
//!
//! These tests drive whole pipelines (lunar math through shading, store
//! through field drawing, config through the phase clock) and check the
//! observable results rather than individual functions.

use crate::canvas::PixelBuffer;
use crate::config::{Config, DiscConfig, ParticleConfig};
use crate::driver::{load_shader, ManualClock, ParticleField, PhaseClock};
use crate::lunar::{reference_full_moon, AgeCalculator, MoonAge, PhaseBucket, SYNODIC_MONTH};
use crate::particles::ParticleStore;
use crate::sampler::{ProceduralReliefSampler, Sampler, SurfaceKind, TextureSampler};
use crate::shader::SurfaceShader;
use crate::Rgb;
use chrono::TimeDelta;
use std::io::Write;

const SIZE: u32 = 200;
const RADIUS: f32 = 85.0;

/// Mean luminance over the opaque (disc) pixels.
fn mean_disc_luminance(buffer: &PixelBuffer) -> f32 {
    let (sum, count) = buffer
        .pixels()
        .filter(|px| px[3] == 255)
        .fold((0.0_f32, 0_u32), |(sum, count), px| {
            (sum + Rgb::new(px[0], px[1], px[2]).luminance(), count + 1)
        });
    assert!(count > 0, "disc rendered no pixels");
    sum / count as f32
}

/// Average luminance of the brightest tenth of the disc pixels.
fn brightest_luminance(buffer: &PixelBuffer) -> f32 {
    let mut lum: Vec<f32> = buffer
        .pixels()
        .filter(|px| px[3] == 255)
        .map(|px| Rgb::new(px[0], px[1], px[2]).luminance())
        .collect();
    assert!(!lum.is_empty(), "disc rendered no pixels");
    lum.sort_by(|a, b| b.total_cmp(a));
    let top = &lum[..(lum.len() / 10).max(1)];
    top.iter().sum::<f32>() / top.len() as f32
}

fn variants() -> [(&'static str, Sampler); 2] {
    [
        ("texture fallback", TextureSampler::fallback().into()),
        ("procedural", ProceduralReliefSampler::default().into()),
    ]
}

/// A new moon is almost entirely in shadow: even its brightest pixels stay dark.
#[test]
fn new_moon_disc_is_dark() {
    for (name, sampler) in variants() {
        let shader = SurfaceShader::new(sampler);
        let disc = shader.render(SIZE, RADIUS, MoonAge::from_days(0.0));
        let brightest = brightest_luminance(&disc);
        assert!(brightest < 40.0, "{name}: new moon brightest luminance {brightest}");
        let mean = mean_disc_luminance(&disc);
        assert!(mean < 40.0, "{name}: new moon mean luminance {mean}");
    }
}

/// A full moon is lit across the whole disc, brightest pixels and all.
#[test]
fn full_moon_disc_is_bright() {
    for (name, sampler) in variants() {
        let shader = SurfaceShader::new(sampler);
        let disc = shader.render(SIZE, RADIUS, MoonAge::from_days(SYNODIC_MONTH / 2.0));
        let brightest = brightest_luminance(&disc);
        assert!(brightest > 120.0, "{name}: full moon brightest luminance {brightest}");
        let mean = mean_disc_luminance(&disc);
        assert!(mean > 120.0, "{name}: full moon mean luminance {mean}");
        assert!(brightest >= mean);
    }
}

/// Brightness climbs from new to full and falls back again.
#[test]
fn brightness_tracks_the_lunation() {
    let shader = SurfaceShader::new(TextureSampler::fallback().into());
    let mean_at = |days: f64| mean_disc_luminance(&shader.render(64, 28.0, MoonAge::from_days(days)));

    let new = mean_at(0.0);
    let quarter = mean_at(SYNODIC_MONTH / 4.0);
    let full = mean_at(SYNODIC_MONTH / 2.0);
    let last = mean_at(SYNODIC_MONTH * 0.75);
    assert!(new < quarter && quarter < full, "{new} {quarter} {full}");
    assert!(last < full && (last - quarter).abs() < 10.0, "{quarter} {last}");
}

/// The calendar reference instant reports the reference age and a full moon.
#[test]
fn reference_instant_reads_as_full() {
    let age = AgeCalculator::default().age(reference_full_moon());
    assert!((age.days() - 14.77).abs() < 1e-9);
    assert_eq!(crate::lunar::phase_bucket(age), PhaseBucket::Full);
}

/// A freshly spawned field reaches the opacity plateau after the fade-in.
#[test]
fn fresh_field_fades_in_to_plateau() {
    let config = ParticleConfig::default();
    let mut store = ParticleStore::fresh(config.clone(), 800, 600, rand_pcg::Pcg32::new(17, 3));
    assert_eq!(store.len(), 40);
    assert!(store.records().iter().all(|p| p.opacity == 0.0));

    for _ in 0..config.fade_in_ticks {
        store.step();
    }
    for p in store.records() {
        assert_eq!(p.age, 60);
        assert_eq!(p.opacity, config.max_opacity);
    }
}

/// A whole field run keeps the population and draws something every frame.
#[test]
fn particle_field_keeps_drawing() {
    let config = ParticleConfig {
        count: 25,
        ..ParticleConfig::default()
    };
    let mut field = ParticleField::new(ParticleStore::seeded(config, 240, 160, 2024));
    for _ in 0..600 {
        let lit = field.tick().pixels().filter(|px| px[3] > 0).count();
        assert!(lit > 0);
    }
    assert_eq!(field.store().len(), 25);
}

/// Config file through texture loading to a rendered frame.
#[tokio::test]
async fn configured_phase_clock_renders_textured_disc() {
    let dir = tempfile::tempdir().unwrap();
    let texture_path = dir.path().join("moon.png");
    image::RgbImage::from_pixel(16, 8, image::Rgb([120, 120, 120]))
        .save(&texture_path)
        .unwrap();

    let config_path = dir.path().join("moon-clock.toml");
    let mut file = std::fs::File::create(&config_path).unwrap();
    writeln!(
        file,
        "[disc]\ndisplay_size = 60\nmargin = 5\nsupersample = 2\ntexture_path = {:?}",
        texture_path.display().to_string()
    )
    .unwrap();

    let config = Config::load_from_path(&config_path);
    assert_eq!(config.disc.surface, SurfaceKind::Texture);
    let shader = load_shader(&config.disc).await;
    match shader.sampler() {
        Sampler::Texture(sampler) => assert!(sampler.has_texture()),
        other => panic!("expected a texture sampler, got {other:?}"),
    }

    let clock = PhaseClock::new(
        shader,
        &config.clock,
        &config.disc,
        ManualClock::new(reference_full_moon()),
    );
    let frame = clock.tick();
    assert_eq!((frame.disc.width(), frame.disc.height()), (60, 60));
    assert_eq!(frame.bucket, PhaseBucket::Full);
    let center = frame.disc.pixel(30, 30).unwrap();
    assert_eq!(center[3], 255);
    assert!(center[0] > 90 && center[0] < 125, "center {center:?}");
}

/// Weekly steps from the reference full moon walk through the quarters.
#[test]
fn phase_clock_follows_manual_time() {
    let disc = DiscConfig {
        display_size: 50,
        supersample: 1,
        margin: 5,
        ..DiscConfig::default()
    };
    let clock = PhaseClock::new(
        SurfaceShader::new(TextureSampler::fallback().into()),
        &Config::default().clock,
        &disc,
        ManualClock::new(reference_full_moon()),
    );

    let mut buckets = Vec::new();
    for _ in 0..4 {
        buckets.push(clock.tick().bucket);
        clock.clock().advance(TimeDelta::days(7));
    }
    assert_eq!(
        buckets,
        vec![
            PhaseBucket::Full,
            PhaseBucket::LastQuarter,
            PhaseBucket::New,
            PhaseBucket::FirstQuarter
        ]
    );
}
