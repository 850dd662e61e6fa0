//! # Moon Clock Application Entry Point
//!
//! This binary renders the moon-phase clock once for a given instant and
//! presents it as terminal output, JSON readouts or PNG files. With
//! `--run-seconds` it also drives the live phase and particle loops for a
//! while, logging each phase tick.

use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Utc};
use clap::Parser;
use image::RgbaImage;
use log::{debug, info};
use moon_clock_lib::{
    canvas::PixelBuffer,
    config::Config,
    driver::{load_shader, ParticleField, PhaseClock, Scheduler, SystemClock},
    particles::ParticleStore,
    renderer::{compose_panel, draw_ascii},
    sampler::SurfaceKind,
};
use rand::Rng;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(name = "moon-clock")]
#[command(about = "Moon-phase clock renderer with an ambient particle field")]
struct Cli {
    /// Configuration file (default: ./moon-clock.toml)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Use the procedural relief surface instead of the texture
    #[arg(long)]
    procedural: bool,

    /// Render for this RFC 3339 instant instead of now
    #[arg(long)]
    at: Option<DateTime<Utc>>,

    /// Print an ASCII preview and the readouts (the default output)
    #[arg(long)]
    stdout: bool,

    /// Width of the ASCII preview in characters
    #[arg(long, default_value_t = 60)]
    columns: usize,

    /// Print the readouts as JSON
    #[arg(long)]
    json: bool,

    /// Write disc.png, panel.png and particles.png into this directory
    #[arg(long)]
    out: Option<PathBuf>,

    /// Run the live drivers for this many seconds, then stop
    #[arg(long)]
    run_seconds: Option<u64>,
}

/// Encode an RGBA buffer as a PNG file.
fn save_png(buffer: &PixelBuffer, path: &Path) -> Result<()> {
    let image = RgbaImage::from_raw(buffer.width(), buffer.height(), buffer.as_bytes().to_vec())
        .ok_or_else(|| anyhow!("pixel buffer does not match its dimensions"))?;
    image
        .save(path)
        .with_context(|| format!("write {}", path.display()))?;
    info!("Wrote {}", path.display());
    Ok(())
}

async fn run(cli: Cli, config: Config) -> Result<()> {
    // Texture loading finishes before any disc is rendered
    let shader = load_shader(&config.disc).await;
    let phase = PhaseClock::new(shader, &config.clock, &config.disc, SystemClock);
    let frame = phase.frame_at(cli.at.unwrap_or_else(Utc::now));
    info!(
        "Moon age {:.2} days ({}) at {}",
        frame.age.days(),
        frame.bucket,
        frame.at.to_rfc3339()
    );

    let particles = &config.particles;
    let seed = particles.seed.unwrap_or_else(|| rand::rng().random());
    debug!("Particle seed {}", seed);
    let mut field = ParticleField::new(ParticleStore::seeded(
        particles.clone(),
        particles.width,
        particles.height,
        seed,
    ));

    let any_output = cli.stdout || cli.json || cli.out.is_some() || cli.run_seconds.is_some();
    if cli.stdout || !any_output {
        draw_ascii(&frame, cli.columns);
    }

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&frame.readouts)?);
    }

    if let Some(dir) = &cli.out {
        fs::create_dir_all(dir).with_context(|| format!("create {}", dir.display()))?;
        save_png(&frame.disc, &dir.join("disc.png"))?;
        save_png(&compose_panel(&frame), &dir.join("panel.png"))?;
        save_png(field.tick(), &dir.join("particles.png"))?;
    }

    if let Some(seconds) = cli.run_seconds {
        let frames = Arc::new(AtomicU64::new(0));
        let counter = frames.clone();
        let scheduler = Scheduler::start(
            phase,
            Duration::from_millis(config.clock.tick_interval_ms),
            field,
            Duration::from_millis(particles.frame_interval_ms),
            |frame| {
                info!(
                    "{} | {} | {} | {}",
                    frame.readouts.time, frame.readouts.date, frame.readouts.phase, frame.readouts.age
                )
            },
            move |_| {
                counter.fetch_add(1, Ordering::Relaxed);
            },
        );

        tokio::time::sleep(Duration::from_secs(seconds)).await;
        scheduler.stop().await;
        info!(
            "Rendered {} particle frames in {}s",
            frames.load(Ordering::Relaxed),
            seconds
        );
    }

    Ok(())
}

/// Main application entry point.
fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => Config::load_from_path(path),
        None => Config::load(),
    };
    if cli.procedural {
        config.disc.surface = SurfaceKind::Procedural;
    }

    // Create Tokio runtime for texture loading and the drive loops
    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(run(cli, config))
}
