//! # Frame Drivers
//!
//! Two independent loops drive the display:
//! - **Phase clock**: low frequency (default 1 s). Computes the moon age,
//!   re-renders the disc and refreshes the readouts.
//! - **Particle field**: high frequency (default 16 ms). Draws the current
//!   field, then advances the simulation by one step.
//!
//! Each loop owns its state outright, so nothing is shared between them.
//! [`Scheduler`] runs both as `tokio` interval tasks and stops them together.
//! Disc renders run on the blocking pool so a slow frame never holds up the
//! particle loop, even on a single-worker runtime.
//! Wall-clock time comes from a [`Clock`] so tests can pin the instant.

use crate::canvas::PixelBuffer;
use crate::config::{ClockConfig, DiscConfig};
use crate::field_renderer::draw_field;
use crate::lunar::{phase_bucket, AgeCalculator, MoonAge, PhaseBucket};
use crate::particles::ParticleStore;
use crate::readout::readouts;
use crate::sampler::{ProceduralReliefSampler, Sampler, SurfaceKind, TextureSampler};
use crate::shader::SurfaceShader;
use crate::Readouts;
use chrono::{DateTime, Local, TimeDelta, Utc};
use log::{debug, info, warn};
use rand::Rng;
use rand_pcg::Pcg32;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Interval, MissedTickBehavior};

/// Source of the current instant.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// The host wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock that only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
    millis: AtomicI64,
}

impl ManualClock {
    pub fn new(at: DateTime<Utc>) -> Self {
        Self {
            millis: AtomicI64::new(at.timestamp_millis()),
        }
    }

    pub fn set(&self, at: DateTime<Utc>) {
        self.millis.store(at.timestamp_millis(), Ordering::SeqCst);
    }

    pub fn advance(&self, by: TimeDelta) {
        self.millis.fetch_add(by.num_milliseconds(), Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        DateTime::from_timestamp_millis(self.millis.load(Ordering::SeqCst)).unwrap_or_default()
    }
}

/// Build the shader for the configured surface strategy.
///
/// The texture is fully loaded (or has failed over to the flat fallback)
/// before this returns, so the first disc never renders half-initialized.
pub async fn load_shader(disc: &DiscConfig) -> SurfaceShader {
    let sampler: Sampler = match disc.surface {
        SurfaceKind::Texture => TextureSampler::load_or_fallback(&disc.texture_path).await.into(),
        SurfaceKind::Procedural => ProceduralReliefSampler::default().into(),
    };
    info!("Moon surface: {:?}", sampler.kind());
    SurfaceShader::new(sampler)
}

/// Everything one phase-clock tick produces.
#[derive(Debug, Clone)]
pub struct PhaseFrame {
    pub at: DateTime<Utc>,
    pub age: MoonAge,
    pub bucket: PhaseBucket,
    pub readouts: Readouts,
    /// The disc with its halo, at display resolution
    pub disc: PixelBuffer,
}

/// Low-frequency driver: moon age, disc and readouts.
#[derive(Debug)]
pub struct PhaseClock<C = SystemClock> {
    shader: SurfaceShader,
    calculator: AgeCalculator,
    render_size: u32,
    render_radius: f32,
    supersample: u32,
    clock: C,
}

impl<C: Clock> PhaseClock<C> {
    pub fn new(shader: SurfaceShader, clock_config: &ClockConfig, disc: &DiscConfig, clock: C) -> Self {
        Self {
            shader,
            calculator: AgeCalculator::new(clock_config.reference_full_moon, clock_config.reference_age_days),
            render_size: disc.render_size(),
            render_radius: disc.render_radius(),
            supersample: disc.supersample.max(1),
            clock,
        }
    }

    pub fn shader(&self) -> &SurfaceShader {
        &self.shader
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    /// Render the frame for the clock's current instant.
    pub fn tick(&self) -> PhaseFrame {
        self.frame_at(self.clock.now())
    }

    /// Render the frame for `at`. Readouts use the host time zone.
    pub fn frame_at(&self, at: DateTime<Utc>) -> PhaseFrame {
        let age = self.calculator.age(at);
        let mut disc = PixelBuffer::new(self.render_size, self.render_size);
        self.shader.draw(&mut disc, self.render_radius, age);

        PhaseFrame {
            at,
            age,
            bucket: phase_bucket(age),
            readouts: readouts(&at.with_timezone(&Local), age),
            disc: disc.downsample(self.supersample),
        }
    }
}

/// High-frequency driver: the particle store and the raster it is drawn on.
#[derive(Debug)]
pub struct ParticleField<R = Pcg32> {
    store: ParticleStore<R>,
    canvas: PixelBuffer,
}

impl<R: Rng> ParticleField<R> {
    pub fn new(store: ParticleStore<R>) -> Self {
        let (width, height) = store.bounds();
        Self {
            store,
            canvas: PixelBuffer::new(width, height),
        }
    }

    pub fn store(&self) -> &ParticleStore<R> {
        &self.store
    }

    /// The most recently drawn frame.
    pub fn canvas(&self) -> &PixelBuffer {
        &self.canvas
    }

    /// Draw the current state, then advance one step.
    pub fn tick(&mut self) -> &PixelBuffer {
        draw_field(&mut self.canvas, &self.store);
        self.store.step();
        &self.canvas
    }

    /// Match a new canvas size; the population is reseeded.
    pub fn resize(&mut self, width: u32, height: u32) {
        self.store.resize(width, height);
        self.canvas = PixelBuffer::new(width, height);
    }
}

/// Both drive loops running as background tasks.
pub struct Scheduler {
    shutdown: watch::Sender<bool>,
    phase: JoinHandle<()>,
    field: JoinHandle<()>,
}

impl Scheduler {
    /// Spawn the phase and particle loops on the current runtime.
    ///
    /// Each loop ticks immediately, then every interval. Ticks missed while
    /// a frame was still rendering are skipped rather than replayed.
    pub fn start<C, R, P, F>(
        phase: PhaseClock<C>,
        phase_every: Duration,
        field: ParticleField<R>,
        field_every: Duration,
        on_phase: P,
        mut on_field: F,
    ) -> Self
    where
        C: Clock + 'static,
        R: Rng + Send + 'static,
        P: FnMut(PhaseFrame) + Send + 'static,
        F: FnMut(&PixelBuffer) + Send + 'static,
    {
        let (shutdown, stop) = watch::channel(false);
        info!(
            "Starting drivers: phase every {:?}, particles every {:?}",
            phase_every, field_every
        );

        let phase = spawn_phase_loop(phase, phase_every, stop.clone(), on_phase);

        let mut field = field;
        let field = spawn_loop(field_every, stop, move || on_field(field.tick()));

        Self { shutdown, phase, field }
    }

    /// Halt both loops and wait for them to finish.
    pub async fn stop(self) {
        self.shutdown.send(true).ok();
        for (name, handle) in [("phase", self.phase), ("particle", self.field)] {
            if let Err(e) = handle.await {
                warn!("The {} driver ended abnormally: {}", name, e);
            }
        }
        info!("Drivers stopped");
    }
}

fn ticker(every: Duration) -> Interval {
    let mut ticker = tokio::time::interval(every.max(Duration::from_millis(1)));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    ticker
}

fn spawn_loop<T>(every: Duration, mut stop: watch::Receiver<bool>, mut tick: T) -> JoinHandle<()>
where
    T: FnMut() + Send + 'static,
{
    tokio::spawn(async move {
        let mut ticker = ticker(every);
        loop {
            tokio::select! {
                _ = ticker.tick() => tick(),
                // Also fires when the scheduler is dropped
                _ = stop.changed() => break,
            }
        }
        debug!("Driver loop exited");
    })
}

/// Like [`spawn_loop`], but each disc render is handed to the blocking pool.
fn spawn_phase_loop<C, P>(
    phase: PhaseClock<C>,
    every: Duration,
    mut stop: watch::Receiver<bool>,
    mut on_phase: P,
) -> JoinHandle<()>
where
    C: Clock + 'static,
    P: FnMut(PhaseFrame) + Send + 'static,
{
    let phase = Arc::new(phase);
    tokio::spawn(async move {
        let mut ticker = ticker(every);
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let clock = phase.clone();
                    match tokio::task::spawn_blocking(move || clock.tick()).await {
                        Ok(frame) => on_phase(frame),
                        Err(e) => {
                            warn!("Phase render failed: {}", e);
                            break;
                        }
                    }
                }
                _ = stop.changed() => break,
            }
        }
        debug!("Phase loop exited");
    })
}
