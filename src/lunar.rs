//! Moon age, phase naming and light direction.
//!
//! The model is a fixed mean synodic month anchored at one observed full moon
//! (2026-01-03 10:04 UTC). Accuracy is a few hours over decades, which is all a
//! decorative clock needs; no perturbation terms are applied.

use chrono::{DateTime, Utc};
use core::f64::consts::TAU;
use core::fmt;

/// Mean length of a lunation in days.
pub const SYNODIC_MONTH: f64 = 29.530_588_853;

/// Unix seconds of the reference full moon, 2026-01-03T10:04:00Z.
pub const REFERENCE_FULL_MOON_UNIX: i64 = 1_767_434_640;

/// Moon age in days at the reference instant.
pub const REFERENCE_AGE_DAYS: f64 = 14.77;

const MS_PER_DAY: f64 = 86_400_000.0;

/// The reference full-moon instant.
pub fn reference_full_moon() -> DateTime<Utc> {
    DateTime::from_timestamp(REFERENCE_FULL_MOON_UNIX, 0).unwrap_or_default()
}

/// Days since the most recent new moon, always in `[0, SYNODIC_MONTH)`.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct MoonAge(f64);

impl MoonAge {
    /// Wrap an arbitrary day count into one lunation.
    pub fn from_days(days: f64) -> Self {
        let mut age = days % SYNODIC_MONTH;
        if age < 0.0 {
            age += SYNODIC_MONTH;
        }
        // A tiny negative remainder plus a full month rounds up to the month itself
        if !(age < SYNODIC_MONTH) {
            age = 0.0;
        }
        Self(age)
    }

    pub fn days(self) -> f64 {
        self.0
    }

    /// Position within the lunation in `[0, 1)`: 0 = new, 0.5 = full.
    pub fn fraction(self) -> f64 {
        self.0 / SYNODIC_MONTH
    }
}

impl fmt::Display for MoonAge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.1}", self.0)
    }
}

/// Converts wall-clock instants into moon ages relative to a known full moon.
#[derive(Debug, Clone, Copy)]
pub struct AgeCalculator {
    reference: DateTime<Utc>,
    reference_age: f64,
}

impl Default for AgeCalculator {
    fn default() -> Self {
        Self::new(reference_full_moon(), REFERENCE_AGE_DAYS)
    }
}

impl AgeCalculator {
    pub fn new(reference: DateTime<Utc>, reference_age: f64) -> Self {
        Self {
            reference,
            reference_age,
        }
    }

    /// Moon age at `now`. Instants before the reference are fine.
    pub fn age(&self, now: DateTime<Utc>) -> MoonAge {
        let elapsed_ms = now.signed_duration_since(self.reference).num_milliseconds();
        let elapsed_days = elapsed_ms as f64 / MS_PER_DAY;
        MoonAge::from_days(self.reference_age + elapsed_days)
    }
}

/// Named lunar phase categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PhaseBucket {
    New,
    WaxingCrescent,
    FirstQuarter,
    WaxingGibbous,
    Full,
    WaningGibbous,
    LastQuarter,
    WaningCrescent,
}

impl PhaseBucket {
    /// Stable kebab-case identifier.
    pub fn as_str(&self) -> &'static str {
        match self {
            PhaseBucket::New => "new",
            PhaseBucket::WaxingCrescent => "waxing-crescent",
            PhaseBucket::FirstQuarter => "first-quarter",
            PhaseBucket::WaxingGibbous => "waxing-gibbous",
            PhaseBucket::Full => "full",
            PhaseBucket::WaningGibbous => "waning-gibbous",
            PhaseBucket::LastQuarter => "last-quarter",
            PhaseBucket::WaningCrescent => "waning-crescent",
        }
    }

    /// Display label for readouts.
    pub fn label(&self) -> &'static str {
        match self {
            PhaseBucket::New => "New Moon",
            PhaseBucket::WaxingCrescent => "Waxing Crescent",
            PhaseBucket::FirstQuarter => "First Quarter",
            PhaseBucket::WaxingGibbous => "Waxing Gibbous",
            PhaseBucket::Full => "Full Moon",
            PhaseBucket::WaningGibbous => "Waning Gibbous",
            PhaseBucket::LastQuarter => "Last Quarter",
            PhaseBucket::WaningCrescent => "Waning Crescent",
        }
    }
}

impl fmt::Display for PhaseBucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Ascending upper bounds on `age / SYNODIC_MONTH`, each bucket centred on its
/// eighth of the cycle. "New" appears twice because it straddles the wrap.
pub const PHASE_THRESHOLDS: [(f64, PhaseBucket); 9] = [
    (0.0625, PhaseBucket::New),
    (0.1875, PhaseBucket::WaxingCrescent),
    (0.3125, PhaseBucket::FirstQuarter),
    (0.4375, PhaseBucket::WaxingGibbous),
    (0.5625, PhaseBucket::Full),
    (0.6875, PhaseBucket::WaningGibbous),
    (0.8125, PhaseBucket::LastQuarter),
    (0.9375, PhaseBucket::WaningCrescent),
    (1.0, PhaseBucket::New),
];

/// Name the phase: the first bucket whose threshold exceeds the normalized age.
pub fn phase_bucket(age: MoonAge) -> PhaseBucket {
    let phase = age.fraction();
    PHASE_THRESHOLDS
        .iter()
        .find(|(threshold, _)| phase < *threshold)
        .map(|(_, bucket)| *bucket)
        .unwrap_or(PhaseBucket::New)
}

/// Unit vector toward the sun in the viewer's frame (+z points at the viewer).
///
/// The direction sweeps once around the y axis per lunation: straight behind
/// the moon at new, straight behind the viewer at full.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LightDirection {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl LightDirection {
    pub fn from_age(age: MoonAge) -> Self {
        let angle = TAU * age.fraction().fract();
        Self {
            x: angle.sin() as f32,
            y: 0.0,
            z: -angle.cos() as f32,
        }
    }

    /// Lambertian term for a surface normal.
    pub fn dot(&self, nx: f32, ny: f32, nz: f32) -> f32 {
        nx * self.x + ny * self.y + nz * self.z
    }
}
