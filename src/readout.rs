//! Clock and moon readout formatting.
//!
//! Readouts follow the host time zone of the `DateTime` they are given, so
//! callers pass `Local::now()` for a wall clock and a fixed offset in tests.

use crate::lunar::{phase_bucket, MoonAge};
use crate::Readouts;
use chrono::{DateTime, TimeZone};
use core::fmt::Display;
use embedded_graphics::{
    mono_font::{
        iso_8859_1::{FONT_10X20, FONT_6X10},
        MonoTextStyle,
    },
    pixelcolor::Rgb888,
    prelude::*,
    text::{Baseline, Text},
};

/// Zero-padded 24-hour clock, e.g. `07:05:09`.
pub fn format_time<Tz: TimeZone>(at: &DateTime<Tz>) -> String
where
    Tz::Offset: Display,
{
    at.format("%H:%M:%S").to_string()
}

/// Short observation date, e.g. `Thu · 15 Oct 2026`.
pub fn format_date<Tz: TimeZone>(at: &DateTime<Tz>) -> String
where
    Tz::Offset: Display,
{
    at.format("%a · %-d %b %Y").to_string()
}

/// One-decimal moon age, e.g. `Moon Age: 14.8`.
pub fn format_age(age: MoonAge) -> String {
    format!("Moon Age: {age}")
}

/// Build every readout for one clock tick.
pub fn readouts<Tz: TimeZone>(at: &DateTime<Tz>, age: MoonAge) -> Readouts
where
    Tz::Offset: Display,
{
    Readouts {
        time: format_time(at),
        date: format_date(at),
        phase: phase_bucket(age).label().to_string(),
        age: format_age(age),
    }
}

/// Draw the readouts as a text block with its top-left corner at `origin`.
///
/// The clock uses the large font, the remaining lines the small one. Returns
/// the point just below the block.
pub fn draw_readouts<D>(target: &mut D, readouts: &Readouts, origin: Point) -> Result<Point, D::Error>
where
    D: DrawTarget<Color = Rgb888>,
{
    let large = MonoTextStyle::new(&FONT_10X20, Rgb888::WHITE);
    let small = MonoTextStyle::new(&FONT_6X10, Rgb888::new(200, 200, 210));

    Text::with_baseline(&readouts.time, origin, large, Baseline::Top).draw(target)?;
    let mut cursor = origin + Point::new(0, 24);
    for line in [&readouts.date, &readouts.phase, &readouts.age] {
        Text::with_baseline(line, cursor, small, Baseline::Top).draw(target)?;
        cursor += Point::new(0, 12);
    }
    Ok(cursor)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canvas::PixelBuffer;
    use crate::lunar::SYNODIC_MONTH;
    use chrono::{FixedOffset, Utc};

    fn at(h: u32, m: u32, s: u32) -> DateTime<FixedOffset> {
        FixedOffset::east_opt(9 * 3600)
            .unwrap()
            .with_ymd_and_hms(2026, 1, 3, h, m, s)
            .unwrap()
    }

    #[test]
    fn test_time_is_zero_padded() {
        assert_eq!(format_time(&at(7, 5, 9)), "07:05:09");
        assert_eq!(format_time(&at(23, 59, 0)), "23:59:00");
    }

    #[test]
    fn test_date_format() {
        assert_eq!(format_date(&at(12, 0, 0)), "Sat · 3 Jan 2026");
        let utc = Utc.with_ymd_and_hms(2026, 10, 15, 0, 0, 0).unwrap();
        assert_eq!(format_date(&utc), "Thu · 15 Oct 2026");
    }

    #[test]
    fn test_age_has_one_decimal() {
        assert_eq!(format_age(MoonAge::from_days(14.77)), "Moon Age: 14.8");
        assert_eq!(format_age(MoonAge::from_days(0.0)), "Moon Age: 0.0");
        assert_eq!(format_age(MoonAge::from_days(3.04)), "Moon Age: 3.0");
    }

    #[test]
    fn test_readouts_include_phase_label() {
        let readouts = readouts(&at(19, 4, 0), MoonAge::from_days(SYNODIC_MONTH / 2.0));
        assert_eq!(readouts.time, "19:04:00");
        assert_eq!(readouts.phase, "Full Moon");
        assert_eq!(readouts.age, "Moon Age: 14.8");
    }

    #[test]
    fn test_draw_readouts_marks_pixels() {
        let readouts = readouts(&at(1, 2, 3), MoonAge::from_days(5.0));
        let mut buffer = PixelBuffer::new(160, 80);
        let end = draw_readouts(&mut buffer, &readouts, Point::new(4, 4)).unwrap();

        assert_eq!(end, Point::new(4, 4 + 24 + 36));
        let lit = buffer.pixels().filter(|px| px[3] == 255).count();
        assert!(lit > 50, "only {lit} text pixels drawn");
    }
}
