//! # Frame Presentation
//!
//! This module turns driver output into something a person can look at. It
//! provides the development mode (an ASCII rendering of the disc printed to the
//! terminal) and a composed panel raster with the readouts set under the disc,
//! suitable for saving as an image.

use crate::canvas::{PixelBuffer, Surface};
use crate::driver::PhaseFrame;
use crate::readout::draw_readouts;
use crate::Rgb;
use embedded_graphics::prelude::*;

/// Dark to bright.
const RAMP: &[u8] = b" .:-=+*#%@";

/// Space between the disc and the readout block.
const PANEL_GAP: u32 = 6;

/// Height of the readout block: one 20px line plus three 12px lines.
const READOUT_HEIGHT: u32 = 24 + 3 * 12;

/// Widest readout line (`Www · DD Mmm YYYY`) in 6px glyphs.
const READOUT_WIDTH: u32 = 17 * 6;

/// Ramp character for one RGBA pixel; transparency reads as darkness.
fn shade_char(px: [u8; 4]) -> char {
    let luminance = Rgb::new(px[0], px[1], px[2]).luminance() / 255.0 * px[3] as f32 / 255.0;
    let index = (luminance * (RAMP.len() - 1) as f32).round() as usize;
    RAMP[index.min(RAMP.len() - 1)] as char
}

/// Render `buffer` as text `columns` characters wide.
///
/// Terminal cells are about twice as tall as they are wide, so each row covers
/// two column widths of pixels. Every cell takes the pixel at its center.
pub fn ascii_preview(buffer: &PixelBuffer, columns: usize) -> String {
    let (width, height) = (buffer.width() as usize, buffer.height() as usize);
    if width == 0 || height == 0 || columns == 0 {
        return String::new();
    }
    let cell = width as f32 / columns as f32;
    let rows = ((height as f32 / (cell * 2.0)).round() as usize).max(1);

    let mut out = String::with_capacity(rows * (columns + 1));
    for row in 0..rows {
        let y = (((row as f32 + 0.5) * cell * 2.0) as usize).min(height - 1);
        for column in 0..columns {
            let x = (((column as f32 + 0.5) * cell) as usize).min(width - 1);
            let px = buffer.pixel(x as u32, y as u32).unwrap_or_default();
            out.push(shade_char(px));
        }
        // Trailing blanks only make copy-paste noisy
        let trimmed = out.trim_end_matches(' ').len();
        out.truncate(trimmed);
        out.push('\n');
    }
    out
}

/// The ASCII disc, a blank line, then one readout per line.
pub fn ascii_report(frame: &PhaseFrame, columns: usize) -> String {
    let readouts = &frame.readouts;
    format!(
        "{}\n{}\n{}\n{}\n{}\n",
        ascii_preview(&frame.disc, columns),
        readouts.time,
        readouts.date,
        readouts.phase,
        readouts.age
    )
}

/// Print the disc and its readouts to the terminal.
pub fn draw_ascii(frame: &PhaseFrame, columns: usize) {
    print!("{}", ascii_report(frame, columns));
}

/// The disc with the readout block centered beneath it.
pub fn compose_panel(frame: &PhaseFrame) -> PixelBuffer {
    let disc = &frame.disc;
    let width = disc.width().max(READOUT_WIDTH);
    let height = disc.height() + PANEL_GAP + READOUT_HEIGHT;
    let mut panel = PixelBuffer::new(width, height);

    let disc_x = ((width - disc.width()) / 2) as i32;
    panel.draw_buffer(disc, (disc_x, 0));

    let text_x = ((width - READOUT_WIDTH) / 2) as i32;
    let origin = Point::new(text_x, (disc.height() + PANEL_GAP) as i32);
    draw_readouts(&mut panel, &frame.readouts, origin).ok();
    panel
}
