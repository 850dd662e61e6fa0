//! # RGBA Raster Surfaces
//!
//! This module provides the drawing surface the renderers paint on. It plays
//! the role a browser 2D canvas plays for a web page: an owned pixel buffer
//! plus a small set of primitives with alpha compositing.
//!
//! ## Pixel Layout
//! - **Row-major RGBA**: 4 bytes per pixel, `(y * width + x) * 4`
//! - **Straight alpha**: color channels are not premultiplied
//! - **Transparent by default**: a fresh buffer is all zeros
//!
//! ## Primitives
//! The [`Surface`] capability covers exactly what the moon and particle
//! renderers need:
//! - filled circles (particles)
//! - stroked lines (particle connections)
//! - radial gradients (moon glow)
//! - compositing a whole pre-rendered buffer (the shaded disc)
//!
//! Circle and line rasterization is delegated to `embedded-graphics`; this
//! module only adds source-over blending on top of its pixel iterators.
//! [`PixelBuffer`] also implements `DrawTarget<Color = Rgb888>` directly, so any
//! `embedded-graphics` drawable (text, styled primitives) can be drawn opaquely.

use crate::Rgb;
use embedded_graphics::{
    pixelcolor::Rgb888,
    prelude::*,
    primitives::{Circle, Line, PrimitiveStyle},
};

/// A color stop on a radial gradient.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GradientStop {
    /// Position along the gradient in [0, 1]
    pub offset: f32,
    pub color: Rgb,
    /// Opacity in [0, 1]
    pub alpha: f32,
}

impl GradientStop {
    pub const fn new(offset: f32, color: Rgb, alpha: f32) -> Self {
        Self {
            offset,
            color,
            alpha,
        }
    }
}

/// Drawing capability handed to the renderers.
///
/// Coordinates are in pixels with the origin at the top-left corner.
/// Alphas are in [0, 1] and composite source-over.
pub trait Surface {
    /// Width and height in pixels.
    fn dimensions(&self) -> (u32, u32);

    /// Reset every pixel to transparent.
    fn clear(&mut self);

    fn fill_circle(&mut self, center: (f32, f32), radius: f32, color: Rgb, alpha: f32);

    fn stroke_line(&mut self, from: (f32, f32), to: (f32, f32), width: f32, color: Rgb, alpha: f32);

    /// Fill the disc of radius `outer` around `center` with a gradient running
    /// from `inner` (offset 0) to `outer` (offset 1). Pixels inside `inner`
    /// take the first stop.
    fn fill_radial_gradient(&mut self, center: (f32, f32), inner: f32, outer: f32, stops: &[GradientStop]);

    /// Composite `buffer` over this surface with its top-left at `origin`.
    fn draw_buffer(&mut self, buffer: &PixelBuffer, origin: (i32, i32));
}

/// An owned RGBA raster.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixelBuffer {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

impl PixelBuffer {
    /// A fully transparent buffer.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            data: vec![0; width as usize * height as usize * 4],
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Raw RGBA bytes, row-major.
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.data
    }

    fn index(&self, x: i32, y: i32) -> Option<usize> {
        if x < 0 || y < 0 || x as u32 >= self.width || y as u32 >= self.height {
            return None;
        }
        Some((y as usize * self.width as usize + x as usize) * 4)
    }

    /// RGBA at `(x, y)`, or `None` outside the buffer.
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        let i = self.index(x as i32, y as i32)?;
        Some([self.data[i], self.data[i + 1], self.data[i + 2], self.data[i + 3]])
    }

    /// Overwrite a pixel. Out-of-range coordinates are ignored.
    pub fn set_pixel(&mut self, x: u32, y: u32, rgba: [u8; 4]) {
        if let Some(i) = self.index(x as i32, y as i32) {
            self.data[i..i + 4].copy_from_slice(&rgba);
        }
    }

    /// Iterate all pixels in row-major order.
    pub fn pixels(&self) -> impl Iterator<Item = [u8; 4]> + '_ {
        self.data.chunks_exact(4).map(|c| [c[0], c[1], c[2], c[3]])
    }

    /// Source-over blend of a straight-alpha color onto one pixel.
    pub fn blend_pixel(&mut self, x: i32, y: i32, color: Rgb, alpha: f32) {
        let alpha = alpha.clamp(0.0, 1.0);
        if alpha <= 0.0 {
            return;
        }
        let Some(i) = self.index(x, y) else {
            return;
        };

        let dst_a = self.data[i + 3] as f32 / 255.0;
        let out_a = alpha + dst_a * (1.0 - alpha);
        let mix = |src: u8, dst: u8| {
            let c = (src as f32 * alpha + dst as f32 * dst_a * (1.0 - alpha)) / out_a;
            c.round().clamp(0.0, 255.0) as u8
        };

        self.data[i] = mix(color.r, self.data[i]);
        self.data[i + 1] = mix(color.g, self.data[i + 1]);
        self.data[i + 2] = mix(color.b, self.data[i + 2]);
        self.data[i + 3] = (out_a * 255.0).round() as u8;
    }

    /// Box-filter down by an integer factor, weighting color by alpha.
    ///
    /// Used to bring a supersampled disc back to display resolution.
    pub fn downsample(&self, factor: u32) -> PixelBuffer {
        if factor <= 1 {
            return self.clone();
        }
        let mut out = PixelBuffer::new(self.width / factor, self.height / factor);
        let samples = (factor * factor) as f32;

        for oy in 0..out.height {
            for ox in 0..out.width {
                let mut sum = [0.0_f32; 3];
                let mut alpha_sum = 0.0_f32;
                for sy in 0..factor {
                    for sx in 0..factor {
                        let i = ((oy * factor + sy) as usize * self.width as usize
                            + (ox * factor + sx) as usize)
                            * 4;
                        let a = self.data[i + 3] as f32;
                        alpha_sum += a;
                        for (channel, total) in sum.iter_mut().enumerate() {
                            *total += self.data[i + channel] as f32 * a;
                        }
                    }
                }
                if alpha_sum > 0.0 {
                    let rgba = [
                        (sum[0] / alpha_sum).round() as u8,
                        (sum[1] / alpha_sum).round() as u8,
                        (sum[2] / alpha_sum).round() as u8,
                        (alpha_sum / samples).round() as u8,
                    ];
                    out.set_pixel(ox, oy, rgba);
                }
            }
        }
        out
    }

    fn blender(&mut self, alpha: f32) -> Blend<'_> {
        Blend {
            buffer: self,
            alpha,
        }
    }
}

fn to_point((x, y): (f32, f32)) -> Point {
    Point::new(x.round() as i32, y.round() as i32)
}

/// Color and opacity at `t` along a sorted stop list.
fn gradient_at(stops: &[GradientStop], t: f32) -> Option<(Rgb, f32)> {
    let first = stops.first()?;
    let last = stops.last()?;
    if t <= first.offset {
        return Some((first.color, first.alpha));
    }
    for pair in stops.windows(2) {
        let (a, b) = (pair[0], pair[1]);
        if t <= b.offset {
            let span = b.offset - a.offset;
            let local = if span > 0.0 { (t - a.offset) / span } else { 1.0 };
            return Some((a.color.lerp(b.color, local), a.alpha + (b.alpha - a.alpha) * local));
        }
    }
    Some((last.color, last.alpha))
}

impl Surface for PixelBuffer {
    fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn clear(&mut self) {
        self.data.fill(0);
    }

    fn fill_circle(&mut self, center: (f32, f32), radius: f32, color: Rgb, alpha: f32) {
        let diameter = (radius * 2.0).round().max(1.0) as u32;
        Circle::with_center(to_point(center), diameter)
            .into_styled(PrimitiveStyle::with_fill(Rgb888::from(color)))
            .draw(&mut self.blender(alpha))
            .ok();
    }

    fn stroke_line(&mut self, from: (f32, f32), to: (f32, f32), width: f32, color: Rgb, alpha: f32) {
        // Sub-pixel widths become a 1px line with proportionally less coverage
        let stroke = width.ceil().max(1.0);
        let coverage = (width / stroke).clamp(0.0, 1.0);
        Line::new(to_point(from), to_point(to))
            .into_styled(PrimitiveStyle::with_stroke(Rgb888::from(color), stroke as u32))
            .draw(&mut self.blender(alpha * coverage))
            .ok();
    }

    fn fill_radial_gradient(&mut self, center: (f32, f32), inner: f32, outer: f32, stops: &[GradientStop]) {
        if outer <= 0.0 || stops.is_empty() {
            return;
        }
        let span = (outer - inner).max(f32::EPSILON);
        let x0 = (center.0 - outer).floor().max(0.0) as i32;
        let y0 = (center.1 - outer).floor().max(0.0) as i32;
        let x1 = (center.0 + outer).ceil().min(self.width as f32) as i32;
        let y1 = (center.1 + outer).ceil().min(self.height as f32) as i32;

        for y in y0..y1 {
            for x in x0..x1 {
                let dx = x as f32 + 0.5 - center.0;
                let dy = y as f32 + 0.5 - center.1;
                let dist = (dx * dx + dy * dy).sqrt();
                if dist > outer {
                    continue;
                }
                let t = ((dist - inner) / span).clamp(0.0, 1.0);
                if let Some((color, alpha)) = gradient_at(stops, t) {
                    self.blend_pixel(x, y, color, alpha);
                }
            }
        }
    }

    fn draw_buffer(&mut self, buffer: &PixelBuffer, origin: (i32, i32)) {
        for y in 0..buffer.height {
            for x in 0..buffer.width {
                let i = (y as usize * buffer.width as usize + x as usize) * 4;
                let alpha = buffer.data[i + 3];
                if alpha == 0 {
                    continue;
                }
                let color = Rgb::new(buffer.data[i], buffer.data[i + 1], buffer.data[i + 2]);
                self.blend_pixel(origin.0 + x as i32, origin.1 + y as i32, color, alpha as f32 / 255.0);
            }
        }
    }
}

impl From<Rgb> for Rgb888 {
    fn from(c: Rgb) -> Self {
        Rgb888::new(c.r, c.g, c.b)
    }
}

impl From<Rgb888> for Rgb {
    fn from(c: Rgb888) -> Self {
        Rgb::new(c.r(), c.g(), c.b())
    }
}

impl OriginDimensions for PixelBuffer {
    fn size(&self) -> Size {
        Size::new(self.width, self.height)
    }
}

/// Opaque drawing: every pixel written gets alpha 255.
impl DrawTarget for PixelBuffer {
    type Color = Rgb888;
    type Error = core::convert::Infallible;

    fn draw_iter<I>(&mut self, pixels: I) -> Result<(), Self::Error>
    where
        I: IntoIterator<Item = Pixel<Self::Color>>,
    {
        for Pixel(point, color) in pixels {
            if point.x >= 0 && point.y >= 0 {
                self.set_pixel(point.x as u32, point.y as u32, [color.r(), color.g(), color.b(), 255]);
            }
        }
        Ok(())
    }
}

/// Draw target that blends everything at a fixed opacity.
struct Blend<'a> {
    buffer: &'a mut PixelBuffer,
    alpha: f32,
}

impl OriginDimensions for Blend<'_> {
    fn size(&self) -> Size {
        self.buffer.size()
    }
}

impl DrawTarget for Blend<'_> {
    type Color = Rgb888;
    type Error = core::convert::Infallible;

    fn draw_iter<I>(&mut self, pixels: I) -> Result<(), Self::Error>
    where
        I: IntoIterator<Item = Pixel<Self::Color>>,
    {
        for Pixel(point, color) in pixels {
            self.buffer.blend_pixel(point.x, point.y, color.into(), self.alpha);
        }
        Ok(())
    }
}
