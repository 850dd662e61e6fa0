//! Particle field drawing: proximity links, then particle discs.
//!
//! Links come from a plain all-pairs scan. That is O(n²), which is fine for
//! the few dozen particles the field carries; a few thousand would need a grid
//! or quadtree here.

use crate::canvas::Surface;
use crate::config::ParticleConfig;
use crate::particles::{ParticleRecord, ParticleStore};
use crate::Rgb;
use rand::Rng;

/// A link between two particle slots, `a < b`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Connection {
    pub a: usize,
    pub b: usize,
    pub distance: f32,
    pub opacity: f32,
}

/// Link opacity for a pair, or `None` when they are too far apart.
///
/// Fades linearly from `connection_opacity * min(opacity_a, opacity_b)` at
/// zero distance to nothing at `connection_distance`.
pub fn connection_opacity(distance: f32, opacity_a: f32, opacity_b: f32, config: &ParticleConfig) -> Option<f32> {
    let threshold = config.connection_distance;
    if !(distance < threshold) {
        return None;
    }
    Some((1.0 - distance / threshold) * config.connection_opacity * opacity_a.min(opacity_b))
}

/// Every linked pair, in slot order.
pub fn connections(records: &[ParticleRecord], config: &ParticleConfig) -> Vec<Connection> {
    let mut links = Vec::new();
    for (a, pa) in records.iter().enumerate() {
        for (offset, pb) in records[a + 1..].iter().enumerate() {
            let distance = (pa.x - pb.x).hypot(pa.y - pb.y);
            if let Some(opacity) = connection_opacity(distance, pa.opacity, pb.opacity, config) {
                links.push(Connection {
                    a,
                    b: a + 1 + offset,
                    distance,
                    opacity,
                });
            }
        }
    }
    links
}

pub fn draw_connections<S: Surface>(surface: &mut S, records: &[ParticleRecord], config: &ParticleConfig) {
    for link in connections(records, config) {
        let (pa, pb) = (&records[link.a], &records[link.b]);
        surface.stroke_line((pa.x, pa.y), (pb.x, pb.y), config.line_width, Rgb::WHITE, link.opacity);
    }
}

pub fn draw_particles<S: Surface>(surface: &mut S, records: &[ParticleRecord]) {
    for p in records {
        surface.fill_circle((p.x, p.y), p.radius, Rgb::WHITE, p.opacity);
    }
}

/// Clear the surface and draw the store's current state.
pub fn draw_field<S: Surface, R: Rng>(surface: &mut S, store: &ParticleStore<R>) {
    surface.clear();
    draw_connections(surface, store.records(), store.config());
    draw_particles(surface, store.records());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canvas::{GradientStop, PixelBuffer};

    #[derive(Debug, PartialEq)]
    enum Call {
        Clear,
        Line { alpha: f32, width: f32 },
        Circle { radius: f32, alpha: f32 },
    }

    #[derive(Default)]
    struct Recorder {
        calls: Vec<Call>,
    }

    impl Surface for Recorder {
        fn dimensions(&self) -> (u32, u32) {
            (100, 100)
        }

        fn clear(&mut self) {
            self.calls.push(Call::Clear);
        }

        fn fill_circle(&mut self, _center: (f32, f32), radius: f32, _color: Rgb, alpha: f32) {
            self.calls.push(Call::Circle { radius, alpha });
        }

        fn stroke_line(&mut self, _from: (f32, f32), _to: (f32, f32), width: f32, _color: Rgb, alpha: f32) {
            self.calls.push(Call::Line { alpha, width });
        }

        fn fill_radial_gradient(&mut self, _: (f32, f32), _: f32, _: f32, _: &[GradientStop]) {}

        fn draw_buffer(&mut self, _: &PixelBuffer, _: (i32, i32)) {}
    }

    fn at(x: f32, y: f32, opacity: f32) -> ParticleRecord {
        ParticleRecord {
            x,
            y,
            vx: 0.0,
            vy: 0.0,
            radius: 1.5,
            age: 80,
            max_lifetime: 300.0,
            opacity,
        }
    }

    #[test]
    fn test_no_connection_at_or_beyond_threshold() {
        let config = ParticleConfig::default();
        assert_eq!(connection_opacity(120.0, 0.6, 0.6, &config), None);
        assert_eq!(connection_opacity(500.0, 0.6, 0.6, &config), None);
        assert!(connection_opacity(119.9, 0.6, 0.6, &config).is_some());
    }

    #[test]
    fn test_connection_opacity_at_zero_distance() {
        let config = ParticleConfig::default();
        let opacity = connection_opacity(0.0, 0.6, 0.2, &config).unwrap();
        assert!((opacity - 0.3 * 0.2).abs() < 1e-6);
    }

    #[test]
    fn test_connection_opacity_falls_off_linearly() {
        let config = ParticleConfig::default();
        let half = connection_opacity(60.0, 0.6, 0.6, &config).unwrap();
        assert!((half - 0.5 * 0.3 * 0.6).abs() < 1e-6);
    }

    #[test]
    fn test_connections_scan_unordered_pairs_once() {
        let config = ParticleConfig::default();
        let records = [at(0.0, 0.0, 0.6), at(30.0, 40.0, 0.6), at(400.0, 0.0, 0.6), at(0.0, 0.0, 0.4)];
        let links = connections(&records, &config);

        let pairs: Vec<_> = links.iter().map(|c| (c.a, c.b)).collect();
        assert_eq!(pairs, vec![(0, 1), (0, 3), (1, 3)]);
        assert!((links[0].distance - 50.0).abs() < 1e-4);
        assert!((links[1].opacity - 0.3 * 0.4).abs() < 1e-6);
    }

    #[test]
    fn test_draw_field_order() {
        let config = ParticleConfig::default();
        let records = vec![at(10.0, 10.0, 0.5), at(20.0, 10.0, 0.25)];
        let store = ParticleStore::from_records(config, 100, 100, records, rand_pcg::Pcg32::new(1, 1));

        let mut recorder = Recorder::default();
        draw_field(&mut recorder, &store);

        let expected_link = (1.0 - 10.0 / 120.0) * 0.3 * 0.25;
        assert_eq!(recorder.calls.len(), 4);
        assert_eq!(recorder.calls[0], Call::Clear);
        match recorder.calls[1] {
            Call::Line { alpha, width } => {
                assert!((alpha - expected_link).abs() < 1e-6);
                assert_eq!(width, 0.5);
            }
            ref other => panic!("expected a line, got {other:?}"),
        }
        assert_eq!(recorder.calls[2], Call::Circle { radius: 1.5, alpha: 0.5 });
        assert_eq!(recorder.calls[3], Call::Circle { radius: 1.5, alpha: 0.25 });
    }

    #[test]
    fn test_draw_field_on_pixels() {
        let config = ParticleConfig::default();
        let records = vec![at(20.0, 20.0, 0.6), at(60.0, 20.0, 0.6)];
        let store = ParticleStore::from_records(config, 80, 40, records, rand_pcg::Pcg32::new(7, 7));

        let mut buffer = PixelBuffer::new(80, 40);
        buffer.set_pixel(0, 0, [255, 0, 0, 255]);
        draw_field(&mut buffer, &store);

        assert_eq!(buffer.pixel(0, 0), Some([0, 0, 0, 0]), "field is cleared first");
        // Above the link, so only the particle itself
        assert_eq!(buffer.pixel(20, 19).unwrap()[3], 153);
        let link = buffer.pixel(40, 20).unwrap();
        assert!(link[3] > 0 && link[3] < 40, "link pixel {link:?}");
        assert_eq!(buffer.pixel(40, 35).unwrap()[3], 0);
    }
}
