//! Top-down mission map composition.
//!
//! Draws the pose track as a connected path and marks each landmark
//! entity's resolved pose with a labeled cross. Entities without a
//! resolved pose are omitted here (they still appear in the report's
//! detail list). Pure function of its inputs: identical track and
//! entities produce identical pixels.

use image::{Rgb, RgbImage};

use crate::model::LandmarkEntity;
use crate::pose::PoseTrack;

pub const MAP_WIDTH: u32 = 800;
pub const MAP_HEIGHT: u32 = 640;
const MARGIN: f64 = 40.0;

const BACKGROUND: Rgb<u8> = Rgb([255, 255, 255]);
const PATH: Rgb<u8> = Rgb([100, 149, 237]);
const MARKER: Rgb<u8> = Rgb([200, 30, 30]);
const LABEL: Rgb<u8> = Rgb([20, 20, 20]);

/// Render the mission map. Draw order follows ascending entity id, which
/// is the order entities arrive in.
#[must_use]
pub fn render(track: &PoseTrack, entities: &[LandmarkEntity]) -> RgbImage {
    let mut canvas = RgbImage::from_pixel(MAP_WIDTH, MAP_HEIGHT, BACKGROUND);

    let mut points: Vec<(f64, f64)> = track.samples().iter().map(|p| (p.x, p.y)).collect();
    points.extend(
        entities
            .iter()
            .filter_map(|e| e.pose.map(|p| (p.x, p.y))),
    );
    if points.is_empty() {
        return canvas;
    }

    let projection = Projection::fit(&points);

    let path: Vec<(i64, i64)> = track
        .samples()
        .iter()
        .map(|p| projection.to_pixel(p.x, p.y))
        .collect();
    for pair in path.windows(2) {
        draw_line(&mut canvas, pair[0], pair[1], PATH);
    }

    for entity in entities {
        let Some(pose) = entity.pose else { continue };
        let (cx, cy) = projection.to_pixel(pose.x, pose.y);
        draw_cross(&mut canvas, cx, cy, MARKER);
        draw_number(&mut canvas, cx + 6, cy - 12, entity.id.ordinal(), LABEL);
    }

    canvas
}

/// World-to-pixel transform: uniform scale, centered, north up.
struct Projection {
    min_x: f64,
    min_y: f64,
    scale: f64,
    offset_x: f64,
    offset_y: f64,
    span_y: f64,
}

impl Projection {
    fn fit(points: &[(f64, f64)]) -> Self {
        let min_x = points.iter().map(|p| p.0).fold(f64::INFINITY, f64::min);
        let max_x = points.iter().map(|p| p.0).fold(f64::NEG_INFINITY, f64::max);
        let min_y = points.iter().map(|p| p.1).fold(f64::INFINITY, f64::min);
        let max_y = points.iter().map(|p| p.1).fold(f64::NEG_INFINITY, f64::max);

        let span_x = (max_x - min_x).max(1e-9);
        let span_y = (max_y - min_y).max(1e-9);
        let scale = ((f64::from(MAP_WIDTH) - 2.0 * MARGIN) / span_x)
            .min((f64::from(MAP_HEIGHT) - 2.0 * MARGIN) / span_y);

        // Center the drawing inside the margins.
        let offset_x = (f64::from(MAP_WIDTH) - span_x * scale) / 2.0;
        let offset_y = (f64::from(MAP_HEIGHT) - span_y * scale) / 2.0;

        Self {
            min_x,
            min_y,
            scale,
            offset_x,
            offset_y,
            span_y,
        }
    }

    #[allow(clippy::cast_possible_truncation)]
    fn to_pixel(&self, x: f64, y: f64) -> (i64, i64) {
        let px = (x - self.min_x) * self.scale + self.offset_x;
        // Flip: world y grows north, image y grows down.
        let py = (self.span_y - (y - self.min_y)) * self.scale + self.offset_y;
        (px.round() as i64, py.round() as i64)
    }
}

fn put_pixel(canvas: &mut RgbImage, x: i64, y: i64, color: Rgb<u8>) {
    if x >= 0 && y >= 0 && x < i64::from(MAP_WIDTH) && y < i64::from(MAP_HEIGHT) {
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        canvas.put_pixel(x as u32, y as u32, color);
    }
}

/// Plot a segment by stepping along its longer axis.
#[allow(clippy::cast_possible_truncation)]
fn draw_line(canvas: &mut RgbImage, from: (i64, i64), to: (i64, i64), color: Rgb<u8>) {
    let dx = to.0 - from.0;
    let dy = to.1 - from.1;
    let steps = dx.abs().max(dy.abs()).max(1);
    #[allow(clippy::cast_precision_loss)]
    for step in 0..=steps {
        let t = step as f64 / steps as f64;
        let x = (from.0 as f64 + dx as f64 * t).round() as i64;
        let y = (from.1 as f64 + dy as f64 * t).round() as i64;
        put_pixel(canvas, x, y, color);
    }
}

fn draw_cross(canvas: &mut RgbImage, cx: i64, cy: i64, color: Rgb<u8>) {
    for d in -4..=4 {
        put_pixel(canvas, cx + d, cy + d, color);
        put_pixel(canvas, cx + d, cy - d, color);
    }
}

/// 3x5 bitmaps for the digits 0-9, one row per byte, low three bits used.
const DIGITS: [[u8; 5]; 10] = [
    [0b111, 0b101, 0b101, 0b101, 0b111], // 0
    [0b010, 0b110, 0b010, 0b010, 0b111], // 1
    [0b111, 0b001, 0b111, 0b100, 0b111], // 2
    [0b111, 0b001, 0b111, 0b001, 0b111], // 3
    [0b101, 0b101, 0b111, 0b001, 0b001], // 4
    [0b111, 0b100, 0b111, 0b001, 0b111], // 5
    [0b111, 0b100, 0b111, 0b101, 0b111], // 6
    [0b111, 0b001, 0b010, 0b010, 0b010], // 7
    [0b111, 0b101, 0b111, 0b101, 0b111], // 8
    [0b111, 0b101, 0b111, 0b001, 0b111], // 9
];

/// Render a small decimal label, scaled 2x for legibility.
#[allow(clippy::cast_possible_wrap)]
fn draw_number(canvas: &mut RgbImage, x: i64, y: i64, value: u32, color: Rgb<u8>) {
    let digits: Vec<usize> = value
        .to_string()
        .bytes()
        .map(|b| usize::from(b - b'0'))
        .collect();

    for (index, &digit) in digits.iter().enumerate() {
        let origin_x = x + (index as i64) * 8;
        for (row, bits) in DIGITS[digit].iter().enumerate() {
            for col in 0..3_i64 {
                if bits >> (2 - col) & 1 == 1 {
                    let px = origin_x + col * 2;
                    let py = y + (row as i64) * 2;
                    for (ox, oy) in [(0, 0), (1, 0), (0, 1), (1, 1)] {
                        put_pixel(canvas, px + ox, py + oy, color);
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::model::{ContextualAnalysis, EntityId, LandmarkObservation, PoseSample, UNKNOWN};

    fn sample(timestamp_ms: u64, x: f64, y: f64) -> PoseSample {
        PoseSample {
            timestamp_ms,
            x,
            y,
            heading_degrees: 0.0,
        }
    }

    fn entity(id: EntityId, pose: Option<PoseSample>) -> LandmarkEntity {
        LandmarkEntity {
            id,
            representative: LandmarkObservation {
                timestamp_ms: 0,
                category: "crate".to_string(),
                description: UNKNOWN.to_string(),
                analysis: ContextualAnalysis::unknown(),
                jpeg: Vec::new(),
            },
            observed_timestamps_ms: vec![0],
            pose,
        }
    }

    fn track() -> PoseTrack {
        PoseTrack::from_samples(vec![
            sample(0, 0.0, 0.0),
            sample(1000, 1.0, 0.5),
            sample(2000, 2.0, 0.5),
        ])
        .unwrap()
    }

    #[test]
    fn renders_deterministically() {
        let entities = vec![entity(EntityId::first(), Some(sample(1000, 1.0, 0.5)))];
        let first = render(&track(), &entities);
        let second = render(&track(), &entities);
        assert_eq!(first.as_raw(), second.as_raw());
    }

    #[test]
    fn posed_entities_leave_marks() {
        let with_marker = render(&track(), &[entity(EntityId::first(), Some(sample(1000, 1.0, 0.5)))]);
        let without = render(&track(), &[]);
        assert_ne!(with_marker.as_raw(), without.as_raw());
    }

    #[test]
    fn unposed_entities_are_omitted() {
        let with_unposed = render(&track(), &[entity(EntityId::first(), None)]);
        let without = render(&track(), &[]);
        assert_eq!(with_unposed.as_raw(), without.as_raw());
    }

    #[test]
    fn empty_inputs_render_a_blank_canvas() {
        let canvas = render(&PoseTrack::empty(), &[]);
        assert_eq!(canvas.dimensions(), (MAP_WIDTH, MAP_HEIGHT));
        assert!(canvas.pixels().all(|p| *p == Rgb([255, 255, 255])));
    }

    #[test]
    fn single_pose_track_does_not_panic() {
        let track = PoseTrack::from_samples(vec![sample(0, 3.0, 3.0)]).unwrap();
        let canvas = render(&track, &[]);
        assert_eq!(canvas.dimensions(), (MAP_WIDTH, MAP_HEIGHT));
    }
}
