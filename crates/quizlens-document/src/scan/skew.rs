// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Skew estimation from gradient orientation at edge pixels.

use image::GrayImage;
use imageproc::gradients::{horizontal_sobel, vertical_sobel};

/// Edge strength required before a pixel votes on the skew angle.
const SKEW_EDGE_MAGNITUDE: f32 = 200.0;

/// Lines steeper than this are character stems, not text lines.
const MAX_LINE_ANGLE: f32 = 45.0;

/// Fewer votes than this and the estimate is not trusted.
pub const MIN_SAMPLES: usize = 50;

/// Estimate the dominant text-line angle in degrees.
///
/// Positive values mean lines fall to the right (clockwise tilt in image
/// coordinates). Returns `None` when too few edge pixels vote.
pub fn estimate_skew(gray: &GrayImage) -> Option<f32> {
    let (width, height) = gray.dimensions();
    if width < 3 || height < 3 {
        return None;
    }

    let gx = horizontal_sobel(gray);
    let gy = vertical_sobel(gray);

    // Large pages are sampled on a grid; a few thousand votes are plenty.
    let step = ((width as u64 * height as u64 / 250_000) as f64).sqrt().max(1.0) as u32;

    let mut angles = Vec::new();
    for y in (1..height - 1).step_by(step as usize) {
        for x in (1..width - 1).step_by(step as usize) {
            let dx = gx.get_pixel(x, y).0[0] as f32;
            let dy = gy.get_pixel(x, y).0[0] as f32;
            if dx.abs() + dy.abs() < SKEW_EDGE_MAGNITUDE {
                continue;
            }
            let line = normalise_line_angle(dy.atan2(dx).to_degrees() - 90.0);
            if line.abs() <= MAX_LINE_ANGLE {
                angles.push(line);
            }
        }
    }

    if angles.len() < MIN_SAMPLES {
        return None;
    }
    angles.sort_by(|a, b| a.total_cmp(b));
    Some(angles[angles.len() / 2])
}

/// Fold an angle into (-90, 90].
fn normalise_line_angle(mut degrees: f32) -> f32 {
    while degrees > 90.0 {
        degrees -= 180.0;
    }
    while degrees <= -90.0 {
        degrees += 180.0;
    }
    degrees
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image::processor::rotate_gray_expand;
    use image::Luma;

    fn ruled_page() -> GrayImage {
        GrayImage::from_fn(400, 300, |x, y| {
            if x > 40 && x < 360 && y > 30 && (y - 30) % 30 < 4 && y < 270 {
                Luma([0])
            } else {
                Luma([255])
            }
        })
    }

    #[test]
    fn normalise_folds_into_half_open_range() {
        assert_eq!(normalise_line_angle(-180.0), 0.0);
        assert_eq!(normalise_line_angle(95.0), -85.0);
        assert_eq!(normalise_line_angle(90.0), 90.0);
    }

    #[test]
    fn level_lines_have_no_skew() {
        let skew = estimate_skew(&ruled_page()).unwrap();
        assert!(skew.abs() < 0.5, "skew {skew}");
    }

    #[test]
    fn rotated_lines_report_signed_tilt() {
        for tilt in [5.0f32, -5.0] {
            let tilted = rotate_gray_expand(&ruled_page(), tilt);
            let skew = estimate_skew(&tilted).unwrap();
            assert_eq!(skew.signum(), tilt.signum(), "tilt {tilt} skew {skew}");
            assert!((skew - tilt).abs() < 1.0, "tilt {tilt} skew {skew}");
        }
    }

    #[test]
    fn rotating_back_by_the_estimate_levels_the_lines() {
        for tilt in [5.0f32, -5.0] {
            let tilted = rotate_gray_expand(&ruled_page(), tilt);
            let skew = estimate_skew(&tilted).unwrap();
            let levelled = rotate_gray_expand(&tilted, -skew);
            let residual = estimate_skew(&levelled).unwrap();
            assert!(residual.abs() < 0.5, "tilt {tilt} residual {residual}");
        }
    }

    #[test]
    fn blank_page_has_no_estimate() {
        let blank = GrayImage::from_pixel(200, 200, Luma([255u8]));
        assert!(estimate_skew(&blank).is_none());
    }
}
