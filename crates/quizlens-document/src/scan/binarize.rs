// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Adaptive binarization — Sauvola local thresholding and Otsu blended with the
// local mean, both driven by summed-area tables.

use image::GrayImage;
use rayon::prelude::*;

/// Summed-area tables of pixel values and squared pixel values.
///
/// `sum[y * (width+1) + x]` holds the sum over the rectangle [0, 0)..(x, y)
/// (exclusive on both axes); both tables carry a zero-padded border.
pub struct IntegralImage {
    width: u32,
    height: u32,
    sum: Vec<u64>,
    sum_sq: Vec<u64>,
}

impl IntegralImage {
    pub fn new(gray: &GrayImage) -> Self {
        let (w, h) = gray.dimensions();
        let stride = (w + 1) as usize;
        let mut sum = vec![0u64; stride * (h + 1) as usize];
        let mut sum_sq = vec![0u64; stride * (h + 1) as usize];

        for y in 0..h {
            let mut row_sum: u64 = 0;
            let mut row_sq: u64 = 0;
            for x in 0..w {
                let v = gray.get_pixel(x, y).0[0] as u64;
                row_sum += v;
                row_sq += v * v;
                let idx = (y + 1) as usize * stride + (x + 1) as usize;
                let above = y as usize * stride + (x + 1) as usize;
                sum[idx] = row_sum + sum[above];
                sum_sq[idx] = row_sq + sum_sq[above];
            }
        }

        Self {
            width: w,
            height: h,
            sum,
            sum_sq,
        }
    }

    /// Mean and standard deviation of the square window of `radius` centred
    /// on (cx, cy), clamped to the image.
    pub fn window_stats(&self, cx: u32, cy: u32, radius: u32) -> (f64, f64) {
        let stride = (self.width + 1) as usize;
        let x1 = cx.saturating_sub(radius) as usize;
        let y1 = cy.saturating_sub(radius) as usize;
        let x2 = ((cx + radius + 1) as usize).min(self.width as usize);
        let y2 = ((cy + radius + 1) as usize).min(self.height as usize);

        let area = ((x2 - x1) * (y2 - y1)) as f64;
        if area == 0.0 {
            return (128.0, 0.0);
        }

        let rect = |table: &[u64]| {
            table[y2 * stride + x2] as f64 - table[y1 * stride + x2] as f64
                - table[y2 * stride + x1] as f64
                + table[y1 * stride + x1] as f64
        };

        let mean = rect(&self.sum) / area;
        let variance = (rect(&self.sum_sq) / area - mean * mean).max(0.0);
        (mean, variance.sqrt())
    }
}

/// Sauvola thresholding: `t = m · (1 + k · (s / r − 1))`.
///
/// Pixels at or below their local threshold become black (0), the rest white.
/// The inclusive comparison keeps solid ink interiors (m = s = 0) black.
pub fn sauvola(gray: &GrayImage, window_radius: u32, k: f32, r: f32) -> GrayImage {
    let integral = IntegralImage::new(gray);
    let (k, r) = (k as f64, (r as f64).max(1.0));
    threshold_rows(gray, |x, y| {
        let (mean, std) = integral.window_stats(x, y, window_radius);
        mean * (1.0 + k * (std / r - 1.0))
    })
}

/// Global Otsu level blended with the local mean:
/// `t = (1 − w) · otsu + w · (m − offset)`.
pub fn otsu_blend(gray: &GrayImage, window_radius: u32, local_weight: f32, offset: f32) -> GrayImage {
    let integral = IntegralImage::new(gray);
    let global = otsu_threshold(gray) as f64;
    let w = (local_weight as f64).clamp(0.0, 1.0);
    let offset = offset as f64;
    threshold_rows(gray, |x, y| {
        let (mean, _) = integral.window_stats(x, y, window_radius);
        (1.0 - w) * global + w * (mean - offset)
    })
}

/// Apply a per-pixel threshold function, one row per rayon task.
fn threshold_rows<F>(gray: &GrayImage, threshold: F) -> GrayImage
where
    F: Fn(u32, u32) -> f64 + Sync,
{
    let (width, height) = gray.dimensions();
    let mut output = GrayImage::new(width, height);
    if width == 0 || height == 0 {
        return output;
    }
    output
        .par_chunks_mut(width as usize)
        .enumerate()
        .for_each(|(y, row)| {
            let y = y as u32;
            for (x, out) in row.iter_mut().enumerate() {
                let x = x as u32;
                let value = gray.get_pixel(x, y).0[0] as f64;
                *out = if value <= threshold(x, y) { 0 } else { 255 };
            }
        });
    output
}

/// Compute the Otsu threshold for a grayscale image.
///
/// Finds the level that maximises the between-class variance of the dark and
/// light pixel groups.
pub fn otsu_threshold(gray: &GrayImage) -> u8 {
    let mut histogram = [0u64; 256];
    for pixel in gray.pixels() {
        histogram[pixel.0[0] as usize] += 1;
    }

    let total_pixels = gray.width() as u64 * gray.height() as u64;
    if total_pixels == 0 {
        return 128;
    }

    let mut sum_total: f64 = 0.0;
    for (i, &count) in histogram.iter().enumerate() {
        sum_total += i as f64 * count as f64;
    }

    let mut sum_background: f64 = 0.0;
    let mut weight_background: u64 = 0;
    let mut max_variance: f64 = 0.0;
    let mut best_threshold: u8 = 0;

    for (t, &count) in histogram.iter().enumerate() {
        weight_background += count;
        if weight_background == 0 {
            continue;
        }
        let weight_foreground = total_pixels - weight_background;
        if weight_foreground == 0 {
            break;
        }

        sum_background += t as f64 * count as f64;
        let mean_background = sum_background / weight_background as f64;
        let mean_foreground = (sum_total - sum_background) / weight_foreground as f64;

        let between_variance = weight_background as f64
            * weight_foreground as f64
            * (mean_background - mean_foreground).powi(2);

        if between_variance > max_variance {
            max_variance = between_variance;
            best_threshold = t as u8;
        }
    }

    // Pixels strictly below the returned level are dark; the best split puts
    // level `best_threshold` itself in the dark class.
    best_threshold.saturating_add(1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;

    /// White page with a dark 10×10 square in the middle.
    fn page_with_square() -> GrayImage {
        let mut img = GrayImage::from_pixel(60, 60, Luma([230u8]));
        for y in 25..35 {
            for x in 25..35 {
                img.put_pixel(x, y, Luma([20u8]));
            }
        }
        img
    }

    #[test]
    fn window_stats_of_uniform_image() {
        let img = GrayImage::from_pixel(10, 10, Luma([100u8]));
        let integral = IntegralImage::new(&img);
        let (mean, std) = integral.window_stats(5, 5, 2);
        assert!((mean - 100.0).abs() < 1e-9);
        assert!(std.abs() < 1e-9);
    }

    #[test]
    fn window_stats_clamp_at_corner() {
        let img = GrayImage::from_pixel(4, 4, Luma([50u8]));
        let integral = IntegralImage::new(&img);
        let (mean, _) = integral.window_stats(0, 0, 10);
        assert!((mean - 50.0).abs() < 1e-9);
    }

    #[test]
    fn otsu_splits_bimodal_histogram() {
        let t = otsu_threshold(&page_with_square());
        assert!(t > 20 && t <= 230, "threshold {t} should separate 20 from 230");
    }

    #[test]
    fn sauvola_keeps_square_and_clears_background() {
        let out = sauvola(&page_with_square(), 12, 0.34, 128.0);
        assert_eq!(out.get_pixel(30, 30).0[0], 0);
        assert_eq!(out.get_pixel(5, 5).0[0], 255);
    }

    #[test]
    fn otsu_blend_keeps_square_and_clears_background() {
        let out = otsu_blend(&page_with_square(), 10, 0.5, 8.0);
        assert_eq!(out.get_pixel(30, 30).0[0], 0);
        assert_eq!(out.get_pixel(5, 5).0[0], 255);
    }

    #[test]
    fn uniform_page_stays_white_under_sauvola() {
        let img = GrayImage::from_pixel(20, 20, Luma([200u8]));
        let out = sauvola(&img, 5, 0.34, 128.0);
        assert!(out.pixels().all(|p| p.0[0] == 255));
    }
}
