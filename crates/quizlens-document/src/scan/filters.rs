// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Grayscale filters used by the enhancement stages: denoising, contrast
// stretching, edge density, structure-aware sharpening, and ink-layer
// morphology.

use image::imageops::{self, FilterType};
use image::{GrayImage, ImageBuffer, Luma};
use imageproc::distance_transform::Norm;
use imageproc::filter::{gaussian_blur_f32, median_filter};
use imageproc::gradients::{horizontal_sobel, vertical_sobel};
use imageproc::morphology;
use rayon::prelude::*;

use super::profile::DenoiseMethod;

/// Sobel magnitude (|gx| + |gy|) above which a pixel counts as an edge.
pub const EDGE_MAGNITUDE: i32 = 160;

/// Longest side of the sample used for density estimation.
pub const DENSITY_SAMPLE_SIDE: u32 = 256;

type Gradient = ImageBuffer<Luma<i16>, Vec<i16>>;

// -- Denoise ------------------------------------------------------------------

pub fn denoise(gray: &GrayImage, method: DenoiseMethod) -> GrayImage {
    match method {
        DenoiseMethod::Median { radius } => median_filter(gray, radius, radius),
        DenoiseMethod::Bilateral {
            radius,
            sigma_color,
            sigma_space,
        } => bilateral(gray, radius, sigma_color, sigma_space),
        DenoiseMethod::LightBlur { sigma } if sigma > 0.0 => gaussian_blur_f32(gray, sigma),
        DenoiseMethod::LightBlur { .. } => gray.clone(),
    }
}

/// Edge-preserving bilateral filter: each output pixel is the average of its
/// neighbourhood weighted by both spatial distance and intensity difference.
pub fn bilateral(gray: &GrayImage, radius: u32, sigma_color: f32, sigma_space: f32) -> GrayImage {
    let (width, height) = gray.dimensions();
    let mut output = GrayImage::new(width, height);
    if width == 0 || height == 0 || radius == 0 {
        return gray.clone();
    }

    let r = radius as i64;
    let space_denom = 2.0 * sigma_space.max(0.1).powi(2);
    let color_denom = 2.0 * sigma_color.max(0.1).powi(2);

    let mut spatial = Vec::with_capacity(((2 * r + 1) * (2 * r + 1)) as usize);
    for dy in -r..=r {
        for dx in -r..=r {
            spatial.push((-((dx * dx + dy * dy) as f32) / space_denom).exp());
        }
    }
    let colour: Vec<f32> = (0..256)
        .map(|d| (-((d * d) as f32) / color_denom).exp())
        .collect();

    output
        .par_chunks_mut(width as usize)
        .enumerate()
        .for_each(|(y, row)| {
            let y = y as i64;
            for (x, out) in row.iter_mut().enumerate() {
                let x = x as i64;
                let centre = gray.get_pixel(x as u32, y as u32).0[0] as i32;
                let mut weighted = 0.0f32;
                let mut total = 0.0f32;
                let mut k = 0;
                for dy in -r..=r {
                    for dx in -r..=r {
                        let (nx, ny) = (x + dx, y + dy);
                        if nx >= 0 && ny >= 0 && nx < width as i64 && ny < height as i64 {
                            let v = gray.get_pixel(nx as u32, ny as u32).0[0] as i32;
                            let w = spatial[k] * colour[(v - centre).unsigned_abs() as usize];
                            weighted += w * v as f32;
                            total += w;
                        }
                        k += 1;
                    }
                }
                *out = if total > 0.0 {
                    (weighted / total).round().clamp(0.0, 255.0) as u8
                } else {
                    centre as u8
                };
            }
        });
    output
}

// -- Contrast normalization ----------------------------------------------------

/// Clip `clip_fraction` of the pixel mass at each end of the histogram and
/// stretch the remaining range linearly to 0..255. Returns `None` when the
/// image is flat and nothing would change.
pub fn stretch_contrast(gray: &GrayImage, clip_fraction: f32) -> Option<(GrayImage, u8, u8)> {
    let total = gray.width() as u64 * gray.height() as u64;
    if total == 0 {
        return None;
    }

    let mut histogram = [0u64; 256];
    for p in gray.pixels() {
        histogram[p.0[0] as usize] += 1;
    }

    let clip = (total as f64 * clip_fraction.clamp(0.0, 0.49) as f64) as u64;
    let mut low = 0usize;
    let mut acc = 0u64;
    for (level, &count) in histogram.iter().enumerate() {
        acc += count;
        if acc > clip {
            low = level;
            break;
        }
    }
    let mut high = 255usize;
    acc = 0;
    for (level, &count) in histogram.iter().enumerate().rev() {
        acc += count;
        if acc > clip {
            high = level;
            break;
        }
    }

    if high <= low || (low == 0 && high == 255) {
        return None;
    }

    let span = (high - low) as f32;
    let mut lut = [0u8; 256];
    for (level, slot) in lut.iter_mut().enumerate() {
        let v = (level as f32 - low as f32) * 255.0 / span;
        *slot = v.round().clamp(0.0, 255.0) as u8;
    }

    let mut output = gray.clone();
    output.par_iter_mut().for_each(|v| *v = lut[*v as usize]);
    Some((output, low as u8, high as u8))
}

// -- Edges --------------------------------------------------------------------

fn gradients(gray: &GrayImage) -> (Gradient, Gradient) {
    (horizontal_sobel(gray), vertical_sobel(gray))
}

fn is_edge(gx: &Gradient, gy: &Gradient, x: u32, y: u32) -> bool {
    let m = (gx.get_pixel(x, y).0[0] as i32).abs() + (gy.get_pixel(x, y).0[0] as i32).abs();
    m > EDGE_MAGNITUDE
}

/// Share of strong-gradient pixels, measured on a down-sampled copy whose
/// longer side is at most [`DENSITY_SAMPLE_SIDE`].
pub fn content_density(gray: &GrayImage) -> f32 {
    let (w, h) = gray.dimensions();
    let longest = w.max(h);
    if longest == 0 {
        return 0.0;
    }
    let sample = if longest > DENSITY_SAMPLE_SIDE {
        let f = DENSITY_SAMPLE_SIDE as f32 / longest as f32;
        let sw = ((w as f32 * f).round() as u32).max(1);
        let sh = ((h as f32 * f).round() as u32).max(1);
        imageops::resize(gray, sw, sh, FilterType::Triangle)
    } else {
        gray.clone()
    };

    let (gx, gy) = gradients(&sample);
    let (sw, sh) = sample.dimensions();
    let mut edges = 0u64;
    for y in 0..sh {
        for x in 0..sw {
            if is_edge(&gx, &gy, x, y) {
                edges += 1;
            }
        }
    }
    edges as f32 / (sw as f32 * sh as f32)
}

// -- Structure-aware sharpening -------------------------------------------------

/// Sharpen only the blocks whose edge density exceeds `threshold` with a
/// Laplacian unsharp kernel; flat background blocks pass through untouched.
///
/// Returns the output image and the number of sharpened blocks.
pub fn sharpen_text_blocks(
    gray: &GrayImage,
    block_size: u32,
    threshold: f32,
    strength: f32,
) -> (GrayImage, usize) {
    let (width, height) = gray.dimensions();
    let block = block_size.max(1);
    let blocks_x = width.div_ceil(block);
    let blocks_y = height.div_ceil(block);
    if width == 0 || height == 0 {
        return (gray.clone(), 0);
    }

    let (gx, gy) = gradients(gray);
    let mut mask = vec![false; (blocks_x * blocks_y) as usize];
    for by in 0..blocks_y {
        for bx in 0..blocks_x {
            let x0 = bx * block;
            let y0 = by * block;
            let x1 = (x0 + block).min(width);
            let y1 = (y0 + block).min(height);
            let mut edges = 0u32;
            for y in y0..y1 {
                for x in x0..x1 {
                    if is_edge(&gx, &gy, x, y) {
                        edges += 1;
                    }
                }
            }
            let area = ((x1 - x0) * (y1 - y0)) as f32;
            mask[(by * blocks_x + bx) as usize] = edges as f32 / area > threshold;
        }
    }
    let sharpened_blocks = mask.iter().filter(|&&m| m).count();
    if sharpened_blocks == 0 {
        return (gray.clone(), 0);
    }

    let mut output = gray.clone();
    output
        .par_chunks_mut(width as usize)
        .enumerate()
        .for_each(|(y, row)| {
            let y = y as u32;
            let by = y / block;
            for (x, out) in row.iter_mut().enumerate() {
                let x = x as u32;
                if !mask[(by * blocks_x + x / block) as usize] {
                    continue;
                }
                let centre = gray.get_pixel(x, y).0[0] as f32;
                let sample = |nx: i64, ny: i64| {
                    let cx = nx.clamp(0, width as i64 - 1) as u32;
                    let cy = ny.clamp(0, height as i64 - 1) as u32;
                    gray.get_pixel(cx, cy).0[0] as f32
                };
                let (xi, yi) = (x as i64, y as i64);
                let laplacian = 4.0 * centre
                    - sample(xi - 1, yi)
                    - sample(xi + 1, yi)
                    - sample(xi, yi - 1)
                    - sample(xi, yi + 1);
                *out = (centre + strength * laplacian).round().clamp(0.0, 255.0) as u8;
            }
        });
    (output, sharpened_blocks)
}

// -- Morphology ---------------------------------------------------------------

/// Open then close the ink layer (black pixels) with an LInf structuring
/// element of `radius`.
///
/// `imageproc` treats non-zero pixels as foreground, so the binary image is
/// inverted around the operation.
pub fn clean_ink(binary: &GrayImage, radius: u8) -> GrayImage {
    if radius == 0 {
        return binary.clone();
    }
    let mut ink = binary.clone();
    imageops::invert(&mut ink);
    let opened = morphology::open(&ink, Norm::LInf, radius);
    let mut closed = morphology::close(&opened, Norm::LInf, radius);
    imageops::invert(&mut closed);
    closed
}

/// Force every pixel to 0 or 255.
pub fn rethreshold(gray: &mut GrayImage, level: u8) {
    gray.par_iter_mut()
        .for_each(|v| *v = if *v < level { 0 } else { 255 });
}
