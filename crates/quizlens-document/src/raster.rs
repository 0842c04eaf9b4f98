// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// RasterBuffer — the owned RGBA pixel grid passed between pipeline stages.

use image::{GrayImage, RgbaImage};
use quizlens_core::error::{QuizlensError, Result};

/// Bytes per pixel (R, G, B, A).
pub const CHANNELS: usize = 4;

/// An owned `width × height × 4` RGBA pixel buffer.
///
/// Each pipeline stage takes ownership of the buffer it receives and hands a
/// (possibly new) buffer back, so no stage ever shares pixels with another.
/// `pixels.len() == width * height * 4` always holds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RasterBuffer {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
}

impl RasterBuffer {
    // -- Construction ---------------------------------------------------------

    /// Wrap raw RGBA bytes, checking the length invariant.
    pub fn new(width: u32, height: u32, pixels: Vec<u8>) -> Result<Self> {
        let expected = width as usize * height as usize * CHANNELS;
        if pixels.len() != expected {
            return Err(QuizlensError::InvalidRaster {
                expected,
                actual: pixels.len(),
            });
        }
        Ok(Self {
            width,
            height,
            pixels,
        })
    }

    /// A buffer filled with a single colour.
    pub fn filled(width: u32, height: u32, rgba: [u8; 4]) -> Self {
        let count = width as usize * height as usize;
        let mut pixels = Vec::with_capacity(count * CHANNELS);
        for _ in 0..count {
            pixels.extend_from_slice(&rgba);
        }
        Self {
            width,
            height,
            pixels,
        }
    }

    /// Expand a grayscale image into opaque RGBA.
    pub fn from_gray_image(gray: &GrayImage) -> Self {
        let (width, height) = gray.dimensions();
        let mut pixels = Vec::with_capacity(gray.as_raw().len() * CHANNELS);
        for &v in gray.as_raw() {
            pixels.extend_from_slice(&[v, v, v, 255]);
        }
        Self {
            width,
            height,
            pixels,
        }
    }

    pub fn from_rgba_image(image: RgbaImage) -> Self {
        let (width, height) = image.dimensions();
        Self {
            width,
            height,
            pixels: image.into_raw(),
        }
    }

    // -- Accessors ------------------------------------------------------------

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// The larger of width and height.
    pub fn max_dimension(&self) -> u32 {
        self.width.max(self.height)
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Raw RGBA bytes, row-major.
    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    pub fn into_pixels(self) -> Vec<u8> {
        self.pixels
    }

    /// RGBA value at (x, y). Panics when out of bounds.
    pub fn pixel(&self, x: u32, y: u32) -> [u8; 4] {
        let i = self.offset(x, y);
        [
            self.pixels[i],
            self.pixels[i + 1],
            self.pixels[i + 2],
            self.pixels[i + 3],
        ]
    }

    pub fn set_pixel(&mut self, x: u32, y: u32, rgba: [u8; 4]) {
        let i = self.offset(x, y);
        self.pixels[i..i + CHANNELS].copy_from_slice(&rgba);
    }

    fn offset(&self, x: u32, y: u32) -> usize {
        (y as usize * self.width as usize + x as usize) * CHANNELS
    }

    // -- Luminance helpers ----------------------------------------------------

    /// BT.601 luminance at (x, y). Transparent pixels read as white.
    pub fn luminance_at(&self, x: u32, y: u32) -> u8 {
        let [r, g, b, a] = self.pixel(x, y);
        luminance(r, g, b, a)
    }

    /// Luminance plane, one byte per pixel.
    pub fn luminance(&self) -> Vec<u8> {
        self.pixels
            .chunks_exact(CHANNELS)
            .map(|p| luminance(p[0], p[1], p[2], p[3]))
            .collect()
    }

    /// Luminance plane as an `image::GrayImage`.
    pub fn to_gray_image(&self) -> GrayImage {
        GrayImage::from_vec(self.width, self.height, self.luminance())
            .unwrap_or_else(|| GrayImage::new(self.width, self.height))
    }

    pub fn to_rgba_image(&self) -> RgbaImage {
        RgbaImage::from_vec(self.width, self.height, self.pixels.clone())
            .unwrap_or_else(|| RgbaImage::new(self.width, self.height))
    }

    pub fn into_rgba_image(self) -> RgbaImage {
        let (width, height) = (self.width, self.height);
        RgbaImage::from_vec(width, height, self.pixels)
            .unwrap_or_else(|| RgbaImage::new(width, height))
    }

    /// Fraction of pixels darker than `threshold` (0.0 for an empty buffer).
    pub fn dark_ratio(&self, threshold: u8) -> f64 {
        if self.is_empty() {
            return 0.0;
        }
        let dark = self
            .pixels
            .chunks_exact(CHANNELS)
            .filter(|p| luminance(p[0], p[1], p[2], p[3]) < threshold)
            .count();
        dark as f64 / (self.width as f64 * self.height as f64)
    }
}

/// BT.601 weighted luminance, compositing over white for partial alpha.
pub fn luminance(r: u8, g: u8, b: u8, a: u8) -> u8 {
    let y = 0.299 * r as f32 + 0.587 * g as f32 + 0.114 * b as f32;
    let alpha = a as f32 / 255.0;
    let composited = y * alpha + 255.0 * (1.0 - alpha);
    composited.round().clamp(0.0, 255.0) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_wrong_length() {
        let err = RasterBuffer::new(2, 2, vec![0; 15]).unwrap_err();
        assert!(matches!(
            err,
            QuizlensError::InvalidRaster {
                expected: 16,
                actual: 15
            }
        ));
    }

    #[test]
    fn luminance_weights_green_heaviest() {
        assert_eq!(luminance(0, 255, 0, 255), 150);
        assert_eq!(luminance(255, 0, 0, 255), 76);
        assert_eq!(luminance(0, 0, 255, 255), 29);
    }

    #[test]
    fn transparent_pixels_read_as_white() {
        assert_eq!(luminance(0, 0, 0, 0), 255);
    }

    #[test]
    fn gray_round_trip_keeps_dimensions() {
        let buf = RasterBuffer::filled(7, 3, [10, 10, 10, 255]);
        let gray = buf.to_gray_image();
        assert_eq!(gray.dimensions(), (7, 3));
        let back = RasterBuffer::from_gray_image(&gray);
        assert_eq!(back, buf);
    }

    #[test]
    fn set_and_read_pixel() {
        let mut buf = RasterBuffer::filled(4, 4, [255, 255, 255, 255]);
        buf.set_pixel(2, 3, [0, 0, 0, 255]);
        assert_eq!(buf.pixel(2, 3), [0, 0, 0, 255]);
        assert_eq!(buf.luminance_at(2, 3), 0);
        assert!((buf.dark_ratio(128) - 1.0 / 16.0).abs() < 1e-9);
    }
}
