// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Image processor — decoding into raster buffers, resizing, canvas-expanding
// rotation of grayscale pages, and PNG encoding. Operates on in-memory images
// using the `image` and `imageproc` crates.

use image::imageops::FilterType;
use image::{DynamicImage, GrayImage, ImageFormat, Luma};
use imageproc::geometric_transformations::{Interpolation, Projection, warp_into};
use quizlens_core::error::QuizlensError;
use tracing::{debug, info, instrument};

use crate::raster::RasterBuffer;

/// Image processing pipeline operating on a single in-memory image.
///
/// All operations consume `self` and return a new `ImageProcessor` wrapping
/// the transformed image, enabling method chaining.
///
/// ```ignore
/// let raster = ImageProcessor::from_bytes(&bytes)?
///     .scale_by(1.5)
///     .into_raster();
/// ```
pub struct ImageProcessor {
    image: DynamicImage,
}

impl ImageProcessor {
    // -- Construction ---------------------------------------------------------

    /// Decode raw encoded bytes (JPEG, PNG, WebP, ...).
    #[instrument(skip(data), fields(data_len = data.len()))]
    pub fn from_bytes(data: &[u8]) -> Result<Self, QuizlensError> {
        if data.is_empty() {
            return Err(QuizlensError::EmptyImage);
        }
        let img = image::load_from_memory(data).map_err(|err| {
            QuizlensError::InvalidImage(format!("failed to decode image: {}", err))
        })?;
        debug!(
            width = img.width(),
            height = img.height(),
            "Image decoded from bytes"
        );
        Ok(Self { image: img })
    }

    /// Decode encoded bytes straight into a [`RasterBuffer`].
    pub fn decode(data: &[u8]) -> Result<RasterBuffer, QuizlensError> {
        Self::from_bytes(data).map(Self::into_raster)
    }

    pub fn from_raster(raster: RasterBuffer) -> Self {
        Self {
            image: DynamicImage::ImageRgba8(raster.into_rgba_image()),
        }
    }

    // -- Conversion -----------------------------------------------------------

    /// Convert to the RGBA raster buffer used by the pipeline.
    pub fn into_raster(self) -> RasterBuffer {
        RasterBuffer::from_rgba_image(self.image.to_rgba8())
    }

    // -- Transformations (consume self, return new Self) -----------------------

    /// Resize by a uniform factor. Uses Lanczos3 when shrinking and
    /// Catmull-Rom when enlarging.
    #[instrument(skip(self), fields(factor))]
    pub fn scale_by(self, factor: f64) -> Self {
        let (w, h) = (self.image.width(), self.image.height());
        let new_w = ((w as f64 * factor).round() as u32).max(1);
        let new_h = ((h as f64 * factor).round() as u32).max(1);
        if (new_w, new_h) == (w, h) {
            return self;
        }
        let filter = if factor < 1.0 {
            FilterType::Lanczos3
        } else {
            FilterType::CatmullRom
        };
        info!(from_w = w, from_h = h, new_w, new_h, "Resizing image");
        Self {
            image: self.image.resize_exact(new_w, new_h, filter),
        }
    }

    // -- Output ---------------------------------------------------------------

    /// Encode the current image as PNG bytes.
    pub fn to_png_bytes(&self) -> Result<Vec<u8>, QuizlensError> {
        let mut buffer = Vec::new();
        let mut cursor = std::io::Cursor::new(&mut buffer);
        self.image
            .write_to(&mut cursor, ImageFormat::Png)
            .map_err(|err| QuizlensError::InvalidImage(format!("PNG encoding failed: {}", err)))?;
        Ok(buffer)
    }
}

// -- Canvas-expanding rotation --------------------------------------------------

/// Size of the bounding box of a `width × height` rectangle rotated by
/// `radians`.
pub fn rotated_bounds(width: u32, height: u32, radians: f32) -> (u32, u32) {
    let (sin, cos) = (radians.sin().abs(), radians.cos().abs());
    let w = width as f32 * cos + height as f32 * sin;
    let h = width as f32 * sin + height as f32 * cos;
    ((w.ceil() as u32).max(1), (h.ceil() as u32).max(1))
}

/// Projection that rotates about the source centre and recentres the result
/// on a canvas of `out_w × out_h`.
fn centred_rotation(width: u32, height: u32, radians: f32, out_w: u32, out_h: u32) -> Projection {
    Projection::translate(-(width as f32) / 2.0, -(height as f32) / 2.0)
        .and_then(Projection::rotate(radians))
        .and_then(Projection::translate(out_w as f32 / 2.0, out_h as f32 / 2.0))
}

/// Rotate a grayscale image clockwise by `degrees`, growing the canvas and
/// filling uncovered pixels with white.
pub fn rotate_gray_expand(image: &GrayImage, degrees: f32) -> GrayImage {
    let radians = degrees.to_radians();
    let (w, h) = image.dimensions();
    let (out_w, out_h) = rotated_bounds(w, h, radians);
    let projection = centred_rotation(w, h, radians, out_w, out_h);
    let mut output = GrayImage::new(out_w, out_h);
    warp_into(
        image,
        &projection,
        Interpolation::Bilinear,
        Luma([255u8]),
        &mut output,
    );
    output
}
