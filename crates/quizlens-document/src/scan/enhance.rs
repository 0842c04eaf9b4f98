// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Scan enhancement pipeline — turns a photographed exam page into a clean,
// high-contrast binary raster ready for text recognition.

use image::GrayImage;
use image::imageops::{self, FilterType};
use quizlens_core::error::{QuizlensError, Result};
use tracing::{debug, info, instrument};

use super::binarize;
use super::components;
use super::filters;
use super::profile::{Binarization, EnhancementProfile};
use super::skew;
use crate::image::processor::{ImageProcessor, rotate_gray_expand};
use crate::raster::RasterBuffer;

/// Ordered, append-only record of the stages that actually ran.
///
/// Diagnostics only; nothing downstream branches on it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnhancementReport {
    steps: Vec<String>,
}

impl EnhancementReport {
    pub fn push(&mut self, step: impl Into<String>) {
        self.steps.push(step.into());
    }

    pub fn steps(&self) -> &[String] {
        &self.steps
    }

    pub fn into_steps(self) -> Vec<String> {
        self.steps
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

/// Runs the eight enhancement stages over a grayscale working image.
///
/// Stages are consuming methods, each a no-op when its profile toggle is
/// off:
///
/// 1. Adaptive scaling
/// 2. Grayscale + denoise
/// 3. Contrast normalization
/// 4. Structure-aware sharpening
/// 5. Skew correction
/// 6. Adaptive binarization
/// 7. Morphological cleanup
/// 8. Connected-component filtering
///
/// A final bound check keeps the longer side within `max_dimension`, since
/// skew correction grows the canvas.
pub struct ScanEnhancer<'a> {
    gray: GrayImage,
    profile: &'a EnhancementProfile,
    report: EnhancementReport,
    binarized: bool,
}

impl<'a> ScanEnhancer<'a> {
    // -- Entry points ---------------------------------------------------------

    /// Enhance `image` with `profile`, returning an opaque grayscale raster.
    ///
    /// Fails only with [`QuizlensError::EmptyImage`] for a zero-area buffer.
    pub fn enhance(image: RasterBuffer, profile: &'a EnhancementProfile) -> Result<RasterBuffer> {
        Self::enhance_with_report(image, profile).map(|(raster, _)| raster)
    }

    /// Like [`enhance`](Self::enhance) but also returns the stage report.
    #[instrument(skip(image, profile), fields(
        width = image.width(),
        height = image.height(),
        profile = %profile.name,
    ))]
    pub fn enhance_with_report(
        image: RasterBuffer,
        profile: &'a EnhancementProfile,
    ) -> Result<(RasterBuffer, EnhancementReport)> {
        if image.is_empty() {
            return Err(QuizlensError::EmptyImage);
        }
        info!("Running scan enhancement pipeline");

        let enhanced = Self::scaled(image, profile)
            .denoise()
            .normalize_contrast()
            .enhance_structure()
            .deskew()
            .binarize()
            .clean_morphology()
            .filter_components()
            .bound_dimensions();

        let (w, h) = enhanced.gray.dimensions();
        info!(
            width = w,
            height = h,
            steps = enhanced.report.len(),
            "Scan enhancement complete"
        );
        Ok((RasterBuffer::from_gray_image(&enhanced.gray), enhanced.report))
    }

    // -- 1. Adaptive scaling --------------------------------------------------

    fn scaled(image: RasterBuffer, profile: &'a EnhancementProfile) -> Self {
        let mut report = EnhancementReport::default();
        let longest = image.max_dimension() as f32;

        let mut scale = 1.0f32;
        if profile.adaptive_scaling {
            let density = filters::content_density(&image.to_gray_image());
            scale = if density > profile.very_dense_threshold {
                profile.very_dense_scale
            } else if density > profile.dense_threshold {
                profile.dense_scale
            } else {
                profile.base_scale
            };
            if longest * scale < profile.min_long_side as f32 {
                scale = profile.min_long_side as f32 / longest;
            }
            debug!(density, scale, "Content density measured");
        }
        let cap = profile.max_dimension.max(1) as f32 / longest;
        scale = scale.min(cap);

        let raster = if (scale - 1.0).abs() > f32::EPSILON {
            report.push(format!("scale {:.2}x", scale));
            ImageProcessor::from_raster(image)
                .scale_by(scale as f64)
                .into_raster()
        } else {
            image
        };

        report.push("grayscale (BT.601)");
        Self {
            gray: raster.to_gray_image(),
            profile,
            report,
            binarized: false,
        }
    }

    // -- 2. Denoise -----------------------------------------------------------

    fn denoise(mut self) -> Self {
        if let Some(method) = self.profile.denoise {
            debug!(?method, "Denoising");
            self.gray = filters::denoise(&self.gray, method);
            self.report.push(format!("denoise {:?}", method));
        }
        self
    }

    // -- 3. Contrast normalization --------------------------------------------

    fn normalize_contrast(mut self) -> Self {
        if !self.profile.contrast_normalization {
            return self;
        }
        if let Some((stretched, low, high)) =
            filters::stretch_contrast(&self.gray, self.profile.clip_fraction)
        {
            debug!(low, high, "Contrast stretched");
            self.gray = stretched;
            self.report
                .push(format!("contrast stretch {}..{} -> 0..255", low, high));
        }
        self
    }

    // -- 4. Structure-aware sharpening ----------------------------------------

    fn enhance_structure(mut self) -> Self {
        if !self.profile.structure_enhancement || self.profile.sharpen_strength <= 0.0 {
            return self;
        }
        let (sharpened, blocks) = filters::sharpen_text_blocks(
            &self.gray,
            self.profile.block_size,
            self.profile.edge_density_threshold,
            self.profile.sharpen_strength,
        );
        if blocks > 0 {
            debug!(blocks, "Text blocks sharpened");
            self.gray = sharpened;
            self.report.push(format!("sharpen {} text blocks", blocks));
        }
        self
    }

    // -- 5. Skew correction ---------------------------------------------------

    fn deskew(mut self) -> Self {
        if !self.profile.deskew {
            return self;
        }
        match skew::estimate_skew(&self.gray) {
            Some(angle) if angle.abs() > self.profile.min_skew_degrees => {
                info!(angle, "Correcting skew");
                self.gray = rotate_gray_expand(&self.gray, -angle);
                self.report.push(format!("deskew {:.2} deg", -angle));
            }
            Some(angle) => debug!(angle, "Skew below threshold"),
            None => debug!("Too few edge pixels for skew estimation"),
        }
        self
    }

    // -- 6. Binarization ------------------------------------------------------

    fn binarize(mut self) -> Self {
        match self.profile.binarization {
            Some(Binarization::Sauvola { window_radius, k, r }) => {
                self.gray = binarize::sauvola(&self.gray, window_radius, k, r);
                self.report
                    .push(format!("binarize sauvola (radius {}, k {})", window_radius, k));
                self.binarized = true;
            }
            Some(Binarization::OtsuBlend {
                window_radius,
                local_weight,
                offset,
            }) => {
                self.gray = binarize::otsu_blend(&self.gray, window_radius, local_weight, offset);
                self.report.push(format!(
                    "binarize otsu blend (radius {}, weight {})",
                    window_radius, local_weight
                ));
                self.binarized = true;
            }
            None => {}
        }
        self
    }

    // -- 7. Morphology --------------------------------------------------------

    fn clean_morphology(mut self) -> Self {
        if self.profile.morphology && self.binarized && self.profile.morphology_radius > 0 {
            self.gray = filters::clean_ink(&self.gray, self.profile.morphology_radius);
            self.report.push(format!(
                "morphology open+close (radius {})",
                self.profile.morphology_radius
            ));
        }
        self
    }

    // -- 8. Connected components ----------------------------------------------

    fn filter_components(mut self) -> Self {
        if !(self.profile.component_filter && self.binarized) {
            return self;
        }
        let erased = components::filter_components(
            &mut self.gray,
            self.profile.min_component_area,
            self.profile.max_aspect_ratio,
        );
        debug!(erased, "Components filtered");
        self.report
            .push(format!("component filter erased {}", erased));
        self
    }

    // -- Final bound ----------------------------------------------------------

    fn bound_dimensions(mut self) -> Self {
        let (w, h) = self.gray.dimensions();
        let longest = w.max(h);
        let max = self.profile.max_dimension.max(1);
        if longest <= max {
            return self;
        }
        let factor = max as f64 / longest as f64;
        let nw = ((w as f64 * factor).floor() as u32).clamp(1, max);
        let nh = ((h as f64 * factor).floor() as u32).clamp(1, max);
        self.gray = imageops::resize(&self.gray, nw, nh, FilterType::Triangle);
        if self.binarized {
            filters::rethreshold(&mut self.gray, 128);
        }
        debug!(from = longest, to = nw.max(nh), "Output bounded");
        self.report.push(format!("bound to {}x{}", nw, nh));
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Photograph-like page: gray paper with dark text bars.
    fn sample_page(w: u32, h: u32) -> RasterBuffer {
        let mut raster = RasterBuffer::filled(w, h, [205, 200, 190, 255]);
        for y in 0..h {
            for x in 0..w {
                let in_line = (y % 24) >= 8 && (y % 24) < 14;
                let in_word = (x % 40) < 30;
                if in_line && in_word && x > 10 && x < w - 10 {
                    raster.set_pixel(x, y, [35, 30, 30, 255]);
                }
            }
        }
        raster
    }

    #[test]
    fn empty_image_is_rejected() {
        let empty = RasterBuffer::filled(0, 0, [0, 0, 0, 0]);
        assert!(matches!(
            ScanEnhancer::enhance(empty, &EnhancementProfile::general()),
            Err(QuizlensError::EmptyImage)
        ));
    }

    #[test]
    fn output_is_binary_and_records_steps() {
        let (out, report) =
            ScanEnhancer::enhance_with_report(sample_page(240, 160), &EnhancementProfile::general())
                .unwrap();
        assert!(out.pixels().chunks(4).all(|p| p[0] == 0 || p[0] == 255));
        assert!(report.steps().iter().any(|s| s.starts_with("binarize")));
        assert!(report.steps().iter().any(|s| s.starts_with("grayscale")));
        // Ink survives enhancement.
        assert!(out.dark_ratio(128) > 0.05);
    }

    #[test]
    fn small_input_is_upscaled_towards_min_side() {
        let profile = EnhancementProfile::general();
        let out = ScanEnhancer::enhance(sample_page(300, 200), &profile).unwrap();
        assert!(out.max_dimension() >= profile.min_long_side - 2);
    }

    #[test]
    fn output_never_exceeds_max_dimension() {
        let profile = EnhancementProfile::small_glyph().with_max_dimension(500);
        let out = ScanEnhancer::enhance(sample_page(400, 300), &profile).unwrap();
        assert!(out.max_dimension() <= 500);
    }

    #[test]
    fn disabled_stages_pass_gray_through() {
        let profile = EnhancementProfile {
            adaptive_scaling: false,
            denoise: None,
            contrast_normalization: false,
            structure_enhancement: false,
            deskew: false,
            binarization: None,
            morphology: false,
            component_filter: false,
            ..EnhancementProfile::general()
        };
        let (out, report) =
            ScanEnhancer::enhance_with_report(sample_page(120, 80), &profile).unwrap();
        assert_eq!((out.width(), out.height()), (120, 80));
        assert_eq!(report.steps(), ["grayscale (BT.601)"]);
    }
}
