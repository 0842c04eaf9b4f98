// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Enhancement profiles — one parameter set per content class, all driving the
// same eight-stage pipeline.

use quizlens_core::EnhancementPreset;
use serde::{Deserialize, Serialize};

/// Default cap on the longer side of the enhanced image.
pub const DEFAULT_MAX_DIMENSION: u32 = 6000;

/// Noise filter applied after grayscale conversion.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DenoiseMethod {
    Median { radius: u32 },
    Bilateral {
        radius: u32,
        sigma_color: f32,
        sigma_space: f32,
    },
    LightBlur { sigma: f32 },
}

/// Thresholding strategy for the binarization stage.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Binarization {
    /// `t = m · (1 + k · (s / r − 1))` over a square window.
    Sauvola { window_radius: u32, k: f32, r: f32 },
    /// Global Otsu level blended with the local mean minus `offset`.
    OtsuBlend {
        window_radius: u32,
        local_weight: f32,
        offset: f32,
    },
}

/// Full parameter set for [`ScanEnhancer::enhance`](super::ScanEnhancer::enhance).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnhancementProfile {
    pub name: String,

    // 1. Adaptive scaling
    pub adaptive_scaling: bool,
    /// Scale for sparse content.
    pub base_scale: f32,
    /// Scale once density exceeds `dense_threshold`.
    pub dense_scale: f32,
    /// Scale once density exceeds `very_dense_threshold`.
    pub very_dense_scale: f32,
    pub dense_threshold: f32,
    pub very_dense_threshold: f32,
    /// Inputs whose longer side is below this are enlarged towards it.
    pub min_long_side: u32,
    /// Hard cap on the longer side of the output.
    pub max_dimension: u32,

    // 2. Denoise
    pub denoise: Option<DenoiseMethod>,

    // 3. Contrast normalization
    pub contrast_normalization: bool,
    /// Fraction of pixel mass clipped at each end of the histogram.
    pub clip_fraction: f32,

    // 4. Structure-aware sharpening
    pub structure_enhancement: bool,
    pub block_size: u32,
    /// Edge-pixel share above which a block counts as text.
    pub edge_density_threshold: f32,
    pub sharpen_strength: f32,

    // 5. Skew
    pub deskew: bool,
    /// Rotations smaller than this are skipped.
    pub min_skew_degrees: f32,

    // 6. Binarization
    pub binarization: Option<Binarization>,

    // 7. Morphology
    pub morphology: bool,
    pub morphology_radius: u8,

    // 8. Connected components
    pub component_filter: bool,
    pub min_component_area: u32,
    pub max_aspect_ratio: f32,
}

impl EnhancementProfile {
    /// Ordinary printed question text.
    pub fn general() -> Self {
        Self {
            name: "general".into(),
            adaptive_scaling: true,
            base_scale: 1.0,
            dense_scale: 1.5,
            very_dense_scale: 2.0,
            dense_threshold: 0.08,
            very_dense_threshold: 0.16,
            min_long_side: 1200,
            max_dimension: DEFAULT_MAX_DIMENSION,
            denoise: Some(DenoiseMethod::Median { radius: 1 }),
            contrast_normalization: true,
            clip_fraction: 0.005,
            structure_enhancement: true,
            block_size: 16,
            edge_density_threshold: 0.12,
            sharpen_strength: 0.5,
            deskew: true,
            min_skew_degrees: 0.5,
            binarization: Some(Binarization::Sauvola {
                window_radius: 12,
                k: 0.34,
                r: 128.0,
            }),
            morphology: true,
            morphology_radius: 1,
            component_filter: true,
            min_component_area: 6,
            max_aspect_ratio: 10.0,
        }
    }

    /// Dense math notation: higher scale, edge-preserving denoise, gentler
    /// thresholding so thin fraction bars and radicals survive.
    pub fn math_symbols() -> Self {
        Self {
            name: "math_symbols".into(),
            base_scale: 1.5,
            dense_scale: 2.0,
            very_dense_scale: 2.5,
            min_long_side: 1600,
            denoise: Some(DenoiseMethod::Bilateral {
                radius: 2,
                sigma_color: 30.0,
                sigma_space: 2.0,
            }),
            sharpen_strength: 0.8,
            binarization: Some(Binarization::Sauvola {
                window_radius: 15,
                k: 0.25,
                r: 128.0,
            }),
            min_component_area: 4,
            ..Self::general()
        }
    }

    /// Sub/superscripts and option letters: largest scale, light blur,
    /// strongest sharpening, Otsu blended with the local mean.
    pub fn small_glyph() -> Self {
        Self {
            name: "small_glyph".into(),
            base_scale: 2.0,
            dense_scale: 2.5,
            very_dense_scale: 3.0,
            min_long_side: 2000,
            denoise: Some(DenoiseMethod::LightBlur { sigma: 0.6 }),
            sharpen_strength: 1.2,
            binarization: Some(Binarization::OtsuBlend {
                window_radius: 10,
                local_weight: 0.6,
                offset: 8.0,
            }),
            min_component_area: 3,
            ..Self::general()
        }
    }

    pub fn from_preset(preset: EnhancementPreset) -> Self {
        match preset {
            EnhancementPreset::General => Self::general(),
            EnhancementPreset::MathSymbols => Self::math_symbols(),
            EnhancementPreset::SmallGlyph => Self::small_glyph(),
        }
    }

    /// Override the output size cap.
    pub fn with_max_dimension(mut self, max_dimension: u32) -> Self {
        self.max_dimension = max_dimension.max(1);
        self
    }
}

impl Default for EnhancementProfile {
    fn default() -> Self {
        Self::general()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn presets_share_the_skeleton() {
        for profile in [
            EnhancementProfile::general(),
            EnhancementProfile::math_symbols(),
            EnhancementProfile::small_glyph(),
        ] {
            assert!(profile.adaptive_scaling && profile.deskew && profile.morphology);
            assert_eq!(profile.max_dimension, DEFAULT_MAX_DIMENSION);
            assert!(profile.base_scale <= profile.dense_scale);
            assert!(profile.dense_scale <= profile.very_dense_scale);
        }
    }

    #[test]
    fn small_glyph_scales_hardest() {
        assert!(EnhancementProfile::small_glyph().base_scale > EnhancementProfile::general().base_scale);
        assert!(
            EnhancementProfile::small_glyph().sharpen_strength
                > EnhancementProfile::math_symbols().sharpen_strength
        );
    }

    #[test]
    fn preset_lookup() {
        assert_eq!(
            EnhancementProfile::from_preset(EnhancementPreset::MathSymbols).name,
            "math_symbols"
        );
    }
}
