// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Local text recognition engine backed by `ocrs`, a pure-Rust OCR engine whose
// neural network models run on `rten`.
//
// # Feature Gate
//
// This module is only available when the `ocr` feature is enabled:
//
// ```toml
// quizlens-document = { path = "crates/quizlens-document", features = ["ocr"] }
// ```
//
// # Model Setup
//
// The engine requires two model files:
//
// - **Detection model** (`text-detection.rten`) — locates text regions.
// - **Recognition model** (`text-recognition.rten`) — decodes characters.
//
// Running `ocrs-cli` once downloads both into `~/.cache/ocrs/`, which is the
// default lookup directory (`$XDG_CACHE_HOME/ocrs` when set).

use std::path::{Path, PathBuf};

use image::DynamicImage;
use ocrs::{ImageSource, OcrEngine as OcrsEngine, OcrEngineParams, OcrInput};
use quizlens_core::error::{QuizlensError, Result};
use rten::Model;
use tracing::{debug, info, instrument};

use crate::raster::RasterBuffer;

/// Default directory for cached OCR model files.
fn default_model_dir() -> PathBuf {
    if let Ok(xdg) = std::env::var("XDG_CACHE_HOME") {
        PathBuf::from(xdg).join("ocrs")
    } else if let Ok(home) = std::env::var("HOME") {
        PathBuf::from(home).join(".cache").join("ocrs")
    } else {
        PathBuf::from("ocrs-models")
    }
}

const DETECTION_MODEL_FILENAME: &str = "text-detection.rten";
const RECOGNITION_MODEL_FILENAME: &str = "text-recognition.rten";

/// Locations of the two model files.
#[derive(Debug, Clone)]
pub struct OcrConfig {
    pub detection_model_path: PathBuf,
    pub recognition_model_path: PathBuf,
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self::from_dir(default_model_dir())
    }
}

impl OcrConfig {
    /// Expects `dir` to contain `text-detection.rten` and
    /// `text-recognition.rten`.
    pub fn from_dir(dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref();
        Self {
            detection_model_path: dir.join(DETECTION_MODEL_FILENAME),
            recognition_model_path: dir.join(RECOGNITION_MODEL_FILENAME),
        }
    }

    /// Verify that both model files exist.
    pub fn validate(&self) -> Result<()> {
        for (kind, path) in [
            ("detection", &self.detection_model_path),
            ("recognition", &self.recognition_model_path),
        ] {
            if !path.exists() {
                return Err(QuizlensError::EngineUnavailable(format!(
                    "{} model not found at {}; run `ocrs-cli` once to download models",
                    kind,
                    path.display()
                )));
            }
        }
        Ok(())
    }
}

/// Text recognised by the local engine.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OcrOutput {
    /// Non-empty lines in reading order.
    pub lines: Vec<String>,
}

impl OcrOutput {
    pub fn text(&self) -> String {
        self.lines.join("\n")
    }
}

/// Local OCR engine. Model loading is the expensive step; construct once and
/// reuse for every image.
///
/// **Important:** `ocrs` and `rten` must be compiled in release mode. Debug
/// builds are 10-100x slower.
pub struct OcrEngine {
    engine: OcrsEngine,
}

impl OcrEngine {
    #[instrument(skip_all, fields(
        detection = %config.detection_model_path.display(),
        recognition = %config.recognition_model_path.display(),
    ))]
    pub fn new(config: OcrConfig) -> Result<Self> {
        config.validate()?;

        info!("Loading OCR detection model");
        let detection_model = Model::load_file(&config.detection_model_path).map_err(|err| {
            QuizlensError::EngineUnavailable(format!(
                "failed to load detection model from {}: {}",
                config.detection_model_path.display(),
                err
            ))
        })?;

        info!("Loading OCR recognition model");
        let recognition_model =
            Model::load_file(&config.recognition_model_path).map_err(|err| {
                QuizlensError::EngineUnavailable(format!(
                    "failed to load recognition model from {}: {}",
                    config.recognition_model_path.display(),
                    err
                ))
            })?;

        let engine = OcrsEngine::new(OcrEngineParams {
            detection_model: Some(detection_model),
            recognition_model: Some(recognition_model),
            ..Default::default()
        })
        .map_err(|err| {
            QuizlensError::EngineUnavailable(format!("failed to initialise OCR engine: {}", err))
        })?;

        info!("OCR engine initialised");
        Ok(Self { engine })
    }

    fn prepare(&self, raster: &RasterBuffer) -> Result<OcrInput> {
        if raster.is_empty() {
            return Err(QuizlensError::EmptyImage);
        }
        // ocrs expects RGB8.
        let rgb = DynamicImage::ImageRgba8(raster.to_rgba_image()).to_rgb8();
        let (width, height) = rgb.dimensions();

        let source = ImageSource::from_bytes(rgb.as_raw(), (width, height)).map_err(|err| {
            QuizlensError::Recognition(format!(
                "failed to create image source ({}x{}): {}",
                width, height, err
            ))
        })?;

        self.engine
            .prepare_input(source)
            .map_err(|err| QuizlensError::Recognition(format!("OCR preprocessing failed: {}", err)))
    }

    /// Whole-image text extraction with the engine's own block layout.
    #[instrument(skip_all, fields(width = raster.width(), height = raster.height()))]
    pub fn recognize_block(&self, raster: &RasterBuffer) -> Result<OcrOutput> {
        let input = self.prepare(raster)?;
        let text = self
            .engine
            .get_text(&input)
            .map_err(|err| QuizlensError::Recognition(format!("OCR text recognition failed: {}", err)))?;

        let lines = non_blank_lines(text.lines());
        debug!(line_count = lines.len(), "Block recognition complete");
        Ok(OcrOutput { lines })
    }

    /// Detect words, group them into lines, and recognise line by line.
    ///
    /// Used for sparse or single-line layouts where whole-block extraction
    /// tends to merge unrelated fragments.
    #[instrument(skip_all, fields(width = raster.width(), height = raster.height()))]
    pub fn recognize_lines(&self, raster: &RasterBuffer) -> Result<OcrOutput> {
        let input = self.prepare(raster)?;

        let word_rects = self
            .engine
            .detect_words(&input)
            .map_err(|err| QuizlensError::Recognition(format!("word detection failed: {}", err)))?;
        debug!(word_count = word_rects.len(), "Words detected");

        let line_rects = self.engine.find_text_lines(&input, &word_rects);
        debug!(line_count = line_rects.len(), "Text lines found");

        let line_texts = self
            .engine
            .recognize_text(&input, &line_rects)
            .map_err(|err| QuizlensError::Recognition(format!("line recognition failed: {}", err)))?;

        let lines = non_blank_lines(line_texts.iter().flatten().map(|line| line.to_string()));

        info!(recognized_lines = lines.len(), "Line recognition complete");
        Ok(OcrOutput { lines })
    }
}

/// Keep lines with visible text, in order.
fn non_blank_lines<I, S>(lines: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    lines
        .into_iter()
        .map(Into::into)
        .filter(|line: &String| !line.trim().is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_points_to_cache_dir() {
        let config = OcrConfig::default();
        assert!(
            config
                .detection_model_path
                .to_string_lossy()
                .ends_with(DETECTION_MODEL_FILENAME)
        );
        assert!(
            config
                .recognition_model_path
                .to_string_lossy()
                .ends_with(RECOGNITION_MODEL_FILENAME)
        );
    }

    #[test]
    fn config_from_dir() {
        let config = OcrConfig::from_dir("/tmp/my-models");
        assert_eq!(
            config.detection_model_path,
            PathBuf::from("/tmp/my-models/text-detection.rten")
        );
    }

    #[test]
    fn missing_models_mean_engine_unavailable() {
        let config = OcrConfig::from_dir("/nonexistent/path/ocr-models");
        assert!(matches!(
            config.validate(),
            Err(QuizlensError::EngineUnavailable(_))
        ));
        assert!(OcrEngine::new(config).is_err());
    }

    #[test]
    fn blank_lines_are_dropped() {
        let lines = non_blank_lines(["1. 下列", "   ", "", "A. 1 B. 2"]);
        assert_eq!(lines, ["1. 下列", "A. 1 B. 2"]);
    }

    #[test]
    fn output_joins_lines() {
        let out = OcrOutput {
            lines: vec!["1. 下列".into(), "A. 1 B. 2".into()],
        };
        assert_eq!(out.text(), "1. 下列\nA. 1 B. 2");
    }
}
