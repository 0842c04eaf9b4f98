// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Local recognition capability backed by the bundled `ocrs` engine.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use quizlens_core::error::{QuizlensError, Result};
use quizlens_document::RasterBuffer;
use quizlens_document::scan::ocr::{OcrConfig, OcrEngine, OcrOutput};
use tracing::{debug, instrument};

use crate::adapter::{RecognizedText, TextRecognizer};
use crate::config::{PageSegmentation, RecognitionConfig};
use crate::postprocess::{admissible_share, apply_config};

/// The baseline capability: `ocrs` running on a blocking thread.
pub struct OcrsRecognizer {
    engine: Arc<OcrEngine>,
}

impl OcrsRecognizer {
    pub const NAME: &'static str = "local";

    pub fn new(engine: OcrEngine) -> Self {
        Self {
            engine: Arc::new(engine),
        }
    }

    /// Load models from `dir`, or from the default cache when `None`.
    pub fn load(dir: Option<&Path>) -> Result<Self> {
        let config = match dir {
            Some(dir) => OcrConfig::from_dir(dir),
            None => OcrConfig::default(),
        };
        OcrEngine::new(config).map(Self::new)
    }
}

#[async_trait]
impl TextRecognizer for OcrsRecognizer {
    fn name(&self) -> &str {
        Self::NAME
    }

    #[instrument(skip(self, image, config), fields(label = %config.label))]
    async fn recognize(
        &self,
        image: RasterBuffer,
        config: &RecognitionConfig,
    ) -> Result<RecognizedText> {
        let engine = Arc::clone(&self.engine);
        let segmentation = config.segmentation;

        let output = tokio::task::spawn_blocking(move || {
            if segmentation.prefers_line_layout() {
                engine.recognize_lines(&image)
            } else {
                engine.recognize_block(&image)
            }
        })
        .await
        .map_err(|err| QuizlensError::Recognition(format!("OCR worker failed: {}", err)))??;

        let recognized = finish(&output, config);
        debug!(
            chars = recognized.text.chars().count(),
            confidence = recognized.confidence,
            "Local recognition complete"
        );
        Ok(recognized)
    }
}

/// Lay out the engine's lines for the config's segmentation, then filter and
/// score them.
///
/// ocrs reports no per-line confidence; the share of output the config
/// admits stands in for it.
fn finish(output: &OcrOutput, config: &RecognitionConfig) -> RecognizedText {
    let raw = if config.segmentation == PageSegmentation::SingleLine {
        output.lines.join(" ")
    } else {
        output.text()
    };
    let confidence = admissible_share(&raw, config) * 100.0;
    RecognizedText::new(apply_config(&raw, config), confidence)
}
