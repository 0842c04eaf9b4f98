// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Recognizer capability trait and the timeout-enforcing adapter that turns a
// capability's output into a labelled candidate.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use quizlens_core::RecognitionCandidate;
use quizlens_core::error::{QuizlensError, Result};
use quizlens_document::RasterBuffer;
use tracing::{debug, instrument};

use crate::config::RecognitionConfig;

/// Text and raw confidence (0..=100) returned by a capability.
#[derive(Debug, Clone, PartialEq)]
pub struct RecognizedText {
    pub text: String,
    pub confidence: f64,
}

impl RecognizedText {
    pub fn new(text: impl Into<String>, confidence: f64) -> Self {
        Self {
            text: text.into(),
            confidence,
        }
    }
}

/// A pluggable text recognition capability: the bundled local engine, or a
/// hosted service registered by the host application.
///
/// Implementations receive their own copy of the image and must be safe to
/// call concurrently.
#[async_trait]
pub trait TextRecognizer: Send + Sync {
    /// Stable name used for health tracking and logs.
    fn name(&self) -> &str;

    async fn recognize(
        &self,
        image: RasterBuffer,
        config: &RecognitionConfig,
    ) -> Result<RecognizedText>;
}

/// Wraps one capability with a per-invocation timeout.
#[derive(Clone)]
pub struct RecognizerAdapter {
    recognizer: Arc<dyn TextRecognizer>,
    timeout: Duration,
}

impl RecognizerAdapter {
    pub fn new(recognizer: Arc<dyn TextRecognizer>, timeout: Duration) -> Self {
        Self {
            recognizer,
            timeout,
        }
    }

    pub fn name(&self) -> &str {
        self.recognizer.name()
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Run the capability once. A timed-out invocation is dropped and reported
    /// as [`QuizlensError::RecognitionTimeout`].
    #[instrument(skip(self, image, config), fields(
        engine = self.name(),
        label = %config.label,
        width = image.width(),
        height = image.height(),
    ))]
    pub async fn recognize(
        &self,
        image: RasterBuffer,
        config: &RecognitionConfig,
    ) -> Result<RecognitionCandidate> {
        let recognized = tokio::time::timeout(self.timeout, self.recognizer.recognize(image, config))
            .await
            .map_err(|_| QuizlensError::RecognitionTimeout {
                label: config.label.clone(),
                timeout_ms: self.timeout.as_millis() as u64,
            })??;

        debug!(
            chars = recognized.text.chars().count(),
            confidence = recognized.confidence,
            "Recognition finished"
        );
        Ok(RecognitionCandidate::new(
            recognized.text,
            recognized.confidence,
            config.label.clone(),
        ))
    }
}


#[cfg(test)]
mod tests {
    use super::testing::ScriptedRecognizer;
    use super::*;

    fn page() -> RasterBuffer {
        RasterBuffer::filled(4, 4, [255, 255, 255, 255])
    }

    #[tokio::test]
    async fn candidate_carries_config_label() {
        let adapter = RecognizerAdapter::new(
            Arc::new(ScriptedRecognizer::new("mock").reply("standard", "1. 题", 250.0)),
            Duration::from_secs(1),
        );
        let candidate = adapter
            .recognize(page(), &RecognitionConfig::standard())
            .await
            .unwrap();
        assert_eq!(candidate.config_label, "standard");
        assert_eq!(candidate.text, "1. 题");
        // Out-of-range confidences are clamped.
        assert_eq!(candidate.confidence, 100.0);
    }

    #[tokio::test]
    async fn slow_capability_times_out() {
        let adapter = RecognizerAdapter::new(
            Arc::new(ScriptedRecognizer::new("mock").slow(
                "standard",
                "late",
                Duration::from_millis(500),
            )),
            Duration::from_millis(20),
        );
        let err = adapter
            .recognize(page(), &RecognitionConfig::standard())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            QuizlensError::RecognitionTimeout { ref label, timeout_ms: 20 } if label == "standard"
        ));
    }

    #[tokio::test]
    async fn capability_error_passes_through() {
        let adapter = RecognizerAdapter::new(
            Arc::new(ScriptedRecognizer::new("mock").fail("standard")),
            Duration::from_secs(1),
        );
        assert!(matches!(
            adapter.recognize(page(), &RecognitionConfig::standard()).await,
            Err(QuizlensError::Recognition(_))
        ));
    }
}
