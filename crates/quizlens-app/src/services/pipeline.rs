// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Request pipeline: image bytes in, corrected, classified and parsed question
// out.
//
// decode -> enhance (blocking thread) -> multi-config recognition -> fusion
// -> correction -> classification -> structural parsing. Every request gets
// its own id, timing and audit trail; nothing is shared between requests
// except the orchestrator's engine health.

use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use quizlens_core::error::{QuizlensError, Result};
use quizlens_core::{RecognitionOutcome, RequestId, ScannerConfig, Subject};
use quizlens_document::{EnhancementProfile, ImageProcessor, ScanEnhancer};
use quizlens_recognition::{CapabilityRegistry, FusionScorer, RecognitionOrchestrator, TextRecognizer};
use quizlens_text::{Classifier, StructuralParser, TextCorrector};
use sha2::{Digest, Sha256};
use tracing::{info, instrument};

/// Optional caller knowledge about the page being scanned.
#[derive(Debug, Clone, Default)]
pub struct ScanHints {
    /// Used only when the classifier cannot detect a subject itself.
    pub subject: Option<Subject>,
    /// A sample of the expected layout, passed to fusion as a structure hint.
    pub structure_example: Option<String>,
}

/// Runs the image path for one configured scanner.
pub struct QuestionScanner {
    profile: EnhancementProfile,
    orchestrator: RecognitionOrchestrator,
    corrector: TextCorrector,
    classifier: Classifier,
    parser: StructuralParser,
}

impl QuestionScanner {
    /// Build from an explicit capability chain (preferred first, baseline last).
    pub fn new(chain: Vec<Arc<dyn TextRecognizer>>, config: &ScannerConfig) -> Result<Self> {
        let orchestrator = RecognitionOrchestrator::new(chain, config)?;
        let profile =
            EnhancementProfile::from_preset(config.enhancement).with_max_dimension(config.max_dimension);
        info!(
            engines = ?orchestrator.engine_names(),
            profile = %profile.name,
            "Question scanner ready"
        );
        Ok(Self {
            profile,
            orchestrator,
            corrector: TextCorrector::new(),
            classifier: Classifier::new(),
            parser: StructuralParser::new(),
        })
    }

    /// Build by resolving the configured engine chain against `registry`.
    pub fn from_registry(registry: &CapabilityRegistry, config: &ScannerConfig) -> Result<Self> {
        let chain = registry.resolve(&config.engines)?;
        Self::new(chain, config)
    }

    /// Status lines for engines currently being skipped.
    pub fn health_report(&self) -> Vec<String> {
        self.orchestrator.health_report()
    }

    /// Scan one encoded image.
    ///
    /// Input errors (`EmptyImage`, `InvalidImage`) and `NoRecognitionResult`
    /// surface unchanged; per-config recognition failures are absorbed by the
    /// orchestrator.
    #[instrument(skip(self, image, hints), fields(bytes = image.len()))]
    pub async fn scan(&self, image: &[u8], hints: &ScanHints) -> Result<RecognitionOutcome> {
        let started = Instant::now();
        let request_id = RequestId::new();
        let mut steps = Vec::new();

        let raster = ImageProcessor::decode(image)?;
        steps.push(format!("decoded {}x{} image", raster.width(), raster.height()));

        let profile = self.profile.clone();
        let (enhanced, report) =
            tokio::task::spawn_blocking(move || ScanEnhancer::enhance_with_report(raster, &profile))
                .await
                .map_err(|err| QuizlensError::Recognition(format!("enhancement task failed: {err}")))??;
        steps.extend(report.into_steps());

        let candidates = self.orchestrator.recognize(&enhanced).await?;
        steps.push(format!("recognized {} candidate(s)", candidates.len()));

        let scorer = match &hints.structure_example {
            Some(example) => FusionScorer::new().with_structure_hint(example.as_str()),
            None => FusionScorer::new(),
        };
        let best = scorer.select(&candidates)?;
        steps.push(format!(
            "selected '{}' (score {:.1})",
            best.candidate.config_label, best.final_score
        ));

        let text = self.corrector.correct(&best.candidate.text);
        if text != best.candidate.text {
            steps.push("corrected recognition errors".to_string());
        }

        let classification = self.classifier.classify_with_hint(&text, hints.subject);
        steps.push(format!(
            "classified as {} {}",
            classification.subject, classification.detailed_type
        ));

        let question = self.parser.parse_with_hint(&text, hints.subject);
        steps.push(match question.sub_questions.as_ref() {
            Some(subs) => format!("parsed composite question with {} part(s)", subs.len()),
            None => format!(
                "parsed question with {} option(s)",
                question.options.as_ref().map_or(0, Vec::len)
            ),
        });

        let processing_time_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
        info!(
            request = %request_id,
            label = %best.candidate.config_label,
            confidence = best.reported_confidence,
            elapsed_ms = processing_time_ms,
            "Scan complete"
        );

        Ok(RecognitionOutcome {
            request_id,
            text,
            confidence: best.reported_confidence,
            classification,
            question,
            config_label: best.candidate.config_label,
            processing_steps: steps,
            processing_time_ms,
            image_sha256: hash_bytes(image),
            completed_at: Utc::now(),
        })
    }
}

/// Lowercase hex SHA-256 of `data`.
pub fn hash_bytes(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}
