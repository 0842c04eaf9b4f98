// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Recognition orchestration — runs every configured recognition config against
// the enhanced image, walking an ordered fallback chain of capabilities until
// one of them produces at least one candidate.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use quizlens_core::config::MAX_RECOGNITION_CONFIGS;
use quizlens_core::error::{QuizlensError, Result};
use quizlens_core::{EngineKind, RecognitionCandidate, ScannerConfig};
use quizlens_document::RasterBuffer;
use tokio::task::JoinSet;
use tracing::{debug, info, instrument, warn};

use crate::adapter::{RecognizerAdapter, TextRecognizer};
use crate::config::RecognitionConfig;
use crate::health::HealthTracker;

// -- Capability registry --------------------------------------------------------

/// Named capabilities available to the host, resolved against the configured
/// engine chain.
#[derive(Default, Clone)]
pub struct CapabilityRegistry {
    capabilities: HashMap<String, Arc<dyn TextRecognizer>>,
}

impl CapabilityRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register under the capability's own name, replacing any previous
    /// capability of that name.
    pub fn register(mut self, recognizer: Arc<dyn TextRecognizer>) -> Self {
        self.capabilities
            .insert(recognizer.name().to_string(), recognizer);
        self
    }

    pub fn contains(&self, name: &str) -> bool {
        self.capabilities.contains_key(name)
    }

    /// Map the engine chain onto registered capabilities, in order. Engines
    /// with no registered capability are skipped with a warning.
    pub fn resolve(&self, engines: &[EngineKind]) -> Result<Vec<Arc<dyn TextRecognizer>>> {
        let chain: Vec<Arc<dyn TextRecognizer>> = engines
            .iter()
            .filter_map(|engine| {
                let found = self.capabilities.get(engine.name()).cloned();
                if found.is_none() {
                    warn!(engine = engine.name(), "No capability registered for engine");
                }
                found
            })
            .collect();

        if chain.is_empty() {
            let wanted: Vec<&str> = engines.iter().map(EngineKind::name).collect();
            return Err(QuizlensError::EngineUnavailable(format!(
                "none of the configured engines are available: {}",
                wanted.join(", ")
            )));
        }
        Ok(chain)
    }
}

// -- Orchestrator -------------------------------------------------------------

/// Runs 1..=4 recognition configs per capability and collects the candidates.
///
/// Capabilities form a fallback chain (preferred first, baseline last). A
/// capability whose circuit breaker is open is skipped, except the baseline,
/// which is always attempted.
pub struct RecognitionOrchestrator {
    chain: Vec<RecognizerAdapter>,
    configs: Vec<RecognitionConfig>,
    concurrent: bool,
    health: Mutex<HealthTracker>,
}

impl RecognitionOrchestrator {
    /// Build from a resolved capability chain and the scanner configuration.
    pub fn new(chain: Vec<Arc<dyn TextRecognizer>>, config: &ScannerConfig) -> Result<Self> {
        config.validate()?;
        if chain.is_empty() {
            return Err(QuizlensError::EngineUnavailable(
                "recognition chain is empty".into(),
            ));
        }
        let timeout = Duration::from_millis(config.recognition_timeout_ms);
        Ok(Self {
            chain: chain
                .into_iter()
                .map(|r| RecognizerAdapter::new(r, timeout))
                .collect(),
            configs: config
                .recognition_presets
                .iter()
                .copied()
                .map(RecognitionConfig::from_preset)
                .collect(),
            concurrent: config.concurrent_recognition,
            health: Mutex::new(HealthTracker::new(
                config.engine_failure_threshold,
                Duration::from_secs(config.engine_cooldown_secs),
            )),
        })
    }

    /// Replace the preset-derived configs with explicit ones.
    pub fn with_configs(mut self, configs: Vec<RecognitionConfig>) -> Result<Self> {
        if configs.is_empty() || configs.len() > MAX_RECOGNITION_CONFIGS {
            return Err(QuizlensError::Config(format!(
                "between 1 and {} recognition configs are required, got {}",
                MAX_RECOGNITION_CONFIGS,
                configs.len()
            )));
        }
        self.configs = configs;
        Ok(self)
    }

    pub fn configs(&self) -> &[RecognitionConfig] {
        &self.configs
    }

    pub fn engine_names(&self) -> Vec<&str> {
        self.chain.iter().map(RecognizerAdapter::name).collect()
    }

    /// Human-readable status for every unhealthy engine in the chain.
    pub fn health_report(&self) -> Vec<String> {
        let health = self.health();
        self.chain
            .iter()
            .filter_map(|a| health.status_message(a.name()))
            .collect()
    }

    fn health(&self) -> MutexGuard<'_, HealthTracker> {
        self.health.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Recognise `image` with every config, falling back along the chain.
    ///
    /// Returns the candidates of the first capability that produced any, in
    /// config order. Failed or blank configs are logged and excluded, never
    /// retried. Dropping the returned future aborts in-flight invocations.
    #[instrument(skip(self, image), fields(
        width = image.width(),
        height = image.height(),
        configs = self.configs.len(),
        engines = self.chain.len(),
    ))]
    pub async fn recognize(&self, image: &RasterBuffer) -> Result<Vec<RecognitionCandidate>> {
        let mut attempted = 0usize;

        for (position, adapter) in self.chain.iter().enumerate() {
            let is_baseline = position + 1 == self.chain.len();
            let engine = adapter.name().to_string();

            if !self.health().allow_request(&engine) {
                if is_baseline {
                    debug!(engine = %engine, "Baseline engine circuit open, attempting anyway");
                } else {
                    warn!(engine = %engine, "Engine circuit open, falling back");
                    continue;
                }
            }

            attempted += self.configs.len();
            let (candidates, last_error) = if self.concurrent {
                self.run_concurrent(adapter, image).await
            } else {
                self.run_sequential(adapter, image).await
            };

            if candidates.is_empty() {
                let reason = last_error.unwrap_or_else(|| "no text recognised".into());
                self.health().record_failure(&engine, &reason);
                warn!(engine = %engine, reason = %reason, "Engine produced no candidates");
                continue;
            }

            self.health().record_success(&engine);
            info!(
                engine = %engine,
                candidates = candidates.len(),
                "Recognition candidates collected"
            );
            return Ok(candidates);
        }

        Err(QuizlensError::NoRecognitionResult { attempted })
    }

    async fn run_sequential(
        &self,
        adapter: &RecognizerAdapter,
        image: &RasterBuffer,
    ) -> (Vec<RecognitionCandidate>, Option<String>) {
        let mut candidates = Vec::with_capacity(self.configs.len());
        let mut last_error = None;
        for config in &self.configs {
            match adapter.recognize(image.clone(), config).await {
                Ok(candidate) => keep_candidate(candidate, &mut candidates),
                Err(err) => {
                    warn!(engine = adapter.name(), label = %config.label, error = %err, "Recognition config failed");
                    last_error = Some(err.to_string());
                }
            }
        }
        (candidates, last_error)
    }

    async fn run_concurrent(
        &self,
        adapter: &RecognizerAdapter,
        image: &RasterBuffer,
    ) -> (Vec<RecognitionCandidate>, Option<String>) {
        let mut tasks = JoinSet::new();
        for (index, config) in self.configs.iter().cloned().enumerate() {
            let adapter = adapter.clone();
            let image = image.clone();
            tasks.spawn(async move {
                let outcome = adapter.recognize(image, &config).await;
                (index, config.label, outcome)
            });
        }

        let mut finished: Vec<(usize, RecognitionCandidate)> = Vec::new();
        let mut last_error = None;
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((index, _, Ok(candidate))) => {
                    if candidate.text.trim().is_empty() {
                        debug!(label = %candidate.config_label, "Discarding blank candidate");
                    } else {
                        finished.push((index, candidate));
                    }
                }
                Ok((_, label, Err(err))) => {
                    warn!(engine = adapter.name(), label = %label, error = %err, "Recognition config failed");
                    last_error = Some(err.to_string());
                }
                Err(join_err) => {
                    warn!(engine = adapter.name(), error = %join_err, "Recognition task aborted");
                    last_error = Some(join_err.to_string());
                }
            }
        }

        // Completion order is arbitrary; fusion tie-breaks expect config order.
        finished.sort_by_key(|(index, _)| *index);
        (finished.into_iter().map(|(_, c)| c).collect(), last_error)
    }
}

fn keep_candidate(candidate: RecognitionCandidate, candidates: &mut Vec<RecognitionCandidate>) {
    if candidate.text.trim().is_empty() {
        debug!(label = %candidate.config_label, "Discarding blank candidate");
    } else {
        candidates.push(candidate);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::testing::ScriptedRecognizer;
    use quizlens_core::RecognitionPreset;

    fn page() -> RasterBuffer {
        RasterBuffer::filled(8, 8, [255, 255, 255, 255])
    }

    fn scanner_config(concurrent: bool) -> ScannerConfig {
        ScannerConfig {
            recognition_presets: vec![
                RecognitionPreset::Standard,
                RecognitionPreset::OptionLetters,
                RecognitionPreset::MathSymbols,
            ],
            concurrent_recognition: concurrent,
            recognition_timeout_ms: 200,
            ..ScannerConfig::default()
        }
    }

    #[tokio::test]
    async fn failing_configs_are_excluded() {
        for concurrent in [true, false] {
            let mock = ScriptedRecognizer::new("local")
                .reply("standard", "1. 下列 A. 1 B. 2", 80.0)
                .fail("option_letters")
                .reply("math_symbols", "1. 下列 A. l B. 2", 70.0);
            let orchestrator =
                RecognitionOrchestrator::new(vec![Arc::new(mock)], &scanner_config(concurrent)).unwrap();
            let candidates = orchestrator.recognize(&page()).await.unwrap();
            let labels: Vec<&str> = candidates.iter().map(|c| c.config_label.as_str()).collect();
            assert_eq!(labels, ["standard", "math_symbols"], "concurrent={concurrent}");
        }
    }

    #[tokio::test]
    async fn timed_out_config_is_a_failed_config() {
        let mock = ScriptedRecognizer::new("local")
            .reply("standard", "fast", 60.0)
            .slow("option_letters", "slow", Duration::from_secs(5))
            .reply("math_symbols", "also fast", 60.0);
        let orchestrator =
            RecognitionOrchestrator::new(vec![Arc::new(mock)], &scanner_config(true)).unwrap();
        let candidates = orchestrator.recognize(&page()).await.unwrap();
        assert_eq!(candidates.len(), 2);
    }

    #[tokio::test]
    async fn falls_back_to_next_capability() {
        let preferred = Arc::new(ScriptedRecognizer::new("remote"));
        let baseline = Arc::new(ScriptedRecognizer::new("local").reply("standard", "1. 题目", 55.0));
        let orchestrator = RecognitionOrchestrator::new(
            vec![preferred.clone() as Arc<dyn TextRecognizer>, baseline.clone()],
            &scanner_config(false),
        )
        .unwrap();
        let candidates = orchestrator.recognize(&page()).await.unwrap();
        assert_eq!(candidates.len(), 1);
        assert_eq!(preferred.calls(), 3);
        assert_eq!(baseline.calls(), 3);
    }

    #[tokio::test]
    async fn zero_candidates_is_no_recognition_result() {
        let orchestrator = RecognitionOrchestrator::new(
            vec![
                Arc::new(ScriptedRecognizer::new("remote")),
                Arc::new(ScriptedRecognizer::new("local").reply("standard", "   ", 90.0)),
            ],
            &scanner_config(true),
        )
        .unwrap();
        let err = orchestrator.recognize(&page()).await.unwrap_err();
        assert!(matches!(err, QuizlensError::NoRecognitionResult { attempted: 6 }));
    }

    #[tokio::test]
    async fn open_circuit_skips_preferred_but_not_baseline() {
        let config = ScannerConfig {
            engine_failure_threshold: 1,
            engine_cooldown_secs: 3600,
            ..scanner_config(false)
        };
        let preferred = Arc::new(ScriptedRecognizer::new("remote"));
        let baseline = Arc::new(ScriptedRecognizer::new("local"));
        let orchestrator =
            RecognitionOrchestrator::new(
            vec![preferred.clone() as Arc<dyn TextRecognizer>, baseline.clone()],
            &config,
        )
        .unwrap();

        assert!(orchestrator.recognize(&page()).await.is_err());
        assert_eq!((preferred.calls(), baseline.calls()), (3, 3));

        // Both circuits are now open; only the baseline is retried.
        assert!(orchestrator.recognize(&page()).await.is_err());
        assert_eq!((preferred.calls(), baseline.calls()), (3, 6));
        assert_eq!(orchestrator.health_report().len(), 2);
    }

    #[test]
    fn registry_resolves_in_chain_order() {
        let registry = CapabilityRegistry::new()
            .register(Arc::new(ScriptedRecognizer::new("local")))
            .register(Arc::new(ScriptedRecognizer::new("vision")));
        let chain = registry
            .resolve(&[
                EngineKind::Remote {
                    name: "vision".into(),
                },
                EngineKind::Remote {
                    name: "missing".into(),
                },
                EngineKind::Local,
            ])
            .unwrap();
        let names: Vec<&str> = chain.iter().map(|r| r.name()).collect();
        assert_eq!(names, ["vision", "local"]);
    }

    #[test]
    fn registry_with_nothing_usable_is_unavailable() {
        let registry = CapabilityRegistry::new();
        assert!(matches!(
            registry.resolve(&[EngineKind::Local]),
            Err(QuizlensError::EngineUnavailable(_))
        ));
    }

    #[test]
    fn explicit_configs_are_bounded() {
        let orchestrator = RecognitionOrchestrator::new(
            vec![Arc::new(ScriptedRecognizer::new("local"))],
            &scanner_config(true),
        )
        .unwrap();
        assert!(orchestrator.with_configs(vec![RecognitionConfig::standard(); 5]).is_err());
    }
}
