// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Scanner configuration.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{QuizlensError, Result};
use crate::types::{EngineKind, EnhancementPreset, RecognitionPreset};

/// Upper bound on the number of recognition passes per request.
pub const MAX_RECOGNITION_CONFIGS: usize = 4;

/// Settings for one scanner instance.
///
/// Passed explicitly into the pipeline; nothing reads it from global state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScannerConfig {
    /// Enhancement profile applied before recognition.
    pub enhancement: EnhancementPreset,
    /// Largest allowed side of the enhanced image, in pixels.
    pub max_dimension: u32,
    /// Recognition passes run against each enhanced image (1–4).
    pub recognition_presets: Vec<RecognitionPreset>,
    /// Run the passes concurrently instead of one after another.
    pub concurrent_recognition: bool,
    /// Timeout for a single recognition pass.
    pub recognition_timeout_ms: u64,
    /// Capabilities in fallback order; the last one is the baseline.
    pub engines: Vec<EngineKind>,
    /// Consecutive failures before an engine is skipped.
    pub engine_failure_threshold: u32,
    /// How long a skipped engine stays skipped.
    pub engine_cooldown_secs: u64,
    /// Directory holding the `ocrs` model files (defaults to the ocrs cache).
    pub model_dir: Option<PathBuf>,
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            enhancement: EnhancementPreset::General,
            max_dimension: 6000,
            recognition_presets: vec![
                RecognitionPreset::Standard,
                RecognitionPreset::OptionLetters,
                RecognitionPreset::MathSymbols,
            ],
            concurrent_recognition: true,
            recognition_timeout_ms: 30_000,
            engines: vec![EngineKind::Local],
            engine_failure_threshold: 3,
            engine_cooldown_secs: 60,
            model_dir: None,
        }
    }
}

impl ScannerConfig {
    /// Load a config from a JSON file. Missing fields take their defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        let config: Self = serde_json::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from `path` if it exists, otherwise return the defaults.
    pub fn load_or_default(path: impl AsRef<Path>) -> Result<Self> {
        if path.as_ref().exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Write the config as pretty JSON.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path.as_ref(), json)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        let passes = self.recognition_presets.len();
        if passes == 0 || passes > MAX_RECOGNITION_CONFIGS {
            return Err(QuizlensError::Config(format!(
                "recognition_presets must hold 1..={MAX_RECOGNITION_CONFIGS} entries, got {passes}"
            )));
        }
        if self.recognition_timeout_ms == 0 {
            return Err(QuizlensError::Config(
                "recognition_timeout_ms must be positive".into(),
            ));
        }
        if self.max_dimension < 64 {
            return Err(QuizlensError::Config(format!(
                "max_dimension {} is too small (minimum 64)",
                self.max_dimension
            )));
        }
        if self.engines.is_empty() {
            return Err(QuizlensError::Config("at least one engine is required".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert!(ScannerConfig::default().validate().is_ok());
    }

    #[test]
    fn rejects_too_many_presets() {
        let config = ScannerConfig {
            recognition_presets: vec![RecognitionPreset::Standard; 5],
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(QuizlensError::Config(_))));
    }

    #[test]
    fn partial_json_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(
            &path,
            r#"{"enhancement": "small_glyph", "engines": [{"remote": {"name": "cloud"}}, "local"]}"#,
        )
        .unwrap();

        let config = ScannerConfig::load(&path).unwrap();
        assert_eq!(config.enhancement, EnhancementPreset::SmallGlyph);
        assert_eq!(config.engines.len(), 2);
        assert_eq!(config.engines[0].name(), "cloud");
        assert_eq!(config.max_dimension, 6000);
    }

    #[test]
    fn save_then_load_preserves_fields() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        let config = ScannerConfig {
            concurrent_recognition: false,
            recognition_timeout_ms: 1500,
            ..Default::default()
        };
        config.save(&path).unwrap();
        assert_eq!(ScannerConfig::load(&path).unwrap(), config);
    }

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = ScannerConfig::load_or_default(dir.path().join("absent.json")).unwrap();
        assert_eq!(config, ScannerConfig::default());
    }
}
