// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// quizlens-recognition — Turns an enhanced raster into the best available
// text. Runs several recognition configs through an ordered chain of
// capabilities (local `ocrs`, host-registered remote services), skips engines
// whose circuit breaker is open, and fuses the resulting candidates with
// exam-question heuristics.

pub mod adapter;
pub mod config;
pub mod fusion;
pub mod health;
pub mod orchestrator;
pub mod postprocess;

#[cfg(feature = "ocr")]
pub mod local;

pub use adapter::{RecognizedText, RecognizerAdapter, TextRecognizer};
pub use config::{PageSegmentation, RecognitionConfig};
pub use fusion::FusionScorer;
pub use health::HealthTracker;
pub use orchestrator::{CapabilityRegistry, RecognitionOrchestrator};

#[cfg(feature = "ocr")]
pub use local::OcrsRecognizer;
