// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Unified error types for Quizlens.

use thiserror::Error;

/// Top-level error type for all Quizlens operations.
///
/// Correction, classification, and parsing never produce an error; only the
/// image path (decode, enhance, recognize, fuse) and configuration loading do.
#[derive(Debug, Error)]
pub enum QuizlensError {
    // -- Input errors --
    #[error("image has no pixels")]
    EmptyImage,

    #[error("image could not be decoded: {0}")]
    InvalidImage(String),

    #[error("raster buffer size mismatch: expected {expected} bytes, got {actual}")]
    InvalidRaster { expected: usize, actual: usize },

    // -- Recognition errors --
    #[error("recognition engine unavailable: {0}")]
    EngineUnavailable(String),

    #[error("recognition with config '{label}' timed out after {timeout_ms}ms")]
    RecognitionTimeout { label: String, timeout_ms: u64 },

    #[error("recognition failed: {0}")]
    Recognition(String),

    #[error("no recognition result after {attempted} attempt(s)")]
    NoRecognitionResult { attempted: usize },

    // -- Fusion --
    #[error("fusion was given an empty candidate set")]
    EmptyCandidateSet,

    // -- Configuration / persistence --
    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("file I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, QuizlensError>;
