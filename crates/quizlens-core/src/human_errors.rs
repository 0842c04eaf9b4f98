// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Human-readable error messages for students and teachers using the scanner.
//
// Every pipeline error is mapped to plain language with a clear suggestion.
// The caller shows the message, offers retry when `retriable` is set, and never
// substitutes a partial result for a genuine failure.

use crate::error::QuizlensError;

/// Severity of an error from the user's perspective.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Engine hiccup or timeout — retrying may help.
    Transient,
    /// The user must do something (retake the photo, fix the config).
    ActionRequired,
    /// Retrying will not help.
    Permanent,
}

/// A human-readable error with plain message and actionable suggestion.
#[derive(Debug, Clone)]
pub struct HumanError {
    /// Plain summary (shown as a heading).
    pub message: String,
    /// What the user should try (shown as body text).
    pub suggestion: String,
    /// Whether offering a retry makes sense.
    pub retriable: bool,
    pub severity: Severity,
}

/// Convert a `QuizlensError` into a `HumanError`.
pub fn humanize_error(err: &QuizlensError) -> HumanError {
    match err {
        // -- Input errors --
        QuizlensError::EmptyImage => HumanError {
            message: "The picture is empty.".into(),
            suggestion: "Take or choose a photo of the question, then try again.".into(),
            retriable: false,
            severity: Severity::ActionRequired,
        },

        QuizlensError::InvalidImage(_) => HumanError {
            message: "This file isn't a picture we can read.".into(),
            suggestion: "Save the photo as JPEG or PNG and try again.".into(),
            retriable: false,
            severity: Severity::Permanent,
        },

        QuizlensError::InvalidRaster { .. } => HumanError {
            message: "The picture data is damaged.".into(),
            suggestion: "Try loading the photo again from its original file.".into(),
            retriable: false,
            severity: Severity::Permanent,
        },

        // -- Recognition errors --
        QuizlensError::EngineUnavailable(detail) => HumanError {
            message: "Text recognition isn't available right now.".into(),
            suggestion: format!(
                "Check that the recognition models are installed, or switch to another engine in the settings. ({detail})"
            ),
            retriable: true,
            severity: Severity::ActionRequired,
        },

        QuizlensError::RecognitionTimeout { .. } => HumanError {
            message: "Recognition took too long.".into(),
            suggestion: "Try again, or crop the photo to just the question so there is less to read.".into(),
            retriable: true,
            severity: Severity::Transient,
        },

        QuizlensError::Recognition(_) => HumanError {
            message: "Text recognition ran into a problem.".into(),
            suggestion: "Try again. If it keeps failing, retake the photo in better light.".into(),
            retriable: true,
            severity: Severity::Transient,
        },

        QuizlensError::NoRecognitionResult { .. } => HumanError {
            message: "We couldn't read any text in this photo.".into(),
            suggestion: "Retake the photo with the page flat, in focus, and well lit, or paste the question text instead.".into(),
            retriable: true,
            severity: Severity::ActionRequired,
        },

        QuizlensError::EmptyCandidateSet => HumanError {
            message: "Something went wrong inside the scanner.".into(),
            suggestion: "Try again. If this keeps happening, please report it.".into(),
            retriable: true,
            severity: Severity::Transient,
        },

        // -- Configuration / persistence --
        QuizlensError::Config(detail) => HumanError {
            message: "The scanner settings aren't valid.".into(),
            suggestion: format!("Fix the settings file and try again. ({detail})"),
            retriable: false,
            severity: Severity::ActionRequired,
        },

        QuizlensError::Io(io_err) => {
            if io_err.kind() == std::io::ErrorKind::NotFound {
                HumanError {
                    message: "The file couldn't be found.".into(),
                    suggestion: "It may have been moved or deleted. Try choosing the file again.".into(),
                    retriable: false,
                    severity: Severity::ActionRequired,
                }
            } else if io_err.kind() == std::io::ErrorKind::PermissionDenied {
                HumanError {
                    message: "We don't have permission to read that file.".into(),
                    suggestion: "Check the file permissions, or copy the file somewhere else first.".into(),
                    retriable: false,
                    severity: Severity::ActionRequired,
                }
            } else {
                HumanError {
                    message: "There was a problem reading or writing a file.".into(),
                    suggestion: "Try again. If this keeps happening, your storage may be full.".into(),
                    retriable: true,
                    severity: Severity::Transient,
                }
            }
        }

        QuizlensError::Serialization(_) => HumanError {
            message: "A settings or data file is malformed.".into(),
            suggestion: "Check the file is valid JSON, or delete it to restore the defaults.".into(),
            retriable: false,
            severity: Severity::ActionRequired,
        },
    }
}
