// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Quizlens — Text stages: correction of recognized text, question
// classification, and structural parsing.

pub mod classifier;
pub mod corrector;
pub mod formula;
pub mod parser;
pub mod subjects;

pub use classifier::Classifier;
pub use corrector::TextCorrector;
pub use formula::{FormulaExtractor, FormulaScan};
pub use parser::StructuralParser;
