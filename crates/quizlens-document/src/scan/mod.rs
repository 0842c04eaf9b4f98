// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Scanning pipeline — enhancement profiles, the eight-stage enhancer and its
// filters, and optical character recognition (OCR).

pub mod binarize;
pub mod components;
pub mod enhance;
pub mod filters;
pub mod profile;
pub mod skew;

#[cfg(feature = "ocr")]
pub mod ocr;

pub use enhance::{EnhancementReport, ScanEnhancer};
pub use profile::{Binarization, DenoiseMethod, EnhancementProfile};

#[cfg(feature = "ocr")]
pub use ocr::OcrEngine;
