// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// quizlens-document — Raster handling for the Quizlens question scanner.
//
// Provides the owned RGBA `RasterBuffer`, image decoding and geometry
// (resize, canvas-expanding rotation), and the scan enhancement pipeline that
// prepares photographed exam pages for text recognition.

pub mod image;
pub mod raster;
pub mod scan;

pub use image::processor::ImageProcessor;
pub use raster::RasterBuffer;
pub use scan::enhance::{EnhancementReport, ScanEnhancer};
pub use scan::profile::EnhancementProfile;

#[cfg(feature = "ocr")]
pub use scan::ocr::OcrEngine;
