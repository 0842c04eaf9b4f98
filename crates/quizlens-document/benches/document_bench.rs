// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Criterion benchmarks for the scan enhancement pipeline on a synthetic
// exam-page image.

use criterion::{Criterion, black_box, criterion_group, criterion_main};
use image::{GrayImage, Luma};

use quizlens_document::scan::{binarize, skew};
use quizlens_document::{EnhancementProfile, RasterBuffer, ScanEnhancer};

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

/// 600x400 page of gray paper with rows of dark "words".
fn synthetic_page() -> RasterBuffer {
    let (width, height) = (600u32, 400u32);
    let mut raster = RasterBuffer::filled(width, height, [210, 205, 195, 255]);
    for y in 0..height {
        for x in 0..width {
            let in_line = (y % 28) >= 10 && (y % 28) < 18;
            let in_word = (x % 48) < 36;
            if in_line && in_word && x > 20 && x < width - 20 {
                raster.set_pixel(x, y, [30, 28, 28, 255]);
            }
        }
    }
    raster
}

// ---------------------------------------------------------------------------
// Benchmarks
// ---------------------------------------------------------------------------

fn bench_enhance_profiles(c: &mut Criterion) {
    let page = synthetic_page();
    for profile in [
        EnhancementProfile::general(),
        EnhancementProfile::math_symbols(),
        EnhancementProfile::small_glyph(),
    ] {
        let name = format!("enhance {} (600x400)", profile.name);
        c.bench_function(&name, |b| {
            b.iter(|| {
                let out = ScanEnhancer::enhance(black_box(page.clone()), &profile);
                black_box(out.ok());
            });
        });
    }
}

fn bench_sauvola(c: &mut Criterion) {
    let gray = synthetic_page().to_gray_image();
    c.bench_function("sauvola (600x400, r=12)", |b| {
        b.iter(|| black_box(binarize::sauvola(black_box(&gray), 12, 0.34, 128.0)));
    });
}

fn bench_skew_estimate(c: &mut Criterion) {
    let gray = GrayImage::from_fn(800, 600, |_, y| {
        if (y / 6) % 4 == 0 { Luma([0]) } else { Luma([255]) }
    });
    c.bench_function("skew estimate (800x600)", |b| {
        b.iter(|| black_box(skew::estimate_skew(black_box(&gray))));
    });
}

criterion_group!(benches, bench_enhance_profiles, bench_sauvola, bench_skew_estimate);
criterion_main!(benches);
