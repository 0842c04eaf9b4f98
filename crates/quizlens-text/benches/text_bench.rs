// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Benchmarks for the text stages: correction, classification, parsing.

use criterion::{Criterion, black_box, criterion_group, criterion_main};
use quizlens_text::{Classifier, StructuralParser, TextCorrector};

const SIMPLE: &str = "7. 已知 sin α = 3/5，且 α 为锐角，则 cos α 的值为 A. 4/5 B. -4/5 C. 3/4 D. -3/4";

const COMPOSITE: &str = "18. 已知函数 f(x) = x^{2} - 2x + $\\frac{1}{2}$\n\
(1) 求 f(x) 的单调区间\n\
(2) 若 f(x) ≥ m 恒成立，求 m 的取值范围\n\
(3) 证明：当 x > 1 时，f(x) > 0";

const NOISY: &str = "7．已知 s1n α = 3/5,且α为锐角,则c0s α的值为（ ）A．4/5 8．-4/5 C．3/4";

// ---------------------------------------------------------------------------
// Benchmarks
// ---------------------------------------------------------------------------

fn bench_correct(c: &mut Criterion) {
    let corrector = TextCorrector::new();
    c.bench_function("correct_noisy_choice", |b| b.iter(|| corrector.correct(black_box(NOISY))));
}

fn bench_classify(c: &mut Criterion) {
    let classifier = Classifier::new();
    c.bench_function("classify_choice", |b| b.iter(|| classifier.classify(black_box(SIMPLE))));
}

fn bench_parse(c: &mut Criterion) {
    let parser = StructuralParser::new();
    let mut group = c.benchmark_group("parse");
    group.bench_function("simple", |b| b.iter(|| parser.parse(black_box(SIMPLE))));
    group.bench_function("composite", |b| b.iter(|| parser.parse(black_box(COMPOSITE))));
    group.finish();
}

criterion_group!(benches, bench_correct, bench_classify, bench_parse);
criterion_main!(benches);
