// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Question likelihood, subject, and question-type classification.

use std::collections::BTreeMap;

use quizlens_core::{ClassificationFeatures, ClassificationResult, QuestionType, Subject};
use regex::Regex;
use tracing::{debug, instrument};

use crate::subjects::{
    CONTEXT_WEIGHT, EXCLUSIVE_WEIGHT, KEYWORD_WEIGHT, MULTI_ANSWER_INDICATORS, PATTERN_WEIGHT,
    QUESTION_WORDS, SUBJECT_PROFILES, SUBJECT_THRESHOLD, SYMBOL_WEIGHT, SubjectProfile, TYPE_INDICATORS,
    contains_term,
};

// Question-likelihood weights, in percent.
const NUMBER_WEIGHT: u32 = 25;
const OPTIONS_WEIGHT: u32 = 30;
const WORDS_WEIGHT: u32 = 20;
const SYMBOLS_WEIGHT: u32 = 15;
const LENGTH_WEIGHT: u32 = 10;

const QUESTION_THRESHOLD: f64 = 0.3;
const PLAUSIBLE_LENGTH: std::ops::RangeInclusive<usize> = 10..=2000;

const CLASSICAL_PARTICLES: &str = "之乎者也矣焉哉兮";

/// Compiled classification rules. Build once and reuse; `classify` is pure.
pub struct Classifier {
    question_number: Option<Regex>,
    option_marker: Option<Regex>,
    blank_marker: Option<Regex>,
    latin_run: Option<Regex>,
    algebra: Option<Regex>,
    /// One entry per profile, parallel to `SUBJECT_PROFILES`.
    profile_patterns: Vec<Vec<Regex>>,
}

impl Default for Classifier {
    fn default() -> Self {
        Self::new()
    }
}

impl Classifier {
    pub fn new() -> Self {
        Self {
            question_number: Regex::new(r"^\s*(?:\d+\s*[.、．)]|第\s*\d+\s*题|[(（]\s*\d+\s*[)）]|[\[【]\s*\d+\s*[\]】])")
                .ok(),
            option_marker: Regex::new(r"(?:^|\s)[A-D]\s*[.．:：、]|[(（][A-D][)）]").ok(),
            blank_marker: Regex::new(r"_{2,}|[(（]\s+[)）]").ok(),
            latin_run: Regex::new(r"[A-Za-z]{2,}(?:[\s,']+[A-Za-z]{2,}){4,}").ok(),
            algebra: Regex::new(r"[a-z]\s*[=+\-^<>≤≥]\s*\S|\S\s*[=+\-<>≤≥]\s*[a-z](?:$|[^a-z])|\d[xyz](?:$|[^a-z])").ok(),
            profile_patterns: SUBJECT_PROFILES
                .iter()
                .map(|p| p.patterns.iter().filter_map(|pattern| Regex::new(pattern).ok()).collect())
                .collect(),
        }
    }

    /// Classify `text` with no outside knowledge of its subject.
    pub fn classify(&self, text: &str) -> ClassificationResult {
        self.classify_with_hint(text, None)
    }

    /// Classify `text`, adopting `hint` when detection finds no subject.
    #[instrument(skip(self, text), fields(len = text.len()))]
    pub fn classify_with_hint(&self, text: &str, hint: Option<Subject>) -> ClassificationResult {
        let trimmed = text.trim();
        let lowered = trimmed.to_lowercase();
        let features = self.features(trimmed, &lowered);

        let percent: u32 = [
            (features.has_question_number, NUMBER_WEIGHT),
            (features.has_options, OPTIONS_WEIGHT),
            (features.has_question_words, WORDS_WEIGHT),
            (features.has_math_symbols, SYMBOLS_WEIGHT),
            (features.length_plausible, LENGTH_WEIGHT),
        ]
        .iter()
        .filter(|(present, _)| *present)
        .map(|(_, weight)| weight)
        .sum();
        let confidence = f64::from(percent) / 100.0;

        let mut subject = self.pick_subject(trimmed, &features.subject_scores);
        if subject.is_unknown() {
            if let Some(hinted) = hint.filter(|s| !s.is_unknown()) {
                debug!(subject = %hinted, "Adopting subject hint");
                subject = hinted;
            }
        }
        let detailed_type = self.question_type(trimmed, &lowered, features.has_options, subject);

        debug!(
            confidence,
            subject = %subject,
            question_type = %detailed_type,
            "Classified text"
        );
        ClassificationResult {
            is_question: confidence > QUESTION_THRESHOLD,
            confidence,
            question_type: detailed_type.kind(),
            detailed_type,
            subject,
            features,
        }
    }

    /// Detect the subject alone.
    pub fn detect_subject(&self, text: &str) -> Subject {
        let trimmed = text.trim();
        let scores = self.subject_scores(trimmed, &trimmed.to_lowercase());
        self.pick_subject(trimmed, &scores)
    }

    /// Detailed question type of `text` for a known subject.
    pub fn detect_type(&self, text: &str, has_options: bool, subject: Subject) -> QuestionType {
        let trimmed = text.trim();
        self.question_type(trimmed, &trimmed.to_lowercase(), has_options, subject)
    }

    /// Score every subject. Each table entry counts once when present, so
    /// adding text never lowers a score.
    pub fn subject_scores(&self, text: &str, lowered: &str) -> BTreeMap<Subject, f64> {
        SUBJECT_PROFILES
            .iter()
            .zip(&self.profile_patterns)
            .map(|(profile, patterns)| (profile.subject, score_profile(profile, patterns, text, lowered)))
            .collect()
    }

    fn features(&self, text: &str, lowered: &str) -> ClassificationFeatures {
        let matches = |re: &Option<Regex>| re.as_ref().is_some_and(|re| re.is_match(text));
        let option_count = self.option_marker.as_ref().map_or(0, |re| re.find_iter(text).count());
        let length = text.chars().count();

        ClassificationFeatures {
            has_question_number: matches(&self.question_number),
            has_options: option_count >= 2,
            has_question_words: QUESTION_WORDS.iter().any(|w| contains_term(text, lowered, w))
                || text.contains('?')
                || text.contains('？')
                || matches(&self.blank_marker),
            has_math_symbols: SUBJECT_PROFILES
                .iter()
                .flat_map(|p| p.symbols.iter())
                .any(|s| contains_term(text, lowered, s)),
            length_plausible: PLAUSIBLE_LENGTH.contains(&length),
            text_length: length,
            subject_scores: self.subject_scores(text, lowered),
        }
    }

    fn pick_subject(&self, text: &str, scores: &BTreeMap<Subject, f64>) -> Subject {
        let best = scores.values().copied().fold(0.0_f64, f64::max);
        if best < SUBJECT_THRESHOLD {
            return self.fallback_subject(text);
        }
        let mut leaders = scores.iter().filter(|&(_, &s)| s == best).map(|(&subject, _)| subject);
        match (leaders.next(), leaders.next()) {
            (Some(subject), None) => subject,
            _ => Subject::Unknown,
        }
    }

    /// Coarse guesses for text no table recognised.
    fn fallback_subject(&self, text: &str) -> Subject {
        if self.latin_run.as_ref().is_some_and(|re| re.is_match(text)) {
            Subject::English
        } else if text.chars().filter(|c| CLASSICAL_PARTICLES.contains(*c)).count() >= 2 {
            Subject::Chinese
        } else if self.algebra.as_ref().is_some_and(|re| re.is_match(text)) {
            Subject::Math
        } else {
            Subject::Unknown
        }
    }

    fn question_type(&self, text: &str, lowered: &str, has_options: bool, subject: Subject) -> QuestionType {
        if has_options {
            return if MULTI_ANSWER_INDICATORS.iter().any(|w| contains_term(text, lowered, w)) {
                QuestionType::MultipleChoice
            } else {
                QuestionType::SingleChoice
            };
        }
        if text.is_empty() {
            return QuestionType::Unknown;
        }
        if let Some((kind, _)) = TYPE_INDICATORS
            .iter()
            .find(|(_, words)| words.iter().any(|w| contains_term(text, lowered, w)))
        {
            return *kind;
        }
        subject_fallback_type(text, subject)
    }
}

fn score_profile(profile: &SubjectProfile, patterns: &[Regex], text: &str, lowered: &str) -> f64 {
    let hits = |terms: &[&str]| terms.iter().filter(|t| contains_term(text, lowered, t)).count() as f64;
    let pattern_hits = patterns.iter().filter(|re| re.is_match(text)).count() as f64;

    hits(profile.keywords) * KEYWORD_WEIGHT
        + hits(profile.symbols) * SYMBOL_WEIGHT
        + pattern_hits * PATTERN_WEIGHT
        + hits(profile.exclusive) * EXCLUSIVE_WEIGHT
        + hits(profile.context) * CONTEXT_WEIGHT
}

fn subject_fallback_type(text: &str, subject: Subject) -> QuestionType {
    let has_digits = text.chars().any(|c| c.is_ascii_digit());
    match subject {
        Subject::Math if text.contains('=') || text.contains('求') => QuestionType::Calculation,
        Subject::Physics | Subject::Chemistry if has_digits && (text.contains('求') || text.contains("多少")) => {
            QuestionType::Calculation
        }
        Subject::English if text.chars().count() > 200 => QuestionType::ReadingComprehension,
        Subject::Chinese | Subject::History | Subject::Geography | Subject::Politics => QuestionType::ShortAnswer,
        _ => QuestionType::Subjective,
    }
}

/// Classify with a default [`Classifier`].
pub fn classify(text: &str) -> ClassificationResult {
    Classifier::new().classify(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use quizlens_core::QuestionKind;

    #[test]
    fn empty_text_is_unknown() {
        let result = classify("");
        assert!(!result.is_question);
        assert_eq!(result.confidence, 0.0);
        assert_eq!(result.subject, Subject::Unknown);
        assert_eq!(result.detailed_type, QuestionType::Unknown);
        assert_eq!(result.question_type, QuestionKind::Unknown);
    }

    #[test]
    fn multiple_choice_math_question() {
        let result = classify("1. 已知函数 f(x) = sin x，则下列说法正确的是 A. 1 B. 2 C. 3 D. 4");
        assert!(result.is_question);
        assert!(result.features.has_question_number);
        assert!(result.features.has_options);
        assert_eq!(result.subject, Subject::Math);
        assert_eq!(result.detailed_type, QuestionType::SingleChoice);
        assert_eq!(result.question_type, QuestionKind::MultipleChoice);
    }

    #[test]
    fn multi_answer_indicator_selects_multiple_choice() {
        let result = classify("下列关于细胞有丝分裂的叙述，正确的有哪些 A. 甲 B. 乙 C. 丙 D. 丁");
        assert_eq!(result.detailed_type, QuestionType::MultipleChoice);
        assert_eq!(result.subject, Subject::Biology);
    }

    #[test]
    fn confidence_uses_signal_weights() {
        // Question words and length only.
        let result = classify("请说明这个现象的原因是什么？");
        assert!(result.features.has_question_words);
        assert!(!result.features.has_question_number);
        assert!((result.confidence - 0.30).abs() < 1e-9);
        assert!(!result.is_question);
    }

    #[test]
    fn chemistry_exclusive_feature_wins() {
        let result = classify("配制 0.1mol/L 的 NaOH 溶液，需要称量多少克？");
        assert_eq!(result.subject, Subject::Chemistry);
    }

    #[test]
    fn adding_exclusive_symbol_never_lowers_score() {
        let classifier = Classifier::new();
        let base = "下面说法正确的是";
        let extended = format!("{} 浓度 2mol/L", base);
        let before = classifier.subject_scores(base, &base.to_lowercase())[&Subject::Chemistry];
        let after = classifier.subject_scores(&extended, &extended.to_lowercase())[&Subject::Chemistry];
        assert!(after > before);
        for subject in Subject::ALL {
            let before = classifier.subject_scores(base, &base.to_lowercase())[&subject];
            let after = classifier.subject_scores(&extended, &extended.to_lowercase())[&subject];
            assert!(after >= before, "{} decreased", subject);
        }
    }

    #[test]
    fn tied_subjects_are_unknown() {
        // One exclusive feature each for history and geography.
        let result = classify("五四运动 比例尺");
        assert_eq!(result.subject, Subject::Unknown);
    }

    #[test]
    fn long_latin_run_falls_back_to_english() {
        let classifier = Classifier::new();
        assert_eq!(classifier.detect_subject("She goes to school by bike every day"), Subject::English);
    }

    #[test]
    fn classical_particles_fall_back_to_chinese() {
        let classifier = Classifier::new();
        assert_eq!(classifier.detect_subject("学而时习之，不亦说乎"), Subject::Chinese);
    }

    #[test]
    fn algebra_falls_back_to_math() {
        let classifier = Classifier::new();
        assert_eq!(classifier.detect_subject("若 2x + 1 = 5"), Subject::Math);
    }

    #[test]
    fn indicator_order_prefers_cloze() {
        let result = classify("完形填空：阅读短文，从每题所给的选项中选出最佳答案");
        assert_eq!(result.detailed_type, QuestionType::Cloze);
    }

    #[test]
    fn proof_indicator() {
        let result = classify("求证：三角形内角和为 180°");
        assert_eq!(result.detailed_type, QuestionType::Proof);
    }

    #[test]
    fn subject_fallback_type_and_default() {
        assert_eq!(classify("已知 x = 3，y 是多少").detailed_type, QuestionType::Calculation);
        assert_eq!(classify("谈谈你的看法").detailed_type, QuestionType::Subjective);
    }

    #[test]
    fn hint_fills_unknown_subject_only() {
        let classifier = Classifier::new();
        let unknown = classifier.classify_with_hint("谈谈你的看法", Some(Subject::Politics));
        assert_eq!(unknown.subject, Subject::Politics);
        assert_eq!(unknown.detailed_type, QuestionType::ShortAnswer);

        let detected = classifier.classify_with_hint("配制 0.1mol/L 的 NaOH 溶液", Some(Subject::Politics));
        assert_eq!(detected.subject, Subject::Chemistry);
    }
}
