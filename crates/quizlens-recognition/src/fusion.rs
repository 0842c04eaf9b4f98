// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Candidate fusion — scores every recognition candidate on exam-question
// heuristics and keeps the best one.

use std::collections::HashSet;

use quizlens_core::error::{QuizlensError, Result};
use quizlens_core::{RecognitionCandidate, ScoredCandidate, SubScores};
use tracing::{debug, instrument};

use crate::config::is_cjk;

/// Reported confidence never claims certainty.
pub const MAX_REPORTED_CONFIDENCE: f64 = 99.0;

/// Option markers needed before content counts as option-heavy.
const OPTION_HEAVY_MARKERS: usize = 2;

// -- Weights ------------------------------------------------------------------

/// Weight of each sub-score plus raw engine confidence; sums to 1.0.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FusionWeights {
    pub option: f64,
    pub format: f64,
    pub structure: f64,
    pub consistency: f64,
    pub trig: f64,
    pub angle: f64,
    pub math: f64,
    pub quality: f64,
    pub confidence: f64,
}

impl FusionWeights {
    /// Multiple-choice content: option completeness and marker format dominate.
    pub const OPTION_HEAVY: Self = Self {
        option: 0.30,
        format: 0.15,
        structure: 0.10,
        consistency: 0.10,
        trig: 0.05,
        angle: 0.05,
        math: 0.05,
        quality: 0.10,
        confidence: 0.10,
    };

    /// Everything else: engine confidence, structure, and domain symbols.
    pub const GENERIC: Self = Self {
        option: 0.05,
        format: 0.05,
        structure: 0.15,
        consistency: 0.10,
        trig: 0.10,
        angle: 0.05,
        math: 0.10,
        quality: 0.15,
        confidence: 0.25,
    };

    fn combine(&self, s: &SubScores, raw_confidence: f64) -> f64 {
        self.option * s.option
            + self.format * s.format
            + self.structure * s.structure
            + self.consistency * s.consistency
            + self.trig * s.trig
            + self.angle * s.angle
            + self.math * s.math
            + self.quality * s.quality
            + self.confidence * raw_confidence
    }
}

// -- Scorer -------------------------------------------------------------------

/// Picks the best candidate among several recognitions of the same image.
#[derive(Debug, Clone, Default)]
pub struct FusionScorer {
    structure_hint: Option<String>,
}

impl FusionScorer {
    pub fn new() -> Self {
        Self::default()
    }

    /// A sample of the expected question layout. When it shows option markers
    /// the content is treated as option-heavy regardless of the candidates.
    pub fn with_structure_hint(mut self, hint: impl Into<String>) -> Self {
        let hint = hint.into();
        self.structure_hint = (!hint.trim().is_empty()).then_some(hint);
        self
    }

    /// Score every candidate and return the winner.
    ///
    /// Ties on final score go to the higher raw confidence, then to the
    /// earlier candidate.
    #[instrument(skip_all, fields(candidates = candidates.len()))]
    pub fn select(&self, candidates: &[RecognitionCandidate]) -> Result<ScoredCandidate> {
        let scored = self.score_all(candidates)?;
        let best = pick_best(scored).ok_or(QuizlensError::EmptyCandidateSet)?;
        debug!(
            label = %best.candidate.config_label,
            final_score = best.final_score,
            reported = best.reported_confidence,
            "Candidate selected"
        );
        Ok(best)
    }

    /// Score every candidate, preserving input order.
    pub fn score_all(&self, candidates: &[RecognitionCandidate]) -> Result<Vec<ScoredCandidate>> {
        if candidates.is_empty() {
            return Err(QuizlensError::EmptyCandidateSet);
        }

        let weights = if self.is_option_heavy(candidates) {
            FusionWeights::OPTION_HEAVY
        } else {
            FusionWeights::GENERIC
        };

        let bigrams: Vec<HashSet<(char, char)>> =
            candidates.iter().map(|c| char_bigrams(&c.text)).collect();

        Ok(candidates
            .iter()
            .enumerate()
            .map(|(i, candidate)| {
                let scores = SubScores {
                    option: option_score(&candidate.text),
                    format: format_score(&candidate.text),
                    structure: structure_score(&candidate.text),
                    consistency: consistency_score(i, &bigrams),
                    trig: trig_score(&candidate.text),
                    angle: angle_score(&candidate.text),
                    math: math_score(&candidate.text),
                    quality: quality_score(&candidate.text),
                };
                let final_score = weights.combine(&scores, candidate.confidence).clamp(0.0, 100.0);
                let reported_confidence =
                    (0.7 * final_score + 0.3 * candidate.confidence).min(MAX_REPORTED_CONFIDENCE);
                debug!(
                    label = %candidate.config_label,
                    ?scores,
                    final_score,
                    "Candidate scored"
                );
                ScoredCandidate {
                    candidate: candidate.clone(),
                    scores,
                    final_score,
                    reported_confidence,
                }
            })
            .collect())
    }

    fn is_option_heavy(&self, candidates: &[RecognitionCandidate]) -> bool {
        let hinted = self
            .structure_hint
            .as_deref()
            .is_some_and(|h| option_markers(h).len() >= OPTION_HEAVY_MARKERS);
        hinted
            || candidates
                .iter()
                .any(|c| option_markers(&c.text).len() >= OPTION_HEAVY_MARKERS)
    }
}

/// The highest final score wins. Ties go to the higher raw confidence, then to
/// the earlier candidate.
fn pick_best(scored: Vec<ScoredCandidate>) -> Option<ScoredCandidate> {
    let mut best: Option<ScoredCandidate> = None;
    for candidate in scored {
        if best.as_ref().is_none_or(|b| outranks(&candidate, b)) {
            best = Some(candidate);
        }
    }
    best
}

fn outranks(candidate: &ScoredCandidate, incumbent: &ScoredCandidate) -> bool {
    let delta = candidate.final_score - incumbent.final_score;
    delta > f64::EPSILON
        || (delta.abs() <= f64::EPSILON
            && candidate.candidate.confidence > incumbent.candidate.confidence)
}

// -- Option markers -------------------------------------------------------------

/// Surface form of an option marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MarkerStyle {
    /// `A.` or `A．`
    Dot,
    /// `A、`
    Comma,
    /// `A:` or `A：`
    Colon,
    /// `(A)` or `（A）`
    Paren,
    /// `A)`
    RightParen,
}

/// Every A–D option marker in `text`, in order of appearance.
///
/// A marker letter must not follow an ASCII letter or digit, so words such as
/// `BAD.` or `1D.` are not markers.
pub fn option_markers(text: &str) -> Vec<(char, MarkerStyle)> {
    let chars: Vec<char> = text.chars().collect();
    let mut markers = Vec::new();
    for i in 0..chars.len() {
        let c = chars[i];
        if !('A'..='D').contains(&c) {
            continue;
        }
        let prev = i.checked_sub(1).map(|p| chars[p]);
        if prev.is_some_and(|p| p.is_ascii_alphanumeric()) {
            continue;
        }
        let next = chars.get(i + 1).copied();
        let style = match (prev, next) {
            (Some('(' | '（'), Some(')' | '）')) => Some(MarkerStyle::Paren),
            (_, Some('.' | '．')) => Some(MarkerStyle::Dot),
            (_, Some('、')) => Some(MarkerStyle::Comma),
            (_, Some(':' | '：')) => Some(MarkerStyle::Colon),
            (_, Some(')')) => Some(MarkerStyle::RightParen),
            _ => None,
        };
        if let Some(style) = style {
            markers.push((c, style));
        }
    }
    markers
}

// -- Sub-scores ---------------------------------------------------------------

/// 100 for all four A–D markers in order, 70 misordered, then 50/30/10/0 for
/// three/two/one/none distinct letters.
pub fn option_score(text: &str) -> f64 {
    let mut seen: Vec<char> = Vec::with_capacity(4);
    for (letter, _) in option_markers(text) {
        if !seen.contains(&letter) {
            seen.push(letter);
        }
    }
    match seen.len() {
        4 if seen == ['A', 'B', 'C', 'D'] => 100.0,
        4 => 70.0,
        3 => 50.0,
        2 => 30.0,
        1 => 10.0,
        _ => 0.0,
    }
}

/// Share of markers using the dominant style; 50 when there are none.
pub fn format_score(text: &str) -> f64 {
    let markers = option_markers(text);
    if markers.is_empty() {
        return 50.0;
    }
    let styles = [
        MarkerStyle::Dot,
        MarkerStyle::Comma,
        MarkerStyle::Colon,
        MarkerStyle::Paren,
        MarkerStyle::RightParen,
    ];
    let dominant = styles
        .iter()
        .map(|s| markers.iter().filter(|(_, m)| m == s).count())
        .max()
        .unwrap_or(0);
    dominant as f64 / markers.len() as f64 * 100.0
}

pub fn structure_score(text: &str) -> f64 {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return 0.0;
    }
    let mut score: f64 = 0.0;

    if has_leading_number(trimmed) {
        score += 30.0;
    }
    if trimmed.contains(['?', '？'])
        || trimmed.contains("__")
        || trimmed.contains("（ ）")
        || trimmed.contains("( )")
        || trimmed.contains("（）")
    {
        score += 20.0;
    }
    let lines = trimmed.lines().filter(|l| !l.trim().is_empty()).count();
    if (1..=30).contains(&lines) {
        score += 20.0;
    }
    if has_sub_question_markers(trimmed) {
        score += 15.0;
    }
    let visible: Vec<char> = trimmed.chars().filter(|c| !c.is_whitespace()).collect();
    let cjk = visible.iter().filter(|&&c| is_cjk(c)).count();
    let share = cjk as f64 / visible.len().max(1) as f64;
    if (0.2..=0.95).contains(&share) {
        score += 15.0;
    }
    score.min(100.0)
}

/// `1.`, `12、`, `3)`, `(4)`, `【5】`, `[6]`, `第7题` at the start.
fn has_leading_number(text: &str) -> bool {
    let mut chars = text.chars().peekable();
    match chars.peek().copied() {
        Some('第') => {
            chars.next();
            let digits = chars.by_ref().take_while(|c| c.is_ascii_digit()).count();
            digits > 0 && text.contains('题')
        }
        Some('(' | '（' | '[' | '【') => {
            chars.next();
            let digits: String = chars.by_ref().take_while(|c| c.is_ascii_digit()).collect();
            !digits.is_empty() && digits.len() <= 3
        }
        Some(c) if c.is_ascii_digit() => {
            let digits = chars.by_ref().take_while(|c| c.is_ascii_digit()).count();
            let rest = &text[text.char_indices().nth(digits).map(|(i, _)| i).unwrap_or(text.len())..];
            digits <= 3 && rest.starts_with(['.', '．', '、', ')', '）'])
        }
        _ => false,
    }
}

fn has_sub_question_markers(text: &str) -> bool {
    const CIRCLED: [char; 10] = ['①', '②', '③', '④', '⑤', '⑥', '⑦', '⑧', '⑨', '⑩'];
    let circled = text.chars().filter(|c| CIRCLED.contains(c)).count();
    let paren = ["(1)", "(2)", "（1）", "（2）"]
        .iter()
        .filter(|m| text.contains(*m))
        .count();
    circled >= 2 || paren >= 2
}

fn char_bigrams(text: &str) -> HashSet<(char, char)> {
    let chars: Vec<char> = text.chars().filter(|c| !c.is_whitespace()).collect();
    chars.windows(2).map(|w| (w[0], w[1])).collect()
}

/// Mean Jaccard similarity of candidate `index`'s bigrams with every other
/// candidate's; 50 for a lone candidate.
fn consistency_score(index: usize, bigrams: &[HashSet<(char, char)>]) -> f64 {
    if bigrams.len() < 2 {
        return 50.0;
    }
    let own = &bigrams[index];
    let total: f64 = bigrams
        .iter()
        .enumerate()
        .filter(|(j, _)| *j != index)
        .map(|(_, other)| {
            let union = own.union(other).count();
            if union == 0 {
                0.0
            } else {
                own.intersection(other).count() as f64 / union as f64
            }
        })
        .sum();
    total / (bigrams.len() - 1) as f64 * 100.0
}

const TRIG_FUNCTIONS: [&str; 6] = ["sin", "cos", "tan", "cot", "sec", "csc"];
const MALFORMED_TRIG: [&str; 12] = [
    "s1n", "sln", "5in", "c0s", "co5", "7an", "tam", "SIN", "COS", "TAN", "Sin", "Cos",
];

/// 25 per canonical trig function, minus 15 per malformed spelling.
pub fn trig_score(text: &str) -> f64 {
    let good: usize = TRIG_FUNCTIONS.iter().map(|f| count_word(text, f)).sum();
    let bad: usize = MALFORMED_TRIG.iter().map(|f| count_word(text, f)).sum();
    (good as f64 * 25.0 - bad as f64 * 15.0).clamp(0.0, 100.0)
}

/// Occurrences of `needle` not embedded in a longer ASCII word.
fn count_word(text: &str, needle: &str) -> usize {
    text.match_indices(needle)
        .filter(|(i, _)| {
            let before = text[..*i].chars().next_back();
            let after = text[i + needle.len()..].chars().next();
            !before.is_some_and(|c| c.is_ascii_alphabetic())
                && !after.is_some_and(|c| c.is_ascii_lowercase())
        })
        .count()
}

pub fn angle_score(text: &str) -> f64 {
    let hits = text
        .chars()
        .filter(|c| matches!(c, '°' | '∠' | '△' | '⊥' | '∥' | 'π'))
        .count();
    (hits as f64 * 20.0).min(100.0)
}

pub fn math_score(text: &str) -> f64 {
    let hits = text
        .chars()
        .filter(|c| {
            matches!(
                c,
                '+' | '-' | '×' | '÷' | '=' | '≤' | '≥' | '≠' | '√' | '±' | '∞' | '∑' | '∫' | '^'
                    | '<' | '>' | '²' | '³'
            )
        })
        .count();
    (hits as f64 * 8.0).min(100.0)
}

/// 100 minus penalties for garbage glyphs, long repeated runs, and
/// punctuation noise; empty text scores 0.
pub fn quality_score(text: &str) -> f64 {
    let visible: Vec<char> = text.chars().filter(|c| !c.is_whitespace()).collect();
    if visible.is_empty() {
        return 0.0;
    }
    let mut score = 100.0;

    let garbage = visible
        .iter()
        .filter(|&&c| c == '\u{FFFD}' || c.is_control() || matches!(c, '□' | '■' | '¤' | '§' | '¦' | '`' | '~'))
        .count();
    score -= (garbage as f64 * 5.0).min(40.0);

    // Repeated runs of four or more; blank underscores and dot leaders are
    // legitimate.
    let mut runs = 0;
    let mut run_len = 1;
    for w in visible.windows(2) {
        if w[0] == w[1] && !matches!(w[0], '_' | '.' | '-' | '…' | '—') {
            run_len += 1;
            if run_len == 4 {
                runs += 1;
            }
        } else {
            run_len = 1;
        }
    }
    score -= (runs as f64 * 10.0).min(30.0);

    let punctuation = visible
        .iter()
        .filter(|c| c.is_ascii_punctuation() && !matches!(c, '.' | '(' | ')' | '_' | '=' | '+' | '-'))
        .count();
    if punctuation as f64 / visible.len() as f64 > 0.3 {
        score -= 20.0;
    }

    f64::max(score, 0.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(text: &str, confidence: f64, label: &str) -> RecognitionCandidate {
        RecognitionCandidate::new(text, confidence, label)
    }

    #[test]
    fn markers_respect_word_boundaries() {
        let markers = option_markers("A. 1 B、2 (C) 3 D: 4 BAD. 1D.");
        let letters: Vec<char> = markers.iter().map(|(l, _)| *l).collect();
        assert_eq!(letters, ['A', 'B', 'C', 'D']);
        assert_eq!(markers[2].1, MarkerStyle::Paren);
    }

    #[test]
    fn option_score_ladder() {
        assert_eq!(option_score("A. 1 B. 2 C. 3 D. 4"), 100.0);
        assert_eq!(option_score("B. 1 A. 2 C. 3 D. 4"), 70.0);
        assert_eq!(option_score("A. 1 B. 2 C. 3"), 50.0);
        assert_eq!(option_score("A. 1 C. 3"), 30.0);
        assert_eq!(option_score("A. 1"), 10.0);
        assert_eq!(option_score("no markers here"), 0.0);
        // Letters beyond D are ignored.
        assert_eq!(option_score("A. 1 B. 2 C. 3 D. 4 E. 5"), 100.0);
    }

    #[test]
    fn format_rewards_uniform_style() {
        assert_eq!(format_score("A. 1 B. 2 C. 3 D. 4"), 100.0);
        assert_eq!(format_score("A. 1 B、2 C. 3 D. 4"), 75.0);
        assert_eq!(format_score("plain"), 50.0);
    }

    #[test]
    fn structure_recognises_question_shape() {
        let score = structure_score("1. 下列函数中是奇函数的是（ ）\nA. x² B. sin x C. |x| D. 1");
        assert!(score >= 85.0, "score {score}");
        assert_eq!(structure_score(""), 0.0);
    }

    #[test]
    fn trig_penalises_malformed_names() {
        assert_eq!(trig_score("sin x + cos x"), 50.0);
        assert_eq!(trig_score("s1n x + cos x"), 10.0);
        assert_eq!(trig_score("sinh is not counted"), 0.0);
    }

    #[test]
    fn quality_of_garbage_is_low() {
        assert_eq!(quality_score(""), 0.0);
        assert_eq!(quality_score("1. 计算 2+3"), 100.0);
        assert!(quality_score("■■■■ ~~~~ ¤¤") < 60.0);
    }

    #[test]
    fn consistency_for_single_candidate_is_neutral() {
        let bigrams = vec![char_bigrams("abc")];
        assert_eq!(consistency_score(0, &bigrams), 50.0);
    }

    #[test]
    fn empty_set_is_an_error() {
        assert!(matches!(
            FusionScorer::new().select(&[]),
            Err(QuizlensError::EmptyCandidateSet)
        ));
    }

    #[test]
    fn complete_options_beat_higher_confidence() {
        let candidates = [
            candidate("1. 下列说法正确的是（ ）\nA. 甲 B. 乙 8. 丙 D. 丁", 90.0, "standard"),
            candidate("1. 下列说法正确的是（ ）\nA. 甲 B. 乙 C. 丙 D. 丁", 70.0, "option_letters"),
        ];
        let best = FusionScorer::new().select(&candidates).unwrap();
        assert_eq!(best.candidate.config_label, "option_letters");
    }

    #[test]
    fn equal_scores_keep_the_earlier_candidate() {
        let scorer = FusionScorer::new();
        let same = [candidate("same text", 40.0, "a"), candidate("same text", 40.0, "b")];
        let scored = scorer.score_all(&same).unwrap();
        assert_eq!(scored[0].final_score, scored[1].final_score);
        assert_eq!(scorer.select(&same).unwrap().candidate.config_label, "a");
    }

    fn scored(label: &str, final_score: f64, confidence: f64) -> ScoredCandidate {
        ScoredCandidate {
            candidate: candidate("1. 题", confidence, label),
            scores: SubScores::default(),
            final_score,
            reported_confidence: 0.0,
        }
    }

    #[test]
    fn tied_final_scores_go_to_higher_raw_confidence() {
        for order in [["low", "high"], ["high", "low"]] {
            let set: Vec<ScoredCandidate> = order
                .iter()
                .map(|&label| scored(label, 62.5, if label == "high" { 90.0 } else { 60.0 }))
                .collect();
            assert_eq!(pick_best(set).unwrap().candidate.config_label, "high");
        }
    }

    #[test]
    fn full_ties_keep_the_earlier_candidate() {
        let best = pick_best(vec![scored("first", 50.0, 70.0), scored("second", 50.0, 70.0)]);
        assert_eq!(best.unwrap().candidate.config_label, "first");
    }

    #[test]
    fn higher_final_score_beats_higher_confidence() {
        let best = pick_best(vec![scored("confident", 50.0, 99.0), scored("better", 51.0, 10.0)]);
        assert_eq!(best.unwrap().candidate.config_label, "better");
        assert!(pick_best(Vec::new()).is_none());
    }

    #[test]
    fn identical_text_is_lifted_by_raw_confidence() {
        let best = FusionScorer::new()
            .select(&[candidate("1. 题", 40.0, "low"), candidate("1. 题", 41.0, "high")])
            .unwrap();
        assert_eq!(best.candidate.config_label, "high");
    }

    #[test]
    fn reported_confidence_is_capped() {
        let best = FusionScorer::new()
            .select(&[candidate("1. 求 sin 30° + cos 60° = ?", 100.0, "standard")])
            .unwrap();
        assert!(best.reported_confidence <= MAX_REPORTED_CONFIDENCE);
        let expected = (0.7 * best.final_score + 30.0).min(MAX_REPORTED_CONFIDENCE);
        assert!((best.reported_confidence - expected).abs() < 1e-9);
    }

    #[test]
    fn structure_hint_switches_weights() {
        let candidates = [candidate("计算 1+1", 80.0, "standard")];
        let plain = FusionScorer::new().select(&candidates).unwrap();
        let hinted = FusionScorer::new()
            .with_structure_hint("1. 例题 A. 1 B. 2 C. 3 D. 4")
            .select(&candidates)
            .unwrap();
        assert!(hinted.final_score < plain.final_score);
    }
}
