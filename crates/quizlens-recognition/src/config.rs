// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Recognition configurations — one parameter set per recognizer invocation.

use quizlens_core::RecognitionPreset;
use serde::{Deserialize, Serialize};

const DIGITS_AND_LATIN: &str =
    "0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz";
const ASCII_PUNCTUATION: &str = ".,;:!?'\"()[]{}<>-_/\\+=*&%$#@";
const MATH_SYMBOLS: &str = "+-×÷=≠≈≤≥<>±∓√∛∫∑∏∞∠°△⊥∥πθαβγλμσφω∈∉⊂⊆∪∩∅^′″·‰%";
const CJK_PUNCTUATION: &str = "，。、；：？！（）【】《》“”‘’…—";

/// How the recognizer should interpret page layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PageSegmentation {
    #[default]
    Auto,
    SingleBlock,
    SingleColumn,
    SparseText,
    SingleLine,
}

impl PageSegmentation {
    /// Whether the layout is best read line by line rather than as a block.
    pub fn prefers_line_layout(&self) -> bool {
        matches!(self, Self::SparseText | Self::SingleLine)
    }
}

/// Parameters for one recognizer invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecognitionConfig {
    /// Identifies the config on candidates and in logs.
    pub label: String,
    /// Language codes, e.g. `chi_sim`, `eng`.
    pub languages: Vec<String>,
    /// Admissible non-CJK characters; `None` admits everything.
    pub whitelist: Option<String>,
    pub segmentation: PageSegmentation,
    pub preserve_interword_spaces: bool,
}

impl RecognitionConfig {
    /// Mixed Chinese/Latin text with automatic layout.
    pub fn standard() -> Self {
        Self {
            label: "standard".into(),
            languages: vec!["chi_sim".into(), "eng".into()],
            whitelist: None,
            segmentation: PageSegmentation::Auto,
            preserve_interword_spaces: true,
        }
    }

    /// Treat the page as one block so option rows stay together.
    pub fn option_letters() -> Self {
        Self {
            label: "option_letters".into(),
            segmentation: PageSegmentation::SingleBlock,
            ..Self::standard()
        }
    }

    /// Restrict non-CJK output to digits, Latin letters, punctuation, and
    /// math symbols.
    pub fn math_symbols() -> Self {
        Self {
            label: "math_symbols".into(),
            whitelist: Some(
                [DIGITS_AND_LATIN, ASCII_PUNCTUATION, MATH_SYMBOLS, CJK_PUNCTUATION].concat(),
            ),
            segmentation: PageSegmentation::SingleBlock,
            ..Self::standard()
        }
    }

    /// English-only pages with scattered text.
    pub fn latin_only() -> Self {
        Self {
            label: "latin_only".into(),
            languages: vec!["eng".into()],
            whitelist: Some([DIGITS_AND_LATIN, ASCII_PUNCTUATION].concat()),
            segmentation: PageSegmentation::SparseText,
            preserve_interword_spaces: true,
        }
    }

    pub fn from_preset(preset: RecognitionPreset) -> Self {
        match preset {
            RecognitionPreset::Standard => Self::standard(),
            RecognitionPreset::OptionLetters => Self::option_letters(),
            RecognitionPreset::MathSymbols => Self::math_symbols(),
            RecognitionPreset::LatinOnly => Self::latin_only(),
        }
    }

    pub fn reads_chinese(&self) -> bool {
        self.languages.iter().any(|l| l.starts_with("chi"))
    }

    /// Whether `c` may appear in output produced under this config.
    ///
    /// Whitespace is always admitted; CJK ideographs are admitted whenever a
    /// Chinese language is configured.
    pub fn admits(&self, c: char) -> bool {
        if c.is_whitespace() {
            return true;
        }
        if is_cjk(c) {
            return self.reads_chinese();
        }
        match &self.whitelist {
            Some(list) => list.contains(c),
            None => true,
        }
    }
}

impl Default for RecognitionConfig {
    fn default() -> Self {
        Self::standard()
    }
}

/// CJK unified ideographs (basic block and extension A).
pub fn is_cjk(c: char) -> bool {
    matches!(c, '\u{4E00}'..='\u{9FFF}' | '\u{3400}'..='\u{4DBF}')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn presets_have_distinct_labels() {
        let labels: std::collections::BTreeSet<String> = [
            RecognitionPreset::Standard,
            RecognitionPreset::OptionLetters,
            RecognitionPreset::MathSymbols,
            RecognitionPreset::LatinOnly,
        ]
        .into_iter()
        .map(|p| RecognitionConfig::from_preset(p).label)
        .collect();
        assert_eq!(labels.len(), 4);
    }

    #[test]
    fn standard_admits_everything() {
        let config = RecognitionConfig::standard();
        assert!(config.admits('题'));
        assert!(config.admits('€'));
    }

    #[test]
    fn latin_only_rejects_cjk_and_symbols() {
        let config = RecognitionConfig::latin_only();
        assert!(config.admits('A'));
        assert!(config.admits(' '));
        assert!(!config.admits('题'));
        assert!(!config.admits('√'));
    }

    #[test]
    fn math_whitelist_keeps_cjk_and_operators() {
        let config = RecognitionConfig::math_symbols();
        assert!(config.admits('解'));
        assert!(config.admits('√'));
        assert!(config.admits('∠'));
        assert!(!config.admits('€'));
    }

    #[test]
    fn segmentation_layout_preference() {
        assert!(PageSegmentation::SparseText.prefers_line_layout());
        assert!(!PageSegmentation::Auto.prefers_line_layout());
    }
}
