// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Core domain types for the Quizlens question scanner.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for one recognition request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RequestId(pub Uuid);

impl RequestId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// School subject a question belongs to.
///
/// Serialised with the Chinese label used on exam papers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Subject {
    #[serde(rename = "数学")]
    Math,
    #[serde(rename = "物理")]
    Physics,
    #[serde(rename = "化学")]
    Chemistry,
    #[serde(rename = "生物")]
    Biology,
    #[serde(rename = "语文")]
    Chinese,
    #[serde(rename = "英语")]
    English,
    #[serde(rename = "历史")]
    History,
    #[serde(rename = "地理")]
    Geography,
    #[serde(rename = "政治")]
    Politics,
    #[serde(rename = "未知")]
    Unknown,
}

impl Subject {
    /// Every concrete subject, in scoring order.
    pub const ALL: [Subject; 9] = [
        Subject::Math,
        Subject::Physics,
        Subject::Chemistry,
        Subject::Biology,
        Subject::Chinese,
        Subject::English,
        Subject::History,
        Subject::Geography,
        Subject::Politics,
    ];

    /// Chinese label, e.g. `数学`.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Math => "数学",
            Self::Physics => "物理",
            Self::Chemistry => "化学",
            Self::Biology => "生物",
            Self::Chinese => "语文",
            Self::English => "英语",
            Self::History => "历史",
            Self::Geography => "地理",
            Self::Politics => "政治",
            Self::Unknown => "未知",
        }
    }

    /// Parse either the Chinese label or the English name.
    pub fn from_name(name: &str) -> Option<Self> {
        let trimmed = name.trim();
        Self::ALL
            .iter()
            .chain(std::iter::once(&Self::Unknown))
            .copied()
            .find(|s| s.label() == trimmed || s.english_name().eq_ignore_ascii_case(trimmed))
    }

    /// Lower-case English name, e.g. `math`.
    pub fn english_name(&self) -> &'static str {
        match self {
            Self::Math => "math",
            Self::Physics => "physics",
            Self::Chemistry => "chemistry",
            Self::Biology => "biology",
            Self::Chinese => "chinese",
            Self::English => "english",
            Self::History => "history",
            Self::Geography => "geography",
            Self::Politics => "politics",
            Self::Unknown => "unknown",
        }
    }

    pub fn is_unknown(&self) -> bool {
        matches!(self, Self::Unknown)
    }
}

impl std::fmt::Display for Subject {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Coarse question kind reported by the classifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionKind {
    MultipleChoice,
    Subjective,
    Unknown,
}

/// Detailed question type, labelled the way exam papers name them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum QuestionType {
    #[serde(rename = "单选题")]
    SingleChoice,
    #[serde(rename = "多选题")]
    MultipleChoice,
    #[serde(rename = "填空题")]
    FillBlank,
    #[serde(rename = "证明题")]
    Proof,
    #[serde(rename = "实验题")]
    Experiment,
    #[serde(rename = "作图题")]
    Diagram,
    #[serde(rename = "阅读理解")]
    ReadingComprehension,
    #[serde(rename = "完形填空")]
    Cloze,
    #[serde(rename = "翻译题")]
    Translation,
    #[serde(rename = "作文")]
    Composition,
    #[serde(rename = "判断题")]
    TrueFalse,
    #[serde(rename = "语法填空")]
    GrammarFill,
    #[serde(rename = "改错题")]
    ErrorCorrection,
    #[serde(rename = "计算题")]
    Calculation,
    #[serde(rename = "简答题")]
    ShortAnswer,
    #[serde(rename = "解答题")]
    Subjective,
    #[serde(rename = "未知")]
    Unknown,
}

impl QuestionType {
    pub fn label(&self) -> &'static str {
        match self {
            Self::SingleChoice => "单选题",
            Self::MultipleChoice => "多选题",
            Self::FillBlank => "填空题",
            Self::Proof => "证明题",
            Self::Experiment => "实验题",
            Self::Diagram => "作图题",
            Self::ReadingComprehension => "阅读理解",
            Self::Cloze => "完形填空",
            Self::Translation => "翻译题",
            Self::Composition => "作文",
            Self::TrueFalse => "判断题",
            Self::GrammarFill => "语法填空",
            Self::ErrorCorrection => "改错题",
            Self::Calculation => "计算题",
            Self::ShortAnswer => "简答题",
            Self::Subjective => "解答题",
            Self::Unknown => "未知",
        }
    }

    /// Map onto the coarse kind.
    pub fn kind(&self) -> QuestionKind {
        match self {
            Self::SingleChoice | Self::MultipleChoice => QuestionKind::MultipleChoice,
            Self::Unknown => QuestionKind::Unknown,
            _ => QuestionKind::Subjective,
        }
    }
}

impl std::fmt::Display for QuestionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Which family of math markup a question carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FormulaType {
    Latex,
    Mathtype,
    Mixed,
}

// -- Recognition ---------------------------------------------------------------

/// One engine/configuration's text output for an image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecognitionCandidate {
    pub text: String,
    /// Raw engine confidence, 0..=100.
    pub confidence: f64,
    /// Label of the recognition config that produced this text.
    pub config_label: String,
}

impl RecognitionCandidate {
    pub fn new(text: impl Into<String>, confidence: f64, config_label: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            confidence: confidence.clamp(0.0, 100.0),
            config_label: config_label.into(),
        }
    }
}

/// Named sub-scores computed by the fusion scorer, each on 0..=100.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SubScores {
    pub option: f64,
    pub format: f64,
    pub structure: f64,
    pub consistency: f64,
    pub trig: f64,
    pub angle: f64,
    pub math: f64,
    pub quality: f64,
}

/// A candidate enriched with its fusion score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredCandidate {
    pub candidate: RecognitionCandidate,
    pub scores: SubScores,
    /// Weighted sum of sub-scores and raw confidence, 0..=100.
    pub final_score: f64,
    /// Confidence reported downstream (score-dominant blend, capped at 99).
    pub reported_confidence: f64,
}

// -- Classification ------------------------------------------------------------

/// Boolean signals and per-subject scores behind a classification.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClassificationFeatures {
    pub has_question_number: bool,
    pub has_options: bool,
    pub has_question_words: bool,
    pub has_math_symbols: bool,
    pub length_plausible: bool,
    pub text_length: usize,
    pub subject_scores: BTreeMap<Subject, f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationResult {
    pub is_question: bool,
    /// Question likelihood, 0..=1.
    pub confidence: f64,
    pub question_type: QuestionKind,
    pub detailed_type: QuestionType,
    pub subject: Subject,
    pub features: ClassificationFeatures,
}

// -- Parsed question -----------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionOption {
    pub key: String,
    pub value: String,
}

impl QuestionOption {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParentQuestion {
    pub number: Option<String>,
    pub body: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubQuestion {
    pub number: String,
    pub body: String,
    pub options: Option<Vec<QuestionOption>>,
}

/// Root output of the structural parser.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParsedQuestion {
    pub subject: Subject,
    pub question_number: Option<String>,
    pub question_type: QuestionType,
    pub body: String,
    pub options: Option<Vec<QuestionOption>>,
    pub parent_question: Option<ParentQuestion>,
    pub sub_questions: Option<Vec<SubQuestion>>,
    pub has_formulas: bool,
    pub formula_type: Option<FormulaType>,
}

impl ParsedQuestion {
    /// The record returned for empty or unparseable input.
    pub fn unknown() -> Self {
        Self {
            subject: Subject::Unknown,
            question_number: None,
            question_type: QuestionType::Unknown,
            body: String::new(),
            options: None,
            parent_question: None,
            sub_questions: None,
            has_formulas: false,
            formula_type: None,
        }
    }

    pub fn is_composite(&self) -> bool {
        self.parent_question.is_some()
    }
}

// -- Pipeline output -----------------------------------------------------------

/// Result of running the recognition path over one image.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecognitionOutcome {
    pub request_id: RequestId,
    /// Corrected text of the winning candidate.
    pub text: String,
    /// Reported confidence, 0..=99.
    pub confidence: f64,
    pub classification: ClassificationResult,
    /// Structured question read from `text`.
    pub question: ParsedQuestion,
    /// Label of the recognition config that won fusion.
    pub config_label: String,
    /// Human-readable audit trail; never parsed.
    pub processing_steps: Vec<String>,
    pub processing_time_ms: u64,
    /// SHA-256 of the input image bytes.
    pub image_sha256: String,
    pub completed_at: DateTime<Utc>,
}

// -- Presets -------------------------------------------------------------------

/// Named enhancement profile presets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnhancementPreset {
    /// Ordinary printed text.
    #[default]
    General,
    /// Dense math notation (fractions, radicals, operators).
    MathSymbols,
    /// Sub/superscripts and small option letters.
    SmallGlyph,
}

/// Named recognition configuration presets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecognitionPreset {
    /// Mixed Chinese/Latin, automatic page segmentation.
    Standard,
    /// Single text block, tuned for option letters.
    OptionLetters,
    /// Math-symbol whitelist.
    MathSymbols,
    /// Latin only, sparse text.
    LatinOnly,
}

/// A recognition capability in the fallback chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EngineKind {
    /// The bundled `ocrs` engine.
    Local,
    /// An externally registered capability, looked up by name.
    Remote { name: String },
}

impl EngineKind {
    pub fn name(&self) -> &str {
        match self {
            Self::Local => "local",
            Self::Remote { name } => name,
        }
    }
}
