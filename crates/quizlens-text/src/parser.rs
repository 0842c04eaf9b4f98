// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Structural parsing of question text into a `ParsedQuestion`.
//
// Math spans are masked first (see `formula`). The masked text is then parsed
// in one of two modes:
//
//   composite: a parent stem followed by numbered sub-questions, chosen when
//              a discourse marker or a second numbering sequence is present
//   simple:    number, stem, and an optional option list

use quizlens_core::{ParentQuestion, ParsedQuestion, QuestionOption, SubQuestion, Subject};
use regex::Regex;
use tracing::{debug, instrument};

use crate::classifier::Classifier;
use crate::formula::{FormulaExtractor, FormulaScan};

const MIN_OPTIONS: usize = 2;
const MIN_SUB_QUESTIONS: usize = 2;

// -- Markers --------------------------------------------------------------------

/// Numbering style of sub-question markers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkerFamily {
    /// `(1)`, `（2）`
    Paren,
    /// `①`, `②`
    Circled,
    /// `1.` at the start of a line
    LineNumber,
}

impl MarkerFamily {
    const ALL: [MarkerFamily; 3] = [MarkerFamily::Paren, MarkerFamily::Circled, MarkerFamily::LineNumber];
}

/// A sub-question marker; offsets are bytes into the masked text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct SubMarker {
    start: usize,
    end: usize,
    number: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct LeadingNumber {
    number: String,
    end: usize,
}

/// Markers numbered 1, 2, 3, ... in order; anything out of sequence is text.
fn in_sequence(markers: &[SubMarker]) -> Vec<SubMarker> {
    let mut expected = 1;
    let mut accepted = Vec::new();
    for marker in markers {
        if marker.number == expected {
            accepted.push(*marker);
            expected += 1;
        }
    }
    accepted
}

fn circled_number(c: char) -> Option<u32> {
    ('①'..='⑳').contains(&c).then(|| c as u32 - '①' as u32 + 1)
}

/// `1.` directly followed by a digit is a decimal, not a marker.
fn is_decimal(text: &str, marker_end: usize) -> bool {
    text[..marker_end].ends_with('.') && text[marker_end..].starts_with(|c: char| c.is_ascii_digit())
}

// -- Parser ---------------------------------------------------------------------

/// An option list split out of a stem.
struct OptionSplit {
    stem: String,
    options: Option<Vec<QuestionOption>>,
}

/// Rule-driven question parser. Build once and reuse; `parse` is pure.
pub struct StructuralParser {
    classifier: Classifier,
    formulas: FormulaExtractor,
    leading: Vec<Regex>,
    option_marker: Option<Regex>,
    paren_marker: Option<Regex>,
    line_marker: Option<Regex>,
    discourse: Vec<Regex>,
}

impl Default for StructuralParser {
    fn default() -> Self {
        Self::new()
    }
}

impl StructuralParser {
    pub fn new() -> Self {
        Self::with_classifier(Classifier::new())
    }

    pub fn with_classifier(classifier: Classifier) -> Self {
        let compile =
            |patterns: &[&str]| -> Vec<Regex> { patterns.iter().filter_map(|p| Regex::new(p).ok()).collect() };
        Self {
            classifier,
            formulas: FormulaExtractor::new(),
            leading: compile(&[
                r"^(\d+)\s*[.、．]",
                r"^第\s*(\d+)\s*题[.、．:：]?",
                r"^[(（]\s*(\d+)\s*[)）]",
                r"^\[\s*(\d+)\s*\]",
                r"^【\s*(\d+)\s*】",
            ]),
            option_marker: Regex::new(r"(?:^|\s)([A-H][ \t]*[.．、:：]|[(（][A-H][)）])").ok(),
            paren_marker: Regex::new(r"[(（]\s*(\d+)\s*[)）]").ok(),
            line_marker: Regex::new(r"(?m)^[ \t]*(\d+)[ \t]*[.、．]").ok(),
            discourse: compile(&[
                r"阅读[\s\S]{0,60}?(?:完成|回答)[\s\S]{0,30}?题",
                r"根据[\s\S]{0,60}?材料[\s\S]{0,60}?回答",
                r"(?i)read the following[\s\S]{0,120}?answer",
                r"(?i)answer the following questions",
            ]),
        }
    }

    pub fn parse(&self, text: &str) -> ParsedQuestion {
        self.parse_with_hint(text, None)
    }

    /// Parse `text`, adopting `hint` when no subject is detected.
    #[instrument(skip(self, text), fields(len = text.len()))]
    pub fn parse_with_hint(&self, text: &str, hint: Option<Subject>) -> ParsedQuestion {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return ParsedQuestion::unknown();
        }

        let scan = self.formulas.extract(trimmed);
        let masked = scan.text.as_str();
        let leading = self.leading_number(masked);

        let mut parsed = match self.composite_markers(masked, leading.as_ref()) {
            Some(subs) => self.parse_composite(masked, leading, &subs, &scan, hint),
            None => self.parse_simple(masked, leading, &scan, hint),
        };
        parsed.has_formulas = scan.has_formulas();
        parsed.formula_type = scan.formula_type();

        debug!(
            composite = parsed.is_composite(),
            options = parsed.options.as_ref().map_or(0, Vec::len),
            subject = %parsed.subject,
            question_type = %parsed.question_type,
            "Parsed question"
        );
        parsed
    }

    fn leading_number(&self, text: &str) -> Option<LeadingNumber> {
        self.leading.iter().find_map(|re| {
            let caps = re.captures(text)?;
            let whole = caps.get(0)?;
            if is_decimal(text, whole.end()) {
                return None;
            }
            Some(LeadingNumber {
                number: caps.get(1)?.as_str().to_string(),
                end: whole.end(),
            })
        })
    }

    fn markers(&self, family: MarkerFamily, text: &str, skip: usize) -> Vec<SubMarker> {
        let from_regex = |re: &Option<Regex>| -> Vec<SubMarker> {
            let Some(re) = re else {
                return Vec::new();
            };
            re.captures_iter(text)
                .filter_map(|caps| {
                    let whole = caps.get(0)?;
                    let number = caps.get(1)?.as_str().parse().ok()?;
                    Some(SubMarker {
                        start: whole.start(),
                        end: whole.end(),
                        number,
                    })
                })
                .collect()
        };

        let markers: Vec<SubMarker> = match family {
            MarkerFamily::Paren => from_regex(&self.paren_marker)
                .into_iter()
                // `f(2)` is a call, not a marker.
                .filter(|m| !text[..m.start].ends_with(|c: char| c.is_ascii_alphanumeric()))
                .collect(),
            MarkerFamily::Circled => text
                .char_indices()
                .filter_map(|(at, c)| {
                    circled_number(c).map(|number| SubMarker {
                        start: at,
                        end: at + c.len_utf8(),
                        number,
                    })
                })
                .collect(),
            MarkerFamily::LineNumber => from_regex(&self.line_marker)
                .into_iter()
                .filter(|m| !is_decimal(text, m.end))
                .collect(),
        };
        markers.into_iter().filter(|m| m.start >= skip).collect()
    }

    /// Sub-question markers when `text` reads as a composite question.
    ///
    /// Composite when a discourse marker introduces a numbered series, or when
    /// two independent numbering sequences are present (the leading number
    /// counts as one). The first series to appear is used.
    fn composite_markers(&self, text: &str, leading: Option<&LeadingNumber>) -> Option<Vec<SubMarker>> {
        let skip = leading.map_or(0, |l| l.end);
        let series: Vec<Vec<SubMarker>> = MarkerFamily::ALL
            .iter()
            .map(|&family| in_sequence(&self.markers(family, text, skip)))
            .filter(|seq| seq.len() >= MIN_SUB_QUESTIONS)
            .collect();
        if series.is_empty() {
            return None;
        }

        let discourse = self.discourse.iter().any(|re| re.is_match(text));
        let sequences = series.len() + usize::from(leading.is_some());
        if !discourse && sequences < 2 {
            return None;
        }
        series.into_iter().min_by_key(|seq| seq[0].start)
    }

    fn parse_simple(
        &self,
        masked: &str,
        leading: Option<LeadingNumber>,
        scan: &FormulaScan,
        hint: Option<Subject>,
    ) -> ParsedQuestion {
        let rest = leading.as_ref().map_or(masked, |l| &masked[l.end..]);
        let split = self.split_options(rest, scan);

        let subject = self.subject_for(&[split.stem.as_str()], &scan.restore(masked), hint);
        let question_type = self.classifier.detect_type(&split.stem, split.options.is_some(), subject);

        ParsedQuestion {
            subject,
            question_number: leading.map(|l| l.number),
            question_type,
            body: split.stem,
            options: split.options,
            ..ParsedQuestion::unknown()
        }
    }

    fn parse_composite(
        &self,
        masked: &str,
        leading: Option<LeadingNumber>,
        subs: &[SubMarker],
        scan: &FormulaScan,
        hint: Option<Subject>,
    ) -> ParsedQuestion {
        let parent_start = leading.as_ref().map_or(0, |l| l.end);
        let parent_body = scan.restore(masked[parent_start..subs[0].start].trim());

        let sub_questions: Vec<SubQuestion> = subs
            .iter()
            .enumerate()
            .map(|(i, marker)| {
                let end = subs.get(i + 1).map_or(masked.len(), |next| next.start);
                let split = self.split_options(&masked[marker.end..end], scan);
                SubQuestion {
                    number: marker.number.to_string(),
                    body: split.stem,
                    options: split.options,
                }
            })
            .collect();

        let mut parts: Vec<&str> = vec![parent_body.as_str()];
        parts.extend(sub_questions.iter().map(|s| s.body.as_str()));
        let subject = self.subject_for(&parts, &scan.restore(masked), hint);
        let question_type = self.classifier.detect_type(&parts.join("\n"), false, subject);

        let number = leading.map(|l| l.number);
        ParsedQuestion {
            subject,
            question_number: number.clone(),
            question_type,
            body: parent_body.clone(),
            parent_question: Some(ParentQuestion {
                number,
                body: parent_body,
            }),
            sub_questions: Some(sub_questions),
            ..ParsedQuestion::unknown()
        }
    }

    /// Split `text` at its first option marker (preferring an `A`) and read
    /// ascending `letter + separator + text` triples from there. Fewer than two
    /// options leaves the whole text as the stem.
    fn split_options(&self, text: &str, scan: &FormulaScan) -> OptionSplit {
        let whole_stem = || OptionSplit {
            stem: scan.restore(text.trim()),
            options: None,
        };
        let Some(re) = &self.option_marker else {
            return whole_stem();
        };

        let markers: Vec<(usize, usize, char)> = re
            .captures_iter(text)
            .filter_map(|caps| {
                let marker = caps.get(1)?;
                let letter = marker.as_str().chars().find(|c| c.is_ascii_uppercase())?;
                Some((marker.start(), marker.end(), letter))
            })
            .collect();
        let first = markers.iter().position(|&(_, _, l)| l == 'A').unwrap_or(0);

        let mut accepted: Vec<(usize, usize, char)> = Vec::new();
        for &marker in markers.iter().skip(first) {
            if accepted.last().is_none_or(|&(_, _, prev)| prev < marker.2) {
                accepted.push(marker);
            }
        }
        if accepted.len() < MIN_OPTIONS {
            return whole_stem();
        }

        let options = accepted
            .iter()
            .enumerate()
            .map(|(i, &(_, end, letter))| {
                let value_end = accepted.get(i + 1).map_or(text.len(), |next| next.0);
                QuestionOption::new(letter.to_string(), scan.restore(text[end..value_end].trim()))
            })
            .collect();
        OptionSplit {
            stem: scan.restore(text[..accepted[0].0].trim()),
            options: Some(options),
        }
    }

    /// Subject of the stem parts, then of the whole text, then the hint.
    fn subject_for(&self, parts: &[&str], whole: &str, hint: Option<Subject>) -> Subject {
        [parts.join("\n").as_str(), whole]
            .iter()
            .map(|text| self.classifier.detect_subject(text))
            .find(|subject| !subject.is_unknown())
            .or(hint)
            .unwrap_or(Subject::Unknown)
    }
}

/// Parse with a default [`StructuralParser`].
pub fn parse(text: &str) -> ParsedQuestion {
    StructuralParser::new().parse(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use quizlens_core::{FormulaType, QuestionType};

    fn keys(options: &Option<Vec<QuestionOption>>) -> Vec<&str> {
        options.iter().flatten().map(|o| o.key.as_str()).collect()
    }

    #[test]
    fn empty_input_is_unknown() {
        let parsed = parse("");
        assert_eq!(parsed.subject, Subject::Unknown);
        assert_eq!(parsed.question_type, QuestionType::Unknown);
        assert!(parsed.options.is_none());
        assert!(!parsed.has_formulas);
        assert_eq!(parse("   \n "), ParsedQuestion::unknown());
    }

    #[test]
    fn simple_question_round_trip() {
        let parsed = parse("4. stem A. a B. b C. c D. d");
        assert_eq!(parsed.question_number.as_deref(), Some("4"));
        assert_eq!(parsed.body, "stem");
        assert_eq!(
            parsed.options,
            Some(vec![
                QuestionOption::new("A", "a"),
                QuestionOption::new("B", "b"),
                QuestionOption::new("C", "c"),
                QuestionOption::new("D", "d"),
            ])
        );
        assert_eq!(parsed.question_type, QuestionType::SingleChoice);
        assert!(!parsed.is_composite());
    }

    #[test]
    fn leading_number_forms() {
        let parser = StructuralParser::new();
        for (text, number) in [
            ("第12题 求值", "12"),
            ("(3) 求值", "3"),
            ("[7] 求值", "7"),
            ("【8】求值", "8"),
            ("5、求值", "5"),
        ] {
            assert_eq!(parser.parse(text).question_number.as_deref(), Some(number), "for {}", text);
        }
        assert_eq!(parser.parse("3.14 是圆周率的近似值").question_number, None);
    }

    #[test]
    fn paren_and_multiline_options() {
        let parsed = parse("1. 下列属于金属的是\n(A) 铁\n(B) 氧\n(C) 碳\n(D) 硫");
        assert_eq!(keys(&parsed.options), vec!["A", "B", "C", "D"]);
        assert_eq!(parsed.body, "下列属于金属的是");
        assert_eq!(parsed.options.unwrap()[0].value, "铁");
    }

    #[test]
    fn single_marker_is_not_an_option_list() {
        let parsed = parse("2. 说出 A. 的含义");
        assert!(parsed.options.is_none());
        assert_eq!(parsed.body, "说出 A. 的含义");
    }

    #[test]
    fn formulas_are_not_split_into_options() {
        let parsed = parse(r"6. 计算 $\frac{A. 1}{B. 2}$ 的值 A. 1 B. 2");
        assert!(parsed.has_formulas);
        assert_eq!(parsed.formula_type, Some(FormulaType::Latex));
        assert_eq!(parsed.body, r"计算 $\frac{A. 1}{B. 2}$ 的值");
        assert_eq!(keys(&parsed.options), vec!["A", "B"]);
    }

    #[test]
    fn reading_intro_with_paren_markers_is_composite() {
        let text = "阅读下面的材料，完成1～2题。\n材料：光合作用是绿色植物的重要过程。\n(1) 光合作用的场所是 A. 叶绿体 B. 线粒体\n(2) 简述光合作用的意义。";
        let parsed = parse(text);
        assert!(parsed.is_composite());
        let parent = parsed.parent_question.as_ref().unwrap();
        assert!(parent.body.starts_with("阅读下面的材料"));
        assert!(parent.number.is_none());

        let subs = parsed.sub_questions.as_ref().unwrap();
        assert_eq!(subs.len(), 2);
        assert_eq!(subs[0].number, "1");
        assert_eq!(subs[0].body, "光合作用的场所是");
        assert_eq!(keys(&subs[0].options), vec!["A", "B"]);
        assert_eq!(subs[1].body, "简述光合作用的意义。");
        assert!(subs[1].options.is_none());
        assert_eq!(parsed.subject, Subject::Biology);
    }

    #[test]
    fn numbered_question_with_sub_series_is_composite() {
        let parsed = parse("5. 已知函数 f(x) = 2x + 1\n(1) 求 f(2) 的值\n(2) 解方程 f(x) = 7");
        assert!(parsed.is_composite());
        assert_eq!(parsed.question_number.as_deref(), Some("5"));
        let subs = parsed.sub_questions.unwrap();
        assert_eq!(subs.len(), 2);
        assert_eq!(subs[0].body, "求 f(2) 的值");
        assert_eq!(subs[1].body, "解方程 f(x) = 7");
        assert_eq!(parsed.subject, Subject::Math);
    }

    #[test]
    fn circled_series_is_composite() {
        let parsed = parse("根据材料回答问题。① 事件发生的时间 ② 事件的影响");
        let subs = parsed.sub_questions.expect("composite");
        assert_eq!(subs.iter().map(|s| s.number.as_str()).collect::<Vec<_>>(), vec!["1", "2"]);
        assert_eq!(subs[1].body, "事件的影响");
    }

    #[test]
    fn single_sub_marker_stays_simple() {
        let parsed = parse("阅读材料，回答第1题。(1) 简述原因");
        assert!(!parsed.is_composite());
    }

    #[test]
    fn numbered_footnotes_read_as_composite() {
        // Two `(n)` footnotes in a numbered question look the same as a
        // sub-question series, so this parses as composite.
        let parsed = parse("3. 下列说法正确的是（注(1)见课本，(2)见附录）A. 甲 B. 乙 C. 丙 D. 丁");
        assert!(parsed.is_composite());
        assert_eq!(parsed.sub_questions.map(|s| s.len()), Some(2));
    }

    #[test]
    fn hint_applies_when_subject_unknown() {
        let parser = StructuralParser::new();
        let parsed = parser.parse_with_hint("1. 谈谈你的看法", Some(Subject::Politics));
        assert_eq!(parsed.subject, Subject::Politics);
    }
}
