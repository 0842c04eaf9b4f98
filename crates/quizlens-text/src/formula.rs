// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Formula pre-pass: math spans are swapped for `⟦Mn⟧` tokens before
// structural parsing so periods and letters inside them are never taken for
// option markers, then restored afterwards.

use quizlens_core::FormulaType;
use regex::Regex;
use tracing::debug;

/// Ordered LaTeX span patterns. Delimited spans run first so commands inside
/// them are captured whole.
const LATEX_PATTERNS: &[&str] = &[
    r"\$\$[\s\S]+?\$\$",
    r"\$[^$\n]+?\$",
    r"\\\([\s\S]+?\\\)",
    r"\\\[[\s\S]+?\\\]",
    r"\\begin\{[A-Za-z]+\*?\}[\s\S]*?\\end\{[A-Za-z]+\*?\}",
    r"\\d?frac\{[^{}]*\}\{[^{}]*\}",
    r"\\sqrt(?:\[[^\]]*\])?\{[^{}]*\}",
    r"\\(?:int|sum|lim|prod)(?:_\{[^{}]*\}|_[^\s{}])?(?:\^\{[^{}]*\}|\^[^\s{}])?",
    r"[A-Za-z0-9]?[\^_]\{[^{}]*\}",
];

/// Ordered MathType / Unicode span patterns.
const MATHTYPE_PATTERNS: &[&str] = &[
    r"[∫∑∏√][^\s,，。；;]*",
    r"lim_?\(?\s*[A-Za-z]\s*→\s*[^\s)]+\)?",
    r"[A-Za-z0-9]?[\^_]\([^()]*\)",
];

/// Text with math spans replaced, plus what was taken out.
#[derive(Debug, Clone, Default)]
pub struct FormulaScan {
    pub text: String,
    /// Original span for each `⟦Mn⟧`, indexed by `n`.
    pub formulas: Vec<String>,
    pub has_latex: bool,
    pub has_mathtype: bool,
}

impl FormulaScan {
    pub fn has_formulas(&self) -> bool {
        !self.formulas.is_empty()
    }

    pub fn formula_type(&self) -> Option<FormulaType> {
        match (self.has_latex, self.has_mathtype) {
            (true, true) => Some(FormulaType::Mixed),
            (true, false) => Some(FormulaType::Latex),
            (false, true) => Some(FormulaType::Mathtype),
            (false, false) => None,
        }
    }

    /// Put the original spans back into `text`.
    ///
    /// A span may itself contain an earlier token, so tokens are restored
    /// from the highest index down.
    pub fn restore(&self, text: &str) -> String {
        let mut out = text.to_string();
        for (index, formula) in self.formulas.iter().enumerate().rev() {
            let token = placeholder(index);
            if out.contains(&token) {
                out = out.replace(&token, formula);
            }
        }
        out
    }
}

pub fn placeholder(index: usize) -> String {
    format!("⟦M{}⟧", index)
}

/// Compiled span patterns for both notation families.
pub struct FormulaExtractor {
    latex: Vec<Regex>,
    mathtype: Vec<Regex>,
}

impl Default for FormulaExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl FormulaExtractor {
    pub fn new() -> Self {
        let compile =
            |patterns: &[&str]| -> Vec<Regex> { patterns.iter().filter_map(|p| Regex::new(p).ok()).collect() };
        Self {
            latex: compile(LATEX_PATTERNS),
            mathtype: compile(MATHTYPE_PATTERNS),
        }
    }

    pub fn extract(&self, text: &str) -> FormulaScan {
        let mut scan = FormulaScan {
            text: text.to_string(),
            ..FormulaScan::default()
        };
        for re in &self.latex {
            if replace_spans(re, &mut scan) {
                scan.has_latex = true;
            }
        }
        for re in &self.mathtype {
            if replace_spans(re, &mut scan) {
                scan.has_mathtype = true;
            }
        }
        if scan.has_formulas() {
            debug!(
                count = scan.formulas.len(),
                latex = scan.has_latex,
                mathtype = scan.has_mathtype,
                "Formula spans extracted"
            );
        }
        scan
    }
}

/// Replace every match of `re` with a fresh token. Returns whether anything
/// matched.
fn replace_spans(re: &Regex, scan: &mut FormulaScan) -> bool {
    let mut matched = false;
    let mut out = String::with_capacity(scan.text.len());
    let mut last = 0;
    for m in re.find_iter(&scan.text) {
        if m.as_str().trim().is_empty() {
            continue;
        }
        out.push_str(&scan.text[last..m.start()]);
        out.push_str(&placeholder(scan.formulas.len()));
        scan.formulas.push(m.as_str().to_string());
        last = m.end();
        matched = true;
    }
    if matched {
        out.push_str(&scan.text[last..]);
        scan.text = out;
    }
    matched
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_text_has_no_formulas() {
        let scan = FormulaExtractor::new().extract("计算 1+2 的值。");
        assert!(!scan.has_formulas());
        assert_eq!(scan.formula_type(), None);
        assert_eq!(scan.text, "计算 1+2 的值。");
    }

    #[test]
    fn dollar_spans_become_tokens() {
        let scan = FormulaExtractor::new().extract("已知 $x^2 = 4$，求 x");
        assert_eq!(scan.text, "已知 ⟦M0⟧，求 x");
        assert_eq!(scan.formulas, vec!["$x^2 = 4$"]);
        assert_eq!(scan.formula_type(), Some(FormulaType::Latex));
    }

    #[test]
    fn display_math_wins_over_inline() {
        let scan = FormulaExtractor::new().extract("$$a. b$$ and $c$");
        assert_eq!(scan.formulas, vec!["$$a. b$$", "$c$"]);
    }

    #[test]
    fn bare_commands_are_captured() {
        let scan = FormulaExtractor::new().extract(r"求 \frac{1}{2} + \sqrt{3} 的值");
        assert_eq!(scan.formulas.len(), 2);
        assert!(!scan.text.contains('\\'));
    }

    #[test]
    fn unicode_notation_is_mathtype() {
        let scan = FormulaExtractor::new().extract("求 ∫x²dx 与 lim x→0 的值");
        assert_eq!(scan.formula_type(), Some(FormulaType::Mathtype));
        assert_eq!(scan.formulas, vec!["∫x²dx", "lim x→0"]);
    }

    #[test]
    fn both_families_are_mixed() {
        let scan = FormulaExtractor::new().extract("$a$ 和 √2");
        assert_eq!(scan.formula_type(), Some(FormulaType::Mixed));
    }

    #[test]
    fn restore_undoes_extraction() {
        let text = r"设 x^{2} 满足 ∫x^{2}dx = $\frac{1}{3}$";
        let scan = FormulaExtractor::new().extract(text);
        assert!(scan.has_formulas());
        assert_eq!(scan.restore(&scan.text), text);
    }
}
