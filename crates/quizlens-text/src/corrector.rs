// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Rule-based repair of recognized question text.
//
// Rules run in a fixed order:
//   1. symbol normalization
//   2. option-letter disambiguation
//   3. trig / angle / bracket repair
//   4. option format standardization
//   5. option sequence repair and missing-option recovery
// followed by whitespace normalization. The whole pass repeats until the
// text is stable, so `correct(correct(t)) == correct(t)`.

use std::collections::BTreeSet;

use regex::{Captures, Regex};
use tracing::{debug, instrument};

const OPTION_LETTERS: [char; 4] = ['A', 'B', 'C', 'D'];

/// Upper bound on correction passes; one pass settles ordinary text.
const MAX_PASSES: usize = 4;

// -- Option slots -------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SlotForm {
    /// `X.`, `X:`, `X、`, `X)`
    Separator,
    /// `(X)`
    Paren,
}

/// A single-character option marker found in the text. Indices are char
/// offsets.
#[derive(Debug, Clone, Copy)]
struct Slot {
    start: usize,
    letter_at: usize,
    /// One past the separator or closing paren.
    end: usize,
    glyph: char,
    form: SlotForm,
}

/// Find every option slot whose glyph satisfies `is_candidate`.
///
/// A separator slot needs a glyph not glued to a preceding word, followed by
/// one of `. : 、 )`. Enumerations such as `A、B、C` and ellipses are not
/// slots.
fn scan_slots(chars: &[char], is_candidate: impl Fn(char) -> bool) -> Vec<Slot> {
    let mut slots = Vec::new();
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];

        if c == '(' && chars.get(i + 2) == Some(&')') && chars.get(i + 1).is_some_and(|&g| is_candidate(g)) {
            slots.push(Slot {
                start: i,
                letter_at: i + 1,
                end: i + 3,
                glyph: chars[i + 1],
                form: SlotForm::Paren,
            });
            i += 3;
            continue;
        }

        if is_candidate(c) {
            let glued = i
                .checked_sub(1)
                .map(|p| chars[p])
                .is_some_and(|p| p.is_ascii_alphanumeric() || p == '.' || p == '(');
            let sep = chars.get(i + 1).copied();
            if !glued && matches!(sep, Some('.' | ':' | '、' | ')')) {
                let after = chars.get(i + 2).copied();
                let enumeration = matches!(sep, Some(':' | '、')) && after.is_some_and(|a| a.is_ascii_uppercase());
                let ellipsis = sep == Some('.') && after == Some('.');
                if !enumeration && !ellipsis {
                    slots.push(Slot {
                        start: i,
                        letter_at: i,
                        end: i + 2,
                        glyph: c,
                        form: SlotForm::Separator,
                    });
                    i += 2;
                    continue;
                }
            }
        }
        i += 1;
    }
    slots
}

fn is_option_letter(c: char) -> bool {
    OPTION_LETTERS.contains(&c)
}

/// Glyphs recognizers commonly produce in place of an option letter.
fn confusable_letter(c: char) -> Option<char> {
    let letter = match c {
        '甲' | '人' | '八' | 'Α' | 'А' | 'α' | 'a' | '1' | 'Ⓐ' => 'A',
        '乙' | '日' | 'Β' | 'В' | 'β' | 'b' | '2' | '8' | 'Ⓑ' => 'B',
        '丙' | '匚' | 'С' | 'Ϲ' | 'c' | '3' | 'G' | 'Ⓒ' => 'C',
        '丁' | '口' | 'Δ' | 'Д' | 'd' | '4' | '0' | 'O' | 'Ⓓ' => 'D',
        _ => return None,
    };
    Some(letter)
}

/// Whether only whitespace precedes `at` on its line.
fn starts_line(chars: &[char], at: usize) -> bool {
    chars[..at]
        .iter()
        .rev()
        .take_while(|&&c| c != '\n')
        .all(|c| c.is_whitespace())
}

fn line_end(chars: &[char], from: usize) -> usize {
    chars[from..]
        .iter()
        .position(|&c| c == '\n')
        .map_or(chars.len(), |p| from + p)
}

/// Assign a group index to each slot. A new group starts at an `A` once the
/// current group has reached `C` or `D`.
fn group_ids(letters: &[char]) -> Vec<usize> {
    let mut ids = Vec::with_capacity(letters.len());
    let mut group = 0;
    let mut highest: Option<char> = None;
    for &letter in letters {
        if letter == 'A' && highest.is_some_and(|h| h >= 'C') {
            group += 1;
            highest = None;
        }
        highest = highest.max(Some(letter));
        ids.push(group);
    }
    ids
}

// -- Corrector ----------------------------------------------------------------

/// Deterministic repair of recognition text. Construction compiles the rule
/// patterns once; `correct` is pure.
pub struct TextCorrector {
    sin: Option<Regex>,
    cos: Option<Regex>,
    tan: Option<Regex>,
    upper_trig: Option<Regex>,
    degree_sign: Option<Regex>,
    degree_letter: Option<Regex>,
    angle: Option<Regex>,
}

impl Default for TextCorrector {
    fn default() -> Self {
        Self::new()
    }
}

impl TextCorrector {
    pub fn new() -> Self {
        Self {
            sin: Regex::new(r"(^|[^A-Za-z0-9])(?:s[1l]n|5in)").ok(),
            cos: Regex::new(r"(^|[^A-Za-z0-9])(?:c0s|co5)").ok(),
            tan: Regex::new(r"(^|[^A-Za-z0-9])7an").ok(),
            upper_trig: Regex::new(
                r"(^|[^A-Za-z0-9])(SIN|Sin|COS|Cos|TAN|Tan)(\s*[0-9xyθαβγφπ(∠]|\s?[A-Z](?:$|[^A-Za-z]))",
            )
            .ok(),
            degree_sign: Regex::new(r"(\d)\s?[º˚]").ok(),
            degree_letter: Regex::new(r"(\d)o($|[^A-Za-z])").ok(),
            angle: Regex::new(r"(^|[^A-Za-z0-9<])<\s?([A-Z]{3})($|[^A-Za-z])").ok(),
        }
    }

    /// Apply every rule in order and normalize whitespace, repeating until
    /// the text stops changing.
    #[instrument(skip(self, text), fields(len = text.len()))]
    pub fn correct(&self, text: &str) -> String {
        let mut current = self.pass(text);
        for _ in 1..MAX_PASSES {
            let next = self.pass(&current);
            if next == current {
                break;
            }
            current = next;
        }
        debug!(out_len = current.len(), "Correction complete");
        current
    }

    fn pass(&self, text: &str) -> String {
        let text = normalize_symbols(text);
        let text = disambiguate_option_letters(&text);
        let text = self.repair_math(&text);
        let text = repair_brackets(&text);
        let text = standardize_options(&text);
        let text = repair_option_sequence(&text);
        normalize_whitespace(&text)
    }

    fn repair_math(&self, text: &str) -> String {
        let mut out = text.to_string();
        for (re, canonical) in [(&self.sin, "sin"), (&self.cos, "cos"), (&self.tan, "tan")] {
            if let Some(re) = re {
                out = re.replace_all(&out, format!("${{1}}{}", canonical)).into_owned();
            }
        }
        if let Some(re) = &self.upper_trig {
            out = re
                .replace_all(&out, |caps: &Captures| {
                    format!("{}{}{}", &caps[1], caps[2].to_ascii_lowercase(), &caps[3])
                })
                .into_owned();
        }
        if let Some(re) = &self.degree_sign {
            out = re.replace_all(&out, "${1}°").into_owned();
        }
        if let Some(re) = &self.degree_letter {
            out = re.replace_all(&out, "${1}°${2}").into_owned();
        }
        if let Some(re) = &self.angle {
            out = re.replace_all(&out, "${1}∠${2}${3}").into_owned();
        }
        out
    }
}

/// Convenience wrapper over a default [`TextCorrector`].
pub fn correct(text: &str) -> String {
    TextCorrector::new().correct(text)
}

// -- Rule 1: symbols ------------------------------------------------------------

fn normalize_symbols(text: &str) -> String {
    text.replace("\r\n", "\n")
        .chars()
        .map(|c| match c {
            '\u{FF01}'..='\u{FF5E}' => char::from_u32(c as u32 - 0xFEE0).unwrap_or(c),
            '\u{3000}' | '\r' => ' ',
            '✕' | '✖' | '╳' => '×',
            '➗' => '÷',
            _ => c,
        })
        .collect()
}

// -- Rule 2: option letters -----------------------------------------------------

/// Remap confusable glyphs in option slots onto A–D, only where the letter
/// is missing from its group and the slot sits between its neighbours. A
/// confusable `A` after a group that reached `C` opens a new group.
fn disambiguate_option_letters(text: &str) -> String {
    let mut chars: Vec<char> = text.chars().collect();
    let slots: Vec<Slot> = scan_slots(&chars, |c| is_option_letter(c) || confusable_letter(c).is_some())
        .into_iter()
        .filter(|slot| {
            if is_option_letter(slot.glyph) || !slot.glyph.is_ascii_digit() {
                return true;
            }
            // Digits: never question numbers, sub-question numbers, or decimals.
            slot.form == SlotForm::Separator
                && !starts_line(&chars, slot.start)
                && !(chars[slot.end - 1] == '.' && chars.get(slot.end).is_some_and(|c| c.is_ascii_digit()))
        })
        .collect();
    if !slots.iter().any(|s| is_option_letter(s.glyph)) {
        return text.to_string();
    }

    let mut accepted: Vec<(usize, char)> = Vec::new();
    let mut present: BTreeSet<char> = BTreeSet::new();
    let mut highest: Option<char> = None;
    let mut last: Option<char> = None;
    for (index, slot) in slots.iter().enumerate() {
        let letter = if is_option_letter(slot.glyph) {
            slot.glyph
        } else {
            let Some(mapped) = confusable_letter(slot.glyph) else {
                continue;
            };
            let opens_group = mapped == 'A' && highest.is_some_and(|h| h >= 'C');
            let upcoming: Vec<char> = slots[index + 1..]
                .iter()
                .map(|s| s.glyph)
                .filter(|&g| is_option_letter(g))
                .take_while(|&g| g != 'A')
                .collect();
            let (seen, prev) = if opens_group {
                (false, None)
            } else {
                (present.contains(&mapped), last)
            };
            let fits = !seen
                && !upcoming.contains(&mapped)
                && prev.is_none_or(|p| p < mapped)
                && upcoming.first().is_none_or(|&n| n > mapped);
            if !fits {
                continue;
            }
            accepted.push((slot.letter_at, mapped));
            mapped
        };

        if letter == 'A' && highest.is_some_and(|h| h >= 'C') {
            present.clear();
            highest = None;
        }
        present.insert(letter);
        highest = highest.max(Some(letter));
        last = Some(letter);
    }

    if accepted.is_empty() {
        return text.to_string();
    }
    debug!(remapped = accepted.len(), "Remapped confusable option letters");
    for (at, letter) in accepted {
        chars[at] = letter;
    }
    chars.into_iter().collect()
}

// -- Rule 3: brackets -----------------------------------------------------------

/// Replace a closing bracket that does not match the innermost open one with
/// the one that does. Unbalanced brackets are left alone.
fn repair_brackets(text: &str) -> String {
    let mut stack: Vec<char> = Vec::new();
    text.chars()
        .map(|c| match c {
            '(' | '[' | '{' | '【' => {
                stack.push(c);
                c
            }
            ')' | ']' | '}' | '】' => match stack.pop() {
                Some(open) => closing_for(open),
                None => c,
            },
            _ => c,
        })
        .collect()
}

fn closing_for(open: char) -> char {
    match open {
        '(' => ')',
        '[' => ']',
        '{' => '}',
        _ => '】',
    }
}

// -- Rule 4: option format ------------------------------------------------------

/// Rewrite every option slot as `X. ` with a space before it.
fn standardize_options(text: &str) -> String {
    let chars: Vec<char> = text.chars().collect();
    let slots = scan_slots(&chars, is_option_letter);
    if slots.is_empty() {
        return text.to_string();
    }

    let mut out = String::with_capacity(text.len() + slots.len() * 2);
    let mut i = 0;
    for slot in &slots {
        out.extend(&chars[i..slot.start]);
        if out.chars().last().is_some_and(|c| !c.is_whitespace()) {
            out.push(' ');
        }
        out.push(slot.glyph);
        out.push_str(". ");
        i = slot.end;
        while chars.get(i).is_some_and(|&c| c == ' ' || c == '\t') {
            i += 1;
        }
    }
    out.extend(&chars[i..]);
    out
}

// -- Rule 5: option sequence ----------------------------------------------------

enum Edit {
    Relabel(char),
    Demote,
}

/// Within each option group, relabel or demote duplicate and out-of-order
/// markers, then insert empty markers for letters still missing.
fn repair_option_sequence(text: &str) -> String {
    let chars: Vec<char> = text.chars().collect();
    let slots = scan_slots(&chars, is_option_letter);
    if slots.is_empty() {
        return text.to_string();
    }
    let letters: Vec<char> = slots.iter().map(|s| s.glyph).collect();
    let groups = group_ids(&letters);

    let mut edits: Vec<Option<Edit>> = (0..slots.len()).map(|_| None).collect();
    // (char index, inserted text), applied in order
    let mut inserts: Vec<(usize, String)> = Vec::new();

    let mut start = 0;
    while start < slots.len() {
        let end = groups[start..]
            .iter()
            .position(|&g| g != groups[start])
            .map_or(slots.len(), |p| start + p);

        let mut kept: Vec<(usize, char)> = Vec::new();
        for index in start..end {
            let letter = letters[index];
            let last = kept.last().map(|&(_, l)| l);
            if last.is_none_or(|l| l < letter) {
                kept.push((index, letter));
                continue;
            }
            let remaining = &letters[index + 1..end];
            let candidate = last
                .and_then(|l| char::from_u32(l as u32 + 1))
                .filter(|&c| c <= 'D' && !remaining.contains(&c));
            match candidate {
                Some(next) => {
                    edits[index] = Some(Edit::Relabel(next));
                    kept.push((index, next));
                }
                None => edits[index] = Some(Edit::Demote),
            }
        }

        let mut trailing = Vec::new();
        for letter in OPTION_LETTERS {
            if kept.iter().any(|&(_, l)| l == letter) {
                continue;
            }
            match kept.iter().find(|&&(_, l)| l > letter) {
                Some(&(index, _)) => inserts.push((slots[index].start, format!("{}. ", letter))),
                None => trailing.push(letter),
            }
        }
        if let Some(&(last_index, _)) = kept.last() {
            if !trailing.is_empty() {
                let last = slots[last_index];
                let eol = line_end(&chars, last.letter_at);
                let next_group = slots.get(end).map(|s| s.start).filter(|&s| s < eol);
                let mut block = String::new();
                for letter in trailing {
                    match next_group {
                        Some(_) => block.push_str(&format!("{}. ", letter)),
                        None if starts_line(&chars, last.start) => block.push_str(&format!("\n{}.", letter)),
                        None => block.push_str(&format!(" {}.", letter)),
                    }
                }
                inserts.push((next_group.unwrap_or(eol), block));
            }
        }

        start = end;
    }

    if inserts.is_empty() && edits.iter().all(Option::is_none) {
        return text.to_string();
    }
    debug!(
        inserted = inserts.len(),
        edited = edits.iter().filter(|e| e.is_some()).count(),
        "Repaired option sequence"
    );

    inserts.sort_by_key(|&(at, _)| at);
    let mut out = String::with_capacity(text.len() + inserts.len() * 4);
    let mut pending = inserts.iter().peekable();
    let mut slot_at = slots.iter().zip(&edits).peekable();
    let mut skip_separator = None;
    for (i, &c) in chars.iter().enumerate() {
        while let Some((_, block)) = pending.next_if(|&&(at, _)| at == i) {
            out.push_str(block);
        }
        while slot_at.next_if(|(slot, _)| slot.letter_at < i).is_some() {}
        if skip_separator == Some(i) {
            continue;
        }
        match slot_at.peek() {
            Some((slot, Some(Edit::Relabel(letter)))) if slot.letter_at == i => out.push(*letter),
            Some((slot, Some(Edit::Demote))) if slot.letter_at == i => {
                out.push(c);
                skip_separator = Some(i + 1);
            }
            _ => out.push(c),
        }
    }
    for (_, block) in pending {
        out.push_str(block);
    }
    out
}

// -- Whitespace -----------------------------------------------------------------

/// Collapse runs of spaces, trim line ends, and keep at most one blank line.
fn normalize_whitespace(text: &str) -> String {
    let mut lines: Vec<String> = Vec::new();
    for line in text.lines() {
        let mut collapsed = String::with_capacity(line.len());
        let mut in_space = false;
        for c in line.chars() {
            if c == ' ' || c == '\t' {
                if !in_space {
                    collapsed.push(' ');
                }
                in_space = true;
            } else {
                collapsed.push(c);
                in_space = false;
            }
        }
        let trimmed = collapsed.trim_end().to_string();
        if trimmed.is_empty() && lines.last().is_none_or(|l| l.is_empty()) {
            continue;
        }
        lines.push(trimmed);
    }
    while lines.last().is_some_and(|l| l.is_empty()) {
        lines.pop();
    }
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn option_markers(text: &str) -> Vec<char> {
        let chars: Vec<char> = text.chars().collect();
        scan_slots(&chars, is_option_letter).iter().map(|s| s.glyph).collect()
    }

    #[test]
    fn full_width_options_become_standard() {
        assert_eq!(correct("A．1 B．2 C．3 D．4"), "A. 1 B. 2 C. 3 D. 4");
    }

    #[test]
    fn paren_options_are_rewritten() {
        assert_eq!(correct("(A) 1 (B) 2 (C) 3 (D) 4"), "A. 1 B. 2 C. 3 D. 4");
    }

    #[test]
    fn options_are_spaced_from_preceding_text() {
        assert_eq!(correct("A.红B.绿C.蓝D.黄"), "A. 红 B. 绿 C. 蓝 D. 黄");
    }

    #[test]
    fn confusable_digit_between_genuine_markers_is_remapped() {
        assert_eq!(correct("1. 下列 A. 3 8. 4 C. 5 D. 6"), "1. 下列 A. 3 B. 4 C. 5 D. 6");
    }

    #[test]
    fn cjk_confusable_is_remapped() {
        assert_eq!(correct("A. 甲 乙. 乙 C. 丙 D. 丁"), "A. 甲 B. 乙 C. 丙 D. 丁");
    }

    #[test]
    fn leading_question_number_is_never_remapped() {
        assert_eq!(correct("2. 题目 A. x C. y D. z"), "2. 题目 A. x B. C. y D. z");
    }

    #[test]
    fn confusable_is_left_when_letter_present() {
        let out = correct("A. 1 B. 2 8. 3 C. 4 D. 5");
        assert!(out.contains("8. 3"));
    }

    #[test]
    fn missing_trailing_option_is_appended() {
        assert_eq!(correct("A. 1 B. 2 C. 3"), "A. 1 B. 2 C. 3 D.");
    }

    #[test]
    fn missing_options_follow_line_layout() {
        assert_eq!(correct("题目\nA. 1\nB. 2"), "题目\nA. 1\nB. 2\nC.\nD.");
    }

    #[test]
    fn duplicate_is_relabelled() {
        assert_eq!(correct("A. 1 B. 2 B. 3 D. 4"), "A. 1 B. 2 C. 3 D. 4");
    }

    #[test]
    fn out_of_order_marker_is_demoted() {
        let out = correct("A. 1 C. 2 B. 3 D. 4");
        assert_eq!(option_markers(&out), vec!['A', 'B', 'C', 'D']);
        assert_eq!(out, "A. 1 B. C. 2 B 3 D. 4");
    }

    #[test]
    fn each_group_is_completed() {
        let out = correct("1. x A. 1 B. 2 C. 3 D. 4\n2. y A. 5 C. 6 D. 7");
        assert_eq!(option_markers(&out), vec!['A', 'B', 'C', 'D', 'A', 'B', 'C', 'D']);
    }

    #[test]
    fn trig_names_are_repaired() {
        assert_eq!(correct("s1n x + c0s x = 7an 45o"), "sin x + cos x = tan 45°");
        assert_eq!(correct("求Sin30º的值"), "求sin30°的值");
    }

    #[test]
    fn words_containing_trig_letters_survive() {
        assert_eq!(correct("Since the Tangent"), "Since the Tangent");
    }

    #[test]
    fn angles_are_repaired() {
        assert_eq!(correct("已知<ABC=90º"), "已知∠ABC=90°");
    }

    #[test]
    fn inequalities_are_not_angles() {
        assert_eq!(correct("x<ABC"), "x<ABC");
    }

    #[test]
    fn mismatched_brackets_are_repaired() {
        assert_eq!(correct("f(x] = [1, 2)"), "f(x) = [1, 2]");
    }

    #[test]
    fn operator_signs_are_unified() {
        assert_eq!(correct("3✕4➗2"), "3×4÷2");
    }

    #[test]
    fn enumerations_are_not_options() {
        assert_eq!(correct("A、B、C三点共线"), "A、B、C三点共线");
    }

    #[test]
    fn whitespace_is_normalized() {
        assert_eq!(correct("a  b   \n\n\n\nc  "), "a b\n\nc");
    }

    #[test]
    fn text_without_markers_is_unchanged() {
        let text = "计算 2+3 的值";
        assert_eq!(correct(text), text);
    }

    #[test]
    fn correction_is_idempotent() {
        let samples = [
            "1. 下列 A. 3 8. 4 C. 5 D. 6",
            "2. 题目 A. x C. y D. z",
            "A. 1 C. 2 B. 3 D. 4",
            "A. 1 B. 2 B. 3 B. 4",
            "（A）红（B）绿",
            "题目\nA. 1\nB. 2",
            "s1n x + <ABC = 30o (a] Ⓐ. 1 Ⓑ. 2",
            "A:1 B:2 C:3 D:4\n\n\n3. 又一题 甲. x 乙. y 丙. z 丁. w",
            "A. 1 B. 2 C. 3 D. 4 A. 5",
        ];
        for sample in samples {
            let once = correct(sample);
            assert_eq!(correct(&once), once, "not idempotent for {:?}", sample);
        }
    }

    #[test]
    fn any_option_marker_yields_complete_group() {
        for sample in ["A. 1", "B. x C. y", "A. 1 B. 2 B. 3 B. 4", "D) 4"] {
            let out = correct(sample);
            assert_eq!(option_markers(&out), vec!['A', 'B', 'C', 'D'], "for {:?}", sample);
        }
    }
}
