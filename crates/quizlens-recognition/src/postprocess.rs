// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Config-driven cleanup of raw engine output.

use crate::config::RecognitionConfig;

/// Share (0..=1) of non-whitespace characters the config admits. Empty text
/// scores 0.
pub fn admissible_share(text: &str, config: &RecognitionConfig) -> f64 {
    let (mut total, mut admitted) = (0usize, 0usize);
    for c in text.chars().filter(|c| !c.is_whitespace()) {
        total += 1;
        if config.admits(c) {
            admitted += 1;
        }
    }
    if total == 0 {
        0.0
    } else {
        admitted as f64 / total as f64
    }
}

/// Drop characters outside the whitelist and, unless the config preserves
/// inter-word spacing, collapse runs of spaces.
pub fn apply_config(text: &str, config: &RecognitionConfig) -> String {
    let filtered: String = text.chars().filter(|&c| config.admits(c)).collect();
    if config.preserve_interword_spaces {
        return filtered;
    }
    filtered
        .lines()
        .map(|line| line.split_whitespace().collect::<Vec<_>>().join(" "))
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn share_counts_only_visible_characters() {
        let config = RecognitionConfig::latin_only();
        assert_eq!(admissible_share("AB  题题", &config), 0.5);
        assert_eq!(admissible_share("   ", &config), 0.0);
    }

    #[test]
    fn whitelist_filters_output() {
        let config = RecognitionConfig::latin_only();
        assert_eq!(apply_config("A. 苹果 apple", &config), "A.  apple");
    }

    #[test]
    fn spaces_collapse_when_not_preserved() {
        let config = RecognitionConfig {
            preserve_interword_spaces: false,
            ..RecognitionConfig::standard()
        };
        assert_eq!(apply_config("A.   1   B.  2\nC. 3", &config), "A. 1 B. 2\nC. 3");
    }
}
