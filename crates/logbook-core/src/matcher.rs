//! Per-field match semantics.
//!
//! Text fields (description, title) are analyzed into lowercase alphanumeric
//! tokens; keyword fields (owner, level, logbook and tag names, property paths)
//! are matched as a whole value. Both support `?` (exactly one character) and
//! `*` (zero or more characters) wildcards. Fuzzy matching uses the optimal
//! string alignment distance and treats wildcard characters as literals.

/// Case handling for keyword matches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaseMode {
    /// Characters must match exactly.
    Sensitive,
    /// ASCII and Unicode case is ignored.
    Insensitive,
}

/// A single search term for an analyzed text field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TextTerm {
    /// One word, possibly with wildcards.
    Word(String),
    /// Words that must appear adjacent and in order.
    Phrase(String),
}

impl TextTerm {
    /// Returns true if the term matches the analyzed `tokens` of a field.
    #[must_use]
    pub fn matches(&self, tokens: &[String], fuzzy: bool) -> bool {
        match self {
            Self::Phrase(phrase) => phrase_matches(phrase, tokens),
            Self::Word(word) if fuzzy => fuzzy_word_matches(word, tokens),
            Self::Word(word) => word_matches(word, tokens),
        }
    }
}

/// Splits text into lowercase alphanumeric tokens.
#[must_use]
pub fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|token| !token.is_empty())
        .map(str::to_lowercase)
        .collect()
}

/// Returns true if `pattern` contains `?` or `*`.
#[must_use]
pub fn has_wildcard(pattern: &str) -> bool {
    pattern.contains(['?', '*'])
}

/// Matches `value` in full against a wildcard `pattern`.
#[must_use]
pub fn wildcard_matches(pattern: &str, value: &str) -> bool {
    let pattern: Vec<char> = pattern.chars().collect();
    let value: Vec<char> = value.chars().collect();

    let (mut p, mut v) = (0, 0);
    let mut backtrack: Option<(usize, usize)> = None;
    while v < value.len() {
        match pattern.get(p) {
            Some('*') => {
                backtrack = Some((p, v));
                p += 1;
            }
            Some(&c) if c == '?' || c == value[v] => {
                p += 1;
                v += 1;
            }
            _ => match backtrack {
                Some((star, consumed)) => {
                    p = star + 1;
                    v = consumed + 1;
                    backtrack = Some((star, consumed + 1));
                }
                None => return false,
            },
        }
    }
    pattern[p..].iter().all(|&c| c == '*')
}

/// Matches a whole keyword value against a possibly wildcarded pattern.
#[must_use]
pub fn keyword_matches(pattern: &str, value: &str, case: CaseMode) -> bool {
    match case {
        CaseMode::Sensitive => wildcard_matches(pattern, value),
        CaseMode::Insensitive => wildcard_matches(&pattern.to_lowercase(), &value.to_lowercase()),
    }
}

/// Matches a non-fuzzy word against analyzed tokens.
///
/// Wildcard words are compared to each token. Plain words are analyzed the
/// same way as the field, so `beam-dump` looks for the adjacent tokens
/// `beam dump`.
fn word_matches(word: &str, tokens: &[String]) -> bool {
    let word = word.to_lowercase();
    if has_wildcard(&word) {
        return tokens.iter().any(|token| wildcard_matches(&word, token));
    }
    contains_run(tokens, &tokenize(&word))
}

/// Fuzzy counterpart of [`word_matches`].
///
/// A punctuated word becomes a run of parts, each compared fuzzily with the
/// token at the same position. `?` and `*` stay inside their part.
fn fuzzy_word_matches(word: &str, tokens: &[String]) -> bool {
    let parts: Vec<String> = word
        .split(|c: char| !(c.is_alphanumeric() || c == '?' || c == '*'))
        .filter(|part| !part.is_empty())
        .map(str::to_lowercase)
        .collect();
    !parts.is_empty()
        && tokens.windows(parts.len()).any(|window| {
            window
                .iter()
                .zip(&parts)
                .all(|(token, part)| fuzzy_matches(part, token))
        })
}

/// Returns true if the tokens of `phrase` appear as a contiguous run.
#[must_use]
pub fn phrase_matches(phrase: &str, tokens: &[String]) -> bool {
    contains_run(tokens, &tokenize(phrase))
}

fn contains_run(tokens: &[String], run: &[String]) -> bool {
    !run.is_empty() && tokens.windows(run.len()).any(|window| window == run)
}

/// Edit budget for a fuzzy term, scaled by its length in characters.
#[must_use]
pub fn fuzzy_tolerance(term: &str) -> usize {
    match term.chars().count() {
        0..=2 => 0,
        3..=5 => 1,
        _ => 2,
    }
}

/// Case-insensitive fuzzy comparison of a whole term against a whole value.
#[must_use]
pub fn fuzzy_matches(term: &str, value: &str) -> bool {
    let term = term.to_lowercase();
    osa_distance(&term, &value.to_lowercase()) <= fuzzy_tolerance(&term)
}

/// Optimal string alignment distance: insertions, deletions, substitutions
/// and adjacent transpositions each cost one edit.
#[must_use]
pub fn osa_distance(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let width = b.len() + 1;
    let mut d = vec![0usize; (a.len() + 1) * width];

    for i in 0..=a.len() {
        d[i * width] = i;
    }
    for j in 0..=b.len() {
        d[j] = j;
    }
    for i in 1..=a.len() {
        for j in 1..=b.len() {
            let cost = usize::from(a[i - 1] != b[j - 1]);
            let mut best = (d[(i - 1) * width + j] + 1)
                .min(d[i * width + j - 1] + 1)
                .min(d[(i - 1) * width + j - 1] + cost);
            if i > 1 && j > 1 && a[i - 1] == b[j - 2] && a[i - 2] == b[j - 1] {
                best = best.min(d[(i - 2) * width + j - 2] + 1);
            }
            d[i * width + j] = best;
        }
    }
    d[a.len() * width + b.len()]
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use test_case::test_case;

    fn tokens(text: &str) -> Vec<String> {
        tokenize(text)
    }

    // ===========================================
    // Tokenizer Tests
    // ===========================================

    #[test]
    fn tokenize_lowercases_and_splits() {
        assert_eq!(
            tokenize("Beam-dump check, COMPLETE!"),
            vec!["beam", "dump", "check", "complete"]
        );
        assert!(tokenize("  ,;  ").is_empty());
    }

    // ===========================================
    // Wildcard Tests
    // ===========================================

    #[test_case("Cryo", "Cryo", true ; "exact")]
    #[test_case("Cry?", "Cryo", true ; "question mark one char")]
    #[test_case("Cr?", "Cryo", false ; "question mark is exactly one")]
    #[test_case("C*", "Cryo", true ; "star suffix")]
    #[test_case("*yo", "Cryo", true ; "star prefix")]
    #[test_case("C*o", "Co", true ; "star matches empty")]
    #[test_case("*", "", true ; "star matches empty value")]
    #[test_case("Cry", "Cryo", false ; "no substring matches")]
    #[test_case("a*b*c", "axxbyyc", true ; "multiple stars")]
    #[test_case("a*b*c", "axxbyy", false ; "multiple stars missing tail")]
    fn wildcard_cases(pattern: &str, value: &str, expected: bool) {
        assert_eq!(wildcard_matches(pattern, value), expected);
    }

    #[test]
    fn keyword_case_modes() {
        assert!(!keyword_matches("cryo", "Cryo", CaseMode::Sensitive));
        assert!(keyword_matches("cryo", "Cryo", CaseMode::Insensitive));
        assert!(keyword_matches("AD*", "admin", CaseMode::Insensitive));
    }

    proptest! {
        #[test]
        fn star_matches_everything(value in "\\PC*") {
            prop_assert!(wildcard_matches("*", &value));
        }

        #[test]
        fn literal_pattern_matches_itself(value in "[a-zA-Z0-9 ]{0,16}") {
            prop_assert!(wildcard_matches(&value, &value));
        }

        #[test]
        fn question_mark_substitutes_any_char(value in "[a-z]{1,12}", index in 0usize..12) {
            let index = index % value.len();
            let pattern: String = value
                .chars()
                .enumerate()
                .map(|(i, c)| if i == index { '?' } else { c })
                .collect();
            prop_assert!(wildcard_matches(&pattern, &value));
            let longer = format!("{value}x");
            prop_assert!(!wildcard_matches(&pattern, &longer));
        }
    }

    // ===========================================
    // Text term Tests
    // ===========================================

    #[test]
    fn word_matches_any_token() {
        let field = tokens("Beam dump check complete");
        assert!(TextTerm::Word("CHECK".to_string()).matches(&field, false));
        assert!(TextTerm::Word("comp*".to_string()).matches(&field, false));
        assert!(!TextTerm::Word("che".to_string()).matches(&field, false));
    }

    #[test]
    fn phrase_requires_adjacency() {
        let field = tokens("check that the beam is complete");
        assert!(TextTerm::Phrase("the beam".to_string()).matches(&field, false));
        assert!(!TextTerm::Phrase("check complete".to_string()).matches(&field, false));
        assert!(!TextTerm::Phrase(String::new()).matches(&field, false));
    }

    #[test]
    fn punctuated_word_is_analyzed_as_run() {
        let field = tokens("beam dump at 10:00");
        assert!(TextTerm::Word("beam-dump".to_string()).matches(&field, false));
        assert!(!TextTerm::Word("dump-beam".to_string()).matches(&field, false));
    }

    // ===========================================
    // Fuzzy Tests
    // ===========================================

    #[test_case("ab", "ab", 0 ; "identical")]
    #[test_case("shif", "shift", 1 ; "insertion")]
    #[test_case("shfit", "shift", 1 ; "transposition")]
    #[test_case("kitten", "sitting", 3 ; "classic")]
    #[test_case("", "abc", 3 ; "empty")]
    fn osa_cases(a: &str, b: &str, expected: usize) {
        assert_eq!(osa_distance(a, b), expected);
    }

    #[test_case("Shif", true ; "missing letter")]
    #[test_case("Shif?", true ; "wildcard is a literal substitution")]
    #[test_case("Shi??", false ; "two substitutions exceed budget")]
    #[test_case("shift", true ; "exact")]
    fn fuzzy_title_shift(term: &str, expected: bool) {
        let field = tokens("Shift summary");
        assert_eq!(TextTerm::Word(term.to_string()).matches(&field, true), expected);
    }

    #[test]
    fn fuzzy_punctuated_word_is_analyzed_as_run() {
        let field = tokens("Beam dump at 10:00");
        assert!(TextTerm::Word("beam-dump".to_string()).matches(&field, true));
        assert!(TextTerm::Word("bem-dmup".to_string()).matches(&field, true));
        assert!(!TextTerm::Word("dump-beam".to_string()).matches(&field, true));
        assert!(!TextTerm::Word("--".to_string()).matches(&field, true));
    }

    #[test]
    fn fuzzy_tolerance_scales_with_length() {
        assert_eq!(fuzzy_tolerance("ab"), 0);
        assert_eq!(fuzzy_tolerance("abc"), 1);
        assert_eq!(fuzzy_tolerance("abcde"), 1);
        assert_eq!(fuzzy_tolerance("abcdef"), 2);
        assert!(!fuzzy_matches("ab", "ac"));
        assert!(fuzzy_matches("Problm", "problem"));
    }
}
