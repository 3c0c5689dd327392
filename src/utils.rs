use lazy_static::lazy_static;
use regex::Regex;
use rustc_hash::FxHashSet;

lazy_static! {
    static ref NON_LETTERS: Regex = Regex::new(r"[^a-zA-Z\s]").unwrap();
    static ref STOP_WORDS: FxHashSet<&'static str> = {
        let words = vec![
            "a", "an", "the", "and", "or", "is", "are", "of", "to", "in", "for",
            "on", "with", "you", "we", "our", "your",
        ];
        words.into_iter().collect()
    };
}

/// Normalizes free text into the form stored in the index.
///
/// Non-letters are deleted rather than replaced, so "e-mail" becomes "email"
/// and "hours24/7" becomes "hours". Tokens are lowercased, stop-words dropped
/// and the survivors joined with single spaces.
pub fn normalize(text: &str) -> String {
    let letters = NON_LETTERS.replace_all(text, "");

    letters
        .split_whitespace()
        .map(|token| token.to_lowercase())
        .filter(|token| !STOP_WORDS.contains(token.as_str()))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Splits an already normalized string into its terms
pub fn tokenize(normalized: &str) -> impl Iterator<Item = &str> {
    normalized.split_whitespace()
}
