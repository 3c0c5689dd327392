//! Entity extraction over raw query text.
//!
//! Entities are informational only and never feed into matching.

/// Extracts entity strings from raw (non-normalized) text, in order of
/// appearance.
pub trait EntityExtractor: Send + Sync {
    fn extract(&self, text: &str) -> Vec<String>;
}

/// Extractor that never finds anything.
pub struct NoEntities;

impl EntityExtractor for NoEntities {
    fn extract(&self, _text: &str) -> Vec<String> {
        Vec::new()
    }
}

/// Heuristic extractor: runs of capitalized words and standalone numbers.
///
/// A lone capitalized word that opens a sentence is treated as ordinary
/// capitalization and skipped, as is the pronoun "I".
#[derive(Debug, Default, Clone)]
pub struct CapitalizedSpanExtractor;

impl EntityExtractor for CapitalizedSpanExtractor {
    fn extract(&self, text: &str) -> Vec<String> {
        let mut entities = Vec::new();
        let mut run: Vec<&str> = Vec::new();
        let mut run_opens_sentence = false;
        let mut sentence_start = true;

        for raw in text.split_whitespace() {
            let word = raw.trim_matches(|c: char| !c.is_alphanumeric());
            let ends_sentence = raw.ends_with(['.', '!', '?']);

            if is_capitalized(word) {
                if run.is_empty() {
                    run_opens_sentence = sentence_start;
                }
                run.push(word);
            } else {
                flush_run(&mut run, run_opens_sentence, &mut entities);
                if is_number(word) {
                    entities.push(word.to_string());
                }
            }

            if ends_sentence {
                flush_run(&mut run, run_opens_sentence, &mut entities);
            }
            sentence_start = ends_sentence;
        }
        flush_run(&mut run, run_opens_sentence, &mut entities);

        entities
    }
}

fn flush_run(run: &mut Vec<&str>, opens_sentence: bool, entities: &mut Vec<String>) {
    let keep = match run.as_slice() {
        [] => false,
        [single] => !opens_sentence && *single != "I",
        _ => true,
    };
    if keep {
        entities.push(run.join(" "));
    }
    run.clear();
}

fn is_capitalized(word: &str) -> bool {
    word.chars().next().is_some_and(|c| c.is_uppercase())
}

fn is_number(word: &str) -> bool {
    !word.is_empty()
        && word.chars().any(|c| c.is_ascii_digit())
        && word.chars().all(|c| c.is_ascii_digit() || c == '.' || c == ',' || c == ':')
}
