//! Relevance selection: which chunks go into a group's context
//!
//! Both selectors rank candidate chunks and then share the same budgeted
//! accumulation in [`accumulate_within_budget`].

mod lexical;
mod semantic;

pub use lexical::{significant_words, LexicalSelector, STOP_WORDS};
pub use semantic::{cosine_similarity, interleave_rankings, SemanticIndex, SemanticSelector};

use async_trait::async_trait;
use std::collections::HashSet;

use crate::generation::{truncate_chars, CHUNK_SEPARATOR};
use crate::types::Chunk;

/// Picks the chunks relevant to a batch of questions
#[async_trait]
pub trait RelevanceSelector: Send + Sync {
    /// Ordered, deduplicated chunk texts whose joined length is at most `max_chars`.
    ///
    /// Never empty when `chunks` is non-empty and `max_chars > 0`; a selector
    /// with nothing to go on degrades to document order instead of failing.
    async fn select(&self, chunks: &[Chunk], questions: &[String], max_chars: usize) -> Vec<String>;

    /// Get selector name for logging
    fn name(&self) -> &str;
}

/// Greedily take candidates in order until `max_chars` is reached.
///
/// The budget covers the joined context: every candidate after the first is
/// charged for the [`CHUNK_SEPARATOR`] that precedes it. Identical texts are
/// taken once. With `smart_trim`, the first candidate that overflows is cut at
/// its last sentence (or word) boundary inside the remaining budget and
/// appended before stopping. If nothing fits at all, a prefix of the first
/// candidate is returned so the result is never empty.
pub fn accumulate_within_budget<'a, I>(candidates: I, max_chars: usize, smart_trim: bool) -> Vec<String>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut selected = Vec::new();
    let mut seen: HashSet<&str> = HashSet::new();
    let mut used = 0usize;
    let separator_len = CHUNK_SEPARATOR.chars().count();
    let mut first_candidate: Option<&str> = None;

    if max_chars == 0 {
        return selected;
    }

    for text in candidates {
        first_candidate.get_or_insert(text);
        if !seen.insert(text) {
            continue;
        }

        let separator = if selected.is_empty() { 0 } else { separator_len };
        let len = text.chars().count();
        if used + separator + len <= max_chars {
            selected.push(text.to_string());
            used += separator + len;
            continue;
        }

        let remaining = max_chars.saturating_sub(used + separator);
        if smart_trim && remaining > 0 {
            let trimmed = trim_to_boundary(text, remaining);
            if !trimmed.is_empty() && !selected.iter().any(|s| s == trimmed) {
                selected.push(trimmed.to_string());
            }
        }
        break;
    }

    if selected.is_empty() {
        if let Some(first) = first_candidate {
            let prefix = truncate_chars(first, max_chars).trim_end();
            if !prefix.is_empty() {
                selected.push(prefix.to_string());
            }
        }
    }

    selected
}

/// Longest prefix within `budget` chars that ends at a sentence boundary,
/// else at a word boundary, else empty
pub fn trim_to_boundary(text: &str, budget: usize) -> &str {
    let window = truncate_chars(text, budget);
    if window.len() == text.len() {
        return text;
    }

    let sentence_end = window
        .char_indices()
        .filter(|&(i, c)| {
            matches!(c, '.' | '!' | '?')
                && text[i + c.len_utf8()..]
                    .chars()
                    .next()
                    .map_or(true, char::is_whitespace)
        })
        .map(|(i, c)| i + c.len_utf8())
        .last();

    if let Some(end) = sentence_end {
        return &window[..end];
    }

    match window.rfind(char::is_whitespace) {
        Some(end) if end > 0 => window[..end].trim_end(),
        _ => "",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generation::PromptBuilder;
    use proptest::prelude::*;

    #[test]
    fn test_accumulate_stops_at_budget() {
        // 4 + 2 + 4 fits in 10, the third chunk would need 16
        let selected = accumulate_within_budget(["aaaa", "bbbb", "cccc"], 10, false);
        assert_eq!(selected, vec!["aaaa", "bbbb"]);

        let selected = accumulate_within_budget(["aaaa", "bbbb"], 9, false);
        assert_eq!(selected, vec!["aaaa"]);
    }

    #[test]
    fn test_accumulate_deduplicates() {
        let selected = accumulate_within_budget(["same", "same", "other"], 100, true);
        assert_eq!(selected, vec!["same", "other"]);
    }

    #[test]
    fn test_smart_trim_appends_sentence_prefix() {
        let selected = accumulate_within_budget(
            ["First chunk.", "One sentence. Two sentence. Three."],
            12 + 2 + 27,
            true,
        );
        assert_eq!(selected, vec!["First chunk.", "One sentence. Two sentence."]);
    }

    #[test]
    fn test_joined_context_fits_without_truncation() {
        let max_chars = 36;
        let selected =
            accumulate_within_budget(["First sentence here.", "Second one here."], max_chars, true);
        let joined = selected.join(CHUNK_SEPARATOR);

        assert_eq!(joined, "First sentence here.\n\nSecond one");
        assert_eq!(PromptBuilder::build_context(&selected, max_chars), joined);
    }

    #[test]
    fn test_oversized_first_chunk_still_selected() {
        let selected = accumulate_within_budget(["abcdefghijklmnop"], 5, false);
        assert_eq!(selected, vec!["abcde"]);
    }

    #[test]
    fn test_trim_to_boundary() {
        assert_eq!(trim_to_boundary("Cover is 3.5 lakh. Premium is due.", 22), "Cover is 3.5 lakh.");
        assert_eq!(trim_to_boundary("no sentence end here at all", 12), "no sentence");
        assert_eq!(trim_to_boundary("unbroken", 4), "");
        assert_eq!(trim_to_boundary("fits", 10), "fits");
    }

    proptest! {
        #[test]
        fn prop_selection_within_budget(
            texts in proptest::collection::vec("[a-z .]{1,40}", 1..20),
            max_chars in 1usize..200,
            smart_trim in any::<bool>(),
        ) {
            let texts: Vec<String> = texts.into_iter().map(|t| format!("x{}", t.trim())).collect();
            let selected = accumulate_within_budget(texts.iter().map(String::as_str), max_chars, smart_trim);

            let joined = selected.join(CHUNK_SEPARATOR);
            prop_assert!(joined.chars().count() <= max_chars);
            prop_assert_eq!(PromptBuilder::build_context(&selected, max_chars), joined);
            prop_assert!(!selected.is_empty());

            let unique: HashSet<&String> = selected.iter().collect();
            prop_assert_eq!(unique.len(), selected.len());
        }
    }
}
