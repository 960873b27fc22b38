//! Keyword-overlap relevance selection

use async_trait::async_trait;
use std::collections::HashSet;

use super::{accumulate_within_budget, RelevanceSelector};
use crate::types::Chunk;

/// Words of four or more letters that carry no signal for matching.
///
/// Function words plus the boilerplate that shows up in nearly every
/// question about a policy document.
pub const STOP_WORDS: &[&str] = &[
    "about", "above", "after", "again", "also", "any", "because", "been", "before", "being",
    "below", "between", "both", "cannot", "could", "does", "doing", "done", "down", "during",
    "each", "explain", "from", "further", "give", "have", "having", "here", "into", "just",
    "kindly", "list", "more", "most", "much", "must", "only", "other", "over", "please",
    "policy", "same", "shall", "should", "some", "such", "tell", "than", "that", "their",
    "them", "then", "there", "these", "they", "this", "those", "through", "under", "until",
    "upon", "very", "were", "what", "when", "where", "whether", "which", "while", "whom",
    "whose", "will", "with", "within", "without", "would", "your", "yours",
];

/// Minimum length (in characters) of a significant word
const MIN_WORD_CHARS: usize = 4;

/// Distinct lower-cased question words of at least four characters that are not stop words
pub fn significant_words(questions: &[String]) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut words = Vec::new();

    for question in questions {
        let lowered = question.to_lowercase();
        for word in lowered.split(|c: char| !c.is_alphanumeric()) {
            if word.chars().count() >= MIN_WORD_CHARS
                && !STOP_WORDS.contains(&word)
                && seen.insert(word.to_string())
            {
                words.push(word.to_string());
            }
        }
    }

    words
}

/// Scores chunks by how many distinct significant question words they contain
#[derive(Debug, Clone)]
pub struct LexicalSelector {
    smart_trim: bool,
}

impl Default for LexicalSelector {
    fn default() -> Self {
        Self::new(true)
    }
}

impl LexicalSelector {
    /// Create a new lexical selector
    pub fn new(smart_trim: bool) -> Self {
        Self { smart_trim }
    }

    /// Synchronous selection; the async trait method delegates here
    pub fn select_sync(&self, chunks: &[Chunk], questions: &[String], max_chars: usize) -> Vec<String> {
        let words = significant_words(questions);

        let mut scored: Vec<(&Chunk, usize)> = chunks
            .iter()
            .map(|chunk| {
                let lowered = chunk.text.to_lowercase();
                let score = words.iter().filter(|w| lowered.contains(w.as_str())).count();
                (chunk, score)
            })
            .filter(|(_, score)| *score > 0)
            .collect();

        let candidates: Vec<&str> = if scored.is_empty() {
            if !chunks.is_empty() {
                tracing::warn!(
                    "No chunk matched {} significant words, using document order",
                    words.len()
                );
            }
            chunks.iter().map(|c| c.text.as_str()).collect()
        } else {
            // Stable: equal scores keep document order
            scored.sort_by(|a, b| b.1.cmp(&a.1));
            tracing::debug!(
                "{} of {} chunks matched, best score {}",
                scored.len(),
                chunks.len(),
                scored[0].1
            );
            scored.iter().map(|(chunk, _)| chunk.text.as_str()).collect()
        };

        accumulate_within_budget(candidates, max_chars, self.smart_trim)
    }
}

#[async_trait]
impl RelevanceSelector for LexicalSelector {
    async fn select(&self, chunks: &[Chunk], questions: &[String], max_chars: usize) -> Vec<String> {
        self.select_sync(chunks, questions, max_chars)
    }

    fn name(&self) -> &str {
        "lexical"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generation::CHUNK_SEPARATOR;
    use proptest::prelude::*;

    fn chunks(texts: &[&str]) -> Vec<Chunk> {
        texts.iter().enumerate().map(|(i, t)| Chunk::new(*t, i)).collect()
    }

    fn questions(qs: &[&str]) -> Vec<String> {
        qs.iter().map(|q| q.to_string()).collect()
    }

    #[test]
    fn test_significant_words() {
        let words = significant_words(&questions(&[
            "What is the grace period under this policy?",
            "Does the policy cover maternity? Grace period again.",
        ]));
        assert_eq!(words, vec!["grace", "period", "cover", "maternity"]);
    }

    #[test]
    fn test_ranks_by_distinct_matches() {
        let chunks = chunks(&[
            "Room rent is capped.",
            "A grace period of thirty days applies.",
            "The grace period and maternity cover are explained here.",
        ]);
        let selected = LexicalSelector::default().select_sync(
            &chunks,
            &questions(&["What is the grace period for maternity?"]),
            1000,
        );
        assert_eq!(
            selected,
            vec![
                "The grace period and maternity cover are explained here.",
                "A grace period of thirty days applies.",
            ]
        );
    }

    #[test]
    fn test_ties_keep_document_order() {
        let chunks = chunks(&["premium one", "unrelated", "premium two"]);
        let selected =
            LexicalSelector::default().select_sync(&chunks, &questions(&["premium?"]), 1000);
        assert_eq!(selected, vec!["premium one", "premium two"]);
    }

    #[test]
    fn test_no_match_falls_back_to_document_order() {
        let chunks = chunks(&["alpha text", "beta text"]);
        let selected =
            LexicalSelector::default().select_sync(&chunks, &questions(&["What is it?"]), 1000);
        assert_eq!(selected, vec!["alpha text", "beta text"]);
    }

    #[test]
    fn test_empty_chunks() {
        let selected = LexicalSelector::default().select_sync(&[], &questions(&["premium"]), 1000);
        assert!(selected.is_empty());
    }

    proptest! {
        #[test]
        fn prop_never_empty_and_within_budget(
            texts in proptest::collection::vec("[a-z]{1,12}( [a-z]{1,12}){0,10}", 1..15),
            question in "[a-z ]{0,60}",
            max_chars in 1usize..300,
        ) {
            let chunks: Vec<Chunk> = texts.iter().enumerate().map(|(i, t)| Chunk::new(t.clone(), i)).collect();
            let selected = LexicalSelector::default().select_sync(&chunks, &[question], max_chars);

            prop_assert!(!selected.is_empty());
            prop_assert!(selected.join(CHUNK_SEPARATOR).chars().count() <= max_chars);
        }
    }
}
