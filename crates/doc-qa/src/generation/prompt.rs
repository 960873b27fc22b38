//! Prompt templates and context assembly for batched answering

/// Separator placed between selected chunks in the context
pub const CHUNK_SEPARATOR: &str = "\n\n";

/// Prompt builder for grouped document questions
pub struct PromptBuilder;

impl PromptBuilder {
    /// Join selected chunks and cut the result to `max_chars` characters.
    ///
    /// Selection already keeps chunk text inside the budget; the separators can
    /// still push it over, so this is the last word on length.
    pub fn build_context(chunks: &[String], max_chars: usize) -> String {
        let joined = chunks.join(CHUNK_SEPARATOR);
        truncate_chars(&joined, max_chars).to_string()
    }

    /// System prompt asking for exactly one answer per question as JSON
    pub fn system_prompt() -> &'static str {
        r#"You are a document question answering assistant. Answer every question using the provided document and keep the answers accurate and concise.

The number of answers MUST equal the number of questions, in the same order.

Respond with a JSON object and nothing else:
{
  "answers": [
    "Answer to question 1",
    "Answer to question 2"
  ]
}

If the document does not state the answer exactly, give the closest relevant information it does contain."#
    }

    /// User prompt carrying the context and the numbered questions
    pub fn user_prompt(context: &str, questions: &[String]) -> String {
        let numbered = questions
            .iter()
            .enumerate()
            .map(|(i, q)| format!("{}. {}", i + 1, q))
            .collect::<Vec<_>>()
            .join("\n");

        format!("Document:\n\n{}\n\nQuestions:\n{}", context, numbered)
    }
}

/// Longest prefix of `text` with at most `max_chars` characters
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => &text[..byte_idx],
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_prompt_numbers_questions() {
        let prompt = PromptBuilder::user_prompt(
            "The premium is $500.",
            &["What is the premium?".to_string(), "What is covered?".to_string()],
        );
        assert_eq!(
            prompt,
            "Document:\n\nThe premium is $500.\n\nQuestions:\n1. What is the premium?\n2. What is covered?"
        );
    }

    #[test]
    fn test_build_context_respects_budget() {
        let chunks = vec!["a".repeat(10), "b".repeat(10)];
        assert_eq!(PromptBuilder::build_context(&chunks, 100).chars().count(), 22);
        assert_eq!(PromptBuilder::build_context(&chunks, 15).chars().count(), 15);
        assert_eq!(PromptBuilder::build_context(&[], 15), "");
    }

    #[test]
    fn test_truncate_multibyte() {
        assert_eq!(truncate_chars("₹500 premium", 4), "₹500");
        assert_eq!(truncate_chars("short", 50), "short");
        assert_eq!(truncate_chars("abc", 0), "");
    }
}
