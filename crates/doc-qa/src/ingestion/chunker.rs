//! Sentence and line aware text chunking bounded by a token count

use crate::types::Chunk;

/// Default maximum whitespace-delimited tokens per chunk
pub const DEFAULT_MAX_TOKENS: usize = 500;

/// Text chunker with a configurable token ceiling
#[derive(Debug, Clone, Copy)]
pub struct TextChunker {
    /// Maximum whitespace-delimited tokens per chunk
    max_tokens: usize,
}

impl Default for TextChunker {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_TOKENS)
    }
}

impl TextChunker {
    /// Create a new chunker. A ceiling of 0 is treated as 1.
    pub fn new(max_tokens: usize) -> Self {
        Self {
            max_tokens: max_tokens.max(1),
        }
    }

    /// Token ceiling in effect
    pub fn max_tokens(&self) -> usize {
        self.max_tokens
    }

    /// Split text into ordered, non-empty chunks.
    ///
    /// Units are sentences (split after `.`, `!` or `?` followed by whitespace),
    /// further split on line breaks. Units are accumulated greedily; a unit that
    /// would push the buffer over the ceiling starts a new chunk. A single unit
    /// larger than the ceiling becomes its own chunk.
    pub fn chunk(&self, text: &str) -> Vec<Chunk> {
        let mut chunks = Vec::new();
        let mut buffer = String::new();
        let mut buffer_tokens = 0usize;

        for unit in split_units(text) {
            let unit_tokens = unit.split_whitespace().count();

            if !buffer.is_empty() && buffer_tokens + unit_tokens > self.max_tokens {
                chunks.push(Chunk::new(std::mem::take(&mut buffer), chunks.len()));
                buffer_tokens = 0;
            }

            if !buffer.is_empty() {
                buffer.push(' ');
            }
            buffer.push_str(unit);
            buffer_tokens += unit_tokens;
        }

        if !buffer.is_empty() {
            chunks.push(Chunk::new(buffer, chunks.len()));
        }

        chunks
    }
}

/// Chunk text with the given token ceiling
pub fn chunk_text(text: &str, max_tokens: usize) -> Vec<Chunk> {
    TextChunker::new(max_tokens).chunk(text)
}

/// Split text into trimmed, non-empty sentence/line units
fn split_units(text: &str) -> impl Iterator<Item = &str> {
    split_sentences(text)
        .into_iter()
        .flat_map(|sentence| sentence.split(['\n', '\r']))
        .map(str::trim)
        .filter(|unit| !unit.is_empty())
}

/// Split after sentence-terminal punctuation that is followed by whitespace
fn split_sentences(text: &str) -> Vec<&str> {
    let mut sentences = Vec::new();
    let mut start = 0usize;
    let mut chars = text.char_indices().peekable();

    while let Some((_, c)) = chars.next() {
        if matches!(c, '.' | '!' | '?') {
            if let Some(&(next_pos, next)) = chars.peek() {
                if next.is_whitespace() {
                    sentences.push(&text[start..next_pos]);
                    start = next_pos;
                }
            }
        }
    }

    if start < text.len() {
        sentences.push(&text[start..]);
    }

    sentences
}
