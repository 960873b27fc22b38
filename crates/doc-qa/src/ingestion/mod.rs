//! Document ingestion: fetching, format-specific text extraction and chunking

mod chunker;
mod extractor;
mod ocr;
mod parser;

pub use chunker::{chunk_text, TextChunker, DEFAULT_MAX_TOKENS};
pub use extractor::{DocumentExtractor, TextExtractor};
pub use ocr::OcrEngine;
pub use parser::FileParser;
