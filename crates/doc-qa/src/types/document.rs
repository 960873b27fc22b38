//! Document format detection and chunk types

use serde::{Deserialize, Serialize};

/// Supported document formats
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum FileType {
    /// PDF document
    Pdf,
    /// Microsoft Word document (.docx)
    Docx,
    /// Microsoft PowerPoint presentation (.pptx)
    Pptx,
    /// Excel spreadsheet (.xlsx)
    Xlsx,
    /// Old Excel spreadsheet (.xls)
    Xls,
    /// Plain text file
    Txt,
    /// Markdown file
    Markdown,
    /// HTML document
    Html,
    /// CSV file
    Csv,
    /// PNG or JPEG image, read with OCR
    Image,
    /// ZIP archive of other documents
    Zip,
    /// Unknown file type
    Unknown,
}

impl FileType {
    /// Detect file type from extension
    pub fn from_extension(ext: &str) -> Self {
        match ext.trim_start_matches('.').to_lowercase().as_str() {
            "pdf" => Self::Pdf,
            "docx" => Self::Docx,
            "pptx" => Self::Pptx,
            "xlsx" => Self::Xlsx,
            "xls" => Self::Xls,
            "txt" | "text" => Self::Txt,
            "md" | "markdown" => Self::Markdown,
            "html" | "htm" => Self::Html,
            "csv" => Self::Csv,
            "png" | "jpg" | "jpeg" => Self::Image,
            "zip" => Self::Zip,
            _ => Self::Unknown,
        }
    }

    /// Detect file type from a MIME type
    pub fn from_mime(mime: &str) -> Self {
        let essence = mime.split(';').next().unwrap_or("").trim().to_lowercase();
        match essence.as_str() {
            "application/pdf" => Self::Pdf,
            "application/vnd.openxmlformats-officedocument.wordprocessingml.document" => Self::Docx,
            "application/vnd.openxmlformats-officedocument.presentationml.presentation" => {
                Self::Pptx
            }
            "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet" => Self::Xlsx,
            "application/vnd.ms-excel" => Self::Xls,
            "text/plain" => Self::Txt,
            "text/markdown" => Self::Markdown,
            "text/html" => Self::Html,
            "text/csv" => Self::Csv,
            "image/png" | "image/jpeg" => Self::Image,
            "application/zip" | "application/x-zip-compressed" => Self::Zip,
            _ => Self::Unknown,
        }
    }

    /// Detect file type from a file name or URL path
    pub fn from_name(name: &str) -> Self {
        let path = name.split(['?', '#']).next().unwrap_or(name);
        match path.rsplit_once('.') {
            Some((_, ext)) if !ext.contains('/') => Self::from_extension(ext),
            _ => Self::Unknown,
        }
    }

    /// Detect file type from leading magic bytes.
    ///
    /// OOXML containers are ZIP files; their part names decide the concrete type.
    pub fn sniff(data: &[u8]) -> Self {
        if data.starts_with(b"%PDF") {
            return Self::Pdf;
        }
        if data.starts_with(&[0x89, b'P', b'N', b'G']) || data.starts_with(&[0xFF, 0xD8, 0xFF]) {
            return Self::Image;
        }
        if data.starts_with(&[0xD0, 0xCF, 0x11, 0xE0]) {
            // OLE2 container; the only legacy format handled is .xls
            return Self::Xls;
        }
        if data.starts_with(b"PK\x03\x04") {
            return Self::sniff_zip(data);
        }
        Self::Unknown
    }

    fn sniff_zip(data: &[u8]) -> Self {
        let Ok(archive) = zip::ZipArchive::new(std::io::Cursor::new(data)) else {
            return Self::Zip;
        };
        let names: Vec<&str> = archive.file_names().collect();
        if names.iter().any(|n| n.starts_with("word/")) {
            Self::Docx
        } else if names.iter().any(|n| n.starts_with("ppt/")) {
            Self::Pptx
        } else if names.iter().any(|n| n.starts_with("xl/")) {
            Self::Xlsx
        } else {
            Self::Zip
        }
    }

    /// Check if this is a supported file type
    pub fn is_supported(&self) -> bool {
        !matches!(self, Self::Unknown)
    }

    /// Get display name
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Pdf => "PDF",
            Self::Docx => "Word Document (.docx)",
            Self::Pptx => "PowerPoint (.pptx)",
            Self::Xlsx => "Excel Spreadsheet (.xlsx)",
            Self::Xls => "Excel Spreadsheet (.xls)",
            Self::Txt => "Text File",
            Self::Markdown => "Markdown",
            Self::Html => "HTML",
            Self::Csv => "CSV",
            Self::Image => "Image",
            Self::Zip => "ZIP Archive",
            Self::Unknown => "Unknown",
        }
    }
}

/// A bounded, contiguous segment of extracted document text
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    /// Trimmed, non-empty chunk text
    pub text: String,
    /// Position of the chunk in the document (0-based)
    pub index: usize,
}

impl Chunk {
    /// Create a new chunk
    pub fn new(text: impl Into<String>, index: usize) -> Self {
        Self {
            text: text.into(),
            index,
        }
    }

    /// Length in characters, the unit of the context budget
    pub fn char_len(&self) -> usize {
        self.text.chars().count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_name_ignores_query_string() {
        assert_eq!(
            FileType::from_name("https://host/blob/policy.pdf?sv=2023&sig=abc"),
            FileType::Pdf
        );
        assert_eq!(FileType::from_name("/tmp/deck.PPTX"), FileType::Pptx);
        assert_eq!(FileType::from_name("https://host/no-extension"), FileType::Unknown);
    }

    #[test]
    fn test_sniff_magic_bytes() {
        assert_eq!(FileType::sniff(b"%PDF-1.7\n..."), FileType::Pdf);
        assert_eq!(FileType::sniff(&[0x89, b'P', b'N', b'G', 0x0D, 0x0A]), FileType::Image);
        assert_eq!(FileType::sniff(b"plain words"), FileType::Unknown);
    }

    #[test]
    fn test_from_mime_with_parameters() {
        assert_eq!(FileType::from_mime("text/html; charset=utf-8"), FileType::Html);
        assert_eq!(FileType::from_mime("application/octet-stream"), FileType::Unknown);
    }
}
