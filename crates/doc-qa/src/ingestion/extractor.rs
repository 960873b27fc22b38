//! Turning a document reference (URL or local path) into raw text

use async_trait::async_trait;
use futures::future::BoxFuture;
use reqwest::Client;
use std::io::Read;
use std::time::Duration;

use super::ocr::OcrEngine;
use super::parser::FileParser;
use crate::config::ExtractionConfig;
use crate::error::{Error, Result};
use crate::types::FileType;

/// Source of raw document text
#[async_trait]
pub trait TextExtractor: Send + Sync {
    /// Fetch the referenced document and return its text.
    ///
    /// Failures are request-fatal: there is nothing to answer against.
    async fn extract_text(&self, source: &str) -> Result<String>;
}

/// Bytes fetched for a document, with whatever hints the transport gave
#[derive(Debug)]
struct FetchedDocument {
    data: Vec<u8>,
    content_type: Option<String>,
}

/// Default extractor: downloads or reads the document, detects its format and parses it
pub struct DocumentExtractor {
    client: Client,
    config: ExtractionConfig,
    ocr: OcrEngine,
}

impl DocumentExtractor {
    /// Create a new extractor
    pub fn new(config: ExtractionConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.download_timeout_secs))
            .build()?;

        Ok(Self {
            client,
            config,
            ocr: OcrEngine::default(),
        })
    }

    fn is_url(source: &str) -> bool {
        source.starts_with("http://") || source.starts_with("https://")
    }

    async fn fetch(&self, source: &str) -> Result<FetchedDocument> {
        if Self::is_url(source) {
            self.download(source).await
        } else {
            let data = tokio::fs::read(source)
                .await
                .map_err(|e| Error::extraction(source, e.to_string()))?;
            self.check_size(source, data.len())?;
            Ok(FetchedDocument {
                data,
                content_type: None,
            })
        }
    }

    async fn download(&self, url: &str) -> Result<FetchedDocument> {
        tracing::debug!("Downloading document from {}", url);

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| Error::extraction(url, format!("Download failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::extraction(url, format!("Download failed with HTTP {}", status)));
        }

        if let Some(len) = response.content_length() {
            self.check_size(url, len as usize)?;
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        let data = response
            .bytes()
            .await
            .map_err(|e| Error::extraction(url, format!("Download failed: {}", e)))?
            .to_vec();
        self.check_size(url, data.len())?;

        tracing::info!("Downloaded {} bytes from {}", data.len(), url);
        Ok(FetchedDocument { data, content_type })
    }

    fn check_size(&self, source: &str, len: usize) -> Result<()> {
        if len > self.config.max_document_bytes {
            return Err(Error::extraction(
                source,
                format!(
                    "Document is {} bytes, limit is {} bytes",
                    len, self.config.max_document_bytes
                ),
            ));
        }
        Ok(())
    }

    /// Magic bytes first, then the name's extension, then the transport's MIME type.
    /// Undetected UTF-8 content is read as plain text.
    fn detect(name: &str, data: &[u8], content_type: Option<&str>) -> FileType {
        let detected = FileType::sniff(data);
        if detected.is_supported() {
            return detected;
        }

        let by_name = FileType::from_name(name);
        if by_name.is_supported() {
            return by_name;
        }

        if let Some(by_mime) = content_type.map(FileType::from_mime) {
            if by_mime.is_supported() {
                return by_mime;
            }
        }

        if std::str::from_utf8(data).is_ok() {
            FileType::Txt
        } else {
            FileType::Unknown
        }
    }

    /// Extract text from bytes, recursing into ZIP archives
    fn extract_bytes<'a>(
        &'a self,
        name: &'a str,
        data: Vec<u8>,
        content_type: Option<&'a str>,
        depth: usize,
    ) -> BoxFuture<'a, Result<String>> {
        Box::pin(async move {
            let file_type = Self::detect(name, &data, content_type);
            tracing::debug!("Detected {} for {}", file_type.display_name(), name);

            match file_type {
                FileType::Unknown => Err(Error::UnsupportedFileType(name.to_string())),
                FileType::Image => {
                    if !self.config.enable_ocr {
                        return Err(Error::extraction(name, "Images need OCR, which is disabled"));
                    }
                    self.ocr.image_to_text(name, &data).await
                }
                FileType::Pdf => self.extract_pdf(name, data).await,
                FileType::Zip => self.extract_zip(name, &data, depth).await,
                other => self.extract_document(name, other, data).await,
            }
        })
    }

    /// Parse in-process; with OCR enabled, Office documents also get the text
    /// of their embedded images appended
    async fn extract_document(&self, name: &str, file_type: FileType, data: Vec<u8>) -> Result<String> {
        let owned_name = name.to_string();
        let with_media = self.config.enable_ocr;
        let (parsed, media) = tokio::task::spawn_blocking(move || {
            let parsed = FileParser::parse(&owned_name, file_type, &data);
            let media = if with_media {
                FileParser::office_media(&owned_name, file_type, &data)
            } else {
                Ok(Vec::new())
            };
            (parsed, media)
        })
        .await
        .map_err(|e| Error::internal(format!("Parser task failed: {}", e)))?;

        let mut text = parsed?;
        let media = media.unwrap_or_else(|e| {
            tracing::warn!("Could not list embedded images of {}: {}", name, e);
            Vec::new()
        });
        if media.is_empty() {
            return Ok(text);
        }
        if !OcrEngine::has_tesseract().await {
            tracing::warn!("Skipping {} embedded images of {}: tesseract not found", media.len(), name);
            return Ok(text);
        }

        tracing::info!("Running OCR on {} embedded images of {}", media.len(), name);
        for (media_name, image) in media {
            match self.ocr.image_to_text(&media_name, &image).await {
                Ok(ocr_text) if !ocr_text.trim().is_empty() => {
                    text.push_str(&format!("\n\nImage {}:\n{}", media_name, ocr_text.trim()));
                }
                Ok(_) => {}
                Err(e) => tracing::warn!("OCR failed for {} in {}: {}", media_name, name, e),
            }
        }

        Ok(text)
    }

    /// Text layer first; OCR when it is missing or too short
    async fn extract_pdf(&self, name: &str, data: Vec<u8>) -> Result<String> {
        let owned_name = name.to_string();
        let pdf_data = data.clone();
        let text_layer =
            tokio::task::spawn_blocking(move || FileParser::parse_pdf(&owned_name, &pdf_data))
                .await
                .map_err(|e| Error::internal(format!("PDF parser task failed: {}", e)))?;

        let text = match text_layer {
            Ok(text) if text.trim().chars().count() >= self.config.min_pdf_text_chars => {
                return Ok(text)
            }
            Ok(text) => text,
            Err(e) => {
                tracing::warn!("Text layer extraction failed for {}: {}", name, e);
                if !self.config.enable_ocr {
                    return Err(e);
                }
                String::new()
            }
        };

        if !self.config.enable_ocr {
            return Ok(text);
        }

        tracing::info!("Text layer of {} is too short, falling back to OCR", name);
        match self.ocr.pdf_to_text(name, &data).await {
            Ok(ocr_text) => Ok(ocr_text),
            Err(e) if !text.trim().is_empty() => {
                tracing::warn!("OCR failed for {}: {}, keeping short text layer", name, e);
                Ok(text)
            }
            Err(e) => Err(e),
        }
    }

    async fn extract_zip(&self, name: &str, data: &[u8], depth: usize) -> Result<String> {
        if depth > self.config.max_zip_depth {
            tracing::warn!(
                "Skipping {}: nested deeper than {} archives",
                name,
                self.config.max_zip_depth
            );
            return Ok(String::new());
        }

        let entries = self.read_zip_entries(name, data)?;
        let mut output = String::new();

        for (entry_name, entry_data) in entries {
            match self.extract_bytes(&entry_name, entry_data, None, depth + 1).await {
                Ok(text) if !text.trim().is_empty() => {
                    output.push_str(&format!("{}:\n{}\n\n", entry_name, text.trim()));
                }
                Ok(_) => {}
                Err(e) => tracing::warn!("Skipping {} in {}: {}", entry_name, name, e),
            }
        }

        Ok(output)
    }

    fn read_zip_entries(&self, name: &str, data: &[u8]) -> Result<Vec<(String, Vec<u8>)>> {
        let mut archive = zip::ZipArchive::new(std::io::Cursor::new(data))
            .map_err(|e| Error::extraction(name, e.to_string()))?;

        let mut entries = Vec::new();
        for i in 0..archive.len() {
            let mut file = archive
                .by_index(i)
                .map_err(|e| Error::extraction(name, e.to_string()))?;
            if file.is_dir() {
                continue;
            }
            if file.size() as usize > self.config.max_document_bytes {
                tracing::warn!("Skipping {} in {}: {} bytes", file.name(), name, file.size());
                continue;
            }

            let mut buf = Vec::with_capacity(file.size() as usize);
            file.read_to_end(&mut buf)
                .map_err(|e| Error::extraction(name, e.to_string()))?;
            entries.push((file.name().to_string(), buf));
        }

        Ok(entries)
    }
}

#[async_trait]
impl TextExtractor for DocumentExtractor {
    async fn extract_text(&self, source: &str) -> Result<String> {
        let fetched = self.fetch(source).await?;
        let text = self
            .extract_bytes(source, fetched.data, fetched.content_type.as_deref(), 0)
            .await
            .map_err(|e| match e {
                Error::Extraction { .. } | Error::UnsupportedFileType(_) => e,
                other => Error::extraction(source, other.to_string()),
            })?;

        if text.trim().is_empty() {
            return Err(Error::extraction(source, "No text could be extracted"));
        }

        tracing::info!("Extracted {} characters from {}", text.len(), source);
        Ok(text)
    }
}
