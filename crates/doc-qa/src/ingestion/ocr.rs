//! OCR through the local `tesseract` and `pdftoppm` binaries

use std::path::{Path, PathBuf};
use tokio::process::Command;

use crate::error::{Error, Result};

/// Resolution used when rasterising PDF pages for OCR
const PDF_RENDER_DPI: &str = "150";

/// Thin wrapper over the tesseract CLI
#[derive(Debug, Clone)]
pub struct OcrEngine {
    language: String,
}

impl Default for OcrEngine {
    fn default() -> Self {
        Self {
            language: "eng".to_string(),
        }
    }
}

impl OcrEngine {
    /// Check if tesseract is on the PATH
    pub async fn has_tesseract() -> bool {
        Command::new("tesseract")
            .arg("--version")
            .output()
            .await
            .map(|o| o.status.success())
            .unwrap_or(false)
    }

    /// Check if pdftoppm is on the PATH (`-v` prints to stderr, so only spawning is checked)
    pub async fn has_pdftoppm() -> bool {
        Command::new("pdftoppm").arg("-v").output().await.is_ok()
    }

    /// Recognise text in a PNG or JPEG image
    pub async fn image_to_text(&self, name: &str, data: &[u8]) -> Result<String> {
        if !Self::has_tesseract().await {
            return Err(Error::extraction(
                name,
                "Image OCR requires tesseract. Install with: apt install tesseract-ocr",
            ));
        }

        let work_dir = WorkDir::create("doc-qa-img-ocr").await?;
        let image_path = work_dir.path().join("input");
        tokio::fs::write(&image_path, data).await?;

        let text = self.run_tesseract(name, &image_path).await?;
        if text.trim().is_empty() {
            return Err(Error::extraction(name, "OCR produced no text from image"));
        }

        tracing::info!("Image OCR extracted {} characters from {}", text.len(), name);
        Ok(text)
    }

    /// Rasterise every PDF page and recognise each one
    pub async fn pdf_to_text(&self, name: &str, data: &[u8]) -> Result<String> {
        if !Self::has_pdftoppm().await || !Self::has_tesseract().await {
            return Err(Error::extraction(
                name,
                "PDF OCR requires pdftoppm and tesseract. Install with: apt install poppler-utils tesseract-ocr",
            ));
        }

        let work_dir = WorkDir::create("doc-qa-pdf-ocr").await?;
        let pdf_path = work_dir.path().join("input.pdf");
        tokio::fs::write(&pdf_path, data).await?;

        let output = Command::new("pdftoppm")
            .arg("-png")
            .arg("-r")
            .arg(PDF_RENDER_DPI)
            .arg(&pdf_path)
            .arg(work_dir.path().join("page"))
            .output()
            .await
            .map_err(|e| Error::extraction(name, format!("pdftoppm failed: {}", e)))?;

        if !output.status.success() {
            return Err(Error::extraction(
                name,
                format!("pdftoppm error: {}", String::from_utf8_lossy(&output.stderr)),
            ));
        }

        let mut page_images = Vec::new();
        let mut entries = tokio::fs::read_dir(work_dir.path()).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().is_some_and(|ext| ext == "png") {
                page_images.push(path);
            }
        }
        // pdftoppm zero-pads page numbers, so lexical order is page order
        page_images.sort();

        if page_images.is_empty() {
            return Err(Error::extraction(name, "pdftoppm produced no images"));
        }

        let mut all_text = String::new();
        for (i, image_path) in page_images.iter().enumerate() {
            match self.run_tesseract(name, image_path).await {
                Ok(page_text) if !page_text.trim().is_empty() => {
                    if !all_text.is_empty() {
                        all_text.push_str("\n\n");
                    }
                    all_text.push_str(page_text.trim());
                }
                Ok(_) => {}
                Err(e) => tracing::warn!("OCR failed on page {} of {}: {}", i + 1, name, e),
            }
        }

        if all_text.trim().is_empty() {
            return Err(Error::extraction(name, "OCR produced no text"));
        }

        tracing::info!(
            "OCR extracted {} characters from {} pages of {}",
            all_text.len(),
            page_images.len(),
            name
        );
        Ok(all_text)
    }

    async fn run_tesseract(&self, name: &str, image_path: &Path) -> Result<String> {
        let output = Command::new("tesseract")
            .arg(image_path)
            .arg("stdout")
            .arg("-l")
            .arg(&self.language)
            .output()
            .await
            .map_err(|e| Error::extraction(name, format!("tesseract failed: {}", e)))?;

        if !output.status.success() {
            return Err(Error::extraction(
                name,
                format!("tesseract error: {}", String::from_utf8_lossy(&output.stderr)),
            ));
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

/// Scratch directory removed on drop
struct WorkDir(PathBuf);

impl WorkDir {
    async fn create(prefix: &str) -> Result<Self> {
        let path = std::env::temp_dir().join(format!("{}-{}", prefix, uuid::Uuid::new_v4()));
        tokio::fs::create_dir_all(&path).await?;
        Ok(Self(path))
    }

    fn path(&self) -> &Path {
        &self.0
    }
}

impl Drop for WorkDir {
    fn drop(&mut self) {
        std::fs::remove_dir_all(&self.0).ok();
    }
}
