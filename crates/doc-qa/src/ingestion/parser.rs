//! In-process text extraction for the supported document formats

use calamine::Reader;
use std::io::Read;
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use crate::error::{Error, Result};
use crate::types::FileType;

/// How long pdf-extract may run before the lopdf fallback takes over
const PDF_EXTRACT_TIMEOUT: Duration = Duration::from_secs(60);

/// Glyph names some PDF fonts leak into the text layer, and their replacements
const GLYPH_REPLACEMENTS: &[(&str, &str)] = &[
    ("uni2010", "-"),
    ("uni2011", "-"),
    ("uni2013", "-"),
    ("uni2014", "--"),
    ("uni2018", "'"),
    ("uni2019", "'"),
    ("uni201C", "\""),
    ("uni201D", "\""),
    ("uni2022", "* "),
    ("uni2026", "..."),
    ("uni00A0", " "),
    ("uni20AC", "\u{20AC}"),
    ("uni00A3", "\u{00A3}"),
];

/// Characters normalised to ASCII after glyph replacement
const CHAR_REPLACEMENTS: &[(char, &str)] = &[
    ('\u{2010}', "-"),
    ('\u{2011}', "-"),
    ('\u{2013}', "-"),
    ('\u{2014}', "--"),
    ('\u{2018}', "'"),
    ('\u{2019}', "'"),
    ('\u{201C}', "\""),
    ('\u{201D}', "\""),
    ('\u{2022}', "* "),
    ('\u{2026}', "..."),
    ('\u{00A0}', " "),
    ('\u{FB00}', "ff"),
    ('\u{FB01}', "fi"),
    ('\u{FB02}', "fl"),
    ('\u{FB03}', "ffi"),
    ('\u{FB04}', "ffl"),
];

/// Clean up a PDF text layer: glyph names, typographic characters, null bytes and blank lines
fn cleanup_pdf_text(text: &str) -> String {
    let mut result = text.replace('\0', "");

    for (glyph, replacement) in GLYPH_REPLACEMENTS {
        result = result.replace(glyph, replacement);
    }
    for (c, replacement) in CHAR_REPLACEMENTS {
        result = result.replace(*c, replacement);
    }

    result
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Stateless parser for formats that do not need OCR or archive recursion
pub struct FileParser;

impl FileParser {
    /// Extract text from `data` already identified as `file_type`.
    ///
    /// `name` is only used in error messages. Images and ZIP archives are
    /// handled by the extractor and rejected here.
    pub fn parse(name: &str, file_type: FileType, data: &[u8]) -> Result<String> {
        match file_type {
            FileType::Pdf => Self::parse_pdf(name, data),
            FileType::Docx => Self::parse_docx(name, data),
            FileType::Pptx => Self::parse_pptx(name, data),
            FileType::Xlsx | FileType::Xls => Self::parse_spreadsheet(name, data),
            FileType::Txt | FileType::Markdown => Ok(Self::parse_text(data)),
            FileType::Html => Self::parse_html(name, data),
            FileType::Csv => Ok(Self::parse_csv(data)),
            FileType::Image | FileType::Zip | FileType::Unknown => Err(
                Error::UnsupportedFileType(format!("{} ({})", name, file_type.display_name())),
            ),
        }
    }

    /// Extract the PDF text layer.
    ///
    /// The result may be empty or very short for scanned documents; deciding
    /// whether to OCR is left to the caller.
    pub fn parse_pdf(name: &str, data: &[u8]) -> Result<String> {
        let raw = Self::extract_pdf_with_timeout(name, data)?;
        Ok(cleanup_pdf_text(&raw))
    }

    /// Run pdf-extract on a separate thread; it can hang or panic on unusual fonts
    fn extract_pdf_with_timeout(name: &str, data: &[u8]) -> Result<String> {
        let data_vec = data.to_vec();
        let (tx, rx) = mpsc::channel();

        let handle = thread::spawn(move || {
            let result = pdf_extract::extract_text_from_mem(&data_vec);
            let _ = tx.send(result);
        });

        match rx.recv_timeout(PDF_EXTRACT_TIMEOUT) {
            Ok(Ok(text)) => {
                let _ = handle.join();
                Ok(text)
            }
            Ok(Err(e)) => {
                let _ = handle.join();
                tracing::warn!("pdf-extract failed on {}: {}, trying lopdf", name, e);
                Self::extract_pdf_text_fallback(name, data)
            }
            Err(mpsc::RecvTimeoutError::Timeout) => {
                tracing::error!(
                    "pdf-extract timed out after {:?} on {}, trying lopdf",
                    PDF_EXTRACT_TIMEOUT,
                    name
                );
                Self::extract_pdf_text_fallback(name, data)
            }
            Err(mpsc::RecvTimeoutError::Disconnected) => {
                tracing::error!("pdf-extract thread crashed on {}, trying lopdf", name);
                Self::extract_pdf_text_fallback(name, data)
            }
        }
    }

    /// Fallback PDF text extraction straight from page content streams
    fn extract_pdf_text_fallback(name: &str, data: &[u8]) -> Result<String> {
        let doc = lopdf::Document::load_mem(data)
            .map_err(|e| Error::extraction(name, format!("Failed to load PDF: {}", e)))?;

        let mut all_text = String::new();
        for (page_num, page_id) in doc.get_pages() {
            match doc.get_page_content(page_id) {
                Ok(content) => {
                    let text = extract_text_from_content(&content);
                    if !text.is_empty() {
                        all_text.push_str(&text);
                        all_text.push('\n');
                    }
                }
                Err(e) => {
                    tracing::debug!("No content stream for page {} of {}: {}", page_num, name, e);
                }
            }
        }

        Ok(all_text)
    }

    fn parse_docx(name: &str, data: &[u8]) -> Result<String> {
        let doc = docx_rs::read_docx(data).map_err(|e| Error::extraction(name, e.to_string()))?;

        let mut content = String::new();
        for child in &doc.document.children {
            match child {
                docx_rs::DocumentChild::Paragraph(p) => {
                    content.push_str(&docx_paragraph_text(p));
                    content.push('\n');
                }
                docx_rs::DocumentChild::Table(table) => docx_table_text(table, &mut content),
                _ => {}
            }
        }

        Ok(content)
    }

    /// Embedded images of an Office document, for OCR.
    ///
    /// Only `.docx`, `.pptx` and `.xlsx` carry a media folder; other types yield nothing.
    pub fn office_media(name: &str, file_type: FileType, data: &[u8]) -> Result<Vec<(String, Vec<u8>)>> {
        let prefix = match file_type {
            FileType::Docx => "word/media/",
            FileType::Pptx => "ppt/media/",
            FileType::Xlsx => "xl/media/",
            _ => return Ok(Vec::new()),
        };

        let mut archive = zip::ZipArchive::new(std::io::Cursor::new(data))
            .map_err(|e| Error::extraction(name, e.to_string()))?;

        let mut media_names: Vec<String> = archive
            .file_names()
            .filter(|n| n.starts_with(prefix))
            .map(str::to_string)
            .collect();
        media_names.sort();

        let mut images = Vec::new();
        for media_name in media_names {
            let Ok(mut file) = archive.by_name(&media_name) else {
                continue;
            };
            let mut buf = Vec::with_capacity(file.size() as usize);
            if file.read_to_end(&mut buf).is_err() {
                tracing::debug!("Skipping unreadable media {} in {}", media_name, name);
                continue;
            }

            if FileType::sniff(&buf) == FileType::Image || FileType::from_name(&media_name) == FileType::Image {
                images.push((media_name, buf));
            }
        }

        Ok(images)
    }

    fn parse_pptx(name: &str, data: &[u8]) -> Result<String> {
        let mut archive = zip::ZipArchive::new(std::io::Cursor::new(data))
            .map_err(|e| Error::extraction(name, e.to_string()))?;

        let mut slide_names: Vec<String> = archive
            .file_names()
            .filter(|n| n.starts_with("ppt/slides/slide") && n.ends_with(".xml"))
            .map(str::to_string)
            .collect();
        slide_names.sort_by_key(|n| slide_number(n));

        let mut content = String::new();
        for (i, slide_name) in slide_names.iter().enumerate() {
            let Ok(mut file) = archive.by_name(slide_name) else {
                continue;
            };
            let mut xml = String::new();
            if file.read_to_string(&mut xml).is_err() {
                tracing::debug!("Skipping unreadable slide {} in {}", slide_name, name);
                continue;
            }

            let slide_text = extract_text_from_pptx_xml(&xml);
            if !slide_text.is_empty() {
                content.push_str(&format!("Slide {}:\n{}\n\n", i + 1, slide_text));
            }
        }

        Ok(content)
    }

    fn parse_spreadsheet(name: &str, data: &[u8]) -> Result<String> {
        let mut workbook = calamine::open_workbook_auto_from_rs(std::io::Cursor::new(data))
            .map_err(|e| Error::extraction(name, e.to_string()))?;

        let mut content = String::new();
        for sheet_name in workbook.sheet_names().to_vec() {
            let Ok(range) = workbook.worksheet_range(&sheet_name) else {
                continue;
            };

            content.push_str(&format!("Sheet: {}\n", sheet_name));
            for row in range.rows() {
                let cells: Vec<String> = row
                    .iter()
                    .map(|cell| match cell {
                        calamine::Data::String(s) => s.clone(),
                        calamine::Data::Float(f) => f.to_string(),
                        calamine::Data::Int(i) => i.to_string(),
                        calamine::Data::Bool(b) => b.to_string(),
                        calamine::Data::DateTime(dt) => dt.to_string(),
                        _ => String::new(),
                    })
                    .collect();

                if cells.iter().any(|c| !c.is_empty()) {
                    content.push_str(&cells.join(" | "));
                    content.push('\n');
                }
            }
            content.push('\n');
        }

        Ok(content)
    }

    fn parse_text(data: &[u8]) -> String {
        String::from_utf8_lossy(data).into_owned()
    }

    fn parse_html(name: &str, data: &[u8]) -> Result<String> {
        let html = String::from_utf8_lossy(data);
        let document = scraper::Html::parse_document(&html);
        let body_selector = scraper::Selector::parse("body")
            .map_err(|e| Error::extraction(name, format!("Invalid selector: {}", e)))?;

        let mut content = String::new();
        if let Some(body) = document.select(&body_selector).next() {
            for text in body.text() {
                let trimmed = text.trim();
                if !trimmed.is_empty() {
                    if !content.is_empty() {
                        content.push('\n');
                    }
                    content.push_str(trimmed);
                }
            }
        }

        Ok(content)
    }

    fn parse_csv(data: &[u8]) -> String {
        let mut reader = csv::Reader::from_reader(data);
        let mut content = String::new();

        if let Ok(headers) = reader.headers() {
            content.push_str(&headers.iter().collect::<Vec<_>>().join(" | "));
            content.push('\n');
        }

        for record in reader.records().flatten() {
            content.push_str(&record.iter().collect::<Vec<_>>().join(" | "));
            content.push('\n');
        }

        content
    }
}

fn docx_paragraph_text(paragraph: &docx_rs::Paragraph) -> String {
    let mut text = String::new();
    for child in &paragraph.children {
        if let docx_rs::ParagraphChild::Run(run) = child {
            for child in &run.children {
                if let docx_rs::RunChild::Text(t) = child {
                    text.push_str(&t.text);
                }
            }
        }
    }
    text
}

/// One line per row, cells separated by ` | ` like the CSV and sheet output
fn docx_table_text(table: &docx_rs::Table, content: &mut String) {
    for docx_rs::TableChild::TableRow(row) in &table.rows {
        let mut nested = String::new();
        let cells: Vec<String> = row
            .cells
            .iter()
            .map(|docx_rs::TableRowChild::TableCell(cell)| {
                let mut paragraphs = Vec::new();
                for item in &cell.children {
                    match item {
                        docx_rs::TableCellContent::Paragraph(p) => {
                            let text = docx_paragraph_text(p);
                            if !text.trim().is_empty() {
                                paragraphs.push(text);
                            }
                        }
                        docx_rs::TableCellContent::Table(inner) => docx_table_text(inner, &mut nested),
                        _ => {}
                    }
                }
                paragraphs.join(" ")
            })
            .collect();

        if cells.iter().any(|c| !c.trim().is_empty()) {
            content.push_str(&cells.join(" | "));
            content.push('\n');
        }
        content.push_str(&nested);
    }
}

/// `ppt/slides/slide12.xml` -> 12
fn slide_number(name: &str) -> u32 {
    name.trim_start_matches("ppt/slides/slide")
        .trim_end_matches(".xml")
        .parse()
        .unwrap_or(0)
}

/// Collect `<a:t>` runs, one line per `<a:p>` paragraph
fn extract_text_from_pptx_xml(xml: &str) -> String {
    use quick_xml::events::Event;

    let mut reader = quick_xml::Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut lines = Vec::new();
    let mut line = String::new();
    let mut in_text = false;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) if e.local_name().as_ref() == b"t" => in_text = true,
            Ok(Event::Text(e)) if in_text => {
                if let Ok(text) = e.unescape() {
                    if !line.is_empty() {
                        line.push(' ');
                    }
                    line.push_str(text.trim());
                }
            }
            Ok(Event::End(e)) => match e.local_name().as_ref() {
                b"t" => in_text = false,
                b"p" => {
                    if !line.trim().is_empty() {
                        lines.push(std::mem::take(&mut line));
                    }
                    line.clear();
                }
                _ => {}
            },
            Ok(Event::Eof) | Err(_) => break,
            _ => {}
        }
    }

    if !line.trim().is_empty() {
        lines.push(line);
    }

    lines.join("\n")
}

/// Pull string operands of `Tj`/`TJ` operators out of a content stream
fn extract_text_from_content(content: &[u8]) -> String {
    let content_str = String::from_utf8_lossy(content);
    let mut text = String::new();
    let mut in_text_block = false;
    let mut current = String::new();

    for line in content_str.lines().map(str::trim) {
        match line {
            "BT" => in_text_block = true,
            "ET" => {
                in_text_block = false;
                if !current.is_empty() {
                    text.push_str(&current);
                    text.push(' ');
                    current.clear();
                }
            }
            _ if in_text_block && (line.ends_with("Tj") || line.ends_with("TJ")) => {
                if let (Some(start), Some(end)) = (line.find('('), line.rfind(')')) {
                    if start < end {
                        current.push_str(
                            &line[start + 1..end]
                                .replace("\\n", "\n")
                                .replace("\\(", "(")
                                .replace("\\)", ")")
                                .replace("\\\\", "\\"),
                        );
                    }
                }
            }
            _ => {}
        }
    }

    text.trim_end().to_string()
}
