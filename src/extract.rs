//! Text extraction for work-log documents (PDF, DOCX, DOC).
//!
//! The format is resolved once from the file extension via
//! [`DocumentFormat::from_path`]. PDF text comes from `pdf-extract`; DOCX and
//! DOC are opened as OOXML containers and `word/document.xml` is walked with
//! `quick-xml`. A legacy binary `.doc` is therefore reported as an OOXML
//! failure rather than read.
//!
//! Extraction never panics: every problem is an [`ExtractError`] and the
//! caller decides whether the run continues.

use std::io::Read;
use std::path::Path;

use crate::models::{Document, DocumentFormat, Extraction};

/// Maximum decompressed bytes to read from a single ZIP entry (zip-bomb protection).
const MAX_XML_ENTRY_BYTES: u64 = 50 * 1024 * 1024;

/// Marker line placed before a table rendered from a DOCX body.
const TABLE_MARKER: &str = "[Table]";

/// Extraction error. One per file; never fatal on its own.
#[derive(Debug, thiserror::Error)]
pub enum ExtractError {
    #[error("could not read file: {0}")]
    Io(String),
    #[error("unsupported file type: {0}")]
    UnsupportedFormat(String),
    #[error("PDF extraction failed: {0}")]
    Pdf(String),
    #[error("OOXML extraction failed: {0}")]
    Ooxml(String),
    #[error("document contains no extractable text")]
    NoText,
}

/// Reads `path` and returns its plain text.
pub fn extract_file(path: &Path) -> Result<String, ExtractError> {
    let format = DocumentFormat::from_path(path);
    if !format.is_supported() {
        return Err(ExtractError::UnsupportedFormat(
            path.extension()
                .map(|e| format!(".{}", e.to_string_lossy()))
                .unwrap_or_else(|| "(no extension)".to_string()),
        ));
    }
    let bytes = std::fs::read(path).map_err(|e| ExtractError::Io(e.to_string()))?;
    extract_bytes(&bytes, format)
}

/// Extracts plain text from in-memory content of a known format.
///
/// Whitespace-only output (for example an image-only PDF) is an error.
pub fn extract_bytes(bytes: &[u8], format: DocumentFormat) -> Result<String, ExtractError> {
    let text = match format {
        DocumentFormat::Pdf => extract_pdf(bytes)?,
        DocumentFormat::Docx | DocumentFormat::Doc => extract_docx(bytes)?,
        DocumentFormat::Unsupported => {
            return Err(ExtractError::UnsupportedFormat(
                format.as_str().to_string(),
            ))
        }
    };
    if text.trim().is_empty() {
        return Err(ExtractError::NoText);
    }
    Ok(text)
}

/// Extracts `path` into a [`Document`], recording failure instead of returning it.
pub fn extract_document(path: &Path) -> Document {
    let format = DocumentFormat::from_path(path);
    let extraction = match extract_file(path) {
        Ok(text) => {
            tracing::info!(
                file = %path.display(),
                format = format.as_str(),
                chars = text.chars().count(),
                "extracted document"
            );
            Extraction::Text(text)
        }
        Err(e) => {
            tracing::warn!(file = %path.display(), error = %e, "extraction failed");
            Extraction::Failed(e.to_string())
        }
    };
    Document {
        path: path.to_path_buf(),
        format,
        extraction,
    }
}

fn extract_pdf(bytes: &[u8]) -> Result<String, ExtractError> {
    // pdf-extract can panic on malformed fonts or xref tables.
    let raw = std::panic::catch_unwind(|| pdf_extract::extract_text_from_mem(bytes))
        .map_err(|_| ExtractError::Pdf("parser panicked on malformed input".to_string()))?
        .map_err(|e| ExtractError::Pdf(e.to_string()))?;
    Ok(normalize_pdf_text(&raw))
}

/// Page breaks arrive as form feeds; each becomes a blank line.
fn normalize_pdf_text(raw: &str) -> String {
    raw.replace('\u{c}', "\n\n").trim().to_string()
}

fn extract_docx(bytes: &[u8]) -> Result<String, ExtractError> {
    let mut archive = zip::ZipArchive::new(std::io::Cursor::new(bytes))
        .map_err(|e| ExtractError::Ooxml(e.to_string()))?;
    let entry = archive
        .by_name("word/document.xml")
        .map_err(|_| ExtractError::Ooxml("word/document.xml not found".to_string()))?;
    let mut doc_xml = Vec::new();
    entry
        .take(MAX_XML_ENTRY_BYTES)
        .read_to_end(&mut doc_xml)
        .map_err(|e| ExtractError::Ooxml(e.to_string()))?;
    if doc_xml.len() as u64 >= MAX_XML_ENTRY_BYTES {
        return Err(ExtractError::Ooxml(
            "word/document.xml exceeds size limit".to_string(),
        ));
    }
    docx_body_text(&doc_xml)
}

/// Walks WordprocessingML and renders paragraphs as lines and tables as
/// ` | `-joined rows.
fn docx_body_text(xml: &[u8]) -> Result<String, ExtractError> {
    use quick_xml::events::Event;

    let mut reader = quick_xml::Reader::from_reader(xml);
    let mut buf = Vec::new();

    let mut lines: Vec<String> = Vec::new();
    let mut para = String::new();
    let mut in_run = false;
    let mut in_text = false;

    let mut table_depth = 0usize;
    let mut table_rows: Vec<String> = Vec::new();
    let mut row: Vec<String> = Vec::new();
    let mut cell = String::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => match e.local_name().as_ref() {
                b"p" => para.clear(),
                b"r" => in_run = true,
                b"t" => in_text = true,
                b"tbl" => {
                    table_depth += 1;
                    if table_depth == 1 {
                        table_rows.clear();
                    }
                }
                b"tr" if table_depth == 1 => row.clear(),
                b"tc" if table_depth == 1 => cell.clear(),
                _ => {}
            },
            Ok(Event::Empty(e)) => match e.local_name().as_ref() {
                b"tab" if in_run => para.push('\t'),
                b"br" | b"cr" if in_run => para.push('\n'),
                _ => {}
            },
            Ok(Event::Text(te)) if in_text => {
                let text = te
                    .unescape()
                    .map_err(|e| ExtractError::Ooxml(e.to_string()))?;
                para.push_str(&text);
            }
            Ok(Event::End(e)) => match e.local_name().as_ref() {
                b"t" => in_text = false,
                b"r" => in_run = false,
                b"p" => {
                    let text = para.trim_end().to_string();
                    para.clear();
                    if table_depth > 0 {
                        if !text.trim().is_empty() {
                            if !cell.is_empty() {
                                cell.push(' ');
                            }
                            cell.push_str(text.trim());
                        }
                    } else if !text.trim().is_empty() {
                        lines.push(text);
                    }
                }
                b"tc" if table_depth == 1 => row.push(cell.trim().to_string()),
                b"tr" if table_depth == 1 => table_rows.push(row.join(" | ")),
                b"tbl" => {
                    table_depth = table_depth.saturating_sub(1);
                    if table_depth == 0 && !table_rows.is_empty() {
                        lines.push(TABLE_MARKER.to_string());
                        lines.append(&mut table_rows);
                    }
                }
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(e) => return Err(ExtractError::Ooxml(e.to_string())),
            _ => {}
        }
        buf.clear();
    }

    Ok(lines.join("\n"))
}
