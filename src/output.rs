//! DOCX output for generated summaries and thank-you notes.
//!
//! Files are named `<label>_<YYMMDD>.docx` and written as a minimal
//! WordprocessingML package: a centered title heading, a centered date line,
//! a separator, then one paragraph per line of generated text. Existing files
//! are overwritten; confirming that is the caller's job.

use chrono::NaiveDate;
use quick_xml::escape::escape;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::config::OutputConfig;
use crate::error::WorkflowError;
use crate::models::{AnalysisResult, OutputKind};
use crate::selector::date_stamp;

const SEPARATOR_WIDTH: usize = 50;

const CONTENT_TYPES_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Override PartName="/word/document.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml"/><Override PartName="/word/styles.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.styles+xml"/></Types>"#;

const PACKAGE_RELS_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="word/document.xml"/></Relationships>"#;

const DOCUMENT_RELS_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles" Target="styles.xml"/></Relationships>"#;

// Normal body text at 11pt; Heading1 bold at 16pt. Sizes are half-points.
const STYLES_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:styles xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:style w:type="paragraph" w:default="1" w:styleId="Normal"><w:name w:val="Normal"/><w:rPr><w:sz w:val="22"/></w:rPr></w:style><w:style w:type="paragraph" w:styleId="Heading1"><w:name w:val="heading 1"/><w:basedOn w:val="Normal"/><w:next w:val="Normal"/><w:pPr><w:spacing w:before="240" w:after="120"/><w:outlineLvl w:val="0"/></w:pPr><w:rPr><w:b/><w:sz w:val="32"/></w:rPr></w:style></w:styles>"#;

/// Writes generated text to date-stamped DOCX files in one directory.
#[derive(Debug, Clone)]
pub struct OutputGenerator {
    directory: PathBuf,
    summary_label: String,
    thanks_label: String,
    summary_title: String,
    thanks_title: String,
}

impl OutputGenerator {
    pub fn from_config(config: &OutputConfig) -> Self {
        Self {
            directory: config.directory.clone(),
            summary_label: config.summary_label.clone(),
            thanks_label: config.thanks_label.clone(),
            summary_title: config.summary_title.clone(),
            thanks_title: config.thanks_title.clone(),
        }
    }

    /// Same labels and titles, different target directory.
    pub fn with_directory(mut self, directory: impl Into<PathBuf>) -> Self {
        self.directory = directory.into();
        self
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    pub fn label(&self, kind: OutputKind) -> &str {
        match kind {
            OutputKind::Summary => &self.summary_label,
            OutputKind::Thanks => &self.thanks_label,
        }
    }

    pub fn title(&self, kind: OutputKind) -> &str {
        match kind {
            OutputKind::Summary => &self.summary_title,
            OutputKind::Thanks => &self.thanks_title,
        }
    }

    /// `<label>_<YYMMDD>.docx`
    pub fn filename(label: &str, date: NaiveDate) -> String {
        format!("{}_{}.docx", label, date_stamp(date))
    }

    pub fn path_for(&self, kind: OutputKind, date: NaiveDate) -> PathBuf {
        self.directory.join(Self::filename(self.label(kind), date))
    }

    /// Writes one artifact and returns its path.
    pub fn save(
        &self,
        kind: OutputKind,
        text: &str,
        date: NaiveDate,
    ) -> Result<PathBuf, WorkflowError> {
        let path = self.path_for(kind, date);
        std::fs::create_dir_all(&self.directory).map_err(|source| WorkflowError::OutputWrite {
            path: self.directory.clone(),
            source,
        })?;
        write_docx(&path, self.title(kind), date, text).map_err(|source| {
            WorkflowError::OutputWrite {
                path: path.clone(),
                source,
            }
        })?;
        tracing::info!(kind = kind.as_str(), file = %path.display(), "saved document");
        Ok(path)
    }

    /// Writes the summary and the thank-you notes, in that order.
    pub fn save_all(&self, result: &AnalysisResult) -> Result<Vec<PathBuf>, WorkflowError> {
        Ok(vec![
            self.save(OutputKind::Summary, &result.summary, result.date)?,
            self.save(OutputKind::Thanks, &result.thanks, result.date)?,
        ])
    }
}

/// Writes a complete DOCX package to `path`.
pub fn write_docx(path: &Path, title: &str, date: NaiveDate, text: &str) -> std::io::Result<()> {
    let file = std::fs::File::create(path)?;
    let mut zip = zip::ZipWriter::new(file);
    let options = zip::write::SimpleFileOptions::default()
        .compression_method(zip::CompressionMethod::Deflated);

    let document = render_document_xml(title, &date.format("%Y-%m-%d").to_string(), text);
    for (name, body) in [
        ("[Content_Types].xml", CONTENT_TYPES_XML),
        ("_rels/.rels", PACKAGE_RELS_XML),
        ("word/_rels/document.xml.rels", DOCUMENT_RELS_XML),
        ("word/styles.xml", STYLES_XML),
        ("word/document.xml", document.as_str()),
    ] {
        zip.start_file(name, options).map_err(std::io::Error::other)?;
        zip.write_all(body.as_bytes())?;
    }
    zip.finish().map_err(std::io::Error::other)?;
    Ok(())
}

/// Renders `word/document.xml` for a title, a date line, and body text.
pub fn render_document_xml(title: &str, date_line: &str, text: &str) -> String {
    let mut body = String::new();
    body.push_str(&paragraph(title, Some("Heading1"), true));
    body.push_str(&paragraph(date_line, None, true));
    body.push_str(&paragraph(&"=".repeat(SEPARATOR_WIDTH), None, false));
    for line in text.lines() {
        if line.trim().is_empty() {
            body.push_str("<w:p/>");
        } else {
            body.push_str(&paragraph(line, None, false));
        }
    }

    format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\n\
         <w:document xmlns:w=\"http://schemas.openxmlformats.org/wordprocessingml/2006/main\">\
         <w:body>{}<w:sectPr/></w:body></w:document>",
        body
    )
}

fn paragraph(text: &str, style: Option<&str>, centered: bool) -> String {
    let mut props = String::new();
    if let Some(style) = style {
        props.push_str(&format!("<w:pStyle w:val=\"{}\"/>", style));
    }
    if centered {
        props.push_str("<w:jc w:val=\"center\"/>");
    }
    let ppr = if props.is_empty() {
        String::new()
    } else {
        format!("<w:pPr>{}</w:pPr>", props)
    };
    format!(
        "<w:p>{}<w:r><w:t xml:space=\"preserve\">{}</w:t></w:r></w:p>",
        ppr,
        escape(&xml_safe(text))
    )
}

/// Drops control characters XML 1.0 cannot carry; model output occasionally has them.
fn xml_safe(text: &str) -> String {
    text.chars()
        .filter(|c| *c == '\t' || *c >= ' ')
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::extract_file;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 11, 25).unwrap()
    }

    #[test]
    fn filename_pattern() {
        assert_eq!(
            OutputGenerator::filename("summary", date()),
            "summary_251125.docx"
        );
        assert_eq!(
            OutputGenerator::filename("thanks", date()),
            "thanks_251125.docx"
        );
    }

    #[test]
    fn save_writes_named_file_with_text() {
        let tmp = tempfile::TempDir::new().unwrap();
        let gen = OutputGenerator::from_config(&OutputConfig::default()).with_directory(tmp.path());
        let path = gen
            .save(OutputKind::Summary, "Alice shipped the release.\n\nBob fixed CI.", date())
            .unwrap();
        assert_eq!(path, tmp.path().join("summary_251125.docx"));

        let text = extract_file(&path).unwrap();
        assert!(text.contains("Team Work Summary"));
        assert!(text.contains("2025-11-25"));
        assert!(text.contains("Alice shipped the release."));
        assert!(text.contains("Bob fixed CI."));
    }

    #[test]
    fn save_overwrites_existing_file() {
        let tmp = tempfile::TempDir::new().unwrap();
        let gen = OutputGenerator::from_config(&OutputConfig::default()).with_directory(tmp.path());
        gen.save(OutputKind::Thanks, "first", date()).unwrap();
        let path = gen.save(OutputKind::Thanks, "second", date()).unwrap();
        let text = extract_file(&path).unwrap();
        assert!(text.contains("second"));
        assert!(!text.contains("first"));
    }

    #[test]
    fn save_all_writes_both_artifacts() {
        let tmp = tempfile::TempDir::new().unwrap();
        let gen = OutputGenerator::from_config(&OutputConfig::default())
            .with_directory(tmp.path().join("out"));
        let result = AnalysisResult {
            summary: "S".to_string(),
            thanks: "T".to_string(),
            date: date(),
        };
        let paths = gen.save_all(&result).unwrap();
        assert_eq!(
            paths,
            vec![
                tmp.path().join("out").join("summary_251125.docx"),
                tmp.path().join("out").join("thanks_251125.docx"),
            ]
        );
    }

    #[test]
    fn unwritable_destination_is_output_error() {
        let tmp = tempfile::TempDir::new().unwrap();
        let blocker = tmp.path().join("file");
        std::fs::write(&blocker, b"x").unwrap();
        let gen = OutputGenerator::from_config(&OutputConfig::default()).with_directory(&blocker);
        let err = gen.save(OutputKind::Summary, "text", date()).unwrap_err();
        assert!(matches!(err, WorkflowError::OutputWrite { .. }));
    }

    #[test]
    fn document_xml_escapes_markup() {
        let xml = render_document_xml("T", "2025-11-25", "a < b & c\u{1}");
        assert!(xml.contains("a &lt; b &amp; c</w:t>"));
        assert!(xml.contains("<w:pStyle w:val=\"Heading1\"/>"));
    }
}
