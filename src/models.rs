//! Core data models used throughout the work-log pipeline.
//!
//! These types represent the documents, results, and run states that flow
//! from extraction through generation to output.

use chrono::NaiveDate;
use std::path::{Path, PathBuf};

/// File format resolved once from a path's extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DocumentFormat {
    Pdf,
    Docx,
    /// Legacy extension; read as an OOXML container.
    Doc,
    Unsupported,
}

impl DocumentFormat {
    /// Detect the format from the extension, ignoring case.
    pub fn from_path(path: &Path) -> Self {
        let ext = path
            .extension()
            .map(|e| e.to_string_lossy().to_ascii_lowercase())
            .unwrap_or_default();
        match ext.as_str() {
            "pdf" => DocumentFormat::Pdf,
            "docx" => DocumentFormat::Docx,
            "doc" => DocumentFormat::Doc,
            _ => DocumentFormat::Unsupported,
        }
    }

    pub fn is_supported(self) -> bool {
        self != DocumentFormat::Unsupported
    }

    pub fn as_str(self) -> &'static str {
        match self {
            DocumentFormat::Pdf => "pdf",
            DocumentFormat::Docx => "docx",
            DocumentFormat::Doc => "doc",
            DocumentFormat::Unsupported => "unsupported",
        }
    }
}

/// Outcome of reading one document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Extraction {
    Text(String),
    Failed(String),
}

/// A work-log file after extraction.
#[derive(Debug, Clone)]
pub struct Document {
    pub path: PathBuf,
    pub format: DocumentFormat,
    pub extraction: Extraction,
}

impl Document {
    pub fn text(&self) -> Option<&str> {
        match &self.extraction {
            Extraction::Text(t) => Some(t),
            Extraction::Failed(_) => None,
        }
    }

    /// File name for display and for section headers in the combined prompt.
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| self.path.display().to_string())
    }
}

/// The two generated artifacts of a completed run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalysisResult {
    pub summary: String,
    pub thanks: String,
    /// Logical run date; drives the `YYMMDD` stamp in output filenames.
    pub date: NaiveDate,
}

/// Which generated artifact a piece of text belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OutputKind {
    Summary,
    Thanks,
}

impl OutputKind {
    pub fn as_str(self) -> &'static str {
        match self {
            OutputKind::Summary => "summary",
            OutputKind::Thanks => "thanks",
        }
    }
}

/// Orchestrator states. `Completed`, `Failed`, and `Cancelled` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Idle,
    ExtractingDocuments,
    GeneratingSummary,
    GeneratingThankYou,
    Completed,
    Failed,
    Cancelled,
}

impl PipelineState {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            PipelineState::Completed | PipelineState::Failed | PipelineState::Cancelled
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            PipelineState::Idle => "idle",
            PipelineState::ExtractingDocuments => "extracting",
            PipelineState::GeneratingSummary => "summary",
            PipelineState::GeneratingThankYou => "thanks",
            PipelineState::Completed => "completed",
            PipelineState::Failed => "failed",
            PipelineState::Cancelled => "cancelled",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_detection_ignores_case() {
        assert_eq!(
            DocumentFormat::from_path(Path::new("TEST.PDF")),
            DocumentFormat::Pdf
        );
        assert_eq!(
            DocumentFormat::from_path(Path::new("log.Docx")),
            DocumentFormat::Docx
        );
        assert_eq!(
            DocumentFormat::from_path(Path::new("old.doc")),
            DocumentFormat::Doc
        );
        assert_eq!(
            DocumentFormat::from_path(Path::new("notes.txt")),
            DocumentFormat::Unsupported
        );
        assert_eq!(
            DocumentFormat::from_path(Path::new("sheet.xlsx")),
            DocumentFormat::Unsupported
        );
        assert_eq!(
            DocumentFormat::from_path(Path::new("no_extension")),
            DocumentFormat::Unsupported
        );
    }

    #[test]
    fn terminal_states() {
        assert!(PipelineState::Completed.is_terminal());
        assert!(PipelineState::Failed.is_terminal());
        assert!(PipelineState::Cancelled.is_terminal());
        assert!(!PipelineState::GeneratingSummary.is_terminal());
        assert!(!PipelineState::Idle.is_terminal());
    }
}
