//! Error taxonomy for a pipeline run.
//!
//! Extraction failures are per file and non-fatal until every file fails.
//! AI failures stop the run at the stage where they happen. Output failures
//! only surface when saving and leave in-memory results untouched.

use std::path::PathBuf;

use crate::extract::ExtractError;

/// Errors surfaced by the orchestrator, the AI client, and the output writer.
#[derive(Debug, thiserror::Error)]
pub enum WorkflowError {
    /// A single document could not be read, was corrupt, or held no text.
    #[error("failed to read {}: {source}", path.display())]
    FileRead {
        path: PathBuf,
        #[source]
        source: ExtractError,
    },

    /// The Ollama server could not be reached.
    #[error(
        "Ollama server is not reachable at {url} ({reason}). \
         Start it with `ollama serve` or run `worklog serve-check --start`."
    )]
    AiUnavailable { url: String, reason: String },

    /// The model answered, but the answer was unusable (HTTP error, malformed
    /// JSON, timeout mid-response, or empty text).
    #[error("AI response error: {0}")]
    AiResponse(String),

    /// The destination for a generated document could not be written.
    #[error("failed to write {}: {source}", path.display())]
    OutputWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Every selected document failed extraction.
    #[error("no usable documents: all {} file(s) failed to extract", errors.len())]
    NoUsableDocuments { errors: Vec<WorkflowError> },

    /// A run was requested with no files selected.
    #[error("no files selected")]
    EmptySelection,

    /// The run was stopped through its cancel token.
    #[error("run cancelled")]
    Cancelled,

    /// The OS refused to start the worker thread.
    #[error("failed to start worker thread: {0}")]
    WorkerSpawn(#[source] std::io::Error),

    /// The worker thread panicked before returning a result.
    #[error("worker thread panicked")]
    WorkerPanicked,
}

impl WorkflowError {
    /// Short machine-readable kind, used in JSON progress output.
    pub fn kind(&self) -> &'static str {
        match self {
            WorkflowError::FileRead { .. } => "file_read",
            WorkflowError::AiUnavailable { .. } => "ai_unavailable",
            WorkflowError::AiResponse(_) => "ai_response",
            WorkflowError::OutputWrite { .. } => "output_write",
            WorkflowError::NoUsableDocuments { .. } => "no_usable_documents",
            WorkflowError::EmptySelection => "empty_selection",
            WorkflowError::Cancelled => "cancelled",
            WorkflowError::WorkerSpawn(_) => "worker_spawn",
            WorkflowError::WorkerPanicked => "worker_panicked",
        }
    }
}
