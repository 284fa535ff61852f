//! Pipeline orchestration on a background worker thread.
//!
//! A run moves through a fixed sequence of states:
//!
//! ```text
//! Idle ─▶ ExtractingDocuments ─▶ GeneratingSummary ─▶ GeneratingThankYou ─▶ Completed
//!   │              │                     │                     │
//!   └──────────────┴─────────────────────┴─────────────────────┴──▶ Failed | Cancelled
//! ```
//!
//! The model's availability is checked before anything is read, so an
//! unreachable server fails the run without touching the files. Extraction
//! failures are collected per file; the run continues while at least one
//! document produced text. Either AI stage failing ends the run.
//!
//! Each finished artifact is announced with `OutputReady`, so a summary
//! survives a later failure of the thank-you stage.
//!
//! The worker talks to the front end only through [`PipelineEvent`]s on an
//! unbounded channel, plus a shared [`CancelToken`] checked between files and
//! before each AI call. An in-flight AI call is never interrupted.

use chrono::NaiveDate;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Instant;
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};

use crate::error::WorkflowError;
use crate::extract::extract_file;
use crate::models::{AnalysisResult, Document, DocumentFormat, Extraction, OutputKind, PipelineState};
use crate::ollama::{collect_stream, LanguageModel};
use crate::progress::PipelineEvent;
use crate::prompts::PromptSet;

/// Name of the thread [`spawn`] runs the pipeline on.
pub const THREAD_NAME: &str = "worklog-pipeline";

pub type EventSender = UnboundedSender<PipelineEvent>;
pub type EventReceiver = UnboundedReceiver<PipelineEvent>;

// Overall percentage reached at the end of each stage.
const EXTRACT_DONE_PERCENT: usize = 30;
const SUMMARY_DONE_PERCENT: u8 = 65;

/// Cooperative stop signal shared between the front end and the worker.
#[derive(Clone, Debug, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// One pipeline run. Drive it with [`Pipeline::run`] on the current thread,
/// or use [`spawn`] to run it on a worker thread.
pub struct Pipeline<M: LanguageModel> {
    model: M,
    prompts: PromptSet,
    events: EventSender,
    cancel: CancelToken,
    state: PipelineState,
}

impl<M: LanguageModel> Pipeline<M> {
    pub fn new(model: M, prompts: PromptSet, events: EventSender, cancel: CancelToken) -> Self {
        Self {
            model,
            prompts,
            events,
            cancel,
            state: PipelineState::Idle,
        }
    }

    pub fn state(&self) -> PipelineState {
        self.state
    }

    /// Runs all stages. Emits exactly one `Failed` event on a fatal error and
    /// always ends with `Finished`.
    pub fn run(&mut self, files: &[PathBuf], date: NaiveDate) -> Result<AnalysisResult, WorkflowError> {
        tracing::info!(
            files = files.len(),
            model = self.model.model_name(),
            "pipeline run started"
        );

        let result = self.execute(files, date);
        match &result {
            Ok(_) => {
                self.transition(PipelineState::Completed);
                self.progress("All stages complete", 100);
            }
            Err(WorkflowError::Cancelled) => {
                tracing::info!("pipeline run cancelled");
                self.transition(PipelineState::Cancelled);
            }
            Err(e) => {
                tracing::error!(kind = e.kind(), error = %e, "pipeline run failed");
                self.emit(PipelineEvent::Failed {
                    kind: e.kind(),
                    message: e.to_string(),
                });
                self.transition(PipelineState::Failed);
            }
        }
        debug_assert!(self.state.is_terminal());
        self.emit(PipelineEvent::Finished { state: self.state });
        result
    }

    fn execute(&mut self, files: &[PathBuf], date: NaiveDate) -> Result<AnalysisResult, WorkflowError> {
        if files.is_empty() {
            return Err(WorkflowError::EmptySelection);
        }
        self.check_cancel()?;
        self.model.check_available()?;

        let documents = self.extract_all(files)?;
        let combined = combine_documents(&documents);

        self.transition(PipelineState::GeneratingSummary);
        self.check_cancel()?;
        self.progress("Generating consolidated summary", EXTRACT_DONE_PERCENT as u8);
        let prompt = self.prompts.summary_prompt(&combined);
        let summary = self.generate(OutputKind::Summary, &prompt)?;

        self.transition(PipelineState::GeneratingThankYou);
        self.check_cancel()?;
        self.progress("Generating thank-you notes", SUMMARY_DONE_PERCENT);
        let prompt = self.prompts.thanks_prompt(&combined);
        let thanks = self.generate(OutputKind::Thanks, &prompt)?;

        Ok(AnalysisResult {
            summary,
            thanks,
            date,
        })
    }

    fn extract_all(&mut self, files: &[PathBuf]) -> Result<Vec<Document>, WorkflowError> {
        self.transition(PipelineState::ExtractingDocuments);
        let started = Instant::now();
        let total = files.len();
        let mut documents = Vec::with_capacity(total);
        let mut failures = Vec::new();

        for (i, path) in files.iter().enumerate() {
            self.check_cancel()?;
            self.progress(
                &format!("Reading file {}/{}: {}", i + 1, total, display_name(path)),
                (i * EXTRACT_DONE_PERCENT / total) as u8,
            );

            let format = DocumentFormat::from_path(path);
            let extraction = match extract_file(path) {
                Ok(text) => {
                    self.emit(PipelineEvent::FileExtracted {
                        path: path.clone(),
                        chars: text.chars().count(),
                    });
                    Extraction::Text(text)
                }
                Err(source) => {
                    tracing::warn!(file = %path.display(), error = %source, "file read error");
                    let message = source.to_string();
                    self.emit(PipelineEvent::FileFailed {
                        path: path.clone(),
                        error: message.clone(),
                    });
                    failures.push(WorkflowError::FileRead {
                        path: path.clone(),
                        source,
                    });
                    Extraction::Failed(message)
                }
            };
            documents.push(Document {
                path: path.clone(),
                format,
                extraction,
            });
        }

        let succeeded = documents.iter().filter(|d| d.text().is_some()).count();
        tracing::info!(
            succeeded,
            failed = failures.len(),
            "extraction stage finished"
        );
        if succeeded == 0 {
            return Err(WorkflowError::NoUsableDocuments { errors: failures });
        }
        if !failures.is_empty() {
            self.progress(
                &format!(
                    "Read {} of {} files ({} failed)",
                    succeeded,
                    total,
                    failures.len()
                ),
                EXTRACT_DONE_PERCENT as u8,
            );
        }
        self.emit(PipelineEvent::StageCompleted {
            state: PipelineState::ExtractingDocuments,
            elapsed: started.elapsed(),
        });
        Ok(documents)
    }

    fn generate(&mut self, kind: OutputKind, prompt: &str) -> Result<String, WorkflowError> {
        let started = Instant::now();
        let events = self.events.clone();
        let stream = self.model.generate_stream(prompt)?;
        let text = collect_stream(stream, |fragment| {
            let _ = events.send(PipelineEvent::Fragment {
                kind,
                text: fragment.to_string(),
            });
        })?;
        tracing::info!(
            stage = kind.as_str(),
            chars = text.chars().count(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "generation stage finished"
        );
        self.emit(PipelineEvent::StageCompleted {
            state: self.state,
            elapsed: started.elapsed(),
        });
        self.emit(PipelineEvent::OutputReady {
            kind,
            text: text.clone(),
        });
        Ok(text)
    }

    fn check_cancel(&self) -> Result<(), WorkflowError> {
        if self.cancel.is_cancelled() {
            Err(WorkflowError::Cancelled)
        } else {
            Ok(())
        }
    }

    fn transition(&mut self, next: PipelineState) {
        tracing::info!(from = self.state.as_str(), to = next.as_str(), "state transition");
        self.state = next;
        self.emit(PipelineEvent::StateChanged { state: next });
    }

    fn progress(&self, message: &str, percent: u8) {
        self.emit(PipelineEvent::Progress {
            message: message.to_string(),
            percent,
        });
    }

    // A dropped receiver means nobody is listening; the run still completes.
    fn emit(&self, event: PipelineEvent) {
        let _ = self.events.send(event);
    }
}

/// Joins the readable documents into one prompt body, one headed block per file.
pub fn combine_documents(documents: &[Document]) -> String {
    documents
        .iter()
        .filter_map(|d| {
            d.text()
                .map(|text| format!("=== File: {} ===\n{}", d.file_name(), text))
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string())
}

/// Handle to a pipeline running on its own thread.
pub struct WorkerHandle {
    events: EventReceiver,
    cancel: CancelToken,
    thread: JoinHandle<Result<AnalysisResult, WorkflowError>>,
}

impl WorkerHandle {
    /// Receiver for the run's events; `Finished` is always the last one.
    pub fn events(&mut self) -> &mut EventReceiver {
        &mut self.events
    }

    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    pub fn cancel(&self) {
        tracing::info!("cancellation requested");
        self.cancel.cancel();
    }

    /// Waits for the worker and returns the run's outcome.
    pub fn join(self) -> Result<AnalysisResult, WorkflowError> {
        self.thread
            .join()
            .map_err(|_| WorkflowError::WorkerPanicked)?
    }
}

/// Starts a run on a new worker thread. An empty selection is rejected here,
/// before any thread starts.
pub fn spawn<M>(
    model: M,
    prompts: PromptSet,
    files: Vec<PathBuf>,
    date: NaiveDate,
) -> Result<WorkerHandle, WorkflowError>
where
    M: LanguageModel + 'static,
{
    if files.is_empty() {
        return Err(WorkflowError::EmptySelection);
    }

    let (tx, rx) = unbounded_channel();
    let cancel = CancelToken::new();
    let worker_cancel = cancel.clone();

    let thread = std::thread::Builder::new()
        .name(THREAD_NAME.to_string())
        .spawn(move || {
            let mut pipeline = Pipeline::new(model, prompts, tx, worker_cancel);
            pipeline.run(&files, date)
        })
        .map_err(WorkflowError::WorkerSpawn)?;

    Ok(WorkerHandle {
        events: rx,
        cancel,
        thread,
    })
}
