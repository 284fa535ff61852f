//! Pipeline events and their presentation.
//!
//! The worker thread emits [`PipelineEvent`]s over a channel; the front end
//! drains the channel and hands each event to a [`ProgressReporter`].
//! Status lines go to **stderr** so stdout carries only generated text (human
//! mode) and stays pipeable.

use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;

use crate::models::{OutputKind, PipelineState};

/// A fire-and-forget notification from the worker.
#[derive(Clone, Debug, PartialEq)]
pub enum PipelineEvent {
    StateChanged {
        state: PipelineState,
    },
    /// Human-readable status with overall completion in percent.
    Progress {
        message: String,
        percent: u8,
    },
    FileExtracted {
        path: PathBuf,
        chars: usize,
    },
    FileFailed {
        path: PathBuf,
        error: String,
    },
    /// A streamed piece of generated text.
    Fragment {
        kind: OutputKind,
        text: String,
    },
    StageCompleted {
        state: PipelineState,
        elapsed: Duration,
    },
    /// The complete text of one artifact, sent once its stage succeeds.
    OutputReady {
        kind: OutputKind,
        text: String,
    },
    /// The single fatal error of a run.
    Failed {
        kind: &'static str,
        message: String,
    },
    /// Always the last event of a run.
    Finished {
        state: PipelineState,
    },
}

/// Renders pipeline events for the user.
pub trait ProgressReporter: Send {
    fn report(&self, event: &PipelineEvent);
}

/// Human-friendly output: status on stderr, generated text streamed to stdout.
pub struct StderrProgress;

impl ProgressReporter for StderrProgress {
    fn report(&self, event: &PipelineEvent) {
        if let PipelineEvent::Fragment { text, .. } = event {
            let mut out = std::io::stdout().lock();
            let _ = out.write_all(text.as_bytes());
            let _ = out.flush();
            return;
        }

        let line = match event {
            PipelineEvent::StateChanged { state } => match state {
                PipelineState::GeneratingSummary => "\n== Summary ==\n".to_string(),
                PipelineState::GeneratingThankYou => "\n== Thank-you notes ==\n".to_string(),
                _ => return,
            },
            PipelineEvent::Progress { message, percent } => {
                format!("[{:>3}%] {}\n", percent, message)
            }
            PipelineEvent::FileExtracted { path, chars } => format!(
                "  read {}  ({} chars)\n",
                path.display(),
                format_number(*chars as u64)
            ),
            PipelineEvent::FileFailed { path, error } => {
                format!("  skipped {}: {}\n", path.display(), error)
            }
            PipelineEvent::StageCompleted { state, elapsed } => {
                format!("\n  {} done in {:.1}s\n", state.as_str(), elapsed.as_secs_f64())
            }
            PipelineEvent::Failed { message, .. } => format!("error: {}\n", message),
            PipelineEvent::Finished { state } => format!("finished: {}\n", state.as_str()),
            PipelineEvent::Fragment { .. } | PipelineEvent::OutputReady { .. } => return,
        };
        let mut err = std::io::stderr().lock();
        let _ = err.write_all(line.as_bytes());
        let _ = err.flush();
    }
}

/// Machine-readable progress: one JSON object per line on stderr.
pub struct JsonProgress;

impl ProgressReporter for JsonProgress {
    fn report(&self, event: &PipelineEvent) {
        let obj = event_json(event);
        if let Ok(line) = serde_json::to_string(&obj) {
            let _ = writeln!(std::io::stderr().lock(), "{}", line);
            let _ = std::io::stderr().lock().flush();
        }
    }
}

/// No-op reporter when progress is disabled.
pub struct NoProgress;

impl ProgressReporter for NoProgress {
    fn report(&self, _event: &PipelineEvent) {}
}

fn event_json(event: &PipelineEvent) -> serde_json::Value {
    match event {
        PipelineEvent::StateChanged { state } => serde_json::json!({
            "event": "state",
            "state": state.as_str(),
        }),
        PipelineEvent::Progress { message, percent } => serde_json::json!({
            "event": "progress",
            "message": message,
            "percent": percent,
        }),
        PipelineEvent::FileExtracted { path, chars } => serde_json::json!({
            "event": "file_extracted",
            "path": path.display().to_string(),
            "chars": chars,
        }),
        PipelineEvent::FileFailed { path, error } => serde_json::json!({
            "event": "file_failed",
            "path": path.display().to_string(),
            "error": error,
        }),
        PipelineEvent::Fragment { kind, text } => serde_json::json!({
            "event": "fragment",
            "kind": kind.as_str(),
            "text": text,
        }),
        PipelineEvent::StageCompleted { state, elapsed } => serde_json::json!({
            "event": "stage_completed",
            "state": state.as_str(),
            "elapsed_ms": elapsed.as_millis() as u64,
        }),
        PipelineEvent::OutputReady { kind, text } => serde_json::json!({
            "event": "output_ready",
            "kind": kind.as_str(),
            "chars": text.chars().count(),
        }),
        PipelineEvent::Failed { kind, message } => serde_json::json!({
            "event": "failed",
            "kind": kind,
            "message": message,
        }),
        PipelineEvent::Finished { state } => serde_json::json!({
            "event": "finished",
            "state": state.as_str(),
        }),
    }
}

fn format_number(n: u64) -> String {
    let s = n.to_string();
    let mut result = String::with_capacity(s.len() + (s.len() - 1) / 3);
    let chars: Vec<char> = s.chars().rev().collect();
    for (i, c) in chars.iter().enumerate() {
        if i > 0 && i % 3 == 0 {
            result.push(',');
        }
        result.push(*c);
    }
    result.chars().rev().collect()
}

/// Progress mode for the CLI: off, human (stderr), or JSON (stderr).
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ProgressMode {
    Off,
    Human,
    Json,
}

impl ProgressMode {
    /// Human progress when stderr is a TTY, otherwise off.
    pub fn default_for_tty() -> Self {
        if atty::is(atty::Stream::Stderr) {
            ProgressMode::Human
        } else {
            ProgressMode::Off
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "off" => Some(ProgressMode::Off),
            "human" => Some(ProgressMode::Human),
            "json" => Some(ProgressMode::Json),
            _ => None,
        }
    }

    pub fn reporter(&self) -> Box<dyn ProgressReporter> {
        match self {
            ProgressMode::Off => Box::new(NoProgress),
            ProgressMode::Human => Box::new(StderrProgress),
            ProgressMode::Json => Box::new(JsonProgress),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_number_comma() {
        assert_eq!(format_number(0), "0");
        assert_eq!(format_number(999), "999");
        assert_eq!(format_number(1000), "1,000");
        assert_eq!(format_number(1_234_567), "1,234,567");
    }

    #[test]
    fn json_shape_for_failure_and_fragment() {
        let v = event_json(&PipelineEvent::Failed {
            kind: "ai_unavailable",
            message: "down".to_string(),
        });
        assert_eq!(v["event"], "failed");
        assert_eq!(v["kind"], "ai_unavailable");

        let v = event_json(&PipelineEvent::Fragment {
            kind: OutputKind::Thanks,
            text: "Thanks".to_string(),
        });
        assert_eq!(v["kind"], "thanks");
        assert_eq!(v["text"], "Thanks");
    }

    #[test]
    fn output_ready_reports_size_not_text() {
        let v = event_json(&PipelineEvent::OutputReady {
            kind: OutputKind::Summary,
            text: "héllo".to_string(),
        });
        assert_eq!(v["event"], "output_ready");
        assert_eq!(v["kind"], "summary");
        assert_eq!(v["chars"], 5);
        assert!(v.get("text").is_none());
    }

    #[test]
    fn parse_modes() {
        assert_eq!(ProgressMode::parse("json"), Some(ProgressMode::Json));
        assert_eq!(ProgressMode::parse("off"), Some(ProgressMode::Off));
        assert_eq!(ProgressMode::parse("loud"), None);
    }
}
