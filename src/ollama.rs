//! Client for a locally running Ollama server.
//!
//! Uses `reqwest::blocking`: every call here runs on the pipeline's worker
//! thread (or a plain CLI thread), never inside an async runtime.
//!
//! # Endpoints
//!
//! | Method | Path | Use |
//! |--------|------|-----|
//! | `GET`  | `/api/tags` | availability check and model listing |
//! | `POST` | `/api/generate` | completion, `stream: false` or `stream: true` (NDJSON) |
//!
//! No call is retried. A connection failure maps to
//! [`WorkflowError::AiUnavailable`]; anything that reached the server but
//! produced no usable text maps to [`WorkflowError::AiResponse`].

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::io::{BufRead, BufReader};
use std::process::{Command, Stdio};
use std::time::{Duration, Instant};

use crate::config::OllamaConfig;
use crate::error::WorkflowError;

/// Boxed fragment stream returned by [`LanguageModel::generate_stream`].
pub type FragmentStream<'a> = Box<dyn Iterator<Item = Result<String, WorkflowError>> + 'a>;

/// Text generation backend used by the pipeline.
///
/// [`OllamaClient`] is the production implementation; tests substitute
/// scripted fakes.
pub trait LanguageModel: Send {
    /// Model identifier sent with each request (e.g. `"llama3.2"`).
    fn model_name(&self) -> &str;

    /// Confirms the server is reachable, explaining why when it is not.
    fn check_available(&self) -> Result<(), WorkflowError>;

    fn is_available(&self) -> bool {
        self.check_available().is_ok()
    }

    /// Starts a streaming completion. Fragments arrive lazily; the stream
    /// ends after the server's final message and cannot be restarted.
    fn generate_stream(&self, prompt: &str) -> Result<FragmentStream<'_>, WorkflowError>;
}

/// Connection settings, fixed for the lifetime of a client.
#[derive(Debug, Clone)]
pub struct OllamaSettings {
    pub base_url: String,
    pub model: String,
    pub timeout: Duration,
    pub health_timeout: Duration,
    pub temperature: f32,
    pub system: String,
}

impl OllamaSettings {
    pub fn from_config(config: &OllamaConfig, system: &str) -> Self {
        Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            timeout: Duration::from_secs(config.timeout_secs),
            health_timeout: Duration::from_secs(config.health_timeout_secs),
            temperature: config.temperature,
            system: system.to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct TagsResponse {
    #[serde(default)]
    models: Vec<ModelTag>,
}

#[derive(Debug, Deserialize)]
struct ModelTag {
    name: String,
}

/// One `/api/generate` message: the whole answer, or one NDJSON line when streaming.
#[derive(Debug, Deserialize)]
struct GenerateChunk {
    #[serde(default)]
    response: String,
    #[serde(default)]
    done: bool,
    #[serde(default)]
    error: Option<String>,
}

pub struct OllamaClient {
    settings: OllamaSettings,
    http: reqwest::blocking::Client,
}

impl OllamaClient {
    pub fn new(settings: OllamaSettings) -> Result<Self> {
        let http = reqwest::blocking::Client::builder()
            .timeout(settings.timeout)
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self { settings, http })
    }

    pub fn settings(&self) -> &OllamaSettings {
        &self.settings
    }

    pub fn base_url(&self) -> &str {
        &self.settings.base_url
    }

    /// Installed model names, sorted.
    pub fn list_models(&self) -> Result<Vec<String>, WorkflowError> {
        let resp = self
            .http
            .get(format!("{}/api/tags", self.settings.base_url))
            .timeout(self.settings.health_timeout)
            .send()
            .map_err(|e| self.map_send_error(e))?;
        let resp = self.ensure_success(resp)?;
        let tags: TagsResponse = resp
            .json()
            .map_err(|e| WorkflowError::AiResponse(format!("invalid /api/tags body: {}", e)))?;
        let mut names: Vec<String> = tags.models.into_iter().map(|m| m.name).collect();
        names.sort();
        Ok(names)
    }

    /// Blocking completion: waits for the whole answer.
    pub fn generate(&self, prompt: &str) -> Result<String, WorkflowError> {
        tracing::info!(model = %self.settings.model, "generation started");
        let resp = self.post_generate(prompt, false)?;
        let chunk: GenerateChunk = resp
            .json()
            .map_err(|e| WorkflowError::AiResponse(format!("invalid completion body: {}", e)))?;
        if let Some(err) = chunk.error {
            return Err(WorkflowError::AiResponse(err));
        }
        if chunk.response.trim().is_empty() {
            return Err(WorkflowError::AiResponse(
                "model returned empty text".to_string(),
            ));
        }
        tracing::info!(chars = chunk.response.chars().count(), "generation finished");
        Ok(chunk.response)
    }

    /// Streaming completion as a concrete iterator.
    pub fn stream(&self, prompt: &str) -> Result<GenerateStream, WorkflowError> {
        tracing::info!(model = %self.settings.model, "streaming generation started");
        let resp = self.post_generate(prompt, true)?;
        Ok(GenerateStream::new(BufReader::new(resp)))
    }

    fn post_generate(
        &self,
        prompt: &str,
        stream: bool,
    ) -> Result<reqwest::blocking::Response, WorkflowError> {
        let body = serde_json::json!({
            "model": self.settings.model,
            "prompt": prompt,
            "system": self.settings.system,
            "stream": stream,
            "options": { "temperature": self.settings.temperature },
        });
        let resp = self
            .http
            .post(format!("{}/api/generate", self.settings.base_url))
            .json(&body)
            .send()
            .map_err(|e| self.map_send_error(e))?;
        self.ensure_success(resp)
    }

    fn ensure_success(
        &self,
        resp: reqwest::blocking::Response,
    ) -> Result<reqwest::blocking::Response, WorkflowError> {
        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }
        let body_text = resp.text().unwrap_or_default();
        let message = serde_json::from_str::<GenerateChunk>(&body_text)
            .ok()
            .and_then(|c| c.error)
            .unwrap_or(body_text);
        Err(WorkflowError::AiResponse(format!(
            "Ollama API error {}: {}",
            status, message
        )))
    }

    fn map_send_error(&self, e: reqwest::Error) -> WorkflowError {
        if e.is_connect() {
            WorkflowError::AiUnavailable {
                url: self.settings.base_url.clone(),
                reason: e.to_string(),
            }
        } else if e.is_timeout() {
            WorkflowError::AiResponse(format!(
                "request timed out after {}s",
                self.settings.timeout.as_secs()
            ))
        } else {
            WorkflowError::AiResponse(e.to_string())
        }
    }
}

impl LanguageModel for OllamaClient {
    fn model_name(&self) -> &str {
        &self.settings.model
    }

    fn check_available(&self) -> Result<(), WorkflowError> {
        let result = self
            .http
            .get(format!("{}/api/tags", self.settings.base_url))
            .timeout(self.settings.health_timeout)
            .send();
        match result {
            Ok(resp) if resp.status().is_success() => Ok(()),
            Ok(resp) => Err(WorkflowError::AiUnavailable {
                url: self.settings.base_url.clone(),
                reason: format!("status endpoint returned {}", resp.status()),
            }),
            Err(e) => Err(WorkflowError::AiUnavailable {
                url: self.settings.base_url.clone(),
                reason: e.to_string(),
            }),
        }
    }

    fn generate_stream(&self, prompt: &str) -> Result<FragmentStream<'_>, WorkflowError> {
        Ok(Box::new(self.stream(prompt)?))
    }
}

/// Lazy iterator over the `response` fragments of an NDJSON completion.
///
/// Ends at the first `done: true` message or at end of body. A transport
/// error, malformed line, or server-sent `error` yields one `Err` and ends
/// the stream.
pub struct GenerateStream {
    lines: std::io::Lines<Box<dyn BufRead + Send>>,
    finished: bool,
}

impl GenerateStream {
    pub fn new(reader: impl BufRead + Send + 'static) -> Self {
        let boxed: Box<dyn BufRead + Send> = Box::new(reader);
        Self {
            lines: boxed.lines(),
            finished: false,
        }
    }

    fn fail(&mut self, message: String) -> Option<Result<String, WorkflowError>> {
        self.finished = true;
        Some(Err(WorkflowError::AiResponse(message)))
    }
}

impl Iterator for GenerateStream {
    type Item = Result<String, WorkflowError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        loop {
            let line = match self.lines.next() {
                None => {
                    self.finished = true;
                    return None;
                }
                Some(Err(e)) => return self.fail(format!("stream read failed: {}", e)),
                Some(Ok(line)) => line,
            };
            if line.trim().is_empty() {
                continue;
            }
            let chunk: GenerateChunk = match serde_json::from_str(&line) {
                Ok(c) => c,
                Err(e) => return self.fail(format!("malformed stream line: {}", e)),
            };
            if let Some(err) = chunk.error {
                return self.fail(err);
            }
            if chunk.done {
                self.finished = true;
                if chunk.response.is_empty() {
                    return None;
                }
                return Some(Ok(chunk.response));
            }
            if !chunk.response.is_empty() {
                return Some(Ok(chunk.response));
            }
        }
    }
}

/// Concatenates a fragment stream, failing on the first error or on empty text.
pub fn collect_stream(
    stream: FragmentStream<'_>,
    mut on_fragment: impl FnMut(&str),
) -> Result<String, WorkflowError> {
    let mut text = String::new();
    for fragment in stream {
        let fragment = fragment?;
        on_fragment(&fragment);
        text.push_str(&fragment);
    }
    if text.trim().is_empty() {
        return Err(WorkflowError::AiResponse(
            "model returned empty text".to_string(),
        ));
    }
    Ok(text)
}

/// Detects and, on request, launches a local `ollama serve` process.
pub struct ServerManager<'a> {
    client: &'a OllamaClient,
}

impl<'a> ServerManager<'a> {
    pub fn new(client: &'a OllamaClient) -> Self {
        Self { client }
    }

    pub fn is_running(&self) -> bool {
        self.client.is_available()
    }

    /// Starts `ollama serve` if the server is down, then polls until it
    /// answers or `wait` elapses. Returns `Ok(true)` once reachable.
    pub fn ensure_running(&self, wait: Duration) -> Result<bool> {
        if self.is_running() {
            tracing::info!(url = %self.client.base_url(), "Ollama server already running");
            return Ok(true);
        }

        let host = self
            .client
            .base_url()
            .trim_start_matches("http://")
            .trim_start_matches("https://")
            .to_string();
        tracing::info!(host = %host, "starting `ollama serve`");
        let child = Command::new("ollama")
            .arg("serve")
            .env("OLLAMA_HOST", &host)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn();
        let child = match child {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                bail!("`ollama` executable not found on PATH; install Ollama from https://ollama.com")
            }
            Err(e) => return Err(e).context("Failed to start `ollama serve`"),
        };
        tracing::info!(pid = child.id(), "spawned Ollama server");

        let deadline = Instant::now() + wait;
        while Instant::now() < deadline {
            std::thread::sleep(Duration::from_millis(500));
            if self.is_running() {
                tracing::info!("Ollama server is up");
                return Ok(true);
            }
        }
        tracing::warn!(wait_secs = wait.as_secs(), "Ollama server did not answer in time");
        Ok(false)
    }
}
