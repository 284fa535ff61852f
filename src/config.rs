//! TOML configuration.
//!
//! Every section is optional; a missing file yields [`Config::default`].
//! See `config/worklog.example.toml` for a commented example.

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::prompts::DOCUMENTS_PLACEHOLDER;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub ollama: OllamaConfig,
    #[serde(default)]
    pub selection: SelectionConfig,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub prompts: PromptsConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct OllamaConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_health_timeout_secs")]
    pub health_timeout_secs: u64,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    /// Spawn `ollama serve` when the server is not answering.
    #[serde(default)]
    pub auto_start: bool,
    #[serde(default = "default_start_wait_secs")]
    pub start_wait_secs: u64,
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            model: default_model(),
            timeout_secs: default_timeout_secs(),
            health_timeout_secs: default_health_timeout_secs(),
            temperature: default_temperature(),
            auto_start: false,
            start_wait_secs: default_start_wait_secs(),
        }
    }
}

fn default_base_url() -> String {
    "http://localhost:11434".to_string()
}
fn default_model() -> String {
    "llama3.2".to_string()
}
fn default_timeout_secs() -> u64 {
    120
}
fn default_health_timeout_secs() -> u64 {
    5
}
fn default_temperature() -> f32 {
    0.3
}
fn default_start_wait_secs() -> u64 {
    5
}

#[derive(Debug, Deserialize, Clone)]
pub struct SelectionConfig {
    /// Folder scanned when no explicit files are given.
    #[serde(default)]
    pub directory: Option<PathBuf>,
    /// Keep only files whose name contains today's `YYMMDD` stamp.
    #[serde(default = "default_true")]
    pub auto_detect_today: bool,
}

impl Default for SelectionConfig {
    fn default() -> Self {
        Self {
            directory: None,
            auto_detect_today: true,
        }
    }
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Deserialize, Clone)]
pub struct OutputConfig {
    #[serde(default = "default_output_dir")]
    pub directory: PathBuf,
    #[serde(default = "default_summary_label")]
    pub summary_label: String,
    #[serde(default = "default_thanks_label")]
    pub thanks_label: String,
    #[serde(default = "default_summary_title")]
    pub summary_title: String,
    #[serde(default = "default_thanks_title")]
    pub thanks_title: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            directory: default_output_dir(),
            summary_label: default_summary_label(),
            thanks_label: default_thanks_label(),
            summary_title: default_summary_title(),
            thanks_title: default_thanks_title(),
        }
    }
}

fn default_output_dir() -> PathBuf {
    PathBuf::from(".")
}
fn default_summary_label() -> String {
    "summary".to_string()
}
fn default_thanks_label() -> String {
    "thanks".to_string()
}
fn default_summary_title() -> String {
    "Team Work Summary".to_string()
}
fn default_thanks_title() -> String {
    "Thank-You Notes".to_string()
}

/// Overrides for the built-in prompt templates. `None` keeps the default.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct PromptsConfig {
    pub system: Option<String>,
    pub summary: Option<String>,
    pub thanks: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    #[serde(default = "default_log_file")]
    pub file: PathBuf,
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            file: default_log_file(),
            level: default_log_level(),
        }
    }
}

fn default_log_file() -> PathBuf {
    PathBuf::from("workflow.log")
}
fn default_log_level() -> String {
    "info".to_string()
}

/// Loads and validates `path`. A missing file is not an error: defaults apply.
pub fn load_config(path: &Path) -> Result<Config> {
    if !path.exists() {
        return Ok(Config::default());
    }

    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;

    validate(&config)?;
    Ok(config)
}

pub fn validate(config: &Config) -> Result<()> {
    let ollama = &config.ollama;
    if !ollama.base_url.starts_with("http://") && !ollama.base_url.starts_with("https://") {
        bail!(
            "ollama.base_url must start with http:// or https://, got '{}'",
            ollama.base_url
        );
    }
    if ollama.model.trim().is_empty() {
        bail!("ollama.model must not be empty");
    }
    if ollama.timeout_secs == 0 {
        bail!("ollama.timeout_secs must be > 0");
    }
    if ollama.health_timeout_secs == 0 {
        bail!("ollama.health_timeout_secs must be > 0");
    }
    if !(0.0..=2.0).contains(&ollama.temperature) {
        bail!("ollama.temperature must be in [0.0, 2.0]");
    }

    for (key, label) in [
        ("output.summary_label", &config.output.summary_label),
        ("output.thanks_label", &config.output.thanks_label),
    ] {
        if label.trim().is_empty() {
            bail!("{} must not be empty", key);
        }
        if label.contains('/') || label.contains('\\') {
            bail!("{} must not contain path separators: '{}'", key, label);
        }
    }

    for (key, template) in [
        ("prompts.summary", &config.prompts.summary),
        ("prompts.thanks", &config.prompts.thanks),
    ] {
        // A blank override falls back to the built-in template.
        if let Some(t) = template.as_deref().filter(|t| !t.trim().is_empty()) {
            if !t.contains(DOCUMENTS_PLACEHOLDER) {
                bail!("{} must contain the {} placeholder", key, DOCUMENTS_PLACEHOLDER);
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_uses_defaults() {
        let cfg = load_config(Path::new("/nonexistent/worklog.toml")).unwrap();
        assert_eq!(cfg.ollama.base_url, "http://localhost:11434");
        assert_eq!(cfg.ollama.model, "llama3.2");
        assert_eq!(cfg.ollama.timeout_secs, 120);
        assert!(cfg.selection.auto_detect_today);
        assert_eq!(cfg.output.summary_label, "summary");
        assert_eq!(cfg.logging.file, PathBuf::from("workflow.log"));
    }

    #[test]
    fn partial_file_fills_defaults() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("worklog.toml");
        std::fs::write(
            &path,
            "[ollama]\nmodel = \"qwen2.5\"\n\n[selection]\nauto_detect_today = false\n",
        )
        .unwrap();
        let cfg = load_config(&path).unwrap();
        assert_eq!(cfg.ollama.model, "qwen2.5");
        assert_eq!(cfg.ollama.health_timeout_secs, 5);
        assert!(!cfg.selection.auto_detect_today);
    }

    #[test]
    fn rejects_bad_values() {
        let mut cfg = Config::default();
        cfg.ollama.base_url = "localhost:11434".to_string();
        assert!(validate(&cfg).is_err());

        let mut cfg = Config::default();
        cfg.ollama.timeout_secs = 0;
        assert!(validate(&cfg).is_err());

        let mut cfg = Config::default();
        cfg.output.thanks_label = "../thanks".to_string();
        assert!(validate(&cfg).is_err());

        let mut cfg = Config::default();
        cfg.prompts.summary = Some("Summarize please".to_string());
        assert!(validate(&cfg).is_err());
    }

    #[test]
    fn accepts_prompt_override_with_placeholder() {
        let mut cfg = Config::default();
        cfg.prompts.thanks = Some("Thank everyone:\n{documents}".to_string());
        assert!(validate(&cfg).is_ok());
    }

    #[test]
    fn blank_prompt_override_uses_default() {
        let mut cfg = Config::default();
        cfg.prompts.summary = Some("  \n".to_string());
        assert!(validate(&cfg).is_ok());

        let prompts = crate::prompts::PromptSet::from_config(&cfg.prompts);
        assert_eq!(prompts.summary, crate::prompts::PromptSet::default().summary);
    }
}
