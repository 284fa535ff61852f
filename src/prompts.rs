//! Prompt templates for the two generation stages.
//!
//! Templates are plain text with a single `{documents}` placeholder that
//! receives the combined work-log text. Each can be overridden under
//! `[prompts]` in the config file.

use crate::config::PromptsConfig;

pub const DOCUMENTS_PLACEHOLDER: &str = "{documents}";

pub const DEFAULT_SYSTEM: &str = "You are an assistant for a software team lead. \
You read the daily work logs written by team members and produce clear, factual, \
well-structured documents. Do not invent tasks that are not in the logs.";

pub const DEFAULT_SUMMARY: &str = "Below are today's work logs from each team member, \
one section per file.\n\n\
Write a consolidated meeting summary:\n\
1. Start with a two or three sentence overview of the team's day.\n\
2. Then list each team member with their completed work, work in progress, and blockers.\n\
3. End with shared issues or follow-ups that need the team's attention.\n\
Use short headings and bullet points.\n\n\
Work logs:\n{documents}";

pub const DEFAULT_THANKS: &str = "Below are today's work logs from each team member, \
one section per file.\n\n\
For every team member, write a short personalized thank-you message (two to four \
sentences) that names the specific work they did today and why it mattered. \
Start each message with the member's name on its own line.\n\n\
Work logs:\n{documents}";

/// The effective set of templates for a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptSet {
    pub system: String,
    pub summary: String,
    pub thanks: String,
}

impl Default for PromptSet {
    fn default() -> Self {
        Self {
            system: DEFAULT_SYSTEM.to_string(),
            summary: DEFAULT_SUMMARY.to_string(),
            thanks: DEFAULT_THANKS.to_string(),
        }
    }
}

impl PromptSet {
    /// Applies config overrides; blank overrides fall back to the defaults.
    pub fn from_config(config: &PromptsConfig) -> Self {
        fn pick(over: &Option<String>, default: &str) -> String {
            match over {
                Some(s) if !s.trim().is_empty() => s.clone(),
                _ => default.to_string(),
            }
        }
        Self {
            system: pick(&config.system, DEFAULT_SYSTEM),
            summary: pick(&config.summary, DEFAULT_SUMMARY),
            thanks: pick(&config.thanks, DEFAULT_THANKS),
        }
    }

    pub fn summary_prompt(&self, documents: &str) -> String {
        self.summary.replace(DOCUMENTS_PLACEHOLDER, documents)
    }

    pub fn thanks_prompt(&self, documents: &str) -> String {
        self.thanks.replace(DOCUMENTS_PLACEHOLDER, documents)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_embed_documents() {
        let prompts = PromptSet::default();
        let text = "Member A: finished project\nMember B: code review";
        let summary = prompts.summary_prompt(text);
        assert!(summary.contains("meeting summary"));
        assert!(summary.contains(text));
        assert!(!summary.contains(DOCUMENTS_PLACEHOLDER));

        let thanks = prompts.thanks_prompt(text);
        assert!(thanks.contains("thank-you"));
        assert!(thanks.contains(text));
    }

    #[test]
    fn overrides_replace_defaults() {
        let cfg = PromptsConfig {
            system: Some("  ".to_string()),
            summary: Some("S: {documents}".to_string()),
            thanks: None,
        };
        let prompts = PromptSet::from_config(&cfg);
        assert_eq!(prompts.system, DEFAULT_SYSTEM);
        assert_eq!(prompts.summary_prompt("x"), "S: x");
        assert_eq!(prompts.thanks, DEFAULT_THANKS);
    }
}
