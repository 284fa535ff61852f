//! # Worklog Digest
//!
//! Turns a day's worth of team work logs (PDF, DOCX, legacy DOC) into a
//! consolidated meeting summary and personalized thank-you notes, using a
//! local Ollama model.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────┐   ┌───────────┐   ┌─────────────────────────┐   ┌──────────┐
//! │ Selector │──▶│ Extractor │──▶│ Worker                  │──▶│  Output  │
//! │ YYMMDD   │   │ PDF/DOCX  │   │ summary ▶ thank-you     │   │  .docx   │
//! └──────────┘   └───────────┘   └───────────┬─────────────┘   └──────────┘
//!                                            │ events
//!                                            ▼
//!                                     ┌─────────────┐
//!                                     │ CLI progress│
//!                                     └─────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! worklog serve-check --start          # make sure Ollama is up
//! worklog select --dir ./logs          # files stamped with today's YYMMDD
//! worklog run --dir ./logs --save      # summarize and write both documents
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`error`] | Pipeline error taxonomy |
//! | [`extract`] | Text extraction from PDF and OOXML documents |
//! | [`logging`] | Tracing subscriber setup |
//! | [`models`] | Core data types and pipeline states |
//! | [`ollama`] | Ollama HTTP client and server management |
//! | [`output`] | DOCX generation |
//! | [`progress`] | Pipeline events and reporters |
//! | [`prompts`] | Prompt templates |
//! | [`selector`] | Date-based file selection |
//! | [`worker`] | Background pipeline orchestration |

pub mod config;
pub mod error;
pub mod extract;
pub mod logging;
pub mod models;
pub mod ollama;
pub mod output;
pub mod progress;
pub mod prompts;
pub mod selector;
pub mod worker;
