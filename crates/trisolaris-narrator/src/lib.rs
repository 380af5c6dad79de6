//! LLM-backed report text for sanity collapse and extinction events.
//!
//! Implements [`trisolaris_core::NarrativeProvider`] over an
//! OpenAI-compatible or Anthropic backend, with an offline mode that makes
//! every session fall back to its built-in messages.
//!
//! # Modules
//!
//! - [`narrator`] -- Backend enum, HTTP calls, and the factory.
//! - [`prompt`] -- Built-in `minijinja` templates and sampling parameters.
//! - [`error`] -- Narrator error type.

pub mod error;
pub mod narrator;
pub mod prompt;

pub use error::NarratorError;
pub use narrator::{AnthropicNarrator, Narrator, OpenAiNarrator, create_narrator};
pub use prompt::{RenderedPrompt, ReportPrompts, Sampling};
