//! Text-generation collaborators
//!
//! Turns a free-text request into [`SearchParams`](crate::domain::SearchParams)
//! and writes the listing, places and area-review reports. Each call is a
//! fresh single-turn completion.

use std::sync::Arc;

use thiserror::Error;

use crate::llm::{LlmClient, LlmError};
use crate::prompts::PromptLoader;

mod extract;
mod report;

pub use report::truncate_chars;

/// Errors from an assistant call
#[derive(Debug, Error)]
pub enum AssistantError {
    #[error("Completion failed: {0}")]
    Llm(#[from] LlmError),

    #[error("Prompt error: {0}")]
    Prompt(String),

    #[error("Empty reply from the model")]
    EmptyReply,

    #[error("Reply is not a JSON object: {0}")]
    Unparseable(String),

    #[error("Reply names no location")]
    NoLocation,
}

impl From<eyre::Report> for AssistantError {
    fn from(report: eyre::Report) -> Self {
        AssistantError::Prompt(report.to_string())
    }
}

pub struct Assistant {
    llm: Arc<dyn LlmClient>,
    prompts: PromptLoader,
    default_location: String,
}

impl Assistant {
    pub fn new(llm: Arc<dyn LlmClient>, prompts: PromptLoader, default_location: impl Into<String>) -> Self {
        Self {
            llm,
            prompts,
            default_location: default_location.into(),
        }
    }

    /// Location used when extraction yields nothing
    pub fn default_location(&self) -> &str {
        &self.default_location
    }
}
