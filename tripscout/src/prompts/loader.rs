//! Prompt Loader
//!
//! Loads prompt templates from the override directory or falls back to the
//! embedded defaults.

use std::path::PathBuf;

use eyre::{Result, eyre};
use handlebars::Handlebars;
use serde::Serialize;
use tracing::debug;

use super::embedded;

/// Loads and renders prompt templates
pub struct PromptLoader {
    hbs: Handlebars<'static>,
    /// User override directory (`<config_dir>/tripscout/prompts/`)
    user_dir: Option<PathBuf>,
}

impl PromptLoader {
    /// Loader that honours the per-user override directory when it exists
    pub fn new() -> Self {
        let user_dir = dirs::config_dir().map(|dir| dir.join("tripscout").join("prompts"));
        debug!(?user_dir, "PromptLoader::new: called");
        Self::with_dir(user_dir.filter(|dir| dir.is_dir()))
    }

    /// Loader with an explicit override directory
    pub fn with_dir(user_dir: Option<PathBuf>) -> Self {
        debug!(?user_dir, "PromptLoader::with_dir: called");
        let mut hbs = Handlebars::new();
        // templates carry JSON and free text, not HTML
        hbs.register_escape_fn(handlebars::no_escape);
        Self { hbs, user_dir }
    }

    /// Loader that only uses embedded prompts (for testing)
    pub fn embedded_only() -> Self {
        debug!("PromptLoader::embedded_only: called");
        Self::with_dir(None)
    }

    /// Load a template by name: user override first, then embedded
    fn load_template(&self, name: &str) -> Result<String> {
        debug!(%name, "PromptLoader::load_template: called");
        if let Some(ref user_dir) = self.user_dir {
            let path = user_dir.join(format!("{}.pmt", name));
            if path.exists() {
                debug!(?path, "PromptLoader::load_template: found in user override");
                return std::fs::read_to_string(&path)
                    .map_err(|e| eyre!("Failed to read user prompt {}: {}", path.display(), e));
            }
            debug!(?path, "PromptLoader::load_template: not found in user override");
        }

        embedded::get_embedded(name)
            .map(str::to_string)
            .ok_or_else(|| eyre!("Prompt template not found: {}", name))
    }

    /// Render a template with the given context
    pub fn render<T: Serialize>(&self, template_name: &str, context: &T) -> Result<String> {
        debug!(%template_name, "PromptLoader::render: called");
        let template = self.load_template(template_name)?;
        self.hbs
            .render_template(&template, context)
            .map_err(|e| eyre!("Failed to render template {}: {}", template_name, e))
    }
}

impl Default for PromptLoader {
    fn default() -> Self {
        Self::new()
    }
}
