//! Prompt templates
//!
//! `.pmt` files rendered with Handlebars. Lookup order:
//! 1. `<config_dir>/tripscout/prompts/{name}.pmt` (user override)
//! 2. Embedded copy compiled into the binary

pub mod embedded;
mod loader;

pub use loader::PromptLoader;
