//! Prompt system for docqa.
//!
//! - YAML prompt definitions with a built-in grounded-answer default
//! - Handlebars rendering of the question and numbered contexts
//! - The canonical refusal sentence shared by builder and validator

pub mod builder;
pub mod loader;
pub mod types;

// Re-export main types
pub use builder::build_answer_prompt;
pub use loader::{default_answer_prompt, load_prompt, load_prompt_or_default, ANSWER_PROMPT_ID};
pub use types::{BuiltPrompt, BuiltPromptMetadata, PromptContext, PromptDefinition, PromptOutputSpec, REFUSAL_SENTENCE};
