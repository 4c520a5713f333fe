//! Prompt types for docqa.

use serde::{Deserialize, Serialize};

/// The fixed answer returned whenever no grounded answer can be produced.
pub const REFUSAL_SENTENCE: &str = "I don't know based on the provided documents.";

/// A prompt definition loaded from YAML.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptDefinition {
    /// Unique prompt identifier
    pub id: String,

    /// Human-readable title
    pub title: String,

    /// API version for schema evolution
    #[serde(rename = "apiVersion")]
    pub api_version: String,

    /// Creator identifier
    #[serde(rename = "createdBy", default)]
    pub created_by: String,

    /// Template string with Handlebars syntax.
    ///
    /// Variables: `question`, `refusal`, and `contexts` (each with
    /// `index`, `doc`, `page`, `text`).
    pub template: String,

    /// Output specification
    pub output: PromptOutputSpec,
}

/// Output specification for the prompt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptOutputSpec {
    /// Output format the generator is asked for (e.g., "json")
    pub format: String,
}

/// One retrieved passage as shown to the generator.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PromptContext {
    /// 1-based citation index
    pub index: usize,
    pub doc: String,
    pub page: u32,
    pub text: String,
}

/// A fully built prompt ready for generation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuiltPrompt {
    /// User message
    pub user: String,

    /// Whether the definition asks for JSON output
    #[serde(rename = "jsonOutput")]
    pub json_output: bool,

    /// Metadata about the built prompt
    pub metadata: BuiltPromptMetadata,
}

/// Metadata about a built prompt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuiltPromptMetadata {
    /// Source prompt ID
    #[serde(rename = "sourcePromptId")]
    pub source_prompt_id: String,

    /// Number of contexts rendered into the prompt
    #[serde(rename = "contextCount")]
    pub context_count: usize,
}

impl BuiltPrompt {
    /// Create a new built prompt.
    pub fn new(user: String, json_output: bool, source_prompt_id: String, context_count: usize) -> Self {
        Self {
            user,
            json_output,
            metadata: BuiltPromptMetadata {
                source_prompt_id,
                context_count,
            },
        }
    }
}
