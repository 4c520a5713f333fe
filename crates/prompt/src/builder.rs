//! Prompt builder: renders the question and numbered contexts.

use crate::types::{BuiltPrompt, PromptContext, PromptDefinition, REFUSAL_SENTENCE};
use docqa_core::{AppError, AppResult};
use handlebars::Handlebars;
use serde::Serialize;

#[derive(Serialize)]
struct AnswerVariables<'a> {
    question: &'a str,
    refusal: &'a str,
    contexts: &'a [PromptContext],
}

/// Build the generation prompt for a question and its contexts.
///
/// `question` may already carry a conversation-memory block. Contexts are
/// rendered in the given order; their `index` is the citation number the
/// generator uses for `source_index`.
///
/// # Example
/// ```no_run
/// use docqa_prompt::{build_answer_prompt, default_answer_prompt, PromptContext};
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let contexts = vec![PromptContext {
///     index: 1,
///     doc: "2021_telehealth_review.pdf".to_string(),
///     page: 4,
///     text: "Licensure rules limit cross-state care.".to_string(),
/// }];
/// let built = build_answer_prompt(&default_answer_prompt(), "What limits telehealth?", &contexts)?;
/// println!("{}", built.user);
/// # Ok(())
/// # }
/// ```
pub fn build_answer_prompt(
    definition: &PromptDefinition,
    question: &str,
    contexts: &[PromptContext],
) -> AppResult<BuiltPrompt> {
    tracing::debug!(
        prompt = %definition.id,
        contexts = contexts.len(),
        "Building answer prompt"
    );

    let variables = AnswerVariables {
        question,
        refusal: REFUSAL_SENTENCE,
        contexts,
    };

    let rendered = render_template(&definition.template, &variables)?;

    Ok(BuiltPrompt::new(
        rendered.trim().to_string(),
        definition.output.format.eq_ignore_ascii_case("json"),
        definition.id.clone(),
        contexts.len(),
    ))
}

/// Render a Handlebars template against serializable data.
fn render_template<T: Serialize>(template: &str, data: &T) -> AppResult<String> {
    let mut handlebars = Handlebars::new();

    // Prompts are plain text
    handlebars.register_escape_fn(handlebars::no_escape);

    handlebars
        .register_template_string("prompt", template)
        .map_err(|e| AppError::Prompt(format!("Failed to register template: {}", e)))?;

    handlebars
        .render("prompt", data)
        .map_err(|e| AppError::Prompt(format!("Failed to render template: {}", e)))
}
