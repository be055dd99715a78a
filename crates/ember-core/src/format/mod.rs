//! Turns a [`PromptInput`] into the exact text handed to the tokenizer.

mod mechanical;
mod prompt;
pub mod template;

use ember_abi::InferenceEngine;
use tracing::info;

use crate::error::{EmberError, Result};

pub use prompt::{AssembledPrompt, PromptInput, TemplateSource};

/// Raw text passes through; chat input takes the first template tier that
/// yields text.
pub fn assemble<E: InferenceEngine>(
    engine: &E,
    model: &E::Model,
    input: &PromptInput,
) -> Result<AssembledPrompt> {
    let messages = match input {
        PromptInput::Raw(text) => {
            return Ok(AssembledPrompt::new(text.clone(), TemplateSource::Raw));
        }
        PromptInput::Chat(messages) => messages,
    };
    if messages.is_empty() {
        return Err(EmberError::InvalidChatInput("no messages".into()));
    }

    let assembled = template::embedded(engine, model, messages)
        .or_else(|| template::builtin(engine, messages))
        .unwrap_or_else(|| template::fallback(messages));

    if assembled.text.is_empty() {
        return Err(EmberError::TemplateUnavailable);
    }

    info!(
        source = ?assembled.source,
        messages = messages.len(),
        chars = assembled.text.len(),
        "chat prompt assembled"
    );
    Ok(assembled)
}
