//! Template tiers for chat prompts: the model's embedded template, then an
//! engine built-in, then the mechanical fallback.

use ember_abi::{ChatMessage, InferenceEngine};
use tracing::{debug, warn};

use super::mechanical;
use super::prompt::{AssembledPrompt, TemplateSource};

/// Built-in preferred over the others when the engine ships it.
pub const PREFERRED_BUILTIN: &str = "chatml";

/// Render with the model's own template. `None` when the model has none or
/// rendering produced nothing.
pub(super) fn embedded<E: InferenceEngine>(
    engine: &E,
    model: &E::Model,
    messages: &[ChatMessage],
) -> Option<AssembledPrompt> {
    let tmpl = engine.chat_template(model)?;
    match engine.apply_chat_template(&tmpl, messages, true) {
        Ok(text) if !text.is_empty() => Some(AssembledPrompt::new(text, TemplateSource::Embedded)),
        Ok(_) => {
            debug!("embedded chat template rendered nothing");
            None
        }
        Err(e) => {
            warn!(error = %e, "embedded chat template failed");
            None
        }
    }
}

/// `chatml` if listed, otherwise the first built-in.
pub fn pick_builtin(names: &[String]) -> Option<&str> {
    names
        .iter()
        .find(|n| n.as_str() == PREFERRED_BUILTIN)
        .or_else(|| names.first())
        .map(String::as_str)
}

pub(super) fn builtin<E: InferenceEngine>(
    engine: &E,
    messages: &[ChatMessage],
) -> Option<AssembledPrompt> {
    let names = engine.builtin_templates();
    let name = pick_builtin(&names)?;
    match engine.apply_chat_template(name, messages, true) {
        Ok(text) if !text.is_empty() => Some(AssembledPrompt::new(
            text,
            TemplateSource::Builtin(name.to_string()),
        )),
        Ok(_) => {
            debug!(template = name, "built-in chat template rendered nothing");
            None
        }
        Err(e) => {
            warn!(template = name, error = %e, "built-in chat template failed");
            None
        }
    }
}

pub(super) fn fallback(messages: &[ChatMessage]) -> AssembledPrompt {
    AssembledPrompt::new(mechanical::render(messages), TemplateSource::Mechanical)
}
