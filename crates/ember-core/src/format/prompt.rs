use ember_abi::ChatMessage;
use serde::Serialize;

use crate::error::{EmberError, Result};

/// What the caller asked to generate from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PromptInput {
    /// Used verbatim; special tokens are resolved by the tokenizer.
    Raw(String),
    /// Rendered through the template tiers.
    Chat(Vec<ChatMessage>),
}

impl PromptInput {
    pub fn raw<S: Into<String>>(text: S) -> Self {
        PromptInput::Raw(text.into())
    }

    /// Build a chat prompt from parallel role/content lists. Both must be
    /// non-empty and of equal length.
    pub fn chat_from_parts<R, C>(roles: R, contents: C) -> Result<Self>
    where
        R: IntoIterator,
        R::Item: Into<String>,
        R::IntoIter: ExactSizeIterator,
        C: IntoIterator,
        C::Item: Into<String>,
        C::IntoIter: ExactSizeIterator,
    {
        let roles = roles.into_iter();
        let contents = contents.into_iter();
        let (n_roles, n_contents) = (roles.len(), contents.len());
        let messages = ChatMessage::zip(roles, contents).ok_or_else(|| {
            EmberError::InvalidChatInput(format!(
                "{n_roles} roles but {n_contents} contents"
            ))
        })?;
        if messages.is_empty() {
            return Err(EmberError::InvalidChatInput("no messages".into()));
        }
        Ok(PromptInput::Chat(messages))
    }
}

impl From<&str> for PromptInput {
    fn from(s: &str) -> Self {
        PromptInput::Raw(s.to_string())
    }
}

impl From<Vec<ChatMessage>> for PromptInput {
    fn from(messages: Vec<ChatMessage>) -> Self {
        PromptInput::Chat(messages)
    }
}

/// Which tier produced the prompt text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "name", rename_all = "snake_case")]
pub enum TemplateSource {
    Raw,
    Embedded,
    Builtin(String),
    Mechanical,
}

/// Final prompt text ready for tokenization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssembledPrompt {
    pub text: String,
    pub source: TemplateSource,
}

impl AssembledPrompt {
    pub fn new<T: Into<String>>(text: T, source: TemplateSource) -> Self {
        Self {
            text: text.into(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chat_from_parts_rejects_mismatch_and_empty() {
        let e = PromptInput::chat_from_parts(["user"], Vec::<String>::new()).unwrap_err();
        assert!(matches!(e, EmberError::InvalidChatInput(_)));

        let e = PromptInput::chat_from_parts(Vec::<String>::new(), Vec::<String>::new())
            .unwrap_err();
        assert!(matches!(e, EmberError::InvalidChatInput(_)));
    }

    #[test]
    fn chat_from_parts_keeps_order() {
        let p = PromptInput::chat_from_parts(["system", "user"], ["s", "u"]).unwrap();
        assert_eq!(
            p,
            PromptInput::Chat(vec![ChatMessage::system("s"), ChatMessage::user("u")])
        );
    }
}
