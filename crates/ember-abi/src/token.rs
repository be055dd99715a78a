use serde::{Deserialize, Serialize};
use std::fmt;

/// Vocabulary id produced by an engine's tokenizer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Token(pub i32);

impl From<i32> for Token {
    #[inline]
    fn from(value: i32) -> Self {
        Token(value)
    }
}

impl From<Token> for i32 {
    #[inline]
    fn from(token: Token) -> i32 {
        token.0
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Flags forwarded to the engine tokenizer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenizeFlags {
    /// Let the tokenizer add BOS/EOS as the model's vocabulary prescribes.
    pub add_special: bool,
    /// Parse control tokens (e.g. `<|im_start|>`) appearing in the text.
    pub parse_special: bool,
}

impl TokenizeFlags {
    /// What prompt prefill uses: specials added and parsed.
    pub const PROMPT: TokenizeFlags = TokenizeFlags {
        add_special: true,
        parse_special: true,
    };
}

impl Default for TokenizeFlags {
    fn default() -> Self {
        Self::PROMPT
    }
}
