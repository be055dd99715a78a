use std::path::Path;

use crate::chat::ChatMessage;
use crate::error::EngineError;
use crate::sampling::SamplerChain;
use crate::token::{Token, TokenizeFlags};

/// Model-load knobs. Ember is CPU-only, so offload stays at zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModelParams {
    pub gpu_layers: i32,
    pub use_mmap: bool,
}

impl ModelParams {
    pub const fn cpu_only() -> Self {
        Self {
            gpu_layers: 0,
            use_mmap: true,
        }
    }
}

impl Default for ModelParams {
    fn default() -> Self {
        Self::cpu_only()
    }
}

/// Inference-context knobs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContextParams {
    /// Context window in tokens.
    pub n_ctx: u32,
    /// Largest batch one `decode` call may submit.
    pub n_batch: u32,
    /// Threads for single-token decode.
    pub n_threads: i32,
    /// Threads for batch (prompt) evaluation.
    pub n_threads_batch: i32,
}

/// Capability interface over a token-level inference engine.
///
/// Handles are owned values: dropping a `Model`, `Context` or `Sampler`
/// releases the native resource. A `Context` must not outlive the `Model` it
/// was created from; callers keep both in one owner and drop the context
/// first.
pub trait InferenceEngine {
    type Model;
    type Context;
    type Sampler;

    /// Process-wide backend setup. Must be safe to call repeatedly.
    fn init_backend(&self);

    fn load_model(&self, path: &Path, params: &ModelParams) -> Result<Self::Model, EngineError>;

    fn create_context(
        &self,
        model: &Self::Model,
        params: &ContextParams,
    ) -> Result<Self::Context, EngineError>;

    fn tokenize(
        &self,
        model: &Self::Model,
        text: &str,
        flags: TokenizeFlags,
    ) -> Result<Vec<Token>, EngineError>;

    /// Evaluate `tokens` as one batch, appended after whatever the context
    /// already holds for sequence 0.
    fn decode(&self, ctx: &mut Self::Context, tokens: &[Token]) -> Result<(), EngineError>;

    /// Drop all cached key/value state for sequence 0.
    fn clear_cache(&self, ctx: &mut Self::Context);

    /// Materialise a sampler pipeline, applying stages in order.
    fn build_sampler(
        &self,
        model: &Self::Model,
        chain: &SamplerChain,
    ) -> Result<Self::Sampler, EngineError>;

    /// Draw the next token from the logits of the last evaluated position.
    fn sample(
        &self,
        sampler: &mut Self::Sampler,
        ctx: &mut Self::Context,
    ) -> Result<Token, EngineError>;

    /// End-of-generation check (EOS, EOT and friends are model specific).
    fn is_end_of_generation(&self, model: &Self::Model, token: Token) -> bool;

    /// Raw bytes of one token. A piece may hold an incomplete UTF-8 sequence.
    fn token_to_piece(&self, model: &Self::Model, token: Token) -> Result<Vec<u8>, EngineError>;

    /// The chat template embedded in the model file, if any.
    fn chat_template(&self, model: &Self::Model) -> Option<String>;

    /// Names of the templates the engine ships with, in engine order.
    fn builtin_templates(&self) -> Vec<String> {
        Vec::new()
    }

    /// Render `messages` with `template` (template source or built-in name).
    /// An empty `Ok` means the engine produced nothing.
    fn apply_chat_template(
        &self,
        template: &str,
        messages: &[ChatMessage],
        add_assistant: bool,
    ) -> Result<String, EngineError>;
}
