//! llama.cpp behind the ember [`InferenceEngine`] trait.

pub mod context;
mod ffi;
pub mod model;
pub mod sampler;

use std::path::Path;

use ember_abi::{
    ChatMessage, ContextParams, EngineError, InferenceEngine, ModelParams, SamplerChain, Token,
    TokenizeFlags,
};
use tracing::info;

pub use context::LlamaContext;
pub use model::LlamaModel;
pub use sampler::LlamaSampler;

/// Stateless entry point; all state lives in the handles it returns.
#[derive(Debug, Clone, Copy, Default)]
pub struct LlamaEngine;

impl LlamaEngine {
    pub fn new() -> Self {
        Self
    }
}

impl InferenceEngine for LlamaEngine {
    type Model = LlamaModel;
    type Context = LlamaContext;
    type Sampler = LlamaSampler;

    fn init_backend(&self) {
        ffi::init_backend();
    }

    fn load_model(&self, path: &Path, params: &ModelParams) -> Result<LlamaModel, EngineError> {
        let model = LlamaModel::load(path, params)?;
        info!(path = %model.path().display(), gpu_layers = params.gpu_layers, "llama model loaded");
        Ok(model)
    }

    fn create_context(
        &self,
        model: &LlamaModel,
        params: &ContextParams,
    ) -> Result<LlamaContext, EngineError> {
        LlamaContext::new(model, params)
    }

    fn tokenize(
        &self,
        model: &LlamaModel,
        text: &str,
        flags: TokenizeFlags,
    ) -> Result<Vec<Token>, EngineError> {
        ffi::tokenize(model.raw(), text, flags)
    }

    fn decode(&self, ctx: &mut LlamaContext, tokens: &[Token]) -> Result<(), EngineError> {
        ffi::decode(ctx.raw(), tokens)
    }

    fn clear_cache(&self, ctx: &mut LlamaContext) {
        ffi::clear_memory(ctx.raw());
    }

    fn build_sampler(
        &self,
        _model: &LlamaModel,
        chain: &SamplerChain,
    ) -> Result<LlamaSampler, EngineError> {
        LlamaSampler::new(chain)
    }

    fn sample(
        &self,
        sampler: &mut LlamaSampler,
        ctx: &mut LlamaContext,
    ) -> Result<Token, EngineError> {
        ffi::sample(sampler.raw(), ctx.raw())
    }

    fn is_end_of_generation(&self, model: &LlamaModel, token: Token) -> bool {
        ffi::is_eog(model.raw(), token)
    }

    fn token_to_piece(&self, model: &LlamaModel, token: Token) -> Result<Vec<u8>, EngineError> {
        ffi::token_to_piece(model.raw(), token)
    }

    fn chat_template(&self, model: &LlamaModel) -> Option<String> {
        ffi::model_chat_template(model.raw())
    }

    fn builtin_templates(&self) -> Vec<String> {
        ffi::builtin_templates()
    }

    fn apply_chat_template(
        &self,
        template: &str,
        messages: &[ChatMessage],
        add_assistant: bool,
    ) -> Result<String, EngineError> {
        ffi::apply_chat_template(template, messages, add_assistant)
    }
}
