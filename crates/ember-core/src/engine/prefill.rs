use ember_abi::{GenerationParams, InferenceEngine, Token, TokenizeFlags};
use tracing::{debug, warn};

use super::session::Session;
use super::utils::prompt_window;
use crate::error::{EmberError, Result};
use crate::sampling::build_chain;

/// What prefill did to the prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) struct PrefillStats {
    /// Tokens actually evaluated.
    pub evaluated: usize,
    /// Leading tokens dropped to fit the window.
    pub truncated: usize,
}

impl<E: InferenceEngine> Session<E> {
    /// Reset per-request state, then evaluate the prompt as one batch.
    pub(super) fn prefill(
        &mut self,
        engine: &E,
        text: &str,
        params: &GenerationParams,
    ) -> Result<PrefillStats> {
        // Only sequence 0 exists; stale cache from the last request would
        // otherwise leak into this one.
        engine.clear_cache(&mut self.context);

        self.sampler = None;
        let chain = build_chain(params);
        let sampler = engine
            .build_sampler(&self.model, &chain)
            .map_err(|source| EmberError::SamplerInit { source })?;
        self.sampler = Some(sampler);
        debug!(stages = chain.len(), "sampler chain rebuilt");

        let tokens = engine
            .tokenize(&self.model, text, TokenizeFlags::PROMPT)
            .map_err(|e| EmberError::TokenizationFailed(e.to_string()))?;
        if tokens.is_empty() {
            return Err(EmberError::TokenizationFailed(
                "prompt produced no tokens".into(),
            ));
        }

        let window = prompt_window(self.config.context_tokens, params.max_tokens);
        let (tokens, truncated): (&[Token], usize) = if tokens.len() > window {
            let cut = tokens.len() - window;
            warn!(
                prompt_tokens = tokens.len(),
                kept = window,
                "prompt exceeds window; keeping the tail"
            );
            (&tokens[cut..], cut)
        } else {
            (&tokens[..], 0)
        };

        engine
            .decode(&mut self.context, tokens)
            .map_err(|source| EmberError::DecodeFailed { source })?;
        debug!(tokens = tokens.len(), "prefill done");

        Ok(PrefillStats {
            evaluated: tokens.len(),
            truncated,
        })
    }
}
