//! Session lifecycle and generation around an [`InferenceEngine`].

use ember_abi::{EngineError, GenerationParams, InferenceEngine};
use serde::{Deserialize, Serialize};
use tracing::{error, info};

use crate::cancel::CancelSignal;
use crate::config::SessionConfig;
use crate::error::{EmberError, Result};
use crate::format::{self, PromptInput, TemplateSource};
use crate::logging::preview;

mod decode;
mod prefill;
mod session;
mod utils;

use session::Session;

const PROMPT_PREVIEW_CHARS: usize = 100;

/// A prompt plus the knobs to generate from it.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
    pub prompt: PromptInput,
    pub params: GenerationParams,
}

impl GenerationRequest {
    pub fn new<P: Into<PromptInput>>(prompt: P, params: GenerationParams) -> Self {
        Self {
            prompt: prompt.into(),
            params,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    EndOfGeneration,
    MaxTokens,
    Cancelled,
    /// A token could not be sampled or evaluated mid-stream; text is partial.
    DecodeError,
}

/// Result of a request that got past prefill. Every stop reason carries the
/// text produced up to that point.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationOutcome {
    pub text: String,
    pub stop_reason: StopReason,
    pub generated_tokens: u32,
    pub prompt_tokens: usize,
    pub truncated_tokens: usize,
    pub template: TemplateSource,
}

/// Owns the engine and at most one loaded session.
pub struct SessionManager<E: InferenceEngine> {
    engine: E,
    session: Option<Session<E>>,
    cancel: CancelSignal,
    last_error: Option<String>,
}

impl<E: InferenceEngine> SessionManager<E> {
    pub fn new(engine: E) -> Self {
        Self {
            engine,
            session: None,
            cancel: CancelSignal::new(),
            last_error: None,
        }
    }

    /// Replace any loaded session with a fresh one built from `config`.
    pub fn load(&mut self, config: SessionConfig) -> Result<()> {
        self.unload();
        let res = self.open(config);
        self.record(res)
    }

    /// Load only when `config` differs from the active session's.
    pub fn ensure_loaded(&mut self, config: SessionConfig) -> Result<()> {
        if self.config() == Some(&config) {
            self.last_error = None;
            return Ok(());
        }
        self.load(config)
    }

    fn open(&mut self, config: SessionConfig) -> Result<()> {
        let path = config.model_path.clone();
        if !path.is_file() {
            return Err(EmberError::ModelLoadFailed {
                path,
                source: EngineError::ModelLoad("no such file".into()),
            });
        }

        self.engine.init_backend();

        let model = self
            .engine
            .load_model(&path, &config.model_params())
            .map_err(|source| EmberError::ModelLoadFailed {
                path: path.clone(),
                source,
            })?;

        let context = match self.engine.create_context(&model, &config.context_params()) {
            Ok(ctx) => ctx,
            Err(source) => {
                drop(model);
                return Err(EmberError::ContextCreationFailed { source });
            }
        };

        info!(
            path = %path.display(),
            threads = config.threads,
            n_ctx = config.context_tokens,
            "model loaded"
        );
        self.session = Some(Session::new(model, context, config));
        Ok(())
    }

    /// True while a model and its context are held.
    pub fn is_loaded(&self) -> bool {
        self.session.is_some()
    }

    /// Release the session if there is one. Safe to call repeatedly; clears
    /// the last error.
    pub fn unload(&mut self) {
        self.last_error = None;
        if let Some(session) = self.session.take() {
            let path = session.config().model_path.display().to_string();
            session.release();
            info!(%path, "model unloaded");
        }
    }

    pub fn config(&self) -> Option<&SessionConfig> {
        self.session.as_ref().map(Session::config)
    }

    /// Ask the running generation to stop after the current token.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Handle for cancelling from a thread that cannot reach the manager.
    pub fn cancel_handle(&self) -> CancelSignal {
        self.cancel.clone()
    }

    /// Diagnostic text of the last failed `load` / `generate`, cleared by the
    /// next successful call.
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Run one request to completion on the calling thread.
    ///
    /// Errors are structural (nothing loaded, bad chat input, tokenization
    /// or prefill failure); every stop after prefill is an `Ok` outcome.
    pub fn generate(&mut self, request: &GenerationRequest) -> Result<GenerationOutcome> {
        self.cancel.reset();
        let res = self.run(request);
        self.record(res)
    }

    fn run(&mut self, request: &GenerationRequest) -> Result<GenerationOutcome> {
        let session = self.session.as_mut().ok_or(EmberError::NotLoaded)?;
        let params = request.params.normalized();

        let prompt = format::assemble(&self.engine, &session.model, &request.prompt)?;
        info!(
            source = ?prompt.source,
            max_tokens = params.max_tokens,
            temperature = params.temperature,
            top_p = params.top_p,
            top_k = params.top_k,
            repeat_penalty = params.repeat_penalty,
            prompt = preview(&prompt.text, PROMPT_PREVIEW_CHARS),
            "generation started"
        );

        let stats = session.prefill(&self.engine, &prompt.text, &params)?;
        let decoded = session.decode_loop(&self.engine, &params, &self.cancel);

        info!(
            stop = ?decoded.stop_reason,
            generated = decoded.generated,
            prompt_tokens = stats.evaluated,
            truncated = stats.truncated,
            "generation finished"
        );

        Ok(GenerationOutcome {
            text: decoded.text,
            stop_reason: decoded.stop_reason,
            generated_tokens: decoded.generated,
            prompt_tokens: stats.evaluated,
            truncated_tokens: stats.truncated,
            template: prompt.source,
        })
    }

    fn record<T>(&mut self, res: Result<T>) -> Result<T> {
        match &res {
            Ok(_) => self.last_error = None,
            Err(e) => {
                let detail = e.detail();
                error!(kind = ?e.kind(), error = %detail, "request failed");
                self.last_error = Some(detail);
            }
        }
        res
    }
}

impl<E: InferenceEngine> Drop for SessionManager<E> {
    fn drop(&mut self) {
        self.unload();
    }
}
