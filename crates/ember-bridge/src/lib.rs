//! Flat boundary over one process-wide [`SessionManager`].
//!
//! Every operation collapses to `bool` or a (possibly empty) string, the
//! shape a managed caller marshals easily. Failure detail is kept for
//! [`Bridge::last_error`].

pub mod marshal;

#[cfg(feature = "llama")]
pub mod exports;

use std::sync::{Mutex, MutexGuard, PoisonError};

use ember_abi::{GenerationParams, InferenceEngine};
use ember_core::{CancelSignal, GenerationRequest, PromptInput, SessionConfig, SessionManager};
use tracing::{debug, warn};

/// Caller-facing sampling arguments with the boundary clamps applied.
pub fn params_from_args(
    max_tokens: i32,
    temperature: f32,
    top_p: f32,
    top_k: i32,
    repeat_penalty: f32,
) -> GenerationParams {
    GenerationParams {
        max_tokens: max_tokens.max(0) as u32,
        temperature,
        top_p,
        top_k,
        repeat_penalty,
    }
}

pub struct Bridge<E: InferenceEngine> {
    manager: Mutex<SessionManager<E>>,
    cancel: CancelSignal,
    /// Copy of the manager's last error taken after each call, plus failures
    /// raised before the manager is reached. Readable while a generation
    /// holds the manager.
    last_error: Mutex<Option<String>>,
}

impl<E: InferenceEngine> Bridge<E> {
    pub fn new(engine: E) -> Self {
        ember_core::logging::init();
        let manager = SessionManager::new(engine);
        let cancel = manager.cancel_handle();
        Self {
            manager: Mutex::new(manager),
            cancel,
            last_error: Mutex::new(None),
        }
    }

    /// Load (replacing any current model). `threads <= 0` means all logical
    /// CPUs; `context_tokens <= 0` means 2048.
    pub fn load_model(&self, path: &str, threads: i32, context_tokens: i32) -> bool {
        let config = SessionConfig::new(path, threads, context_tokens);
        self.with_manager(|m| m.load(config).is_ok())
    }

    pub fn generate(
        &self,
        prompt: &str,
        max_tokens: i32,
        temperature: f32,
        top_p: f32,
        top_k: i32,
        repeat_penalty: f32,
    ) -> String {
        let params = params_from_args(max_tokens, temperature, top_p, top_k, repeat_penalty);
        self.run(Ok(PromptInput::raw(prompt)), params)
    }

    /// `roles` and `contents` must be non-empty and of equal length.
    #[allow(clippy::too_many_arguments)]
    pub fn generate_chat<R, C>(
        &self,
        roles: &[R],
        contents: &[C],
        max_tokens: i32,
        temperature: f32,
        top_p: f32,
        top_k: i32,
        repeat_penalty: f32,
    ) -> String
    where
        R: AsRef<str>,
        C: AsRef<str>,
    {
        let params = params_from_args(max_tokens, temperature, top_p, top_k, repeat_penalty);
        let input = PromptInput::chat_from_parts(
            roles.iter().map(|r| r.as_ref()),
            contents.iter().map(|c| c.as_ref()),
        );
        self.run(input, params)
    }

    /// Never blocks on the session lock.
    pub fn cancel_generation(&self) {
        debug!("cancel requested");
        self.cancel.cancel();
    }

    pub fn unload_model(&self) {
        self.with_manager(|m| m.unload());
    }

    /// Waits for an in-flight generation to finish.
    pub fn is_loaded(&self) -> bool {
        self.lock_manager().is_loaded()
    }

    /// Detail of the most recent failure, empty when the last call succeeded.
    pub fn last_error(&self) -> String {
        self.last_error
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
            .unwrap_or_default()
    }

    /// Record a failure raised outside the manager (bad arguments, panics).
    pub fn note_error(&self, msg: impl Into<String>) {
        let msg = msg.into();
        warn!(error = %msg, "boundary call failed");
        self.publish(Some(msg));
    }

    fn run(&self, input: ember_core::Result<PromptInput>, params: GenerationParams) -> String {
        let prompt = match input {
            Ok(prompt) => prompt,
            Err(e) => {
                self.note_error(e.detail());
                return String::new();
            }
        };
        let request = GenerationRequest { prompt, params };
        self.with_manager(|m| m.generate(&request))
            .map(|o| o.text)
            .unwrap_or_default()
    }

    /// Run `f` on the manager, then mirror its error slot.
    fn with_manager<T>(&self, f: impl FnOnce(&mut SessionManager<E>) -> T) -> T {
        let mut guard = self.lock_manager();
        let out = f(&mut guard);
        self.publish(guard.last_error().map(str::to_owned));
        out
    }

    /// A panic mid-call leaves the session in an unknown state: drop it and
    /// carry on with an empty manager.
    fn lock_manager(&self) -> MutexGuard<'_, SessionManager<E>> {
        match self.manager.lock() {
            Ok(guard) => guard,
            Err(poisoned) => {
                warn!("session lock poisoned by an earlier panic; releasing the session");
                let mut guard = poisoned.into_inner();
                guard.unload();
                self.manager.clear_poison();
                guard
            }
        }
    }

    fn publish(&self, err: Option<String>) {
        let mut slot = self
            .last_error
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        *slot = err;
    }
}
