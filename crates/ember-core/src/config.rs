//! Session configuration: model path, thread count and context window.

use std::path::{Path, PathBuf};

use ember_abi::{ContextParams, ModelParams};
use serde::{Deserialize, Serialize};

pub const DEFAULT_CONTEXT_TOKENS: u32 = 2048;

pub const ENV_THREADS: &str = "EMBER_THREADS";
pub const ENV_CONTEXT_TOKENS: &str = "EMBER_N_CTX";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionConfig {
    pub model_path: PathBuf,
    /// Worker threads for prompt evaluation and decode.
    pub threads: i32,
    /// Context window in tokens.
    pub context_tokens: u32,
}

impl SessionConfig {
    /// Build from raw caller values. Non-positive threads fall back to the
    /// number of logical CPUs; a non-positive window to
    /// [`DEFAULT_CONTEXT_TOKENS`].
    pub fn new<P: AsRef<Path>>(model_path: P, threads: i32, context_tokens: i32) -> Self {
        let threads = if threads > 0 {
            threads
        } else {
            default_threads()
        };
        let context_tokens = if context_tokens > 0 {
            context_tokens as u32
        } else {
            DEFAULT_CONTEXT_TOKENS
        };
        Self {
            model_path: model_path.as_ref().to_path_buf(),
            threads,
            context_tokens,
        }
    }

    /// Defaults overridden by `EMBER_THREADS` / `EMBER_N_CTX` when set and
    /// parseable.
    pub fn from_env<P: AsRef<Path>>(model_path: P) -> Self {
        let threads = std::env::var(ENV_THREADS)
            .ok()
            .and_then(|v| v.trim().parse::<i32>().ok())
            .unwrap_or(0);
        let context_tokens = std::env::var(ENV_CONTEXT_TOKENS)
            .ok()
            .and_then(|v| v.trim().parse::<i32>().ok())
            .unwrap_or(0);
        Self::new(model_path, threads, context_tokens)
    }

    pub fn model_params(&self) -> ModelParams {
        ModelParams::cpu_only()
    }

    /// One batch can hold the whole window, so a (truncated) prompt is
    /// always evaluated in a single decode call.
    pub fn context_params(&self) -> ContextParams {
        ContextParams {
            n_ctx: self.context_tokens,
            n_batch: self.context_tokens,
            n_threads: self.threads,
            n_threads_batch: self.threads,
        }
    }
}

fn default_threads() -> i32 {
    num_cpus::get().max(1) as i32
}
