use ember_abi::{GenerationParams, InferenceEngine};
use tracing::{debug, warn};

use super::session::Session;
use super::utils::drain_complete_utf8;
use super::StopReason;
use crate::cancel::CancelSignal;

const PROGRESS_EVERY: u32 = 10;

pub(super) struct DecodeResult {
    pub text: String,
    pub stop_reason: StopReason,
    pub generated: u32,
}

impl<E: InferenceEngine> Session<E> {
    /// Sample, convert and feed back one token at a time until a stop
    /// condition. Never fails: mid-stream errors end the loop with whatever
    /// text was produced.
    pub(super) fn decode_loop(
        &mut self,
        engine: &E,
        params: &GenerationParams,
        cancel: &CancelSignal,
    ) -> DecodeResult {
        let mut text = String::new();
        let mut staging: Vec<u8> = Vec::with_capacity(16);
        let mut generated: u32 = 0;

        let Some(sampler) = self.sampler.as_mut() else {
            warn!("decode started without a sampler");
            return DecodeResult {
                text,
                stop_reason: StopReason::DecodeError,
                generated,
            };
        };

        let stop_reason = loop {
            if generated >= params.max_tokens {
                break StopReason::MaxTokens;
            }
            if cancel.is_cancelled() {
                debug!(generated, "cancel requested");
                break StopReason::Cancelled;
            }

            let token = match engine.sample(sampler, &mut self.context) {
                Ok(t) => t,
                Err(e) => {
                    warn!(error = %e, generated, "sampling failed");
                    break StopReason::DecodeError;
                }
            };

            if engine.is_end_of_generation(&self.model, token) {
                break StopReason::EndOfGeneration;
            }

            match engine.token_to_piece(&self.model, token) {
                Ok(bytes) => {
                    staging.extend_from_slice(&bytes);
                    drain_complete_utf8(&mut staging, &mut text);
                }
                Err(e) => debug!(%token, error = %e, "skipping fragment"),
            }

            if let Err(e) = engine.decode(&mut self.context, &[token]) {
                warn!(error = %e, generated, "token evaluation failed; returning partial text");
                break StopReason::DecodeError;
            }

            generated += 1;
            if generated % PROGRESS_EVERY == 0 {
                debug!(generated, max = params.max_tokens, "generation progress");
            }
        };

        if !staging.is_empty() {
            debug!(bytes = staging.len(), "discarding incomplete UTF-8 tail");
        }

        DecodeResult {
            text,
            stop_reason,
            generated,
        }
    }
}
