use ember_abi::InferenceEngine;

use crate::config::SessionConfig;

/// One loaded model plus its context and (after the first request) sampler.
///
/// Field order is drop order: the sampler goes first, then the context,
/// then the model the context was created from.
pub(crate) struct Session<E: InferenceEngine> {
    pub(super) sampler: Option<E::Sampler>,
    pub(super) context: E::Context,
    pub(super) model: E::Model,
    pub(super) config: SessionConfig,
}

impl<E: InferenceEngine> Session<E> {
    pub(super) fn new(model: E::Model, context: E::Context, config: SessionConfig) -> Self {
        Self {
            sampler: None,
            context,
            model,
            config,
        }
    }

    pub(super) fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Release handles in reverse acquisition order.
    pub(super) fn release(self) {
        let Session {
            sampler,
            context,
            model,
            ..
        } = self;
        drop(sampler);
        drop(context);
        drop(model);
    }
}
