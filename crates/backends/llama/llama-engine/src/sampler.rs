use std::ptr::NonNull;

use ember_abi::{EngineError, SamplerChain};
use llama_cpp_sys_2::llama_sampler;

use crate::ffi;

/// Owned sampler chain.
pub struct LlamaSampler {
    raw: NonNull<llama_sampler>,
}

impl LlamaSampler {
    pub fn new(chain: &SamplerChain) -> Result<Self, EngineError> {
        Ok(Self {
            raw: ffi::build_chain(chain)?,
        })
    }

    #[inline]
    pub(crate) fn raw(&self) -> NonNull<llama_sampler> {
        self.raw
    }
}

impl Drop for LlamaSampler {
    fn drop(&mut self) {
        unsafe { ffi::free_chain(self.raw) };
    }
}

// SAFETY: only ever used from one thread at a time (`&mut` access).
unsafe impl Send for LlamaSampler {}
