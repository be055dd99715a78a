use std::ptr::NonNull;

use ember_abi::{ContextParams, EngineError};
use llama_cpp_sys_2::llama_context;

use crate::ffi;
use crate::model::LlamaModel;

/// Owned `llama_context*`.
///
/// Does not borrow its model; the owner must drop the context first.
pub struct LlamaContext {
    raw: NonNull<llama_context>,
}

impl LlamaContext {
    pub fn new(model: &LlamaModel, params: &ContextParams) -> Result<Self, EngineError> {
        let raw = ffi::create_context(model.raw(), params)?;
        Ok(Self { raw })
    }

    #[inline]
    pub(crate) fn raw(&self) -> NonNull<llama_context> {
        self.raw
    }
}

impl Drop for LlamaContext {
    fn drop(&mut self) {
        unsafe { ffi::free_context(self.raw) };
    }
}

// SAFETY: only ever used from one thread at a time (`&mut` access).
unsafe impl Send for LlamaContext {}
