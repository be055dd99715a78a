use std::path::{Path, PathBuf};
use std::ptr::NonNull;

use ember_abi::{EngineError, ModelParams};
use llama_cpp_sys_2::llama_model;

use crate::ffi;

/// Owned `llama_model*`; freed on drop.
pub struct LlamaModel {
    raw: NonNull<llama_model>,
    path: PathBuf,
}

impl LlamaModel {
    pub fn load(path: &Path, params: &ModelParams) -> Result<Self, EngineError> {
        let raw = ffi::load_model(path, params)?;
        Ok(Self {
            raw,
            path: path.to_path_buf(),
        })
    }

    #[inline]
    pub(crate) fn raw(&self) -> NonNull<llama_model> {
        self.raw
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for LlamaModel {
    fn drop(&mut self) {
        unsafe { ffi::free_model(self.raw) };
    }
}

// SAFETY: a loaded llama_model is read-only; llama.cpp allows sharing it
// across threads.
unsafe impl Send for LlamaModel {}
unsafe impl Sync for LlamaModel {}
