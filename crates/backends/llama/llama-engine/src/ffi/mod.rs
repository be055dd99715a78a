//! Thin wrappers over `llama-cpp-sys-2`. All `unsafe` lives below this
//! module; the rest of the crate works with the RAII handles.

pub mod context;
pub mod runtime;
pub mod sampling;

pub use context::*;
pub use runtime::*;
pub use sampling::*;
