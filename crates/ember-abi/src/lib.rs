//! Ember ABI crate: stable contracts shared by the core, engine implementations
//! and the boundary adapter.

pub mod chat;
pub mod engine;
pub mod error;
pub mod ffi;
pub mod sampling;
pub mod token;

pub use chat::*;
pub use engine::*;
pub use error::*;
pub use sampling::*;
pub use token::*;
