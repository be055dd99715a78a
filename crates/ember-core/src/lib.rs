//! Ember core: drives one local inference session through load, prompt
//! assembly, sampling and the decode loop, and tears it down in order.

pub mod cancel;
pub mod config;
pub mod engine;
pub mod error;
pub mod format;
pub mod logging;
pub mod sampling;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use cancel::CancelSignal;
pub use config::SessionConfig;
pub use engine::{GenerationOutcome, GenerationRequest, SessionManager, StopReason};
pub use error::{EmberError, ErrorKind, Result};
pub use format::{AssembledPrompt, PromptInput, TemplateSource};
