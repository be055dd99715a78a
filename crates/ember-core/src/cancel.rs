//! Cooperative cancellation flag shared between the generation loop and
//! whichever thread wants to stop it.

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

/// Cloneable handle to one session's stop flag. Setting it is a one-shot
/// request: the decode loop checks it once per generated token, and every
/// new `generate` call resets it.
#[derive(Debug, Clone, Default)]
pub struct CancelSignal(Arc<AtomicBool>);

impl CancelSignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request a stop. Safe to call when nothing is generating.
    #[inline]
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    #[inline]
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    #[inline]
    pub(crate) fn reset(&self) {
        self.0.store(false, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_share_the_flag() {
        let a = CancelSignal::new();
        let b = a.clone();
        assert!(!b.is_cancelled());
        a.cancel();
        assert!(b.is_cancelled());
        b.reset();
        assert!(!a.is_cancelled());
    }

    #[test]
    fn visible_across_threads() {
        let sig = CancelSignal::new();
        let remote = sig.clone();
        std::thread::spawn(move || remote.cancel()).join().unwrap();
        assert!(sig.is_cancelled());
    }
}
