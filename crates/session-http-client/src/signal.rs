//! Single-slot "session is unrecoverable" callback.
//!
//! The slot is owned by the composition root and handed to both the HTTP
//! client, which fires it, and the auth state machine, which installs its
//! handler on mount and removes it on unmount.

use parking_lot::Mutex;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::debug;

type Handler = Arc<dyn Fn() + Send + Sync>;

/// Proof of ownership of the slot, returned by [`UnauthorizedSignal::set`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HandlerToken(u64);

#[derive(Clone, Default)]
pub struct UnauthorizedSignal {
    slot: Arc<Mutex<Option<(HandlerToken, Handler)>>>,
    next_token: Arc<AtomicU64>,
}

impl fmt::Debug for UnauthorizedSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UnauthorizedSignal")
            .field("is_set", &self.is_set())
            .finish()
    }
}

impl UnauthorizedSignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install `handler`, replacing any previous one.
    pub fn set<F>(&self, handler: F) -> HandlerToken
    where
        F: Fn() + Send + Sync + 'static,
    {
        let token = HandlerToken(self.next_token.fetch_add(1, Ordering::Relaxed));
        *self.slot.lock() = Some((token, Arc::new(handler)));
        token
    }

    /// Clear the slot only if `token` still owns it.
    pub fn clear_if(&self, token: HandlerToken) -> bool {
        let mut slot = self.slot.lock();
        match slot.as_ref() {
            Some((current, _)) if *current == token => {
                *slot = None;
                true
            }
            _ => false,
        }
    }

    pub fn clear(&self) {
        *self.slot.lock() = None;
    }

    pub fn is_set(&self) -> bool {
        self.slot.lock().is_some()
    }

    /// Invoke the handler, if any. Returns whether one ran.
    ///
    /// The handler runs outside the lock, so it may itself call `set` or
    /// `clear`.
    pub fn fire(&self) -> bool {
        let handler = self.slot.lock().as_ref().map(|(_, h)| h.clone());
        match handler {
            Some(handler) => {
                debug!("Invoking unauthorized handler");
                handler();
                true
            }
            None => {
                debug!("Session unrecoverable, no unauthorized handler registered");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    fn counter() -> (Arc<AtomicUsize>, impl Fn() + Send + Sync + 'static) {
        let count = Arc::new(AtomicUsize::new(0));
        let inner = count.clone();
        (count, move || {
            inner.fetch_add(1, Ordering::SeqCst);
        })
    }

    #[test]
    fn test_fire_without_handler() {
        let signal = UnauthorizedSignal::new();
        assert!(!signal.is_set());
        assert!(!signal.fire());
    }

    #[test]
    fn test_fire_invokes_handler_once_per_call() {
        let signal = UnauthorizedSignal::new();
        let (count, handler) = counter();
        signal.set(handler);

        assert!(signal.fire());
        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert!(signal.fire());
        assert_eq!(count.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_set_replaces_previous_handler() {
        let signal = UnauthorizedSignal::new();
        let (first, h1) = counter();
        let (second, h2) = counter();
        signal.set(h1);
        signal.set(h2);

        signal.fire();
        assert_eq!(first.load(Ordering::SeqCst), 0);
        assert_eq!(second.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_clear_if_respects_ownership() {
        let signal = UnauthorizedSignal::new();
        let (_, h1) = counter();
        let (_, h2) = counter();
        let stale = signal.set(h1);
        let current = signal.set(h2);

        assert!(!signal.clear_if(stale));
        assert!(signal.is_set());
        assert!(signal.clear_if(current));
        assert!(!signal.is_set());
        assert!(!signal.clear_if(current));
    }

    #[test]
    fn test_clones_share_the_slot() {
        let signal = UnauthorizedSignal::new();
        let emitter = signal.clone();
        let (count, handler) = counter();
        signal.set(handler);

        assert!(emitter.fire());
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_handler_may_clear_slot() {
        let signal = UnauthorizedSignal::new();
        let inner = signal.clone();
        signal.set(move || inner.clear());

        assert!(signal.fire());
        assert!(!signal.is_set());
    }
}
