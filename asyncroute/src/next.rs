//! The continuation a stage calls when it is done.

use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::oneshot;

use crate::error::Error;

/// What a stage asked the dispatcher to do next.
#[derive(Debug, Clone, PartialEq)]
pub enum Signal {
    /// Run the next matching stage.
    Proceed,
    /// Skip to the error-handling stages with this error.
    Fail(Error),
}

/// Receiving end kept by the dispatcher.
///
/// Resolves to an error when every clone of the [`Next`] was dropped without
/// signalling, which ends the chain at that stage.
pub type Signalled = oneshot::Receiver<Signal>;

type Slot = Arc<Mutex<Option<oneshot::Sender<Signal>>>>;

/// Continuation ("next") for one stage of a chain.
///
/// Clones share one slot and only the first signal counts; later signals are
/// logged and dropped. A no-op continuation accepts signals and discards them.
#[derive(Clone)]
pub struct Next {
    slot: Option<Slot>,
}

impl Next {
    /// Creates a continuation and the receiver its signal arrives on.
    pub fn channel() -> (Self, Signalled) {
        let (sender, signalled) = oneshot::channel();
        let next = Self {
            slot: Some(Arc::new(Mutex::new(Some(sender)))),
        };
        (next, signalled)
    }

    /// A continuation that discards every signal.
    pub fn noop() -> Self {
        Self { slot: None }
    }

    pub fn is_noop(&self) -> bool {
        self.slot.is_none()
    }

    /// Hands control to the next stage.
    pub fn proceed(&self) {
        self.signal(Signal::Proceed);
    }

    /// Hands control to the error-handling stages.
    pub fn fail(&self, err: impl Into<Error>) {
        self.signal(Signal::Fail(err.into()));
    }

    /// Delivers `signal`, returning whether this was the first one.
    pub fn signal(&self, signal: Signal) -> bool {
        let Some(slot) = &self.slot else {
            return false;
        };
        let sender = slot.lock().unwrap_or_else(PoisonError::into_inner).take();
        match sender {
            Some(sender) => {
                // the dispatcher may already be gone if the request ended
                let _ = sender.send(signal);
                true
            }
            None => {
                tracing::warn!(?signal, "continuation invoked more than once; signal ignored");
                false
            }
        }
    }

    /// Whether a signal has already been delivered through this continuation.
    pub fn is_spent(&self) -> bool {
        match &self.slot {
            Some(slot) => slot.lock().unwrap_or_else(PoisonError::into_inner).is_none(),
            None => false,
        }
    }
}

impl Default for Next {
    fn default() -> Self {
        Self::noop()
    }
}

impl fmt::Debug for Next {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Next")
            .field("noop", &self.is_noop())
            .field("spent", &self.is_spent())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_proceed_is_delivered() {
        let (next, signalled) = Next::channel();
        next.proceed();
        assert_eq!(signalled.await.unwrap(), Signal::Proceed);
    }

    #[tokio::test]
    async fn test_fail_carries_error() {
        let (next, signalled) = Next::channel();
        next.fail(Error::internal("Oops!"));
        assert_eq!(
            signalled.await.unwrap(),
            Signal::Fail(Error::internal("Oops!"))
        );
    }

    #[tokio::test]
    async fn test_only_first_signal_counts() {
        let (next, signalled) = Next::channel();
        let clone = next.clone();

        assert!(next.signal(Signal::Proceed));
        assert!(!clone.signal(Signal::Fail(Error::internal("late"))));
        assert!(clone.is_spent());
        assert_eq!(signalled.await.unwrap(), Signal::Proceed);
    }

    #[tokio::test]
    async fn test_dropping_all_clones_closes_channel() {
        let (next, signalled) = Next::channel();
        let clone = next.clone();
        drop(next);
        drop(clone);
        assert!(signalled.await.is_err());
    }

    #[test]
    fn test_noop_discards_signals() {
        let next = Next::noop();
        assert!(next.is_noop());
        assert!(!next.signal(Signal::Proceed));
        next.fail(Error::internal("ignored"));
        assert!(!next.is_spent());
    }
}
