//! A minimal promise that always settles its handlers asynchronously.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll, Waker};

use parking_lot::Mutex;

use super::{AsThenable, MicrotaskQueue, Settle, Thenable};
use crate::error::{Error, Result};

/// A promise whose settlement handlers run on a [`MicrotaskQueue`].
///
/// Handlers registered through [`Thenable::then`] are never called inline,
/// even when the promise is already settled, so promises always classify as
/// compliant. A promise can also be awaited; awaiting yields the settled
/// value or [`Error::Rejected`].
///
/// Clones observe the same settlement.
///
/// # Example
///
/// ```rust
/// use testkit_compliance::thenable::{MicrotaskQueue, Promise};
///
/// let queue = MicrotaskQueue::new();
/// let (promise, resolver) = Promise::<u32>::pending(&queue);
///
/// assert!(promise.is_pending());
/// resolver.resolve(7);
///
/// assert_eq!(futures::executor::block_on(promise), Ok(7));
/// ```
pub struct Promise<T> {
    shared: Arc<Shared<T>>,
}

/// Settles the [`Promise`] it was created with.
///
/// Dropping a resolver without settling leaves the promise pending forever.
pub struct Resolver<T> {
    shared: Arc<Shared<T>>,
}

struct Shared<T> {
    state: Mutex<PromiseState<T>>,
    queue: MicrotaskQueue,
}

enum PromiseState<T> {
    Pending {
        reactions: Vec<Reaction>,
        wakers: Vec<Waker>,
    },
    Fulfilled(T),
    Rejected(String),
}

struct Reaction {
    on_fulfilled: Settle,
    on_rejected: Settle,
}

impl<T> Promise<T> {
    /// Creates a pending promise and its resolver.
    #[must_use]
    pub fn pending(queue: &MicrotaskQueue) -> (Self, Resolver<T>) {
        let shared = Arc::new(Shared {
            state: Mutex::new(PromiseState::Pending {
                reactions: Vec::new(),
                wakers: Vec::new(),
            }),
            queue: queue.clone(),
        });
        (
            Self {
                shared: Arc::clone(&shared),
            },
            Resolver { shared },
        )
    }

    /// Creates an already fulfilled promise.
    #[must_use]
    pub fn resolved(queue: &MicrotaskQueue, value: T) -> Self {
        Self::settled(queue, PromiseState::Fulfilled(value))
    }

    /// Creates an already rejected promise.
    #[must_use]
    pub fn rejected(queue: &MicrotaskQueue, reason: impl Into<String>) -> Self {
        Self::settled(queue, PromiseState::Rejected(reason.into()))
    }

    fn settled(queue: &MicrotaskQueue, state: PromiseState<T>) -> Self {
        Self {
            shared: Arc::new(Shared {
                state: Mutex::new(state),
                queue: queue.clone(),
            }),
        }
    }

    /// Returns true while the promise is neither fulfilled nor rejected.
    #[must_use]
    pub fn is_pending(&self) -> bool {
        matches!(*self.shared.state.lock(), PromiseState::Pending { .. })
    }

    /// Returns true once the promise is fulfilled or rejected.
    #[must_use]
    pub fn is_settled(&self) -> bool {
        !self.is_pending()
    }
}

impl<T> Resolver<T> {
    /// Fulfills the promise with `value`.
    pub fn resolve(self, value: T) {
        self.settle(PromiseState::Fulfilled(value));
    }

    /// Rejects the promise with `reason`.
    pub fn reject(self, reason: impl Into<String>) {
        self.settle(PromiseState::Rejected(reason.into()));
    }

    fn settle(self, outcome: PromiseState<T>) {
        let fulfilled = matches!(outcome, PromiseState::Fulfilled(_));
        let previous = std::mem::replace(&mut *self.shared.state.lock(), outcome);

        if let PromiseState::Pending { reactions, wakers } = previous {
            for reaction in reactions {
                let handler = if fulfilled {
                    reaction.on_fulfilled
                } else {
                    reaction.on_rejected
                };
                self.shared.queue.enqueue(handler);
            }
            for waker in wakers {
                waker.wake();
            }
        }
    }
}

impl<T> Clone for Promise<T> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<T: Send> Thenable for Promise<T> {
    fn then(&self, on_fulfilled: Settle, on_rejected: Settle) -> Result<()> {
        let mut state = self.shared.state.lock();
        match &mut *state {
            PromiseState::Pending { reactions, .. } => reactions.push(Reaction {
                on_fulfilled,
                on_rejected,
            }),
            PromiseState::Fulfilled(_) => self.shared.queue.enqueue(on_fulfilled),
            PromiseState::Rejected(_) => self.shared.queue.enqueue(on_rejected),
        }
        Ok(())
    }
}

impl<T: Send> AsThenable for Promise<T> {
    fn as_thenable(&self) -> Option<&dyn Thenable> {
        Some(self)
    }
}

impl<T: Clone> Future for Promise<T> {
    type Output = Result<T>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let mut state = self.shared.state.lock();
        match &mut *state {
            PromiseState::Pending { wakers, .. } => {
                if !wakers.iter().any(|w| w.will_wake(cx.waker())) {
                    wakers.push(cx.waker().clone());
                }
                Poll::Pending
            }
            PromiseState::Fulfilled(value) => Poll::Ready(Ok(value.clone())),
            PromiseState::Rejected(reason) => Poll::Ready(Err(Error::rejected(reason.clone()))),
        }
    }
}

impl<T> fmt::Debug for Promise<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = match &*self.shared.state.lock() {
            PromiseState::Pending { .. } => "pending",
            PromiseState::Fulfilled(_) => "fulfilled",
            PromiseState::Rejected(_) => "rejected",
        };
        f.debug_struct("Promise").field("state", &state).finish()
    }
}

impl<T> fmt::Debug for Resolver<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Resolver").finish_non_exhaustive()
    }
}
