//! The thenable contract and a few ready-made thenables.
//!
//! A [`Thenable`] is anything that accepts a pair of settlement handlers
//! through [`Thenable::then`]. Whether those handlers fire *during* the
//! `then` call or *after* it returned is exactly what the compliance tracker
//! classifies.
//!
//! - [`thenable_fn`] - Build a thenable from a closure
//! - [`Immediate`] - Settles inline, during `then`
//! - [`FailingThenable`] - `then` itself fails
//! - [`Promise`] - Settles on a [`MicrotaskQueue`], never inline
//!
//! Return values are inspected through [`AsThenable`]. Plain data answers
//! `None` and is never classified.
//!
//! # Example
//!
//! ```rust
//! use testkit_compliance::thenable::{thenable_fn, AsThenable, Thenable};
//!
//! // Resolves synchronously, like `{ then: resolve => resolve('x') }`.
//! let inline = thenable_fn(|resolve, _reject| {
//!     resolve();
//!     Ok(())
//! });
//!
//! assert!(inline.as_thenable().is_some());
//! assert!(42_u32.as_thenable().is_none());
//! ```

mod microtask;
mod promise;

use std::fmt;
use std::sync::Arc;

use crate::error::{Error, Result};

pub use microtask::{Job, MicrotaskQueue};
pub use promise::{Promise, Resolver};

/// A settlement handler handed to [`Thenable::then`].
pub type Settle = Box<dyn FnOnce() + Send + 'static>;

/// The minimal contract for participating in promise-style chaining.
pub trait Thenable: Send + Sync {
    /// Register settlement handlers.
    ///
    /// Implementations may call one of the handlers before returning
    /// (synchronous settlement) or keep them and call one later.
    ///
    /// # Errors
    ///
    /// Returns an error if the handlers could not be registered.
    fn then(&self, on_fulfilled: Settle, on_rejected: Settle) -> Result<()>;
}

/// Probe used to tell thenables apart from plain values.
pub trait AsThenable {
    /// Returns the thenable view of this value, if it has one.
    fn as_thenable(&self) -> Option<&dyn Thenable>;
}

macro_rules! impl_plain_value {
    ($($ty:ty),* $(,)?) => {
        $(
            impl AsThenable for $ty {
                fn as_thenable(&self) -> Option<&dyn Thenable> {
                    None
                }
            }
        )*
    };
}

impl_plain_value!(
    (),
    bool,
    char,
    u8,
    u16,
    u32,
    u64,
    u128,
    usize,
    i8,
    i16,
    i32,
    i64,
    i128,
    isize,
    f32,
    f64,
    str,
    String,
);

impl<T> AsThenable for Vec<T> {
    fn as_thenable(&self) -> Option<&dyn Thenable> {
        None
    }
}

impl<T: AsThenable> AsThenable for Option<T> {
    fn as_thenable(&self) -> Option<&dyn Thenable> {
        self.as_ref().and_then(AsThenable::as_thenable)
    }
}

impl<T: AsThenable + ?Sized> AsThenable for &T {
    fn as_thenable(&self) -> Option<&dyn Thenable> {
        (**self).as_thenable()
    }
}

impl AsThenable for Box<dyn Thenable> {
    fn as_thenable(&self) -> Option<&dyn Thenable> {
        Some(self.as_ref())
    }
}

impl AsThenable for Arc<dyn Thenable> {
    fn as_thenable(&self) -> Option<&dyn Thenable> {
        Some(self.as_ref())
    }
}

/// A thenable backed by a closure receiving both handlers.
///
/// Created with [`thenable_fn`].
#[derive(Clone)]
pub struct FnThenable<F> {
    then: F,
}

/// Build a thenable from a closure.
///
/// The closure receives `(on_fulfilled, on_rejected)` and decides when, if
/// ever, to call one of them.
///
/// # Example
///
/// ```rust
/// use testkit_compliance::thenable::{thenable_fn, MicrotaskQueue};
///
/// let queue = MicrotaskQueue::new();
/// let q = queue.clone();
///
/// // Resolves on the next microtask.
/// let deferred = thenable_fn(move |resolve, _reject| {
///     q.enqueue(resolve);
///     Ok(())
/// });
/// # let _ = deferred;
/// ```
pub fn thenable_fn<F>(then: F) -> FnThenable<F>
where
    F: Fn(Settle, Settle) -> Result<()> + Send + Sync,
{
    FnThenable { then }
}

impl<F> Thenable for FnThenable<F>
where
    F: Fn(Settle, Settle) -> Result<()> + Send + Sync,
{
    fn then(&self, on_fulfilled: Settle, on_rejected: Settle) -> Result<()> {
        (self.then)(on_fulfilled, on_rejected)
    }
}

impl<F> AsThenable for FnThenable<F>
where
    F: Fn(Settle, Settle) -> Result<()> + Send + Sync,
{
    fn as_thenable(&self) -> Option<&dyn Thenable> {
        Some(self)
    }
}

impl<F> fmt::Debug for FnThenable<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnThenable").finish_non_exhaustive()
    }
}

/// A thenable that settles during `then`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Immediate {
    /// Calls the fulfillment handler inline.
    Fulfilled,
    /// Calls the rejection handler inline.
    Rejected,
}

impl Immediate {
    /// A thenable that fulfills inline.
    #[must_use]
    pub fn fulfilled() -> Self {
        Self::Fulfilled
    }

    /// A thenable that rejects inline.
    #[must_use]
    pub fn rejected() -> Self {
        Self::Rejected
    }
}

impl Thenable for Immediate {
    fn then(&self, on_fulfilled: Settle, on_rejected: Settle) -> Result<()> {
        match self {
            Self::Fulfilled => on_fulfilled(),
            Self::Rejected => on_rejected(),
        }
        Ok(())
    }
}

impl AsThenable for Immediate {
    fn as_thenable(&self) -> Option<&dyn Thenable> {
        Some(self)
    }
}

/// A thenable whose `then` fails without registering anything.
#[derive(Clone, Debug)]
pub struct FailingThenable {
    message: String,
}

impl FailingThenable {
    /// Create a thenable whose `then` fails with `message`.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl Thenable for FailingThenable {
    fn then(&self, _on_fulfilled: Settle, _on_rejected: Settle) -> Result<()> {
        Err(Error::then_failed(self.message.clone()))
    }
}

impl AsThenable for FailingThenable {
    fn as_thenable(&self) -> Option<&dyn Thenable> {
        Some(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counting(counter: &Arc<AtomicUsize>) -> Settle {
        let counter = Arc::clone(counter);
        Box::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        })
    }

    #[test]
    fn test_plain_values_are_not_thenable() {
        assert!(123_i32.as_thenable().is_none());
        assert!("text".as_thenable().is_none());
        assert!(String::from("text").as_thenable().is_none());
        assert!(().as_thenable().is_none());
        assert!(vec![1, 2, 3].as_thenable().is_none());
        assert!(None::<Immediate>.as_thenable().is_none());
    }

    #[test]
    fn test_option_delegates_to_inner_value() {
        assert!(Some(Immediate::fulfilled()).as_thenable().is_some());
        assert!(Some(5_u8).as_thenable().is_none());
    }

    #[test]
    fn test_immediate_settles_inline() {
        let fulfilled = Arc::new(AtomicUsize::new(0));
        let rejected = Arc::new(AtomicUsize::new(0));

        Immediate::fulfilled()
            .then(counting(&fulfilled), counting(&rejected))
            .unwrap();
        Immediate::rejected()
            .then(counting(&fulfilled), counting(&rejected))
            .unwrap();

        assert_eq!(fulfilled.load(Ordering::SeqCst), 1);
        assert_eq!(rejected.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_failing_thenable() {
        let calls = Arc::new(AtomicUsize::new(0));
        let err = FailingThenable::new("no handlers")
            .then(counting(&calls), counting(&calls))
            .unwrap_err();

        assert_eq!(err, Error::ThenFailed("no handlers".into()));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_boxed_thenable() {
        let boxed: Box<dyn Thenable> = Box::new(thenable_fn(|resolve, _| {
            resolve();
            Ok(())
        }));
        assert!(boxed.as_thenable().is_some());

        let shared: Arc<dyn Thenable> = Arc::new(Immediate::rejected());
        assert!(shared.as_thenable().is_some());
    }
}
