// Allow must_use_candidate since spy methods often have useful side effects
#![allow(clippy::must_use_candidate)]

//! Spies following the fluent fake convention.
//!
//! # Example
//!
//! ```rust
//! use testkit_compliance::mock::FluentSpy;
//!
//! let spy = FluentSpy::<i32, i32>::new();
//! assert_eq!(spy.call(5), 0);
//!
//! spy.and().call_fake(|x| x * 2);
//! assert_eq!(spy.call(5), 10);
//!
//! assert_eq!(spy.call_count(), 2);
//! assert!(spy.was_called_with(&5));
//! ```

use std::fmt::Debug;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use super::{ComplianceSlot, Fake, SettableFake};

/// A record of a single call.
#[derive(Debug, Clone)]
pub struct CallRecord<A> {
    /// The arguments passed to the call.
    pub args: A,
    /// When the call was made (relative to spy creation).
    pub timestamp: Duration,
}

/// A spy configured through a fluent strategy, `spy.and().call_fake(f)`.
///
/// An unconfigured spy returns `R::default()`. Clones share calls, strategy
/// and compliance slot.
pub struct FluentSpy<A, R> {
    shared: Arc<FluentShared<A, R>>,
}

struct FluentShared<A, R> {
    strategy: Mutex<Option<Fake<A, R>>>,
    calls: Mutex<Vec<CallRecord<A>>>,
    call_count: AtomicUsize,
    created_at: Instant,
    slot: ComplianceSlot,
}

/// Strategy handle returned by [`FluentSpy::and`].
pub struct SpyStrategy<'a, A, R> {
    spy: &'a FluentSpy<A, R>,
}

impl<A, R> FluentSpy<A, R> {
    /// Create a new spy with the default stub strategy.
    pub fn new() -> Self {
        Self {
            shared: Arc::new(FluentShared {
                strategy: Mutex::new(None),
                calls: Mutex::new(Vec::new()),
                call_count: AtomicUsize::new(0),
                created_at: Instant::now(),
                slot: ComplianceSlot::new(),
            }),
        }
    }

    /// Access the spy's strategy.
    pub fn and(&self) -> SpyStrategy<'_, A, R> {
        SpyStrategy { spy: self }
    }

    /// Get the number of times the spy was called.
    #[must_use]
    pub fn call_count(&self) -> usize {
        self.shared.call_count.load(Ordering::SeqCst)
    }

    /// Check if the spy was called at least once.
    #[must_use]
    pub fn was_called(&self) -> bool {
        self.call_count() > 0
    }

    /// Check if the spy was called exactly N times.
    #[must_use]
    pub fn was_called_times(&self, n: usize) -> bool {
        self.call_count() == n
    }

    /// Reset the call history. The strategy is kept.
    pub fn reset(&self) {
        self.shared.calls.lock().clear();
        self.shared.call_count.store(0, Ordering::SeqCst);
    }

    fn replace_strategy(&self, fake: Option<Fake<A, R>>) {
        *self.shared.strategy.lock() = fake;
    }
}

impl<A: Clone, R> FluentSpy<A, R> {
    /// Get all recorded calls.
    pub fn calls(&self) -> Vec<CallRecord<A>> {
        self.shared.calls.lock().clone()
    }

    /// Get the most recent call record.
    pub fn last_call(&self) -> Option<CallRecord<A>> {
        self.shared.calls.lock().last().cloned()
    }

    /// Check if called with a specific argument.
    pub fn was_called_with(&self, expected: &A) -> bool
    where
        A: PartialEq,
    {
        self.shared.calls.lock().iter().any(|c| &c.args == expected)
    }
}

impl<A: Clone, R: Default> FluentSpy<A, R> {
    /// Call the spy, running the current strategy.
    pub fn call(&self, args: A) -> R {
        self.shared.calls.lock().push(CallRecord {
            args: args.clone(),
            timestamp: self.shared.created_at.elapsed(),
        });
        self.shared.call_count.fetch_add(1, Ordering::SeqCst);

        // Released before running the fake, which may call back into the spy.
        let fake = self.shared.strategy.lock().clone();
        match fake {
            Some(fake) => fake(args),
            None => R::default(),
        }
    }
}

impl<'a, A, R> SpyStrategy<'a, A, R> {
    /// Run `fake` on every call.
    pub fn call_fake<F>(self, fake: F) -> &'a FluentSpy<A, R>
    where
        F: Fn(A) -> R + Send + Sync + 'static,
    {
        self.spy.replace_strategy(Some(Arc::new(fake)));
        self.spy
    }

    /// Return a clone of `value` on every call.
    pub fn return_value(self, value: R) -> &'a FluentSpy<A, R>
    where
        R: Clone + Send + Sync + 'static,
    {
        self.call_fake(move |_| value.clone())
    }

    /// Go back to returning `R::default()`.
    pub fn stub(self) -> &'a FluentSpy<A, R> {
        self.spy.replace_strategy(None);
        self.spy
    }
}

impl<A: Clone, R: Default> SettableFake for FluentSpy<A, R> {
    type Args = A;
    type Output = R;

    fn set_fake(&self, fake: Fake<A, R>) {
        self.replace_strategy(Some(fake));
    }

    fn invoke(&self, args: A) -> R {
        self.call(args)
    }

    fn compliance_slot(&self) -> &ComplianceSlot {
        &self.shared.slot
    }
}

impl<A, R> Default for FluentSpy<A, R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<A, R> Clone for FluentSpy<A, R> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<A: Debug, R> Debug for FluentSpy<A, R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FluentSpy")
            .field("call_count", &self.call_count())
            .field("calls", &*self.shared.calls.lock())
            .field("faked", &self.shared.strategy.lock().is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spy_basic() {
        let spy = FluentSpy::<i32, i32>::new();

        assert!(!spy.was_called());
        assert_eq!(spy.call_count(), 0);

        assert_eq!(spy.call(5), 0);

        assert!(spy.was_called());
        assert_eq!(spy.call_count(), 1);
    }

    #[test]
    fn test_call_fake() {
        let spy = FluentSpy::new();
        spy.and().call_fake(|x: i32| x * x);

        assert_eq!(spy.call(3), 9);
        assert_eq!(spy.call(4), 16);
        assert!(spy.was_called_times(2));
    }

    #[test]
    fn test_return_value_and_stub() {
        let spy = FluentSpy::<(), String>::new();

        spy.and().return_value("fixed".to_string());
        assert_eq!(spy.call(()), "fixed");
        assert_eq!(spy.call(()), "fixed");

        spy.and().stub();
        assert_eq!(spy.call(()), "");
    }

    #[test]
    fn test_call_records() {
        let spy = FluentSpy::<&str, ()>::new();

        spy.call("a");
        spy.call("b");

        let calls = spy.calls();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].args, "a");
        assert_eq!(calls[1].args, "b");
        assert_eq!(spy.last_call().unwrap().args, "b");
        assert!(spy.was_called_with(&"a"));
        assert!(!spy.was_called_with(&"c"));
    }

    #[test]
    fn test_reset_keeps_strategy() {
        let spy = FluentSpy::new();
        spy.and().call_fake(|x: u8| x + 1);
        spy.call(1);

        spy.reset();

        assert_eq!(spy.call_count(), 0);
        assert!(spy.calls().is_empty());
        assert_eq!(spy.call(1), 2);
    }

    #[test]
    fn test_clone_shares_state() {
        let spy1 = FluentSpy::<i32, i32>::new();
        let spy2 = spy1.clone();

        spy2.and().call_fake(|x| -x);
        spy1.call(1);

        assert_eq!(spy2.call_count(), 1);
        assert_eq!(spy1.call(2), -2);
        assert!(std::ptr::eq(spy1.compliance_slot(), spy2.compliance_slot()));
    }

    #[test]
    fn test_fake_may_call_back_into_spy() {
        let spy = FluentSpy::<u32, u32>::new();
        let inner = spy.clone();
        spy.and()
            .call_fake(move |x| if x == 0 { 0 } else { inner.call(x - 1) + 1 });

        assert_eq!(spy.call(3), 3);
        assert_eq!(spy.call_count(), 4);
    }

    #[test]
    fn test_spy_debug() {
        let spy = FluentSpy::<i32, i32>::new();
        spy.call(42);

        let debug = format!("{:?}", spy);
        assert!(debug.contains("FluentSpy"));
        assert!(debug.contains("call_count"));
    }
}
