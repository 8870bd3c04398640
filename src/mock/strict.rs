//! The strict async compliance decorator.

use std::fmt;
use std::sync::Arc;

use tracing::debug;

use super::{Fake, FluentSpy, MockFn, SettableFake};
use crate::compliance::{ComplianceTracker, Registry};
use crate::thenable::AsThenable;

/// A spy with strict async compliance tracking.
///
/// Owns the underlying spy plus its [`ComplianceTracker`]. Tracking is off
/// until [`enable_strict_async_compliance`] is called. From the first enable
/// on, fakes set through this wrapper are observing: every value they return
/// is classified before being handed back unchanged. Fakes set before the
/// first enable are left alone.
///
/// Installing twice on the same spy (or on clones of it) reuses one tracker.
///
/// # Example
///
/// ```rust
/// use testkit_compliance::compliance::Registry;
/// use testkit_compliance::mock::{MockFn, StrictSpy};
/// use testkit_compliance::thenable::{thenable_fn, Thenable};
///
/// let registry = Registry::new();
/// let spy = StrictSpy::install_in(MockFn::<(), Option<Box<dyn Thenable>>>::new(), &registry);
///
/// spy.enable_strict_async_compliance()
///     .mock_implementation(|()| {
///         // Settles while `then` is still running.
///         let inline: Box<dyn Thenable> = Box::new(thenable_fn(|resolve, _reject| {
///             resolve();
///             Ok(())
///         }));
///         Some(inline)
///     });
///
/// let _ = spy.call(());
/// assert_eq!(spy.async_compliance(), vec![false]);
/// ```
///
/// [`enable_strict_async_compliance`]: StrictSpy::enable_strict_async_compliance
pub struct StrictSpy<S> {
    spy: S,
    tracker: ComplianceTracker,
}

impl<S: SettableFake> StrictSpy<S> {
    /// Installs tracking on `spy`, registering in the process-wide registry.
    pub fn install(spy: S) -> Self {
        Self::install_in(spy, Registry::global())
    }

    /// Installs tracking on `spy`, registering in `registry`.
    ///
    /// If the spy already carries a tracker, that tracker (and its registry)
    /// is reused.
    pub fn install_in(spy: S, registry: &Registry) -> Self {
        let tracker = spy.compliance_slot().get_or_install(registry).clone();
        Self { spy, tracker }
    }

    /// Enables tracking. Returns the spy for chaining.
    pub fn enable_strict_async_compliance(&self) -> &Self {
        if self.tracker.enable() {
            debug!(tracker = %self.tracker.id(), "fake setters now observing");
        }
        self
    }

    /// Returns a copy of the recorded classifications.
    ///
    /// Empty while tracking is disabled.
    #[must_use]
    pub fn async_compliance(&self) -> Vec<bool> {
        self.tracker.history()
    }

    /// Clears the recorded classifications, keeping tracking enabled.
    pub fn reset_async_compliance(&self) {
        self.tracker.reset();
    }

    /// Clears the history, disables tracking and deregisters the spy.
    pub fn restore_async_compliance(&self) {
        self.tracker.restore();
    }

    /// Calls the underlying spy.
    pub fn call(&self, args: S::Args) -> S::Output {
        self.spy.invoke(args)
    }

    /// Returns the tracker.
    #[must_use]
    pub fn tracker(&self) -> &ComplianceTracker {
        &self.tracker
    }

    /// Returns the underlying spy.
    #[must_use]
    pub fn inner(&self) -> &S {
        &self.spy
    }

    /// Unwraps the underlying spy. Its compliance slot keeps the tracker.
    pub fn into_inner(self) -> S {
        self.spy
    }
}

impl<S> StrictSpy<S>
where
    S: SettableFake,
    S::Args: 'static,
    S::Output: AsThenable + 'static,
{
    /// Sets a fake implementation, observing its results once patched.
    pub fn set_fake(&self, fake: Fake<S::Args, S::Output>) {
        if self.tracker.is_patched() {
            let tracker = self.tracker.clone();
            self.spy.set_fake(Arc::new(move |args| {
                let result = fake(args);
                tracker.observe_value(&result);
                result
            }));
        } else {
            self.spy.set_fake(fake);
        }
    }

    /// Sets a fixed return value, observed like a fake's result once patched.
    pub fn set_return_value(&self, value: S::Output)
    where
        S::Output: Clone + Send + Sync,
    {
        if self.tracker.is_patched() {
            let tracker = self.tracker.clone();
            self.spy.set_fake(Arc::new(move |_| {
                let result = value.clone();
                tracker.observe_value(&result);
                result
            }));
        } else {
            self.spy.set_return_value(value);
        }
    }
}

/// Compliance-aware strategy handle returned by [`StrictSpy::and`].
pub struct StrictStrategy<'a, A, R> {
    spy: &'a StrictSpy<FluentSpy<A, R>>,
}

impl<A, R> StrictSpy<FluentSpy<A, R>>
where
    A: Clone + 'static,
    R: AsThenable + Default + 'static,
{
    /// Access the fluent strategy, routed through compliance observation.
    pub fn and(&self) -> StrictStrategy<'_, A, R> {
        StrictStrategy { spy: self }
    }
}

impl<'a, A, R> StrictStrategy<'a, A, R>
where
    A: Clone + 'static,
    R: AsThenable + Default + 'static,
{
    /// Run `fake` on every call.
    pub fn call_fake<F>(self, fake: F) -> &'a StrictSpy<FluentSpy<A, R>>
    where
        F: Fn(A) -> R + Send + Sync + 'static,
    {
        self.spy.set_fake(Arc::new(fake));
        self.spy
    }

    /// Return a clone of `value` on every call.
    pub fn return_value(self, value: R) -> &'a StrictSpy<FluentSpy<A, R>>
    where
        R: Clone + Send + Sync,
    {
        self.spy.set_return_value(value);
        self.spy
    }
}

impl<A, R> StrictSpy<MockFn<A, R>>
where
    A: Clone + 'static,
    R: AsThenable + Default + 'static,
{
    /// Use `implementation` for every call.
    pub fn mock_implementation<F>(&self, implementation: F) -> &Self
    where
        F: Fn(A) -> R + Send + Sync + 'static,
    {
        self.set_fake(Arc::new(implementation));
        self
    }

    /// Return a clone of `value` on every call.
    pub fn mock_return_value(&self, value: R) -> &Self
    where
        R: Clone + Send + Sync,
    {
        self.set_return_value(value);
        self
    }
}

impl<S: Clone> Clone for StrictSpy<S> {
    fn clone(&self) -> Self {
        Self {
            spy: self.spy.clone(),
            tracker: self.tracker.clone(),
        }
    }
}

impl<S: fmt::Debug> fmt::Debug for StrictSpy<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StrictSpy")
            .field("spy", &self.spy)
            .field("tracker", &self.tracker)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::thenable::{thenable_fn, Immediate, MicrotaskQueue, Promise, Thenable};
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn fluent<R: Default>(registry: &Registry) -> StrictSpy<FluentSpy<&'static str, R>> {
        StrictSpy::install_in(FluentSpy::new(), registry)
    }

    #[test]
    fn test_enable_returns_self() {
        let registry = Registry::new();
        let spy = fluent::<u8>(&registry);

        assert!(std::ptr::eq(spy.enable_strict_async_compliance(), &spy));
        assert!(spy.tracker().is_enabled());
        assert!(registry.contains(spy.tracker()));
    }

    #[test]
    fn test_sync_then_async_thenables() {
        let registry = Registry::new();
        let queue = MicrotaskQueue::new();
        let spy = fluent::<Option<Box<dyn Thenable>>>(&registry);
        spy.enable_strict_async_compliance();

        spy.and().call_fake(|_| {
            let inline: Box<dyn Thenable> = Box::new(thenable_fn(|resolve, _| {
                resolve();
                Ok(())
            }));
            Some(inline)
        });
        let _ = spy.call("a");
        queue.run_until_idle();
        assert_eq!(spy.async_compliance(), vec![false]);

        let q = queue.clone();
        spy.and().call_fake(move |_| {
            let q = q.clone();
            let deferred: Box<dyn Thenable> = Box::new(thenable_fn(move |resolve, _| {
                q.enqueue(resolve);
                Ok(())
            }));
            Some(deferred)
        });
        let _ = spy.call("b");
        queue.run_until_idle();
        assert_eq!(spy.async_compliance(), vec![false, true]);
    }

    #[test]
    fn test_result_passes_through_unchanged() {
        let registry = Registry::new();
        let queue = MicrotaskQueue::new();
        let spy = StrictSpy::install_in(MockFn::<u32, Option<Promise<u32>>>::new(), &registry);
        spy.enable_strict_async_compliance();

        let q = queue.clone();
        spy.mock_implementation(move |x| Some(Promise::resolved(&q, x * 2)));

        let promise = spy.call(21).unwrap();
        assert_eq!(futures::executor::block_on(promise), Ok(42));
        assert_eq!(spy.inner().mock_calls(), vec![21]);
    }

    #[test]
    fn test_fake_set_before_enable_is_not_observed() {
        let registry = Registry::new();
        let spy = fluent::<Option<Immediate>>(&registry);

        spy.and().return_value(Some(Immediate::fulfilled()));
        spy.enable_strict_async_compliance();
        let _ = spy.call("x");

        assert!(spy.async_compliance().is_empty());

        spy.and().return_value(Some(Immediate::fulfilled()));
        let _ = spy.call("x");
        assert_eq!(spy.async_compliance(), vec![false]);
    }

    #[test]
    fn test_reenable_does_not_double_wrap() {
        let registry = Registry::new();
        let queue = MicrotaskQueue::new();
        let invocations = Arc::new(AtomicUsize::new(0));
        let spy = fluent::<Option<Promise<()>>>(&registry);
        spy.enable_strict_async_compliance();

        let counter = Arc::clone(&invocations);
        let q = queue.clone();
        spy.and().call_fake(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            Some(Promise::resolved(&q, ()))
        });

        let _ = spy.call("first");
        queue.run_until_idle();
        assert_eq!(spy.async_compliance(), vec![true]);

        spy.restore_async_compliance();
        let _ = spy.call("ignored");
        queue.run_until_idle();
        assert!(spy.async_compliance().is_empty());

        spy.enable_strict_async_compliance();
        spy.enable_strict_async_compliance();
        let _ = spy.call("again");
        queue.run_until_idle();

        assert_eq!(spy.async_compliance(), vec![true]);
        assert_eq!(invocations.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_install_reuses_tracker() {
        let registry = Registry::new();
        let other = Registry::new();
        let base = FluentSpy::<(), ()>::new();

        let first = StrictSpy::install_in(base.clone(), &registry);
        let second = StrictSpy::install_in(base, &other);

        assert_eq!(first.tracker().id(), second.tracker().id());
        assert!(second.tracker().registry().same_as(&registry));

        first.enable_strict_async_compliance();
        assert!(second.tracker().is_enabled());
    }

    #[test]
    fn test_non_thenable_return_value() {
        let registry = Registry::new();
        let spy = StrictSpy::install_in(MockFn::<(), i32>::new(), &registry);
        spy.enable_strict_async_compliance();
        spy.mock_return_value(123);

        assert_eq!(spy.call(()), 123);
        assert!(spy.async_compliance().is_empty());
    }
}
