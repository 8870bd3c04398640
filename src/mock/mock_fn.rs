//! Mock functions following the mock implementation convention.

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;

use super::{ComplianceSlot, Fake, SettableFake};

/// A mock function configured with `mock_implementation` /
/// `mock_return_value`.
///
/// An unconfigured mock returns `R::default()`. Clones share calls,
/// implementation and compliance slot.
///
/// # Example
///
/// ```rust
/// use testkit_compliance::mock::MockFn;
///
/// let mock = MockFn::<(i32, i32), i32>::new();
/// mock.mock_implementation(|(a, b)| a + b);
///
/// assert_eq!(mock.call((2, 3)), 5);
/// assert_eq!(mock.mock_calls(), vec![(2, 3)]);
/// ```
pub struct MockFn<A, R> {
    shared: Arc<MockShared<A, R>>,
}

struct MockShared<A, R> {
    implementation: Mutex<Option<Fake<A, R>>>,
    calls: Mutex<Vec<A>>,
    slot: ComplianceSlot,
}

impl<A, R> MockFn<A, R> {
    /// Create a new mock without implementation.
    #[must_use]
    pub fn new() -> Self {
        Self {
            shared: Arc::new(MockShared {
                implementation: Mutex::new(None),
                calls: Mutex::new(Vec::new()),
                slot: ComplianceSlot::new(),
            }),
        }
    }

    /// Use `implementation` for every call.
    pub fn mock_implementation<F>(&self, implementation: F) -> &Self
    where
        F: Fn(A) -> R + Send + Sync + 'static,
    {
        *self.shared.implementation.lock() = Some(Arc::new(implementation));
        self
    }

    /// Return a clone of `value` on every call.
    pub fn mock_return_value(&self, value: R) -> &Self
    where
        R: Clone + Send + Sync + 'static,
    {
        self.mock_implementation(move |_| value.clone())
    }

    /// Number of calls made so far.
    #[must_use]
    pub fn call_count(&self) -> usize {
        self.shared.calls.lock().len()
    }

    /// Forget recorded calls.
    pub fn mock_clear(&self) {
        self.shared.calls.lock().clear();
    }

    /// Forget recorded calls and the implementation.
    pub fn mock_reset(&self) {
        self.mock_clear();
        *self.shared.implementation.lock() = None;
    }
}

impl<A: Clone, R> MockFn<A, R> {
    /// Arguments of every call, in order.
    #[must_use]
    pub fn mock_calls(&self) -> Vec<A> {
        self.shared.calls.lock().clone()
    }
}

impl<A: Clone, R: Default> MockFn<A, R> {
    /// Call the mock.
    pub fn call(&self, args: A) -> R {
        self.shared.calls.lock().push(args.clone());
        let implementation = self.shared.implementation.lock().clone();
        match implementation {
            Some(implementation) => implementation(args),
            None => R::default(),
        }
    }
}

impl<A: Clone, R: Default> SettableFake for MockFn<A, R> {
    type Args = A;
    type Output = R;

    fn set_fake(&self, fake: Fake<A, R>) {
        *self.shared.implementation.lock() = Some(fake);
    }

    fn invoke(&self, args: A) -> R {
        self.call(args)
    }

    fn compliance_slot(&self) -> &ComplianceSlot {
        &self.shared.slot
    }
}

impl<A, R> Default for MockFn<A, R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<A, R> Clone for MockFn<A, R> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<A: fmt::Debug, R> fmt::Debug for MockFn<A, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MockFn")
            .field("calls", &*self.shared.calls.lock())
            .field("implemented", &self.shared.implementation.lock().is_some())
            .finish()
    }
}
