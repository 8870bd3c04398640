//! Spies with settable fake implementations.
//!
//! This module provides two spy flavours, one per supported convention, and
//! the [`StrictSpy`] decorator adding async compliance tracking to either:
//!
//! - [`FluentSpy`] - fluent convention: `spy.and().call_fake(f)`
//! - [`MockFn`] - mock convention: `spy.mock_implementation(f)`
//! - [`StrictSpy`] - owns a spy plus its [`ComplianceTracker`]
//!
//! Both flavours implement [`SettableFake`], the capability [`StrictSpy`]
//! builds on.
//!
//! # Example
//!
//! ```rust
//! use testkit_compliance::compliance::Registry;
//! use testkit_compliance::mock::{FluentSpy, StrictSpy};
//! use testkit_compliance::thenable::{MicrotaskQueue, Promise};
//!
//! let registry = Registry::new();
//! let queue = MicrotaskQueue::new();
//! let spy = StrictSpy::install_in(FluentSpy::<(), Option<Promise<u32>>>::new(), &registry);
//!
//! spy.enable_strict_async_compliance()
//!     .and()
//!     .return_value(Some(Promise::resolved(&queue, 1)));
//!
//! let _ = spy.call(());
//! queue.run_until_idle();
//!
//! assert_eq!(spy.async_compliance(), vec![true]);
//! ```
//!
//! [`ComplianceTracker`]: crate::compliance::ComplianceTracker

mod mock_fn;
mod spy;
mod strict;

use std::fmt;
use std::sync::{Arc, OnceLock};

use crate::compliance::{ComplianceTracker, Registry};

pub use mock_fn::MockFn;
pub use spy::{CallRecord, FluentSpy, SpyStrategy};
pub use strict::{StrictSpy, StrictStrategy};

/// A fake implementation substituted for a spy's real behavior.
pub type Fake<A, R> = Arc<dyn Fn(A) -> R + Send + Sync>;

/// A spy whose behavior can be replaced by a fake implementation.
pub trait SettableFake {
    /// Argument type of a call.
    type Args;
    /// Return type of a call.
    type Output;

    /// Replaces the spy's behavior with `fake`.
    fn set_fake(&self, fake: Fake<Self::Args, Self::Output>);

    /// Makes every call return a clone of `value`.
    fn set_return_value(&self, value: Self::Output)
    where
        Self::Output: Clone + Send + Sync + 'static,
    {
        self.set_fake(Arc::new(move |_| value.clone()));
    }

    /// Calls the spy.
    fn invoke(&self, args: Self::Args) -> Self::Output;

    /// The slot holding this spy's compliance tracker, shared by clones.
    fn compliance_slot(&self) -> &ComplianceSlot;
}

/// Hidden per-spy slot holding its compliance tracker.
///
/// Filled at most once; every later install reuses the same tracker.
#[derive(Default)]
pub struct ComplianceSlot {
    tracker: OnceLock<ComplianceTracker>,
}

impl ComplianceSlot {
    /// Creates an empty slot.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the installed tracker, if any.
    #[must_use]
    pub fn get(&self) -> Option<&ComplianceTracker> {
        self.tracker.get()
    }

    /// Returns the installed tracker, creating one bound to `registry` if the
    /// slot is empty.
    pub(crate) fn get_or_install(&self, registry: &Registry) -> &ComplianceTracker {
        self.tracker
            .get_or_init(|| ComplianceTracker::new(registry))
    }
}

impl fmt::Debug for ComplianceSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComplianceSlot")
            .field("tracker", &self.tracker.get().map(ComplianceTracker::id))
            .finish()
    }
}
