//! # testkit-compliance
//!
//! > Strict async compliance tracking for test spies
//!
//! **testkit-compliance** tells you whether the values your spies return
//! settle synchronously or asynchronously. Code that awaits a dependency
//! often behaves differently when the dependency resolves inline; a strict
//! spy records, call by call, which of the two your fakes actually did.
//!
//! ## Quick Start
//!
//! ```rust
//! use testkit_compliance::prelude::*;
//!
//! let harness = ComplianceHarness::setup();
//! let queue = MicrotaskQueue::new();
//! let spy = harness.fluent_spy::<&str, Option<Promise<String>>>();
//!
//! spy.enable_strict_async_compliance();
//! let q = queue.clone();
//! spy.and().call_fake(move |name| Some(Promise::resolved(&q, format!("hello {name}"))));
//!
//! let _ = spy.call("world");
//! queue.run_until_idle();
//!
//! assert_eq!(spy.async_compliance(), vec![true]);
//! ```
//!
//! ## Features
//!
//! - **Compliance tracking** - [`StrictSpy`](mock::StrictSpy) classifies every thenable a fake returns
//! - **Two spy conventions** - fluent [`FluentSpy`](mock::FluentSpy) and [`MockFn`](mock::MockFn)
//! - **Bulk restore** - [`Registry`](compliance::Registry) and [`global_restore_async_compliance`]
//! - **Test lifecycle** - [`ComplianceHarness`](harness::ComplianceHarness) and the `#[test]` macro

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod assertions;
pub mod compliance;
pub mod error;
pub mod harness;
pub mod mock;
pub mod thenable;

/// Prelude for convenient imports
///
/// ```rust
/// use testkit_compliance::prelude::*;
/// ```
pub mod prelude {
    pub use crate::compliance::{
        global_restore_async_compliance, ComplianceConfig, ComplianceTracker, Registry,
        RegistryScope,
    };
    pub use crate::error::{Error, Result};
    pub use crate::harness::ComplianceHarness;
    pub use crate::mock::{FluentSpy, MockFn, SettableFake, StrictSpy};
    pub use crate::thenable::{
        thenable_fn, AsThenable, Immediate, MicrotaskQueue, Promise, Thenable,
    };
}

// Re-exports
pub use compliance::{global_restore_async_compliance, ComplianceConfig};
pub use error::{Error, Result};

// Re-export the test macro when macros feature is enabled
#[cfg(feature = "macros")]
pub use testkit_compliance_macros::test;
