//! Assertions for async compliance.
//!
//! - [`assert_async_compliance!`] - Assert the exact recorded history
//! - [`assert_all_compliant!`] - Assert every recorded call settled asynchronously
//! - [`assert_none_compliant!`] - Assert every recorded call settled synchronously
//! - [`poll_once`] - Poll a future once without an executor
//!
//! The macros accept anything with an `async_compliance()` method returning
//! `Vec<bool>`, such as [`StrictSpy`](crate::mock::StrictSpy).
//!
//! # Example
//!
//! ```rust
//! use testkit_compliance::{assert_all_compliant, assert_async_compliance};
//! use testkit_compliance::harness::ComplianceHarness;
//! use testkit_compliance::thenable::{MicrotaskQueue, Promise};
//!
//! let harness = ComplianceHarness::setup();
//! let queue = MicrotaskQueue::new();
//! let spy = harness.mock_fn::<(), Option<Promise<u8>>>();
//!
//! spy.enable_strict_async_compliance()
//!     .mock_return_value(Some(Promise::resolved(&queue, 1)));
//! let _ = spy.call(());
//! let _ = spy.call(());
//! queue.run_until_idle();
//!
//! assert_async_compliance!(spy, [true, true]);
//! assert_all_compliant!(spy);
//! ```

use std::future::Future;
use std::pin::pin;
use std::task::{Context, Poll, RawWaker, RawWakerVTable, Waker};

/// Poll a future once and return the result.
///
/// # Example
///
/// ```rust
/// use testkit_compliance::assertions::poll_once;
/// use std::task::Poll;
///
/// assert_eq!(poll_once(async { 42 }), Poll::Ready(42));
/// ```
pub fn poll_once<F: Future>(future: F) -> Poll<F::Output> {
    let waker = noop_waker();
    let mut cx = Context::from_waker(&waker);
    pin!(future).poll(&mut cx)
}

/// Assert the exact compliance history of a spy.
///
/// # Panics
///
/// Panics if the recorded history differs from the expected one.
#[macro_export]
macro_rules! assert_async_compliance {
    ($spy:expr, [$($expected:expr),* $(,)?]) => {{
        let actual: ::std::vec::Vec<bool> = $spy.async_compliance();
        let expected: ::std::vec::Vec<bool> = ::std::vec![$($expected),*];
        assert_eq!(
            actual, expected,
            "assertion failed: async compliance history {:?}, expected {:?}",
            actual, expected
        );
    }};
}

/// Assert that a spy recorded at least one call and every recorded call
/// settled asynchronously.
///
/// # Panics
///
/// Panics if the history is empty or contains a synchronous settlement.
#[macro_export]
macro_rules! assert_all_compliant {
    ($spy:expr) => {{
        let history: ::std::vec::Vec<bool> = $spy.async_compliance();
        assert!(
            !history.is_empty(),
            "assertion failed: no async compliance recorded"
        );
        if let Some(index) = history.iter().position(|compliant| !compliant) {
            panic!(
                "assertion failed: call #{} settled synchronously (history {:?})",
                index, history
            );
        }
    }};
}

/// Assert that a spy recorded at least one call and every recorded call
/// settled synchronously.
///
/// # Panics
///
/// Panics if the history is empty or contains an asynchronous settlement.
#[macro_export]
macro_rules! assert_none_compliant {
    ($spy:expr) => {{
        let history: ::std::vec::Vec<bool> = $spy.async_compliance();
        assert!(
            !history.is_empty(),
            "assertion failed: no async compliance recorded"
        );
        if let Some(index) = history.iter().position(|compliant| *compliant) {
            panic!(
                "assertion failed: call #{} settled asynchronously (history {:?})",
                index, history
            );
        }
    }};
}

fn noop_waker() -> Waker {
    const VTABLE: RawWakerVTable = RawWakerVTable::new(
        |_| RawWaker::new(std::ptr::null(), &VTABLE),
        |_| {},
        |_| {},
        |_| {},
    );

    // SAFETY: the vtable never dereferences the data pointer.
    unsafe { Waker::from_raw(RawWaker::new(std::ptr::null(), &VTABLE)) }
}
