//! Strict async compliance tracking.
//!
//! A [`ComplianceTracker`] watches the values a spy returns. Every value that
//! exposes a [`Thenable`] view is classified:
//!
//! - `false` (non-compliant) if a settlement handler fired while `then` was
//!   still running, i.e. the value settled synchronously
//! - `true` (compliant) if the first handler fired after `then` returned
//!
//! Plain values are ignored. Classifications are appended to the tracker's
//! history in settlement order, and only while tracking is enabled.
//!
//! # Example
//!
//! ```rust
//! use testkit_compliance::compliance::{ComplianceTracker, Registry};
//! use testkit_compliance::thenable::{Immediate, MicrotaskQueue, Promise};
//!
//! let registry = Registry::new();
//! let tracker = ComplianceTracker::new(&registry);
//! tracker.enable();
//!
//! let queue = MicrotaskQueue::new();
//! tracker.observe_value(&Immediate::fulfilled());
//! tracker.observe_value(&Promise::resolved(&queue, 1));
//! tracker.observe_value(&123);
//! queue.run_until_idle();
//!
//! assert_eq!(tracker.history(), vec![false, true]);
//! ```

mod config;
mod observed;
mod registry;

use std::fmt;
use std::future::Future;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use tracing::{debug, trace, warn};

use crate::thenable::{AsThenable, Settle, Thenable};

pub use config::{ComplianceConfig, RegistryScope};
pub use observed::Observed;
pub use registry::Registry;

/// Unique identifier of a tracker.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TrackerId(u64);

impl TrackerId {
    fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Returns the raw ID value.
    #[must_use]
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for TrackerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Tracker({})", self.0)
    }
}

/// Tracking state of one spied callable.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ComplianceState {
    /// Whether classifications are currently recorded.
    pub enabled: bool,
    /// Recorded classifications, `true` meaning compliant.
    pub history: Vec<bool>,
    /// Whether the spy's fake setters have been made observing.
    pub patched: bool,
    /// Bumped by reset and restore; settlements from an older cycle are dropped.
    pub cycle: u64,
}

/// Per-callable compliance tracker.
///
/// Clones share the same state. Created through
/// [`StrictSpy`](crate::mock::StrictSpy) in normal use.
#[derive(Clone)]
pub struct ComplianceTracker {
    inner: Arc<TrackerInner>,
}

pub(crate) struct TrackerInner {
    id: TrackerId,
    state: Mutex<ComplianceState>,
    registry: Registry,
}

impl ComplianceTracker {
    /// Creates a disabled tracker that registers itself in `registry` when
    /// enabled.
    #[must_use]
    pub fn new(registry: &Registry) -> Self {
        Self {
            inner: Arc::new(TrackerInner {
                id: TrackerId::new(),
                state: Mutex::new(ComplianceState::default()),
                registry: registry.clone(),
            }),
        }
    }

    /// Returns the tracker's ID.
    #[must_use]
    pub fn id(&self) -> TrackerId {
        self.inner.id
    }

    /// Returns the registry this tracker registers in.
    #[must_use]
    pub fn registry(&self) -> &Registry {
        &self.inner.registry
    }

    /// Enables tracking and registers the tracker.
    ///
    /// Idempotent. Returns `true` only on the very first enable, when the
    /// caller must make its fake setters observing.
    pub fn enable(&self) -> bool {
        let first = {
            let mut state = self.inner.state.lock();
            state.enabled = true;
            !std::mem::replace(&mut state.patched, true)
        };
        self.inner.registry.register(self);
        debug!(tracker = %self.id(), first, "strict async compliance enabled");
        first
    }

    /// Returns true while classifications are recorded.
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.inner.state.lock().enabled
    }

    /// Returns true once the tracker has been enabled at least once.
    #[must_use]
    pub fn is_patched(&self) -> bool {
        self.inner.state.lock().patched
    }

    /// Returns a copy of the history, or an empty vector while disabled.
    #[must_use]
    pub fn history(&self) -> Vec<bool> {
        let state = self.inner.state.lock();
        if state.enabled {
            state.history.clone()
        } else {
            Vec::new()
        }
    }

    /// Returns a copy of the full state.
    #[must_use]
    pub fn state(&self) -> ComplianceState {
        self.inner.state.lock().clone()
    }

    /// Clears the history without touching the enabled flag.
    ///
    /// Settlements still in flight from before the reset are dropped.
    pub fn reset(&self) {
        let mut state = self.inner.state.lock();
        state.history.clear();
        state.cycle += 1;
    }

    /// Clears the history, disables tracking and deregisters the tracker.
    ///
    /// Observing setters stay in place; enabling again does not re-wrap them.
    pub fn restore(&self) {
        self.inner.restore_state();
        self.inner.registry.deregister(self.id());
        debug!(tracker = %self.id(), "strict async compliance restored");
    }

    /// Classifies `value` if it exposes a thenable view.
    pub fn observe_value<R: AsThenable + ?Sized>(&self, value: &R) {
        if let Some(thenable) = value.as_thenable() {
            self.observe(thenable);
        }
    }

    /// Classifies a thenable by attaching settlement handlers to it.
    ///
    /// Nothing happens while tracking is disabled. A `then` that fails or
    /// panics counts as a synchronous settlement.
    pub fn observe(&self, thenable: &dyn Thenable) {
        let Some(cycle) = self.inner.active_cycle() else {
            return;
        };

        let probe = Arc::new(Probe {
            tracker: Arc::downgrade(&self.inner),
            cycle,
            sync_phase: AtomicBool::new(true),
            recorded: AtomicBool::new(false),
        });

        let outcome = {
            let _phase = SyncPhase(&probe.sync_phase);
            let on_fulfilled = probe.handler();
            let on_rejected = probe.handler();
            panic::catch_unwind(AssertUnwindSafe(|| thenable.then(on_fulfilled, on_rejected)))
        };

        match outcome {
            Ok(Ok(())) => {}
            Ok(Err(err)) => {
                warn!(tracker = %self.id(), error = %err, "then() failed, counting as synchronous");
                probe.finalize(false);
            }
            Err(_) => {
                warn!(tracker = %self.id(), "then() panicked, counting as synchronous");
                probe.finalize(false);
            }
        }
    }

    /// Wraps a future so that its readiness is classified.
    ///
    /// A future that is ready on its first poll is non-compliant; one that
    /// becomes ready on a later poll is compliant. The output is passed
    /// through unchanged.
    pub fn watch<F: Future>(&self, future: F) -> Observed<F> {
        Observed::new(future, Arc::downgrade(&self.inner), self.inner.active_cycle())
    }
}

impl TrackerInner {
    fn active_cycle(&self) -> Option<u64> {
        let state = self.state.lock();
        state.enabled.then_some(state.cycle)
    }

    pub(crate) fn restore_state(&self) {
        let mut state = self.state.lock();
        state.history.clear();
        state.enabled = false;
        state.cycle += 1;
    }

    pub(crate) fn record(&self, cycle: u64, compliant: bool) {
        let mut state = self.state.lock();
        if state.enabled && state.cycle == cycle {
            state.history.push(compliant);
            trace!(tracker = %self.id, compliant, "classification recorded");
        } else {
            trace!(tracker = %self.id, compliant, "classification dropped");
        }
    }
}

impl fmt::Debug for ComplianceTracker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComplianceTracker")
            .field("id", &self.inner.id)
            .field("state", &*self.inner.state.lock())
            .finish()
    }
}

/// Settlement bookkeeping for one observed value.
struct Probe {
    tracker: Weak<TrackerInner>,
    cycle: u64,
    sync_phase: AtomicBool,
    recorded: AtomicBool,
}

impl Probe {
    fn handler(self: &Arc<Self>) -> Settle {
        let probe = Arc::clone(self);
        Box::new(move || {
            let compliant = !probe.sync_phase.load(Ordering::SeqCst);
            probe.finalize(compliant);
        })
    }

    fn finalize(&self, compliant: bool) {
        if self.recorded.swap(true, Ordering::SeqCst) {
            return;
        }
        if let Some(tracker) = self.tracker.upgrade() {
            tracker.record(self.cycle, compliant);
        }
    }
}

/// Ends the synchronous phase when dropped, even if `then` unwinds.
struct SyncPhase<'a>(&'a AtomicBool);

impl Drop for SyncPhase<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Restores every tracker in the process-wide registry and empties it.
///
/// This is the hook a test toolkit calls from its own "reset everything"
/// operation.
pub fn global_restore_async_compliance() {
    let restored = Registry::global().restore_all();
    debug!(restored, "global async compliance restore");
}
