//! Registry of enabled trackers, used for bulk restore.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, OnceLock, Weak};

use parking_lot::Mutex;
use tracing::trace;

use super::{ComplianceTracker, TrackerId, TrackerInner};

/// Membership set of trackers that have tracking enabled.
///
/// The registry never keeps a tracker alive: entries are weak and entries
/// whose spy was dropped are discarded during [`restore_all`].
///
/// A process-wide registry is available through [`Registry::global`]; test
/// harnesses create their own with [`Registry::new`] so that parallel tests do
/// not restore each other's spies.
///
/// Clones share the same membership.
///
/// [`restore_all`]: Registry::restore_all
#[derive(Clone, Default)]
pub struct Registry {
    members: Arc<Mutex<BTreeMap<TrackerId, Weak<TrackerInner>>>>,
}

impl Registry {
    /// Creates an empty, independent registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the process-wide registry.
    pub fn global() -> &'static Registry {
        static GLOBAL: OnceLock<Registry> = OnceLock::new();
        GLOBAL.get_or_init(Registry::new)
    }

    /// Returns true if both handles refer to the same registry.
    #[must_use]
    pub fn same_as(&self, other: &Registry) -> bool {
        Arc::ptr_eq(&self.members, &other.members)
    }

    pub(crate) fn register(&self, tracker: &ComplianceTracker) {
        self.members
            .lock()
            .insert(tracker.id(), Arc::downgrade(&tracker.inner));
    }

    pub(crate) fn deregister(&self, id: TrackerId) {
        self.members.lock().remove(&id);
    }

    /// Returns true if `tracker` is registered.
    #[must_use]
    pub fn contains(&self, tracker: &ComplianceTracker) -> bool {
        self.members.lock().contains_key(&tracker.id())
    }

    /// Returns the number of registered trackers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.members.lock().len()
    }

    /// Returns true if no tracker is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Restores every registered tracker and empties the registry.
    ///
    /// Returns the number of live trackers restored.
    pub fn restore_all(&self) -> usize {
        let members = std::mem::take(&mut *self.members.lock());

        let mut restored = 0;
        for (id, member) in members {
            match member.upgrade() {
                Some(tracker) => {
                    tracker.restore_state();
                    restored += 1;
                }
                None => trace!(tracker = %id, "dropping dead registry entry"),
            }
        }
        restored
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("len", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::thenable::Immediate;

    #[test]
    fn test_enable_registers_once() {
        let registry = Registry::new();
        let tracker = ComplianceTracker::new(&registry);
        assert!(registry.is_empty());

        tracker.enable();
        tracker.enable();

        assert_eq!(registry.len(), 1);
        assert!(registry.contains(&tracker));
    }

    #[test]
    fn test_restore_all() {
        let registry = Registry::new();
        let first = ComplianceTracker::new(&registry);
        let second = ComplianceTracker::new(&registry);
        first.enable();
        second.enable();
        first.observe_value(&Immediate::fulfilled());
        second.observe_value(&Immediate::fulfilled());

        assert_eq!(registry.restore_all(), 2);

        assert!(registry.is_empty());
        assert!(!first.is_enabled());
        assert!(!second.is_enabled());
        assert!(first.state().history.is_empty());
        assert!(second.state().history.is_empty());
    }

    #[test]
    fn test_restore_all_discards_dead_entries() {
        let registry = Registry::new();
        let live = ComplianceTracker::new(&registry);
        live.enable();
        {
            let dropped = ComplianceTracker::new(&registry);
            dropped.enable();
        }
        assert_eq!(registry.len(), 2);

        assert_eq!(registry.restore_all(), 1);
        assert!(registry.is_empty());
    }

    #[test]
    fn test_registries_are_independent() {
        let a = Registry::new();
        let b = Registry::new();
        let tracker = ComplianceTracker::new(&a);
        tracker.enable();

        assert_eq!(b.restore_all(), 0);
        assert!(tracker.is_enabled());
        assert!(!a.same_as(&b));
        assert!(a.same_as(&a.clone()));
    }

    #[test]
    fn test_global_is_a_singleton() {
        assert!(Registry::global().same_as(Registry::global()));
    }
}
