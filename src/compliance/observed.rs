//! Compliance classification for plain Rust futures.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Weak;
use std::task::{Context, Poll};

use pin_project_lite::pin_project;

use super::TrackerInner;

pin_project! {
    /// A future wrapper that classifies when its inner future becomes ready.
    ///
    /// Created by [`ComplianceTracker::watch`](super::ComplianceTracker::watch).
    /// Ready on the first poll counts as a synchronous settlement.
    pub struct Observed<F> {
        #[pin]
        inner: F,
        tracker: Weak<TrackerInner>,
        cycle: Option<u64>,
        polls: usize,
    }
}

impl<F> Observed<F> {
    pub(crate) fn new(inner: F, tracker: Weak<TrackerInner>, cycle: Option<u64>) -> Self {
        Self {
            inner,
            tracker,
            cycle,
            polls: 0,
        }
    }

    /// Returns how many times the inner future has been polled.
    #[must_use]
    pub fn poll_count(&self) -> usize {
        self.polls
    }
}

impl<F: Future> Future for Observed<F> {
    type Output = F::Output;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.project();
        let first_poll = *this.polls == 0;
        *this.polls += 1;

        let poll = this.inner.poll(cx);
        if poll.is_ready() {
            // At most one classification per future.
            if let Some(cycle) = this.cycle.take() {
                if let Some(tracker) = this.tracker.upgrade() {
                    tracker.record(cycle, !first_poll);
                }
            }
        }
        poll
    }
}

impl<F> fmt::Debug for Observed<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Observed")
            .field("polls", &self.polls)
            .field("tracked", &self.cycle.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::future::Future;
    use std::task::{Context, Poll};

    use crate::assertions::poll_once;
    use crate::compliance::{ComplianceTracker, Registry};
    use crate::thenable::{MicrotaskQueue, Promise};

    #[test]
    fn test_ready_future_is_non_compliant() {
        let registry = Registry::new();
        let tracker = ComplianceTracker::new(&registry);
        tracker.enable();

        let value = futures::executor::block_on(tracker.watch(async { 5 }));

        assert_eq!(value, 5);
        assert_eq!(tracker.history(), vec![false]);
    }

    #[test]
    fn test_future_ready_after_pending_is_compliant() {
        let registry = Registry::new();
        let tracker = ComplianceTracker::new(&registry);
        tracker.enable();

        let queue = MicrotaskQueue::new();
        let (promise, resolver) = Promise::pending(&queue);
        let mut observed = Box::pin(tracker.watch(promise));
        let mut cx = Context::from_waker(futures::task::noop_waker_ref());

        assert!(observed.as_mut().poll(&mut cx).is_pending());
        assert!(tracker.history().is_empty());

        resolver.resolve("later");

        assert_eq!(observed.as_mut().poll(&mut cx), Poll::Ready(Ok("later")));
        assert_eq!(observed.poll_count(), 2);
        assert_eq!(tracker.history(), vec![true]);
    }

    #[test]
    fn test_watch_while_disabled_records_nothing() {
        let registry = Registry::new();
        let tracker = ComplianceTracker::new(&registry);

        let observed = tracker.watch(async { 1 });
        tracker.enable();

        assert!(poll_once(observed).is_ready());
        assert!(tracker.history().is_empty());
    }
}
