//! Setup and teardown of compliance tracking for a test.
//!
//! A [`ComplianceHarness`] owns (or borrows the process-wide) [`Registry`]
//! for the duration of a test. Spies created through the harness register in
//! that registry, [`ComplianceHarness::reset`] restores all of them, and
//! dropping the harness does the same, so per-test state never leaks into
//! the next test.
//!
//! # Example
//!
//! ```rust
//! use testkit_compliance::harness::ComplianceHarness;
//! use testkit_compliance::thenable::{MicrotaskQueue, Promise};
//!
//! let harness = ComplianceHarness::setup();
//! let queue = MicrotaskQueue::new();
//! let spy = harness.fluent_spy::<(), Option<Promise<()>>>();
//!
//! spy.enable_strict_async_compliance()
//!     .and()
//!     .return_value(Some(Promise::resolved(&queue, ())));
//! let _ = spy.call(());
//! queue.run_until_idle();
//! assert_eq!(spy.async_compliance(), vec![true]);
//!
//! harness.reset();
//! assert!(spy.async_compliance().is_empty());
//! ```

use std::fmt;

use tracing::debug;

use crate::compliance::{ComplianceConfig, Registry, RegistryScope};
use crate::mock::{FluentSpy, MockFn, SettableFake, StrictSpy};

/// Per-test compliance lifecycle.
pub struct ComplianceHarness {
    registry: Registry,
    config: ComplianceConfig,
}

impl ComplianceHarness {
    /// Sets up a harness with an isolated registry.
    #[must_use]
    pub fn setup() -> Self {
        Self::with_config(ComplianceConfig::new())
    }

    /// Sets up a harness bound to the process-wide registry.
    ///
    /// Resetting or dropping it restores every globally registered spy,
    /// including those of other tests running in parallel.
    #[must_use]
    pub fn global() -> Self {
        Self::with_config(ComplianceConfig::new().with_scope(RegistryScope::Global))
    }

    /// Sets up a harness from `config`.
    #[must_use]
    pub fn with_config(config: ComplianceConfig) -> Self {
        let registry = match config.scope() {
            RegistryScope::Isolated => Registry::new(),
            RegistryScope::Global => Registry::global().clone(),
        };
        debug!(scope = ?config.scope(), strict = config.strict_by_default(), "compliance harness set up");
        Self { registry, config }
    }

    /// Returns the harness registry.
    #[must_use]
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Returns the harness configuration.
    #[must_use]
    pub fn config(&self) -> &ComplianceConfig {
        &self.config
    }

    /// Installs compliance tracking on `spy`, bound to this harness.
    pub fn install<S: SettableFake>(&self, spy: S) -> StrictSpy<S> {
        let strict = StrictSpy::install_in(spy, &self.registry);
        if self.config.strict_by_default() {
            strict.enable_strict_async_compliance();
        }
        strict
    }

    /// Creates a fluent spy bound to this harness.
    pub fn fluent_spy<A: Clone, R: Default>(&self) -> StrictSpy<FluentSpy<A, R>> {
        self.install(FluentSpy::new())
    }

    /// Creates a mock function bound to this harness.
    pub fn mock_fn<A: Clone, R: Default>(&self) -> StrictSpy<MockFn<A, R>> {
        self.install(MockFn::new())
    }

    /// Restores every spy registered in the harness registry.
    ///
    /// Returns the number of spies restored.
    pub fn reset(&self) -> usize {
        let restored = self.registry.restore_all();
        debug!(restored, "compliance harness reset");
        restored
    }

    /// Tears the harness down. Equivalent to dropping it.
    pub fn teardown(self) {}
}

impl Default for ComplianceHarness {
    fn default() -> Self {
        Self::setup()
    }
}

impl Drop for ComplianceHarness {
    fn drop(&mut self) {
        let restored = self.registry.restore_all();
        debug!(restored, "compliance harness torn down");
    }
}

impl fmt::Debug for ComplianceHarness {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComplianceHarness")
            .field("registry", &self.registry)
            .field("config", &self.config)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::thenable::Immediate;

    #[test]
    fn test_strict_by_default() {
        let harness = ComplianceHarness::with_config(ComplianceConfig::strict());
        let spy = harness.mock_fn::<(), Option<Immediate>>();

        assert!(spy.tracker().is_enabled());
        spy.mock_return_value(Some(Immediate::fulfilled()));
        let _ = spy.call(());

        assert_eq!(spy.async_compliance(), vec![false]);
    }

    #[test]
    fn test_not_strict_by_default() {
        let harness = ComplianceHarness::setup();
        let spy = harness.fluent_spy::<(), ()>();

        assert!(!spy.tracker().is_enabled());
        assert!(harness.registry().is_empty());
    }

    #[test]
    fn test_reset_restores_all_spies() {
        let harness = ComplianceHarness::setup();
        let a = harness.fluent_spy::<(), Option<Immediate>>();
        let b = harness.mock_fn::<(), Option<Immediate>>();
        a.enable_strict_async_compliance();
        b.enable_strict_async_compliance();

        assert_eq!(harness.registry().len(), 2);
        assert_eq!(harness.reset(), 2);

        assert!(harness.registry().is_empty());
        assert!(!a.tracker().is_enabled());
        assert!(!b.tracker().is_enabled());
    }

    #[test]
    fn test_drop_restores_spies() {
        let harness = ComplianceHarness::setup();
        let spy = harness.fluent_spy::<(), Option<Immediate>>();
        spy.enable_strict_async_compliance()
            .and()
            .return_value(Some(Immediate::fulfilled()));
        let _ = spy.call(());
        assert_eq!(spy.async_compliance(), vec![false]);

        harness.teardown();

        assert!(!spy.tracker().is_enabled());
        assert!(spy.tracker().state().history.is_empty());
    }

    #[test]
    fn test_harnesses_are_isolated() {
        let first = ComplianceHarness::setup();
        let second = ComplianceHarness::setup();
        let spy = first.fluent_spy::<(), ()>();
        spy.enable_strict_async_compliance();

        second.reset();

        assert!(spy.tracker().is_enabled());
    }
}
