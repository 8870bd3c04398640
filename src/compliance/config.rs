//! Configuration for compliance harnesses.

/// Which registry spies created by a harness register in.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum RegistryScope {
    /// A registry owned by the harness. Safe for tests running in parallel.
    #[default]
    Isolated,
    /// The process-wide registry swept by
    /// [`global_restore_async_compliance`](crate::global_restore_async_compliance).
    Global,
}

/// Compliance harness configuration.
///
/// # Example
///
/// ```rust
/// use testkit_compliance::compliance::{ComplianceConfig, RegistryScope};
///
/// let config = ComplianceConfig::new()
///     .with_strict_by_default(true)
///     .with_scope(RegistryScope::Global);
///
/// assert!(config.strict_by_default());
/// assert_eq!(config.scope(), RegistryScope::Global);
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ComplianceConfig {
    strict_by_default: bool,
    scope: RegistryScope,
}

impl ComplianceConfig {
    /// Creates the default configuration: tracking off until enabled, isolated
    /// registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Configuration that enables tracking on every spy as it is installed.
    #[must_use]
    pub fn strict() -> Self {
        Self::new().with_strict_by_default(true)
    }

    /// Sets whether spies start with tracking enabled.
    #[must_use]
    pub fn with_strict_by_default(mut self, strict: bool) -> Self {
        self.strict_by_default = strict;
        self
    }

    /// Sets the registry scope.
    #[must_use]
    pub fn with_scope(mut self, scope: RegistryScope) -> Self {
        self.scope = scope;
        self
    }

    /// Returns whether spies start with tracking enabled.
    #[must_use]
    pub fn strict_by_default(&self) -> bool {
        self.strict_by_default
    }

    /// Returns the registry scope.
    #[must_use]
    pub fn scope(&self) -> RegistryScope {
        self.scope
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ComplianceConfig::default();
        assert!(!config.strict_by_default());
        assert_eq!(config.scope(), RegistryScope::Isolated);
    }

    #[test]
    fn test_strict_preset() {
        let config = ComplianceConfig::strict();
        assert!(config.strict_by_default());
        assert_eq!(config.scope(), RegistryScope::Isolated);
    }
}
