//! Ambient tenant state.

use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;

use super::id::TenantId;
use crate::error::TenantError;

/// A shared handle to the tenant that is current for bind resolution.
///
/// Clones share the same slot, so a descriptor built from one clone observes
/// every later `set` made through another. Resolution reads the slot at the
/// moment a bind is resolved, never when the descriptor is configured.
///
/// # Examples
///
/// ```
/// use bindery_binds::tenant::{CurrentTenant, TenantId};
///
/// let current = CurrentTenant::new();
/// let observer = current.clone();
///
/// current.set(TenantId::new("tenant1"));
/// assert_eq!(observer.get(), Some(TenantId::new("tenant1")));
///
/// {
///     let _guard = current.enter(TenantId::new("tenant2"));
///     assert_eq!(observer.get(), Some(TenantId::new("tenant2")));
/// }
/// assert_eq!(observer.get(), Some(TenantId::new("tenant1")));
/// ```
#[derive(Clone, Default)]
pub struct CurrentTenant {
    slot: Arc<RwLock<Option<TenantId>>>,
}

impl CurrentTenant {
    /// Creates a handle with no tenant set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a handle with the given tenant already set.
    pub fn with(tenant: TenantId) -> Self {
        let current = Self::new();
        current.set(tenant);
        current
    }

    /// Makes `tenant` current, returning the previous tenant.
    pub fn set(&self, tenant: TenantId) -> Option<TenantId> {
        self.slot.write().replace(tenant)
    }

    /// Clears the current tenant, returning the previous one.
    pub fn clear(&self) -> Option<TenantId> {
        self.slot.write().take()
    }

    /// Returns the current tenant.
    pub fn get(&self) -> Option<TenantId> {
        self.slot.read().clone()
    }

    /// Returns the current tenant or an error when none is set.
    pub fn require(&self) -> Result<TenantId, TenantError> {
        self.get().ok_or(TenantError::NoCurrentTenant)
    }

    /// Makes `tenant` current until the returned guard is dropped.
    pub fn enter(&self, tenant: TenantId) -> TenantGuard {
        let previous = self.set(tenant);
        TenantGuard {
            current: self.clone(),
            previous,
        }
    }

    /// Runs `f` with `tenant` current and restores the previous tenant afterwards.
    pub fn with_tenant<T>(&self, tenant: TenantId, f: impl FnOnce() -> T) -> T {
        let _guard = self.enter(tenant);
        f()
    }
}

impl fmt::Debug for CurrentTenant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("CurrentTenant").field(&self.get()).finish()
    }
}

/// Restores the previously current tenant on drop.
#[must_use = "the tenant is restored as soon as the guard is dropped"]
pub struct TenantGuard {
    current: CurrentTenant,
    previous: Option<TenantId>,
}

impl Drop for TenantGuard {
    fn drop(&mut self) {
        let mut slot = self.current.slot.write();
        *slot = self.previous.take();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_and_clear() {
        let current = CurrentTenant::new();
        assert_eq!(current.get(), None);
        assert_eq!(current.set(TenantId::new("a")), None);
        assert_eq!(current.set(TenantId::new("b")), Some(TenantId::new("a")));
        assert_eq!(current.clear(), Some(TenantId::new("b")));
        assert_eq!(current.get(), None);
    }

    #[test]
    fn test_require() {
        let current = CurrentTenant::new();
        assert_eq!(current.require(), Err(TenantError::NoCurrentTenant));
        current.set(TenantId::new("a"));
        assert_eq!(current.require(), Ok(TenantId::new("a")));
    }

    #[test]
    fn test_with_tenant_restores_previous() {
        let current = CurrentTenant::with(TenantId::new("outer"));
        let seen = current.with_tenant(TenantId::new("inner"), || current.get());
        assert_eq!(seen, Some(TenantId::new("inner")));
        assert_eq!(current.get(), Some(TenantId::new("outer")));
    }

    #[test]
    fn test_guard_restores_none() {
        let current = CurrentTenant::new();
        {
            let _guard = current.enter(TenantId::new("scoped"));
            assert!(current.get().is_some());
        }
        assert_eq!(current.get(), None);
    }
}
