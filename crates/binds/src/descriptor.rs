//! Connection descriptors.
//!
//! A [`BindDescriptor`] says where a bind's database lives. It is either a
//! literal connection string or a zero-argument producer that is invoked each
//! time the bind is resolved, so the answer may depend on ambient state such
//! as the [current tenant](crate::tenant::CurrentTenant).

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::error::{BindResult, TenantError};
use crate::tenant::{CurrentTenant, TenantId};

type Producer = Arc<dyn Fn() -> BindResult<String> + Send + Sync>;

/// A literal or dynamically produced connection string.
#[derive(Clone)]
pub enum BindDescriptor {
    /// A connection string fixed at configuration time.
    Static(String),
    /// A producer invoked at resolution time.
    Dynamic(Producer),
}

impl BindDescriptor {
    /// Creates a literal descriptor.
    pub fn fixed(url: impl Into<String>) -> Self {
        BindDescriptor::Static(url.into())
    }

    /// Creates a descriptor from an infallible producer.
    ///
    /// # Examples
    ///
    /// ```
    /// use std::sync::Arc;
    /// use std::sync::atomic::{AtomicUsize, Ordering};
    ///
    /// use bindery_binds::BindDescriptor;
    ///
    /// let shard = Arc::new(AtomicUsize::new(1));
    /// let source = shard.clone();
    /// let descriptor = BindDescriptor::dynamic(move || {
    ///     format!("sqlite:///shard_{}.db", source.load(Ordering::SeqCst))
    /// });
    ///
    /// assert_eq!(descriptor.resolve().unwrap(), "sqlite:///shard_1.db");
    /// shard.store(2, Ordering::SeqCst);
    /// assert_eq!(descriptor.resolve().unwrap(), "sqlite:///shard_2.db");
    /// ```
    pub fn dynamic<F>(producer: F) -> Self
    where
        F: Fn() -> String + Send + Sync + 'static,
    {
        BindDescriptor::Dynamic(Arc::new(move || Ok(producer())))
    }

    /// Creates a descriptor from a producer that may fail.
    pub fn try_dynamic<F>(producer: F) -> Self
    where
        F: Fn() -> BindResult<String> + Send + Sync + 'static,
    {
        BindDescriptor::Dynamic(Arc::new(producer))
    }

    /// Creates a descriptor that looks the current tenant up in a fixed map.
    pub fn per_tenant(current: CurrentTenant, urls: HashMap<TenantId, String>) -> Self {
        Self::try_dynamic(move || {
            let tenant = current.require()?;
            urls.get(&tenant).cloned().ok_or_else(|| {
                TenantError::UnknownTenant {
                    tenant_id: tenant.to_string(),
                }
                .into()
            })
        })
    }

    /// Creates a descriptor that renders a connection template for the current tenant.
    ///
    /// Supported placeholders:
    /// - `{tenant}` - the sanitized tenant id, distinct for distinct ids
    /// - `{tenant_hash}` - a hash of the tenant id
    ///
    /// # Examples
    ///
    /// ```
    /// use bindery_binds::BindDescriptor;
    /// use bindery_binds::tenant::{CurrentTenant, TenantId};
    ///
    /// let current = CurrentTenant::with(TenantId::new("acme_corp"));
    /// let descriptor = BindDescriptor::template(current.clone(), "sqlite:///data/{tenant}_orders.db");
    /// assert_eq!(descriptor.resolve().unwrap(), "sqlite:///data/acme_corp_orders.db");
    ///
    /// current.set(TenantId::new("Acme-Corp"));
    /// assert_eq!(
    ///     descriptor.resolve().unwrap(),
    ///     "sqlite:///data/acme_corp-83f386d6300f7e6b_orders.db"
    /// );
    /// ```
    pub fn template(current: CurrentTenant, template: impl Into<String>) -> Self {
        let template = template.into();
        Self::try_dynamic(move || {
            let tenant = current.require()?;
            Ok(render_template(&template, &tenant)?)
        })
    }

    /// Produces the connection string for this descriptor.
    pub fn resolve(&self) -> BindResult<String> {
        match self {
            BindDescriptor::Static(url) => Ok(url.clone()),
            BindDescriptor::Dynamic(producer) => producer(),
        }
    }

    /// Returns `true` if the descriptor is evaluated at resolution time.
    pub fn is_dynamic(&self) -> bool {
        matches!(self, BindDescriptor::Dynamic(_))
    }

    /// Returns the literal connection string, if any.
    pub fn as_static(&self) -> Option<&str> {
        match self {
            BindDescriptor::Static(url) => Some(url),
            BindDescriptor::Dynamic(_) => None,
        }
    }
}

/// Substitutes tenant placeholders in a connection template.
pub fn render_template(template: &str, tenant: &TenantId) -> Result<String, TenantError> {
    Ok(template
        .replace("{tenant_hash}", &tenant.hashed())
        .replace("{tenant}", &tenant.sanitized()?))
}

impl fmt::Debug for BindDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BindDescriptor::Static(url) => f.debug_tuple("Static").field(url).finish(),
            BindDescriptor::Dynamic(_) => f.write_str("Dynamic(..)"),
        }
    }
}

impl From<&str> for BindDescriptor {
    fn from(url: &str) -> Self {
        BindDescriptor::fixed(url)
    }
}

impl From<String> for BindDescriptor {
    fn from(url: String) -> Self {
        BindDescriptor::fixed(url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BindError;

    #[test]
    fn test_static_resolves_verbatim() {
        let descriptor = BindDescriptor::fixed("sqlite://");
        assert_eq!(descriptor.resolve().unwrap(), "sqlite://");
        assert!(!descriptor.is_dynamic());
        assert_eq!(descriptor.as_static(), Some("sqlite://"));
    }

    #[test]
    fn test_per_tenant_follows_current_tenant() {
        let current = CurrentTenant::new();
        let descriptor = BindDescriptor::per_tenant(
            current.clone(),
            HashMap::from([
                (TenantId::new("tenant1"), "sqlite:///one.db".to_string()),
                (TenantId::new("tenant2"), "sqlite:///two.db".to_string()),
            ]),
        );
        assert!(descriptor.is_dynamic());
        assert_eq!(descriptor.as_static(), None);

        current.set(TenantId::new("tenant2"));
        assert_eq!(descriptor.resolve().unwrap(), "sqlite:///two.db");
        current.set(TenantId::new("tenant1"));
        assert_eq!(descriptor.resolve().unwrap(), "sqlite:///one.db");
    }

    #[test]
    fn test_per_tenant_errors() {
        let current = CurrentTenant::new();
        let descriptor = BindDescriptor::per_tenant(current.clone(), HashMap::new());

        assert!(matches!(
            descriptor.resolve(),
            Err(BindError::Tenant(TenantError::NoCurrentTenant))
        ));

        current.set(TenantId::new("ghost"));
        assert!(matches!(
            descriptor.resolve(),
            Err(BindError::Tenant(TenantError::UnknownTenant { .. }))
        ));
    }

    #[test]
    fn test_template_placeholders() {
        let tenant = TenantId::new("acme/research");
        let rendered =
            render_template("sqlite:///{tenant}.db?h={tenant_hash}", &tenant).unwrap();
        assert_eq!(
            rendered,
            "sqlite:///acme_research-99c77fe2f5d78116.db?h=t-99c77fe2f5d78116"
        );
    }

    #[test]
    fn test_template_rejects_unsafe_tenant() {
        let current = CurrentTenant::with(TenantId::new("../../etc/passwd"));
        let descriptor = BindDescriptor::template(current, "sqlite:///{tenant}.db");
        assert!(matches!(
            descriptor.resolve(),
            Err(BindError::Tenant(TenantError::InvalidTenant { .. }))
        ));
    }

    #[test]
    fn test_debug_hides_producer() {
        let descriptor = BindDescriptor::dynamic(|| "sqlite://".to_string());
        assert_eq!(format!("{:?}", descriptor), "Dynamic(..)");
    }
}
