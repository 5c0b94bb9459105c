//! Ambient tenant context for dynamic binds.
//!
//! A bind descriptor may depend on which tenant is being served. The tenant
//! lives in a [`CurrentTenant`] handle shared between the code that switches
//! tenants and the descriptors that read it:
//!
//! ```
//! use std::collections::HashMap;
//!
//! use bindery_binds::BindDescriptor;
//! use bindery_binds::tenant::{CurrentTenant, TenantId};
//!
//! let current = CurrentTenant::new();
//! let descriptor = BindDescriptor::per_tenant(
//!     current.clone(),
//!     HashMap::from([
//!         (TenantId::new("tenant1"), "sqlite:///t1.db".to_string()),
//!         (TenantId::new("tenant2"), "sqlite:///t2.db".to_string()),
//!     ]),
//! );
//!
//! current.set(TenantId::new("tenant1"));
//! assert_eq!(descriptor.resolve().unwrap(), "sqlite:///t1.db");
//! current.set(TenantId::new("tenant2"));
//! assert_eq!(descriptor.resolve().unwrap(), "sqlite:///t2.db");
//! ```

mod current;
mod id;

pub use current::{CurrentTenant, TenantGuard};
pub use id::{MAX_SANITIZED_LENGTH, TenantId};
