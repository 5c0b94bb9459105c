//! Bindery bind resolution
//!
//! This crate routes data models to database engines by *bind key*. A model
//! declares which bind it belongs to (or inherits one from an abstract
//! ancestor); the configuration maps each bind key to a connection
//! descriptor; and a connector cache makes sure every resolved connection
//! string is backed by exactly one engine.
//!
//! # Features
//!
//! - **Static and dynamic binds**: a descriptor is either a literal
//!   connection string or a producer evaluated on every lookup
//! - **Tenant-dependent binds**: per-tenant maps and `{tenant}` templates
//!   read an ambient [`CurrentTenant`](tenant::CurrentTenant)
//! - **One engine per URL**: binds that resolve to the same string share an
//!   engine; distinct strings never do
//! - **Bind key inheritance**: abstract models pass their key down, and
//!   single-table inheritance keeps the parent table's key
//!
//! # Architecture
//!
//! - [`key`] - bind key identifiers
//! - [`url`] - connection string parsing
//! - [`descriptor`] - static and dynamic connection descriptors
//! - [`tenant`] - ambient tenant context
//! - [`config`] - programmatic and file-based configuration
//! - [`model`] - model declarations and the table registry
//! - [`backends`] - SQLite engines
//! - [`connector`] - the connector cache
//! - [`state`] - the [`Binds`] state tying it all together
//! - [`error`] - error types
//!
//! # Quick Start
//!
//! ```
//! use bindery_binds::{Binds, BindsConfig, BindDescriptor, Engine};
//! use bindery_binds::model::{Column, ModelDef};
//! use bindery_binds::tenant::{CurrentTenant, TenantId};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let current = CurrentTenant::new();
//! let config = BindsConfig::new()
//!     .with_bind("audit", "sqlite://")
//!     .with_bind("orders", BindDescriptor::template(current.clone(), "sqlite://?t={tenant}"));
//!
//! let binds = Binds::new(config)?;
//! binds.declare_model(
//!     ModelDef::new("AuditEntry")
//!         .bind_key("audit")
//!         .column(Column::integer("id").primary_key()),
//! )?;
//!
//! let acme = current.with_tenant(TenantId::new("acme"), || binds.get_engine(Some("orders")))?;
//! let globex = current.with_tenant(TenantId::new("globex"), || binds.get_engine(Some("orders")))?;
//! assert!(!Engine::same(&acme, &globex));
//!
//! let audit = binds.engine_for_model("AuditEntry")?;
//! assert_eq!(audit.url().as_str(), "sqlite://");
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod backends;
pub mod config;
pub mod connector;
pub mod descriptor;
pub mod error;
pub mod key;
pub mod model;
pub mod state;
pub mod tenant;
pub mod url;

// Re-export commonly used types at crate root
pub use backends::sqlite::Engine;
pub use config::{BindsConfig, BindsFile, ConfigWarning, DEFAULT_DATABASE_URL, EngineOptions};
pub use connector::{Connector, ConnectorCache};
pub use descriptor::BindDescriptor;
pub use error::{BindError, BindResult, ConfigError, ConnectionError, ModelError, TenantError};
pub use key::BindKey;
pub use state::Binds;

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name.
pub const NAME: &str = env!("CARGO_PKG_NAME");
