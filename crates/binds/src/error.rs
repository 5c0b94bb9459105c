//! Error types for bind resolution.
//!
//! Errors are grouped by concern: configuration, engine connections, model
//! declaration and ambient tenant context. All of them fold into [`BindError`].

// Error enum variant fields are self-documenting via their #[error(...)] messages
#![allow(missing_docs)]

use thiserror::Error;

/// The primary error type for all bind operations.
#[derive(Error, Debug)]
pub enum BindError {
    /// Configuration errors
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Engine and connection errors
    #[error(transparent)]
    Connection(#[from] ConnectionError),

    /// Model declaration errors
    #[error(transparent)]
    Model(#[from] ModelError),

    /// Ambient tenant errors
    #[error(transparent)]
    Tenant(#[from] TenantError),
}

/// Errors in the bind configuration or in a connection string.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// The connection string is not of the form `scheme://...`.
    #[error("invalid database URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    /// The connection string names a driver that has no engine implementation.
    #[error("unsupported database driver '{driver}' in URL '{url}'")]
    UnsupportedDriver { driver: String, url: String },

    /// A bind key was requested that is not configured.
    #[error("bind key '{bind_key}' is not configured")]
    UnknownBindKey { bind_key: String },

    /// Bind keys must be non-empty.
    #[error("bind keys must not be empty")]
    EmptyBindKey,

    /// An engine option is out of range.
    #[error("invalid engine option {option}: {reason}")]
    InvalidOption { option: String, reason: String },

    /// The configuration file could not be read or parsed.
    #[error("failed to load configuration from {source_name}: {message}")]
    Load {
        source_name: String,
        message: String,
    },
}

/// Errors raised by engines and their connection pools.
#[derive(Error, Debug)]
pub enum ConnectionError {
    /// A connection could not be checked out of the pool.
    #[error("failed to connect to {url}: {message}")]
    ConnectionFailed { url: String, message: String },

    /// A statement failed on an engine.
    #[error("statement failed on {url}: {message}")]
    Statement {
        url: String,
        message: String,
        #[source]
        source: Option<rusqlite::Error>,
    },

    /// The engine did not answer a health probe.
    #[error("engine {url} is unavailable: {message}")]
    Unavailable { url: String, message: String },
}

/// Errors raised while declaring models.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ModelError {
    /// A model with this name was already declared.
    #[error("model '{model}' is already declared")]
    DuplicateModel { model: String },

    /// A model extends a parent that was never declared.
    #[error("model '{model}' extends unknown model '{parent}'")]
    UnknownParent { model: String, parent: String },

    /// A model lookup failed.
    #[error("model '{model}' is not declared")]
    UnknownModel { model: String },

    /// Two columns with the same name ended up in one table.
    #[error("column '{column}' is declared twice in table '{table}'")]
    DuplicateColumn { table: String, column: String },

    /// Two concrete models claim the same table without inheriting from each other.
    #[error("table '{table}' is already mapped by model '{existing}'")]
    TableConflict { table: String, existing: String },

    /// A concrete model without any columns cannot be mapped to a table.
    #[error("model '{model}' has no columns")]
    NoColumns { model: String },
}

/// Errors raised while resolving a descriptor against the ambient tenant.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TenantError {
    /// A tenant-dependent descriptor was resolved with no tenant set.
    #[error("no current tenant set while resolving a tenant-dependent bind")]
    NoCurrentTenant,

    /// The ambient tenant has no entry in a per-tenant descriptor.
    #[error("tenant '{tenant_id}' has no connection configured")]
    UnknownTenant { tenant_id: String },

    /// A tenant id cannot be used in a connection template.
    #[error("invalid tenant '{tenant_id}': {reason}")]
    InvalidTenant { tenant_id: String, reason: String },
}

/// Result type for bind operations.
pub type BindResult<T> = Result<T, BindError>;

impl BindError {
    /// Returns `true` when the error originates from configuration rather than runtime state.
    pub fn is_config(&self) -> bool {
        matches!(self, BindError::Config(_))
    }
}
