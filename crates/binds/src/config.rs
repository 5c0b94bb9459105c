//! Bind configuration.
//!
//! [`BindsConfig`] maps bind keys to [descriptors](BindDescriptor) and holds
//! the options every engine is built with. Because dynamic descriptors hold
//! closures, `BindsConfig` itself is built programmatically; file-based setups
//! go through [`BindsFile`], which deserializes from JSON and is converted with
//! [`BindsFile::to_config`].
//!
//! # Example
//!
//! ```
//! use bindery_binds::BindsConfig;
//!
//! let config = BindsConfig::new()
//!     .with_database_url("sqlite:///app.db")
//!     .with_bind("reporting", "sqlite:///reporting.db")
//!     .with_dynamic_bind("scratch", || "sqlite://".to_string());
//!
//! assert!(config.validate().is_ok());
//! assert_eq!(config.bind_keys().len(), 2);
//! ```

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::descriptor::BindDescriptor;
use crate::error::ConfigError;
use crate::key::BindKey;
use crate::model::ModelDef;
use crate::tenant::{CurrentTenant, TenantId};
use crate::url::DatabaseUrl;

/// Primary connection string used when none is configured.
pub const DEFAULT_DATABASE_URL: &str = "sqlite:///:memory:";

/// Options applied to every engine the connector cache builds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineOptions {
    /// Maximum number of connections per file-backed engine.
    /// In-memory engines always use a single connection.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    /// How long a checkout waits for a free connection.
    #[serde(with = "humantime_serde", default = "default_connection_timeout")]
    pub connection_timeout: Duration,

    /// SQLite busy timeout.
    #[serde(with = "humantime_serde", default = "default_busy_timeout")]
    pub busy_timeout: Duration,

    /// Enable foreign key constraints on every connection.
    #[serde(default = "default_true")]
    pub enable_foreign_keys: bool,

    /// Enable WAL journaling for file databases.
    #[serde(default = "default_true")]
    pub enable_wal: bool,
}

fn default_max_connections() -> u32 {
    10
}

fn default_connection_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_busy_timeout() -> Duration {
    Duration::from_secs(5)
}

fn default_true() -> bool {
    true
}

fn default_database_url() -> String {
    DEFAULT_DATABASE_URL.to_string()
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            max_connections: default_max_connections(),
            connection_timeout: default_connection_timeout(),
            busy_timeout: default_busy_timeout(),
            enable_foreign_keys: true,
            enable_wal: true,
        }
    }
}

impl EngineOptions {
    /// Rejects option values a connection pool cannot be built with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_connections == 0 {
            return Err(ConfigError::InvalidOption {
                option: "max_connections".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }
        if self.connection_timeout.is_zero() {
            return Err(ConfigError::InvalidOption {
                option: "connection_timeout".to_string(),
                reason: "must be non-zero".to_string(),
            });
        }
        Ok(())
    }

    /// Sets the maximum pool size for file-backed engines.
    pub fn with_max_connections(mut self, max: u32) -> Self {
        self.max_connections = max;
        self
    }

    /// Sets the checkout timeout.
    pub fn with_connection_timeout(mut self, timeout: Duration) -> Self {
        self.connection_timeout = timeout;
        self
    }

    /// Sets the SQLite busy timeout.
    pub fn with_busy_timeout(mut self, timeout: Duration) -> Self {
        self.busy_timeout = timeout;
        self
    }

    /// Disables WAL journaling.
    pub fn without_wal(mut self) -> Self {
        self.enable_wal = false;
        self
    }
}

/// Configuration for a set of binds.
#[derive(Debug, Clone)]
pub struct BindsConfig {
    /// Connection string of the primary (keyless) bind.
    pub database_url: String,

    /// Descriptors for the named binds.
    pub binds: HashMap<BindKey, BindDescriptor>,

    /// Options for every engine.
    pub engine: EngineOptions,

    /// Maximum number of cached connectors.
    ///
    /// When exceeded, the least recently resolved connector other than the
    /// primary and the one just created is dropped, so the cap must be at
    /// least 2. `None` keeps every connector for the lifetime of the cache.
    pub max_connectors: Option<usize>,
}

impl Default for BindsConfig {
    fn default() -> Self {
        Self {
            database_url: default_database_url(),
            binds: HashMap::new(),
            engine: EngineOptions::default(),
            max_connectors: None,
        }
    }
}

impl BindsConfig {
    /// Creates a configuration with an in-memory primary and no binds.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the primary connection string.
    pub fn with_database_url(mut self, url: impl Into<String>) -> Self {
        self.database_url = url.into();
        self
    }

    /// Adds or replaces a bind.
    pub fn with_bind(
        mut self,
        key: impl Into<BindKey>,
        descriptor: impl Into<BindDescriptor>,
    ) -> Self {
        self.binds.insert(key.into(), descriptor.into());
        self
    }

    /// Adds a bind whose connection string is produced at resolution time.
    pub fn with_dynamic_bind<F>(self, key: impl Into<BindKey>, producer: F) -> Self
    where
        F: Fn() -> String + Send + Sync + 'static,
    {
        self.with_bind(key, BindDescriptor::dynamic(producer))
    }

    /// Sets the engine options.
    pub fn with_engine_options(mut self, options: EngineOptions) -> Self {
        self.engine = options;
        self
    }

    /// Caps the number of cached connectors.
    pub fn with_max_connectors(mut self, max: usize) -> Self {
        self.max_connectors = Some(max);
        self
    }

    /// Returns the descriptor for a bind key.
    pub fn descriptor(&self, key: &str) -> Option<&BindDescriptor> {
        self.binds.get(key)
    }

    /// Returns the configured bind keys, sorted.
    pub fn bind_keys(&self) -> Vec<BindKey> {
        let mut keys: Vec<_> = self.binds.keys().cloned().collect();
        keys.sort();
        keys
    }

    /// Validates the configuration and returns any warnings.
    pub fn validate(&self) -> Result<Vec<ConfigWarning>, ConfigError> {
        let mut warnings = Vec::new();

        DatabaseUrl::parse(&self.database_url)?;

        self.engine.validate()?;

        if matches!(self.max_connectors, Some(max) if max < 2) {
            return Err(ConfigError::InvalidOption {
                option: "max_connectors".to_string(),
                reason: "must be at least 2 when set".to_string(),
            });
        }

        let mut by_url: BTreeMap<&str, Vec<BindKey>> = BTreeMap::new();
        for key in self.bind_keys() {
            if key.as_str().trim().is_empty() {
                return Err(ConfigError::EmptyBindKey);
            }
            match &self.binds[&key] {
                BindDescriptor::Static(url) => {
                    DatabaseUrl::parse(url)?;
                    by_url.entry(url.as_str()).or_default().push(key);
                }
                BindDescriptor::Dynamic(_) => {
                    warnings.push(ConfigWarning::DynamicBindUnchecked { bind_key: key });
                }
            }
        }

        for (url, keys) in by_url {
            if keys.len() > 1 || url == self.database_url {
                warnings.push(ConfigWarning::SharedConnection {
                    url: url.to_string(),
                    bind_keys: keys,
                });
            }
        }

        Ok(warnings)
    }
}

/// Non-fatal configuration findings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigWarning {
    /// A dynamic descriptor can only be checked when it is resolved.
    DynamicBindUnchecked {
        /// The dynamic bind.
        bind_key: BindKey,
    },

    /// Several binds resolve to one connection string and will share one engine.
    SharedConnection {
        /// The shared connection string.
        url: String,
        /// The binds sharing it (the primary is implied when the URL matches it).
        bind_keys: Vec<BindKey>,
    },
}

impl fmt::Display for ConfigWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigWarning::DynamicBindUnchecked { bind_key } => {
                write!(
                    f,
                    "bind '{}' is dynamic - its connection string is checked at resolution time",
                    bind_key
                )
            }
            ConfigWarning::SharedConnection { url, bind_keys } => {
                let keys: Vec<_> = bind_keys.iter().map(BindKey::as_str).collect();
                write!(f, "binds {:?} share the engine for {}", keys, url)
            }
        }
    }
}

/// How a bind's connection string is given in a configuration file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BindSource {
    /// A literal connection string.
    Url(String),

    /// One connection string per tenant.
    Tenants {
        /// Tenant to connection string.
        tenants: HashMap<TenantId, String>,
    },

    /// A connection template rendered for the current tenant.
    Template {
        /// Template with `{tenant}` / `{tenant_hash}` placeholders.
        template: String,
    },
}

impl BindSource {
    /// Converts the source into a descriptor reading the given tenant handle.
    pub fn to_descriptor(&self, current: &CurrentTenant) -> BindDescriptor {
        match self {
            BindSource::Url(url) => BindDescriptor::fixed(url.clone()),
            BindSource::Tenants { tenants } => {
                BindDescriptor::per_tenant(current.clone(), tenants.clone())
            }
            BindSource::Template { template } => {
                BindDescriptor::template(current.clone(), template.clone())
            }
        }
    }
}

/// The on-disk configuration format.
///
/// ```
/// use bindery_binds::config::BindsFile;
/// use bindery_binds::tenant::CurrentTenant;
///
/// let file = BindsFile::from_json_str(r#"{
///     "database_url": "sqlite:///main.db",
///     "binds": {
///         "audit": "sqlite:///audit.db",
///         "orders": { "template": "sqlite:///orders_{tenant}.db" }
///     },
///     "engine": { "busy_timeout": "2s" },
///     "models": [
///         { "name": "AuditEntry", "bind_key": "audit",
///           "columns": [{ "name": "id", "type": "integer", "primary_key": true }] }
///     ]
/// }"#).unwrap();
///
/// let config = file.to_config(&CurrentTenant::new()).unwrap();
/// assert_eq!(config.bind_keys().len(), 2);
/// assert_eq!(file.models.len(), 1);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BindsFile {
    /// Primary connection string.
    #[serde(default = "default_database_url")]
    pub database_url: String,

    /// Named binds.
    #[serde(default)]
    pub binds: BTreeMap<String, BindSource>,

    /// Engine options.
    #[serde(default)]
    pub engine: EngineOptions,

    /// Connector cache cap.
    #[serde(default)]
    pub max_connectors: Option<usize>,

    /// Models to declare.
    #[serde(default)]
    pub models: Vec<ModelDef>,
}

impl BindsFile {
    /// Reads a configuration file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| ConfigError::Load {
            source_name: path.display().to_string(),
            message: e.to_string(),
        })?;
        Self::parse_named(&text, &path.display().to_string())
    }

    /// Parses a configuration from a JSON string.
    pub fn from_json_str(text: &str) -> Result<Self, ConfigError> {
        Self::parse_named(text, "<string>")
    }

    fn parse_named(text: &str, source_name: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(text).map_err(|e| ConfigError::Load {
            source_name: source_name.to_string(),
            message: e.to_string(),
        })
    }

    /// Builds a [`BindsConfig`], wiring tenant-dependent binds to `current`.
    pub fn to_config(&self, current: &CurrentTenant) -> Result<BindsConfig, ConfigError> {
        let mut config = BindsConfig::new()
            .with_database_url(self.database_url.clone())
            .with_engine_options(self.engine.clone());
        config.max_connectors = self.max_connectors;

        for (key, source) in &self.binds {
            let key = BindKey::parse(key.clone())?;
            config.binds.insert(key, source.to_descriptor(current));
        }
        Ok(config)
    }
}

/// Serde module for Duration with humantime format.
mod humantime_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&humantime::format_duration(*duration).to_string())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        humantime::parse_duration(&s).map_err(serde::de::Error::custom)
    }
}
