//! The bind state.
//!
//! [`Binds`] ties together a [`BindsConfig`], the model [`Metadata`] and a
//! [`ConnectorCache`]. Every engine lookup goes through the same path:
//! resolve the bind's descriptor to a connection string, then fetch or build
//! the connector cached under that string.

use std::collections::BTreeMap;
use std::sync::Arc;

use parking_lot::{RwLock, RwLockReadGuard};
use uuid::Uuid;

use crate::backends::sqlite::Engine;
use crate::config::BindsConfig;
use crate::connector::{Connector, ConnectorCache};
use crate::error::{BindResult, ConfigError};
use crate::key::{BindKey, display_bind};
use crate::model::{Metadata, ModelDef, Table};

/// Engines, models and connectors for one bind configuration.
///
/// # Examples
///
/// ```
/// use bindery_binds::{Binds, BindsConfig};
/// use bindery_binds::model::{Column, ModelDef};
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let binds = Binds::new(BindsConfig::new().with_bind("foo", "sqlite://"))?;
/// binds.declare_model(
///     ModelDef::new("Foo")
///         .bind_key("foo")
///         .column(Column::integer("id").primary_key()),
/// )?;
/// binds.create_all()?;
///
/// assert_eq!(binds.reflect(Some("foo"))?, vec!["foo".to_string()]);
/// assert!(binds.reflect(None)?.is_empty());
/// assert_eq!(binds.connector_count(), 2);
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct Binds {
    id: Uuid,
    config: BindsConfig,
    metadata: RwLock<Metadata>,
    connectors: ConnectorCache,
}

impl Binds {
    /// Validates `config` and creates an empty state.
    ///
    /// No engine is built until a bind is first resolved.
    pub fn new(config: BindsConfig) -> BindResult<Self> {
        for warning in config.validate()? {
            tracing::warn!(%warning, "Bind configuration warning");
        }

        let id = Uuid::new_v4();
        let connectors = ConnectorCache::new(id, config.engine.clone())
            .with_max_connectors(config.max_connectors)
            .with_pinned(config.database_url.clone());

        tracing::debug!(
            state_id = %id,
            database_url = %config.database_url,
            binds = config.binds.len(),
            "Initialized bind state"
        );

        Ok(Self {
            id,
            config,
            metadata: RwLock::new(Metadata::new()),
            connectors,
        })
    }

    /// Returns the id connectors use to name their owner.
    pub fn state_id(&self) -> Uuid {
        self.id
    }

    /// Returns the configuration.
    pub fn config(&self) -> &BindsConfig {
        &self.config
    }

    /// Returns the configured bind keys, sorted.
    pub fn bind_keys(&self) -> Vec<BindKey> {
        self.config.bind_keys()
    }

    /// Returns read access to the model registry.
    pub fn metadata(&self) -> RwLockReadGuard<'_, Metadata> {
        self.metadata.read()
    }

    /// Declares a model and returns the name of its table.
    pub fn declare_model(&self, def: ModelDef) -> BindResult<Option<String>> {
        Ok(self.metadata.write().declare(def)?)
    }

    /// Declares several models in order.
    pub fn declare_models(&self, defs: impl IntoIterator<Item = ModelDef>) -> BindResult<()> {
        let mut metadata = self.metadata.write();
        for def in defs {
            metadata.declare(def)?;
        }
        Ok(())
    }

    /// Produces the connection string a bind currently resolves to.
    ///
    /// `None` is the primary bind. Dynamic descriptors are evaluated on every
    /// call; no engine is built.
    pub fn resolve_url(&self, bind: Option<&str>) -> BindResult<String> {
        let Some(key) = bind else {
            return Ok(self.config.database_url.clone());
        };
        let descriptor = self
            .config
            .descriptor(key)
            .ok_or_else(|| ConfigError::UnknownBindKey {
                bind_key: key.to_string(),
            })?;
        descriptor.resolve()
    }

    /// Returns the engine for a bind, building it on first use.
    pub fn get_engine(&self, bind: Option<&str>) -> BindResult<Arc<Engine>> {
        let url = self.resolve_url(bind)?;
        let connector = self.connectors.get_or_create(&url)?;
        tracing::debug!(
            bind_key = bind.unwrap_or("<default>"),
            url = %url,
            engine_id = %connector.get_engine().id(),
            "Resolved engine"
        );
        Ok(connector.get_engine())
    }

    /// Returns the primary engine.
    pub fn engine(&self) -> BindResult<Arc<Engine>> {
        self.get_engine(None)
    }

    /// Returns the engine for the bind a model is mapped to.
    pub fn engine_for_model(&self, model: &str) -> BindResult<Arc<Engine>> {
        let key = {
            let metadata = self.metadata.read();
            match metadata.model_table(model)? {
                Some(table) => table.info.bind_key.clone(),
                None => metadata.model_bind_key(model)?.cloned(),
            }
        };
        self.get_engine(key.as_ref().map(BindKey::as_str))
    }

    /// Creates the tables of every bind: the primary first, then each
    /// configured key in sorted order.
    pub fn create_all(&self) -> BindResult<()> {
        for bind in self.binds_to_visit() {
            self.create_all_for(bind.as_ref().map(BindKey::as_str))?;
        }
        Ok(())
    }

    /// Creates the tables mapped to one bind.
    pub fn create_all_for(&self, bind: Option<&str>) -> BindResult<()> {
        let engine = self.get_engine(bind)?;
        let key = bind.map(BindKey::new);
        let metadata = self.metadata.read();
        let tables = metadata.tables_for_bind(key.as_ref());

        engine.create_tables(&tables)?;
        tracing::info!(
            bind_key = display_bind(key.as_ref()),
            url = %engine.url(),
            tables = tables.len(),
            "Created tables"
        );
        Ok(())
    }

    /// Drops the tables of every bind.
    pub fn drop_all(&self) -> BindResult<()> {
        for bind in self.binds_to_visit() {
            self.drop_all_for(bind.as_ref().map(BindKey::as_str))?;
        }
        Ok(())
    }

    /// Drops the tables mapped to one bind.
    pub fn drop_all_for(&self, bind: Option<&str>) -> BindResult<()> {
        let engine = self.get_engine(bind)?;
        let key = bind.map(BindKey::new);
        let metadata = self.metadata.read();
        let tables = metadata.tables_for_bind(key.as_ref());

        engine.drop_tables(&tables)?;
        tracing::info!(
            bind_key = display_bind(key.as_ref()),
            url = %engine.url(),
            tables = tables.len(),
            "Dropped tables"
        );
        Ok(())
    }

    /// Maps every table to the engine of its bind.
    pub fn get_binds(&self) -> BindResult<BTreeMap<String, Arc<Engine>>> {
        let tables: Vec<(String, Option<BindKey>)> = self
            .metadata
            .read()
            .tables()
            .map(|t: &Table| (t.name.clone(), t.info.bind_key.clone()))
            .collect();

        let mut binds = BTreeMap::new();
        for (name, key) in tables {
            let engine = self.get_engine(key.as_ref().map(BindKey::as_str))?;
            binds.insert(name, engine);
        }
        Ok(binds)
    }

    /// Lists the tables that exist in a bind's database.
    pub fn reflect(&self, bind: Option<&str>) -> BindResult<Vec<String>> {
        Ok(self.get_engine(bind)?.table_names()?)
    }

    /// Returns every cached connector, sorted by URL.
    pub fn connectors(&self) -> Vec<Arc<Connector>> {
        self.connectors.connectors()
    }

    /// Returns the number of cached connectors.
    pub fn connector_count(&self) -> usize {
        self.connectors.len()
    }

    /// Returns the connector cached for a connection string.
    pub fn connector(&self, url: &str) -> Option<Arc<Connector>> {
        self.connectors.get(url)
    }

    /// Drops every cached connector.
    ///
    /// Engines still referenced elsewhere stay usable; the next lookup builds
    /// fresh ones.
    pub fn dispose(&self) {
        self.connectors.clear();
    }

    fn binds_to_visit(&self) -> Vec<Option<BindKey>> {
        std::iter::once(None)
            .chain(self.bind_keys().into_iter().map(Some))
            .collect()
    }
}
