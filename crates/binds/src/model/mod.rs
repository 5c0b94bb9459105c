//! Declarative models and the table registry.
//!
//! Models are declared with [`ModelDef`] and registered in a [`Metadata`]
//! registry, which maps each concrete model to a [`Table`] and records the
//! table's bind key in [`TableInfo`].
//!
//! # Bind key inheritance
//!
//! A model without its own bind key takes the key of its nearest ancestor
//! that declares one. Abstract models own no table; they contribute their
//! bind key and columns to concrete descendants.
//!
//! ```
//! use bindery_binds::model::{Column, Metadata, ModelDef};
//!
//! let mut metadata = Metadata::new();
//! metadata
//!     .declare(ModelDef::new("AbstractFooBoundModel").abstract_model().bind_key("foo"))
//!     .unwrap();
//! metadata
//!     .declare(
//!         ModelDef::new("FooBoundModel")
//!             .extends("AbstractFooBoundModel")
//!             .column(Column::integer("id").primary_key()),
//!     )
//!     .unwrap();
//!
//! let table = metadata.table("foo_bound_model").unwrap();
//! assert_eq!(table.info.bind_key.as_ref().map(|k| k.as_str()), Some("foo"));
//! ```
//!
//! # Single-table inheritance
//!
//! A concrete model extending a concrete parent, without naming a table of
//! its own, shares the parent's table. Its extra columns are added to that
//! table as nullable columns.

mod column;
mod metadata;
mod naming;

pub use column::{Column, ColumnType};
pub use metadata::{Metadata, Table, TableInfo};
pub use naming::table_name_for;

use serde::{Deserialize, Serialize};

use crate::key::BindKey;

/// Declaration of a data model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelDef {
    /// Model name, unique within a registry.
    pub name: String,

    /// Explicit table name. Derived from the model name when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub table_name: Option<String>,

    /// Bind key declared on this model.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bind_key: Option<BindKey>,

    /// Abstract models own no table.
    #[serde(default, rename = "abstract")]
    pub is_abstract: bool,

    /// Name of the parent model.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extends: Option<String>,

    /// Columns declared on this model.
    #[serde(default)]
    pub columns: Vec<Column>,
}

impl ModelDef {
    /// Starts a concrete model declaration.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            table_name: None,
            bind_key: None,
            is_abstract: false,
            extends: None,
            columns: Vec::new(),
        }
    }

    /// Routes the model to a bind.
    pub fn bind_key(mut self, key: impl Into<BindKey>) -> Self {
        self.bind_key = Some(key.into());
        self
    }

    /// Sets an explicit table name.
    pub fn table_name(mut self, name: impl Into<String>) -> Self {
        self.table_name = Some(name.into());
        self
    }

    /// Marks the model abstract.
    pub fn abstract_model(mut self) -> Self {
        self.is_abstract = true;
        self
    }

    /// Declares the parent model.
    pub fn extends(mut self, parent: impl Into<String>) -> Self {
        self.extends = Some(parent.into());
        self
    }

    /// Adds a column.
    pub fn column(mut self, column: Column) -> Self {
        self.columns.push(column);
        self
    }
}
