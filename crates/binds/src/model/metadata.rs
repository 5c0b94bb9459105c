//! The table registry.

use std::collections::{BTreeMap, HashSet};

use super::column::{Column, quote_identifier};
use super::naming::table_name_for;
use super::ModelDef;
use crate::error::ModelError;
use crate::key::BindKey;

/// Per-table information recorded at declaration time.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TableInfo {
    /// The bind this table belongs to. `None` is the primary bind.
    pub bind_key: Option<BindKey>,
}

/// A mapped table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Table {
    /// Table name.
    pub name: String,
    /// Columns in declaration order.
    pub columns: Vec<Column>,
    /// Bind information.
    pub info: TableInfo,
    /// Name of the model that created the table.
    pub model: String,
}

impl Table {
    /// Returns the bind key of the table.
    pub fn bind_key(&self) -> Option<&BindKey> {
        self.info.bind_key.as_ref()
    }

    /// Returns the column with the given name.
    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Returns the CREATE TABLE statement.
    pub fn create_sql(&self) -> String {
        let mut parts: Vec<String> = self.columns.iter().map(Column::definition).collect();

        let pk: Vec<String> = self
            .columns
            .iter()
            .filter(|c| c.primary_key)
            .map(|c| quote_identifier(&c.name))
            .collect();
        if !pk.is_empty() {
            parts.push(format!("PRIMARY KEY ({})", pk.join(", ")));
        }

        format!(
            "CREATE TABLE IF NOT EXISTS {} ({})",
            quote_identifier(&self.name),
            parts.join(", ")
        )
    }

    /// Returns the DROP TABLE statement.
    pub fn drop_sql(&self) -> String {
        format!("DROP TABLE IF EXISTS {}", quote_identifier(&self.name))
    }

    fn add_column(&mut self, column: Column) -> Result<(), ModelError> {
        if self.column(&column.name).is_some() {
            return Err(ModelError::DuplicateColumn {
                table: self.name.clone(),
                column: column.name,
            });
        }
        self.columns.push(column);
        Ok(())
    }
}

#[derive(Debug, Clone)]
struct MappedModel {
    def: ModelDef,
    table: Option<String>,
    bind_key: Option<BindKey>,
}

/// Registry of declared models and the tables they map to.
#[derive(Debug, Clone, Default)]
pub struct Metadata {
    models: BTreeMap<String, MappedModel>,
    tables: BTreeMap<String, Table>,
}

impl Metadata {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Declares a model.
    ///
    /// Returns the name of the table the model maps to, or `None` for
    /// abstract models.
    pub fn declare(&mut self, def: ModelDef) -> Result<Option<String>, ModelError> {
        if self.models.contains_key(&def.name) {
            return Err(ModelError::DuplicateModel { model: def.name });
        }

        let parent = match &def.extends {
            Some(parent) => Some(self.models.get(parent).ok_or_else(|| {
                ModelError::UnknownParent {
                    model: def.name.clone(),
                    parent: parent.clone(),
                }
            })?),
            None => None,
        };

        let inherited_key = parent.and_then(|p| p.bind_key.clone());
        let bind_key = def.bind_key.clone().or(inherited_key);

        if def.is_abstract {
            self.models.insert(
                def.name.clone(),
                MappedModel {
                    def,
                    table: None,
                    bind_key,
                },
            );
            return Ok(None);
        }

        let (mixin_columns, concrete_table) = self.ancestry(def.extends.as_deref());

        let (table_name, bind_key) = match (&def.table_name, concrete_table) {
            (None, Some(shared)) => {
                self.extend_shared_table(&shared, &def, mixin_columns)?;
                let key = self.tables[&shared].info.bind_key.clone();
                (shared, key)
            }
            (explicit, _) => {
                let name = explicit
                    .clone()
                    .unwrap_or_else(|| table_name_for(&def.name));
                self.create_table(&name, &def, mixin_columns, bind_key.clone())?;
                (name, bind_key)
            }
        };

        tracing::debug!(
            model = %def.name,
            table = %table_name,
            bind_key = ?bind_key,
            "Declared model"
        );

        self.models.insert(
            def.name.clone(),
            MappedModel {
                def,
                table: Some(table_name.clone()),
                bind_key,
            },
        );
        Ok(Some(table_name))
    }

    /// Walks up from `parent`, collecting columns of abstract ancestors until
    /// the first concrete ancestor, whose table is returned.
    fn ancestry<'a>(&'a self, mut parent: Option<&'a str>) -> (Vec<Column>, Option<String>) {
        let mut columns = Vec::new();
        let mut visited = HashSet::new();

        while let Some(name) = parent {
            if !visited.insert(name) {
                break;
            }
            let Some(mapped) = self.models.get(name) else {
                break;
            };
            if let Some(table) = &mapped.table {
                return (columns, Some(table.clone()));
            }
            // Nearer ancestors come first; their columns end up last in the table.
            let mut own = mapped.def.columns.clone();
            own.extend(columns);
            columns = own;
            parent = mapped.def.extends.as_deref();
        }
        (columns, None)
    }

    fn create_table(
        &mut self,
        name: &str,
        def: &ModelDef,
        mixin_columns: Vec<Column>,
        bind_key: Option<BindKey>,
    ) -> Result<(), ModelError> {
        if let Some(existing) = self.tables.get(name) {
            return Err(ModelError::TableConflict {
                table: name.to_string(),
                existing: existing.model.clone(),
            });
        }

        let mut table = Table {
            name: name.to_string(),
            columns: Vec::new(),
            info: TableInfo { bind_key },
            model: def.name.clone(),
        };
        for column in mixin_columns.into_iter().chain(def.columns.iter().cloned()) {
            table.add_column(column)?;
        }
        if table.columns.is_empty() {
            return Err(ModelError::NoColumns {
                model: def.name.clone(),
            });
        }

        self.tables.insert(name.to_string(), table);
        Ok(())
    }

    /// Adds the model's columns, and those of abstract models between it and
    /// the table owner, to a shared table. The table is replaced only when
    /// every column fits.
    fn extend_shared_table(
        &mut self,
        name: &str,
        def: &ModelDef,
        mixin_columns: Vec<Column>,
    ) -> Result<(), ModelError> {
        let Some(existing) = self.tables.get(name) else {
            return Err(ModelError::UnknownModel {
                model: def.name.clone(),
            });
        };
        let mut table = existing.clone();

        // Sibling models under the same abstract parent bring its columns again.
        for column in mixin_columns.into_iter().map(subclass_column) {
            if table.column(&column.name) != Some(&column) {
                table.add_column(column)?;
            }
        }
        for column in def.columns.iter().cloned().map(subclass_column) {
            table.add_column(column)?;
        }

        self.tables.insert(name.to_string(), table);
        Ok(())
    }

    /// Returns all tables, sorted by name.
    pub fn tables(&self) -> impl Iterator<Item = &Table> {
        self.tables.values()
    }

    /// Returns a table by name.
    pub fn table(&self, name: &str) -> Option<&Table> {
        self.tables.get(name)
    }

    /// Returns the number of tables.
    pub fn table_count(&self) -> usize {
        self.tables.len()
    }

    /// Returns the tables whose bind key equals `bind`.
    pub fn tables_for_bind(&self, bind: Option<&BindKey>) -> Vec<&Table> {
        self.tables
            .values()
            .filter(|t| t.info.bind_key.as_ref() == bind)
            .collect()
    }

    /// Returns the table a model maps to.
    pub fn model_table(&self, model: &str) -> Result<Option<&Table>, ModelError> {
        let mapped = self.mapped(model)?;
        Ok(mapped.table.as_ref().and_then(|t| self.tables.get(t)))
    }

    /// Returns the effective bind key of a model.
    pub fn model_bind_key(&self, model: &str) -> Result<Option<&BindKey>, ModelError> {
        Ok(self.mapped(model)?.bind_key.as_ref())
    }

    /// Returns `true` if the model is declared.
    pub fn contains_model(&self, model: &str) -> bool {
        self.models.contains_key(model)
    }

    /// Returns the declared model names, sorted.
    pub fn model_names(&self) -> impl Iterator<Item = &str> {
        self.models.keys().map(String::as_str)
    }

    fn mapped(&self, model: &str) -> Result<&MappedModel, ModelError> {
        self.models.get(model).ok_or_else(|| ModelError::UnknownModel {
            model: model.to_string(),
        })
    }
}

/// Rows of other models share the table, so subclass columns stay optional.
fn subclass_column(mut column: Column) -> Column {
    column.primary_key = false;
    column.nullable = true;
    column
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id() -> Column {
        Column::integer("id").primary_key()
    }

    #[test]
    fn test_bind_keys_recorded_in_table_info() {
        let mut metadata = Metadata::new();
        metadata
            .declare(ModelDef::new("Foo").bind_key("foo").column(id()))
            .unwrap();
        metadata
            .declare(ModelDef::new("Bar").bind_key("bar").column(id()))
            .unwrap();
        metadata.declare(ModelDef::new("Baz").column(id())).unwrap();

        assert_eq!(
            metadata.table("foo").unwrap().bind_key(),
            Some(&BindKey::new("foo"))
        );
        assert_eq!(
            metadata.table("bar").unwrap().bind_key(),
            Some(&BindKey::new("bar"))
        );
        assert_eq!(metadata.table("baz").unwrap().bind_key(), None);
        assert_eq!(metadata.tables_for_bind(None).len(), 1);
    }

    #[test]
    fn test_abstract_parent_contributes_key_and_columns() {
        let mut metadata = Metadata::new();
        let table = metadata
            .declare(
                ModelDef::new("Timestamped")
                    .abstract_model()
                    .bind_key("foo")
                    .column(Column::text("created_at")),
            )
            .unwrap();
        assert_eq!(table, None);

        metadata
            .declare(ModelDef::new("Event").extends("Timestamped").column(id()))
            .unwrap();

        let table = metadata.table("event").unwrap();
        assert_eq!(table.bind_key(), Some(&BindKey::new("foo")));
        let names: Vec<_> = table.columns.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["created_at", "id"]);
        assert_eq!(metadata.table_count(), 1);
    }

    #[test]
    fn test_own_key_overrides_inherited() {
        let mut metadata = Metadata::new();
        metadata
            .declare(ModelDef::new("Base").abstract_model().bind_key("foo"))
            .unwrap();
        metadata
            .declare(
                ModelDef::new("Other")
                    .extends("Base")
                    .bind_key("bar")
                    .column(id()),
            )
            .unwrap();
        assert_eq!(
            metadata.model_bind_key("Other").unwrap(),
            Some(&BindKey::new("bar"))
        );
    }

    #[test]
    fn test_single_table_inheritance() {
        let mut metadata = Metadata::new();
        metadata
            .declare(
                ModelDef::new("Base")
                    .bind_key("polymorphic_bind_key")
                    .table_name("base")
                    .column(id())
                    .column(Column::string("p_type", 50)),
            )
            .unwrap();
        let table = metadata
            .declare(
                ModelDef::new("Child1")
                    .extends("Base")
                    .column(Column::string("child_1_data", 50)),
            )
            .unwrap();

        assert_eq!(table.as_deref(), Some("base"));
        assert_eq!(metadata.table_count(), 1);

        let base = metadata.model_table("Base").unwrap().unwrap();
        let child = metadata.model_table("Child1").unwrap().unwrap();
        assert_eq!(base, child);
        assert_eq!(child.columns.len(), 3);
        assert_eq!(
            child.bind_key().map(BindKey::as_str),
            Some("polymorphic_bind_key")
        );
    }

    #[test]
    fn test_failed_subclass_leaves_shared_table_unchanged() {
        let mut metadata = Metadata::new();
        metadata
            .declare(ModelDef::new("Base").column(id()))
            .unwrap();

        let result = metadata.declare(
            ModelDef::new("Child")
                .extends("Base")
                .column(Column::text("extra"))
                .column(Column::integer("id")),
        );
        assert!(matches!(result, Err(ModelError::DuplicateColumn { .. })));
        assert!(!metadata.contains_model("Child"));

        let names: Vec<_> = metadata
            .table("base")
            .unwrap()
            .columns
            .iter()
            .map(|c| c.name.as_str())
            .collect();
        assert_eq!(names, vec!["id"]);

        // The same model declares cleanly once fixed.
        metadata
            .declare(
                ModelDef::new("Child")
                    .extends("Base")
                    .column(Column::text("extra")),
            )
            .unwrap();
        assert_eq!(metadata.table("base").unwrap().columns.len(), 2);
    }

    #[test]
    fn test_abstract_between_concrete_models_adds_columns() {
        let mut metadata = Metadata::new();
        metadata
            .declare(ModelDef::new("Base").bind_key("foo").column(id()))
            .unwrap();
        metadata
            .declare(
                ModelDef::new("Audited")
                    .abstract_model()
                    .extends("Base")
                    .column(Column::text("audited_by")),
            )
            .unwrap();
        metadata
            .declare(
                ModelDef::new("Invoice")
                    .extends("Audited")
                    .column(Column::real("amount")),
            )
            .unwrap();
        metadata
            .declare(
                ModelDef::new("Refund")
                    .extends("Audited")
                    .column(Column::text("reason")),
            )
            .unwrap();

        assert_eq!(metadata.table_count(), 1);
        let base = metadata.table("base").unwrap();
        let names: Vec<_> = base.columns.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["id", "audited_by", "amount", "reason"]);
        assert!(base.column("audited_by").unwrap().nullable);
        assert_eq!(
            metadata.model_bind_key("Refund").unwrap(),
            Some(&BindKey::new("foo"))
        );
    }

    #[test]
    fn test_declaration_errors() {
        let mut metadata = Metadata::new();
        metadata.declare(ModelDef::new("Foo").column(id())).unwrap();

        assert!(matches!(
            metadata.declare(ModelDef::new("Foo").column(id())),
            Err(ModelError::DuplicateModel { .. })
        ));
        assert!(matches!(
            metadata.declare(ModelDef::new("Orphan").extends("Missing").column(id())),
            Err(ModelError::UnknownParent { .. })
        ));
        assert!(matches!(
            metadata.declare(ModelDef::new("Empty")),
            Err(ModelError::NoColumns { .. })
        ));
        assert!(matches!(
            metadata.declare(ModelDef::new("Clash").table_name("foo").column(id())),
            Err(ModelError::TableConflict { .. })
        ));
        assert!(matches!(
            metadata.declare(
                ModelDef::new("Twice")
                    .column(Column::integer("x"))
                    .column(Column::text("x"))
            ),
            Err(ModelError::DuplicateColumn { .. })
        ));
        assert!(matches!(
            metadata.model_table("Nope"),
            Err(ModelError::UnknownModel { .. })
        ));
    }

    #[test]
    fn test_ddl() {
        let mut metadata = Metadata::new();
        metadata
            .declare(
                ModelDef::new("Foo")
                    .column(id())
                    .column(Column::string("name", 20)),
            )
            .unwrap();
        let table = metadata.table("foo").unwrap();
        assert_eq!(
            table.create_sql(),
            "CREATE TABLE IF NOT EXISTS \"foo\" (\"id\" INTEGER NOT NULL, \"name\" VARCHAR(20), PRIMARY KEY (\"id\"))"
        );
        assert_eq!(table.drop_sql(), "DROP TABLE IF EXISTS \"foo\"");
    }
}
