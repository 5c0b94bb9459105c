//! Column declarations.

use serde::{Deserialize, Serialize};

/// Storage type of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnType {
    /// 64-bit integer.
    Integer,
    /// Character data with an optional declared length.
    String,
    /// Unbounded text.
    Text,
    /// Boolean stored as 0/1.
    Boolean,
    /// Floating point.
    Real,
    /// Raw bytes.
    Blob,
}

/// A column of a model's table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Column {
    /// Column name.
    pub name: String,

    /// Storage type.
    #[serde(rename = "type")]
    pub ty: ColumnType,

    /// Declared length for string columns.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub length: Option<u32>,

    /// Part of the primary key.
    #[serde(default)]
    pub primary_key: bool,

    /// Accepts NULL. Primary key columns never do.
    #[serde(default = "default_nullable")]
    pub nullable: bool,
}

fn default_nullable() -> bool {
    true
}

impl Column {
    /// Creates a nullable column.
    pub fn new(name: impl Into<String>, ty: ColumnType) -> Self {
        Self {
            name: name.into(),
            ty,
            length: None,
            primary_key: false,
            nullable: true,
        }
    }

    /// Creates an integer column.
    pub fn integer(name: impl Into<String>) -> Self {
        Self::new(name, ColumnType::Integer)
    }

    /// Creates a string column with a declared length.
    pub fn string(name: impl Into<String>, length: u32) -> Self {
        Self {
            length: Some(length),
            ..Self::new(name, ColumnType::String)
        }
    }

    /// Creates a text column.
    pub fn text(name: impl Into<String>) -> Self {
        Self::new(name, ColumnType::Text)
    }

    /// Creates a boolean column.
    pub fn boolean(name: impl Into<String>) -> Self {
        Self::new(name, ColumnType::Boolean)
    }

    /// Creates a floating point column.
    pub fn real(name: impl Into<String>) -> Self {
        Self::new(name, ColumnType::Real)
    }

    /// Creates a blob column.
    pub fn blob(name: impl Into<String>) -> Self {
        Self::new(name, ColumnType::Blob)
    }

    /// Marks the column as (part of) the primary key.
    pub fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self.nullable = false;
        self
    }

    /// Marks the column NOT NULL.
    pub fn not_null(mut self) -> Self {
        self.nullable = false;
        self
    }

    /// Returns the SQLite type name used in DDL.
    pub fn sql_type(&self) -> String {
        match (self.ty, self.length) {
            (ColumnType::Integer, _) => "INTEGER".to_string(),
            (ColumnType::String, Some(len)) => format!("VARCHAR({})", len),
            (ColumnType::String, None) => "VARCHAR".to_string(),
            (ColumnType::Text, _) => "TEXT".to_string(),
            (ColumnType::Boolean, _) => "BOOLEAN".to_string(),
            (ColumnType::Real, _) => "REAL".to_string(),
            (ColumnType::Blob, _) => "BLOB".to_string(),
        }
    }

    /// Returns the column definition as it appears in CREATE TABLE.
    pub fn definition(&self) -> String {
        let mut def = format!("{} {}", quote_identifier(&self.name), self.sql_type());
        if self.primary_key || !self.nullable {
            def.push_str(" NOT NULL");
        }
        def
    }
}

/// Quotes an identifier for safe use in SQL.
pub(crate) fn quote_identifier(id: &str) -> String {
    format!("\"{}\"", id.replace('"', "\"\""))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_definitions() {
        assert_eq!(
            Column::integer("id").primary_key().definition(),
            "\"id\" INTEGER NOT NULL"
        );
        assert_eq!(
            Column::string("p_type", 50).definition(),
            "\"p_type\" VARCHAR(50)"
        );
        assert_eq!(Column::text("body").not_null().definition(), "\"body\" TEXT NOT NULL");
    }

    #[test]
    fn test_quote_identifier_escapes() {
        assert_eq!(quote_identifier("we\"ird"), "\"we\"\"ird\"");
    }

    #[test]
    fn test_deserialize_defaults() {
        let column: Column =
            serde_json::from_str(r#"{"name": "id", "type": "integer", "primary_key": true}"#)
                .unwrap();
        assert_eq!(column.ty, ColumnType::Integer);
        assert!(column.primary_key);
        // nullable defaults to true in the file format; primary keys still render NOT NULL
        assert!(column.definition().ends_with("NOT NULL"));

        let column: Column =
            serde_json::from_str(r#"{"name": "kind", "type": "string", "length": 20}"#).unwrap();
        assert_eq!(column.sql_type(), "VARCHAR(20)");
        assert!(column.nullable);
    }
}
