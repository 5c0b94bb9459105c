//! DDL and reflection against a single SQLite connection.

use rusqlite::Connection;

use crate::model::Table;

/// Lists user tables, skipping SQLite's internal ones.
pub(crate) fn table_names(conn: &Connection) -> rusqlite::Result<Vec<String>> {
    let mut stmt = conn.prepare(
        "SELECT name FROM sqlite_master \
         WHERE type = 'table' AND substr(name, 1, 7) <> 'sqlite_' \
         ORDER BY name",
    )?;
    let names = stmt
        .query_map([], |row| row.get::<_, String>(0))?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(names)
}

/// Returns `true` if a user table with this name exists.
pub(crate) fn has_table(conn: &Connection, name: &str) -> rusqlite::Result<bool> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?1",
        [name],
        |row| row.get(0),
    )?;
    Ok(count > 0)
}

/// Creates the given tables in one transaction. Existing tables are kept.
pub(crate) fn create_tables(conn: &mut Connection, tables: &[&Table]) -> rusqlite::Result<()> {
    let tx = conn.transaction()?;
    for table in tables {
        tx.execute_batch(&table.create_sql())?;
    }
    tx.commit()
}

/// Drops the given tables in reverse order in one transaction.
pub(crate) fn drop_tables(conn: &mut Connection, tables: &[&Table]) -> rusqlite::Result<()> {
    let tx = conn.transaction()?;
    for table in tables.iter().rev() {
        tx.execute_batch(&table.drop_sql())?;
    }
    tx.commit()
}
