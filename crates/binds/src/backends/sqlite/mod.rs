//! SQLite engines.
//!
//! An [`Engine`] owns an r2d2 pool for one connection string. Pools are built
//! lazily: nothing is opened, and no database file is created, until the
//! first connection is checked out.
//!
//! # Example
//!
//! ```
//! use bindery_binds::backends::sqlite::Engine;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let engine = Engine::in_memory()?;
//! engine.execute_batch("CREATE TABLE foo (id INTEGER PRIMARY KEY)")?;
//! assert_eq!(engine.table_names()?, vec!["foo".to_string()]);
//! # Ok(())
//! # }
//! ```
//!
//! # In-memory databases
//!
//! SQLite gives every connection to `:memory:` its own database. An in-memory
//! engine therefore keeps exactly one connection alive for its whole lifetime,
//! and every caller of that engine sees the same tables.

mod engine;
pub(crate) mod schema;

pub use engine::Engine;
