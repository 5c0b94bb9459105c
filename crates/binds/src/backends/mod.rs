//! Database engine implementations.
//!
//! Every resolved connection string is opened through an engine from this
//! module. SQLite is the only driver; other schemes are rejected when the URL
//! is parsed.
//!
//! | Backend | Schemes | Description |
//! |---------|---------|-------------|
//! | SQLite | `sqlite`, `sqlite3`, `sqlite+<driver>` | embedded database, file or in-memory |

pub mod sqlite;
