//! Database connection strings.
//!
//! [`DatabaseUrl`] parses `scheme://location` URLs and keeps the original text,
//! so an engine always reports exactly the string it was configured with.
//!
//! | URL | Location |
//! |-----|----------|
//! | `sqlite://` | private in-memory database |
//! | `sqlite:///:memory:` | private in-memory database |
//! | `sqlite:///data/app.db` | relative file `data/app.db` |
//! | `sqlite:////var/db/app.db` | absolute file `/var/db/app.db` |
//!
//! Query parameters `timeout=<seconds>` and `mode=ro` are honored.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::LazyLock;
use std::time::Duration;

use regex::Regex;

use crate::error::ConfigError;

static URL_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([A-Za-z][A-Za-z0-9+.\-]*)://(.*)$").expect("URL pattern is valid")
});

const MEMORY_PATH: &str = ":memory:";

/// Where a SQLite database lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SqliteLocation {
    /// A private in-memory database owned by one engine.
    Memory,
    /// A database file.
    File(PathBuf),
}

/// A parsed connection string.
///
/// # Examples
///
/// ```
/// use bindery_binds::url::{DatabaseUrl, SqliteLocation};
///
/// let url = DatabaseUrl::parse("sqlite:////tmp/app.db").unwrap();
/// assert_eq!(url.location(), &SqliteLocation::File("/tmp/app.db".into()));
/// assert_eq!(url.to_string(), "sqlite:////tmp/app.db");
///
/// let url = DatabaseUrl::parse("sqlite://").unwrap();
/// assert!(url.is_memory());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseUrl {
    raw: String,
    driver: String,
    location: SqliteLocation,
    options: BTreeMap<String, String>,
}

impl DatabaseUrl {
    /// Parses a connection string.
    pub fn parse(raw: &str) -> Result<Self, ConfigError> {
        let captures = URL_PATTERN.captures(raw).ok_or_else(|| ConfigError::InvalidUrl {
            url: raw.to_string(),
            reason: "expected <scheme>://<location>".to_string(),
        })?;

        let scheme = &captures[1];
        let rest = &captures[2];
        let driver = scheme.split('+').next().unwrap_or(scheme).to_lowercase();

        if driver != "sqlite" && driver != "sqlite3" {
            return Err(ConfigError::UnsupportedDriver {
                driver,
                url: raw.to_string(),
            });
        }

        let (location_part, query) = match rest.split_once('?') {
            Some((location, query)) => (location, Some(query)),
            None => (rest, None),
        };

        let location = parse_location(raw, location_part)?;
        let options = query.map(parse_query).unwrap_or_default();

        let url = Self {
            raw: raw.to_string(),
            driver,
            location,
            options,
        };
        // Reject malformed option values up front rather than at engine creation.
        url.busy_timeout_override()?;
        Ok(url)
    }

    /// Builds a `sqlite:///` URL for a file path.
    ///
    /// Absolute paths produce the four-slash form.
    pub fn sqlite_file(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        let raw = format!("sqlite:///{}", path.display());
        Self {
            raw,
            driver: "sqlite".to_string(),
            location: SqliteLocation::File(path.to_path_buf()),
            options: BTreeMap::new(),
        }
    }

    /// Returns the original connection string.
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Returns the normalized driver name.
    pub fn driver(&self) -> &str {
        &self.driver
    }

    /// Returns the database location.
    pub fn location(&self) -> &SqliteLocation {
        &self.location
    }

    /// Returns `true` for in-memory databases.
    pub fn is_memory(&self) -> bool {
        self.location == SqliteLocation::Memory
    }

    /// Returns the raw query options.
    pub fn options(&self) -> &BTreeMap<String, String> {
        &self.options
    }

    /// Returns `true` when the URL asks for a read-only connection.
    pub fn is_read_only(&self) -> bool {
        self.options.get("mode").is_some_and(|m| m == "ro")
    }

    /// Returns the busy timeout requested through `?timeout=<seconds>`.
    pub fn busy_timeout_override(&self) -> Result<Option<Duration>, ConfigError> {
        let Some(value) = self.options.get("timeout") else {
            return Ok(None);
        };
        let seconds: f64 = value.parse().map_err(|_| ConfigError::InvalidUrl {
            url: self.raw.clone(),
            reason: format!("timeout must be a number of seconds, got '{}'", value),
        })?;
        if !seconds.is_finite() || seconds < 0.0 {
            return Err(ConfigError::InvalidUrl {
                url: self.raw.clone(),
                reason: format!("timeout must be non-negative, got '{}'", value),
            });
        }
        Ok(Some(Duration::from_secs_f64(seconds)))
    }
}

fn parse_location(raw: &str, location: &str) -> Result<SqliteLocation, ConfigError> {
    if location.is_empty() {
        return Ok(SqliteLocation::Memory);
    }

    let Some(path) = location.strip_prefix('/') else {
        return Err(ConfigError::InvalidUrl {
            url: raw.to_string(),
            reason: "sqlite URLs take no host; use sqlite:///<path>".to_string(),
        });
    };

    if path.is_empty() || path == MEMORY_PATH {
        Ok(SqliteLocation::Memory)
    } else {
        Ok(SqliteLocation::File(PathBuf::from(path)))
    }
}

fn parse_query(query: &str) -> BTreeMap<String, String> {
    query
        .split('&')
        .filter(|pair| !pair.is_empty())
        .map(|pair| match pair.split_once('=') {
            Some((k, v)) => (k.to_string(), v.to_string()),
            None => (pair.to_string(), String::new()),
        })
        .collect()
}

impl fmt::Display for DatabaseUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl FromStr for DatabaseUrl {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}
