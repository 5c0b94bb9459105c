//! Command line configuration.
//!
//! # Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `BINDERY_CONFIG` | (none) | Path to a JSON binds file |
//! | `BINDERY_DATABASE_URL` | `sqlite:///:memory:` | Overrides the primary connection string |
//! | `BINDERY_TENANT` | (none) | Tenant that dynamic binds resolve for |
//! | `BINDERY_LOG_LEVEL` | info | Log level |

use std::path::PathBuf;

use anyhow::Context;
use bindery_binds::Binds;
use bindery_binds::config::BindsFile;
use bindery_binds::tenant::{CurrentTenant, TenantId};
use clap::{Parser, Subcommand};

const LOG_LEVELS: [&str; 5] = ["error", "warn", "info", "debug", "trace"];

/// Command line configuration for the bindery tool.
#[derive(Debug, Clone, Parser)]
#[command(name = "bindery")]
#[command(about = "Resolve bind keys and manage the databases behind them")]
pub struct CliConfig {
    /// Path to a JSON binds file.
    #[arg(short, long, env = "BINDERY_CONFIG")]
    pub config: Option<PathBuf>,

    /// Primary connection string, overriding the file.
    #[arg(long, env = "BINDERY_DATABASE_URL")]
    pub database_url: Option<String>,

    /// Tenant that tenant-dependent binds resolve for.
    #[arg(short, long, env = "BINDERY_TENANT")]
    pub tenant: Option<String>,

    /// Log level (error, warn, info, debug, trace).
    #[arg(long, env = "BINDERY_LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    #[command(subcommand)]
    pub command: Command,
}

/// Subcommands.
#[derive(Debug, Clone, PartialEq, Eq, Subcommand)]
pub enum Command {
    /// Create every model table in its bind's database.
    CreateAll,

    /// Drop every model table from its bind's database.
    DropAll,

    /// Print the connection string a bind resolves to.
    Resolve {
        /// Bind key; the primary bind when omitted.
        bind: Option<String>,
    },

    /// List the tables present in a bind's database.
    Reflect {
        /// Bind key; the primary bind when omitted.
        bind: Option<String>,
    },

    /// Open every bind and run a health probe.
    Check,

    /// List configured binds and declared models.
    Binds,
}

impl CliConfig {
    /// Validates the configuration, collecting every problem found.
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if !LOG_LEVELS.contains(&self.log_level.to_lowercase().as_str()) {
            errors.push(format!(
                "Log level must be one of {}, got '{}'",
                LOG_LEVELS.join(", "),
                self.log_level
            ));
        }

        if let Some(tenant) = &self.tenant {
            if tenant.trim().is_empty() {
                errors.push("Tenant cannot be empty".to_string());
            }
        }

        if let Some(path) = &self.config {
            if !path.is_file() {
                errors.push(format!("Config file {} does not exist", path.display()));
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Loads the binds file, or an empty one when no path is given.
    pub fn load_file(&self) -> anyhow::Result<BindsFile> {
        let mut file = match &self.config {
            Some(path) => BindsFile::from_path(path)
                .with_context(|| format!("Failed to load {}", path.display()))?,
            None => BindsFile::from_json_str("{}")?,
        };
        if let Some(url) = &self.database_url {
            file.database_url = url.clone();
        }
        Ok(file)
    }

    /// Builds the bind state, declaring the file's models.
    ///
    /// The returned tenant handle is the one dynamic binds read.
    pub fn build(&self) -> anyhow::Result<(Binds, CurrentTenant)> {
        let file = self.load_file()?;

        let current = CurrentTenant::new();
        if let Some(tenant) = &self.tenant {
            current.set(TenantId::new(tenant.clone()));
        }

        let binds = Binds::new(file.to_config(&current)?).context("Invalid bind configuration")?;
        binds
            .declare_models(file.models)
            .context("Failed to declare models")?;
        Ok((binds, current))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> CliConfig {
        let mut argv = vec!["bindery"];
        argv.extend_from_slice(args);
        CliConfig::try_parse_from(argv).unwrap()
    }

    #[test]
    fn test_subcommands() {
        assert_eq!(parse(&["create-all"]).command, Command::CreateAll);
        assert_eq!(parse(&["drop-all"]).command, Command::DropAll);
        assert_eq!(
            parse(&["resolve", "foo"]).command,
            Command::Resolve {
                bind: Some("foo".to_string())
            }
        );
        assert_eq!(parse(&["reflect"]).command, Command::Reflect { bind: None });
        assert_eq!(parse(&["check"]).command, Command::Check);
        assert_eq!(parse(&["binds"]).command, Command::Binds);
    }

    #[test]
    fn test_missing_subcommand_is_rejected() {
        assert!(CliConfig::try_parse_from(["bindery"]).is_err());
    }

    #[test]
    fn test_validate() {
        let config = parse(&["--log-level", "debug", "check"]);
        assert!(config.validate().is_ok());

        let config = parse(&["--log-level", "loud", "--tenant", " ", "check"]);
        let errors = config.validate().unwrap_err();
        assert_eq!(errors.len(), 2);
    }

    #[test]
    fn test_build_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("binds.json");
        std::fs::write(
            &path,
            r#"{
                "binds": {
                    "audit": "sqlite://",
                    "orders": { "template": "sqlite://?tenant={tenant}" }
                },
                "models": [
                    { "name": "AuditEntry", "bind_key": "audit",
                      "columns": [{ "name": "id", "type": "integer", "primary_key": true }] }
                ]
            }"#,
        )
        .unwrap();

        let config = parse(&[
            "--config",
            path.to_str().unwrap(),
            "--tenant",
            "acme",
            "--database-url",
            "sqlite://",
            "binds",
        ]);
        assert!(config.validate().is_ok());

        let (binds, current) = config.build().unwrap();
        assert_eq!(current.get(), Some(TenantId::new("acme")));
        assert_eq!(binds.resolve_url(None).unwrap(), "sqlite://");
        assert_eq!(
            binds.resolve_url(Some("orders")).unwrap(),
            "sqlite://?tenant=acme"
        );
        assert!(binds.metadata().table("audit_entry").is_some());
    }

    #[test]
    fn test_missing_file_fails_validation() {
        let config = parse(&["--config", "/nonexistent/binds.json", "check"]);
        assert!(config.validate().is_err());
        assert!(config.build().is_err());
    }
}
