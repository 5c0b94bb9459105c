//! Subcommand implementations.
//!
//! Each command writes its report to the given writer so the output can be
//! checked in tests.

use std::io::Write;

use bindery_binds::{BindKey, Binds};
use tracing::{info, warn};

use crate::config::Command;

const PRIMARY: &str = "<default>";

/// Runs a subcommand against the bind state.
pub fn run(command: &Command, binds: &Binds, out: &mut impl Write) -> anyhow::Result<()> {
    match command {
        Command::CreateAll => create_all(binds, out),
        Command::DropAll => drop_all(binds, out),
        Command::Resolve { bind } => resolve(binds, bind.as_deref(), out),
        Command::Reflect { bind } => reflect(binds, bind.as_deref(), out),
        Command::Check => check(binds, out),
        Command::Binds => list_binds(binds, out),
    }
}

fn all_binds(binds: &Binds) -> Vec<Option<BindKey>> {
    std::iter::once(None)
        .chain(binds.bind_keys().into_iter().map(Some))
        .collect()
}

fn label(bind: Option<&BindKey>) -> &str {
    bind.map(BindKey::as_str).unwrap_or(PRIMARY)
}

fn tables_for(binds: &Binds, bind: Option<&BindKey>) -> usize {
    binds.metadata().tables_for_bind(bind).len()
}

fn create_all(binds: &Binds, out: &mut impl Write) -> anyhow::Result<()> {
    binds.create_all()?;
    for bind in all_binds(binds) {
        let url = binds.resolve_url(bind.as_ref().map(BindKey::as_str))?;
        writeln!(
            out,
            "{}\t{}\t{} table(s) created",
            label(bind.as_ref()),
            url,
            tables_for(binds, bind.as_ref())
        )?;
    }
    info!(connectors = binds.connector_count(), "Created all tables");
    Ok(())
}

fn drop_all(binds: &Binds, out: &mut impl Write) -> anyhow::Result<()> {
    binds.drop_all()?;
    for bind in all_binds(binds) {
        let url = binds.resolve_url(bind.as_ref().map(BindKey::as_str))?;
        writeln!(
            out,
            "{}\t{}\t{} table(s) dropped",
            label(bind.as_ref()),
            url,
            tables_for(binds, bind.as_ref())
        )?;
    }
    info!(connectors = binds.connector_count(), "Dropped all tables");
    Ok(())
}

fn resolve(binds: &Binds, bind: Option<&str>, out: &mut impl Write) -> anyhow::Result<()> {
    writeln!(out, "{}", binds.resolve_url(bind)?)?;
    Ok(())
}

fn reflect(binds: &Binds, bind: Option<&str>, out: &mut impl Write) -> anyhow::Result<()> {
    for table in binds.reflect(bind)? {
        writeln!(out, "{}", table)?;
    }
    Ok(())
}

fn check(binds: &Binds, out: &mut impl Write) -> anyhow::Result<()> {
    let mut failures = 0;
    for bind in all_binds(binds) {
        let key = bind.as_ref().map(BindKey::as_str);
        let result = binds
            .get_engine(key)
            .map_err(anyhow::Error::from)
            .and_then(|engine| {
                engine.health_check()?;
                Ok(engine)
            });
        match result {
            Ok(engine) => writeln!(out, "{}\t{}\tok", label(bind.as_ref()), engine.url())?,
            Err(e) => {
                failures += 1;
                warn!(bind_key = label(bind.as_ref()), error = %e, "Bind check failed");
                writeln!(out, "{}\t-\tFAILED: {:#}", label(bind.as_ref()), e)?;
            }
        }
    }
    if failures > 0 {
        anyhow::bail!("{} bind(s) failed the check", failures);
    }
    Ok(())
}

fn list_binds(binds: &Binds, out: &mut impl Write) -> anyhow::Result<()> {
    writeln!(out, "{}\t{}", PRIMARY, binds.config().database_url)?;
    for key in binds.bind_keys() {
        let shown = match binds.config().descriptor(key.as_str()) {
            Some(descriptor) => match descriptor.as_static() {
                Some(url) => url.to_string(),
                None => match binds.resolve_url(Some(key.as_str())) {
                    Ok(url) => format!("{} (dynamic)", url),
                    Err(e) => format!("<dynamic: {}>", e),
                },
            },
            None => continue,
        };
        writeln!(out, "{}\t{}", key, shown)?;
    }

    let metadata = binds.metadata();
    for table in metadata.tables() {
        writeln!(
            out,
            "table {}\tbind {}\tmodel {}",
            table.name,
            label(table.bind_key()),
            table.model
        )?;
    }
    Ok(())
}
