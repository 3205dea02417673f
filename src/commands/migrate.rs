// ABOUTME: migrate command - copies every SQLite table into the data lake
// ABOUTME: Opens the source, connects the lake target and runs the table loads

use crate::config::MigrationSettings;
use crate::lake::{DataLake, LakeTarget};
use crate::migration::{migrate_tables, LoadedTable};
use crate::sqlite::open_source;
use crate::utils::validate_database_name;
use anyhow::{Context, Result};

/// Run a full migration with resolved settings
///
/// Validation of the database name and destination happens before anything
/// is read from the source or written to the lake.
pub async fn migrate(settings: &MigrationSettings) -> Result<Vec<LoadedTable>> {
    validate_database_name(&settings.database)?;
    let target = LakeTarget::parse(&settings.bucket)?;

    tracing::info!(
        "Migrating {} into lake database '{}'",
        settings.source,
        settings.database
    );

    let conn = open_source(&settings.source)
        .with_context(|| format!("Failed to open source database {}", settings.source))?;
    let lake = DataLake::connect(&target, settings.region.as_deref()).await?;

    let loaded = migrate_tables(&conn, &settings.database, &lake, settings.compression).await?;

    let total_rows: usize = loaded.iter().map(|t| t.rows).sum();
    tracing::info!(
        "Migration complete: {} tables, {} rows into database '{}'",
        loaded.len(),
        total_rows,
        settings.database
    );

    Ok(loaded)
}
