// ABOUTME: SQLite to data lake migration
// ABOUTME: Enumerates source tables and loads them one at a time

pub mod loader;

pub use loader::{ensure_database, load_table, LoadedTable};

use crate::lake::parquet::ParquetCompression;
use crate::lake::DataLake;
use crate::sqlite::reader::list_tables;
use anyhow::Result;
use rusqlite::Connection;

/// Migrate every user table of the source database into `database`
///
/// Tables are loaded sequentially in enumeration order. The first failure
/// aborts the run; tables loaded before it stay in the lake.
pub async fn migrate_tables(
    conn: &Connection,
    database: &str,
    lake: &DataLake,
    compression: ParquetCompression,
) -> Result<Vec<LoadedTable>> {
    let tables = list_tables(conn)?;

    let mut loaded = Vec::with_capacity(tables.len());
    for (idx, table) in tables.iter().enumerate() {
        tracing::info!(
            "[{}/{}] Migrating table '{}' into database '{}'",
            idx + 1,
            tables.len(),
            table,
            database
        );
        loaded.push(load_table(conn, database, table, lake, compression).await?);
    }

    Ok(loaded)
}
