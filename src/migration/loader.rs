// ABOUTME: Table loader that copies one SQLite table into the data lake
// ABOUTME: Reads the table, ensures the catalog database, overwrites data and registers it

use crate::lake::catalog::{Catalog, TableDefinition};
use crate::lake::parquet::{encode_batch, ParquetCompression};
use crate::lake::{data_object_key, table_prefix, DataLake};
use crate::sqlite::converter::convert_table;
use crate::sqlite::reader::read_table;
use crate::utils::{validate_database_name, validate_table_name};
use anyhow::{Context, Result};
use rusqlite::Connection;

/// Outcome of loading one table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadedTable {
    pub database: String,
    pub table: String,
    pub rows: usize,
    pub columns: usize,
    /// Prefix URL registered as the table location
    pub location: String,
}

/// Create the catalog database unless it is already listed
///
/// Returns `true` when the database was created by this call.
pub async fn ensure_database(catalog: &dyn Catalog, database: &str) -> Result<bool> {
    let existing = catalog
        .list_databases()
        .await
        .context("Failed to list catalog databases")?;

    if existing.iter().any(|name| name == database) {
        tracing::debug!("Catalog database '{}' already exists", database);
        return Ok(false);
    }

    catalog
        .create_database(database)
        .await
        .with_context(|| format!("Failed to create catalog database '{}'", database))?;
    tracing::info!("Created catalog database '{}'", database);

    Ok(true)
}

/// Load one source table into the lake
///
/// Steps, in order:
/// 1. read every row of `table` into memory
/// 2. create the catalog database if it is not listed yet
/// 3. write the table as a single Parquet object under `{database}/{table}/`,
///    replacing the previous object, then delete every other object under
///    that prefix
/// 4. create or replace the catalog entry for the table
///
/// Any failure is returned immediately, nothing is rolled back.
pub async fn load_table(
    conn: &Connection,
    database: &str,
    table: &str,
    lake: &DataLake,
    compression: ParquetCompression,
) -> Result<LoadedTable> {
    validate_database_name(database)?;
    validate_table_name(table)?;

    let source = read_table(conn, table)?;
    let converted = convert_table(&source)?;

    ensure_database(lake.catalog(), database).await?;

    let prefix = table_prefix(database, table);
    let key = data_object_key(database, table, compression);
    let storage = lake.storage();

    let body = encode_batch(&converted.batch, compression)
        .with_context(|| format!("Failed to encode table '{}' as Parquet", table))?;
    storage
        .put_object(&key, body)
        .await
        .with_context(|| format!("Failed to write data for table '{}'", table))?;

    let stale: Vec<String> = storage
        .list_keys(&prefix)
        .await
        .with_context(|| format!("Failed to list existing objects for table '{}'", table))?
        .into_iter()
        .filter(|existing| *existing != key)
        .collect();
    if !stale.is_empty() {
        tracing::info!(
            "Removing {} stale objects under {}",
            stale.len(),
            storage.url(&prefix)
        );
        storage
            .delete_keys(&stale)
            .await
            .with_context(|| format!("Failed to clear stale data for table '{}'", table))?;
    }

    let location = storage.url(&prefix);
    let definition = TableDefinition::parquet(
        database,
        table,
        location.clone(),
        &converted.columns(),
        compression.as_str(),
    );
    lake.catalog()
        .upsert_table(&definition)
        .await
        .with_context(|| format!("Failed to register table {}.{}", database, table))?;

    tracing::info!(
        "Loaded {}.{} ({} rows, {} columns) into {}",
        database,
        table,
        source.row_count(),
        source.columns.len(),
        location
    );

    Ok(LoadedTable {
        database: database.to_string(),
        table: table.to_string(),
        rows: source.row_count(),
        columns: source.columns.len(),
        location,
    })
}
