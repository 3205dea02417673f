// ABOUTME: SQLite database introspection and data reading
// ABOUTME: Enumerates user tables and materializes whole tables in memory

use crate::utils::{quote_identifier, validate_table_name};
use anyhow::{Context, Result};
use rusqlite::types::Value;
use rusqlite::Connection;

/// A column as declared in the source table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceColumn {
    pub name: String,
    /// Declared SQL type, empty when the column was declared without one
    pub declared_type: String,
}

/// A fully materialized source table
#[derive(Debug, Clone)]
pub struct SourceTable {
    pub name: String,
    pub columns: Vec<SourceColumn>,
    /// Row-major values, each row has exactly `columns.len()` entries
    pub rows: Vec<Vec<Value>>,
}

impl SourceTable {
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }
}

/// List all user tables in a SQLite database
///
/// Queries `sqlite_master` for tables and skips SQLite's internal
/// `sqlite_*` tables (`sqlite_sequence`, `sqlite_stat1`, ...).
///
/// The order is whatever SQLite returns and is not sorted.
///
/// # Examples
///
/// ```no_run
/// # use sqlite_lake_loader::sqlite::{open_source, reader::list_tables};
/// # fn example() -> anyhow::Result<()> {
/// let conn = open_source("sqlite:///Chinook.db")?;
/// for table in list_tables(&conn)? {
///     println!("Table: {}", table);
/// }
/// # Ok(())
/// # }
/// ```
pub fn list_tables(conn: &Connection) -> Result<Vec<String>> {
    tracing::debug!("Listing tables from SQLite database");

    let mut stmt = conn
        .prepare(
            "SELECT name FROM sqlite_master \
             WHERE type = 'table' \
             AND name NOT LIKE 'sqlite\\_%' ESCAPE '\\'",
        )
        .context("Failed to prepare statement to list tables")?;

    let tables = stmt
        .query_map([], |row| row.get::<_, String>(0))
        .context("Failed to query table list")?
        .collect::<Result<Vec<String>, _>>()
        .context("Failed to collect table names")?;

    tracing::info!("Found {} user tables in SQLite database", tables.len());

    Ok(tables)
}

/// Get row count for a specific table
///
/// The table name is validated before it is interpolated into SQL.
pub fn get_table_row_count(conn: &Connection, table: &str) -> Result<usize> {
    validate_table_name(table).context("Invalid table name for row count query")?;

    tracing::debug!("Getting row count for table '{}'", table);

    let query = format!("SELECT COUNT(*) FROM {}", quote_identifier(table));

    let count: i64 = conn
        .query_row(&query, [], |row| row.get(0))
        .with_context(|| format!("Failed to count rows in table '{}'", table))?;

    Ok(count as usize)
}

/// Read the declared columns of a table, in declaration order
pub fn read_table_columns(conn: &Connection, table: &str) -> Result<Vec<SourceColumn>> {
    validate_table_name(table).context("Invalid table name for column lookup")?;

    let query = format!("PRAGMA table_info({})", quote_identifier(table));
    let mut stmt = conn
        .prepare(&query)
        .with_context(|| format!("Failed to get table info for '{}'", table))?;

    let columns = stmt
        .query_map([], |row| {
            Ok(SourceColumn {
                name: row.get::<_, String>(1)?,
                declared_type: row.get::<_, Option<String>>(2)?.unwrap_or_default(),
            })
        })
        .with_context(|| format!("Failed to query columns of table '{}'", table))?
        .collect::<Result<Vec<_>, _>>()
        .with_context(|| format!("Failed to collect columns of table '{}'", table))?;

    if columns.is_empty() {
        anyhow::bail!("Table '{}' does not exist or has no columns", table);
    }

    Ok(columns)
}

/// Read all data from a SQLite table
///
/// Every row is loaded into memory. Columns are selected explicitly so the
/// value order always matches [`SourceTable::columns`].
///
/// # Examples
///
/// ```no_run
/// # use sqlite_lake_loader::sqlite::{open_source, reader::read_table};
/// # fn example() -> anyhow::Result<()> {
/// let conn = open_source("sqlite:///Chinook.db")?;
/// let album = read_table(&conn, "Album")?;
/// println!("Read {} rows from {}", album.row_count(), album.name);
/// # Ok(())
/// # }
/// ```
pub fn read_table(conn: &Connection, table: &str) -> Result<SourceTable> {
    validate_table_name(table).context("Invalid table name for data reading")?;

    tracing::info!("Reading all data from table '{}'", table);

    let columns = read_table_columns(conn, table)?;

    tracing::debug!(
        "Table '{}' has {} columns: {:?}",
        table,
        columns.len(),
        columns.iter().map(|c| &c.name).collect::<Vec<_>>()
    );

    let select_list = columns
        .iter()
        .map(|c| quote_identifier(&c.name))
        .collect::<Vec<_>>()
        .join(", ");
    let query = format!("SELECT {} FROM {}", select_list, quote_identifier(table));

    let mut stmt = conn
        .prepare(&query)
        .with_context(|| format!("Failed to prepare statement for table '{}'", table))?;

    let width = columns.len();
    let rows = stmt
        .query_map([], |row| {
            (0..width)
                .map(|idx| row.get::<_, Value>(idx))
                .collect::<Result<Vec<_>, _>>()
        })
        .with_context(|| format!("Failed to query rows from table '{}'", table))?
        .collect::<Result<Vec<_>, _>>()
        .with_context(|| format!("Failed to collect rows from table '{}'", table))?;

    tracing::info!("Read {} rows from table '{}'", rows.len(), table);

    Ok(SourceTable {
        name: table.to_string(),
        columns,
        rows,
    })
}
