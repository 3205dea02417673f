// ABOUTME: tables command - lists the source tables a migration would copy
// ABOUTME: Runs the table enumerator and counts rows per table

use crate::sqlite::open_source;
use crate::sqlite::reader::{get_table_row_count, list_tables};
use anyhow::Result;

/// List source tables with their row counts, in enumeration order
pub fn tables(source: &str) -> Result<Vec<(String, usize)>> {
    let conn = open_source(source)?;

    list_tables(&conn)?
        .into_iter()
        .map(|table| {
            let rows = get_table_row_count(&conn, &table)?;
            Ok((table, rows))
        })
        .collect()
}
