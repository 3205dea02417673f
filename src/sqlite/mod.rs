// ABOUTME: SQLite source access for the lake migration
// ABOUTME: Parses source connection URIs and opens validated read-only connections

pub mod converter;
pub mod reader;

use anyhow::{anyhow, bail, Context, Result};
use std::path::PathBuf;
use url::Url;

/// Resolve a source connection string to a SQLite file path
///
/// Accepted forms:
/// - `sqlite:///Chinook.db` - path relative to the working directory
/// - `sqlite:////data/Chinook.db` - absolute path
/// - `sqlite://Chinook.db` - relative path, short form
/// - `file:///data/Chinook.db` - file URL
/// - `Chinook.db` - plain filesystem path
///
/// Any other scheme is rejected, only file-based SQLite sources are supported.
///
/// # Examples
///
/// ```
/// # use sqlite_lake_loader::sqlite::parse_source_uri;
/// # use std::path::PathBuf;
/// assert_eq!(parse_source_uri("sqlite:///Chinook.db").unwrap(), PathBuf::from("Chinook.db"));
/// assert_eq!(parse_source_uri("sqlite:////data/c.db").unwrap(), PathBuf::from("/data/c.db"));
/// assert!(parse_source_uri("postgres://user@host/db").is_err());
/// ```
pub fn parse_source_uri(uri: &str) -> Result<PathBuf> {
    let uri = uri.trim();
    if uri.is_empty() {
        bail!("Source connection string cannot be empty");
    }

    let path = if let Some(rest) = uri.strip_prefix("sqlite:///") {
        rest.to_string()
    } else if let Some(rest) = uri.strip_prefix("sqlite://") {
        rest.to_string()
    } else if uri.starts_with("file://") {
        let url = Url::parse(uri).with_context(|| format!("Invalid file URI: {}", uri))?;
        return url
            .to_file_path()
            .map_err(|_| anyhow!("Invalid file:// URI: {}", uri));
    } else if let Some((scheme, _)) = uri.split_once("://") {
        bail!(
            "Unsupported source scheme '{}'. \
             Expected sqlite:///path/to/file.db or a plain file path",
            scheme
        );
    } else {
        uri.to_string()
    };

    if path.is_empty() {
        bail!("Source connection string '{}' has no database path", uri);
    }

    Ok(PathBuf::from(path))
}

/// Validate a SQLite file path
///
/// Checks:
/// - Canonicalizes path to resolve symlinks and relative paths
/// - Verifies file exists and is a regular file (not directory)
/// - Checks file extension is .db, .sqlite, or .sqlite3
///
/// Returns the canonical absolute path.
pub fn validate_sqlite_path(path: &str) -> Result<PathBuf> {
    if path.is_empty() {
        bail!("SQLite file path cannot be empty");
    }

    let path_buf = PathBuf::from(path);

    // Canonicalizing also proves the file exists
    let canonical = path_buf.canonicalize().with_context(|| {
        format!(
            "Failed to resolve SQLite file path '{}'. \
             File may not exist or may not be readable.",
            path
        )
    })?;

    if !canonical.is_file() {
        bail!("Path '{}' is not a regular file (may be a directory)", path);
    }

    match canonical.extension().and_then(|ext| ext.to_str()) {
        Some(ext) if ["db", "sqlite", "sqlite3"].contains(&ext) => {}
        Some(ext) => bail!(
            "Invalid SQLite file extension '{}'. \
             Must be .db, .sqlite, or .sqlite3",
            ext
        ),
        None => bail!(
            "SQLite file '{}' has no extension. \
             Must be .db, .sqlite, or .sqlite3",
            path
        ),
    }

    tracing::debug!("Validated SQLite path: {}", canonical.display());

    Ok(canonical)
}

/// Open a SQLite database in read-only mode
///
/// The path is validated first, then a `sqlite_version()` query confirms the
/// connection is usable. Writes through the returned connection fail.
pub fn open_sqlite(path: &str) -> Result<rusqlite::Connection> {
    let canonical = validate_sqlite_path(path)?;

    tracing::info!("Opening SQLite database: {}", canonical.display());

    let conn = rusqlite::Connection::open_with_flags(
        &canonical,
        rusqlite::OpenFlags::SQLITE_OPEN_READ_ONLY,
    )
    .with_context(|| format!("Failed to open SQLite database: {}", canonical.display()))?;

    let version: String = conn
        .query_row("SELECT sqlite_version()", [], |row| row.get(0))
        .context("Failed to query SQLite version (database may be corrupted)")?;

    tracing::debug!("Opened SQLite database (sqlite {})", version);

    Ok(conn)
}

/// Open the source database named by a connection string
///
/// # Examples
///
/// ```no_run
/// # use sqlite_lake_loader::sqlite::open_source;
/// # fn example() -> anyhow::Result<()> {
/// let conn = open_source("sqlite:///Chinook.db")?;
/// # Ok(())
/// # }
/// ```
pub fn open_source(uri: &str) -> Result<rusqlite::Connection> {
    let path = parse_source_uri(uri)?;
    let path = path
        .to_str()
        .ok_or_else(|| anyhow!("Source path is not valid UTF-8: {}", path.display()))?;
    open_sqlite(path)
}
