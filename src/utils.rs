// ABOUTME: Identifier validation shared by the source reader and the lake writer
// ABOUTME: Checks table and database names and encodes them for SQL and object keys

use anyhow::{bail, Result};

/// Longest name the Glue catalog accepts for databases and tables.
pub const MAX_IDENTIFIER_LEN: usize = 255;

/// Validate a source table name before it is read and registered
///
/// Any name SQLite accepts is fine as long as it is non-empty, at most
/// [`MAX_IDENTIFIER_LEN`] characters and free of control characters. SQL
/// always goes through [`quote_identifier`] and object keys through
/// [`encode_key_segment`], so spaces, dashes and quotes are allowed.
///
/// # Examples
///
/// ```
/// # use sqlite_lake_loader::utils::validate_table_name;
/// assert!(validate_table_name("Album").is_ok());
/// assert!(validate_table_name("Play List").is_ok());
/// assert!(validate_table_name("order-items").is_ok());
/// assert!(validate_table_name("").is_err());
/// assert!(validate_table_name("line\nbreak").is_err());
/// ```
pub fn validate_table_name(table_name: &str) -> Result<()> {
    if table_name.is_empty() {
        bail!("Table name cannot be empty");
    }

    if table_name.chars().count() > MAX_IDENTIFIER_LEN {
        bail!(
            "Table name too long (max {} characters): {}",
            MAX_IDENTIFIER_LEN,
            sanitize_identifier(table_name)
        );
    }

    if let Some(ch) = table_name.chars().find(|ch| ch.is_control()) {
        bail!(
            "Invalid table name '{}': contains control character '{}'",
            sanitize_identifier(table_name),
            ch.escape_default()
        );
    }

    Ok(())
}

/// Encode a name as a single object-key path segment
///
/// ASCII letters, digits, `_` and `-` pass through. Every other byte of the
/// UTF-8 encoding becomes `%XX`, so `/`, `.` and `%` can never form extra
/// segments or collide with another encoded name.
///
/// # Examples
///
/// ```
/// # use sqlite_lake_loader::utils::encode_key_segment;
/// assert_eq!(encode_key_segment("Album"), "Album");
/// assert_eq!(encode_key_segment("Play List"), "Play%20List");
/// assert_eq!(encode_key_segment(".."), "%2E%2E");
/// ```
pub fn encode_key_segment(name: &str) -> String {
    let mut encoded = String::with_capacity(name.len());
    for byte in name.bytes() {
        if byte.is_ascii_alphanumeric() || byte == b'_' || byte == b'-' {
            encoded.push(byte as char);
        } else {
            encoded.push_str(&format!("%{:02X}", byte));
        }
    }
    encoded
}

/// Validate a destination (catalog) database name
///
/// The catalog stores database names lowercased, so an uppercase name would
/// never be found on the next run's membership check. Only lowercase ASCII
/// letters, digits and underscores are accepted.
///
/// # Examples
///
/// ```
/// # use sqlite_lake_loader::utils::validate_database_name;
/// assert!(validate_database_name("chinook").is_ok());
/// assert!(validate_database_name("Chinook").is_err());
/// assert!(validate_database_name("chinook-prod").is_err());
/// ```
pub fn validate_database_name(database: &str) -> Result<()> {
    if database.is_empty() {
        bail!("Database name cannot be empty");
    }

    if database.len() > MAX_IDENTIFIER_LEN {
        bail!(
            "Database name too long (max {} characters): {}",
            MAX_IDENTIFIER_LEN,
            sanitize_identifier(database)
        );
    }

    if let Some(ch) = database
        .chars()
        .find(|ch| !(ch.is_ascii_lowercase() || ch.is_ascii_digit() || *ch == '_'))
    {
        bail!(
            "Invalid database name '{}': contains invalid character '{}'. \
             Only lowercase letters, digits and underscores are allowed.",
            sanitize_identifier(database),
            ch.escape_default()
        );
    }

    Ok(())
}

/// Quote an identifier for interpolation into SQLite SQL
///
/// Embedded double quotes are doubled, which is the SQL escape for quoted
/// identifiers.
pub fn quote_identifier(identifier: &str) -> String {
    format!("\"{}\"", identifier.replace('"', "\"\""))
}

/// Sanitize an identifier for display in logs and error messages
///
/// Strips control characters and limits the length to 100 characters.
///
/// # Examples
///
/// ```
/// # use sqlite_lake_loader::utils::sanitize_identifier;
/// assert_eq!(sanitize_identifier("normal_table"), "normal_table");
/// assert_eq!(sanitize_identifier("table\nname"), "tablename");
/// assert_eq!(sanitize_identifier(&"a".repeat(200)).len(), 100);
/// ```
pub fn sanitize_identifier(identifier: &str) -> String {
    identifier
        .chars()
        .filter(|c| !c.is_control())
        .take(100)
        .collect()
}
