// ABOUTME: SQLite to Arrow conversion for columnar lake storage
// ABOUTME: Resolves one column type per column and builds an in-memory RecordBatch

use super::reader::SourceTable;
use anyhow::{Context, Result};
use arrow::array::{
    ArrayRef, BinaryArray, BooleanArray, Date32Array, Float64Array, Int64Array, StringArray,
    TimestampMicrosecondArray,
};
use arrow::datatypes::{DataType, Date32Type, Field, Schema, TimeUnit};
use arrow::record_batch::RecordBatch;
use base64::Engine;
use chrono::{NaiveDate, NaiveDateTime};
use rusqlite::types::Value;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

const TIMESTAMP_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
];

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Lake-side type of a migrated column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnKind {
    Integer,
    Real,
    Text,
    Blob,
    Boolean,
    Timestamp,
    Date,
}

impl ColumnKind {
    /// Map a declared SQL type to a column kind
    ///
    /// Follows SQLite's type affinity rules, in order:
    /// - contains `INT` → Integer
    /// - contains `CHAR`, `CLOB` or `TEXT` → Text
    /// - contains `BLOB`, or no declared type → Blob
    /// - contains `REAL`, `FLOA` or `DOUB` → Real
    ///
    /// Everything else has numeric affinity and is refined by name:
    /// `BOOL*` → Boolean, `DATETIME`/`TIMESTAMP*` → Timestamp, `DATE` → Date,
    /// and `NUMERIC`/`DECIMAL(p,s)`/unknown names → Real.
    ///
    /// # Examples
    ///
    /// ```
    /// # use sqlite_lake_loader::sqlite::converter::ColumnKind;
    /// assert_eq!(ColumnKind::from_declared_type("NVARCHAR(160)"), ColumnKind::Text);
    /// assert_eq!(ColumnKind::from_declared_type("NUMERIC(10,2)"), ColumnKind::Real);
    /// assert_eq!(ColumnKind::from_declared_type("DATETIME"), ColumnKind::Timestamp);
    /// ```
    pub fn from_declared_type(declared: &str) -> Self {
        let upper = declared.trim().to_ascii_uppercase();

        if upper.contains("INT") {
            return ColumnKind::Integer;
        }
        if upper.contains("CHAR") || upper.contains("CLOB") || upper.contains("TEXT") {
            return ColumnKind::Text;
        }
        if upper.is_empty() || upper.contains("BLOB") {
            return ColumnKind::Blob;
        }
        if upper.contains("REAL") || upper.contains("FLOA") || upper.contains("DOUB") {
            return ColumnKind::Real;
        }

        if upper.starts_with("BOOL") {
            ColumnKind::Boolean
        } else if upper.starts_with("DATETIME") || upper.starts_with("TIMESTAMP") {
            ColumnKind::Timestamp
        } else if upper == "DATE" {
            ColumnKind::Date
        } else {
            ColumnKind::Real
        }
    }

    pub fn arrow_type(self) -> DataType {
        match self {
            ColumnKind::Integer => DataType::Int64,
            ColumnKind::Real => DataType::Float64,
            ColumnKind::Text => DataType::Utf8,
            ColumnKind::Blob => DataType::Binary,
            ColumnKind::Boolean => DataType::Boolean,
            ColumnKind::Timestamp => DataType::Timestamp(TimeUnit::Microsecond, None),
            ColumnKind::Date => DataType::Date32,
        }
    }

    /// Hive type name registered in the catalog
    pub fn catalog_type(self) -> &'static str {
        match self {
            ColumnKind::Integer => "bigint",
            ColumnKind::Real => "double",
            ColumnKind::Text => "string",
            ColumnKind::Blob => "binary",
            ColumnKind::Boolean => "boolean",
            ColumnKind::Timestamp => "timestamp",
            ColumnKind::Date => "date",
        }
    }

    /// Whether a non-null value can be stored in a column of this kind
    fn accepts(self, value: &Value) -> bool {
        match (self, value) {
            (_, Value::Null) => true,
            (ColumnKind::Integer, Value::Integer(_)) => true,
            (ColumnKind::Real, Value::Integer(_) | Value::Real(_)) => true,
            (ColumnKind::Text, Value::Integer(_) | Value::Real(_) | Value::Text(_)) => true,
            (ColumnKind::Blob, Value::Blob(_)) => true,
            (ColumnKind::Boolean, Value::Integer(0 | 1)) => true,
            (ColumnKind::Timestamp, Value::Text(s)) => parse_timestamp(s).is_some(),
            (ColumnKind::Date, Value::Text(s)) => parse_date(s).is_some(),
            _ => false,
        }
    }
}

/// Decide the kind of one column from its declared kind and its values
///
/// The declared kind wins when every non-null value fits it. Otherwise the
/// kind is inferred from the storage classes actually present: integers only
/// → Integer, integers and reals → Real, blobs only → Blob, anything mixed
/// with text → Text.
pub fn resolve_column_kind<'a>(
    declared: ColumnKind,
    values: impl Iterator<Item = &'a Value> + Clone,
) -> ColumnKind {
    if values.clone().all(|v| declared.accepts(v)) {
        return declared;
    }

    let (mut ints, mut reals, mut texts, mut blobs) = (false, false, false, false);
    for value in values {
        match value {
            Value::Null => {}
            Value::Integer(_) => ints = true,
            Value::Real(_) => reals = true,
            Value::Text(_) => texts = true,
            Value::Blob(_) => blobs = true,
        }
    }

    if texts || (blobs && (ints || reals)) {
        ColumnKind::Text
    } else if blobs {
        ColumnKind::Blob
    } else if reals {
        ColumnKind::Real
    } else {
        ColumnKind::Integer
    }
}

/// A source table converted to a single Arrow batch
#[derive(Debug, Clone)]
pub struct ConvertedTable {
    pub batch: RecordBatch,
    pub kinds: Vec<ColumnKind>,
}

impl ConvertedTable {
    /// Column names paired with their resolved kinds, in column order
    pub fn columns(&self) -> Vec<(String, ColumnKind)> {
        self.batch
            .schema()
            .fields()
            .iter()
            .zip(&self.kinds)
            .map(|(field, kind)| (field.name().clone(), *kind))
            .collect()
    }
}

/// Convert a materialized SQLite table into one Arrow `RecordBatch`
///
/// All fields are nullable. A table with zero rows still produces a batch
/// carrying the full schema, with declared kinds used as-is.
///
/// # Examples
///
/// ```no_run
/// # use sqlite_lake_loader::sqlite::{open_source, reader::read_table, converter::convert_table};
/// # fn example() -> anyhow::Result<()> {
/// let conn = open_source("sqlite:///Chinook.db")?;
/// let converted = convert_table(&read_table(&conn, "Invoice")?)?;
/// println!("{} rows", converted.batch.num_rows());
/// # Ok(())
/// # }
/// ```
pub fn convert_table(table: &SourceTable) -> Result<ConvertedTable> {
    let mut fields = Vec::with_capacity(table.columns.len());
    let mut arrays: Vec<ArrayRef> = Vec::with_capacity(table.columns.len());
    let mut kinds = Vec::with_capacity(table.columns.len());

    for (idx, column) in table.columns.iter().enumerate() {
        let declared = ColumnKind::from_declared_type(&column.declared_type);
        let values = table.rows.iter().map(move |row| &row[idx]);
        let kind = resolve_column_kind(declared, values.clone());

        if kind != declared {
            tracing::warn!(
                "Column '{}.{}' declared as '{}' holds values that do not fit {:?}, storing as {:?}",
                table.name,
                column.name,
                column.declared_type,
                declared,
                kind
            );
        }

        fields.push(Field::new(&column.name, kind.arrow_type(), true));
        arrays.push(build_array(kind, values));
        kinds.push(kind);
    }

    let schema = Arc::new(Schema::new(fields));
    let batch = RecordBatch::try_new(schema, arrays)
        .with_context(|| format!("Failed to build Arrow batch for table '{}'", table.name))?;

    tracing::debug!(
        "Converted table '{}' to Arrow ({} rows, {} columns)",
        table.name,
        batch.num_rows(),
        batch.num_columns()
    );

    Ok(ConvertedTable { batch, kinds })
}

fn build_array<'a>(kind: ColumnKind, values: impl Iterator<Item = &'a Value>) -> ArrayRef {
    match kind {
        ColumnKind::Integer => Arc::new(Int64Array::from(
            values
                .map(|v| match v {
                    Value::Integer(i) => Some(*i),
                    _ => None,
                })
                .collect::<Vec<_>>(),
        )),
        ColumnKind::Real => Arc::new(Float64Array::from(
            values
                .map(|v| match v {
                    Value::Integer(i) => Some(*i as f64),
                    Value::Real(f) => Some(*f),
                    _ => None,
                })
                .collect::<Vec<_>>(),
        )),
        ColumnKind::Text => Arc::new(StringArray::from(
            values.map(value_to_text).collect::<Vec<_>>(),
        )),
        ColumnKind::Blob => Arc::new(BinaryArray::from(
            values
                .map(|v| match v {
                    Value::Blob(b) => Some(b.as_slice()),
                    _ => None,
                })
                .collect::<Vec<_>>(),
        )),
        ColumnKind::Boolean => Arc::new(BooleanArray::from(
            values
                .map(|v| match v {
                    Value::Integer(i) => Some(*i != 0),
                    _ => None,
                })
                .collect::<Vec<_>>(),
        )),
        ColumnKind::Timestamp => Arc::new(TimestampMicrosecondArray::from(
            values
                .map(|v| match v {
                    Value::Text(s) => parse_timestamp(s).map(|ts| ts.and_utc().timestamp_micros()),
                    _ => None,
                })
                .collect::<Vec<_>>(),
        )),
        ColumnKind::Date => Arc::new(Date32Array::from(
            values
                .map(|v| match v {
                    Value::Text(s) => parse_date(s).map(Date32Type::from_naive_date),
                    _ => None,
                })
                .collect::<Vec<_>>(),
        )),
    }
}

/// Render a value for a text column, BLOBs are base64 encoded
///
/// Reals always keep a fractional part (`1.0`, not `1`) so they stay
/// distinguishable from integers in the same column.
fn value_to_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::Integer(i) => Some(i.to_string()),
        Value::Real(f) => Some(format!("{:?}", f)),
        Value::Text(s) => Some(s.clone()),
        Value::Blob(b) => Some(base64::engine::general_purpose::STANDARD.encode(b)),
    }
}

fn parse_timestamp(text: &str) -> Option<NaiveDateTime> {
    let text = text.trim();
    TIMESTAMP_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(text, fmt).ok())
        .or_else(|| parse_date(text).and_then(|d| d.and_hms_opt(0, 0, 0)))
}

fn parse_date(text: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(text.trim(), DATE_FORMAT).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sqlite::reader::read_table;
    use arrow::array::Array;
    use rusqlite::Connection;

    #[test]
    fn test_declared_type_affinity() {
        assert_eq!(ColumnKind::from_declared_type("INTEGER"), ColumnKind::Integer);
        assert_eq!(ColumnKind::from_declared_type("bigint"), ColumnKind::Integer);
        assert_eq!(ColumnKind::from_declared_type("NVARCHAR(120)"), ColumnKind::Text);
        assert_eq!(ColumnKind::from_declared_type("TEXT"), ColumnKind::Text);
        assert_eq!(ColumnKind::from_declared_type("CLOB"), ColumnKind::Text);
        assert_eq!(ColumnKind::from_declared_type(""), ColumnKind::Blob);
        assert_eq!(ColumnKind::from_declared_type("BLOB"), ColumnKind::Blob);
        assert_eq!(ColumnKind::from_declared_type("REAL"), ColumnKind::Real);
        assert_eq!(ColumnKind::from_declared_type("DOUBLE PRECISION"), ColumnKind::Real);
        assert_eq!(ColumnKind::from_declared_type("FLOAT"), ColumnKind::Real);
        assert_eq!(ColumnKind::from_declared_type("NUMERIC(10,2)"), ColumnKind::Real);
        assert_eq!(ColumnKind::from_declared_type("DECIMAL(5,1)"), ColumnKind::Real);
        assert_eq!(ColumnKind::from_declared_type("BOOLEAN"), ColumnKind::Boolean);
        assert_eq!(ColumnKind::from_declared_type("DATETIME"), ColumnKind::Timestamp);
        assert_eq!(ColumnKind::from_declared_type("timestamp"), ColumnKind::Timestamp);
        assert_eq!(ColumnKind::from_declared_type("DATE"), ColumnKind::Date);
    }

    #[test]
    fn test_affinity_rule_order() {
        // INT is checked before CHAR, as in SQLite
        assert_eq!(ColumnKind::from_declared_type("CHARINT"), ColumnKind::Integer);
        // "POINT" contains INT
        assert_eq!(ColumnKind::from_declared_type("FLOATING POINT"), ColumnKind::Integer);
    }

    #[test]
    fn test_resolve_keeps_declared_kind() {
        let values = vec![Value::Integer(1), Value::Null, Value::Integer(3)];
        assert_eq!(
            resolve_column_kind(ColumnKind::Integer, values.iter()),
            ColumnKind::Integer
        );
    }

    #[test]
    fn test_resolve_widens_integer_to_real() {
        let values = vec![Value::Integer(1), Value::Real(2.5)];
        assert_eq!(
            resolve_column_kind(ColumnKind::Integer, values.iter()),
            ColumnKind::Real
        );
    }

    #[test]
    fn test_resolve_falls_back_to_text() {
        let values = vec![Value::Integer(1), Value::Text("n/a".to_string())];
        assert_eq!(
            resolve_column_kind(ColumnKind::Integer, values.iter()),
            ColumnKind::Text
        );

        let values = vec![Value::Blob(vec![1]), Value::Integer(2)];
        assert_eq!(
            resolve_column_kind(ColumnKind::Blob, values.iter()),
            ColumnKind::Text
        );
    }

    #[test]
    fn test_resolve_untyped_column_by_values() {
        let values = vec![Value::Integer(1), Value::Integer(2)];
        assert_eq!(
            resolve_column_kind(ColumnKind::Blob, values.iter()),
            ColumnKind::Integer
        );
    }

    #[test]
    fn test_resolve_boolean_rejects_other_integers() {
        let values = vec![Value::Integer(0), Value::Integer(1)];
        assert_eq!(
            resolve_column_kind(ColumnKind::Boolean, values.iter()),
            ColumnKind::Boolean
        );

        let values = vec![Value::Integer(0), Value::Integer(7)];
        assert_eq!(
            resolve_column_kind(ColumnKind::Boolean, values.iter()),
            ColumnKind::Integer
        );
    }

    #[test]
    fn test_resolve_unparseable_timestamp() {
        let values = vec![
            Value::Text("2009-01-01 00:00:00".to_string()),
            Value::Text("yesterday".to_string()),
        ];
        assert_eq!(
            resolve_column_kind(ColumnKind::Timestamp, values.iter()),
            ColumnKind::Text
        );
    }

    #[test]
    fn test_resolve_all_null_keeps_declared() {
        let values = vec![Value::Null, Value::Null];
        assert_eq!(
            resolve_column_kind(ColumnKind::Date, values.iter()),
            ColumnKind::Date
        );
    }

    #[test]
    fn test_parse_timestamp_formats() {
        assert!(parse_timestamp("2009-01-01 00:00:00").is_some());
        assert!(parse_timestamp("2009-01-01T10:15:30.250").is_some());
        assert!(parse_timestamp("2009-01-01 10:15").is_some());
        assert!(parse_timestamp("2009-01-01").is_some());
        assert!(parse_timestamp("01/02/2009").is_none());
    }

    #[test]
    fn test_convert_invoice_like_table() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            "CREATE TABLE Invoice (
                InvoiceId INTEGER NOT NULL,
                InvoiceDate DATETIME NOT NULL,
                BillingCity NVARCHAR(40),
                Total NUMERIC(10,2) NOT NULL
            );
            INSERT INTO Invoice VALUES (1, '2009-01-01 00:00:00', 'Stuttgart', 1.98);
            INSERT INTO Invoice VALUES (2, '2009-01-02 00:00:00', NULL, 4);",
        )
        .unwrap();

        let table = read_table(&conn, "Invoice").unwrap();
        let converted = convert_table(&table).unwrap();
        let batch = &converted.batch;

        assert_eq!(batch.num_rows(), 2);
        assert_eq!(
            converted.kinds,
            vec![
                ColumnKind::Integer,
                ColumnKind::Timestamp,
                ColumnKind::Text,
                ColumnKind::Real
            ]
        );

        let dates = batch
            .column(1)
            .as_any()
            .downcast_ref::<TimestampMicrosecondArray>()
            .unwrap();
        // 2009-01-01T00:00:00Z
        assert_eq!(dates.value(0), 1_230_768_000_000_000);

        let cities = batch
            .column(2)
            .as_any()
            .downcast_ref::<StringArray>()
            .unwrap();
        assert_eq!(cities.value(0), "Stuttgart");
        assert!(cities.is_null(1));

        let totals = batch
            .column(3)
            .as_any()
            .downcast_ref::<Float64Array>()
            .unwrap();
        assert_eq!(totals.value(0), 1.98);
        assert_eq!(totals.value(1), 4.0);
    }

    #[test]
    fn test_convert_date_column() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            "CREATE TABLE events (day DATE);
             INSERT INTO events VALUES ('1970-01-02'), (NULL);",
        )
        .unwrap();

        let converted = convert_table(&read_table(&conn, "events").unwrap()).unwrap();
        let days = converted
            .batch
            .column(0)
            .as_any()
            .downcast_ref::<Date32Array>()
            .unwrap();
        assert_eq!(days.value(0), 1);
        assert!(days.is_null(1));
    }

    #[test]
    fn test_convert_blob_and_mixed_columns() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            "CREATE TABLE files (data BLOB, note INTEGER);
             INSERT INTO files VALUES (X'48656c6c6f', 5);
             INSERT INTO files VALUES (NULL, 'five');",
        )
        .unwrap();

        let converted = convert_table(&read_table(&conn, "files").unwrap()).unwrap();
        assert_eq!(converted.kinds, vec![ColumnKind::Blob, ColumnKind::Text]);

        let data = converted
            .batch
            .column(0)
            .as_any()
            .downcast_ref::<BinaryArray>()
            .unwrap();
        assert_eq!(data.value(0), b"Hello");
        assert!(data.is_null(1));

        let notes = converted
            .batch
            .column(1)
            .as_any()
            .downcast_ref::<StringArray>()
            .unwrap();
        assert_eq!(notes.value(0), "5");
        assert_eq!(notes.value(1), "five");
    }

    #[test]
    fn test_convert_dates_around_epoch() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            "CREATE TABLE events (day DATE);
             INSERT INTO events VALUES ('1970-01-01'), ('1969-12-31'), ('2009-01-01');",
        )
        .unwrap();

        let converted = convert_table(&read_table(&conn, "events").unwrap()).unwrap();
        let days = converted
            .batch
            .column(0)
            .as_any()
            .downcast_ref::<Date32Array>()
            .unwrap();
        assert_eq!(days.value(0), 0);
        assert_eq!(days.value(1), -1);
        assert_eq!(days.value(2), 14_245);
    }

    #[test]
    fn test_mixed_column_keeps_real_fraction() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            "CREATE TABLE readings (v);
             INSERT INTO readings VALUES (1.0), (2), ('n/a'), (0.5);",
        )
        .unwrap();

        let converted = convert_table(&read_table(&conn, "readings").unwrap()).unwrap();
        assert_eq!(converted.kinds, vec![ColumnKind::Text]);

        let values = converted
            .batch
            .column(0)
            .as_any()
            .downcast_ref::<StringArray>()
            .unwrap();
        assert_eq!(values.value(0), "1.0");
        assert_eq!(values.value(1), "2");
        assert_eq!(values.value(2), "n/a");
        assert_eq!(values.value(3), "0.5");
    }

    #[test]
    fn test_value_to_text_encodes_blob() {
        let text = value_to_text(&Value::Blob(vec![0x48, 0x65, 0x6c, 0x6c, 0x6f])).unwrap();
        assert_eq!(text, "SGVsbG8=");
        assert_eq!(value_to_text(&Value::Null), None);
        assert_eq!(value_to_text(&Value::Real(3.0)).unwrap(), "3.0");
        assert_eq!(value_to_text(&Value::Real(-0.25)).unwrap(), "-0.25");
    }

    #[test]
    fn test_convert_empty_table_keeps_schema() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute(
            "CREATE TABLE Genre (GenreId INTEGER NOT NULL, Name NVARCHAR(120))",
            [],
        )
        .unwrap();

        let converted = convert_table(&read_table(&conn, "Genre").unwrap()).unwrap();
        assert_eq!(converted.batch.num_rows(), 0);
        assert_eq!(
            converted.columns(),
            vec![
                ("GenreId".to_string(), ColumnKind::Integer),
                ("Name".to_string(), ColumnKind::Text)
            ]
        );
        assert_eq!(
            converted.batch.schema().field(0).data_type(),
            &DataType::Int64
        );
    }
}
