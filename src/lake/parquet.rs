// ABOUTME: Parquet encoding of converted tables
// ABOUTME: Serializes one Arrow batch into an in-memory Parquet object

use anyhow::{Context, Result};
use arrow::record_batch::RecordBatch;
use parquet::arrow::ArrowWriter;
use parquet::basic::{Compression, GzipLevel, ZstdLevel};
use parquet::file::properties::WriterProperties;
use serde::Deserialize;

/// Compression codec for written Parquet objects
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ParquetCompression {
    #[default]
    Snappy,
    Zstd,
    Gzip,
    #[serde(rename = "none")]
    #[value(name = "none")]
    Uncompressed,
}

impl ParquetCompression {
    fn codec(self) -> Compression {
        match self {
            ParquetCompression::Snappy => Compression::SNAPPY,
            ParquetCompression::Zstd => Compression::ZSTD(ZstdLevel::default()),
            ParquetCompression::Gzip => Compression::GZIP(GzipLevel::default()),
            ParquetCompression::Uncompressed => Compression::UNCOMPRESSED,
        }
    }

    /// File name suffix, e.g. `part-00000.snappy.parquet`
    pub fn file_suffix(self) -> &'static str {
        match self {
            ParquetCompression::Snappy => "snappy.parquet",
            ParquetCompression::Zstd => "zstd.parquet",
            ParquetCompression::Gzip => "gz.parquet",
            ParquetCompression::Uncompressed => "parquet",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ParquetCompression::Snappy => "snappy",
            ParquetCompression::Zstd => "zstd",
            ParquetCompression::Gzip => "gzip",
            ParquetCompression::Uncompressed => "none",
        }
    }
}

/// Encode a batch as a complete Parquet file held in memory
///
/// The whole batch lands in a single row group. A zero-row batch still
/// yields a valid file carrying the schema.
pub fn encode_batch(batch: &RecordBatch, compression: ParquetCompression) -> Result<Vec<u8>> {
    let props = WriterProperties::builder()
        .set_compression(compression.codec())
        .set_max_row_group_size(batch.num_rows().max(1))
        .build();

    let mut buffer = Vec::new();
    let mut writer = ArrowWriter::try_new(&mut buffer, batch.schema(), Some(props))
        .context("initializing Parquet writer")?;
    writer.write(batch).context("writing batch to Parquet")?;
    writer.close().context("closing Parquet writer")?;

    tracing::debug!(
        "Encoded {} rows as {} bytes of {} Parquet",
        batch.num_rows(),
        buffer.len(),
        compression.as_str()
    );

    Ok(buffer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use arrow::array::{ArrayRef, Int64Array, StringArray};
    use arrow::datatypes::{DataType, Field, Schema, SchemaRef};
    use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
    use std::io::Write;
    use std::sync::Arc;

    fn read_back(bytes: &[u8]) -> (SchemaRef, Vec<RecordBatch>) {
        let mut file = tempfile::tempfile().unwrap();
        file.write_all(bytes).unwrap();
        let builder = ParquetRecordBatchReaderBuilder::try_new(file).unwrap();
        let schema = builder.schema().clone();
        let batches = builder
            .build()
            .unwrap()
            .collect::<Result<Vec<_>, _>>()
            .unwrap();
        (schema, batches)
    }

    fn sample_batch(rows: usize) -> RecordBatch {
        let schema = Arc::new(Schema::new(vec![
            Field::new("ArtistId", DataType::Int64, true),
            Field::new("Name", DataType::Utf8, true),
        ]));
        let ids: ArrayRef = Arc::new(Int64Array::from(
            (0..rows as i64).map(Some).collect::<Vec<_>>(),
        ));
        let names: ArrayRef = Arc::new(StringArray::from(
            (0..rows).map(|i| Some(format!("artist {}", i))).collect::<Vec<_>>(),
        ));
        RecordBatch::try_new(schema, vec![ids, names]).unwrap()
    }

    #[test]
    fn test_encode_and_read_rows() {
        let batch = sample_batch(3);
        let bytes = encode_batch(&batch, ParquetCompression::Snappy).unwrap();
        assert_eq!(&bytes[..4], b"PAR1");

        let (schema, batches) = read_back(&bytes);
        assert_eq!(schema.fields().len(), 2);
        assert_eq!(batches.iter().map(|b| b.num_rows()).sum::<usize>(), 3);
    }

    #[test]
    fn test_encode_empty_batch_keeps_schema() {
        let batch = sample_batch(0);
        let bytes = encode_batch(&batch, ParquetCompression::Snappy).unwrap();

        let (schema, batches) = read_back(&bytes);
        assert_eq!(schema.field(0).name(), "ArtistId");
        assert_eq!(schema.field(1).data_type(), &DataType::Utf8);
        assert_eq!(batches.iter().map(|b| b.num_rows()).sum::<usize>(), 0);
    }

    #[test]
    fn test_all_codecs_produce_readable_files() {
        let batch = sample_batch(10);
        for compression in [
            ParquetCompression::Snappy,
            ParquetCompression::Zstd,
            ParquetCompression::Gzip,
            ParquetCompression::Uncompressed,
        ] {
            let bytes = encode_batch(&batch, compression).unwrap();
            let (_, batches) = read_back(&bytes);
            assert_eq!(
                batches.iter().map(|b| b.num_rows()).sum::<usize>(),
                10,
                "codec {}",
                compression.as_str()
            );
        }
    }

    #[test]
    fn test_file_suffixes() {
        assert_eq!(ParquetCompression::default(), ParquetCompression::Snappy);
        assert_eq!(ParquetCompression::Snappy.file_suffix(), "snappy.parquet");
        assert_eq!(ParquetCompression::Uncompressed.file_suffix(), "parquet");
    }
}
