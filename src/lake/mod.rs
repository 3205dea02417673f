// ABOUTME: Destination data lake: object storage plus catalog
// ABOUTME: Parses lake targets, builds storage/catalog backends and table object paths

pub mod catalog;
pub mod glue;
pub mod parquet;
pub mod s3;
pub mod storage;

use anyhow::{anyhow, bail, Context, Result};
use aws_config::{BehaviorVersion, Region};
use self::catalog::{Catalog, LocalCatalog};
use self::glue::GlueCatalog;
use self::parquet::ParquetCompression;
use self::s3::S3Storage;
use self::storage::{LocalStorage, ObjectStorage};
use crate::utils::encode_key_segment;
use std::path::PathBuf;
use std::sync::Arc;
use url::Url;

/// File name of the JSON catalog kept at the root of a local lake
pub const LOCAL_CATALOG_FILE: &str = "_catalog.json";

/// Where lake tables are written
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LakeTarget {
    /// S3 bucket, catalog in AWS Glue
    S3 { bucket: String },
    /// Local directory, catalog in `<dir>/_catalog.json`
    Local(PathBuf),
}

impl LakeTarget {
    /// Parse a destination string
    ///
    /// - `s3://bucket` or `bucket` - S3 bucket with the Glue catalog
    /// - `file:///path/to/lake` - local directory with a JSON catalog
    ///
    /// # Examples
    ///
    /// ```
    /// # use sqlite_lake_loader::lake::LakeTarget;
    /// assert_eq!(
    ///     LakeTarget::parse("s3://my-lake").unwrap(),
    ///     LakeTarget::S3 { bucket: "my-lake".to_string() }
    /// );
    /// assert!(LakeTarget::parse("s3://my-lake/some/prefix").is_err());
    /// ```
    pub fn parse(target: &str) -> Result<Self> {
        let target = target.trim();
        if target.is_empty() {
            bail!("Destination bucket cannot be empty");
        }

        if !target.contains("://") {
            validate_bucket_name(target)?;
            return Ok(LakeTarget::S3 {
                bucket: target.to_string(),
            });
        }

        let url = Url::parse(target).with_context(|| format!("Invalid destination: {}", target))?;
        match url.scheme() {
            "s3" => {
                let bucket = url
                    .host_str()
                    .ok_or_else(|| anyhow!("S3 destination missing bucket: {}", target))?
                    .to_string();
                if !url.path().trim_matches('/').is_empty() {
                    bail!(
                        "S3 destination must be a bare bucket (s3://bucket), got: {}",
                        target
                    );
                }
                validate_bucket_name(&bucket)?;
                Ok(LakeTarget::S3 { bucket })
            }
            "file" => {
                let path = url
                    .to_file_path()
                    .map_err(|_| anyhow!("Invalid file:// destination: {}", target))?;
                Ok(LakeTarget::Local(path))
            }
            scheme => bail!("Unsupported destination scheme: {}", scheme),
        }
    }
}

/// Check the S3 bucket naming rules that matter for building URLs
fn validate_bucket_name(bucket: &str) -> Result<()> {
    let valid_chars = bucket
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' || c == '.');
    let valid_edges = bucket
        .chars()
        .next()
        .zip(bucket.chars().last())
        .is_some_and(|(first, last)| first.is_ascii_alphanumeric() && last.is_ascii_alphanumeric());

    if !(3..=63).contains(&bucket.len()) || !valid_chars || !valid_edges {
        bail!(
            "Invalid S3 bucket name '{}'. \
             Use 3-63 lowercase letters, digits, '-' or '.'",
            bucket
        );
    }
    Ok(())
}

/// Key prefix owning every object of one lake table, e.g. `chinook/Album/`
///
/// The table name is percent-encoded, so `Play List` lives under
/// `chinook/Play%20List/`.
pub fn table_prefix(database: &str, table: &str) -> String {
    format!("{}/{}/", database, encode_key_segment(table))
}

/// Key of the single data object written for a table
///
/// The name is fixed so that reruns write the same key.
pub fn data_object_key(database: &str, table: &str, compression: ParquetCompression) -> String {
    format!(
        "{}part-00000.{}",
        table_prefix(database, table),
        compression.file_suffix()
    )
}

/// Destination object storage and catalog, used together
#[derive(Clone)]
pub struct DataLake {
    storage: Arc<dyn ObjectStorage>,
    catalog: Arc<dyn Catalog>,
}

impl DataLake {
    pub fn new(storage: Arc<dyn ObjectStorage>, catalog: Arc<dyn Catalog>) -> Self {
        Self { storage, catalog }
    }

    /// Lake in a local directory with a JSON catalog at its root
    pub fn local(root: impl Into<PathBuf>) -> Result<Self> {
        let storage = LocalStorage::new(root.into())?;
        let catalog = LocalCatalog::new(storage.root().join(LOCAL_CATALOG_FILE));
        Ok(Self::new(Arc::new(storage), Arc::new(catalog)))
    }

    /// Build the storage and catalog backends for a target
    ///
    /// S3 targets load AWS credentials and region from the default provider
    /// chain. `region` overrides the chain's region when given.
    pub async fn connect(target: &LakeTarget, region: Option<&str>) -> Result<Self> {
        match target {
            LakeTarget::Local(root) => {
                tracing::info!("Using local lake at {}", root.display());
                Self::local(root.clone())
            }
            LakeTarget::S3 { bucket } => {
                let mut loader = aws_config::defaults(BehaviorVersion::latest());
                if let Some(region) = region {
                    loader = loader.region(Region::new(region.to_string()));
                }
                let sdk_config = loader.load().await;

                tracing::info!(
                    "Using S3 bucket '{}' with Glue catalog (region: {})",
                    bucket,
                    sdk_config
                        .region()
                        .map(|r| r.as_ref())
                        .unwrap_or("default")
                );

                let storage = S3Storage::new(aws_sdk_s3::Client::new(&sdk_config), bucket.clone());
                let catalog = GlueCatalog::new(aws_sdk_glue::Client::new(&sdk_config));
                Ok(Self::new(Arc::new(storage), Arc::new(catalog)))
            }
        }
    }

    pub fn storage(&self) -> &dyn ObjectStorage {
        self.storage.as_ref()
    }

    pub fn catalog(&self) -> &dyn Catalog {
        self.catalog.as_ref()
    }
}
