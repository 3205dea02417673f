// ABOUTME: Catalog abstraction for lake databases and table metadata
// ABOUTME: Defines the Catalog trait, Parquet table definitions and a JSON-file catalog

use super::storage::write_atomically;
use crate::sqlite::converter::ColumnKind;
use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

pub const PARQUET_INPUT_FORMAT: &str = "org.apache.hadoop.hive.ql.io.parquet.MapredParquetInputFormat";
pub const PARQUET_OUTPUT_FORMAT: &str =
    "org.apache.hadoop.hive.ql.io.parquet.MapredParquetOutputFormat";
pub const PARQUET_SERDE_LIBRARY: &str =
    "org.apache.hadoop.hive.ql.io.parquet.serde.ParquetHiveSerDe";
pub const EXTERNAL_TABLE: &str = "EXTERNAL_TABLE";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogColumn {
    pub name: String,
    /// Hive type name (`bigint`, `string`, ...)
    #[serde(rename = "type")]
    pub data_type: String,
}

/// Everything the catalog records about one lake table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableDefinition {
    pub database: String,
    pub name: String,
    pub table_type: String,
    /// Prefix URL holding the table's data files, with trailing slash
    pub location: String,
    pub columns: Vec<CatalogColumn>,
    pub input_format: String,
    pub output_format: String,
    pub serde_library: String,
    pub parameters: BTreeMap<String, String>,
}

impl TableDefinition {
    /// Definition of an external Parquet table stored under `location`
    pub fn parquet(
        database: &str,
        name: &str,
        location: String,
        columns: &[(String, ColumnKind)],
        compression: &str,
    ) -> Self {
        let parameters = BTreeMap::from([
            ("classification".to_string(), "parquet".to_string()),
            ("compressionType".to_string(), compression.to_string()),
            ("typeOfData".to_string(), "file".to_string()),
        ]);

        Self {
            database: database.to_string(),
            name: name.to_string(),
            table_type: EXTERNAL_TABLE.to_string(),
            location,
            columns: columns
                .iter()
                .map(|(name, kind)| CatalogColumn {
                    name: name.clone(),
                    data_type: kind.catalog_type().to_string(),
                })
                .collect(),
            input_format: PARQUET_INPUT_FORMAT.to_string(),
            output_format: PARQUET_OUTPUT_FORMAT.to_string(),
            serde_library: PARQUET_SERDE_LIBRARY.to_string(),
            parameters,
        }
    }
}

/// Metadata registry a query engine reads to discover lake tables
#[async_trait]
pub trait Catalog: Send + Sync {
    /// Names of all databases currently in the catalog
    async fn list_databases(&self) -> Result<Vec<String>>;

    /// Create a database. Fails if it already exists.
    async fn create_database(&self, name: &str) -> Result<()>;

    /// Register a table, replacing the schema and location of an existing one
    async fn upsert_table(&self, table: &TableDefinition) -> Result<()>;
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct CatalogDocument {
    #[serde(default)]
    databases: BTreeMap<String, CatalogDatabase>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct CatalogDatabase {
    #[serde(default)]
    tables: BTreeMap<String, TableDefinition>,
}

/// Catalog persisted as a single JSON document on local disk
///
/// Mirrors the Glue behaviors the loader depends on: creating an existing
/// database fails, and tables can only be registered in existing databases.
#[derive(Debug, Clone)]
pub struct LocalCatalog {
    path: PathBuf,
}

impl LocalCatalog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Look up one registered table
    pub async fn table(&self, database: &str, name: &str) -> Result<Option<TableDefinition>> {
        let document = self.load().await?;
        Ok(document
            .databases
            .get(database)
            .and_then(|db| db.tables.get(name))
            .cloned())
    }

    /// Names of the tables registered in a database, sorted
    pub async fn table_names(&self, database: &str) -> Result<Vec<String>> {
        let document = self.load().await?;
        Ok(document
            .databases
            .get(database)
            .map(|db| db.tables.keys().cloned().collect())
            .unwrap_or_default())
    }

    async fn load(&self) -> Result<CatalogDocument> {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return Ok(CatalogDocument::default())
            }
            Err(err) => {
                return Err(err).with_context(|| {
                    format!("Failed to read catalog at {}", self.path.display())
                })
            }
        };

        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse catalog JSON at {}", self.path.display()))
    }

    async fn save(&self, document: &CatalogDocument) -> Result<()> {
        let body = serde_json::to_vec_pretty(document)
            .with_context(|| format!("Failed to serialize catalog at {}", self.path.display()))?;
        write_atomically(self.path.clone(), body)
            .await
            .with_context(|| format!("Failed to save catalog at {}", self.path.display()))
    }
}

#[async_trait]
impl Catalog for LocalCatalog {
    async fn list_databases(&self) -> Result<Vec<String>> {
        Ok(self.load().await?.databases.keys().cloned().collect())
    }

    async fn create_database(&self, name: &str) -> Result<()> {
        let mut document = self.load().await?;
        if document.databases.contains_key(name) {
            bail!("Database '{}' already exists in catalog", name);
        }
        document
            .databases
            .insert(name.to_string(), CatalogDatabase::default());
        self.save(&document).await
    }

    async fn upsert_table(&self, table: &TableDefinition) -> Result<()> {
        let mut document = self.load().await?;
        let database = match document.databases.get_mut(&table.database) {
            Some(database) => database,
            None => bail!(
                "Cannot register table '{}': database '{}' not found in catalog",
                table.name,
                table.database
            ),
        };
        database.tables.insert(table.name.clone(), table.clone());
        self.save(&document).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn album_definition(location: &str) -> TableDefinition {
        TableDefinition::parquet(
            "chinook",
            "Album",
            location.to_string(),
            &[
                ("AlbumId".to_string(), ColumnKind::Integer),
                ("Title".to_string(), ColumnKind::Text),
            ],
            "snappy",
        )
    }

    #[test]
    fn test_parquet_definition() {
        let def = album_definition("s3://bucket/chinook/Album/");

        assert_eq!(def.table_type, "EXTERNAL_TABLE");
        assert_eq!(def.serde_library, PARQUET_SERDE_LIBRARY);
        assert_eq!(def.parameters["classification"], "parquet");
        assert_eq!(def.parameters["compressionType"], "snappy");
        assert_eq!(
            def.columns,
            vec![
                CatalogColumn {
                    name: "AlbumId".to_string(),
                    data_type: "bigint".to_string()
                },
                CatalogColumn {
                    name: "Title".to_string(),
                    data_type: "string".to_string()
                },
            ]
        );
    }

    #[tokio::test]
    async fn test_create_database_once() {
        let dir = tempfile::tempdir().unwrap();
        let catalog = LocalCatalog::new(dir.path().join("_catalog.json"));

        assert!(catalog.list_databases().await.unwrap().is_empty());
        catalog.create_database("chinook").await.unwrap();
        assert_eq!(catalog.list_databases().await.unwrap(), vec!["chinook"]);

        let err = catalog.create_database("chinook").await.unwrap_err();
        assert!(err.to_string().contains("already exists"));
    }

    #[tokio::test]
    async fn test_upsert_requires_database() {
        let dir = tempfile::tempdir().unwrap();
        let catalog = LocalCatalog::new(dir.path().join("_catalog.json"));

        let err = catalog
            .upsert_table(&album_definition("file:///x/"))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("not found"));
    }

    #[tokio::test]
    async fn test_upsert_replaces_table() {
        let dir = tempfile::tempdir().unwrap();
        let catalog = LocalCatalog::new(dir.path().join("_catalog.json"));
        catalog.create_database("chinook").await.unwrap();

        catalog
            .upsert_table(&album_definition("file:///old/"))
            .await
            .unwrap();
        catalog
            .upsert_table(&album_definition("file:///new/"))
            .await
            .unwrap();

        assert_eq!(catalog.table_names("chinook").await.unwrap(), vec!["Album"]);
        let stored = catalog.table("chinook", "Album").await.unwrap().unwrap();
        assert_eq!(stored.location, "file:///new/");
        assert!(catalog.table("chinook", "Artist").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_catalog_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("_catalog.json");

        LocalCatalog::new(&path)
            .create_database("chinook")
            .await
            .unwrap();

        let reopened = LocalCatalog::new(&path);
        assert_eq!(reopened.list_databases().await.unwrap(), vec!["chinook"]);
    }
}
