// ABOUTME: Migration settings from TOML config files and CLI flags
// ABOUTME: Layers flags over file values over defaults and validates the result

use crate::lake::parquet::ParquetCompression;
use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use std::fs;

pub const DEFAULT_SOURCE: &str = "sqlite:///Chinook.db";
pub const DEFAULT_DATABASE: &str = "chinook";

/// One layer of optional settings, from a config file or from CLI flags
#[derive(Debug, Default, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigLayer {
    pub source: Option<String>,
    pub bucket: Option<String>,
    pub database: Option<String>,
    pub region: Option<String>,
    pub compression: Option<ParquetCompression>,
}

impl ConfigLayer {
    /// Values set in `over` win, the rest fall through to `self`
    pub fn merge(self, over: ConfigLayer) -> ConfigLayer {
        ConfigLayer {
            source: over.source.or(self.source),
            bucket: over.bucket.or(self.bucket),
            database: over.database.or(self.database),
            region: over.region.or(self.region),
            compression: over.compression.or(self.compression),
        }
    }

    pub fn source_or_default(&self) -> String {
        self.source
            .clone()
            .unwrap_or_else(|| DEFAULT_SOURCE.to_string())
    }
}

pub fn load_config_file(path: &str) -> Result<ConfigLayer> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file at {}", path))?;
    toml::from_str(&raw).with_context(|| format!("Failed to parse TOML config at {}", path))
}

/// Read the optional config file and layer `flags` over it
pub fn resolve_layers(config_path: Option<&str>, flags: ConfigLayer) -> Result<ConfigLayer> {
    let file = match config_path {
        Some(path) => load_config_file(path)?,
        None => ConfigLayer::default(),
    };
    Ok(file.merge(flags))
}

/// Fully resolved settings for a `migrate` run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationSettings {
    pub source: String,
    pub bucket: String,
    pub database: String,
    pub region: Option<String>,
    pub compression: ParquetCompression,
}

impl MigrationSettings {
    /// Apply defaults; the bucket has none and must be set somewhere
    pub fn from_layer(layer: ConfigLayer) -> Result<Self> {
        let source = layer.source_or_default();
        let bucket = layer.bucket.ok_or_else(|| {
            anyhow!("No destination bucket configured. Pass --bucket or set `bucket` in the config file")
        })?;

        Ok(Self {
            source,
            bucket,
            database: layer
                .database
                .unwrap_or_else(|| DEFAULT_DATABASE.to_string()),
            region: layer.region,
            compression: layer.compression.unwrap_or_default(),
        })
    }
}
