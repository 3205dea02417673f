// ABOUTME: AWS Glue Data Catalog implementation of the Catalog trait
// ABOUTME: Lists and creates databases and upserts external Parquet tables

use super::catalog::{Catalog, TableDefinition};
use anyhow::{Context, Result};
use async_trait::async_trait;
use aws_sdk_glue::types::{Column, DatabaseInput, SerDeInfo, StorageDescriptor, TableInput};
use aws_sdk_glue::Client as GlueClient;

#[derive(Clone)]
pub struct GlueCatalog {
    client: GlueClient,
}

impl GlueCatalog {
    pub fn new(client: GlueClient) -> Self {
        Self { client }
    }
}

fn table_input(table: &TableDefinition) -> Result<TableInput> {
    let columns = table
        .columns
        .iter()
        .map(|column| {
            Column::builder()
                .name(&column.name)
                .r#type(&column.data_type)
                .build()
        })
        .collect::<Result<Vec<_>, _>>()
        .with_context(|| format!("Failed to build Glue columns for table '{}'", table.name))?;

    let serde_info = SerDeInfo::builder()
        .serialization_library(&table.serde_library)
        .parameters("serialization.format", "1")
        .build();

    let storage = StorageDescriptor::builder()
        .set_columns(Some(columns))
        .location(&table.location)
        .input_format(&table.input_format)
        .output_format(&table.output_format)
        .compressed(table.parameters.get("compressionType").map(String::as_str) != Some("none"))
        .serde_info(serde_info)
        .build();

    TableInput::builder()
        .name(&table.name)
        .table_type(&table.table_type)
        .set_parameters(Some(table.parameters.clone().into_iter().collect()))
        .storage_descriptor(storage)
        .build()
        .with_context(|| format!("Failed to build Glue table input for '{}'", table.name))
}

#[async_trait]
impl Catalog for GlueCatalog {
    async fn list_databases(&self) -> Result<Vec<String>> {
        let mut pages = self.client.get_databases().into_paginator().send();

        let mut names = Vec::new();
        while let Some(page) = pages.next().await {
            let page = page.context("Failed to list Glue databases")?;
            names.extend(page.database_list().iter().map(|db| db.name().to_string()));
        }

        tracing::debug!("Glue catalog has {} databases", names.len());
        Ok(names)
    }

    async fn create_database(&self, name: &str) -> Result<()> {
        let input = DatabaseInput::builder()
            .name(name)
            .build()
            .with_context(|| format!("Failed to build Glue database input for '{}'", name))?;

        self.client
            .create_database()
            .database_input(input)
            .send()
            .await
            .with_context(|| format!("Failed to create Glue database '{}'", name))?;

        Ok(())
    }

    async fn upsert_table(&self, table: &TableDefinition) -> Result<()> {
        let input = table_input(table)?;

        let created = self
            .client
            .create_table()
            .database_name(&table.database)
            .table_input(input.clone())
            .send()
            .await;

        match created {
            Ok(_) => {
                tracing::debug!("Created Glue table {}.{}", table.database, table.name);
            }
            Err(err)
                if err
                    .as_service_error()
                    .is_some_and(|e| e.is_already_exists_exception()) =>
            {
                self.client
                    .update_table()
                    .database_name(&table.database)
                    .table_input(input)
                    .send()
                    .await
                    .with_context(|| {
                        format!(
                            "Failed to update Glue table {}.{}",
                            table.database, table.name
                        )
                    })?;
                tracing::debug!("Updated Glue table {}.{}", table.database, table.name);
            }
            Err(err) => {
                return Err(err).with_context(|| {
                    format!(
                        "Failed to create Glue table {}.{}",
                        table.database, table.name
                    )
                });
            }
        }

        Ok(())
    }
}
