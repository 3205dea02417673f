// ABOUTME: S3-backed object storage for lake table data
// ABOUTME: Lists, deletes and writes objects in a single bucket via the AWS SDK

use super::storage::ObjectStorage;
use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::{Delete, ObjectIdentifier};
use aws_sdk_s3::Client as S3Client;

/// DeleteObjects accepts at most this many keys per request
const DELETE_BATCH_SIZE: usize = 1000;

/// ObjectStorage implementation for one S3 bucket
#[derive(Clone)]
pub struct S3Storage {
    client: S3Client,
    bucket: String,
}

impl S3Storage {
    pub fn new(client: S3Client, bucket: String) -> Self {
        Self { client, bucket }
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }
}

#[async_trait]
impl ObjectStorage for S3Storage {
    fn url(&self, key: &str) -> String {
        format!("s3://{}/{}", self.bucket, key)
    }

    async fn list_keys(&self, prefix: &str) -> Result<Vec<String>> {
        let mut pages = self
            .client
            .list_objects_v2()
            .bucket(&self.bucket)
            .prefix(prefix)
            .into_paginator()
            .send();

        let mut keys = Vec::new();
        while let Some(page) = pages.next().await {
            let page = page.with_context(|| {
                format!("Failed to list objects under {}", self.url(prefix))
            })?;
            keys.extend(
                page.contents()
                    .iter()
                    .filter_map(|object| object.key())
                    .map(str::to_string),
            );
        }

        keys.sort();
        Ok(keys)
    }

    async fn delete_keys(&self, keys: &[String]) -> Result<()> {
        for chunk in keys.chunks(DELETE_BATCH_SIZE) {
            let objects = chunk
                .iter()
                .map(|key| ObjectIdentifier::builder().key(key).build())
                .collect::<Result<Vec<_>, _>>()
                .context("Failed to build S3 object identifiers")?;
            let delete = Delete::builder()
                .set_objects(Some(objects))
                .quiet(true)
                .build()
                .context("Failed to build S3 delete request")?;

            let output = self
                .client
                .delete_objects()
                .bucket(&self.bucket)
                .delete(delete)
                .send()
                .await
                .with_context(|| format!("Failed to delete objects in bucket {}", self.bucket))?;

            if let Some(error) = output.errors().first() {
                bail!(
                    "Failed to delete {} ({} of {} keys failed): {}",
                    self.url(error.key().unwrap_or_default()),
                    output.errors().len(),
                    chunk.len(),
                    error.message().unwrap_or("unknown error")
                );
            }

            tracing::debug!("Deleted {} objects from bucket {}", chunk.len(), self.bucket);
        }

        Ok(())
    }

    async fn put_object(&self, key: &str, body: Vec<u8>) -> Result<()> {
        let size = body.len();
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(ByteStream::from(body))
            .send()
            .await
            .with_context(|| format!("Failed to upload {}", self.url(key)))?;

        tracing::debug!("Uploaded {} bytes to {}", size, self.url(key));
        Ok(())
    }
}
