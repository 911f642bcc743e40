//! The production [`BlobStore`]: an S3-compatible backend via
//! `aws-sdk-s3`, presigning URLs against a public-facing endpoint that
//! may differ from the one this process talks to internally (spec §6:
//! `blob_endpoint` vs `blob_public_endpoint`, for the common case where
//! the hub reaches the object store over a private network but clients
//! must reach it over a public one).

use crate::{BlobStore, BlobStoreError, PresignedPart, Result};
use async_trait::async_trait;
use aws_sdk_s3::presigning::PresigningConfig;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::{CompletedMultipartUpload, CompletedPart};
use aws_sdk_s3::Client;
use bytes::Bytes;
use std::time::Duration;

/// An S3-compatible object store.
pub struct S3BlobStore {
    client: Client,
    bucket: String,
    /// If set, presigned URLs have their host rewritten to this base
    /// (e.g. the internal endpoint is `minio.internal:9000` but clients
    /// reach the same bucket at `https://blobs.example.com`).
    public_endpoint: Option<String>,
}

impl S3BlobStore {
    /// Wraps an already-configured S3 client.
    #[must_use]
    pub fn new(client: Client, bucket: impl Into<String>, public_endpoint: Option<String>) -> Self {
        Self {
            client,
            bucket: bucket.into(),
            public_endpoint,
        }
    }

    fn rewrite_host(&self, url: String) -> String {
        let Some(public) = &self.public_endpoint else {
            return url;
        };
        // Presigned URLs are `<scheme>://<host>[:port]/<bucket>/<key>?...`;
        // splice in the public base ahead of the path+query.
        if let Some(path_start) = url.find("//").and_then(|i| url[i + 2..].find('/')).map(|i| i + url.find("//").unwrap() + 2) {
            format!("{}{}", public.trim_end_matches('/'), &url[path_start..])
        } else {
            url
        }
    }
}

#[async_trait]
impl BlobStore for S3BlobStore {
    async fn put(&self, key: &str, data: Bytes) -> Result<()> {
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(ByteStream::from(data))
            .send()
            .await
            .map_err(|e| BlobStoreError::Backend(e.to_string()))?;
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Bytes> {
        let output = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| BlobStoreError::Backend(e.to_string()))?;
        let bytes = output
            .body
            .collect()
            .await
            .map_err(|e| BlobStoreError::Backend(e.to_string()))?
            .into_bytes();
        Ok(bytes)
    }

    async fn exists(&self, key: &str) -> Result<bool> {
        match self.client.head_object().bucket(&self.bucket).key(key).send().await {
            Ok(_) => Ok(true),
            Err(e) => {
                if e.as_service_error().is_some_and(|se| se.is_not_found()) {
                    Ok(false)
                } else {
                    Err(BlobStoreError::Backend(e.to_string()))
                }
            }
        }
    }

    async fn size(&self, key: &str) -> Result<Option<u64>> {
        match self.client.head_object().bucket(&self.bucket).key(key).send().await {
            Ok(output) => Ok(output.content_length.map(|n| n as u64)),
            Err(e) => {
                if e.as_service_error().is_some_and(|se| se.is_not_found()) {
                    Ok(None)
                } else {
                    Err(BlobStoreError::Backend(e.to_string()))
                }
            }
        }
    }

    async fn delete(&self, key: &str) -> Result<()> {
        // S3 DeleteObject is idempotent: deleting a missing key is a 204,
        // not an error, matching spec §4.4's GC contract.
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| BlobStoreError::Backend(e.to_string()))?;
        Ok(())
    }

    async fn presign_get(&self, key: &str, expires_in: Duration) -> Result<String> {
        let presign_config =
            PresigningConfig::expires_in(expires_in).map_err(|e| BlobStoreError::Presign(e.to_string()))?;
        let presigned = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .presigned(presign_config)
            .await
            .map_err(|e| BlobStoreError::Presign(e.to_string()))?;
        Ok(self.rewrite_host(presigned.uri().to_string()))
    }

    async fn presign_put(&self, key: &str, expires_in: Duration) -> Result<String> {
        let presign_config =
            PresigningConfig::expires_in(expires_in).map_err(|e| BlobStoreError::Presign(e.to_string()))?;
        let presigned = self
            .client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .presigned(presign_config)
            .await
            .map_err(|e| BlobStoreError::Presign(e.to_string()))?;
        Ok(self.rewrite_host(presigned.uri().to_string()))
    }

    async fn create_multipart_upload(&self, key: &str) -> Result<String> {
        let output = self
            .client
            .create_multipart_upload()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| BlobStoreError::Backend(e.to_string()))?;
        output
            .upload_id
            .ok_or_else(|| BlobStoreError::Backend("multipart create returned no upload id".into()))
    }

    async fn presign_multipart_parts(
        &self,
        key: &str,
        upload_id: &str,
        part_count: u32,
        expires_in: Duration,
    ) -> Result<Vec<PresignedPart>> {
        let mut parts = Vec::with_capacity(part_count as usize);
        for part_number in 1..=part_count {
            let presign_config =
                PresigningConfig::expires_in(expires_in).map_err(|e| BlobStoreError::Presign(e.to_string()))?;
            let presigned = self
                .client
                .upload_part()
                .bucket(&self.bucket)
                .key(key)
                .upload_id(upload_id)
                .part_number(part_number as i32)
                .presigned(presign_config)
                .await
                .map_err(|e| BlobStoreError::Presign(e.to_string()))?;
            parts.push(PresignedPart {
                part_number,
                href: self.rewrite_host(presigned.uri().to_string()),
            });
        }
        Ok(parts)
    }

    async fn complete_multipart_upload(&self, key: &str, upload_id: &str, parts: Vec<(u32, String)>) -> Result<()> {
        let completed_parts: Vec<CompletedPart> = parts
            .into_iter()
            .map(|(part_number, etag)| {
                CompletedPart::builder()
                    .part_number(part_number as i32)
                    .e_tag(etag)
                    .build()
            })
            .collect();

        self.client
            .complete_multipart_upload()
            .bucket(&self.bucket)
            .key(key)
            .upload_id(upload_id)
            .multipart_upload(CompletedMultipartUpload::builder().set_parts(Some(completed_parts)).build())
            .send()
            .await
            .map_err(|e| BlobStoreError::Backend(e.to_string()))?;
        Ok(())
    }

    async fn abort_multipart_upload(&self, key: &str, upload_id: &str) -> Result<()> {
        self.client
            .abort_multipart_upload()
            .bucket(&self.bucket)
            .key(key)
            .upload_id(upload_id)
            .send()
            .await
            .map_err(|e| BlobStoreError::Backend(e.to_string()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rewrite_host_splices_public_base() {
        let store = S3BlobStore::new(
            aws_sdk_s3::Client::from_conf(
                aws_sdk_s3::Config::builder()
                    .behavior_version(aws_sdk_s3::config::BehaviorVersion::latest())
                    .region(aws_sdk_s3::config::Region::new("us-east-1"))
                    .credentials_provider(aws_sdk_s3::config::Credentials::new("x", "y", None, None, "test"))
                    .build(),
            ),
            "bucket",
            Some("https://blobs.example.com".to_string()),
        );
        let rewritten = store.rewrite_host("http://minio.internal:9000/bucket/lfs/ab/cd/abcd?X-Amz-Signature=x".to_string());
        assert_eq!(rewritten, "https://blobs.example.com/bucket/lfs/ab/cd/abcd?X-Amz-Signature=x");
    }

    #[test]
    fn rewrite_host_is_noop_without_public_endpoint() {
        let store = S3BlobStore::new(
            aws_sdk_s3::Client::from_conf(
                aws_sdk_s3::Config::builder()
                    .behavior_version(aws_sdk_s3::config::BehaviorVersion::latest())
                    .region(aws_sdk_s3::config::Region::new("us-east-1"))
                    .credentials_provider(aws_sdk_s3::config::Credentials::new("x", "y", None, None, "test"))
                    .build(),
            ),
            "bucket",
            None,
        );
        let url = "http://minio.internal:9000/bucket/key?sig=x".to_string();
        assert_eq!(store.rewrite_host(url.clone()), url);
    }
}
