//! The Git LFS Batch API (spec §4.4): turns a list of oids into
//! presigned upload/download actions against the blob store.

use crate::types::{
    Action, Actions, BatchOperation, BatchRequest, BatchResponse, MultipartHeader, MultipartPart,
    ObjectError,
};
use crate::validate_oid;
use kohakuhub_blobstore::BlobStore;
use kohakuhub_types::ContentHash;
use std::time::Duration;

const TRANSFER_BASIC: &str = "basic";

/// Scheme prefix on a multipart upload's `href`, carrying the blob
/// store's upload id for the completion step (spec §4.4: the client
/// completes the upload once every part has landed).
const MULTIPART_HREF_SCHEME: &str = "multipart://";

/// Resolves `req` into a [`BatchResponse`].
///
/// For `download`, objects that don't exist yet come back with a 404
/// object-level error rather than failing the whole batch (per the
/// Git LFS Batch API spec, partial failure is expected and normal).
/// For `upload`, objects already present in the blob store (global
/// content-addressed dedup) come back with no `actions` at all — the
/// client skips uploading bytes it knows the server already has.
///
/// `verify_href` is appended as the `verify` action on every upload
/// response so the client calls back after the PUT completes (spec
/// §4.4 "Verify").
///
/// Objects at or above `chunk_size` bytes get a multipart upload action
/// instead: `actions.upload.href` carries the blob store's upload id
/// (`multipart://<id>`) and `header` carries the chosen `chunk_size`
/// plus one presigned PUT per part (spec §4.4).
pub async fn handle_batch<F, Fut>(
    blobstore: &dyn BlobStore,
    req: BatchRequest,
    mut href_for: F,
    verify_href: Option<&str>,
    expires_in: Duration,
    chunk_size: u64,
) -> BatchResponse
where
    F: FnMut(&str) -> Fut,
    Fut: std::future::Future<Output = String>,
{
    let mut objects = Vec::with_capacity(req.objects.len());

    for obj in &req.objects {
        if validate_oid(&obj.oid).is_err() {
            objects.push(crate::types::BatchObjectResponse {
                oid: obj.oid.clone(),
                size: obj.size,
                actions: None,
                error: Some(ObjectError {
                    code: 422,
                    message: "invalid oid".into(),
                }),
            });
            continue;
        }

        let key = match ContentHash::from_hex(&obj.oid) {
            Ok(h) => h.lfs_key(),
            Err(_) => {
                objects.push(crate::types::BatchObjectResponse {
                    oid: obj.oid.clone(),
                    size: obj.size,
                    actions: None,
                    error: Some(ObjectError {
                        code: 422,
                        message: "invalid oid".into(),
                    }),
                });
                continue;
            }
        };

        let response = match req.operation {
            BatchOperation::Download => match blobstore.exists(&key).await {
                Ok(true) => crate::types::BatchObjectResponse {
                    oid: obj.oid.clone(),
                    size: obj.size,
                    actions: Some(Actions {
                        download: Some(Action {
                            href: href_for(&obj.oid).await,
                            expires_in: Some(expires_in.as_secs() as i64),
                            header: None,
                        }),
                        ..Default::default()
                    }),
                    error: None,
                },
                Ok(false) => crate::types::BatchObjectResponse {
                    oid: obj.oid.clone(),
                    size: obj.size,
                    actions: None,
                    error: Some(ObjectError {
                        code: 404,
                        message: "object does not exist".into(),
                    }),
                },
                Err(e) => crate::types::BatchObjectResponse {
                    oid: obj.oid.clone(),
                    size: obj.size,
                    actions: None,
                    error: Some(ObjectError {
                        code: 500,
                        message: e.to_string(),
                    }),
                },
            },
            BatchOperation::Upload => match blobstore.exists(&key).await {
                Ok(true) => crate::types::BatchObjectResponse {
                    oid: obj.oid.clone(),
                    size: obj.size,
                    actions: None,
                    error: None,
                },
                Ok(false) if obj.size as u64 > chunk_size => {
                    match multipart_upload_action(blobstore, &key, obj.size as u64, chunk_size, expires_in).await {
                        Ok(upload) => crate::types::BatchObjectResponse {
                            oid: obj.oid.clone(),
                            size: obj.size,
                            actions: Some(Actions {
                                upload: Some(upload),
                                verify: verify_href.map(|h| Action {
                                    href: h.to_string(),
                                    expires_in: None,
                                    header: None,
                                }),
                                ..Default::default()
                            }),
                            error: None,
                        },
                        Err(e) => crate::types::BatchObjectResponse {
                            oid: obj.oid.clone(),
                            size: obj.size,
                            actions: None,
                            error: Some(ObjectError { code: 500, message: e.to_string() }),
                        },
                    }
                }
                Ok(false) => crate::types::BatchObjectResponse {
                    oid: obj.oid.clone(),
                    size: obj.size,
                    actions: Some(Actions {
                        upload: Some(Action {
                            href: href_for(&obj.oid).await,
                            expires_in: Some(expires_in.as_secs() as i64),
                            header: None,
                        }),
                        verify: verify_href.map(|h| Action {
                            href: h.to_string(),
                            expires_in: None,
                            header: None,
                        }),
                        ..Default::default()
                    }),
                    error: None,
                },
                Err(e) => crate::types::BatchObjectResponse {
                    oid: obj.oid.clone(),
                    size: obj.size,
                    actions: None,
                    error: Some(ObjectError {
                        code: 500,
                        message: e.to_string(),
                    }),
                },
            },
        };
        objects.push(response);
    }

    BatchResponse {
        transfer: TRANSFER_BASIC.to_string(),
        objects,
    }
}

/// Begins a multipart upload at `key` and presigns a PUT for every part
/// of a `size`-byte object split into `chunk_size`-byte chunks.
async fn multipart_upload_action(
    blobstore: &dyn BlobStore,
    key: &str,
    size: u64,
    chunk_size: u64,
    expires_in: Duration,
) -> kohakuhub_blobstore::Result<Action> {
    let upload_id = blobstore.create_multipart_upload(key).await?;
    let part_count = size.div_ceil(chunk_size) as u32;
    let presigned = blobstore.presign_multipart_parts(key, &upload_id, part_count, expires_in).await?;

    let header = MultipartHeader {
        chunk_size,
        parts: presigned
            .into_iter()
            .map(|p| MultipartPart { part_number: p.part_number, href: p.href })
            .collect(),
    };

    Ok(Action {
        href: format!("{MULTIPART_HREF_SCHEME}{upload_id}"),
        expires_in: Some(expires_in.as_secs() as i64),
        header: Some(serde_json::to_value(header).expect("MultipartHeader always serializes")),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{BatchObjectRequest, BatchOperation};
    use kohakuhub_blobstore::MemoryBlobStore;

    const CHUNK_SIZE: u64 = 64 * 1024 * 1024;

    fn oid_of(data: &[u8]) -> String {
        ContentHash::compute(data).to_hex()
    }

    #[tokio::test]
    async fn download_of_missing_object_is_object_level_404() {
        let store = MemoryBlobStore::new();
        let oid = oid_of(b"missing");
        let req = BatchRequest {
            operation: BatchOperation::Download,
            transfers: vec![],
            objects: vec![BatchObjectRequest { oid: oid.clone(), size: 7 }],
        };
        let resp = handle_batch(&store, req, |o: &str| std::future::ready(format!("https://x/{o}")), None, Duration::from_secs(60), CHUNK_SIZE).await;
        assert_eq!(resp.objects.len(), 1);
        assert!(resp.objects[0].actions.is_none());
        assert_eq!(resp.objects[0].error.as_ref().unwrap().code, 404);
    }

    #[tokio::test]
    async fn upload_of_existing_object_skips_actions() {
        let store = MemoryBlobStore::new();
        let data = b"already here".to_vec();
        let oid = oid_of(&data);
        store
            .put(&ContentHash::from_hex(&oid).unwrap().lfs_key(), data.into())
            .await
            .unwrap();
        let req = BatchRequest {
            operation: BatchOperation::Upload,
            transfers: vec![],
            objects: vec![BatchObjectRequest { oid, size: 12 }],
        };
        let resp = handle_batch(&store, req, |o: &str| std::future::ready(format!("https://x/{o}")), None, Duration::from_secs(60), CHUNK_SIZE).await;
        assert!(resp.objects[0].actions.is_none());
        assert!(resp.objects[0].error.is_none());
    }

    #[tokio::test]
    async fn upload_of_new_object_gets_presigned_action_and_verify() {
        let store = MemoryBlobStore::new();
        let oid = oid_of(b"new bytes");
        let req = BatchRequest {
            operation: BatchOperation::Upload,
            transfers: vec![],
            objects: vec![BatchObjectRequest { oid, size: 9 }],
        };
        let resp = handle_batch(
            &store,
            req,
            |o: &str| std::future::ready(format!("https://x/{o}")),
            Some("https://x/verify"),
            Duration::from_secs(60),
            CHUNK_SIZE,
        )
        .await;
        let actions = resp.objects[0].actions.as_ref().unwrap();
        assert!(actions.upload.is_some());
        assert_eq!(actions.verify.as_ref().unwrap().href, "https://x/verify");
    }

    #[tokio::test]
    async fn upload_above_chunk_size_gets_multipart_action() {
        let store = MemoryBlobStore::new();
        let oid = oid_of(b"big object");
        let size = CHUNK_SIZE * 2 + 1;
        let req = BatchRequest {
            operation: BatchOperation::Upload,
            transfers: vec!["basic".to_string(), "multipart".to_string()],
            objects: vec![BatchObjectRequest { oid, size: size as i64 }],
        };
        let resp = handle_batch(
            &store,
            req,
            |o: &str| std::future::ready(format!("https://x/{o}")),
            Some("https://x/verify"),
            Duration::from_secs(60),
            CHUNK_SIZE,
        )
        .await;
        let actions = resp.objects[0].actions.as_ref().unwrap();
        let upload = actions.upload.as_ref().unwrap();
        assert!(upload.href.starts_with("multipart://"));
        let header: MultipartHeader = serde_json::from_value(upload.header.clone().unwrap()).unwrap();
        assert_eq!(header.chunk_size, CHUNK_SIZE);
        assert_eq!(header.parts.len(), 3);
        assert_eq!(header.parts[0].part_number, 1);
    }

    #[tokio::test]
    async fn invalid_oid_is_rejected_per_object() {
        let store = MemoryBlobStore::new();
        let req = BatchRequest {
            operation: BatchOperation::Download,
            transfers: vec![],
            objects: vec![BatchObjectRequest { oid: "not-hex".into(), size: 1 }],
        };
        let resp = handle_batch(&store, req, |o: &str| std::future::ready(format!("https://x/{o}")), None, Duration::from_secs(60), CHUNK_SIZE).await;
        assert_eq!(resp.objects[0].error.as_ref().unwrap().code, 422);
    }
}
