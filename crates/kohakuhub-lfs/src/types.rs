//! Git LFS Batch API wire types (spec §4.4).

use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BatchOperation {
    Download,
    Upload,
}

#[derive(Debug, Deserialize)]
pub struct BatchRequest {
    pub operation: BatchOperation,
    #[serde(default)]
    pub transfers: Vec<String>,
    pub objects: Vec<BatchObjectRequest>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BatchObjectRequest {
    pub oid: String,
    pub size: i64,
}

#[derive(Debug, Serialize)]
pub struct BatchResponse {
    pub transfer: String,
    pub objects: Vec<BatchObjectResponse>,
}

#[derive(Debug, Serialize)]
pub struct BatchObjectResponse {
    pub oid: String,
    pub size: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub actions: Option<Actions>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ObjectError>,
}

#[derive(Debug, Default, Serialize)]
pub struct Actions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub download: Option<Action>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub upload: Option<Action>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verify: Option<Action>,
}

#[derive(Debug, Serialize)]
pub struct Action {
    pub href: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_in: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub header: Option<Value>,
}

#[derive(Debug, Serialize)]
pub struct ObjectError {
    pub code: u16,
    pub message: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct VerifyRequest {
    pub oid: String,
    pub size: i64,
}

/// `header` payload for a multipart upload action (spec §4.4): the part
/// size the server chose, and a presigned PUT per part.
#[derive(Debug, Serialize, Deserialize)]
pub struct MultipartHeader {
    pub chunk_size: u64,
    pub parts: Vec<MultipartPart>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MultipartPart {
    pub part_number: u32,
    pub href: String,
}
