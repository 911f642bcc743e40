//! Parses the NDJSON commit body (spec §4.1): one JSON object per line,
//! the first of which must be a `header`, the rest one of `file`,
//! `lfsFile`, `deletedFile`, `deletedFolder`, or `copyFile`.

use crate::error::{CommitError, Result};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde::Deserialize;

/// The commit's summary/description, carried on the mandatory first line.
#[derive(Debug, Clone, Deserialize)]
pub struct CommitHeader {
    /// One-line commit summary. May be empty, but the header line itself
    /// is mandatory (spec §4.1 step 1).
    pub summary: String,
    /// Optional longer commit body.
    #[serde(default)]
    pub description: Option<String>,
}

/// A single decoded commit operation.
#[derive(Debug, Clone)]
pub enum Operation {
    /// Write `content` (already base64-decoded) to `path`, inline in
    /// the versioned store, unless it is at or above the effective LFS
    /// threshold.
    File { path: String, content: Vec<u8> },
    /// Attach an object already uploaded to the LFS blob store to `path`.
    LfsFile {
        path: String,
        algo: String,
        oid: String,
        size: u64,
    },
    /// Delete the live file at `path`.
    DeletedFile { path: String },
    /// Recursively delete everything under `path/`.
    DeletedFolder { path: String },
    /// Link `path` to the content currently at `src_path` on
    /// `src_revision` (defaulting to the commit's own branch),
    /// without copying bytes.
    CopyFile {
        path: String,
        src_path: String,
        src_revision: Option<String>,
    },
}

impl Operation {
    /// The path this operation targets — the collapsing key for
    /// "last write to a path wins" (spec §4.1 step 3).
    #[must_use]
    pub fn path(&self) -> &str {
        match self {
            Operation::File { path, .. }
            | Operation::LfsFile { path, .. }
            | Operation::DeletedFile { path }
            | Operation::DeletedFolder { path }
            | Operation::CopyFile { path, .. } => path,
        }
    }
}

/// A parsed, not-yet-applied commit request.
#[derive(Debug, Clone)]
pub struct CommitRequest {
    pub header: CommitHeader,
    pub operations: Vec<Operation>,
}

#[derive(Deserialize)]
#[serde(tag = "key", rename_all = "camelCase")]
enum RawLine {
    Header {
        value: CommitHeader,
    },
    File {
        path: String,
        content: String,
        #[serde(default)]
        encoding: Option<String>,
    },
    LfsFile {
        path: String,
        algo: String,
        oid: String,
        size: u64,
    },
    DeletedFile {
        path: String,
    },
    DeletedFolder {
        path: String,
    },
    CopyFile {
        path: String,
        src_path: String,
        #[serde(default)]
        src_revision: Option<String>,
    },
}

/// A path is rejected if it's empty, absolute, or escapes its own
/// repository via a `..` segment. Spec §4.1 "Edge cases" explicitly
/// accepts long paths (1024 bytes) and deep nesting (64 segments), so
/// this only rejects structurally unsafe paths, not merely large ones.
fn validate_path(path: &str) -> Result<()> {
    if path.is_empty() {
        return Err(CommitError::BadRequest("empty path".into()));
    }
    if path.starts_with('/') || path.ends_with('/') {
        return Err(CommitError::BadRequest(format!(
            "path must not start or end with '/': {path}"
        )));
    }
    if path.split('/').any(|seg| seg.is_empty() || seg == "." || seg == "..") {
        return Err(CommitError::BadRequest(format!("unsafe path: {path}")));
    }
    Ok(())
}

/// Parses the NDJSON commit body into a [`CommitRequest`].
///
/// Never panics on arbitrary UTF-8 input: malformed lines surface as
/// [`CommitError::BadRequest`], never a panic (this function is a fuzz
/// target — see `fuzz/fuzz_targets/fuzz_ndjson_commit.rs`).
pub fn parse_ndjson_operations(body: &str) -> Result<CommitRequest> {
    let mut lines = body.lines().filter(|l| !l.trim().is_empty());

    let first = lines
        .next()
        .ok_or_else(|| CommitError::BadRequest("empty commit body".into()))?;
    let header = match serde_json::from_str::<RawLine>(first) {
        Ok(RawLine::Header { value }) => value,
        Ok(_) => return Err(CommitError::BadRequest("first line must be a header".into())),
        Err(e) => return Err(CommitError::BadRequest(format!("invalid header line: {e}"))),
    };

    let mut operations = Vec::new();
    for line in lines {
        let raw: RawLine = serde_json::from_str(line)
            .map_err(|e| CommitError::BadRequest(format!("invalid operation line: {e}")))?;
        let op = match raw {
            RawLine::Header { .. } => {
                return Err(CommitError::BadRequest("duplicate header line".into()))
            }
            RawLine::File { path, content, encoding } => {
                validate_path(&path)?;
                if encoding.as_deref().is_some_and(|e| e != "base64") {
                    return Err(CommitError::BadRequest(format!(
                        "unsupported content encoding: {}",
                        encoding.unwrap()
                    )));
                }
                let decoded = BASE64
                    .decode(content.as_bytes())
                    .map_err(|e| CommitError::BadRequest(format!("invalid base64 content: {e}")))?;
                Operation::File { path, content: decoded }
            }
            RawLine::LfsFile { path, algo, oid, size } => {
                validate_path(&path)?;
                if algo != "sha256" {
                    return Err(CommitError::BadRequest(format!("unsupported lfs algo: {algo}")));
                }
                if oid.len() != 64 || !oid.bytes().all(|b| b.is_ascii_hexdigit()) {
                    return Err(CommitError::BadRequest(format!("invalid lfs oid: {oid}")));
                }
                Operation::LfsFile { path, algo, oid, size }
            }
            RawLine::DeletedFile { path } => {
                validate_path(&path)?;
                Operation::DeletedFile { path }
            }
            RawLine::DeletedFolder { path } => {
                validate_path(&path)?;
                Operation::DeletedFolder { path }
            }
            RawLine::CopyFile { path, src_path, src_revision } => {
                validate_path(&path)?;
                validate_path(&src_path)?;
                Operation::CopyFile { path, src_path, src_revision }
            }
        };
        operations.push(op);
    }

    Ok(CommitRequest { header, operations })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_header_and_file_operation() {
        let body = concat!(
            r#"{"key":"header","value":{"summary":"add a file"}}"#,
            "\n",
            r#"{"key":"file","path":"a.txt","content":"aGVsbG8="}"#,
        );
        let req = parse_ndjson_operations(body).unwrap();
        assert_eq!(req.header.summary, "add a file");
        assert_eq!(req.operations.len(), 1);
        match &req.operations[0] {
            Operation::File { path, content } => {
                assert_eq!(path, "a.txt");
                assert_eq!(content, b"hello");
            }
            _ => panic!("expected File"),
        }
    }

    #[test]
    fn rejects_missing_header() {
        let body = r#"{"key":"file","path":"a.txt","content":"aGVsbG8="}"#;
        assert!(parse_ndjson_operations(body).is_err());
    }

    #[test]
    fn rejects_empty_body() {
        assert!(parse_ndjson_operations("").is_err());
        assert!(parse_ndjson_operations("  \n  \n").is_err());
    }

    #[test]
    fn rejects_path_traversal() {
        let body = concat!(
            r#"{"key":"header","value":{"summary":"x"}}"#,
            "\n",
            r#"{"key":"deletedFile","path":"../etc/passwd"}"#,
        );
        assert!(parse_ndjson_operations(body).is_err());
    }

    #[test]
    fn accepts_long_deeply_nested_path() {
        let deep = (0..64).map(|i| format!("d{i}")).collect::<Vec<_>>().join("/");
        let path = format!("{deep}/{}", "f".repeat(1024 - deep.len() - 1));
        let body = format!(
            "{}\n{}",
            r#"{"key":"header","value":{"summary":"deep"}}"#,
            serde_json::json!({"key": "deletedFile", "path": path}),
        );
        assert!(parse_ndjson_operations(&body).is_ok());
    }

    #[test]
    fn parses_lfs_copy_and_folder_delete() {
        let oid = "a".repeat(64);
        let body = format!(
            concat!(
                r#"{{"key":"header","value":{{"summary":"multi"}}}}"#,
                "\n",
                r#"{{"key":"lfsFile","path":"big.bin","algo":"sha256","oid":"{oid}","size":123}}"#,
                "\n",
                r#"{{"key":"deletedFolder","path":"old"}}"#,
                "\n",
                r#"{{"key":"copyFile","path":"new.bin","srcPath":"big.bin","srcRevision":"main"}}"#,
            ),
            oid = oid
        );
        let req = parse_ndjson_operations(&body).unwrap();
        assert_eq!(req.operations.len(), 3);
        assert!(matches!(req.operations[0], Operation::LfsFile { .. }));
        assert!(matches!(req.operations[1], Operation::DeletedFolder { .. }));
        assert!(matches!(req.operations[2], Operation::CopyFile { .. }));
    }

    #[test]
    fn never_panics_on_arbitrary_utf8() {
        for s in ["{", "null", "\"just a string\"", "{}", "{\"key\":\"bogus\"}"] {
            let _ = parse_ndjson_operations(s);
        }
    }
}
