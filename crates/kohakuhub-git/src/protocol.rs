//! Git smart HTTP protocol implementation.
//!
//! Implements the upload-pack side of the git smart HTTP protocol
//! (fetch/clone). See: <https://git-scm.com/docs/http-protocol>
//!
//! Push (`git-receive-pack`) is not implemented: the versioned store, not
//! the git object graph, is the system of record, so accepting pushes
//! would require reconciling an arbitrary pack against it. Callers should
//! answer receive-pack requests with [`receive_pack_not_supported`]
//! before this module is ever reached.

use crate::pack::{PackBuilder, PackParser};
use crate::pktline::{PktLine, PktLineReader, PktLineWriter};
use crate::tree::parse_tree;
use crate::{GitError, Result};
use kohakuhub_storage::{ObjectStore, ObjectType};
use kohakuhub_types::Oid;
use std::io::{Read, Write};

/// Maximum payload bytes per side-band pkt-line (the `side-band-64k` limit).
const SIDE_BAND_CHUNK: usize = 0xfff0;

/// Capabilities this server advertises on `info/refs` and negotiates
/// during upload-pack.
fn capabilities() -> String {
    format!(
        "multi_ack side-band-64k thin-pack ofs-delta agent=kohakuhub/{}",
        env!("CARGO_PKG_VERSION")
    )
}

/// A single advertised ref: a name and the object it currently points to.
#[derive(Debug, Clone)]
pub struct RefAdvertisement {
    /// Object id the ref points to.
    pub id: Oid,
    /// Fully qualified ref name, e.g. `refs/heads/main`.
    pub name: String,
}

/// Advertises refs to a client beginning a fetch or clone.
///
/// `head` is the object `HEAD` currently resolves to (`None` for an empty
/// repository). `refs` need not be pre-sorted: this function orders them
/// `HEAD` first, then `refs/heads/*`, then `refs/tags/*`, each group
/// sorted by name, per the advertisement order clients expect.
pub fn advertise_refs<W: Write>(
    writer: &mut W,
    head: Option<Oid>,
    refs: &[RefAdvertisement],
    service: &str,
) -> Result<()> {
    let mut pkt_writer = PktLineWriter::new(writer);

    pkt_writer.write(&PktLine::from_string(&format!("# service={service}\n")))?;
    pkt_writer.flush_pkt()?;

    let caps = capabilities();

    let mut heads: Vec<&RefAdvertisement> =
        refs.iter().filter(|r| r.name.starts_with("refs/heads/")).collect();
    heads.sort_by(|a, b| a.name.cmp(&b.name));
    let mut tags: Vec<&RefAdvertisement> =
        refs.iter().filter(|r| r.name.starts_with("refs/tags/")).collect();
    tags.sort_by(|a, b| a.name.cmp(&b.name));

    let first_line = match head {
        Some(head_id) => format!("{head_id} HEAD\0{caps}\n"),
        None => format!("{} capabilities^{{}}\0{caps}\n", Oid::ZERO),
    };
    pkt_writer.write(&PktLine::from_string(&first_line))?;

    for r in heads.into_iter().chain(tags) {
        pkt_writer.write_line(&format!("{} {}", r.id, r.name))?;
    }

    pkt_writer.flush_pkt()?;
    pkt_writer.flush()?;

    Ok(())
}

/// Want/have negotiation state read from an upload-pack request body.
#[derive(Debug, Clone, Default)]
pub struct WantHave {
    /// Object ids the client wants.
    pub wants: Vec<Oid>,
    /// Object ids the client claims to already have.
    pub haves: Vec<Oid>,
}

impl WantHave {
    /// Parses `want`/`have`/`done` lines from the client.
    pub fn parse<R: Read>(reader: &mut R) -> Result<Self> {
        let mut pkt_reader = PktLineReader::new(reader);
        let mut wants = Vec::new();
        let mut haves = Vec::new();

        loop {
            match pkt_reader.read()? {
                Some(PktLine::Data(data)) => {
                    let line = String::from_utf8_lossy(&data);
                    let line = line.trim();

                    if let Some(rest) = line.strip_prefix("want ") {
                        let hex = rest.get(..40).ok_or_else(|| GitError::Protocol("truncated want line".to_string()))?;
                        wants.push(Oid::from_hex(hex)?);
                    } else if let Some(rest) = line.strip_prefix("have ") {
                        let hex = rest.get(..40).ok_or_else(|| GitError::Protocol("truncated have line".to_string()))?;
                        haves.push(Oid::from_hex(hex)?);
                    } else if line == "done" {
                        break;
                    }
                }
                Some(PktLine::Flush) => continue,
                _ => break,
            }
        }

        Ok(Self { wants, haves })
    }
}

/// Handles git-upload-pack: negotiates wants/haves, builds a pack
/// containing every reachable object the client doesn't already have,
/// and streams it over side-band channel 1.
pub fn upload_pack<R: Read, W: Write>(reader: &mut R, writer: &mut W, store: &ObjectStore) -> Result<()> {
    let want_have = WantHave::parse(reader)?;
    let mut pkt_writer = PktLineWriter::new(writer);

    if want_have.wants.is_empty() {
        pkt_writer.write_line("NAK")?;
        pkt_writer.flush()?;
        return Ok(());
    }

    let mut builder = PackBuilder::new();
    for want_id in &want_have.wants {
        collect_objects(store, want_id, &want_have.haves, &mut builder)?;
    }

    let pack = match builder.build() {
        Ok(pack) => pack,
        Err(e) => {
            let mut data = vec![3u8];
            data.extend_from_slice(e.to_string().as_bytes());
            pkt_writer.write(&PktLine::Data(data))?;
            pkt_writer.flush_pkt()?;
            pkt_writer.flush()?;
            return Err(e);
        }
    };

    pkt_writer.write_line("NAK")?;

    for chunk in pack.chunks(SIDE_BAND_CHUNK) {
        let mut data = vec![1u8];
        data.extend_from_slice(chunk);
        pkt_writer.write(&PktLine::Data(data))?;
    }

    pkt_writer.flush_pkt()?;
    pkt_writer.flush()?;

    Ok(())
}

/// Walks an object and everything it references (tree entries, commit
/// tree/parents) and adds each to `builder`, skipping anything the
/// client already claims to `have`.
fn collect_objects(store: &ObjectStore, id: &Oid, have: &[Oid], builder: &mut PackBuilder) -> Result<()> {
    if have.contains(id) || builder.contains(id) {
        return Ok(());
    }

    let object = store.get(id)?;
    builder.add(object.clone());

    match object.object_type {
        ObjectType::Commit => {
            let content = String::from_utf8_lossy(&object.data);
            for line in content.lines() {
                if line.is_empty() {
                    break;
                }
                if let Some(tree_hex) = line.strip_prefix("tree ") {
                    collect_objects(store, &Oid::from_hex(tree_hex)?, have, builder)?;
                } else if let Some(parent_hex) = line.strip_prefix("parent ") {
                    collect_objects(store, &Oid::from_hex(parent_hex)?, have, builder)?;
                }
            }
        }
        ObjectType::Tree => {
            for entry in parse_tree(&object.data)? {
                collect_objects(store, &entry.id, have, builder)?;
            }
        }
        ObjectType::Blob | ObjectType::Tag => {}
    }

    Ok(())
}

/// The fixed response to a `git-receive-pack` request: push is not
/// supported, by design (see the module-level doc comment).
pub fn receive_pack_not_supported() -> GitError {
    GitError::Protocol("git-receive-pack is not supported; push via the commit API or LFS".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use kohakuhub_storage::GitObject;

    #[test]
    fn advertises_head_and_sorted_branches() {
        let store = ObjectStore::new();
        let blob = store.put_blob(b"test".to_vec());

        let refs = vec![
            RefAdvertisement {
                id: blob,
                name: "refs/heads/zeta".to_string(),
            },
            RefAdvertisement {
                id: blob,
                name: "refs/heads/alpha".to_string(),
            },
        ];

        let mut output = Vec::new();
        advertise_refs(&mut output, Some(blob), &refs, "git-upload-pack").unwrap();

        let output_str = String::from_utf8_lossy(&output);
        assert!(output_str.contains("git-upload-pack"));
        assert!(output_str.contains("HEAD"));
        let alpha_pos = output_str.find("refs/heads/alpha").unwrap();
        let zeta_pos = output_str.find("refs/heads/zeta").unwrap();
        assert!(alpha_pos < zeta_pos);
    }

    #[test]
    fn empty_repo_emits_synthetic_capabilities_line() {
        let mut output = Vec::new();
        advertise_refs(&mut output, None, &[], "git-upload-pack").unwrap();
        let output_str = String::from_utf8_lossy(&output);
        assert!(output_str.contains("capabilities^{}"));
        assert!(output_str.contains(&Oid::ZERO.to_hex()));
    }

    #[test]
    fn collect_objects_walks_commit_tree_and_blob() {
        let store = ObjectStore::new();
        let blob = GitObject::blob(b"hi\n".to_vec());
        let blob_id = store.put(blob);

        let tree = crate::tree::build_tree(vec![crate::tree::TreeEntry::file("a.txt", blob_id)]);
        let tree_id = store.put(tree);

        let commit = GitObject::commit(&tree_id, &[], "a <a@x> 0 +0000", "a <a@x> 0 +0000", "msg");
        let commit_id = store.put(commit);

        let mut builder = PackBuilder::new();
        collect_objects(&store, &commit_id, &[], &mut builder).unwrap();
        assert!(builder.contains(&commit_id));
        assert!(builder.contains(&tree_id));
        assert!(builder.contains(&blob_id));
    }

    #[test]
    fn collect_objects_skips_objects_client_already_has() {
        let store = ObjectStore::new();
        let blob_id = store.put_blob(b"hi\n".to_vec());
        let mut builder = PackBuilder::new();
        collect_objects(&store, &blob_id, &[blob_id], &mut builder).unwrap();
        assert!(!builder.contains(&blob_id));
    }
}
