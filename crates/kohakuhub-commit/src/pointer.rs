//! The Git LFS pointer-file text format (spec §4.3 "LFS pointer file
//! substitution"): the three-line stand-in for an LFS-backed blob's
//! content that both the REST tree listing and git's blob synthesis
//! need to agree on byte-for-byte, since its git blob sha depends on it.

/// Renders the canonical LFS pointer file for `oid`/`size`.
#[must_use]
pub fn render(oid_hex: &str, size: u64) -> Vec<u8> {
    format!("version https://git-lfs.github.com/spec/v1\noid sha256:{oid_hex}\nsize {size}\n").into_bytes()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_canonical_three_lines() {
        let bytes = render("e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b85", 1234);
        let text = String::from_utf8(bytes).unwrap();
        let mut lines = text.lines();
        assert_eq!(lines.next().unwrap(), "version https://git-lfs.github.com/spec/v1");
        assert_eq!(
            lines.next().unwrap(),
            "oid sha256:e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b85"
        );
        assert_eq!(lines.next().unwrap(), "size 1234");
        assert!(lines.next().is_none());
    }
}
