//! Fuzz target for commit-payload NDJSON parsing.
//!
//! Tests that the header/file/lfsFile/deletedFile/deletedFolder/copyFile
//! operation parser handles arbitrary input without panicking.

#![no_main]

use kohakuhub_commit::parse_ndjson_operations;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(s) = std::str::from_utf8(data) {
        let _ = parse_ndjson_operations(s);
    }
});
