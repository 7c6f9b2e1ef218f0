//! Content identities.
//!
//! A file identity is the Base64 encoded SHA-256 digest of its bytes. A folder
//! identity is the digest of its direct children `(name, identity)` pairs taken
//! in name order, so that two identical trees hash the same regardless of the
//! order in which the file system enumerates them.

use base64::{engine::general_purpose as b64, Engine};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

const CHUNK_SIZE: usize = 64 * 1024;

/// Digest of an in-memory buffer.
#[must_use]
pub fn bytes_digest(data: &[u8]) -> String {
    b64::STANDARD.encode(Sha256::digest(data))
}

/// Digest of everything `reader` yields, read through a fixed size buffer.
pub fn reader_digest<R: Read>(mut reader: R) -> io::Result<String> {
    let mut hasher = Sha256::new();
    let mut buffer = vec![0u8; CHUNK_SIZE];
    loop {
        let n = match reader.read(&mut buffer) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };
        hasher.update(&buffer[..n]);
    }
    Ok(b64::STANDARD.encode(hasher.finalize()))
}

/// Digest of the file at `path`.
pub fn file_digest<P: AsRef<Path>>(path: P) -> io::Result<String> {
    reader_digest(File::open(path)?)
}

/// Digest of a folder given its direct children, keyed by child name.
///
/// Children with an empty identity (symbolic links) still contribute their
/// name.
#[must_use]
pub fn folder_digest(children: &BTreeMap<String, String>) -> String {
    let mut hasher = Sha256::new();
    for (name, id) in children {
        hasher.update(name.as_bytes());
        hasher.update([0u8]);
        hasher.update(id.as_bytes());
        hasher.update([0u8]);
    }
    b64::STANDARD.encode(hasher.finalize())
}
