use crate::models::error::SError;
use camino::Utf8Path;
use std::fs::File;
use std::io;

/// Streams a file through blake3 and returns the hex digest.
pub fn hash_file(path: &Utf8Path) -> Result<String, SError> {
    let mut file = File::open(path)?;
    let mut hasher = blake3::Hasher::new();
    io::copy(&mut file, &mut hasher)?;
    Ok(hasher.finalize().to_hex().to_string())
}

pub fn hash_bytes(bytes: &[u8]) -> String {
    blake3::hash(bytes).to_hex().to_string()
}
