use sha2::{Digest, Sha256};

/// Fingerprint of a scanned message: lowercase hex SHA-256 of the trimmed text.
///
/// Stored instead of the message so repeated submissions can be grouped in
/// reports without keeping the content itself.
pub fn fingerprint(content: &str) -> String {
    hex::encode(Sha256::digest(content.trim().as_bytes()))
}
