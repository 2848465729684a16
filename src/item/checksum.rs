//! Content checksums for raw vault values

use sha2::{Digest, Sha256};

/// Lowercase hex SHA-256 of the given content
pub fn calculate_checksum(content: &str) -> String {
    calculate_checksum_bytes(content.as_bytes())
}

pub fn calculate_checksum_bytes(content: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content);
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_checksum_is_stable() {
        // Well-known SHA-256 of the empty string
        assert_eq!(
            calculate_checksum(""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
        assert_eq!(calculate_checksum("abc"), calculate_checksum("abc"));
        assert_ne!(calculate_checksum("abc"), calculate_checksum("abd"));
    }
}
