// Hashing utilities

use sha2::{Sha256, Digest};
use crate::core::Hash256;

/// Single SHA256 hash, the ledger's only digest function
pub fn sha256(data: &[u8]) -> Hash256 {
    let digest = Sha256::digest(data);
    let mut result = [0u8; 32];
    result.copy_from_slice(&digest);
    Hash256::new(result)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sha256_deterministic() {
        let data = b"hello world";
        let hash = sha256(data);
        assert_eq!(hash, sha256(data));
        assert_ne!(hash, sha256(b"hello world!"));
    }

    #[test]
    fn test_sha256_known_vector() {
        assert_eq!(
            sha256(b"").to_hex(),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
        assert_eq!(
            sha256(b"abc").to_hex(),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }
}
