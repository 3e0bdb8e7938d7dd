//! SHA-256 hashing utilities.

use sha2::{Digest, Sha256};

/// Hash data using SHA-256
pub fn sha256(data: &[u8]) -> [u8; 32] {
    Sha256::digest(data).into()
}

/// Lower-case hex SHA-256 digest (64 characters)
pub fn sha256_hex(data: &[u8]) -> String {
    hex::encode(sha256(data))
}

/// One-way hash of a national identity number.
///
/// Whitespace is stripped first so `"010190 12345"` and `"01019012345"`
/// hash identically. Returns 64 lower-case hex characters.
pub fn hash_national_id(national_id: &str) -> String {
    let normalized: String = national_id.chars().filter(|c| !c.is_whitespace()).collect();
    sha256_hex(normalized.as_bytes())
}

/// Short, non-reversible fingerprint of a secret value for log correlation.
pub fn hash_for_log(value: &str) -> String {
    let hash = sha256(value.as_bytes());
    hex::encode(&hash[..8])
}

/// Securely compare two byte slices in constant time
pub fn constant_time_compare(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }

    let mut result = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        result |= x ^ y;
    }

    result == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sha256_known_vector() {
        assert_eq!(
            sha256_hex(b"abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_hash_national_id_is_64_hex() {
        let hash = hash_national_id("01019012345");
        assert_eq!(hash.len(), 64);
        assert!(hash.chars().all(|c| c.is_ascii_hexdigit()));
        assert!(!hash.contains("01019012345"));
    }

    #[test]
    fn test_hash_national_id_ignores_whitespace() {
        assert_eq!(
            hash_national_id("010190 12345"),
            hash_national_id("01019012345")
        );
    }

    #[test]
    fn test_hash_for_log_is_truncated() {
        assert_eq!(hash_for_log("some-state").len(), 16);
    }

    #[test]
    fn test_constant_time_compare() {
        assert!(constant_time_compare(b"secret", b"secret"));
        assert!(!constant_time_compare(b"secret", b"public"));
        assert!(!constant_time_compare(b"secret", b"sec"));
    }
}
