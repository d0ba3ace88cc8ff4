use sha2::{Digest, Sha256};

/// Lowercase hex SHA-256 digest of `input`.
pub fn sha256_hex(input: &str) -> String {
    format!("{:x}", Sha256::digest(input.as_bytes()))
}

/// Irreversibly hashes a column value: the SHA-256 hex digest of the SHA-256 hex digest.
pub fn hash_column_value(input: &str) -> String {
    sha256_hex(&sha256_hex(input))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hashes_known_vector() {
        assert_eq!(
            sha256_hex("abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn column_hash_is_double_digest() {
        let hashed = hash_column_value("13800000000");

        assert_eq!(hashed.len(), 64);
        assert_eq!(hashed, sha256_hex(&sha256_hex("13800000000")));
        assert_ne!(hashed, sha256_hex("13800000000"));
    }
}
