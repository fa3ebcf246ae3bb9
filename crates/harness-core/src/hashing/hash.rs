//! Digest sha256 en hex.

use sha2::{Digest, Sha256};

/// Hashea un string y devuelve hex (64 caracteres).
pub fn hash_str(input: &str) -> String {
    format!("{:x}", Sha256::digest(input.as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::hash_str;

    #[test]
    fn empty_input_has_known_digest() {
        assert_eq!(hash_str(""),
                   "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855");
    }

    #[test]
    fn digest_is_hex_of_fixed_length() {
        let h = hash_str("{\"comm\":\"nc\"}\n");
        assert_eq!(h.len(), 64);
        assert!(h.chars().all(|c| c.is_ascii_hexdigit()));
    }
}
