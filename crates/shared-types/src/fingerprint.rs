//! Content fingerprints for scanned documents

use sha2::{Digest, Sha256};

/// Compute SHA-256 hash of document bytes
pub fn hash_document(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

/// Short deterministic identifier derived from several string parts.
///
/// Parts are length-prefixed before hashing so `("ab", "c")` and `("a", "bc")`
/// never collide. Returns `prefix` followed by 16 hex characters.
pub fn stable_id(prefix: &str, parts: &[&str]) -> String {
    let mut hasher = Sha256::new();
    for part in parts {
        hasher.update((part.len() as u64).to_be_bytes());
        hasher.update(part.as_bytes());
    }
    let digest = hex::encode(hasher.finalize());
    format!("{}{}", prefix, &digest[..16])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_document_known_value() {
        assert_eq!(
            hash_document(b""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn test_stable_id_is_deterministic() {
        let a = stable_id("rev_", &["acme_com", "abc123"]);
        let b = stable_id("rev_", &["acme_com", "abc123"]);
        assert_eq!(a, b);
        assert!(a.starts_with("rev_"));
        assert_eq!(a.len(), "rev_".len() + 16);
    }

    #[test]
    fn test_stable_id_part_boundaries_matter() {
        assert_ne!(stable_id("x", &["ab", "c"]), stable_id("x", &["a", "bc"]));
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn hash_is_64_lowercase_hex(bytes in proptest::collection::vec(any::<u8>(), 0..512)) {
            let hash = hash_document(&bytes);
            prop_assert_eq!(hash.len(), 64);
            prop_assert!(hash.chars().all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c)));
        }
    }
}
