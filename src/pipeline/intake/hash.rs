use sha2::{Digest, Sha256};

/// SHA-256 over the raw file bytes, hex-encoded.
///
/// This is the proposal's identity: a pure function of content, independent
/// of filename or declared MIME type. Byte-identical uploads always map to
/// the same existing proposal.
pub fn content_hash(bytes: &[u8]) -> String {
    let digest = Sha256::digest(bytes);
    hex_encode(&digest)
}

fn hex_encode(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * 2);
    for b in bytes {
        use std::fmt::Write;
        let _ = write!(out, "{b:02x}");
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_is_deterministic() {
        let bytes = b"Proposal from Legacy Plumbing";
        assert_eq!(content_hash(bytes), content_hash(bytes));
    }

    #[test]
    fn different_content_different_hash() {
        assert_ne!(content_hash(b"Content A"), content_hash(b"Content B"));
    }

    #[test]
    fn hash_matches_known_vector() {
        // SHA-256 of the empty string
        assert_eq!(
            content_hash(b""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn hash_is_lowercase_hex_of_fixed_width() {
        let hash = content_hash(b"anything");
        assert_eq!(hash.len(), 64);
        assert!(hash.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }
}
