//! Checksum helpers.

/// Normalize a SHA-256 digest given as hex.
///
/// Returns the lower-case form, or `None` if `digest` is not exactly
/// 32 bytes of hex.
pub fn normalize_sha256(digest: &str) -> Option<String> {
    let bytes = hex::decode(digest.trim()).ok()?;
    if bytes.len() != 32 {
        return None;
    }
    Some(hex::encode(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;

    const HELLO: &str = "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824";

    #[test]
    fn test_normalize_sha256() {
        assert_eq!(normalize_sha256(HELLO).as_deref(), Some(HELLO));
        assert_eq!(
            normalize_sha256(&HELLO.to_uppercase()).as_deref(),
            Some(HELLO)
        );
    }

    #[test]
    fn test_rejects_bad_digests() {
        assert!(normalize_sha256("").is_none());
        assert!(normalize_sha256("abc").is_none());
        assert!(normalize_sha256(&HELLO[..62]).is_none());
        assert!(normalize_sha256(&format!("{HELLO}00")).is_none());
        assert!(normalize_sha256(&HELLO.replace('2', "g")).is_none());
    }
}
