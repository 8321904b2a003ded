//! Deterministic paste naming.
//!
//! A paste's fingerprint is SHA-256 over `title ‖ date ‖ language ‖ content`
//! with no separator between fields, rendered as 64 lowercase hex characters.
//! Names are 16-character windows of that string: offset 0 first, then one
//! character further right on every collision.

use sha2::{Digest, Sha256};

/// Length of a paste name in hex characters.
pub const NAME_LEN: usize = 16;

/// Hex-encoded SHA-256 fingerprint of a paste's identifying fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fingerprint(String);

impl Fingerprint {
    pub fn compute(title: &str, date: &str, language: &str, content: &[u8]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(title.as_bytes());
        hasher.update(date.as_bytes());
        hasher.update(language.as_bytes());
        hasher.update(content);
        Self(hex::encode(hasher.finalize()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Candidate names in the order they are tried, offsets `0..=len - NAME_LEN`.
    pub fn candidates(&self) -> impl Iterator<Item = &str> + '_ {
        (0..=self.0.len() - NAME_LEN).map(move |offset| &self.0[offset..offset + NAME_LEN])
    }
}

/// True if `name` could have been produced by [`Fingerprint::candidates`].
///
/// Anything else is rejected before touching the filesystem, which also keeps
/// path separators and `..` out of store paths.
pub fn is_valid_name(name: &str) -> bool {
    name.len() == NAME_LEN
        && name
            .bytes()
            .all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
}
