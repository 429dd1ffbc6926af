pub mod hasher;
pub mod url_validator;

pub use hasher::{IndexKey, hash};

/// Check that a caller-chosen alias is usable as a path segment.
///
/// Allowed: ASCII letters, digits, `-` and `_` (the URL-safe base64 alphabet),
/// 1..=`max_len` characters.
pub fn is_valid_alias(alias: &str, max_len: usize) -> bool {
    !alias.is_empty()
        && alias.len() <= max_len
        && alias
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
}
