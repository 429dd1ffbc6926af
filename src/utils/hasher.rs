//! 内容寻址哈希
//!
//! 把原始 URL、别名等变长字符串转换为定长索引键。

use sha2::{Digest, Sha256};

/// Fixed-width lookup key: lowercase hex SHA-256 digest (64 chars).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct IndexKey(String);

impl IndexKey {
    pub const LEN: usize = 64;

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for IndexKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for IndexKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Deterministically hash `s`. The empty string is a valid input.
pub fn hash(s: &str) -> IndexKey {
    let digest = Sha256::digest(s.as_bytes());
    IndexKey(hex::encode(digest))
}
