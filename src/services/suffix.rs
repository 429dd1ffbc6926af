//! Random suffix generation

use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use tracing::debug;

use crate::errors::{Result, ShortstatError};
use crate::storage::LinkRecordStore;

pub const MIN_SUFFIX_BYTES: usize = 8;

/// Draws `num_bytes` random bytes from the thread-local CSPRNG and encodes
/// them as unpadded URL-safe base64 (8 bytes → 11 characters).
#[derive(Debug, Clone)]
pub struct SuffixGenerator {
    num_bytes: usize,
    max_attempts: u32,
}

impl Default for SuffixGenerator {
    fn default() -> Self {
        Self {
            num_bytes: MIN_SUFFIX_BYTES,
            max_attempts: 8,
        }
    }
}

impl SuffixGenerator {
    pub fn new(num_bytes: usize, max_attempts: u32) -> Result<Self> {
        if num_bytes < MIN_SUFFIX_BYTES {
            return Err(ShortstatError::config(format!(
                "suffix must use at least {} random bytes, got {}",
                MIN_SUFFIX_BYTES, num_bytes
            )));
        }
        Ok(Self {
            num_bytes,
            max_attempts: max_attempts.max(1),
        })
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Encoded length of every suffix this generator produces.
    pub fn suffix_len(&self) -> usize {
        (self.num_bytes * 4).div_ceil(3)
    }

    /// One random candidate, not checked against any store.
    pub fn candidate(&self) -> String {
        let bytes: Vec<u8> = (0..self.num_bytes).map(|_| rand::random::<u8>()).collect();
        URL_SAFE_NO_PAD.encode(bytes)
    }

    /// A candidate with no existing record under it.
    ///
    /// This check alone is not race-free; the caller must still commit with
    /// `create_if_absent` and call `generate` again if that fails.
    pub async fn generate(&self, store: &LinkRecordStore) -> Result<String> {
        for attempt in 1..=self.max_attempts {
            let suffix = self.candidate();
            if !store.exists(&suffix).await? {
                return Ok(suffix);
            }
            // 碰撞概率极低，出现时记录下来
            debug!(
                "Suffix collision on {} (attempt {}/{})",
                suffix, attempt, self.max_attempts
            );
        }
        Err(ShortstatError::generation_exhausted(format!(
            "no free suffix after {} attempts",
            self.max_attempts
        )))
    }
}
