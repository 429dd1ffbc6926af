//! 直方图二进制编码
//!
//! Wire layout:
//!
//! ```text
//! [cookie: u32 BE][compressed_len: u32 BE][zlib(payload)]
//!
//! payload = [precision: u8][window_start: i64 BE][window_end: i64 BE]
//!           [used_len: u32 BE][counts...]
//! ```
//!
//! `counts` covers slots `0..used_len` (everything after the last non-zero
//! slot is implied zero). Each entry is a zig-zag LEB128 varint: a positive
//! value is a slot count, a negative value `-n` is a run of `n` empty slots.

use std::io::{Read, Write};

use bytes::{Buf, BufMut, BytesMut};
use flate2::Compression;
use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;

use super::VisitHistogram;
use crate::errors::{Result, ShortstatError};

const COOKIE: u32 = 0x5653_4831; // "VSH1"
const ENVELOPE_LEN: usize = 8;
const HEADER_LEN: usize = 1 + 8 + 8 + 4;
const MAX_VARINT_LEN: usize = 10;

impl VisitHistogram {
    /// Serialize into the compact, compressed binary form.
    pub fn encode(&self) -> Result<Vec<u8>> {
        let used_len = self
            .counts
            .iter()
            .rposition(|c| *c != 0)
            .map_or(0, |i| i + 1);

        let mut payload = BytesMut::with_capacity(HEADER_LEN + used_len);
        payload.put_u8(self.precision);
        payload.put_i64(self.window_start);
        payload.put_i64(self.window_end);
        payload.put_u32(used_len as u32);

        let mut zero_run: i64 = 0;
        for &count in &self.counts[..used_len] {
            if count == 0 {
                zero_run += 1;
                continue;
            }
            if zero_run > 0 {
                put_varint(&mut payload, zigzag(-zero_run));
                zero_run = 0;
            }
            let count = i64::try_from(count).map_err(|_| {
                ShortstatError::encoding(format!("bucket count {} exceeds i64", count))
            })?;
            put_varint(&mut payload, zigzag(count));
        }

        let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(&payload)?;
        let compressed = encoder.finish()?;

        let mut out = Vec::with_capacity(ENVELOPE_LEN + compressed.len());
        out.put_u32(COOKIE);
        out.put_u32(compressed.len() as u32);
        out.extend_from_slice(&compressed);
        Ok(out)
    }

    /// Parse bytes produced by [`encode`](Self::encode).
    ///
    /// Any structural problem (bad cookie, truncated data, counts that do
    /// not fit the declared window) is an `Encoding` error.
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let mut envelope = bytes;
        if envelope.remaining() < ENVELOPE_LEN {
            return Err(ShortstatError::encoding("histogram blob is truncated"));
        }
        let cookie = envelope.get_u32();
        if cookie != COOKIE {
            return Err(ShortstatError::encoding(format!(
                "unknown histogram cookie 0x{:08x}",
                cookie
            )));
        }
        let compressed_len = envelope.get_u32() as usize;
        if envelope.remaining() != compressed_len {
            return Err(ShortstatError::encoding(format!(
                "histogram length mismatch: declared {}, found {}",
                compressed_len,
                envelope.remaining()
            )));
        }

        // 先解出定长头部，再按 used_len 限制解压大小，防止解压炸弹
        let mut decoder = ZlibDecoder::new(envelope);
        let mut header = [0u8; HEADER_LEN];
        decoder.read_exact(&mut header)?;
        let mut header = &header[..];
        let precision = header.get_u8();
        let window_start = header.get_i64();
        let window_end = header.get_i64();
        let used_len = header.get_u32() as usize;

        let mut histogram = VisitHistogram::from_bounds(window_start, window_end, precision)
            .map_err(|e| ShortstatError::encoding(e.message()))?;
        if used_len > histogram.counts.len() {
            return Err(ShortstatError::encoding(format!(
                "histogram declares {} slots but window allows {}",
                used_len,
                histogram.counts.len()
            )));
        }

        let mut body = Vec::new();
        decoder
            .take((used_len * MAX_VARINT_LEN + 1) as u64)
            .read_to_end(&mut body)?;
        if body.len() > used_len * MAX_VARINT_LEN {
            return Err(ShortstatError::encoding("histogram payload is oversized"));
        }

        let mut body = &body[..];
        let mut index = 0usize;
        let mut total: u64 = 0;
        while body.has_remaining() {
            let value = unzigzag(get_varint(&mut body)?);
            if value < 0 {
                index = index
                    .checked_add(value.unsigned_abs() as usize)
                    .filter(|i| *i <= used_len)
                    .ok_or_else(|| ShortstatError::encoding("zero run overflows histogram"))?;
            } else {
                if index >= used_len {
                    return Err(ShortstatError::encoding("count overflows histogram"));
                }
                let count = value as u64;
                histogram.counts[index] = count;
                total = total
                    .checked_add(count)
                    .ok_or_else(|| ShortstatError::encoding("histogram total overflows"))?;
                index += 1;
            }
        }
        if index != used_len {
            return Err(ShortstatError::encoding(format!(
                "histogram payload covers {} of {} slots",
                index, used_len
            )));
        }

        histogram.total = total;
        Ok(histogram)
    }
}

fn zigzag(v: i64) -> u64 {
    ((v << 1) ^ (v >> 63)) as u64
}

fn unzigzag(v: u64) -> i64 {
    ((v >> 1) as i64) ^ -((v & 1) as i64)
}

fn put_varint(buf: &mut BytesMut, mut v: u64) {
    while v >= 0x80 {
        buf.put_u8((v as u8) | 0x80);
        v >>= 7;
    }
    buf.put_u8(v as u8);
}

fn get_varint(buf: &mut &[u8]) -> Result<u64> {
    let mut value: u64 = 0;
    for shift in (0..64).step_by(7) {
        if !buf.has_remaining() {
            return Err(ShortstatError::encoding("truncated varint"));
        }
        let byte = buf.get_u8();
        value |= ((byte & 0x7f) as u64) << shift;
        if byte & 0x80 == 0 {
            return Ok(value);
        }
    }
    Err(ShortstatError::encoding("varint is too long"))
}
