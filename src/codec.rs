//! # DEFLATE Codec
//!
//! Raw DEFLATE (no zlib or gzip framing) applied to one entry payload at a time.
//!
//! Both directions are stateless from the caller's point of view. Encoder and
//! decoder state live in `thread_local!` slots and are reset before every call,
//! so worker threads reuse their own scratch without ever sharing it.

use std::cell::RefCell;

use flate2::{Compress, Compression, Decompress, FlushCompress, FlushDecompress, Status};

use crate::error::{PackrError, Result};

/// Highest level accepted by the encoder.
pub const MAX_LEVEL: u32 = 9;

/// Level used by `compress` when the caller has no preference.
pub const DEFAULT_LEVEL: u32 = 8;

thread_local! {
    // (level, encoder): rebuilt only when a call asks for a different level.
    static ENCODER: RefCell<Option<(u32, Compress)>> = const { RefCell::new(None) };
    static DECODER: RefCell<Decompress> = RefCell::new(Decompress::new(false));
}

/// Largest buffer `decompress` allocates before any output has been produced.
const INFLATE_PREALLOC_LIMIT: usize = 4 * 1024 * 1024;

/// Worst-case size of the DEFLATE output for `len` input bytes.
///
/// Incompressible input is emitted as stored blocks, which cost a few bytes per
/// block plus the final block marker.
pub fn compress_bound(len: usize) -> usize {
    len + len / 250 + 64
}

/// Compresses `input` into a raw DEFLATE stream.
///
/// Never fails for well-formed input, including the empty slice; the only error
/// path is an internal encoder failure reported by `flate2`.
pub fn compress(input: &[u8], level: u32) -> Result<Vec<u8>> {
    let level = level.min(MAX_LEVEL);

    ENCODER.with(|cell| {
        let mut slot = cell.borrow_mut();
        if slot.as_ref().is_some_and(|(current, _)| *current != level) {
            *slot = None;
        }
        let (_, encoder) =
            slot.get_or_insert_with(|| (level, Compress::new(Compression::new(level), false)));
        encoder.reset();

        let mut out = Vec::with_capacity(compress_bound(input.len()));
        loop {
            let consumed = encoder.total_in() as usize;
            let status = encoder
                .compress_vec(&input[consumed..], &mut out, FlushCompress::Finish)
                .map_err(|e| PackrError::Compression(e.to_string()))?;
            match status {
                Status::StreamEnd => break,
                // Output buffer exhausted; give the encoder more room.
                Status::Ok | Status::BufError => out.reserve(out.capacity().max(64)),
            }
        }
        Ok(out)
    })
}

/// Inflates a raw DEFLATE stream that must decode to exactly `expected_len` bytes.
///
/// A malformed or truncated stream, or one that decodes to any other length,
/// is reported as [`PackrError::CorruptData`].
pub fn decompress(input: &[u8], expected_len: usize) -> Result<Vec<u8>> {
    DECODER.with(|cell| {
        let mut decoder = cell.borrow_mut();
        decoder.reset(false);

        // The declared size is untrusted; start small and grow as output appears.
        // One spare byte lets an over-long stream show up as a size mismatch.
        let mut out = Vec::with_capacity(expected_len.min(INFLATE_PREALLOC_LIMIT) + 1);
        loop {
            let consumed = decoder.total_in() as usize;
            let status = decoder
                .decompress_vec(&input[consumed..], &mut out, FlushDecompress::Finish)
                .map_err(|e| PackrError::CorruptData(format!("malformed deflate stream: {e}")))?;
            if status == Status::StreamEnd {
                break;
            }
            if out.len() < out.capacity() {
                return Err(PackrError::CorruptData(format!(
                    "deflate stream ended early after {} of {expected_len} bytes",
                    out.len()
                )));
            }
            if out.len() > expected_len {
                return Err(PackrError::CorruptData(format!(
                    "deflate stream decodes past {expected_len} bytes"
                )));
            }
            let remaining = expected_len + 1 - out.len();
            out.reserve(remaining.min(out.capacity().max(64)));
        }

        if out.len() != expected_len {
            return Err(PackrError::CorruptData(format!(
                "decoded {} bytes, expected {}",
                out.len(),
                expected_len
            )));
        }
        Ok(out)
    })
}
