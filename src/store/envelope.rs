//! CANOPY - Value Envelope (TTL Codec)
//! Every stored value carries an absolute expiry header.
//!
//! ## Layout
//! ```text
//! [expires_at: 8 bytes (LE u64, logical-clock nanoseconds)][value: N bytes]
//! ```
//! An `expires_at` of zero means the value never expires. Anything shorter
//! than the header was not written through canopy.

use std::time::Duration;

use crate::error::{CanopyError, Result};

/// Size of the expiry header.
pub const HEADER_LEN: usize = 8;

/// Absolute expiry for a value written at `now` with the given `ttl`.
/// A zero TTL yields zero (never expires); huge TTLs saturate.
pub fn expires_at(ttl: Duration, now: u64) -> u64 {
    if ttl.is_zero() {
        return 0;
    }
    let ttl_nanos = u64::try_from(ttl.as_nanos()).unwrap_or(u64::MAX);
    now.saturating_add(ttl_nanos)
}

/// Wrap `value` in an envelope.
pub fn encode(value: &[u8], ttl: Duration, now: u64) -> Vec<u8> {
    let mut block = Vec::with_capacity(HEADER_LEN + value.len());
    block.extend_from_slice(&expires_at(ttl, now).to_le_bytes());
    block.extend_from_slice(value);
    block
}

/// Read only the expiry header.
pub fn header(envelope: &[u8]) -> Result<u64> {
    let head: [u8; HEADER_LEN] = envelope
        .get(..HEADER_LEN)
        .and_then(|head| <[u8; HEADER_LEN]>::try_from(head).ok())
        .ok_or_else(|| {
            CanopyError::Corruption(format!(
                "envelope of {} bytes is shorter than its {}-byte header",
                envelope.len(),
                HEADER_LEN
            ))
        })?;
    Ok(u64::from_le_bytes(head))
}

/// Split an envelope into its expiry header and value.
pub fn decode(envelope: &[u8]) -> Result<(u64, &[u8])> {
    let expires_at = header(envelope)?;
    Ok((expires_at, &envelope[HEADER_LEN..]))
}

/// An expiry is reached once the clock is at or past it.
pub fn is_expired(expires_at: u64, now: u64) -> bool {
    expires_at != 0 && expires_at <= now
}
