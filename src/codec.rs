// UCS-2 wire codec for the outbox `Text` column.
//
// The SMS daemon stores outgoing text as big-endian UCS-2 rendered as
// lowercase hex, two digits per byte. Each UTF-16 code unit is first laid out
// little-endian, then every byte pair is swapped, then hex-rendered.

use crate::client::error::EncodingError;
use bytes::{BufMut, BytesMut};
use std::fmt::Write;

/// Encode message text into the daemon's hex UCS-2 representation.
///
/// The result has four hex digits per UTF-16 code unit, so its length is
/// always even.
///
/// ```rust
/// assert_eq!(smsd_bridge::codec::encode("hi").unwrap(), "00680069");
/// ```
pub fn encode(text: &str) -> Result<String, EncodingError> {
    let mut buf = BytesMut::with_capacity(text.len() * 2);
    for unit in text.encode_utf16() {
        buf.put_u16_le(unit);
    }

    swap_pairs(&mut buf)?;

    let mut out = String::with_capacity(buf.len() * 2);
    for byte in buf.iter() {
        // Writing into a String cannot fail.
        let _ = write!(out, "{byte:02x}");
    }
    Ok(out)
}

/// Decode a hex UCS-2 string produced by [`encode`] back into text.
pub fn decode(hex: &str) -> Result<String, EncodingError> {
    let digits = hex.as_bytes();
    if digits.len() % 2 != 0 {
        return Err(EncodingError::OddLength(digits.len()));
    }

    let mut buf = BytesMut::with_capacity(digits.len() / 2);
    for (index, pair) in digits.chunks_exact(2).enumerate() {
        let high = hex_value(pair[0], index * 2)?;
        let low = hex_value(pair[1], index * 2 + 1)?;
        buf.put_u8(high << 4 | low);
    }

    // Big-endian bytes back to little-endian code units.
    swap_pairs(&mut buf)?;

    let units: Vec<u16> = buf
        .chunks_exact(2)
        .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
        .collect();
    String::from_utf16(&units).map_err(|_| EncodingError::InvalidUtf16)
}

fn swap_pairs(buf: &mut BytesMut) -> Result<(), EncodingError> {
    if buf.len() % 2 != 0 {
        return Err(EncodingError::OddLength(buf.len()));
    }
    for pair in buf.chunks_exact_mut(2) {
        pair.swap(0, 1);
    }
    Ok(())
}

fn hex_value(digit: u8, offset: usize) -> Result<u8, EncodingError> {
    (digit as char)
        .to_digit(16)
        .map(|v| v as u8)
        .ok_or(EncodingError::InvalidHex {
            digit: digit as char,
            offset,
        })
}
