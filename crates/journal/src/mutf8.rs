//! Modified-UTF-8 (the Java `DataOutput#writeUTF` encoding).
//!
//! Identical to ordinary UTF-8 except: the NUL code point is escaped as the
//! two-byte sequence `0xC0 0x80` instead of a single zero byte, and code
//! points above the Basic Multilingual Plane are written as a UTF-16
//! surrogate pair, each half encoded as its own three-byte sequence (so a
//! supplementary character costs six bytes instead of UTF-8's four). This
//! module never touches Rust's own UTF-8 facilities — it works directly on
//! UTF-16 code units so the surrogate-pair behavior falls out for free.

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
#[error("malformed modified-UTF-8 byte sequence")]
pub struct Mutf8Error;

/// Encodes `s` into its modified-UTF-8 byte representation.
pub fn encode(s: &str) -> Vec<u8> {
    let mut out = Vec::with_capacity(s.len());
    for unit in s.encode_utf16() {
        match unit {
            0 => out.extend_from_slice(&[0xC0, 0x80]),
            1..=0x7F => out.push(unit as u8),
            0x80..=0x7FF => {
                out.push(0xC0 | ((unit >> 6) as u8));
                out.push(0x80 | ((unit & 0x3F) as u8));
            }
            _ => {
                out.push(0xE0 | ((unit >> 12) as u8));
                out.push(0x80 | (((unit >> 6) & 0x3F) as u8));
                out.push(0x80 | ((unit & 0x3F) as u8));
            }
        }
    }
    out
}

/// Decodes a modified-UTF-8 byte sequence back into a `String`.
///
/// Rejects truncated multi-byte sequences, bad continuation bytes, and
/// surrogate halves that don't pair up — all of these are corruption, not a
/// valid (if unusual) journal record.
pub fn decode(bytes: &[u8]) -> Result<String, Mutf8Error> {
    let mut units = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        let b0 = bytes[i];
        if b0 & 0x80 == 0 {
            if b0 == 0 {
                // A raw NUL byte never appears in valid modified-UTF-8 — the
                // encoder always escapes it as 0xC0 0x80.
                return Err(Mutf8Error);
            }
            units.push(b0 as u16);
            i += 1;
        } else if b0 & 0xE0 == 0xC0 {
            let b1 = *bytes.get(i + 1).ok_or(Mutf8Error)?;
            if b1 & 0xC0 != 0x80 {
                return Err(Mutf8Error);
            }
            units.push((((b0 & 0x1F) as u16) << 6) | ((b1 & 0x3F) as u16));
            i += 2;
        } else if b0 & 0xF0 == 0xE0 {
            let b1 = *bytes.get(i + 1).ok_or(Mutf8Error)?;
            let b2 = *bytes.get(i + 2).ok_or(Mutf8Error)?;
            if b1 & 0xC0 != 0x80 || b2 & 0xC0 != 0x80 {
                return Err(Mutf8Error);
            }
            units.push((((b0 & 0x0F) as u16) << 12) | (((b1 & 0x3F) as u16) << 6) | ((b2 & 0x3F) as u16));
            i += 3;
        } else {
            return Err(Mutf8Error);
        }
    }
    char::decode_utf16(units)
        .collect::<Result<String, _>>()
        .map_err(|_| Mutf8Error)
}
