//! Athena wire primitives
//!
//! Field encodings shared by both server families. Integers are plain
//! little-endian and need no helpers; the packed coordinate triple and the
//! fixed-width NUL padded strings do.

use athena_core::Coordinates;
use bytes::{BufMut, BytesMut};

/// Size of a packed coordinate triple on the wire
pub const COORDINATES_LEN: usize = 3;

/// Pack x, y (10 bits each) and direction (4 bits) into 3 bytes
///
/// # Format
/// ```text
/// byte 0: x[9..2]
/// byte 1: x[1..0] y[9..4]
/// byte 2: y[3..0] dir[3..0]
/// ```
#[inline]
pub fn encode_coordinates(coords: Coordinates) -> [u8; COORDINATES_LEN] {
    let x = coords.x & 0x03ff;
    let y = coords.y & 0x03ff;
    [
        (x >> 2) as u8,
        (((x & 0x03) << 6) | ((y >> 4) & 0x3f)) as u8,
        (((y & 0x0f) << 4) as u8) | (coords.direction & 0x0f),
    ]
}

/// Unpack a coordinate triple
#[inline]
pub fn decode_coordinates(bytes: [u8; COORDINATES_LEN]) -> Coordinates {
    let x = ((bytes[0] as u16) << 2) | ((bytes[1] as u16 & 0xc0) >> 6);
    let y = ((bytes[1] as u16 & 0x3f) << 4) | ((bytes[2] as u16 & 0xf0) >> 4);
    Coordinates::new(x, y, bytes[2] & 0x0f)
}

/// Decode a fixed-width string field
///
/// The value ends at the first NUL; bytes after it are padding. Servers are
/// not strict about encodings, so invalid UTF-8 is replaced rather than rejected.
pub fn decode_fixed_string(bytes: &[u8]) -> String {
    let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
    String::from_utf8_lossy(&bytes[..end]).into_owned()
}

/// Write a fixed-width string field, truncating or NUL padding to `len`
pub fn write_fixed_string(buf: &mut BytesMut, value: &str, len: usize) {
    let bytes = value.as_bytes();
    let n = bytes.len().min(len);
    buf.put_slice(&bytes[..n]);
    buf.put_bytes(0, len - n);
}
