//! Sub-byte extraction.
//!
//! Bits are addressed MSB-first within a byte: bit 0 is `0x80`, bit 7 is `0x01`.

/// Mask with the low `len` bits set (`len` in `1..=8`).
pub fn low_mask(len: u8) -> u8 {
    if len >= 8 {
        0xff
    } else {
        (1u8 << len) - 1
    }
}

/// Reads `len` bits starting at `start` (MSB-first) as an unsigned value.
/// Caller guarantees `start + len <= 8` and `len >= 1`.
pub fn read_bits(byte: u8, start: u8, len: u8) -> u8 {
    let shift = 8 - start - len;
    (byte >> shift) & low_mask(len)
}

/// Mask covering bits `start..start + len` of a byte, MSB-first.
pub fn range_mask(start: u8, len: u8) -> u8 {
    low_mask(len) << (8 - start - len)
}
