//! Bit-field extraction for EV-CAN payloads.
//!
//! Fields are numbered MSB-first: bit offset 0 is the most significant bit
//! of byte 0, offset 8 the most significant bit of byte 1, and so on.  A
//! field may straddle any number of byte boundaries.

/// Read `bit_width` bits starting at `bit_offset` as an unsigned integer.
///
/// The caller guarantees `bit_offset + bit_width <= bytes.len() * 8` and
/// `1 <= bit_width <= 32`.  Bits past the end of `bytes` read as zero.
pub fn extract(bytes: &[u8], bit_offset: usize, bit_width: u32) -> u32 {
    debug_assert!((1..=32).contains(&bit_width));

    let mut value: u32 = 0;
    for bit in bit_offset..bit_offset + bit_width as usize {
        let byte = bytes.get(bit / 8).copied().unwrap_or(0);
        let set = (byte >> (7 - bit % 8)) & 1;
        value = (value << 1) | u32::from(set);
    }
    value
}

/// Reinterpret the low `bit_width` bits of `raw` as a two's-complement
/// value of that width.
///
/// ```
/// use leafmon::can::bits::to_signed;
/// assert_eq!(to_signed(0x400, 11), -1024);
/// assert_eq!(to_signed(0x3FF, 11), 1023);
/// ```
pub fn to_signed(raw: u32, bit_width: u32) -> i32 {
    debug_assert!((1..=32).contains(&bit_width));

    let shift = 32 - bit_width;
    ((raw << shift) as i32) >> shift
}
