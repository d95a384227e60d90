//! Variable-Length Quantities
//!
//! Big-endian base-128 integers: seven payload bits per byte, bit 7 set on
//! every byte except the last. Standard MIDI Files cap them at four bytes.

/// Maximum number of encoded bytes
pub const MAX_BYTES: usize = 4;

/// Largest value representable in four bytes
pub const MAX_VALUE: u32 = 0x0FFF_FFFF;

/// Read a quantity, pulling bytes from `next_byte`.
///
/// Returns `Ok(None)` when the fourth byte still has its continuation bit
/// set. Errors from `next_byte` are passed through.
pub fn read_with<E>(mut next_byte: impl FnMut() -> Result<u8, E>) -> Result<Option<u32>, E> {
    let mut value = 0u32;
    for _ in 0..MAX_BYTES {
        let byte = next_byte()?;
        value = (value << 7) | u32::from(byte & 0x7F);
        if byte < 0x80 {
            return Ok(Some(value));
        }
    }
    Ok(None)
}

/// Decode a quantity from the start of `bytes`.
///
/// Returns the value and the number of bytes used, or `None` when the input
/// is truncated or longer than four bytes.
pub fn decode(bytes: &[u8]) -> Option<(u32, usize)> {
    let mut iter = bytes.iter().copied();
    let mut used = 0;
    let value = read_with(|| {
        used += 1;
        iter.next().ok_or(())
    })
    .ok()??;
    Some((value, used))
}

/// Encode `value`; `None` when it does not fit in four bytes.
pub fn encode(value: u32) -> Option<Vec<u8>> {
    if value > MAX_VALUE {
        return None;
    }
    let mut bytes = vec![(value & 0x7F) as u8];
    let mut rest = value >> 7;
    while rest > 0 {
        bytes.push(((rest & 0x7F) as u8) | 0x80);
        rest >>= 7;
    }
    bytes.reverse();
    Some(bytes)
}
