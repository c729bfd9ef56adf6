//! Big-endian field access
//!
//! DVI operands sit at arbitrary byte positions, so every field is assembled
//! byte by byte instead of through a typed load. Callers pass a slice that
//! starts at the field; [`crate::document::Document`] does the bounds checks.

/// Read an unsigned 16-bit field
///
/// # Panics
/// If `bytes` is shorter than 2.
#[inline]
pub fn read16(bytes: &[u8]) -> u16 {
    (u16::from(bytes[0]) << 8) | u16::from(bytes[1])
}

/// Read an unsigned 24-bit field
///
/// # Panics
/// If `bytes` is shorter than 3.
#[inline]
pub fn read24(bytes: &[u8]) -> u32 {
    (u32::from(read16(bytes)) << 8) | u32::from(bytes[2])
}

/// Read an unsigned 32-bit field
///
/// # Panics
/// If `bytes` is shorter than 4.
#[inline]
pub fn read32(bytes: &[u8]) -> u32 {
    u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])
}

#[inline]
pub fn read32_signed(bytes: &[u8]) -> i32 {
    read32(bytes) as i32
}

/// Sign-extending read of a 1..=4 byte field, as used by move operands
pub fn read_signed(bytes: &[u8], width: usize) -> i32 {
    match width {
        1 => i32::from(bytes[0] as i8),
        2 => i32::from(read16(bytes) as i16),
        3 => ((read24(bytes) << 8) as i32) >> 8,
        _ => read32_signed(bytes),
    }
}

/// Zero-extending read of a 1..=4 byte field, as used by length prefixes
pub fn read_unsigned(bytes: &[u8], width: usize) -> u32 {
    match width {
        1 => u32::from(bytes[0]),
        2 => u32::from(read16(bytes)),
        3 => read24(bytes),
        _ => read32(bytes),
    }
}

/// Overwrite a 32-bit field in place
///
/// # Panics
/// If `bytes` is shorter than 4.
#[inline]
pub fn write32_signed(bytes: &mut [u8], value: i32) {
    bytes[..4].copy_from_slice(&value.to_be_bytes());
}
