//! Checksum helpers shared by the binary dialects
//!
//! Each dialect uses its own scheme and the results must match the module
//! bit for bit:
//!
//! - LD6001 fixed binary: 8-bit wrapping sum of header and body
//! - `55 AA` simple binary: 8-bit XOR over one range
//! - Tagged binary: 8-bit XOR over two disjoint ranges

/// 8-bit wrapping sum of all bytes
pub fn sum8(bytes: &[u8]) -> u8 {
    bytes.iter().fold(0u8, |acc, &b| acc.wrapping_add(b))
}

/// 8-bit XOR of all bytes
pub fn xor8(bytes: &[u8]) -> u8 {
    bytes.iter().fold(0u8, |acc, &b| acc ^ b)
}

/// 8-bit XOR over two disjoint ranges of the same frame
pub fn xor8_ranges(first: &[u8], second: &[u8]) -> u8 {
    xor8(first) ^ xor8(second)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sum8_wraps() {
        assert_eq!(sum8(&[0x4D, 0x11, 0x08, 0x00, 0x01, 0x02, 0x03, 0x04, 0x00, 0x01]), 113);
        assert_eq!(sum8(&[0xFF, 0x02]), 0x01);
        assert_eq!(sum8(&[]), 0);
    }

    #[test]
    fn test_xor8() {
        assert_eq!(xor8(&[0x0A, 0x04, 0x00, 0x00]), 0x0E);
        assert_eq!(xor8(&[0xAA, 0xAA]), 0x00);
    }

    #[test]
    fn test_xor8_ranges() {
        assert_eq!(xor8_ranges(&[0xA3, 0x01, 0x00, 0x00], &[0x01]), 0xA3);
    }
}
