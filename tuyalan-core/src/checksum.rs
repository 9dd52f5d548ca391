//! CRC32 trailer checksum
//!
//! 3.1 - 3.3 packets and all discovery packets end with a CRC32 over
//! everything from the start marker up to the checksum field. The value is
//! stored as a signed big-endian 32-bit integer.
//!
//! The polynomial is the standard IEEE 802.3 / zlib CRC32.

use tracing::trace;

/// Calculate the trailer checksum
///
/// # Examples
///
/// ```
/// use tuyalan_core::checksum;
///
/// assert_eq!(checksum::calculate(b"123456789"), 0xCBF43926_u32 as i32);
/// ```
pub fn calculate(bytes: &[u8]) -> i32 {
    let crc = crc32fast::hash(bytes) as i32;
    
    trace!(
        len = bytes.len(),
        crc = format!("0x{:08X}", crc),
        "Calculated checksum"
    );
    
    crc
}

#[cfg(test)]
mod tests {
    use super::*;
    
    #[test]
    fn test_checksum_reference_vector() {
        // Standard CRC-32 check value
        assert_eq!(calculate(b"123456789") as u32, 0xCBF4_3926);
    }
    
    #[test]
    fn test_checksum_empty() {
        assert_eq!(calculate(&[]), 0);
    }
    
    #[test]
    fn test_checksum_signed_representation() {
        // High bit set yields a negative value, as the wire stores it signed
        let crc = calculate(b"123456789");
        assert!(crc < 0);
        assert_eq!(crc.to_be_bytes(), [0xCB, 0xF4, 0x39, 0x26]);
    }
    
    #[test]
    fn test_checksum_single_bit_flip() {
        let mut data = vec![0xAB; 64];
        let crc = calculate(&data);
        data[10] ^= 0x01;
        
        assert_ne!(crc, calculate(&data));
    }
}
