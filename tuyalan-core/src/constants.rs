//! Protocol constants

/// Start marker opening every packet
pub const PREFIX: u32 = 0x0000_55AA;

/// End marker closing every packet
pub const SUFFIX: u32 = 0x0000_AA55;

/// Start marker as it appears on the wire
pub const PREFIX_BYTES: [u8; 4] = PREFIX.to_be_bytes();

/// End marker as it appears on the wire
pub const SUFFIX_BYTES: [u8; 4] = SUFFIX.to_be_bytes();

/// Fixed header: prefix, sequence, command, declared length
pub const HEADER_SIZE: usize = 16;

/// Smallest packet that can be parsed
pub const MIN_PACKET_SIZE: usize = 24;

/// Optional return code following the header
pub const RETURN_CODE_SIZE: usize = 4;

/// Version header block: 3 ASCII bytes + 12 reserved bytes
pub const VERSION_HEADER_SIZE: usize = 15;

/// Version string + hex MD5 signature prefixing a 3.1 signed envelope
pub const LEGACY_ENVELOPE_PREFIX_SIZE: usize = 19;

/// CRC32 + end marker
pub const CRC_TRAILER_SIZE: usize = 8;

/// HMAC-SHA256 + end marker
pub const HMAC_TRAILER_SIZE: usize = 0x24;

/// HMAC-SHA256 digest length
pub const HMAC_SIZE: usize = 32;

/// AES block size
pub const BLOCK_SIZE: usize = 16;

/// Default read timeout (seconds)
pub const DEFAULT_TIMEOUT: u64 = 5;

/// Default connection timeout (seconds)
pub const DEFAULT_CONNECT_TIMEOUT: u64 = 5;
