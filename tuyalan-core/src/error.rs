//! Error types for tuyalan-core

/// Result type alias for tuyalan operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core protocol errors
///
/// Integrity variants carry the hex dump of the rejected packet so the
/// transport layer can log it before dropping the packet.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Local or session key is not 16 bytes
    #[error("Invalid key length: expected 16 bytes, got {actual} bytes")]
    InvalidKeyLength {
        actual: usize,
    },
    
    /// Packet is shorter than the minimal frame
    #[error("Invalid packet length: expected at least {expected} bytes, got {actual} bytes")]
    InvalidLength {
        expected: usize,
        actual: usize,
    },
    
    /// First four bytes are not the start marker
    #[error("Prefix does not match: {raw}")]
    PrefixMismatch {
        raw: String,
    },
    
    /// Last four bytes are not the end marker
    #[error("Suffix does not match: {raw}")]
    SuffixMismatch {
        raw: String,
    },
    
    /// Declared length runs past the received bytes
    #[error("Packet missing payload: declared length {declared}, packet has {actual} bytes")]
    MissingPayload {
        declared: usize,
        actual: usize,
    },
    
    /// HMAC-SHA256 trailer verification failed (3.4)
    #[error("HMAC mismatch: expected {expected}, computed {computed}. {raw}")]
    HmacMismatch {
        expected: String,
        computed: String,
        raw: String,
    },
    
    /// CRC32 trailer verification failed (3.1 - 3.3, discovery)
    #[error("CRC mismatch: expected {expected}, computed {computed}. {raw}")]
    CrcMismatch {
        expected: i32,
        computed: i32,
        raw: String,
    },
    
    /// AES decryption or padding removal failed
    #[error("Decrypt failed: {0}")]
    DecryptFailure(String),
    
    /// Empty payload handed to payload extraction
    #[error("Invalid payload length")]
    InvalidPayload,
    
    /// Raw block transform given input that is not a multiple of 16 bytes
    #[error("Plaintext of {len} bytes is not aligned to the 16-byte block size")]
    UnalignedPlaintext {
        len: usize,
    },
    
    /// Session key may only be negotiated once per codec
    #[error("Session key already set")]
    SessionKeyAlreadySet,
    
    /// Command code not present in the registry
    #[error("Unknown command code: 0x{0:02X}")]
    UnknownCommand(u32),
}

impl Error {
    /// Hex dump of the rejected packet, when the error carries one
    pub fn raw_packet(&self) -> Option<&str> {
        match self {
            Self::PrefixMismatch { raw }
            | Self::SuffixMismatch { raw }
            | Self::HmacMismatch { raw, .. }
            | Self::CrcMismatch { raw, .. } => Some(raw),
            _ => None,
        }
    }
    
    /// Check if the packet failed framing or checksum validation
    pub fn is_integrity_failure(&self) -> bool {
        matches!(
            self,
            Self::PrefixMismatch { .. }
                | Self::SuffixMismatch { .. }
                | Self::HmacMismatch { .. }
                | Self::CrcMismatch { .. }
        )
    }
    
    /// Check if the error concerns a single packet only
    ///
    /// A malformed packet can be dropped without closing the connection.
    pub fn is_recoverable(&self) -> bool {
        !matches!(
            self,
            Self::InvalidKeyLength { .. } | Self::SessionKeyAlreadySet
        )
    }
}
