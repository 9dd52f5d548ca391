//! Per-version wire rules
//!
//! The four protocol generations collapse into three dialects. A codec picks
//! its dialect once, at construction; adding a generation means adding a
//! variant here.
//!
//! ```text
//! version   dialect      payload region                          trailer
//! 3.1       Signed31     "3.1" + md5 sig + base64(AES)  or plain  CRC32
//! 3.2/3.3   Binary       ["3.x" + 12 x 00] + AES(PKCS7)           CRC32
//! 3.4       Extended34   AES(["3.4" + 12 x 00] + payload + pad)   HMAC-SHA256
//! ```

use tuyalan_types::ProtocolVersion;

use crate::{
    cipher::{Cipher, pkcs7_pad},
    command::Command,
    constants::{CRC_TRAILER_SIZE, HMAC_TRAILER_SIZE, VERSION_HEADER_SIZE},
    error::Result,
    frame::Frame,
};

/// Checksum rule for a packet
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum TrailerPolicy {
    /// 4-byte CRC32 + end marker
    Crc32,

    /// 32-byte HMAC-SHA256 + end marker
    HmacSha256,
}

impl TrailerPolicy {
    /// Bytes between the payload and the end of the packet, end marker included
    pub fn size(self) -> usize {
        match self {
            Self::Crc32 => CRC_TRAILER_SIZE,
            Self::HmacSha256 => HMAC_TRAILER_SIZE,
        }
    }
}

/// Wire dialect of a protocol generation
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Dialect {
    /// 3.1: optional AES, base64 text with an MD5-signed envelope
    Signed31,

    /// 3.2 and 3.3: always encrypted, plain version header outside the ciphertext
    Binary(ProtocolVersion),

    /// 3.4: version header inside the ciphertext, manual padding, HMAC trailer
    Extended34,
}

impl Dialect {
    /// Select the dialect for a protocol version
    pub fn for_version(version: ProtocolVersion) -> Self {
        match version {
            ProtocolVersion::V31 => Self::Signed31,
            ProtocolVersion::V32 | ProtocolVersion::V33 => Self::Binary(version),
            ProtocolVersion::V34 => Self::Extended34,
        }
    }

    /// Protocol version the dialect writes into headers
    pub fn version(self) -> ProtocolVersion {
        match self {
            Self::Signed31 => ProtocolVersion::V31,
            Self::Binary(version) => version,
            Self::Extended34 => ProtocolVersion::V34,
        }
    }

    /// Trailer used by packets of this dialect
    ///
    /// Discovery packets never carry the HMAC trailer.
    pub fn trailer_policy(self, discovery: bool) -> TrailerPolicy {
        match self {
            Self::Extended34 if !discovery => TrailerPolicy::HmacSha256,
            _ => TrailerPolicy::Crc32,
        }
    }

    /// Check if an outgoing payload for `command` gets the 15-byte version header
    pub fn needs_version_header(self, command: u32) -> bool {
        let command = Command::try_from(command).ok();

        match self {
            Self::Signed31 => false,
            Self::Binary(_) => !matches!(
                command,
                Some(Command::DpQuery | Command::DpRefresh)
            ),
            Self::Extended34 => !matches!(
                command,
                Some(
                    Command::DpQuery
                        | Command::HeartBeat
                        | Command::DpQueryNew
                        | Command::SessKeyNegStart
                        | Command::SessKeyNegFinish
                        | Command::DpRefresh
                )
            ),
        }
    }

    /// Build the payload region of an outgoing packet, encrypting under `key`
    ///
    /// `want_encrypt` only matters for 3.1; later generations always encrypt.
    pub fn seal(
        self,
        cipher: &Cipher,
        key: &[u8; 16],
        frame: &Frame,
        want_encrypt: bool,
    ) -> Result<Vec<u8>> {
        match self {
            Self::Signed31 if want_encrypt => {
                let encoded = cipher.encrypt_with(key, &frame.payload, true)?;
                let version = self.version();

                let mut signed = Vec::with_capacity(encoded.len() + 32);
                signed.extend_from_slice(b"data=");
                signed.extend_from_slice(&encoded);
                signed.extend_from_slice(b"||lpv=");
                signed.extend_from_slice(version.as_bytes());
                signed.extend_from_slice(b"||");
                signed.extend_from_slice(cipher.local_key());
                let signature = hex::encode(Cipher::md5_signature(&signed));

                let mut out = Vec::with_capacity(3 + signature.len() + encoded.len());
                out.extend_from_slice(version.as_bytes());
                out.extend_from_slice(signature.as_bytes());
                out.extend_from_slice(&encoded);
                Ok(out)
            }
            Self::Signed31 => Ok(frame.payload.to_vec()),
            Self::Binary(version) => {
                let ciphertext = cipher.encrypt_with(key, &frame.payload, false)?;

                if !self.needs_version_header(frame.command) {
                    return Ok(ciphertext);
                }

                let mut out = Vec::with_capacity(VERSION_HEADER_SIZE + ciphertext.len());
                out.extend_from_slice(&version_header(version));
                out.extend_from_slice(&ciphertext);
                Ok(out)
            }
            Self::Extended34 => {
                let mut plain = Vec::with_capacity(VERSION_HEADER_SIZE + frame.payload.len());
                if self.needs_version_header(frame.command) {
                    plain.extend_from_slice(&version_header(ProtocolVersion::V34));
                }
                plain.extend_from_slice(&frame.payload);

                cipher.encrypt_with(key, &pkcs7_pad(&plain), false)
            }
        }
    }
}

/// Version header block: version string followed by 12 reserved zero bytes
pub fn version_header(version: ProtocolVersion) -> [u8; VERSION_HEADER_SIZE] {
    let mut header = [0u8; VERSION_HEADER_SIZE];
    header[..3].copy_from_slice(version.as_bytes());
    header
}
