//! Packet framing: split, validate, decrypt and build wire packets
//!
//! # Packet Structure
//!
//! ```text
//! ┌──────────┬──────────┬──────────┬──────────┬─────────────┬─────────┬──────────┬──────────┐
//! │  Prefix  │ Sequence │ Command  │  Length  │ Return code │ Payload │ Checksum │  Suffix  │
//! │ 000055AA │  4 bytes │  4 bytes │  4 bytes │  0/4 bytes  │ N bytes │  4 / 32  │ 0000AA55 │
//! └──────────┴──────────┴──────────┴──────────┴─────────────┴─────────┴──────────┴──────────┘
//! ```
//!
//! All integers are big-endian. `Length` counts everything after itself,
//! end marker included.

use byteorder::{BigEndian, ByteOrder};
use bytes::{BufMut, Bytes, BytesMut};
use tracing::{debug, trace};
use tuyalan_types::ProtocolVersion;

use crate::{
    checksum,
    cipher::Cipher,
    command::is_discovery_code,
    constants::{
        HEADER_SIZE, HMAC_SIZE, MIN_PACKET_SIZE, PREFIX, PREFIX_BYTES, RETURN_CODE_SIZE, SUFFIX,
        SUFFIX_BYTES,
    },
    dialect::{Dialect, TrailerPolicy},
    error::{Error, Result},
    frame::Frame,
};

/// Check if the word after the header is a return code
///
/// Device responses may put a 4-byte return code before the payload. Nothing
/// in the header says so; a word whose upper three bytes are zero is taken as
/// a return code, anything else as the start of the payload. A payload that
/// itself starts with three zero bytes is misread by this rule.
pub fn has_return_code(word: u32) -> bool {
    word & 0xFFFF_FF00 == 0
}

/// Split a chunk into packets
///
/// Scans for a start marker and the next end marker after it, one packet
/// per pair. Bytes before a start marker and an unterminated tail are
/// ignored. A marker sequence inside ciphertext will cut a packet short.
pub fn split_packets(chunk: &[u8]) -> Vec<&[u8]> {
    let mut packets = Vec::new();
    let mut offset = 0;

    while let Some(start) = find(&chunk[offset..], &PREFIX_BYTES).map(|i| offset + i) {
        let body = start + PREFIX_BYTES.len();
        let Some(end) = find(&chunk[body..], &SUFFIX_BYTES).map(|i| body + i + SUFFIX_BYTES.len())
        else {
            break;
        };

        packets.push(&chunk[start..end]);
        offset = end;
    }

    trace!(chunk_len = chunk.len(), packets = packets.len(), "Split packets");

    packets
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}

/// Frame codec for one device
///
/// # Examples
///
/// ```
/// use tuyalan_core::{Command, Frame, FrameCodec};
/// use tuyalan_types::ProtocolVersion;
///
/// let codec = FrameCodec::new(b"f33444a6362a9664", ProtocolVersion::V33).unwrap();
///
/// let wire = codec.encode(&Frame::new(Command::DpQuery, 1, "{}"), true).unwrap();
/// assert_eq!(&wire[..4], &[0x00, 0x00, 0x55, 0xAA]);
///
/// let frame = codec.parse(&wire).unwrap();
/// assert_eq!(frame.payload.as_ref(), b"{}");
/// ```
#[derive(Debug)]
pub struct FrameCodec {
    dialect: Dialect,
    cipher: Cipher,
}

impl FrameCodec {
    /// Create a codec
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidKeyLength`] unless `key` is exactly 16 bytes.
    pub fn new(key: &[u8], version: ProtocolVersion) -> Result<Self> {
        Ok(Self {
            dialect: Dialect::for_version(version),
            cipher: Cipher::new(key, version)?,
        })
    }

    /// Protocol version
    pub fn version(&self) -> ProtocolVersion {
        self.dialect.version()
    }

    /// Wire dialect selected for the version
    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    /// Cipher engine
    pub fn cipher(&self) -> &Cipher {
        &self.cipher
    }

    /// Install a negotiated session key (see [`Cipher::set_session_key`])
    pub fn set_session_key(&self, key: &[u8]) -> Result<()> {
        self.cipher.set_session_key(key)
    }

    /// Split a chunk into packets (see [`split_packets`])
    pub fn split_packets<'a>(&self, chunk: &'a [u8]) -> Vec<&'a [u8]> {
        split_packets(chunk)
    }

    /// Validate one packet and extract its still-encrypted payload
    ///
    /// # Errors
    ///
    /// Checks run in order and the first failure is returned:
    /// [`Error::InvalidLength`], [`Error::PrefixMismatch`],
    /// [`Error::SuffixMismatch`], [`Error::MissingPayload`], then
    /// [`Error::HmacMismatch`] or [`Error::CrcMismatch`].
    pub fn parse_packet(&self, buf: &[u8]) -> Result<Frame> {
        self.parse_packet_with(&self.cipher.key(), buf)
    }

    fn parse_packet_with(&self, key: &[u8; 16], buf: &[u8]) -> Result<Frame> {
        let len = buf.len();

        if len < MIN_PACKET_SIZE {
            return Err(Error::InvalidLength {
                expected: MIN_PACKET_SIZE,
                actual: len,
            });
        }

        if BigEndian::read_u32(&buf[..4]) != PREFIX {
            return Err(Error::PrefixMismatch { raw: hex::encode(buf) });
        }

        if BigEndian::read_u32(&buf[len - 4..]) != SUFFIX {
            return Err(Error::SuffixMismatch { raw: hex::encode(buf) });
        }

        let sequence = BigEndian::read_u32(&buf[4..8]);
        let command = BigEndian::read_u32(&buf[8..12]);
        let declared = BigEndian::read_u32(&buf[12..16]) as usize;

        let missing = || Error::MissingPayload {
            declared,
            actual: len,
        };

        if declared > len - 8 {
            return Err(missing());
        }

        let discovery = is_discovery_code(command);
        let policy = self.dialect.trailer_policy(discovery);

        let payload_start = if has_return_code(BigEndian::read_u32(&buf[16..20])) {
            HEADER_SIZE + RETURN_CODE_SIZE
        } else {
            HEADER_SIZE
        };

        let payload_end = (HEADER_SIZE + declared)
            .checked_sub(policy.size())
            .ok_or_else(missing)?;

        match policy {
            TrailerPolicy::HmacSha256 => {
                let expected = buf
                    .get(payload_end..payload_end + HMAC_SIZE)
                    .filter(|_| payload_end + HMAC_SIZE <= len - 4)
                    .ok_or_else(missing)?;
                let computed = Cipher::hmac_signature_with(key, &buf[..payload_end])?;

                if expected != computed.as_slice() {
                    return Err(Error::HmacMismatch {
                        expected: hex::encode(expected),
                        computed: hex::encode(computed),
                        raw: hex::encode(buf),
                    });
                }
            }
            TrailerPolicy::Crc32 => {
                if payload_end + 4 > len - 4 {
                    return Err(missing());
                }
                let expected = BigEndian::read_i32(&buf[payload_end..payload_end + 4]);
                let computed = checksum::calculate(&buf[..payload_end]);

                if expected != computed {
                    return Err(Error::CrcMismatch {
                        expected,
                        computed,
                        raw: hex::encode(buf),
                    });
                }
            }
        }

        let payload = &buf[payload_start.min(payload_end)..payload_end];

        trace!(
            command,
            sequence,
            discovery,
            payload_len = payload.len(),
            "Parsed packet"
        );

        Ok(Frame {
            payload: Bytes::copy_from_slice(payload),
            command,
            sequence,
        })
    }

    /// Decrypt a payload, falling back to the raw bytes
    ///
    /// Discovery packets and some 3.1 responses are plaintext; when decryption
    /// fails the input is returned unchanged.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidPayload`] for an empty payload.
    pub fn get_payload(&self, data: &[u8]) -> Result<Bytes> {
        self.get_payload_with(&self.cipher.key(), data)
    }

    fn get_payload_with(&self, key: &[u8; 16], data: &[u8]) -> Result<Bytes> {
        if data.is_empty() {
            return Err(Error::InvalidPayload);
        }

        match self.cipher.decrypt_with(key, data) {
            Ok(plain) => Ok(Bytes::from(plain)),
            Err(e) => {
                debug!("Treating payload as plaintext: {}", e);
                Ok(Bytes::copy_from_slice(data))
            }
        }
    }

    /// Validate a packet and decrypt its payload
    ///
    /// Verification and decryption use the same key, even if a session key is
    /// installed concurrently.
    pub fn parse(&self, buf: &[u8]) -> Result<Frame> {
        let key = self.cipher.key();

        let mut frame = self.parse_packet_with(&key, buf)?;
        frame.payload = self.get_payload_with(&key, &frame.payload)?;
        Ok(frame)
    }

    /// Build the wire bytes for a frame
    ///
    /// `want_encrypt` is honoured by 3.1 only; 3.2 and later always encrypt.
    /// A zero sequence is written as four zero bytes, the same bytes an
    /// omitted sequence would leave. Encryption and the HMAC trailer use the
    /// same key snapshot.
    pub fn encode(&self, frame: &Frame, want_encrypt: bool) -> Result<BytesMut> {
        let key = self.cipher.key();
        let policy = self.dialect.trailer_policy(frame.is_discovery());
        let payload = self.dialect.seal(&self.cipher, &key, frame, want_encrypt)?;

        let length =
            u32::try_from(payload.len() + policy.size()).map_err(|_| Error::InvalidPayload)?;

        let mut buf = BytesMut::with_capacity(HEADER_SIZE + payload.len() + policy.size());
        buf.put_u32(PREFIX);
        buf.put_u32(frame.sequence);
        buf.put_u32(frame.command);
        buf.put_u32(length);
        buf.put_slice(&payload);

        match policy {
            TrailerPolicy::Crc32 => {
                let crc = checksum::calculate(&buf);
                buf.put_i32(crc);
            }
            TrailerPolicy::HmacSha256 => {
                let mac = Cipher::hmac_signature_with(&key, &buf)?;
                buf.put_slice(&mac);
            }
        }

        buf.put_u32(SUFFIX);

        trace!(
            version = %self.version(),
            command = frame.command,
            sequence = frame.sequence,
            len = buf.len(),
            "Encoded frame"
        );

        Ok(buf)
    }
}
