//! # tuyalan-core
//!
//! Core protocol implementation for Tuya-compatible LAN devices.
//!
//! This crate provides the low-level protocol primitives:
//! - Packet splitting, validation and encoding
//! - AES-128-ECB payload cipher, MD5 / HMAC-SHA256 signing
//! - CRC32 trailer checksum
//! - Command definitions
//! - Protocol constants

pub mod checksum;
pub mod cipher;
pub mod codec;
pub mod command;
pub mod constants;
pub mod dialect;
pub mod error;
pub mod frame;
pub mod session;

pub use cipher::Cipher;
pub use codec::{FrameCodec, has_return_code, split_packets};
pub use command::Command;
pub use dialect::{Dialect, TrailerPolicy};
pub use error::{Error, Result};
pub use frame::Frame;
pub use session::{KeyState, SequenceCounter};
pub use tuyalan_types::ProtocolVersion;

/// Default device port
pub const DEFAULT_PORT: u16 = 6668;

/// Maximum packet size accepted from the network (64KB)
pub const MAX_PACKET_SIZE: usize = 65535;

/// Packet header size
pub const HEADER_SIZE: usize = constants::HEADER_SIZE;
