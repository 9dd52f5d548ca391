//! # tuyalan
//!
//! Rust client for the LAN protocol spoken by Tuya-compatible smart devices.
//!
//! ## Features
//!
//! - Protocol generations 3.1, 3.2, 3.3 and 3.4
//! - Async/await API using Tokio
//! - CRC32 and HMAC-SHA256 packet verification
//! - Reassembly of packets split across TCP reads
//!
//! ## Quick Start
//!
//! ```no_run
//! use tuyalan::{Device, DeviceCredential, ProtocolVersion};
//!
//! #[tokio::main]
//! async fn main() -> tuyalan::Result<()> {
//!     let credential = DeviceCredential::new(
//!         "192.168.0.100",
//!         "13684365e0980607986f",
//!         "f33444a6362a9664",
//!         ProtocolVersion::V33,
//!     )?;
//!
//!     let mut device = Device::new(credential)?;
//!     device.connect().await?;
//!
//!     let status = device.query_status(r#"{"gwId":"13684365e0980607986f"}"#).await?;
//!     println!("{}", status.payload_str());
//!
//!     device.disconnect().await?;
//!     Ok(())
//! }
//! ```

pub mod device;
pub mod error;

// Re-exports
pub use device::Device;
pub use error::{Error, Result};

// Re-export types
pub use tuyalan_core::{Command, Frame, FrameCodec};
pub use tuyalan_types::{DeviceCredential, ProtocolVersion};
