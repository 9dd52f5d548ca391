//! Transport layer for the Tuya LAN protocol
//!
//! Provides the TCP connection to a device and reassembly of packets that
//! arrive split across reads.

pub mod buffer;
pub mod error;
pub mod tcp;

pub use buffer::PacketBuffer;
pub use error::{Error, Result};
pub use tcp::TcpTransport;

use std::time::Duration;

use async_trait::async_trait;
use bytes::BytesMut;

/// Transport trait for different communication methods
#[async_trait]
pub trait Transport: Send + Sync {
    /// Connect to device
    async fn connect(&mut self) -> Result<()>;
    
    /// Disconnect from device
    async fn disconnect(&mut self) -> Result<()>;
    
    /// Check if connected
    fn is_connected(&self) -> bool;
    
    /// Send raw bytes
    async fn send(&mut self, data: &[u8]) -> Result<()>;
    
    /// Receive one chunk of raw bytes (with timeout)
    async fn receive(&mut self, timeout: Duration) -> Result<BytesMut>;
    
    /// Get remote address
    fn remote_addr(&self) -> String;
}
