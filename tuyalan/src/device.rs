//! High-level device interface

use std::collections::VecDeque;
use std::time::Duration;

use bytes::Bytes;
use tracing::{debug, info, trace, warn};

use tuyalan_core::constants::{DEFAULT_CONNECT_TIMEOUT, DEFAULT_TIMEOUT};
use tuyalan_core::{Command, DEFAULT_PORT, Frame, FrameCodec, SequenceCounter};
use tuyalan_transport::{PacketBuffer, TcpTransport, Transport};
use tuyalan_types::{DeviceCredential, ProtocolVersion};

use crate::error::{Error, Result};

/// Reads attempted while waiting for a response
const DEFAULT_MAX_READS: usize = 3;

/// Tuya-compatible LAN device
///
/// High-level interface for talking to one device over TCP. Each device owns
/// its codec, so separate devices can be driven from separate tasks.
///
/// # Examples
///
/// ```no_run
/// use tuyalan::{Device, DeviceCredential, ProtocolVersion};
///
/// #[tokio::main]
/// async fn main() -> tuyalan::Result<()> {
///     let credential = DeviceCredential::new(
///         "192.168.0.136",
///         "d7573e1270a68a31b5rabw",
///         "5f1d2d9650e289e9",
///         ProtocolVersion::V34,
///     )?;
///
///     let mut device = Device::new(credential)?;
///     device.connect().await?;
///
///     let pong = device.heart_beat().await?;
///     println!("{}", pong);
///
///     device.disconnect().await?;
///     Ok(())
/// }
/// ```
pub struct Device {
    credential: DeviceCredential,
    codec: FrameCodec,
    transport: Box<dyn Transport>,
    owns_tcp: bool,
    buffer: PacketBuffer,
    pending: VecDeque<Frame>,
    sequence: SequenceCounter,
    port: u16,
    timeout: Duration,
    connect_timeout: Duration,
    max_reads: usize,
}

impl Device {
    /// Create a new device instance (TCP transport on port 6668)
    pub fn new(credential: DeviceCredential) -> Result<Self> {
        let transport = TcpTransport::new(credential.ip.clone(), DEFAULT_PORT);
        Self::build(credential, Box::new(transport), true)
    }

    /// Create a device instance over a custom transport
    ///
    /// The TCP builders ([`with_port`](Self::with_port),
    /// [`with_connect_timeout`](Self::with_connect_timeout)) leave a custom
    /// transport in place.
    pub fn with_transport(credential: DeviceCredential, transport: Box<dyn Transport>) -> Result<Self> {
        Self::build(credential, transport, false)
    }

    fn build(credential: DeviceCredential, transport: Box<dyn Transport>, owns_tcp: bool) -> Result<Self> {
        let codec = FrameCodec::new(credential.key(), credential.version)?;

        Ok(Self {
            credential,
            codec,
            transport,
            owns_tcp,
            buffer: PacketBuffer::new(),
            pending: VecDeque::new(),
            sequence: SequenceCounter::new(),
            port: DEFAULT_PORT,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT),
            connect_timeout: Duration::from_secs(DEFAULT_CONNECT_TIMEOUT),
            max_reads: DEFAULT_MAX_READS,
        })
    }

    /// Use a non-default TCP port
    ///
    /// No effect on a transport passed to [`with_transport`](Self::with_transport).
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self.rebuild_tcp();
        self
    }

    /// Set connection timeout of the TCP transport
    ///
    /// No effect on a transport passed to [`with_transport`](Self::with_transport).
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self.rebuild_tcp();
        self
    }

    /// Set per-read timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set how many reads to attempt while waiting for a response
    pub fn with_max_reads(mut self, reads: usize) -> Self {
        self.max_reads = reads.max(1);
        self
    }

    /// Device credential
    pub fn credential(&self) -> &DeviceCredential {
        &self.credential
    }

    /// Frame codec of this device
    pub fn codec(&self) -> &FrameCodec {
        &self.codec
    }

    /// Check if connected
    pub fn is_connected(&self) -> bool {
        self.transport.is_connected()
    }

    /// Connect to device
    pub async fn connect(&mut self) -> Result<()> {
        info!("Connecting to {} ({})...", self.transport.remote_addr(), self.credential);

        self.transport.connect().await?;

        info!("Connected (protocol {})", self.codec.version());
        Ok(())
    }

    /// Disconnect from device
    pub async fn disconnect(&mut self) -> Result<()> {
        if !self.is_connected() {
            return Ok(());
        }

        info!("Disconnecting from {}...", self.transport.remote_addr());

        self.transport.disconnect().await?;
        self.buffer.clear();
        self.pending.clear();
        self.sequence.reset();

        info!("Disconnected");
        Ok(())
    }

    /// Install the session key negotiated with a 3.4 device
    pub fn set_session_key(&self, key: &[u8]) -> Result<()> {
        self.codec.set_session_key(key)?;
        Ok(())
    }

    /// Send a command, returning the sequence number it was sent with
    pub async fn send(&mut self, command: impl Into<u32>, payload: impl Into<Bytes>) -> Result<u32> {
        let frame = Frame::new(command, self.sequence.next(), payload);
        self.send_frame(&frame).await?;
        Ok(frame.sequence)
    }

    /// Encode and send a prepared frame
    pub async fn send_frame(&mut self, frame: &Frame) -> Result<()> {
        self.ensure_connected()?;

        trace!("Sending: {:?}", frame);

        let encrypt = self.wants_encryption(frame.command);
        let data = self.codec.encode(frame, encrypt)?;
        self.transport.send(&data).await?;

        Ok(())
    }

    /// Read once from the transport and return every frame that completed
    ///
    /// Malformed packets are logged with their hex dump and dropped; the
    /// connection stays open. Errors that are not about a single packet are
    /// returned.
    pub async fn receive(&mut self) -> Result<Vec<Frame>> {
        self.ensure_connected()?;

        let chunk = self.transport.receive(self.timeout).await?;
        self.buffer.extend(&chunk);

        let Some(complete) = self.buffer.take_complete() else {
            trace!(pending = self.buffer.len(), "Waiting for more bytes");
            return Ok(Vec::new());
        };

        let mut frames = Vec::new();
        for packet in self.codec.split_packets(&complete) {
            match self.codec.parse(packet) {
                Ok(frame) => {
                    trace!("Received: {:?}", frame);
                    frames.push(frame);
                }
                Err(e) if e.is_recoverable() => {
                    warn!(
                        integrity = e.is_integrity_failure(),
                        raw = e.raw_packet().unwrap_or_default(),
                        "Dropping malformed packet: {}", e
                    );
                }
                Err(e) => return Err(e.into()),
            }
        }

        Ok(frames)
    }

    /// Wait for the next frame
    pub async fn next_frame(&mut self) -> Result<Frame> {
        if let Some(frame) = self.pending.pop_front() {
            return Ok(frame);
        }

        for _ in 0..self.max_reads {
            let frames = self.receive().await?;
            self.pending.extend(frames);

            if let Some(frame) = self.pending.pop_front() {
                return Ok(frame);
            }
        }

        Err(Error::NoResponse {
            attempts: self.max_reads,
        })
    }

    /// Send a command and wait for the first frame that comes back
    pub async fn request(&mut self, command: impl Into<u32>, payload: impl Into<Bytes>) -> Result<Frame> {
        let sequence = self.send(command, payload).await?;
        let response = self.next_frame().await?;

        debug!(sequence, response = %response, "Request answered");
        Ok(response)
    }

    /// Keep-alive ping
    pub async fn heart_beat(&mut self) -> Result<Frame> {
        self.request(Command::HeartBeat, Bytes::new()).await
    }

    /// Query data-point status
    ///
    /// The JSON payload is device specific and passed through unchanged.
    pub async fn query_status(&mut self, payload: impl Into<Bytes>) -> Result<Frame> {
        let command = match self.codec.version() {
            ProtocolVersion::V34 => Command::DpQueryNew,
            _ => Command::DpQuery,
        };

        self.request(command, payload).await
    }

    // Helper methods

    fn ensure_connected(&self) -> Result<()> {
        if !self.is_connected() {
            return Err(Error::NotConnected);
        }
        Ok(())
    }

    // 3.1 devices only expect control commands encrypted
    fn wants_encryption(&self, command: u32) -> bool {
        match self.codec.version() {
            ProtocolVersion::V31 => command == u32::from(Command::Control),
            _ => true,
        }
    }

    fn rebuild_tcp(&mut self) {
        if !self.owns_tcp {
            return;
        }

        let transport = TcpTransport::new(self.credential.ip.clone(), self.port)
            .with_connect_timeout(self.connect_timeout)
            .with_read_timeout(self.timeout);
        self.transport = Box::new(transport);
    }
}
