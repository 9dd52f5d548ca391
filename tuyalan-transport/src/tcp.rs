//! TCP transport

use std::net::SocketAddr;
use std::time::Duration;

use async_trait::async_trait;
use bytes::BytesMut;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tracing::{debug, trace, warn};
use tuyalan_core::constants::{DEFAULT_CONNECT_TIMEOUT, DEFAULT_TIMEOUT};

use crate::{error::*, Transport};

/// TCP transport for LAN devices (port 6668)
pub struct TcpTransport {
    addr: String,
    port: u16,
    socket_addr: Option<SocketAddr>,
    stream: Option<TcpStream>,
    connect_timeout: Duration,
    read_timeout: Duration,
}

impl TcpTransport {
    /// Create new TCP transport
    pub fn new(addr: impl Into<String>, port: u16) -> Self {
        Self {
            addr: addr.into(),
            port,
            socket_addr: None,
            stream: None,
            connect_timeout: Duration::from_secs(DEFAULT_CONNECT_TIMEOUT),
            read_timeout: Duration::from_secs(DEFAULT_TIMEOUT),
        }
    }
    
    /// Set connection timeout
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }
    
    /// Set read timeout used when the caller passes a zero timeout
    pub fn with_read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = timeout;
        self
    }
    
    /// Resolve address to SocketAddr
    async fn resolve_addr(&mut self) -> Result<SocketAddr> {
        if let Some(addr) = self.socket_addr {
            return Ok(addr);
        }
        
        let addr_str = format!("{}:{}", self.addr, self.port);
        
        let addrs: Vec<SocketAddr> = tokio::net::lookup_host(&addr_str)
            .await
            .map_err(|e| Error::InvalidAddress(format!("{}: {}", addr_str, e)))?
            .collect();
        
        let addr = addrs
            .first()
            .ok_or_else(|| Error::InvalidAddress(format!("No addresses found for {}", addr_str)))?;
        
        self.socket_addr = Some(*addr);
        Ok(*addr)
    }
}

#[async_trait]
impl Transport for TcpTransport {
    async fn connect(&mut self) -> Result<()> {
        if self.is_connected() {
            return Err(Error::AlreadyConnected);
        }
        
        let addr = self.resolve_addr().await?;
        
        debug!("Connecting to {}...", addr);
        
        let stream = timeout(self.connect_timeout, TcpStream::connect(addr))
            .await
            .map_err(|_| Error::ConnectionTimeout)?
            .map_err(Error::Io)?;
        
        // Disable Nagle's algorithm for low latency
        stream.set_nodelay(true)?;
        
        debug!("Connected to {}", addr);
        
        self.stream = Some(stream);
        Ok(())
    }
    
    async fn disconnect(&mut self) -> Result<()> {
        if let Some(mut stream) = self.stream.take() {
            debug!("Disconnecting from {}...", self.remote_addr());
            
            // Graceful shutdown
            let _ = stream.shutdown().await;
        }
        
        self.socket_addr = None;
        Ok(())
    }
    
    fn is_connected(&self) -> bool {
        self.stream.is_some()
    }
    
    async fn send(&mut self, data: &[u8]) -> Result<()> {
        let stream = self.stream.as_mut().ok_or(Error::NotConnected)?;
        
        trace!("Sending {} bytes: {:02X?}", data.len(), &data[..data.len().min(16)]);
        
        stream.write_all(data).await?;
        stream.flush().await?;
        
        Ok(())
    }
    
    async fn receive(&mut self, wait: Duration) -> Result<BytesMut> {
        let wait = if wait.is_zero() { self.read_timeout } else { wait };
        let stream = self.stream.as_mut().ok_or(Error::NotConnected)?;
        
        let mut buf = BytesMut::with_capacity(1024);
        
        let n = timeout(wait, stream.read_buf(&mut buf))
            .await
            .map_err(|_| Error::ReadTimeout)?
            .map_err(Error::Io)?;
        
        if n == 0 {
            return Err(Error::ConnectionClosed);
        }
        
        trace!("Received {} bytes: {:02X?}", n, &buf[..n.min(16)]);
        
        Ok(buf)
    }
    
    fn remote_addr(&self) -> String {
        self.socket_addr
            .map(|addr| addr.to_string())
            .unwrap_or_else(|| format!("{}:{}", self.addr, self.port))
    }
}

impl Drop for TcpTransport {
    fn drop(&mut self) {
        if self.is_connected() {
            warn!("TCP transport dropped while still connected");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;
    
    #[tokio::test]
    async fn test_tcp_transport_create() {
        let transport = TcpTransport::new("192.168.0.100", 6668);
        assert!(!transport.is_connected());
        assert_eq!(transport.remote_addr(), "192.168.0.100:6668");
    }
    
    #[tokio::test]
    async fn test_tcp_transport_invalid_address() {
        let mut transport = TcpTransport::new("invalid..address", 6668)
            .with_connect_timeout(Duration::from_millis(100));
        
        let result = transport.connect().await;
        assert!(result.is_err());
    }
    
    #[tokio::test]
    async fn test_tcp_transport_not_connected() {
        let mut transport = TcpTransport::new("127.0.0.1", 6668);
        
        assert!(matches!(transport.send(b"x").await, Err(Error::NotConnected)));
        assert!(matches!(
            transport.receive(Duration::from_millis(10)).await,
            Err(Error::NotConnected)
        ));
    }
    
    #[tokio::test]
    async fn test_tcp_transport_loopback() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        
        let server = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 4];
            socket.read_exact(&mut buf).await.unwrap();
            socket.write_all(&buf).await.unwrap();
        });
        
        let mut transport = TcpTransport::new("127.0.0.1", port);
        transport.connect().await.unwrap();
        assert!(transport.is_connected());
        assert!(matches!(transport.connect().await, Err(Error::AlreadyConnected)));
        
        transport.send(&[0x00, 0x00, 0x55, 0xAA]).await.unwrap();
        let echoed = transport.receive(Duration::from_secs(1)).await.unwrap();
        assert_eq!(echoed.as_ref(), &[0x00, 0x00, 0x55, 0xAA]);
        
        server.await.unwrap();
        
        let closed = transport.receive(Duration::from_secs(1)).await;
        assert!(matches!(closed, Err(Error::ConnectionClosed)));
        
        transport.disconnect().await.unwrap();
        assert!(!transport.is_connected());
    }
}
