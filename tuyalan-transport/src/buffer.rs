//! Reassembly of packets split across reads
//!
//! TCP hands over arbitrary chunks. The buffer keeps the incomplete tail of
//! one read and joins it with the next, releasing only whole packets to the
//! splitter. A packet ends at the first end marker after its start marker;
//! the declared length field (`16 + declared` bytes) is the minimum to wait
//! for before looking.

use byteorder::{BigEndian, ByteOrder};
use bytes::BytesMut;
use tracing::{trace, warn};
use tuyalan_core::{
    MAX_PACKET_SIZE,
    constants::{HEADER_SIZE, PREFIX_BYTES, SUFFIX_BYTES},
};

/// Accumulates received bytes until whole packets are available
#[derive(Debug)]
pub struct PacketBuffer {
    buf: BytesMut,
    max_packet_size: usize,
}

impl PacketBuffer {
    /// Create an empty buffer
    pub fn new() -> Self {
        Self {
            buf: BytesMut::with_capacity(1024),
            max_packet_size: MAX_PACKET_SIZE,
        }
    }
    
    /// Set the largest packet accepted before resynchronising
    pub fn with_max_packet_size(mut self, size: usize) -> Self {
        self.max_packet_size = size;
        self
    }
    
    /// Append a received chunk
    pub fn extend(&mut self, chunk: &[u8]) {
        self.buf.extend_from_slice(chunk);
    }
    
    /// Number of buffered bytes
    pub fn len(&self) -> usize {
        self.buf.len()
    }
    
    /// Check if nothing is buffered
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }
    
    /// Drop everything buffered
    pub fn clear(&mut self) {
        self.buf.clear();
    }
    
    /// Take the leading run of complete packets, if any
    ///
    /// A packet runs from a start marker to the first end marker after it,
    /// the same rule [`tuyalan_core::split_packets`] applies. The declared
    /// length is only a lower bound on the bytes to wait for: devices may
    /// send padding between the checksum and the end marker.
    ///
    /// Bytes before the first start marker are discarded. A packet whose
    /// declared length exceeds the maximum packet size, or that grows past it
    /// without an end marker, is skipped by dropping its start marker.
    pub fn take_complete(&mut self) -> Option<BytesMut> {
        let mut end = 0;
        
        loop {
            self.discard_garbage(end);
            
            let rest = &self.buf[end..];
            if rest.len() < HEADER_SIZE || !rest.starts_with(&PREFIX_BYTES) {
                break;
            }
            
            let declared = HEADER_SIZE + BigEndian::read_u32(&rest[12..16]) as usize;
            
            if declared > self.max_packet_size {
                warn!(
                    declared,
                    max = self.max_packet_size,
                    "Oversized packet, resynchronising"
                );
                self.skip_marker(end);
                continue;
            }
            
            if rest.len() < declared {
                break;
            }
            
            match packet_len(rest) {
                Some(len) => end += len,
                None if rest.len() > self.max_packet_size => {
                    warn!(
                        pending = rest.len(),
                        max = self.max_packet_size,
                        "Unterminated packet, resynchronising"
                    );
                    self.skip_marker(end);
                }
                None => break,
            }
        }
        
        if end == 0 {
            return None;
        }
        
        trace!(complete = end, pending = self.buf.len() - end, "Released packets");
        Some(self.buf.split_to(end))
    }
    
    /// Drop the start marker at `at` so the scan moves on to the next one
    fn skip_marker(&mut self, at: usize) {
        let mut tail = self.buf.split_off(at);
        let _ = tail.split_to(PREFIX_BYTES.len());
        self.buf.unsplit(tail);
    }
    
    /// Remove bytes between `from` and the next start marker
    ///
    /// Without a start marker in sight, up to three trailing bytes are kept:
    /// they may be the beginning of a marker split across reads.
    fn discard_garbage(&mut self, from: usize) {
        let rest = &self.buf[from..];
        let skip = match rest.windows(PREFIX_BYTES.len()).position(|w| w == PREFIX_BYTES) {
            Some(0) => return,
            Some(i) => i,
            None => rest.len().saturating_sub(PREFIX_BYTES.len() - 1),
        };
        
        if skip == 0 {
            return;
        }
        
        trace!(skipped = skip, "Discarding bytes before start marker");
        let tail = self.buf.split_off(from);
        self.buf.extend_from_slice(&tail[skip..]);
    }
}

/// Length of the packet at the start of `buf`, through its end marker
fn packet_len(buf: &[u8]) -> Option<usize> {
    let body = PREFIX_BYTES.len();
    buf[body..]
        .windows(SUFFIX_BYTES.len())
        .position(|w| w == SUFFIX_BYTES)
        .map(|i| body + i + SUFFIX_BYTES.len())
}

impl Default for PacketBuffer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tuyalan_core::{Command, Frame, FrameCodec, ProtocolVersion};
    
    fn packet(seq: u32) -> BytesMut {
        let codec = FrameCodec::new(b"f33444a6362a9664", ProtocolVersion::V33).unwrap();
        codec.encode(&Frame::new(Command::Status, seq, "{\"dps\":{}}"), true).unwrap()
    }
    
    /// Packet with padding between checksum and end marker, declared length untouched
    fn loose_packet(seq: u32) -> BytesMut {
        let p = packet(seq);
        let mut loose = BytesMut::from(&p[..p.len() - 4]);
        loose.extend_from_slice(&[0xAB; 4]);
        loose.extend_from_slice(&p[p.len() - 4..]);
        loose
    }
    
    #[test]
    fn test_buffer_whole_packet() {
        let p = packet(1);
        let mut buffer = PacketBuffer::new();
        buffer.extend(&p);
        
        assert_eq!(buffer.take_complete().unwrap(), p);
        assert!(buffer.is_empty());
    }
    
    #[test]
    fn test_buffer_split_across_reads() {
        let p = packet(1);
        let mut buffer = PacketBuffer::new();
        
        buffer.extend(&p[..10]);
        assert!(buffer.take_complete().is_none());
        
        buffer.extend(&p[10..30]);
        assert!(buffer.take_complete().is_none());
        
        buffer.extend(&p[30..]);
        assert_eq!(buffer.take_complete().unwrap(), p);
    }
    
    #[test]
    fn test_buffer_keeps_partial_tail() {
        let a = packet(1);
        let b = packet(2);
        
        let mut buffer = PacketBuffer::new();
        buffer.extend(&a);
        buffer.extend(&b[..5]);
        
        assert_eq!(buffer.take_complete().unwrap(), a);
        assert_eq!(buffer.len(), 5);
        
        buffer.extend(&b[5..]);
        assert_eq!(buffer.take_complete().unwrap(), b);
    }
    
    #[test]
    fn test_buffer_multiple_packets() {
        let a = packet(1);
        let b = packet(2);
        
        let mut buffer = PacketBuffer::new();
        buffer.extend(&a);
        buffer.extend(&b);
        
        let complete = buffer.take_complete().unwrap();
        assert_eq!(complete.len(), a.len() + b.len());
    }
    
    #[test]
    fn test_buffer_discards_leading_garbage() {
        let p = packet(1);
        let mut buffer = PacketBuffer::new();
        buffer.extend(&[0x01, 0x02, 0x03, 0x04, 0x05]);
        buffer.extend(&p);
        
        assert_eq!(buffer.take_complete().unwrap(), p);
    }
    
    #[test]
    fn test_buffer_marker_split_across_reads() {
        let p = packet(1);
        let mut buffer = PacketBuffer::new();
        
        buffer.extend(&[0xFF, 0xFF, 0xFF, 0xFF, 0xFF]);
        buffer.extend(&p[..2]);
        assert!(buffer.take_complete().is_none());
        
        buffer.extend(&p[2..]);
        assert_eq!(buffer.take_complete().unwrap(), p);
    }
    
    #[test]
    fn test_buffer_oversized_resync() {
        let p = packet(1);
        let mut bogus = p.clone();
        bogus[12..16].copy_from_slice(&0x00FF_FFFFu32.to_be_bytes());
        
        let mut buffer = PacketBuffer::new().with_max_packet_size(1024);
        buffer.extend(&bogus);
        buffer.extend(&p);
        
        assert_eq!(buffer.take_complete().unwrap(), p);
    }
    
    #[test]
    fn test_buffer_loose_declared_length() {
        let a = loose_packet(1);
        let b = packet(2);
        
        let mut buffer = PacketBuffer::new();
        buffer.extend(&a);
        buffer.extend(&b);
        
        let complete = buffer.take_complete().unwrap();
        assert_eq!(complete.len(), a.len() + b.len());
        assert!(buffer.is_empty());
        
        let codec = FrameCodec::new(b"f33444a6362a9664", ProtocolVersion::V33).unwrap();
        let sequences: Vec<u32> = codec
            .split_packets(&complete)
            .into_iter()
            .map(|p| codec.parse(p).unwrap().sequence)
            .collect();
        assert_eq!(sequences, vec![1, 2]);
    }
    
    #[test]
    fn test_buffer_loose_packet_split_across_reads() {
        let a = loose_packet(1);
        let mut buffer = PacketBuffer::new();
        
        // Declared length satisfied, end marker not yet received
        buffer.extend(&a[..a.len() - 2]);
        assert!(buffer.take_complete().is_none());
        
        buffer.extend(&a[a.len() - 2..]);
        assert_eq!(buffer.take_complete().unwrap(), a);
    }
    
    #[test]
    fn test_buffer_unterminated_resync() {
        let p = packet(1);
        let mut unterminated = BytesMut::from(&p[..p.len() - 4]);
        unterminated.extend_from_slice(&[0u8; 64]);
        
        let mut buffer = PacketBuffer::new().with_max_packet_size(96);
        buffer.extend(&unterminated);
        assert!(buffer.take_complete().is_none());
        
        buffer.extend(&p);
        assert_eq!(buffer.take_complete().unwrap(), p);
    }
}
