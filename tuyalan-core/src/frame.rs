//! Application-level message

use bytes::Bytes;
use std::fmt;

use crate::command::Command;

/// Message exchanged with a device
///
/// After [`FrameCodec::parse_packet`] the payload is still ciphertext; after
/// [`FrameCodec::parse`] it is plaintext.
///
/// # Examples
///
/// ```
/// use tuyalan_core::{Command, Frame};
///
/// let frame = Frame::new(Command::DpQuery, 1, "{}");
/// assert_eq!(frame.command, 0x0A);
/// assert_eq!(frame.kind(), Some(Command::DpQuery));
/// ```
///
/// [`FrameCodec::parse_packet`]: crate::FrameCodec::parse_packet
/// [`FrameCodec::parse`]: crate::FrameCodec::parse
#[derive(Clone, PartialEq, Eq)]
pub struct Frame {
    /// Payload bytes
    pub payload: Bytes,
    
    /// Raw command code
    pub command: u32,
    
    /// Sequence number (0 means "absent")
    pub sequence: u32,
}

impl Frame {
    /// Create a frame
    pub fn new(command: impl Into<u32>, sequence: u32, payload: impl Into<Bytes>) -> Self {
        Self {
            payload: payload.into(),
            command: command.into(),
            sequence,
        }
    }
    
    /// Create a frame with an empty payload
    pub fn empty(command: impl Into<u32>, sequence: u32) -> Self {
        Self::new(command, sequence, Bytes::new())
    }
    
    /// Registry entry for the command code, if known
    pub fn kind(&self) -> Option<Command> {
        Command::try_from(self.command).ok()
    }
    
    /// Check if the frame originates from UDP discovery
    pub fn is_discovery(&self) -> bool {
        self.kind().is_some_and(Command::is_discovery)
    }
    
    /// Payload as text, replacing invalid UTF-8
    pub fn payload_str(&self) -> std::borrow::Cow<'_, str> {
        String::from_utf8_lossy(&self.payload)
    }
}

impl fmt::Debug for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let command = match self.kind() {
            Some(cmd) => cmd.to_string(),
            None => format!("0x{:02X}", self.command),
        };
        
        f.debug_struct("Frame")
            .field("command", &command)
            .field("sequence", &self.sequence)
            .field("payload_len", &self.payload.len())
            .finish()
    }
}

impl fmt::Display for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind() {
            Some(cmd) => write!(f, "Frame[{}]", cmd)?,
            None => write!(f, "Frame[0x{:02X}]", self.command)?,
        }
        write!(f, "(seq={}, len={})", self.sequence, self.payload.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    
    #[test]
    fn test_frame_new() {
        let frame = Frame::new(Command::Control, 7, vec![1, 2, 3]);
        assert_eq!(frame.command, 0x07);
        assert_eq!(frame.sequence, 7);
        assert_eq!(frame.payload.as_ref(), &[1, 2, 3]);
    }
    
    #[test]
    fn test_frame_unknown_command_passes_through() {
        let frame = Frame::empty(0xFEu32, 0);
        assert_eq!(frame.kind(), None);
        assert!(!frame.is_discovery());
        assert_eq!(frame.to_string(), "Frame[0xFE](seq=0, len=0)");
    }
    
    #[test]
    fn test_frame_discovery() {
        assert!(Frame::empty(Command::UdpNew, 0).is_discovery());
        assert!(!Frame::empty(Command::Status, 0).is_discovery());
    }
    
    #[test]
    fn test_frame_payload_str() {
        let frame = Frame::new(Command::Status, 1, "{\"dps\":{}}");
        assert_eq!(frame.payload_str(), "{\"dps\":{}}");
    }
}
