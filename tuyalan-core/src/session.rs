//! Per-device session state
//!
//! A codec carries two pieces of mutable state:
//! - The signing/encryption key (static local key, or a negotiated session key)
//! - The sequence counter for outgoing frames

use std::sync::atomic::{AtomicU32, Ordering};

/// Key currently used by the cipher
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum KeyState {
    /// Device local key from the credential
    #[default]
    Static,
    
    /// Session key produced by the 3.4 negotiation; shadows the local key
    NegotiatedSession([u8; 16]),
}

impl KeyState {
    /// Check if a session key has been negotiated
    pub fn is_negotiated(&self) -> bool {
        matches!(self, Self::NegotiatedSession(_))
    }
    
    /// Resolve the active key against the static one
    pub fn resolve<'a>(&'a self, local_key: &'a [u8; 16]) -> &'a [u8; 16] {
        match self {
            Self::Static => local_key,
            Self::NegotiatedSession(key) => key,
        }
    }
}

/// Outgoing sequence number generator
///
/// Starts at 1 and wraps past `u32::MAX` back to 1. Zero is never produced:
/// on the wire a zero sequence is indistinguishable from an absent one.
#[derive(Debug)]
pub struct SequenceCounter {
    next: AtomicU32,
}

impl SequenceCounter {
    /// First sequence number handed out
    pub const INITIAL: u32 = 1;
    
    /// Create a counter starting at [`Self::INITIAL`]
    pub fn new() -> Self {
        Self {
            next: AtomicU32::new(Self::INITIAL),
        }
    }
    
    /// Get next sequence number
    pub fn next(&self) -> u32 {
        loop {
            let current = self.next.fetch_add(1, Ordering::AcqRel);
            if current != 0 {
                return current;
            }
        }
    }
    
    /// Peek at the number the next call will return
    pub fn peek(&self) -> u32 {
        match self.next.load(Ordering::Acquire) {
            0 => Self::INITIAL,
            n => n,
        }
    }
    
    /// Restart from [`Self::INITIAL`]
    pub fn reset(&self) {
        self.next.store(Self::INITIAL, Ordering::Release);
    }
}

impl Default for SequenceCounter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    
    #[test]
    fn test_key_state_resolve() {
        let local = *b"0123456789abcdef";
        let session = *b"fedcba9876543210";
        
        assert_eq!(KeyState::Static.resolve(&local), &local);
        assert_eq!(KeyState::NegotiatedSession(session).resolve(&local), &session);
        assert!(!KeyState::default().is_negotiated());
    }
    
    #[test]
    fn test_sequence_generation() {
        let seq = SequenceCounter::new();
        
        assert_eq!(seq.next(), 1);
        assert_eq!(seq.next(), 2);
        assert_eq!(seq.peek(), 3);
        
        seq.reset();
        assert_eq!(seq.next(), 1);
    }
    
    #[test]
    fn test_sequence_skips_zero() {
        let seq = SequenceCounter {
            next: AtomicU32::new(u32::MAX),
        };
        
        assert_eq!(seq.next(), u32::MAX);
        assert_eq!(seq.peek(), 1);
        assert_eq!(seq.next(), 1);
    }
}
