//! Protocol version identifiers

use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};

/// LAN protocol generation spoken by a device
///
/// The textual form ("3.1" .. "3.4") is part of the wire format: it is the
/// first three bytes of the version header block.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ProtocolVersion {
    V31,
    V32,
    #[default]
    V33,
    V34,
}

impl ProtocolVersion {
    /// All supported versions, oldest first
    pub const ALL: [ProtocolVersion; 4] = [Self::V31, Self::V32, Self::V33, Self::V34];

    /// Version string as written on the wire
    pub fn as_str(self) -> &'static str {
        match self {
            Self::V31 => "3.1",
            Self::V32 => "3.2",
            Self::V33 => "3.3",
            Self::V34 => "3.4",
        }
    }

    /// The three ASCII bytes of the version header
    pub fn as_bytes(self) -> &'static [u8; 3] {
        match self {
            Self::V31 => b"3.1",
            Self::V32 => b"3.2",
            Self::V33 => b"3.3",
            Self::V34 => b"3.4",
        }
    }

    /// True for the 3.4 generation (HMAC trailer, manual padding)
    pub fn is_extended(self) -> bool {
        matches!(self, Self::V34)
    }
}

impl fmt::Display for ProtocolVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProtocolVersion {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "3.1" => Ok(Self::V31),
            "3.2" => Ok(Self::V32),
            "3.3" => Ok(Self::V33),
            "3.4" => Ok(Self::V34),
            other => Err(Error::Parse(format!("unsupported protocol version: {other:?}"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_version_parse_display() {
        for version in ProtocolVersion::ALL {
            let parsed: ProtocolVersion = version.to_string().parse().unwrap();
            assert_eq!(parsed, version);
        }
    }

    #[test]
    fn test_version_bytes_match_str() {
        for version in ProtocolVersion::ALL {
            assert_eq!(version.as_bytes(), version.as_str().as_bytes());
        }
    }

    #[test]
    fn test_version_unknown() {
        assert!("3.5".parse::<ProtocolVersion>().is_err());
        assert!("".parse::<ProtocolVersion>().is_err());
    }

    #[test]
    fn test_version_ordering() {
        assert!(ProtocolVersion::V31 < ProtocolVersion::V34);
        assert!(ProtocolVersion::V34.is_extended());
        assert!(!ProtocolVersion::V33.is_extended());
    }
}
