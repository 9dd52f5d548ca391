//! Device credential

use std::fmt;

use crate::error::{Error, Result};
use crate::version::ProtocolVersion;

/// Length of a device local key in bytes
pub const LOCAL_KEY_LEN: usize = 16;

/// Identity and static key of a single device
///
/// Created once from configuration and never mutated afterwards.
#[derive(Clone, PartialEq, Eq)]
pub struct DeviceCredential {
    /// Device IP address or hostname
    pub ip: String,

    /// Device id (also used as `gwId`/`devId` in data-point payloads)
    pub id: String,

    /// 16-byte local key
    key: [u8; LOCAL_KEY_LEN],

    /// Protocol generation the device speaks
    pub version: ProtocolVersion,
}

impl DeviceCredential {
    /// Create a credential, validating the local key length
    pub fn new(
        ip: impl Into<String>,
        id: impl Into<String>,
        key: impl AsRef<[u8]>,
        version: ProtocolVersion,
    ) -> Result<Self> {
        let key: [u8; LOCAL_KEY_LEN] = key.as_ref().try_into().map_err(|_| {
            Error::Validation(format!(
                "local key must be {LOCAL_KEY_LEN} bytes, got {}",
                key.as_ref().len()
            ))
        })?;

        Ok(Self {
            ip: ip.into(),
            id: id.into(),
            key,
            version,
        })
    }

    /// Local key bytes
    pub fn key(&self) -> &[u8; LOCAL_KEY_LEN] {
        &self.key
    }
}

// Keep the key out of logs.
impl fmt::Debug for DeviceCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeviceCredential")
            .field("ip", &self.ip)
            .field("id", &self.id)
            .field("key", &"<redacted>")
            .field("version", &self.version)
            .finish()
    }
}

impl fmt::Display for DeviceCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Device[{} @ {}, v{}]", self.id, self.ip, self.version)
    }
}
