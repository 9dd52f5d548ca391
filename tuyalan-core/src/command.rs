//! LAN protocol command definitions

use std::fmt;

use crate::error::{Error, Result};

/// Protocol command codes
///
/// Codes 0x03 - 0x05 are used by the session key negotiation on 3.4 devices.
/// Device-control codes outside this table still travel through [`Frame`]
/// as raw `u32` values.
///
/// [`Frame`]: crate::Frame
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum Command {
    // Discovery & provisioning
    Udp = 0x00,
    ApConfig = 0x01,
    Active = 0x02,
    
    // Session key negotiation (3.4)
    SessKeyNegStart = 0x03,
    SessKeyNegResp = 0x04,
    SessKeyNegFinish = 0x05,
    
    Unbind = 0x06,
    
    // Data points
    Control = 0x07,
    Status = 0x08,
    HeartBeat = 0x09,
    DpQuery = 0x0A,
    QueryWifi = 0x0B,
    TokenBind = 0x0C,
    ControlNew = 0x0D,
    EnableWifi = 0x0E,
    WifiInfo = 0x0F,
    DpQueryNew = 0x10,
    SceneExecute = 0x11,
    DpRefresh = 0x12,
    
    // Discovery (newer firmware)
    UdpNew = 0x13,
    ApConfigNew = 0x14,
    BroadcastLpv34 = 0x23,
    
    ReqDevInfo = 0x25,
    LanExtStream = 0x40,
}

impl Command {
    /// Check if packets with this command originate from UDP discovery
    ///
    /// Discovery packets always carry the CRC32 trailer, even on 3.4.
    pub fn is_discovery(self) -> bool {
        matches!(self, Self::Udp | Self::UdpNew | Self::BroadcastLpv34)
    }
    
    /// Get command name
    pub fn name(self) -> &'static str {
        match self {
            Self::Udp => "UDP",
            Self::ApConfig => "AP_CONFIG",
            Self::Active => "ACTIVE",
            Self::SessKeyNegStart => "SESS_KEY_NEG_START",
            Self::SessKeyNegResp => "SESS_KEY_NEG_RESP",
            Self::SessKeyNegFinish => "SESS_KEY_NEG_FINISH",
            Self::Unbind => "UNBIND",
            Self::Control => "CONTROL",
            Self::Status => "STATUS",
            Self::HeartBeat => "HEART_BEAT",
            Self::DpQuery => "DP_QUERY",
            Self::QueryWifi => "QUERY_WIFI",
            Self::TokenBind => "TOKEN_BIND",
            Self::ControlNew => "CONTROL_NEW",
            Self::EnableWifi => "ENABLE_WIFI",
            Self::WifiInfo => "WIFI_INFO",
            Self::DpQueryNew => "DP_QUERY_NEW",
            Self::SceneExecute => "SCENE_EXECUTE",
            Self::DpRefresh => "DP_REFRESH",
            Self::UdpNew => "UDP_NEW",
            Self::ApConfigNew => "AP_CONFIG_NEW",
            Self::BroadcastLpv34 => "BROADCAST_LPV34",
            Self::ReqDevInfo => "REQ_DEVINFO",
            Self::LanExtStream => "LAN_EXT_STREAM",
        }
    }
}

impl From<Command> for u32 {
    fn from(cmd: Command) -> u32 {
        cmd as u32
    }
}

impl TryFrom<u32> for Command {
    type Error = Error;
    
    fn try_from(value: u32) -> Result<Self> {
        match value {
            0x00 => Ok(Self::Udp),
            0x01 => Ok(Self::ApConfig),
            0x02 => Ok(Self::Active),
            0x03 => Ok(Self::SessKeyNegStart),
            0x04 => Ok(Self::SessKeyNegResp),
            0x05 => Ok(Self::SessKeyNegFinish),
            0x06 => Ok(Self::Unbind),
            0x07 => Ok(Self::Control),
            0x08 => Ok(Self::Status),
            0x09 => Ok(Self::HeartBeat),
            0x0A => Ok(Self::DpQuery),
            0x0B => Ok(Self::QueryWifi),
            0x0C => Ok(Self::TokenBind),
            0x0D => Ok(Self::ControlNew),
            0x0E => Ok(Self::EnableWifi),
            0x0F => Ok(Self::WifiInfo),
            0x10 => Ok(Self::DpQueryNew),
            0x11 => Ok(Self::SceneExecute),
            0x12 => Ok(Self::DpRefresh),
            0x13 => Ok(Self::UdpNew),
            0x14 => Ok(Self::ApConfigNew),
            0x23 => Ok(Self::BroadcastLpv34),
            0x25 => Ok(Self::ReqDevInfo),
            0x40 => Ok(Self::LanExtStream),
            _ => Err(Error::UnknownCommand(value)),
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(0x{:02X})", self.name(), *self as u32)
    }
}

/// Check if a raw command code marks a discovery-origin packet
pub fn is_discovery_code(code: u32) -> bool {
    Command::try_from(code).is_ok_and(Command::is_discovery)
}
