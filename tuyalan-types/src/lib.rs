//! Type definitions for tuyalan

pub mod credential;
pub mod error;
pub mod version;

pub use credential::DeviceCredential;
pub use error::{Error, Result};
pub use version::ProtocolVersion;
