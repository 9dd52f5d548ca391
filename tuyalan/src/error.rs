//! High-level error types

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Core protocol error: {0}")]
    Core(#[from] tuyalan_core::Error),
    
    #[error("Transport error: {0}")]
    Transport(#[from] tuyalan_transport::Error),
    
    #[error("Type error: {0}")]
    Types(#[from] tuyalan_types::Error),
    
    #[error("Device not connected")]
    NotConnected,
    
    #[error("No response from device after {attempts} reads")]
    NoResponse {
        attempts: usize,
    },
}
