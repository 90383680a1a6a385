//! Error handling for the memory appliance service.

use thiserror::Error;

/// Memory Appliance Service error type
#[derive(Error, Debug)]
pub enum MemSrvError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Input/Output operation errors
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// Frame-level protocol violations (malformed envelope or header)
    #[error("Protocol error: {0}")]
    ProtocolError(String),

    /// Function-specific payload decode failures
    #[error("Decode error: {0}")]
    DecodeError(String),

    /// Memory core failures
    #[error("Memory error: {0}")]
    MemoryError(#[from] memcore::MemoryError),

    /// Authority construction failures
    #[error("Authority error: {0}")]
    AuthorityError(#[from] authority::AuthorityError),
}

/// Result alias for service operations
pub type Result<T> = std::result::Result<T, MemSrvError>;
