//! Error types for the memory core.

use thiserror::Error;

/// Memory core error type
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemoryError {
    /// No memory is registered under the requested identity
    #[error("unknown memory id")]
    UnknownMemoryId,

    /// The requested area kind has no layout on this memory
    #[error("area not defined")]
    AreaNotDefined,

    /// The area kind is not valid for the requested operation
    #[error("invalid area")]
    InvalidArea,

    /// Read/write count must be positive
    #[error("count must be > 0")]
    CountZero,

    /// Destination buffer is smaller than the requested window
    #[error("destination buffer too small")]
    DstTooSmall,

    /// Source buffer is smaller than the requested window
    #[error("source buffer too small")]
    SrcTooSmall,

    /// The window [address, address+count) is not contained in the layout
    #[error("out of bounds")]
    OutOfBounds,

    /// Layout start + size exceeds the 16-bit address space
    #[error("start + size overflow")]
    StartOverflow,

    /// Layout size must be positive
    #[error("size must be > 0")]
    SizeZero,

    /// Memory identity port must be non-zero
    #[error("port must be > 0")]
    PortZero,

    /// Memory identity unit id must be non-zero
    #[error("unit id must be > 0")]
    UnitIdZero,

    /// A memory is already registered under this identity
    #[error("duplicate memory id")]
    DuplicateMemoryId,
}

/// Result alias for memory core operations
pub type Result<T> = std::result::Result<T, MemoryError>;
