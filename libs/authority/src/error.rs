//! Error types for authority construction.

use thiserror::Error;

/// Authority error type
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthorityError {
    /// A rule was declared without an id
    #[error("rule id required")]
    RuleIdRequired,

    /// A source IP entry failed to parse as a bare address or CIDR prefix
    #[error("invalid source ip entry {0:?}")]
    InvalidSourceIp(String),
}

/// Result alias for authority operations
pub type Result<T> = std::result::Result<T, AuthorityError>;
