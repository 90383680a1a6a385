//! Access decisions.

/// Outcome of evaluating one request against sealing and access rules.
///
/// Carries the wire-level exception code so the protocol layer can build a
/// denial response without re-deriving any policy detail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decision {
    pub allowed: bool,
    pub exception_code: u8,
    pub reason: String,
}

impl Decision {
    pub fn allow(reason: impl Into<String>) -> Self {
        Self {
            allowed: true,
            exception_code: 0,
            reason: reason.into(),
        }
    }

    pub fn deny(exception_code: u8, reason: impl Into<String>) -> Self {
        Self {
            allowed: false,
            exception_code,
            reason: reason.into(),
        }
    }
}
