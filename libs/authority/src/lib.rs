//! Access authority for the memsrv appliance.
//!
//! Combines the state-sealing interlock with per-memory ordered access rules
//! (source IP prefix + allowed function codes). Evaluation order is part of
//! the device's external contract and must not change:
//!
//! 1. sealing flag set for the identity → deny with Device Busy (0x06),
//!    unconditionally, before any rule is consulted;
//! 2. no policy, or a policy with zero rules → deny with Illegal Function
//!    (0x01) — absence of policy is never an implicit allow;
//! 3. rules scan top-down; the first rule whose IP matcher contains the
//!    source decides terminally by function-code membership;
//! 4. no matching rule → deny with Illegal Function (0x01).

pub mod decision;
pub mod error;
pub mod evaluate;
pub mod ipmatch;
pub mod rule;
pub mod sealing;

pub use decision::Decision;
pub use error::{AuthorityError, Result};
pub use evaluate::{AccessRequest, Authority};
pub use ipmatch::IpMatcher;
pub use rule::{MemoryPolicy, Rule};
pub use sealing::Sealing;

/// Modbus exception code for a request denied by access rules.
pub const EXCEPTION_ILLEGAL_FUNCTION: u8 = 0x01;

/// Modbus exception code for a request denied by the sealing interlock.
pub const EXCEPTION_DEVICE_BUSY: u8 = 0x06;
