//! Memory Appliance Service (memsrv)
//!
//! A protocol-terminating memory appliance: independently addressable blocks
//! of process memory (bit areas and register areas) exposed over Modbus TCP
//! and over a raw binary write channel, with per-memory access policy and a
//! state-sealing interlock enforced on the Modbus path.
//!
//! # Architecture
//!
//! - **`config`**: YAML configuration, validation, and translation into the
//!   runtime memory store and authority policies
//! - **`ingress`**: TCP listeners that hand accepted connections to the
//!   correct protocol loop
//! - **`transport::modbus`**: MBAP framing, PDU codec, dispatch into the
//!   memory core, per-connection request loop
//! - **`transport::rawingest`**: fixed-header binary write channel into the
//!   same memory core
//!
//! Every inbound byte flows framing → sealing → authorization → memory
//! access → response encoding, in that order. The memory core and the access
//! authority live in the `memcore` and `authority` crates.

pub mod config;
pub mod error;
pub mod ingress;
pub mod logging;
pub mod transport;

pub use error::{MemSrvError, Result};
