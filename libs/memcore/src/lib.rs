//! Memory core for the memsrv appliance.
//!
//! Provides typed, bounds-checked, concurrency-safe memory instances that are
//! bit-addressable (coils, discrete inputs) or word-addressable (holding and
//! input registers), plus a concurrent store keyed by protocol-derived
//! identity. This crate is pure data plane: it knows nothing about framing,
//! authorization or transports, and it never logs — every failure is returned
//! as a structured [`MemoryError`] for the caller to translate.

pub mod area;
pub mod bits;
pub mod error;
pub mod layout;
pub mod memory;
pub mod store;

pub use area::Area;
pub use error::{MemoryError, Result};
pub use layout::AreaLayout;
pub use memory::{Memory, MemoryId, MemoryLayouts, StateSealingDef};
pub use store::Store;
