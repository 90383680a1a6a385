//! Per-identity sealing flags.

use dashmap::DashMap;
use memcore::MemoryId;

/// Live sealing state, keyed by memory identity.
///
/// This is policy state, not a memory lock: it is toggled by an external
/// administrative action, never by protocol requests. An absent entry means
/// "not sealed."
#[derive(Debug, Default)]
pub struct Sealing {
    flags: DashMap<MemoryId, bool>,
}

impl Sealing {
    pub fn new() -> Self {
        Self {
            flags: DashMap::new(),
        }
    }

    /// Set the sealing flag for an identity.
    pub fn set(&self, id: MemoryId, sealed: bool) {
        self.flags.insert(id, sealed);
    }

    pub fn seal(&self, id: MemoryId) {
        self.set(id, true);
    }

    pub fn unseal(&self, id: MemoryId) {
        self.set(id, false);
    }

    /// Whether the identity is currently sealed. Absence means unsealed.
    pub fn is_sealed(&self, id: MemoryId) -> bool {
        self.flags.get(&id).map(|flag| *flag).unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_absent_means_unsealed() {
        let sealing = Sealing::new();
        assert!(!sealing.is_sealed(MemoryId::new(502, 1)));
    }

    #[test]
    fn test_seal_unseal() {
        let sealing = Sealing::new();
        let id = MemoryId::new(502, 1);

        sealing.seal(id);
        assert!(sealing.is_sealed(id));

        sealing.unseal(id);
        assert!(!sealing.is_sealed(id));
    }
}
