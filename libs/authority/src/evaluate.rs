//! The authority: sealing first, then ordered access rules.

use std::collections::HashMap;
use std::net::IpAddr;

use memcore::MemoryId;
use parking_lot::RwLock;

use crate::decision::Decision;
use crate::rule::MemoryPolicy;
use crate::sealing::Sealing;
use crate::{EXCEPTION_DEVICE_BUSY, EXCEPTION_ILLEGAL_FUNCTION};

/// The minimum information needed to decide access. No protocol parsing,
/// no I/O, no memory operations happen at this layer.
#[derive(Debug, Clone, Copy)]
pub struct AccessRequest {
    pub memory_id: MemoryId,
    pub source: IpAddr,
    pub function_code: u8,
}

/// Evaluates state sealing plus memory-scoped access rules.
///
/// Policies are keyed by [`MemoryId`], set once at startup via bulk replace;
/// the sealing map is the only post-startup mutable surface.
#[derive(Debug, Default)]
pub struct Authority {
    sealing: Sealing,
    policies: RwLock<HashMap<MemoryId, MemoryPolicy>>,
}

impl Authority {
    pub fn new() -> Self {
        Self {
            sealing: Sealing::new(),
            policies: RwLock::new(HashMap::new()),
        }
    }

    /// The sealing surface, for the administrative collaborator.
    pub fn sealing(&self) -> &Sealing {
        &self.sealing
    }

    /// Replace the policy for one memory. Intended for startup config load.
    pub fn set_policy(&self, id: MemoryId, policy: MemoryPolicy) {
        self.policies.write().insert(id, policy);
    }

    /// Replace all policies at once. Intended for startup config load.
    pub fn replace_policies(&self, policies: HashMap<MemoryId, MemoryPolicy>) {
        *self.policies.write() = policies;
    }

    /// Evaluate the locked order:
    /// 1) sealing check → Device Busy (0x06)
    /// 2) rules top-down → first IP match decides terminally
    /// 3) default deny on no policy / no match
    pub fn evaluate(&self, req: AccessRequest) -> Decision {
        if self.sealing.is_sealed(req.memory_id) {
            return Decision::deny(EXCEPTION_DEVICE_BUSY, "state sealing enabled");
        }

        let policies = self.policies.read();
        let policy = match policies.get(&req.memory_id) {
            Some(p) if !p.rules.is_empty() => p,
            _ => {
                return Decision::deny(
                    EXCEPTION_ILLEGAL_FUNCTION,
                    "no access rules (default deny)",
                );
            }
        };

        for rule in &policy.rules {
            if !rule.matches(req.source) {
                continue;
            }

            // First match wins.
            if rule.allows_function_code(req.function_code) {
                return Decision::allow(format!("matched rule: {}", rule.id));
            }

            return Decision::deny(
                EXCEPTION_ILLEGAL_FUNCTION,
                format!("rule matched but function code not allowed: {}", rule.id),
            );
        }

        Decision::deny(EXCEPTION_ILLEGAL_FUNCTION, "no rule matched (default deny)")
    }
}
