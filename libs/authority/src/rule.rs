//! Access rules and per-memory policies.

use std::collections::HashSet;
use std::net::IpAddr;

use crate::error::{AuthorityError, Result};
use crate::ipmatch::IpMatcher;

/// One access-control rule: a source-IP matcher plus the set of function
/// codes it allows. Immutable once built.
#[derive(Debug, Clone)]
pub struct Rule {
    pub id: String,
    matcher: IpMatcher,
    allowed_function_codes: HashSet<u8>,
}

impl Rule {
    pub fn new(id: impl Into<String>, source_ips: &[String], allow_fc: &[u8]) -> Result<Self> {
        let id = id.into();
        if id.is_empty() {
            return Err(AuthorityError::RuleIdRequired);
        }

        let matcher = IpMatcher::new(source_ips)?;
        let allowed_function_codes = allow_fc.iter().copied().collect();

        Ok(Self {
            id,
            matcher,
            allowed_function_codes,
        })
    }

    /// Whether this rule's IP matcher contains the source address.
    pub fn matches(&self, source: IpAddr) -> bool {
        self.matcher.matches(source)
    }

    /// Whether this rule allows the function code.
    pub fn allows_function_code(&self, function_code: u8) -> bool {
        self.allowed_function_codes.contains(&function_code)
    }
}

/// Memory-scoped, ordered rule list. Evaluated top-down, first match wins,
/// default deny.
#[derive(Debug, Clone, Default)]
pub struct MemoryPolicy {
    pub rules: Vec<Rule>,
}

impl MemoryPolicy {
    pub fn new(rules: Vec<Rule>) -> Self {
        Self { rules }
    }
}
