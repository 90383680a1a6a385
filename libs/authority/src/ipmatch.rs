//! Source-IP matching against configured prefixes.

use std::net::IpAddr;
use std::str::FromStr;

use ipnetwork::IpNetwork;

use crate::error::{AuthorityError, Result};

/// Matches a source address against an allow-list of prefixes.
///
/// Entries may be bare addresses or CIDR strings. Bare addresses are
/// normalized to host-only prefixes (/32 for IPv4, /128 for IPv6); CIDR
/// entries keep their declared prefix length. Matching is containment over
/// the configured prefixes, order-independent.
#[derive(Debug, Clone, Default)]
pub struct IpMatcher {
    prefixes: Vec<IpNetwork>,
}

impl IpMatcher {
    pub fn new(entries: &[String]) -> Result<Self> {
        let mut prefixes = Vec::with_capacity(entries.len());

        for raw in entries {
            let s = raw.trim();
            if s.is_empty() {
                continue;
            }

            if s.contains('/') {
                let net = IpNetwork::from_str(s)
                    .map_err(|_| AuthorityError::InvalidSourceIp(s.to_string()))?;
                prefixes.push(net);
                continue;
            }

            let addr = IpAddr::from_str(s)
                .map_err(|_| AuthorityError::InvalidSourceIp(s.to_string()))?;
            // Host-only prefix; the full-length prefix cannot fail.
            let net = IpNetwork::new(addr, if addr.is_ipv4() { 32 } else { 128 })
                .map_err(|_| AuthorityError::InvalidSourceIp(s.to_string()))?;
            prefixes.push(net);
        }

        Ok(Self { prefixes })
    }

    /// Whether any configured prefix contains `addr`.
    pub fn matches(&self, addr: IpAddr) -> bool {
        self.prefixes.iter().any(|net| net.contains(addr))
    }
}
