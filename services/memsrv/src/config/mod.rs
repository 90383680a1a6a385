//! Configuration management for the memory appliance.
//!
//! YAML-based configuration loaded through figment (file plus `MEMSRV_`
//! environment overrides), followed by structural validation and translation
//! into the runtime memory store and authority policies.
//!
//! Memory identity is always the numeric `(port, unit_id)` pair. The YAML
//! map keys under `memory.memories` are human/debug context only and are
//! never used as identity. Memories may also be declared nested under a
//! listener, in which case the port derives from the listener's listen
//! address.

pub mod build;

pub use build::{build_authority_policies, build_memory_store};

use std::collections::{BTreeMap, HashSet};
use std::path::Path;

use figment::providers::{Env, Format, Yaml};
use figment::Figment;
use serde::{Deserialize, Serialize};

use crate::error::{MemSrvError, Result};

/// Root configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// TCP ingress gates
    #[serde(default)]
    pub listeners: Vec<ListenerConfig>,

    /// Memory declarations
    #[serde(default)]
    pub memory: MemoryConfig,

    /// Logging configuration
    #[serde(default)]
    pub log: LogConfig,
}

/// One TCP ingress gate: owns a listener and protocol admission only.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ListenerConfig {
    pub id: String,
    pub listen: String,
    #[serde(default)]
    pub protocols: ListenerProtocols,
    /// Memories scoped to this listener; their port derives from `listen`.
    #[serde(default)]
    pub memory: Vec<MemoryDefinition>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ListenerProtocols {
    #[serde(default)]
    pub modbus: bool,
    #[serde(default)]
    pub raw_ingest: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MemoryConfig {
    #[serde(default)]
    pub memories: BTreeMap<String, MemoryDefinition>,
}

/// One memory declaration. A zero-count area is disabled.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MemoryDefinition {
    #[serde(default)]
    pub port: u16,
    pub unit_id: u16,

    #[serde(default)]
    pub coils: AreaConfig,
    #[serde(default)]
    pub discrete_inputs: AreaConfig,
    #[serde(default)]
    pub holding_registers: AreaConfig,
    #[serde(default)]
    pub input_registers: AreaConfig,

    /// Optional state-sealing flag location (presence = enabled)
    #[serde(default)]
    pub state_sealing: Option<StateSealingConfig>,

    /// Optional memory-scoped access policy
    #[serde(default)]
    pub policy: Option<PolicyConfig>,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct AreaConfig {
    #[serde(default)]
    pub start: u16,
    #[serde(default)]
    pub count: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateSealingConfig {
    /// Must be `coil`; the flag aliases an addressable coil bit.
    pub area: String,
    pub address: u16,
}

/// Rules are evaluated top-down; first match wins; default deny.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PolicyConfig {
    #[serde(default)]
    pub rules: Vec<PolicyRuleConfig>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PolicyRuleConfig {
    pub id: String,
    /// Bare IPs (treated as /32 or /128) or CIDR strings.
    #[serde(default)]
    pub source_ip: Vec<String>,
    /// Allowed Modbus function codes.
    #[serde(default)]
    pub allow_fc: Vec<u8>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Config {
    /// Load configuration from a YAML file, with `MEMSRV_` environment
    /// variables taking precedence (nested keys split on `__`).
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        Figment::new()
            .merge(Yaml::file(path.as_ref()))
            .merge(Env::prefixed("MEMSRV_").split("__"))
            .extract()
            .map_err(|e| MemSrvError::ConfigError(format!("load config: {e}")))
    }

    /// Structural validation: presence, bounds, and consistency only.
    pub fn validate(&self) -> Result<()> {
        if self.listeners.is_empty() {
            return Err(config_err("listeners: must define at least one ingress gate"));
        }

        let mut seen_ids = HashSet::new();
        for (i, gate) in self.listeners.iter().enumerate() {
            if gate.id.is_empty() {
                return Err(config_err(format!("listeners[{i}]: id is required")));
            }
            if !seen_ids.insert(gate.id.as_str()) {
                return Err(config_err(format!(
                    "listeners[{i}]: duplicate id {:?}",
                    gate.id
                )));
            }
            if gate.listen.is_empty() {
                return Err(config_err(format!("listeners[{i}]: listen is required")));
            }
            if !gate.protocols.modbus && !gate.protocols.raw_ingest {
                return Err(config_err(format!(
                    "listeners[{i}]: at least one protocol must be enabled (modbus or raw_ingest)"
                )));
            }

            for (mi, def) in gate.memory.iter().enumerate() {
                let ctx = format!("listeners[{i}] ({}).memory[{mi}]", gate.id);
                if def.port != 0 {
                    return Err(config_err(format!(
                        "{ctx}: port is derived from the listener and must be omitted"
                    )));
                }
                validate_memory_def(&ctx, def)?;
            }
        }

        let nested: usize = self.listeners.iter().map(|g| g.memory.len()).sum();
        if self.memory.memories.is_empty() && nested == 0 {
            return Err(config_err("memory: must define at least one memory"));
        }

        for (key, def) in &self.memory.memories {
            let ctx = format!("memory[{key}]");
            if def.port == 0 {
                return Err(config_err(format!("{ctx}: port must be > 0")));
            }
            validate_memory_def(&ctx, def)?;
        }

        Ok(())
    }
}

fn config_err(msg: impl Into<String>) -> MemSrvError {
    MemSrvError::ConfigError(msg.into())
}

fn validate_memory_def(ctx: &str, def: &MemoryDefinition) -> Result<()> {
    if def.unit_id == 0 {
        return Err(config_err(format!("{ctx}: unit_id must be > 0")));
    }

    validate_area(ctx, "coils", def.coils)?;
    validate_area(ctx, "discrete_inputs", def.discrete_inputs)?;
    validate_area(ctx, "holding_registers", def.holding_registers)?;
    validate_area(ctx, "input_registers", def.input_registers)?;

    if let Some(sealing) = &def.state_sealing {
        let area = sealing.area.trim().to_ascii_lowercase();
        if area != "coil" {
            return Err(config_err(format!(
                "{ctx}: state_sealing.area must be 'coil'"
            )));
        }
        if def.coils.count == 0 {
            return Err(config_err(format!(
                "{ctx}: state_sealing requires coils to be allocated"
            )));
        }

        let start = u32::from(def.coils.start);
        let end = start + u32::from(def.coils.count);
        let addr = u32::from(sealing.address);
        if addr < start || addr >= end {
            return Err(config_err(format!(
                "{ctx}: state_sealing.address ({}) out of bounds for coils [{}..{})",
                sealing.address, def.coils.start, end
            )));
        }
    }

    if let Some(policy) = &def.policy {
        for (ri, rule) in policy.rules.iter().enumerate() {
            if rule.id.is_empty() {
                return Err(config_err(format!(
                    "{ctx}.policy.rules[{ri}]: id is required"
                )));
            }
        }
    }

    Ok(())
}

fn validate_area(ctx: &str, name: &str, area: AreaConfig) -> Result<()> {
    if area.count == 0 {
        // zero-sized areas are allowed and treated as disabled
        return Ok(());
    }

    let end = u32::from(area.start) + u32::from(area.count);
    if end > 0x1_0000 {
        return Err(config_err(format!(
            "{ctx}.{name}: start({})+count({}) exceeds 16-bit address space",
            area.start, area.count
        )));
    }

    Ok(())
}
