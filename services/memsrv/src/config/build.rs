//! Translation of validated configuration into runtime objects.
//!
//! Memory identity is always the numeric `(port, unit_id)` pair — for
//! top-level declarations the port comes from the definition, for
//! listener-nested declarations it derives from the listener's listen
//! address. Both the store and the policy map reject duplicate identities
//! at build time.

use std::collections::HashMap;
use std::sync::Arc;

use authority::{MemoryPolicy, Rule};
use memcore::{Area, AreaLayout, Memory, MemoryId, MemoryLayouts, StateSealingDef, Store};

use super::{AreaConfig, Config, MemoryDefinition};
use crate::error::{MemSrvError, Result};

fn layout(area: AreaConfig) -> Option<AreaLayout> {
    if area.count == 0 {
        return None;
    }
    Some(AreaLayout::new(area.start, area.count))
}

fn build_memory(ctx: &str, def: &MemoryDefinition) -> Result<Memory> {
    let mut memory = Memory::new(MemoryLayouts {
        coils: layout(def.coils),
        discrete_inputs: layout(def.discrete_inputs),
        holding_registers: layout(def.holding_registers),
        input_registers: layout(def.input_registers),
    })
    .map_err(|e| MemSrvError::ConfigError(format!("{ctx}: create failed: {e}")))?;

    if let Some(sealing) = &def.state_sealing {
        memory.set_state_sealing(StateSealingDef {
            area: Area::Coils,
            address: sealing.address,
        });
    }

    Ok(memory)
}

/// Walk every memory definition with its resolved port and context label.
fn for_each_definition<F>(config: &Config, mut visit: F) -> Result<()>
where
    F: FnMut(&str, u16, &MemoryDefinition) -> Result<()>,
{
    for (key, def) in &config.memory.memories {
        visit(&format!("memory[{key}]"), def.port, def)?;
    }

    for (li, gate) in config.listeners.iter().enumerate() {
        if gate.memory.is_empty() {
            continue;
        }

        let port = listen_port(&gate.listen).map_err(|e| {
            MemSrvError::ConfigError(format!(
                "listeners[{li}] ({}) listen={:?}: {e}",
                gate.id, gate.listen
            ))
        })?;

        for (mi, def) in gate.memory.iter().enumerate() {
            let ctx = format!("listeners[{li}] ({}).memory[{mi}]", gate.id);
            visit(&ctx, port, def)?;
        }
    }

    Ok(())
}

/// Build the memory store from configuration. Insert-once: a duplicate
/// `(port, unit_id)` identity is a startup error.
pub fn build_memory_store(config: &Config) -> Result<Store> {
    let store = Store::new();

    for_each_definition(config, |ctx, port, def| {
        let memory = build_memory(ctx, def)?;
        let id = MemoryId::new(port, def.unit_id);

        store.add(id, Arc::new(memory)).map_err(|e| {
            MemSrvError::ConfigError(format!("{ctx} ({id}): register failed: {e}"))
        })
    })?;

    Ok(store)
}

/// Build the authority policy map from configuration, keyed by identity.
pub fn build_authority_policies(config: &Config) -> Result<HashMap<MemoryId, MemoryPolicy>> {
    let mut policies = HashMap::new();

    for_each_definition(config, |ctx, port, def| {
        let Some(policy_cfg) = &def.policy else {
            return Ok(());
        };

        let id = MemoryId::new(port, def.unit_id);
        if policies.contains_key(&id) {
            return Err(MemSrvError::ConfigError(format!(
                "{ctx}: duplicate policy for memory ({id})"
            )));
        }

        let mut rules = Vec::with_capacity(policy_cfg.rules.len());
        for (ri, rule_cfg) in policy_cfg.rules.iter().enumerate() {
            let rule = Rule::new(&rule_cfg.id, &rule_cfg.source_ip, &rule_cfg.allow_fc)
                .map_err(|e| {
                    MemSrvError::ConfigError(format!(
                        "{ctx}.policy.rules[{ri}] ({}): {e}",
                        rule_cfg.id
                    ))
                })?;
            rules.push(rule);
        }

        policies.insert(id, MemoryPolicy::new(rules));
        Ok(())
    })?;

    Ok(policies)
}

/// Extract the numeric port from a listen address.
///
/// Accepts forms like `":502"`, `"0.0.0.0:502"`, `"127.0.0.1:1502"` and
/// `"[::]:502"`.
pub fn listen_port(listen: &str) -> Result<u16> {
    let (_, port_str) = listen
        .rsplit_once(':')
        .ok_or_else(|| MemSrvError::ConfigError("invalid listen address (expected host:port)".into()))?;

    let port: u16 = port_str
        .parse()
        .map_err(|_| MemSrvError::ConfigError(format!("invalid port {port_str:?}")))?;

    if port == 0 {
        return Err(MemSrvError::ConfigError("port out of range: 0".into()));
    }

    Ok(port)
}
