use std::collections::HashMap;
use std::sync::Arc;

use tracing::debug;

use crate::error::{PolicyError, Result};
use crate::evaluator::{compile_policy, CompiledPolicy};
use crate::schema::{PolicyConfig, PolicyDef, PolicyKind};

/// Stores compiled policies and the table/column bindings attached to them.
///
/// The registry is populated during engine construction and read-only
/// afterwards; policies are shared via `Arc` so resolution is cheap.
///
/// Binding invariants: at most one row access policy per table and at most
/// one masking policy per column.  A second `bind` on an occupied target
/// fails with `Conflict` and never silently overwrites.
#[derive(Debug, Default)]
pub struct PolicyRegistry {
    policies: HashMap<String, Arc<CompiledPolicy>>,
    /// (table, column) -> mask policy name.
    mask_bindings: HashMap<(String, String), String>,
    /// table -> row-filter policy name.
    row_bindings: HashMap<String, String>,
}

/// Table and column identifiers compare case-insensitively.
fn ident(name: &str) -> String {
    name.to_ascii_lowercase()
}

impl PolicyRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a registry from a loaded [`PolicyConfig`], registering every
    /// policy and binding in declaration order.
    pub fn from_config(config: PolicyConfig) -> Result<Self> {
        let mut registry = Self::new();
        for def in config.policies {
            registry.register(def)?;
        }
        for binding in config.bindings {
            registry.bind(&binding.table, binding.column.as_deref(), &binding.policy)?;
        }
        Ok(registry)
    }

    /// Compile and store a policy definition.
    ///
    /// Fails with `DuplicateName` when the identifier is taken, plus any
    /// compilation error (`NoDefaultRule`, `KindMismatch`, `InvalidPattern`).
    pub fn register(&mut self, def: PolicyDef) -> Result<()> {
        if self.policies.contains_key(&def.name) {
            return Err(PolicyError::DuplicateName { name: def.name });
        }
        let compiled = compile_policy(def)?;
        debug!(policy = compiled.name(), kind = ?compiled.kind(), "policy registered");
        self.policies
            .insert(compiled.name().to_string(), Arc::new(compiled));
        Ok(())
    }

    /// Attach a registered policy to a table (row filter) or column (mask).
    ///
    /// The binding shape must agree with the policy kind: mask bindings name
    /// a column, row-filter bindings do not.
    pub fn bind(&mut self, table: &str, column: Option<&str>, policy: &str) -> Result<()> {
        let compiled = self
            .policies
            .get(policy)
            .ok_or_else(|| PolicyError::UnknownPolicy {
                name: policy.to_string(),
            })?;

        match (compiled.kind(), column) {
            (PolicyKind::Mask, Some(column)) => {
                let key = (ident(table), ident(column));
                if let Some(existing) = self.mask_bindings.get(&key) {
                    return Err(PolicyError::conflict(format!(
                        "column '{table}.{column}' already has masking policy '{existing}'"
                    )));
                }
                debug!(table, column, policy, "mask binding added");
                self.mask_bindings.insert(key, policy.to_string());
                Ok(())
            }
            (PolicyKind::RowFilter, None) => {
                let key = ident(table);
                if let Some(existing) = self.row_bindings.get(&key) {
                    return Err(PolicyError::conflict(format!(
                        "table '{table}' already has row access policy '{existing}'"
                    )));
                }
                debug!(table, policy, "row access binding added");
                self.row_bindings.insert(key, policy.to_string());
                Ok(())
            }
            (PolicyKind::Mask, None) => Err(PolicyError::kind_mismatch(
                policy,
                "mask binding requires a column",
            )),
            (PolicyKind::RowFilter, Some(_)) => Err(PolicyError::kind_mismatch(
                policy,
                "row access binding must not name a column",
            )),
        }
    }

    /// Look up a policy by name.
    pub fn get(&self, name: &str) -> Option<Arc<CompiledPolicy>> {
        self.policies.get(name).cloned()
    }

    /// Resolve the mask policy bound to `table.column`, if any.
    pub fn resolve_mask(&self, table: &str, column: &str) -> Option<Arc<CompiledPolicy>> {
        let name = self.mask_bindings.get(&(ident(table), ident(column)))?;
        self.get(name)
    }

    /// Resolve the row access policy bound to `table`, if any.
    pub fn resolve_row_filter(&self, table: &str) -> Option<Arc<CompiledPolicy>> {
        let name = self.row_bindings.get(&ident(table))?;
        self.get(name)
    }

    pub fn policy_count(&self) -> usize {
        self.policies.len()
    }

    pub fn binding_count(&self) -> usize {
        self.mask_bindings.len() + self.row_bindings.len()
    }
}
