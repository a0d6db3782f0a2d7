//! Keybinding registry
//!
//! Stores key→handler bindings per scope and answers lookups for the
//! dispatcher and legend. Registration order is preserved for `list_for_scope`
//! so legends and the cheatsheet render in a stable order.

use std::panic::{AssertUnwindSafe, catch_unwind};

use ahash::HashMap;
use log::warn;

use super::binding::{Binding, DisabledReason, Scope};
use super::error::ConfigError;
use super::keys::Key;

#[derive(Default)]
pub struct KeybindingRegistry {
    bindings: Vec<Binding>,
    index: HashMap<(Scope, Key), usize>,
}

impl KeybindingRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a binding.
    ///
    /// A second global binding on an occupied (key, modifier) is a
    /// configuration defect and fails. A re-registration within the same view
    /// scope replaces the earlier binding in place, so (key, modifier) stays
    /// unique per scope and lookups see the last registration.
    pub fn register(&mut self, binding: Binding) -> Result<(), ConfigError> {
        let slot = (binding.scope.clone(), binding.key);
        if let Some(&i) = self.index.get(&slot) {
            if binding.scope == Scope::Global {
                return Err(ConfigError::DuplicateGlobalBinding {
                    key: binding.key.label(),
                });
            }
            self.bindings[i] = binding;
            return Ok(());
        }

        self.index.insert(slot, self.bindings.len());
        self.bindings.push(binding);
        Ok(())
    }

    /// Look up the binding for (scope, key, modifier). Alternate keys match
    /// too; the last registration wins.
    pub fn lookup(&self, scope: &Scope, key: Key) -> Option<&Binding> {
        if let Some(&i) = self.index.get(&(scope.clone(), key)) {
            return Some(&self.bindings[i]);
        }
        self.bindings
            .iter()
            .rev()
            .find(|b| b.scope == *scope && b.matches(key))
    }

    /// All bindings for a scope, in registration order.
    pub fn list_for_scope(&self, scope: &Scope) -> Vec<&Binding> {
        self.bindings.iter().filter(|b| b.scope == *scope).collect()
    }

    /// Evaluate a binding's disabled-reason provider.
    ///
    /// A provider that fails unexpectedly is treated as "enabled": refusing
    /// every keypress because of a buggy provider would be worse than letting
    /// the action run and fail visibly.
    pub fn compute_disabled_reason(&self, binding: &Binding) -> Option<DisabledReason> {
        let provider = binding.disabled_fn.as_ref()?;
        match catch_unwind(AssertUnwindSafe(|| provider())) {
            Ok(reason) => reason,
            Err(_) => {
                warn!(
                    "disabled-reason provider for '{}' panicked; treating as enabled",
                    binding.key.label()
                );
                None
            }
        }
    }
}
