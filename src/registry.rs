//! Variable registry (spec §3 "Variable registry"): an append-only mapping
//! from a variable name to a dimension id, used both for program variables
//! discovered during CFG construction and for driver-supplied constants.

use crate::domain::Interval;
use std::collections::HashMap;

/// A value a registry entry may carry. Program variables are usually
/// `Unknown` until the collecting-semantics engine assigns them a bound at
/// some CFG node; driver-supplied constants carry a fixed `Interval` from the
/// moment they are registered.
#[derive(Debug, Clone, PartialEq)]
pub enum RegisteredValue {
    Interval(Interval),
    Unknown,
}

#[derive(Debug, Clone)]
pub struct VariableRecord {
    pub id: u32,
    pub name: String,
    pub state_variable: bool,
    pub value: RegisteredValue,
}

/// Append-only name → dimension id table (spec §3, §4.3 "Variable
/// initialization"). Registering an already-known name returns its existing
/// id rather than allocating a new one — the registry grows monotonically
/// but is otherwise idempotent, matching the teacher's `var_names` id
/// allocator (`cfg_builder.rs`/`types.rs`).
#[derive(Debug, Clone, Default)]
pub struct VariableRegistry {
    by_name: HashMap<String, u32>,
    records: Vec<VariableRecord>,
}

impl VariableRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `name` if unseen, returning its dimension id either way.
    pub fn register(&mut self, name: &str, state_variable: bool) -> u32 {
        if let Some(&id) = self.by_name.get(name) {
            return id;
        }
        let id = self.records.len() as u32;
        self.by_name.insert(name.to_string(), id);
        self.records.push(VariableRecord {
            id,
            name: name.to_string(),
            state_variable,
            value: RegisteredValue::Unknown,
        });
        id
    }

    /// Registers a driver-supplied constant with its fixed bound (spec §4.3
    /// "the top element constrained only by driver-supplied constants").
    pub fn register_constant(&mut self, name: &str, value: Interval) -> u32 {
        let id = self.register(name, false);
        self.records[id as usize].value = RegisteredValue::Interval(value);
        id
    }

    pub fn id_of(&self, name: &str) -> Option<u32> {
        self.by_name.get(name).copied()
    }

    pub fn get(&self, name: &str) -> Option<&VariableRecord> {
        self.id_of(name).and_then(|id| self.records.get(id as usize))
    }

    pub fn get_by_id(&self, id: u32) -> Option<&VariableRecord> {
        self.records.get(id as usize)
    }

    pub fn is_state_variable(&self, id: u32) -> bool {
        self.get_by_id(id).is_some_and(|r| r.state_variable)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Names in registration order, the order spec §6's `analysis.txt` dump
    /// lists `dict_keys(...)` in.
    pub fn names_in_order(&self) -> Vec<&str> {
        self.records.iter().map(|r| r.name.as_str()).collect()
    }

    /// Every constant the registry was seeded with, in registration order.
    pub fn constants(&self) -> impl Iterator<Item = (u32, Interval)> + '_ {
        self.records.iter().filter_map(|r| match r.value {
            RegisteredValue::Interval(iv) => Some((r.id, iv)),
            RegisteredValue::Unknown => None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registration_is_append_only_and_idempotent() {
        let mut reg = VariableRegistry::new();
        let a = reg.register("a", false);
        let b = reg.register("b", true);
        let a_again = reg.register("a", false);
        assert_eq!(a, a_again);
        assert_ne!(a, b);
        assert_eq!(reg.len(), 2);
    }

    #[test]
    fn constants_carry_their_fixed_interval() {
        let mut reg = VariableRegistry::new();
        reg.register_constant("amount", Interval::point(40));
        let rec = reg.get("amount").unwrap();
        assert_eq!(rec.value, RegisteredValue::Interval(Interval::point(40)));
    }

    #[test]
    fn state_variable_flag_is_recorded_at_first_registration() {
        let mut reg = VariableRegistry::new();
        let id = reg.register("balance", true);
        assert!(reg.is_state_variable(id));
    }
}
