use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Classification of a bus for power flow.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BusRole {
    /// Reference bus: fixed magnitude and angle.
    Slack,
    /// Voltage-controlled bus: fixed magnitude and real power.
    PV,
    /// Load bus: fixed real and reactive power.
    #[default]
    PQ,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bus {
    pub name: String,
    /// Base line-to-line voltage in kV.
    pub v_base_kv: f64,
    pub role: BusRole,
}

/// Maps bus names to their canonical indices.
///
/// Indices are dense and follow declaration order; every matrix and state vector in the crate
/// is laid out in this order.
#[derive(Debug, Clone, Default)]
pub struct NodeLookup {
    /// index → name
    pub forward: Vec<String>,
    /// name → index
    pub reverse: HashMap<String, usize>,
}

impl NodeLookup {
    /// Registers `name` and returns its index, or `None` if it is already known.
    pub fn insert(&mut self, name: &str) -> Option<usize> {
        if self.reverse.contains_key(name) {
            return None;
        }
        let idx = self.forward.len();
        self.forward.push(name.to_owned());
        self.reverse.insert(name.to_owned(), idx);
        Some(idx)
    }

    #[inline(always)]
    pub fn index(&self, name: &str) -> Option<usize> {
        self.reverse.get(name).copied()
    }

    #[inline(always)]
    pub fn name(&self, idx: usize) -> Option<&str> {
        self.forward.get(idx).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.forward.len()
    }

    pub fn is_empty(&self) -> bool {
        self.forward.is_empty()
    }
}
