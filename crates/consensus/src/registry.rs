//! Initial-value registry shared across a cluster
//!
//! Healthy nodes register their initial value once at construction; the
//! majority computation reads whatever is registered at decision time.
//! Entries are never removed or overwritten.

use crate::types::Value;
use dashmap::DashMap;

/// Write-once-per-node, read-many map of healthy nodes' initial values.
///
/// Built by the launcher and handed to every node as an `Arc`, so the
/// coupling between node instances is explicit rather than ambient.
#[derive(Debug, Default)]
pub struct ValueRegistry {
    values: DashMap<u32, Value>,
}

impl ValueRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a node's initial value. The first write wins; later writes
    /// for the same id are ignored.
    pub fn register(&self, node_id: u32, value: Value) {
        self.values.entry(node_id).or_insert(value);
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Majority of the currently registered values, ties broken in favor of 1.
    ///
    /// `Unknown` entries count for neither side.
    pub fn majority(&self) -> Value {
        let mut ones = 0usize;
        let mut zeros = 0usize;
        for entry in self.values.iter() {
            match *entry.value() {
                Value::One => ones += 1,
                Value::Zero => zeros += 1,
                Value::Unknown => {}
            }
        }
        if ones >= zeros {
            Value::One
        } else {
            Value::Zero
        }
    }
}
