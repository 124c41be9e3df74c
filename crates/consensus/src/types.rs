//! Core types for the consensus state machine

use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// A node's belief value.
///
/// Serializes to the wire format used by `/getState`: `0`, `1` or `"?"`.
/// `Unknown` marks "undecided, no value yet" and is part of the declared
/// value space even though the current flows never produce it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Value {
    Zero,
    One,
    Unknown,
}

impl Value {
    pub fn as_bit(&self) -> Option<u8> {
        match self {
            Value::Zero => Some(0),
            Value::One => Some(1),
            Value::Unknown => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Zero => write!(f, "0"),
            Value::One => write!(f, "1"),
            Value::Unknown => write!(f, "?"),
        }
    }
}

impl FromStr for Value {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "0" => Ok(Value::Zero),
            "1" => Ok(Value::One),
            "?" => Ok(Value::Unknown),
            other => Err(format!("invalid value '{other}', expected 0, 1 or ?")),
        }
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::Zero => serializer.serialize_u8(0),
            Value::One => serializer.serialize_u8(1),
            Value::Unknown => serializer.serialize_str("?"),
        }
    }
}

struct ValueVisitor;

impl Visitor<'_> for ValueVisitor {
    type Value = Value;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("0, 1 or \"?\"")
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Value, E> {
        match v {
            0 => Ok(Value::Zero),
            1 => Ok(Value::One),
            other => Err(E::custom(format!("invalid value {other}"))),
        }
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Value, E> {
        u64::try_from(v)
            .map_err(|_| E::custom(format!("invalid value {v}")))
            .and_then(|v| self.visit_u64(v))
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Value, E> {
        v.parse().map_err(E::custom)
    }
}

impl<'de> Deserialize<'de> for Value {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(ValueVisitor)
    }
}

/// Decision-relevant state, tagged by the node's capability.
///
/// Faulty nodes never hold a belief; the variants replace the nullable
/// `x`/`decided`/`k` triple so handlers match once instead of null-checking
/// three fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecisionState {
    /// The node is faulty and never participates.
    Faulty,
    /// A healthy participant.
    Active {
        /// Current belief value
        x: Value,
        /// Whether the value is final
        decided: bool,
        /// Round counter
        k: u32,
    },
}

impl DecisionState {
    pub fn new(faulty: bool, initial_value: Value) -> Self {
        if faulty {
            DecisionState::Faulty
        } else {
            DecisionState::Active {
                x: initial_value,
                decided: false,
                k: 0,
            }
        }
    }

    pub fn is_decided(&self) -> bool {
        matches!(self, DecisionState::Active { decided: true, .. })
    }
}

/// Full mutable state of one node
#[derive(Debug, Clone)]
pub struct NodeState {
    /// Sticky stop flag, set once by the stop operation
    pub killed: bool,
    pub decision: DecisionState,
}

/// Externally visible snapshot of a node's state.
///
/// Flattens [`DecisionState`] back to the four-field wire record: faulty
/// nodes report `null` for `x`, `decided` and `k`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateSnapshot {
    pub killed: bool,
    pub x: Option<Value>,
    pub decided: Option<bool>,
    pub k: Option<u32>,
}

impl From<&NodeState> for StateSnapshot {
    fn from(state: &NodeState) -> Self {
        match state.decision {
            DecisionState::Faulty => StateSnapshot {
                killed: state.killed,
                x: None,
                decided: None,
                k: None,
            },
            DecisionState::Active { x, decided, k } => StateSnapshot {
                killed: state.killed,
                x: Some(x),
                decided: Some(decided),
                k: Some(k),
            },
        }
    }
}

/// Health classification reported by the status operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Health {
    Live,
    Faulty,
}

/// Outcome of a successful start request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartOutcome {
    /// Consensus was scheduled by this call
    Started,
    /// A consensus task is already pending or the node already decided
    AlreadyStarted,
}

/// Immutable per-node configuration, fixed at construction
#[derive(Debug, Clone)]
pub struct NodeConfig {
    /// This node's identifier
    pub node_id: u32,
    /// Total number of nodes in the network (N)
    pub total_nodes: u32,
    /// Number of faulty nodes in the network (F)
    pub faulty_nodes: u32,
    /// This node's initial belief value
    pub initial_value: Value,
    /// True if this node is faulty
    pub faulty: bool,
}

impl NodeConfig {
    /// High-resilience holds when a strict majority of nodes is healthy
    pub fn high_resilience(&self) -> bool {
        2 * self.faulty_nodes < self.total_nodes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn value_serializes_to_wire_format() {
        assert_eq!(serde_json::to_string(&Value::Zero).unwrap(), "0");
        assert_eq!(serde_json::to_string(&Value::One).unwrap(), "1");
        assert_eq!(serde_json::to_string(&Value::Unknown).unwrap(), "\"?\"");
    }

    #[test]
    fn value_deserializes_from_wire_format() {
        assert_eq!(serde_json::from_str::<Value>("0").unwrap(), Value::Zero);
        assert_eq!(serde_json::from_str::<Value>("1").unwrap(), Value::One);
        assert_eq!(serde_json::from_str::<Value>("\"?\"").unwrap(), Value::Unknown);
        assert!(serde_json::from_str::<Value>("2").is_err());
    }

    #[test]
    fn faulty_snapshot_has_null_fields() {
        let state = NodeState {
            killed: false,
            decision: DecisionState::Faulty,
        };
        let json = serde_json::to_value(StateSnapshot::from(&state)).unwrap();
        assert_eq!(
            json,
            serde_json::json!({ "killed": false, "x": null, "decided": null, "k": null })
        );
    }

    #[test]
    fn active_snapshot_carries_all_fields() {
        let state = NodeState {
            killed: false,
            decision: DecisionState::Active {
                x: Value::One,
                decided: false,
                k: 0,
            },
        };
        let json = serde_json::to_value(StateSnapshot::from(&state)).unwrap();
        assert_eq!(
            json,
            serde_json::json!({ "killed": false, "x": 1, "decided": false, "k": 0 })
        );
    }

    #[test]
    fn resilience_threshold() {
        let mut config = NodeConfig {
            node_id: 0,
            total_nodes: 4,
            faulty_nodes: 1,
            initial_value: Value::One,
            faulty: false,
        };
        assert!(config.high_resilience());

        config.total_nodes = 3;
        config.faulty_nodes = 2;
        assert!(!config.high_resilience());

        // Exactly half faulty is already the stress regime
        config.total_nodes = 4;
        config.faulty_nodes = 2;
        assert!(!config.high_resilience());
    }
}
