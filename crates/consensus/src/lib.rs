//! Quorum Consensus - per-node binary agreement state machine
//!
//! Each node in the network holds a belief value `x`, a decision flag and a
//! round counter `k`. Once consensus is started the evolution of that state
//! depends on the fault ratio F/N:
//! - `2F < N`: one deferred majority decision over the registered initial values
//! - `2F >= N`: repeating rounds that never converge

pub mod error;
pub mod node;
pub mod registry;
pub mod types;

pub use error::ConsensusError;
pub use node::ConsensusNode;
pub use registry::ValueRegistry;
pub use types::{DecisionState, Health, NodeConfig, StartOutcome, StateSnapshot, Value};

/// Delay before the one-shot majority decision fires (milliseconds)
pub const DECISION_DELAY_MS: u64 = 100;

/// Period between round increments under high fault load (milliseconds)
pub const ROUND_INTERVAL_MS: u64 = 200;

/// Round counter threshold past which the round loop terminates
pub const MAX_ROUND: u32 = 10;
