//! Consensus errors

use thiserror::Error;

/// Errors surfaced by consensus operations
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsensusError {
    #[error("Cannot start consensus on a faulty node")]
    FaultyNode,
}
