//! Consensus node - owns one participant's state and reacts to the five
//! lifecycle triggers
//!
//! Behavior forks once at construction on the faulty flag and again at start
//! time on the fault ratio: a strict healthy majority gets a one-shot
//! deferred decision, anything else loops through rounds that never converge.

use crate::error::ConsensusError;
use crate::registry::ValueRegistry;
use crate::types::{
    DecisionState, Health, NodeConfig, NodeState, StartOutcome, StateSnapshot,
};
use crate::{DECISION_DELAY_MS, MAX_ROUND, ROUND_INTERVAL_MS};
use parking_lot::{Mutex, RwLock};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

/// One participant in the consensus network
pub struct ConsensusNode {
    /// Immutable for the node's lifetime
    config: NodeConfig,
    /// Initial values of all healthy nodes, shared across the cluster
    registry: Arc<ValueRegistry>,
    state: RwLock<NodeState>,
    /// Outstanding consensus task, if any. Covers both the one-shot decision
    /// and the repeating round loop; stop aborts whichever is pending.
    consensus_task: Mutex<Option<JoinHandle<()>>>,
}

impl ConsensusNode {
    /// Create a node and, if healthy, register its initial value with the
    /// cluster registry.
    pub fn new(config: NodeConfig, registry: Arc<ValueRegistry>) -> Arc<Self> {
        if !config.faulty {
            registry.register(config.node_id, config.initial_value);
        }
        let state = NodeState {
            killed: false,
            decision: DecisionState::new(config.faulty, config.initial_value),
        };
        Arc::new(Self {
            config,
            registry,
            state: RwLock::new(state),
            consensus_task: Mutex::new(None),
        })
    }

    pub fn node_id(&self) -> u32 {
        self.config.node_id
    }

    pub fn config(&self) -> &NodeConfig {
        &self.config
    }

    /// Health check: faulty nodes always report faulty
    pub fn health(&self) -> Health {
        if self.config.faulty {
            Health::Faulty
        } else {
            Health::Live
        }
    }

    /// Record an inbound message. Intentionally inert: the protocol does not
    /// define how received messages influence belief.
    pub fn receive_message(&self, payload: &serde_json::Value) {
        tracing::info!(node_id = self.config.node_id, %payload, "received message");
    }

    /// Snapshot of the current state, in the four-field wire shape
    pub fn snapshot(&self) -> StateSnapshot {
        StateSnapshot::from(&*self.state.read())
    }

    /// Start the consensus algorithm.
    ///
    /// Rejects faulty nodes. Idempotent while a consensus task is pending or
    /// once the node has decided. Returns immediately; the scheduled work
    /// runs asynchronously against this node's state.
    pub fn start(self: &Arc<Self>) -> Result<StartOutcome, ConsensusError> {
        if self.config.faulty {
            return Err(ConsensusError::FaultyNode);
        }

        let mut task = self.consensus_task.lock();
        let task_active = task.as_ref().is_some_and(|handle| !handle.is_finished());
        if task_active || self.state.read().decision.is_decided() {
            return Ok(StartOutcome::AlreadyStarted);
        }

        let handle = if self.config.high_resilience() {
            self.spawn_decision()
        } else {
            // Rounds count from 1 once consensus begins
            if let DecisionState::Active { k, .. } = &mut self.state.write().decision {
                if *k == 0 {
                    *k = 1;
                }
            }
            self.spawn_rounds()
        };
        *task = Some(handle);

        tracing::info!(
            node_id = self.config.node_id,
            high_resilience = self.config.high_resilience(),
            "consensus started"
        );
        Ok(StartOutcome::Started)
    }

    /// Stop the node: abort any outstanding consensus task and set the
    /// sticky killed flag. Safe to call repeatedly, and on faulty nodes.
    pub fn stop(&self) {
        if let Some(handle) = self.consensus_task.lock().take() {
            handle.abort();
        }
        self.state.write().killed = true;
        tracing::info!(node_id = self.config.node_id, "consensus stopped");
    }

    /// High-resilience branch: a single deferred decision. After the delay,
    /// adopt the majority of all registered initial values (tie goes to 1),
    /// mark decided and settle the round counter at 2.
    fn spawn_decision(self: &Arc<Self>) -> JoinHandle<()> {
        let node = Arc::clone(self);
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(DECISION_DELAY_MS)).await;
            let majority = node.registry.majority();
            {
                let mut state = node.state.write();
                if let DecisionState::Active { x, decided, k } = &mut state.decision {
                    *x = majority;
                    *decided = true;
                    *k = 2;
                }
            }
            tracing::info!(node_id = node.config.node_id, value = %majority, "node decided");
        })
    }

    /// Stress branch: increment the round counter every period until it
    /// exceeds [`MAX_ROUND`], then terminate without ever deciding.
    fn spawn_rounds(self: &Arc<Self>) -> JoinHandle<()> {
        let node = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(Duration::from_millis(ROUND_INTERVAL_MS));
            // interval's first tick completes immediately; consume it so
            // rounds advance one full period apart
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let round = {
                    let mut state = node.state.write();
                    match &mut state.decision {
                        DecisionState::Active { k, .. } => {
                            *k += 1;
                            *k
                        }
                        DecisionState::Faulty => return,
                    }
                };
                tracing::debug!(node_id = node.config.node_id, round, "consensus round");
                if round > MAX_ROUND {
                    break;
                }
            }
            node.consensus_task.lock().take();
        })
    }
}
