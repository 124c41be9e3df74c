//! Cluster configuration and readiness tracking

use anyhow::{ensure, Result};
use quorum_consensus::{NodeConfig, Value};
use quorum_http::BASE_NODE_PORT;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

/// Cluster configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClusterConfig {
    /// Total number of nodes (N)
    pub nodes: u32,
    /// Number of faulty nodes (F)
    pub faulty: u32,
    /// Node `i` listens on `base_port + i`
    pub base_port: u16,
    /// Which node ids are faulty; empty means the first F ids
    pub faulty_ids: Vec<u32>,
    /// Initial values by node id; missing entries are drawn at random
    pub values: Vec<Value>,
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            nodes: 4,
            faulty: 1,
            base_port: BASE_NODE_PORT,
            faulty_ids: Vec::new(),
            values: Vec::new(),
        }
    }
}

/// Expand a cluster config into one [`NodeConfig`] per node
pub fn node_plans(config: &ClusterConfig) -> Result<Vec<NodeConfig>> {
    ensure!(config.nodes > 0, "cluster needs at least one node");
    ensure!(
        config.faulty <= config.nodes,
        "faulty count {} exceeds node count {}",
        config.faulty,
        config.nodes
    );

    let faulty_ids: HashSet<u32> = if config.faulty_ids.is_empty() {
        (0..config.faulty).collect()
    } else {
        config.faulty_ids.iter().copied().collect()
    };
    ensure!(
        faulty_ids.len() == config.faulty as usize,
        "expected {} distinct faulty ids, got {}",
        config.faulty,
        faulty_ids.len()
    );
    if let Some(id) = faulty_ids.iter().find(|id| **id >= config.nodes) {
        anyhow::bail!("faulty id {} out of range (N = {})", id, config.nodes);
    }
    ensure!(
        config.values.len() <= config.nodes as usize,
        "{} initial values for {} nodes",
        config.values.len(),
        config.nodes
    );

    let mut rng = rand::thread_rng();
    let plans = (0..config.nodes)
        .map(|node_id| NodeConfig {
            node_id,
            total_nodes: config.nodes,
            faulty_nodes: config.faulty,
            initial_value: config.values.get(node_id as usize).copied().unwrap_or_else(|| {
                if rng.gen_bool(0.5) {
                    Value::One
                } else {
                    Value::Zero
                }
            }),
            faulty: faulty_ids.contains(&node_id),
        })
        .collect();
    Ok(plans)
}

/// Tracks which nodes have bound their listening socket.
///
/// Each server announces readiness once, post-bind; the cluster-wide
/// predicate flips when every slot has been marked.
#[derive(Debug)]
pub struct ReadyTracker {
    slots: Vec<AtomicBool>,
    ready_count: AtomicUsize,
}

impl ReadyTracker {
    pub fn new(len: usize) -> Self {
        Self {
            slots: (0..len).map(|_| AtomicBool::new(false)).collect(),
            ready_count: AtomicUsize::new(0),
        }
    }

    /// Mark a node ready. Returns true if this call completed the set.
    pub fn mark_ready(&self, node_id: u32) -> bool {
        let slot = &self.slots[node_id as usize];
        if slot.swap(true, Ordering::SeqCst) {
            // Already marked; readiness is announced once per node
            return false;
        }
        self.ready_count.fetch_add(1, Ordering::SeqCst) + 1 == self.slots.len()
    }

    /// Are all nodes in the network ready?
    pub fn all_ready(&self) -> bool {
        self.ready_count.load(Ordering::SeqCst) == self.slots.len()
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}
