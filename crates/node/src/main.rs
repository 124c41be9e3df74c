//! quorumd - single-process launcher for a binary-consensus node cluster
//!
//! Boots N consensus nodes, each serving its own HTTP endpoint set on
//! `base_port + node_id`, and stops them all on ctrl-c.

use anyhow::Result;
use clap::Parser;
use quorum_consensus::{ConsensusNode, Value, ValueRegistry};
use quorum_http::{node_addr, NodeHttpServer, BASE_NODE_PORT};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod cluster;

use cluster::{node_plans, ClusterConfig, ReadyTracker};

/// Binary consensus node cluster
#[derive(Parser, Debug)]
#[command(name = "quorumd")]
#[command(about = "Runs a network of binary-consensus nodes", long_about = None)]
struct Args {
    /// Total number of nodes (N)
    #[arg(long, default_value_t = 4)]
    nodes: u32,

    /// Number of faulty nodes (F)
    #[arg(long, default_value_t = 1)]
    faulty: u32,

    /// Comma-separated faulty node ids (default: the first F ids)
    #[arg(long, value_delimiter = ',')]
    faulty_ids: Vec<u32>,

    /// Comma-separated initial values by node id (0, 1 or ?); missing
    /// entries are drawn at random
    #[arg(long, value_delimiter = ',')]
    values: Vec<Value>,

    /// Node i listens on base_port + i
    #[arg(long, default_value_t = BASE_NODE_PORT)]
    base_port: u16,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,
}

impl Args {
    fn cluster_config(&self) -> ClusterConfig {
        ClusterConfig {
            nodes: self.nodes,
            faulty: self.faulty,
            base_port: self.base_port,
            faulty_ids: self.faulty_ids.clone(),
            values: self.values.clone(),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = args.cluster_config();
    let plans = node_plans(&config)?;

    tracing::info!(
        "Starting consensus cluster: N={}, F={}, ports {}..{}",
        config.nodes,
        config.faulty,
        config.base_port,
        config.base_port as u32 + config.nodes - 1
    );

    let registry = Arc::new(ValueRegistry::new());
    let ready = Arc::new(ReadyTracker::new(config.nodes as usize));

    let mut nodes = Vec::with_capacity(plans.len());
    let mut servers = Vec::with_capacity(plans.len());
    for plan in plans {
        let node = ConsensusNode::new(plan, registry.clone());
        let addr = node_addr(config.base_port, node.node_id());
        nodes.push(node.clone());

        let ready = ready.clone();
        servers.push(tokio::spawn(async move {
            let node_id = node.node_id();
            let server = NodeHttpServer::new(node);
            let result = server
                .run(&addr, move |id| {
                    if ready.mark_ready(id) {
                        tracing::info!("All {} nodes are ready", ready.len());
                    }
                })
                .await;
            if let Err(e) = result {
                tracing::error!("Node {} server error: {}", node_id, e);
            }
        }));
    }

    tracing::info!("Press Ctrl+C to stop.");

    // Wait for shutdown signal
    tokio::signal::ctrl_c().await?;

    tracing::info!("Shutting down...");
    for node in &nodes {
        node.stop();
    }
    for handle in servers {
        handle.abort();
    }

    tracing::info!("Cluster stopped");
    Ok(())
}
