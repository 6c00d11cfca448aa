use std::sync::Arc;

use tokio::task::JoinSet;

use super::types::{NodeCapacity, NodeProbe, ProbeOutcome};
use crate::node::client::NodeClient;

/// Polls every configured node for available capacity.
///
/// One probe task per node, all in flight at once; the round joins when the
/// last probe has settled (fan-out/fan-in, not a race). The per-node timeout
/// lives in the client, so a hung node costs the round at most that timeout
/// and only its own entry.
pub struct CapacityProber {
    nodes: Vec<String>,
    client: Arc<NodeClient>,
}

impl CapacityProber {
    pub fn new(nodes: Vec<String>, client: Arc<NodeClient>) -> Self {
        Self { nodes, client }
    }

    pub fn nodes(&self) -> &[String] {
        &self.nodes
    }

    /// Runs one probe round. Returns one entry per configured node, in
    /// configured order so downstream tie-breaks stay deterministic.
    pub async fn probe_all(&self) -> Vec<NodeProbe> {
        let mut tasks = JoinSet::new();
        for addr in self.nodes.iter().cloned() {
            let client = self.client.clone();
            tasks.spawn(async move {
                let outcome = match client.fetch_capacity(&addr).await {
                    Ok(report) => ProbeOutcome::Available(NodeCapacity {
                        addr: addr.clone(),
                        total: report.total_storage,
                        used: report.used_storage,
                        available: report.available_storage,
                    }),
                    Err(err) => {
                        tracing::warn!("capacity probe for {} failed: {}", addr, err);
                        ProbeOutcome::Unreachable
                    }
                };
                NodeProbe { addr, outcome }
            });
        }

        let mut probes = Vec::with_capacity(self.nodes.len());
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(probe) => probes.push(probe),
                Err(err) => tracing::error!("capacity probe task panicked: {}", err),
            }
        }

        // JoinSet yields in completion order; restore configured order.
        probes.sort_by_key(|probe| self.nodes.iter().position(|node| *node == probe.addr));
        probes
    }
}
