use serde::Serialize;

/// Capacity snapshot for a single node, derived from one probe.
///
/// Ephemeral: lives for the duration of a probe round and is recomputed on
/// every placement decision, never persisted.
#[derive(Debug, Clone, Serialize)]
pub struct NodeCapacity {
    pub addr: String,
    pub total: u64,
    pub used: u64,
    pub available: u64,
}

/// What a single probe learned about a node.
#[derive(Debug, Clone, Serialize)]
pub enum ProbeOutcome {
    Available(NodeCapacity),
    /// Network error, non-2xx response or timeout. Failures are isolated per
    /// node and never abort the round.
    Unreachable,
}

/// One entry of a probe round, in configured node order.
#[derive(Debug, Clone, Serialize)]
pub struct NodeProbe {
    pub addr: String,
    pub outcome: ProbeOutcome,
}

impl NodeProbe {
    pub fn capacity(&self) -> Option<&NodeCapacity> {
        match &self.outcome {
            ProbeOutcome::Available(capacity) => Some(capacity),
            ProbeOutcome::Unreachable => None,
        }
    }
}
