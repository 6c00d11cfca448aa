use super::types::NodeProbe;

/// Picks the destination node from a probe round.
pub struct NodeSelector {
    fallback: String,
}

impl NodeSelector {
    /// `fallback` is the first configured node address; it is returned when
    /// every probe in a round failed.
    pub fn new(fallback: String) -> Self {
        Self { fallback }
    }

    /// Most available space wins. The sort is stable, so nodes reporting the
    /// same availability keep their probe-round (configured) order and the
    /// earlier one is chosen.
    ///
    /// When no node reported capacity at all, the fallback is returned rather
    /// than failing the round. This silently routes around a real outage -
    /// the subsequent transmit to the fallback will fail and surface the
    /// problem - and is kept as-is from the original deployment.
    pub fn choose<'a>(&'a self, probes: &'a [NodeProbe]) -> &'a str {
        let mut candidates: Vec<_> = probes.iter().filter_map(NodeProbe::capacity).collect();
        candidates.sort_by(|a, b| b.available.cmp(&a.available));

        match candidates.first() {
            Some(best) => {
                tracing::debug!(
                    "selected node {} ({} bytes available)",
                    best.addr,
                    best.available
                );
                &best.addr
            }
            None => {
                tracing::warn!(
                    "no storage node reported capacity, falling back to {}",
                    self.fallback
                );
                &self.fallback
            }
        }
    }
}
