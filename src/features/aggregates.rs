//! Per-source-IP running aggregates.

use std::collections::{HashMap, HashSet};

/// Running counters for one source address. Values only grow within a run;
/// restarting the engine starts them from zero.
#[derive(Debug, Clone, Default)]
pub struct SourceAggregate {
    pub total_bytes_to_server: u64,
    pub distinct_dest_ports: HashSet<u16>,
}

/// Table of per-source aggregates, keyed by source IP string.
#[derive(Debug, Default)]
pub struct SourceAggregates {
    map: HashMap<String, SourceAggregate>,
}

impl SourceAggregates {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one event into the source's aggregate and return the updated
    /// distinct-port count. The count includes this event's port, so the
    /// first event from a source reports 1.
    pub fn observe(&mut self, src_ip: &str, dest_port: Option<u16>, bytes_to_server: u64) -> u64 {
        let entry = self.map.entry(src_ip.to_string()).or_default();
        entry.total_bytes_to_server = entry.total_bytes_to_server.saturating_add(bytes_to_server);
        if let Some(port) = dest_port {
            entry.distinct_dest_ports.insert(port);
        }
        entry.distinct_dest_ports.len() as u64
    }

    /// Aggregate for a source, if any of its events were seen.
    pub fn get(&self, src_ip: &str) -> Option<&SourceAggregate> {
        self.map.get(src_ip)
    }

    /// Number of sources tracked.
    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Drop all per-source state.
    pub fn reset(&mut self) {
        self.map.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn distinct_ports_grow_only_on_new_ports() {
        let mut aggregates = SourceAggregates::new();
        assert_eq!(aggregates.observe("10.0.0.1", Some(80), 100), 1);
        assert_eq!(aggregates.observe("10.0.0.1", Some(80), 50), 1);
        assert_eq!(aggregates.observe("10.0.0.1", Some(443), 10), 2);
        assert_eq!(aggregates.observe("10.0.0.2", Some(22), 5), 1);
    }

    #[test]
    fn bytes_accumulate_per_source() {
        let mut aggregates = SourceAggregates::new();
        aggregates.observe("10.0.0.1", Some(80), 100);
        aggregates.observe("10.0.0.1", Some(443), 50);
        aggregates.observe("10.0.0.2", Some(80), 7);

        let first = aggregates.get("10.0.0.1").unwrap();
        assert_eq!(first.total_bytes_to_server, 150);
        assert_eq!(first.distinct_dest_ports.len(), 2);
        assert_eq!(aggregates.get("10.0.0.2").unwrap().total_bytes_to_server, 7);
    }

    #[test]
    fn portless_events_still_count_bytes() {
        let mut aggregates = SourceAggregates::new();
        assert_eq!(aggregates.observe("10.0.0.1", None, 64), 0);
        assert_eq!(aggregates.get("10.0.0.1").unwrap().total_bytes_to_server, 64);
    }

    #[test]
    fn reset_clears_everything() {
        let mut aggregates = SourceAggregates::new();
        aggregates.observe("10.0.0.1", Some(80), 1);
        aggregates.reset();
        assert!(aggregates.is_empty());
        assert!(aggregates.get("10.0.0.1").is_none());
    }
}
