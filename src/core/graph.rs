//! Graph Proximity Module
//!
//! Builds a per-request directed graph from observed transfers and measures
//! how many hops separate the wallet from the nearest known-malicious address.
//! The search is a bounded breadth-first walk over both edge directions: an
//! attacker may have sent funds to the wallet or received funds from it.

use std::collections::{BTreeMap, BTreeSet, HashSet, VecDeque};

use crate::models::{AppError, AppResult, ErrorCode, EvmAddress, TransferRecord};
use crate::utils::constants::NO_CONNECTION;
use crate::utils::malicious::KnownMaliciousSet;

/// Directed transfer graph. Ordered collections keep traversal deterministic.
#[derive(Debug, Clone, Default)]
pub struct TransferGraph {
    nodes: BTreeSet<EvmAddress>,
    outgoing: BTreeMap<EvmAddress, BTreeSet<EvmAddress>>,
    incoming: BTreeMap<EvmAddress, BTreeSet<EvmAddress>>,
    edge_count: usize,
}

impl TransferGraph {
    /// Build the graph for one request.
    ///
    /// Fails with `GraphTooLarge` when the node count exceeds `max_nodes`.
    pub fn build(
        wallet: &EvmAddress,
        transfers: &[TransferRecord],
        max_nodes: usize,
    ) -> AppResult<Self> {
        let mut graph = Self::default();
        graph.nodes.insert(wallet.clone());

        for transfer in transfers {
            graph.add_edge(&transfer.from, &transfer.to);
            if graph.nodes.len() > max_nodes {
                return Err(AppError::new(
                    ErrorCode::GraphTooLarge,
                    format!(
                        "Transfer graph exceeded {} nodes ({} transfers)",
                        max_nodes,
                        transfers.len()
                    ),
                ));
            }
        }

        Ok(graph)
    }

    fn add_edge(&mut self, from: &EvmAddress, to: &EvmAddress) {
        self.nodes.insert(from.clone());
        self.nodes.insert(to.clone());

        let inserted = self
            .outgoing
            .entry(from.clone())
            .or_default()
            .insert(to.clone());
        self.incoming
            .entry(to.clone())
            .or_default()
            .insert(from.clone());

        if inserted {
            self.edge_count += 1;
        }
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Distinct directed edges
    pub fn edge_count(&self) -> usize {
        self.edge_count
    }

    pub fn contains(&self, node: &EvmAddress) -> bool {
        self.nodes.contains(node)
    }

    /// Receivers first, then senders, each in address order
    fn neighbors<'a>(&'a self, node: &EvmAddress) -> impl Iterator<Item = &'a EvmAddress> + 'a {
        let out = self.outgoing.get(node).into_iter().flatten();
        let inc = self.incoming.get(node).into_iter().flatten();
        out.chain(inc)
    }
}

/// Result of a proximity search
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Proximity {
    /// Hops to the nearest malicious node, -1 if none within the cap
    pub hop_distance: i32,
    /// One malicious node at that distance. Which one is unspecified when several tie.
    pub nearest: Option<EvmAddress>,
}

impl Proximity {
    /// No signal: history unavailable or nothing reachable
    pub fn none() -> Self {
        Self {
            hop_distance: NO_CONNECTION,
            nearest: None,
        }
    }
}

/// Bounded-depth BFS over a [`TransferGraph`]
#[derive(Debug, Clone, Copy)]
pub struct GraphProximityEngine {
    max_depth: u32,
}

impl GraphProximityEngine {
    pub fn new(max_depth: u32) -> Self {
        Self { max_depth }
    }

    /// Minimum hop distance from `wallet` to any listed address.
    ///
    /// BFS visits nodes in nondecreasing depth, so the first malicious node
    /// dequeued is at the minimum distance.
    pub fn nearest_malicious(
        &self,
        graph: &TransferGraph,
        wallet: &EvmAddress,
        malicious: &KnownMaliciousSet,
    ) -> Proximity {
        if malicious.is_empty() || !graph.contains(wallet) {
            return Proximity::none();
        }

        let mut visited: HashSet<&EvmAddress> = HashSet::with_capacity(graph.node_count());
        let mut queue: VecDeque<(&EvmAddress, u32)> = VecDeque::new();
        visited.insert(wallet);
        queue.push_back((wallet, 0));

        while let Some((node, depth)) = queue.pop_front() {
            if malicious.contains(node) {
                return Proximity {
                    hop_distance: depth as i32,
                    nearest: Some(node.clone()),
                };
            }
            if depth >= self.max_depth {
                continue;
            }
            for next in graph.neighbors(node) {
                if visited.insert(next) {
                    queue.push_back((next, depth + 1));
                }
            }
        }

        Proximity::none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(n: u8) -> EvmAddress {
        EvmAddress::parse(&format!("0x{:040x}", n as u64 + 0x1000)).unwrap()
    }

    fn edge(from: u8, to: u8) -> TransferRecord {
        TransferRecord {
            from: addr(from),
            to: addr(to),
            value: 1.0,
            block_number: 100,
        }
    }

    fn malicious(ids: &[u8]) -> KnownMaliciousSet {
        KnownMaliciousSet::from_addresses(ids.iter().map(|i| addr(*i)))
    }

    fn distance(transfers: &[TransferRecord], bad: &[u8], max_depth: u32) -> i32 {
        let wallet = addr(0);
        let graph = TransferGraph::build(&wallet, transfers, 1000).unwrap();
        GraphProximityEngine::new(max_depth)
            .nearest_malicious(&graph, &wallet, &malicious(bad))
            .hop_distance
    }

    #[test]
    fn test_wallet_itself_listed_is_zero_hops() {
        assert_eq!(distance(&[edge(0, 1)], &[0], 3), 0);
        assert_eq!(distance(&[], &[0], 3), 0);
    }

    #[test]
    fn test_direct_counterparty_is_one_hop_in_either_direction() {
        assert_eq!(distance(&[edge(0, 1)], &[1], 3), 1);
        assert_eq!(distance(&[edge(1, 0)], &[1], 3), 1);
    }

    #[test]
    fn test_cyclic_graph_reports_minimum_distance() {
        // 0 -> 1 -> 9 is 2 hops, 0 -> 2 -> 3 -> 4 -> 9 is 4 hops; 1 -> 0 and 4 -> 3 close cycles
        let transfers = vec![
            edge(0, 2),
            edge(2, 3),
            edge(3, 4),
            edge(4, 9),
            edge(4, 3),
            edge(0, 1),
            edge(1, 9),
            edge(1, 0),
        ];
        assert_eq!(distance(&transfers, &[9], 5), 2);

        // Without the short path only the 4-hop route remains
        let long_only: Vec<_> = transfers
            .into_iter()
            .filter(|t| t.to != addr(9) || t.from == addr(4))
            .collect();
        assert_eq!(distance(&long_only, &[9], 5), 4);
    }

    #[test]
    fn test_closer_attacker_dominates_farther_ones() {
        let transfers = vec![edge(0, 1), edge(1, 2), edge(2, 3), edge(0, 5)];
        assert_eq!(distance(&transfers, &[3, 5], 3), 1);
    }

    #[test]
    fn test_depth_cap_hides_distant_nodes() {
        let transfers = vec![edge(0, 1), edge(1, 2), edge(2, 3), edge(3, 4)];
        assert_eq!(distance(&transfers, &[3], 3), 3);
        assert_eq!(distance(&transfers, &[4], 3), NO_CONNECTION);
        assert_eq!(distance(&transfers, &[4], 4), 4);
    }

    #[test]
    fn test_unreachable_or_empty_set_is_no_connection() {
        let transfers = vec![edge(0, 1), edge(7, 8)];
        assert_eq!(distance(&transfers, &[8], 3), NO_CONNECTION);
        assert_eq!(distance(&transfers, &[], 3), NO_CONNECTION);
    }

    #[test]
    fn test_result_is_deterministic() {
        let transfers = vec![edge(0, 3), edge(0, 2), edge(2, 5), edge(3, 5), edge(3, 6)];
        let wallet = addr(0);
        let graph = TransferGraph::build(&wallet, &transfers, 1000).unwrap();
        let engine = GraphProximityEngine::new(3);
        let bad = malicious(&[5, 6]);
        let first = engine.nearest_malicious(&graph, &wallet, &bad);
        for _ in 0..10 {
            assert_eq!(engine.nearest_malicious(&graph, &wallet, &bad), first);
        }
        assert_eq!(first.hop_distance, 2);
    }

    #[test]
    fn test_node_cap_is_enforced() {
        let transfers: Vec<_> = (1..20).map(|i| edge(0, i)).collect();
        let err = TransferGraph::build(&addr(0), &transfers, 10).unwrap_err();
        assert_eq!(err.code, ErrorCode::GraphTooLarge);
    }

    #[test]
    fn test_duplicate_edges_counted_once() {
        let graph = TransferGraph::build(&addr(0), &[edge(0, 1), edge(0, 1), edge(1, 0)], 10).unwrap();
        assert_eq!(graph.node_count(), 2);
        assert_eq!(graph.edge_count(), 2);
    }
}
