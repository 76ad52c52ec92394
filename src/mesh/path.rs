// greedy dimension correction, lowest dimension first

use std::ops::Deref;

use serde::{Deserialize, Serialize};

use super::packet::NodeId;

/// Expected route from the source to a destination. Never mutated once planned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteTrace(Vec<NodeId>);

impl RouteTrace {
    pub fn destination(&self) -> NodeId {
        self.0.last().copied().unwrap_or(0)
    }

    pub fn hops(&self) -> usize {
        self.0.len().saturating_sub(1)
    }

    pub fn into_inner(self) -> Vec<NodeId> {
        self.0
    }
}

impl Deref for RouteTrace {
    type Target = [NodeId];

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

/// Plans the canonical shortest route from `0` to `destination`.
///
/// Bits are tried once each, from bit `0` up to the highest set bit of the
/// destination; a flip is kept when it moves the current address strictly
/// closer to the destination. The result always has `popcount + 1` entries.
pub fn compute_path(destination: NodeId) -> RouteTrace {
    let mut path = vec![0];
    let mut current: NodeId = 0;
    let width = NodeId::BITS - destination.leading_zeros();
    for i in 0..width {
        let candidate = current ^ (1 << i);
        if candidate ^ destination < current ^ destination {
            current = candidate;
            path.push(current);
        }
    }
    RouteTrace(path)
}

/// Picks the next hop from `current` using only local knowledge.
///
/// Returns `None` when no dimension below `dimension` brings the message
/// closer, which only happens at the destination itself on a proper hypercube.
pub fn greedy_next_hop(current: NodeId, destination: NodeId, dimension: u32) -> Option<NodeId> {
    (0..dimension)
        .map(|i| current ^ (1 << i))
        .find(|candidate| candidate ^ destination < current ^ destination)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn two_bit_scenarios() {
        assert_eq!(&*compute_path(1), &[0, 1]);
        assert_eq!(&*compute_path(2), &[0, 2]);
        assert_eq!(&*compute_path(3), &[0, 1, 3]);
    }

    #[test]
    fn wider_scenarios() {
        assert_eq!(&*compute_path(4), &[0, 4]);
        assert_eq!(&*compute_path(5), &[0, 1, 5]);
        assert_eq!(&*compute_path(7), &[0, 1, 3, 7]);
        assert_eq!(&*compute_path(14), &[0, 2, 6, 14]);
        assert_eq!(&*compute_path(29), &[0, 1, 5, 13, 29]);
    }

    #[test]
    fn source_is_its_own_route() {
        let trace = compute_path(0);
        assert_eq!(&*trace, &[0]);
        assert_eq!(trace.hops(), 0);
        assert_eq!(trace.destination(), 0);
    }

    #[test]
    fn every_route_is_shortest() {
        for destination in 1..64 {
            let trace = compute_path(destination);
            assert_eq!(trace.len() as u32, destination.count_ones() + 1, "{destination}");
            assert_eq!(trace[0], 0);
            assert_eq!(trace.destination(), destination);
            for pair in trace.windows(2) {
                assert_eq!((pair[0] ^ pair[1]).count_ones(), 1, "{destination}: {pair:?}");
            }
        }
    }

    #[test]
    fn local_hops_rebuild_planned_route() {
        let dimension = 5;
        for destination in 0..(1 << dimension) {
            let mut hops = vec![0];
            let mut current = 0;
            while let Some(next) = greedy_next_hop(current, destination, dimension) {
                hops.push(next);
                current = next;
            }
            assert_eq!(current, destination);
            assert_eq!(hops, compute_path(destination).into_inner());
        }
    }

    #[test]
    fn empty_trace_has_no_hops() {
        let trace: RouteTrace = serde_json::from_str("[]").unwrap();
        assert_eq!(trace.hops(), 0);
        assert_eq!(trace.destination(), 0);
    }

    #[test]
    fn no_hop_at_destination() {
        assert_eq!(greedy_next_hop(6, 6, 3), None);
        assert_eq!(greedy_next_hop(0, 0, 0), None);
    }

    #[test]
    fn no_hop_outside_dimension() {
        // bit 2 is wrong but the 2-cube has no link for it
        assert_eq!(greedy_next_hop(2, 6, 2), None);
        assert_eq!(greedy_next_hop(2, 6, 3), Some(6));
    }
}
