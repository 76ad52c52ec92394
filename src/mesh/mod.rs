use serde::{Deserialize, Serialize};

use crate::errors::{Error, Result};

use packet::NodeId;
use path::RouteTrace;

pub mod packet;
pub mod path;

/// A binary hypercube of `2^dimension` nodes.
///
/// Only proper hypercubes can be built: an empty topology or a node count that
/// is not a power of two is rejected up front.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hypercube {
    nodes: u32,
    dimension: u32,
}

impl Hypercube {
    pub fn new(nodes: u32) -> Result<Self> {
        if nodes == 0 {
            return Err(Error::EmptyTopology);
        }
        if !nodes.is_power_of_two() {
            return Err(Error::NotPowerOfTwo(nodes));
        }
        Ok(Hypercube { nodes, dimension: nodes.trailing_zeros() })
    }

    pub fn nodes(&self) -> u32 {
        self.nodes
    }

    pub fn dimension(&self) -> u32 {
        self.dimension
    }

    /// Number of slots a caller needs to hold any path: `dimension + 1`.
    pub fn path_capacity(&self) -> usize {
        self.dimension as usize + 1
    }

    pub fn contains(&self, node: NodeId) -> bool {
        node < self.nodes
    }

    /// Checks a caller-supplied destination before anything is sent.
    pub fn address(&self, destination: i64) -> Result<NodeId> {
        NodeId::try_from(destination)
            .ok()
            .filter(|&node| self.contains(node))
            .ok_or(Error::InvalidDestination { destination, nodes: self.nodes })
    }

    pub fn addresses(&self) -> impl Iterator<Item = NodeId> + use<> {
        0..self.nodes
    }

    pub fn adjacent(a: NodeId, b: NodeId) -> bool {
        Self::distance(a, b) == 1
    }

    /// Hamming distance, which is also the minimum hop count between `a` and `b`.
    pub fn distance(a: NodeId, b: NodeId) -> u32 {
        (a ^ b).count_ones()
    }

    pub fn trace(&self, destination: i64) -> Result<RouteTrace> {
        let destination = self.address(destination)?;
        Ok(path::compute_path(destination))
    }

    pub(crate) fn next_hop(&self, current: NodeId, destination: NodeId) -> Option<NodeId> {
        path::greedy_next_hop(current, destination, self.dimension)
    }
}
