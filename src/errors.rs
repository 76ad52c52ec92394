use std::time::Duration;

use thiserror::Error;

use crate::mesh::packet::{NodeId, Phase};

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    #[error("hypercube needs at least one node")]
    EmptyTopology,
    #[error("node count {0} is not a power of two")]
    NotPowerOfTwo(u32),
    #[error("destination {destination} is outside the hypercube of {nodes} nodes")]
    InvalidDestination { destination: i64, nodes: u32 },
    #[error("node {node} found no hop towards {destination}")]
    RoutingFailure { node: NodeId, destination: NodeId },
    #[error("node {node} timed out after {timeout:?} while {phase:?}")]
    RoutingTimeout { node: NodeId, phase: Phase, timeout: Duration },
    #[error("node {node} received an unexpected {packet} packet while {phase:?}")]
    UnexpectedPacket { node: NodeId, packet: &'static str, phase: Phase },
    #[error("node {0} has no fabric attached")]
    NotAttached(NodeId),
    #[error("No link to node {0}")]
    NoSuchLink(NodeId),
    #[error("Link to node {0} closed")]
    LinkClosed(NodeId),
    #[error("failed to spawn actor: {0}")]
    Spawn(String),
    #[error("route aborted: {0}")]
    Aborted(String),
    #[error("observed path {observed:?} differs from planned path {expected:?}")]
    PathMismatch { expected: Vec<NodeId>, observed: Vec<NodeId> },
}
