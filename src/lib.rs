//! Simulated hypercube interconnect that routes a message from node `0` to a
//! destination with greedy, per-hop dimension correction.
//!
//! Every node runs as its own actor and only decides the next hop from its own
//! address. The destination reflects the message back to the source, and the
//! source releases every node that was not on the route.

pub(crate) mod actors;
pub mod config;
pub mod errors;
pub mod mesh;
pub mod router;

pub use config::{ReturnLeg, RouterConfig};
pub use errors::{Error, Result};
pub use mesh::{
    Hypercube,
    packet::{Delivery, Message, NodeId, PATH_SENTINEL, Packet, Phase, Role, RouteStats},
    path::{RouteTrace, compute_path, greedy_next_hop},
};
pub use router::Router;
