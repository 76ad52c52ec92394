use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

pub type NodeId = u32;

/// Value written into unused trailing slots of [`Delivery::path_slots`].
pub const PATH_SENTINEL: i64 = -1;

#[derive(derive_more::Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    #[debug(skip)]
    payload: Vec<u8>,
    destination: NodeId,
    path: Vec<NodeId>,
}

impl Message {
    /// Creates the message at the source, whose address is always `0`.
    pub fn new(payload: Vec<u8>, destination: NodeId) -> Self {
        Message { payload, destination, path: vec![0] }
    }

    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    pub fn destination(&self) -> NodeId {
        self.destination
    }

    pub fn path(&self) -> &[NodeId] {
        &self.path
    }

    pub(crate) fn visit(&mut self, node: NodeId) {
        self.path.push(node);
    }

    /// The node visited right before `node`, used to relay a reflection backwards.
    pub(crate) fn predecessor(&self, node: NodeId) -> Option<NodeId> {
        let index = self.path.iter().position(|&hop| hop == node)?;
        index.checked_sub(1).map(|prev| self.path[prev])
    }

    pub(crate) fn into_parts(self) -> (Vec<u8>, Vec<NodeId>) {
        (self.payload, self.path)
    }
}

#[derive(derive_more::Debug)]
pub enum Packet {
    Forward(Message),
    Reflect(Message),
    Terminate,
}

impl Packet {
    pub(crate) fn kind(&self) -> &'static str {
        match self {
            Packet::Forward(_) => "forward",
            Packet::Reflect(_) => "reflect",
            Packet::Terminate => "terminate",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Phase {
    Idle,
    Forwarding,
    Reflecting,
    Done,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Role {
    Source,
    Intermediate,
    Destination,
    Bystander,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteStats {
    pub forwarded: usize,
    pub reflected: usize,
    pub terminated: usize,
}

impl RouteStats {
    pub fn transmissions(&self) -> usize {
        self.forwarded + self.reflected + self.terminated
    }
}

#[derive(derive_more::Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Delivery {
    #[debug(skip)]
    pub payload: Vec<u8>,
    pub path: Vec<NodeId>,
    pub bystanders: BTreeSet<NodeId>,
    pub stats: RouteStats,
}

impl Delivery {
    /// Number of inter-node hops on the forward leg.
    pub fn hops(&self) -> usize {
        self.path.len().saturating_sub(1)
    }

    /// Writes the path into `capacity` integer slots, padding unused ones with
    /// [`PATH_SENTINEL`] and dropping entries that do not fit.
    pub fn path_slots(&self, capacity: usize) -> Vec<i64> {
        let mut slots: Vec<i64> = self.path.iter()
            .take(capacity)
            .map(|&node| i64::from(node))
            .collect();
        slots.resize(capacity, PATH_SENTINEL);
        slots
    }
}
