use std::sync::{
    Arc,
    atomic::{AtomicUsize, Ordering},
};

use ractor::{ActorRef, cast};
use tracing::debug;

use crate::{
    errors::{Error, Result},
    mesh::packet::{NodeId, Packet, RouteStats},
};

use super::node::NodeMsg;

#[derive(Debug, Default)]
struct Counters {
    forwarded: AtomicUsize,
    reflected: AtomicUsize,
    terminated: AtomicUsize,
}

/// Point-to-point links between every pair of nodes of one route.
///
/// Index `i` holds the mailbox of address `i`. Each mailbox is FIFO per sender,
/// which is all the protocol needs.
#[derive(Clone)]
pub(crate) struct Fabric {
    links: Arc<[ActorRef<NodeMsg>]>,
    counters: Arc<Counters>,
}

impl Fabric {
    pub(crate) fn new(links: Vec<ActorRef<NodeMsg>>) -> Self {
        Fabric {
            links: links.into(),
            counters: Arc::new(Counters::default()),
        }
    }

    pub(crate) fn send(&self, from: NodeId, to: NodeId, packet: Packet) -> Result<()> {
        let Some(link) = self.links.get(to as usize) else {
            return Err(Error::NoSuchLink(to));
        };
        let counter = match &packet {
            Packet::Forward(_) => &self.counters.forwarded,
            Packet::Reflect(_) => &self.counters.reflected,
            Packet::Terminate => &self.counters.terminated,
        };
        debug!("sending {packet:?} from {from} to {to}");
        cast!(link, NodeMsg::Deliver { from, packet }).map_err(|_| Error::LinkClosed(to))?;
        counter.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    pub(crate) fn stats(&self) -> RouteStats {
        RouteStats {
            forwarded: self.counters.forwarded.load(Ordering::Relaxed),
            reflected: self.counters.reflected.load(Ordering::Relaxed),
            terminated: self.counters.terminated.load(Ordering::Relaxed),
        }
    }

    pub(crate) fn stop_all(&self, reason: &str) {
        for link in self.links.iter() {
            link.stop(Some(reason.to_string()));
        }
    }
}
