use std::{
    collections::{BTreeMap, HashMap},
    time::Duration,
};

use ractor::{
    Actor, ActorId, ActorProcessingErr, ActorRef, SupervisionEvent, async_trait, cast,
};
use tokio::sync::oneshot;
use tracing::{debug, error, info};

use crate::{
    config::ReturnLeg,
    errors::{Error, Result},
    mesh::{
        Hypercube,
        packet::{Delivery, Message, NodeId, Role},
    },
};

use super::{
    fabric::Fabric,
    node::{NodeActor, NodeArgs, NodeMsg, SOURCE},
};

#[derive(Debug)]
pub(crate) enum RouteMsg {
    // from the source node
    Delivered(Message),
    // from every node once it is done
    Finished { node: NodeId, role: Role },
}

pub(crate) struct RouteArgs {
    pub(crate) hypercube: Hypercube,
    pub(crate) payload: Vec<u8>,
    pub(crate) destination: NodeId,
    pub(crate) timeout: Duration,
    pub(crate) return_leg: ReturnLeg,
    pub(crate) reply: oneshot::Sender<Result<Delivery>>,
}

pub(crate) struct RouteState {
    hypercube: Hypercube,
    nodes: HashMap<ActorId, NodeId>,
    fabric: Fabric,
    finished: BTreeMap<NodeId, Role>,
    delivered: Option<Message>,
    reply: Option<oneshot::Sender<Result<Delivery>>>,
}

// owns every node of one routing operation. acts as the final barrier:
// the result is only released once all nodes reported `Finished`.
pub(crate) struct RouteSupervisor;

#[async_trait]
impl Actor for RouteSupervisor {
    type Msg = RouteMsg;
    type State = RouteState;
    type Arguments = RouteArgs;

    async fn pre_start(
        &self,
        myself: ActorRef<Self::Msg>,
        args: Self::Arguments,
    ) -> Result<Self::State, ActorProcessingErr> {
        let mut links = Vec::with_capacity(args.hypercube.nodes() as usize);
        let mut nodes = HashMap::new();
        for address in args.hypercube.addresses() {
            let (node, _) = Actor::spawn_linked(None, NodeActor, NodeArgs {
                address,
                hypercube: args.hypercube,
                timeout: args.timeout,
                return_leg: args.return_leg,
                supervisor: myself.clone(),
            }, myself.get_cell()).await?;
            nodes.insert(node.get_id(), address);
            links.push(node);
        }
        debug!("spawned {} nodes", links.len());

        let fabric = Fabric::new(links.clone());
        for node in &links {
            cast!(node, NodeMsg::Attach(fabric.clone()))?;
        }
        cast!(links[SOURCE as usize], NodeMsg::Start(Message::new(args.payload, args.destination)))?;

        Ok(RouteState {
            hypercube: args.hypercube,
            nodes,
            fabric,
            finished: BTreeMap::new(),
            delivered: None,
            reply: Some(args.reply),
        })
    }

    async fn handle(
        &self,
        myself: ActorRef<Self::Msg>,
        message: Self::Msg,
        state: &mut Self::State,
    ) -> Result<(), ActorProcessingErr> {
        debug!("received event: {message:?}");
        match message {
            RouteMsg::Delivered(message) => state.delivered = Some(message),
            RouteMsg::Finished { node, role } => {
                if state.finished.insert(node, role).is_some() {
                    error!("node {node} reported twice");
                }
            },
        }
        if let Some(delivery) = state.take_delivery() {
            info!("route complete: path {:?}, {:?}", delivery.path, delivery.stats);
            state.reply(Ok(delivery));
            myself.stop(None);
        }
        Ok(())
    }

    async fn handle_supervisor_evt(
        &self,
        myself: ActorRef<Self::Msg>,
        message: SupervisionEvent,
        state: &mut Self::State,
    ) -> Result<(), ActorProcessingErr> {
        match message {
            SupervisionEvent::ActorFailed(cell, err) => {
                let node = state.nodes.get(&cell.get_id());
                error!("node {node:?} failed: {err}");
                let err = err
                    .downcast_ref::<Error>()
                    .cloned()
                    .unwrap_or_else(|| Error::Aborted(err.to_string()));
                // nobody else may stay blocked on a route that cannot finish
                state.fabric.stop_all("route aborted");
                state.reply(Err(err));
                myself.stop(None);
            },
            SupervisionEvent::ActorTerminated(cell, _, reason) => {
                debug!("node {:?} terminated: {reason:?}", state.nodes.get(&cell.get_id()));
            },
            _ => {},
        }
        Ok(())
    }

    async fn post_stop(
        &self,
        _: ActorRef<Self::Msg>,
        state: &mut Self::State,
    ) -> Result<(), ActorProcessingErr> {
        state.reply(Err(Error::Aborted("route supervisor stopped".to_string())));
        Ok(())
    }
}

impl RouteState {
    /// Returns the result once the source delivered and every node is done.
    fn take_delivery(&mut self) -> Option<Delivery> {
        if self.finished.len() < self.hypercube.nodes() as usize {
            return None;
        }
        let (payload, path) = self.delivered.take()?.into_parts();
        let bystanders = self.finished
            .iter()
            .filter(|(_, role)| **role == Role::Bystander)
            .map(|(node, _)| *node)
            .collect();
        Some(Delivery {
            payload,
            path,
            bystanders,
            stats: self.fabric.stats(),
        })
    }

    // only the first outcome reaches the caller
    fn reply(&mut self, result: Result<Delivery>) {
        if let Some(reply) = self.reply.take() {
            let _ = reply.send(result);
        }
    }
}
