use std::time::Duration;

use ractor::{
    Actor, ActorProcessingErr, ActorRef, MessagingErr, async_trait, cast, concurrency::JoinHandle,
};
use tracing::{debug, info};

use crate::{
    config::ReturnLeg,
    errors::{Error, Result},
    mesh::{
        Hypercube,
        packet::{Message, NodeId, Packet, Phase, Role},
    },
};

use super::{fabric::Fabric, supervisor::RouteMsg};

pub(crate) const SOURCE: NodeId = 0;

#[derive(derive_more::Debug)]
pub(crate) enum NodeMsg {
    // from the route supervisor
    #[debug("Attach")]
    Attach(Fabric),
    Start(Message),

    // from other nodes
    Deliver { from: NodeId, packet: Packet },

    // from self
    Timeout,
}

pub(crate) struct NodeArgs {
    pub(crate) address: NodeId,
    pub(crate) hypercube: Hypercube,
    pub(crate) timeout: Duration,
    pub(crate) return_leg: ReturnLeg,
    pub(crate) supervisor: ActorRef<RouteMsg>,
}

pub(crate) struct NodeState {
    address: NodeId,
    hypercube: Hypercube,
    timeout: Duration,
    return_leg: ReturnLeg,
    supervisor: ActorRef<RouteMsg>,

    fabric: Option<Fabric>,
    phase: Phase,
    timer: Option<JoinHandle<Result<(), MessagingErr<NodeMsg>>>>,
}

// one per hypercube address. the source injects the message and sweeps
// bystanders, everybody else waits for exactly one packet.
pub(crate) struct NodeActor;

#[async_trait]
impl Actor for NodeActor {
    type Msg = NodeMsg;
    type State = NodeState;
    type Arguments = NodeArgs;

    async fn pre_start(
        &self,
        _: ActorRef<Self::Msg>,
        args: Self::Arguments,
    ) -> Result<Self::State, ActorProcessingErr> {
        Ok(NodeState {
            address: args.address,
            hypercube: args.hypercube,
            timeout: args.timeout,
            return_leg: args.return_leg,
            supervisor: args.supervisor,
            fabric: None,
            phase: Phase::Idle,
            timer: None,
        })
    }

    async fn handle(
        &self,
        myself: ActorRef<Self::Msg>,
        message: Self::Msg,
        state: &mut Self::State,
    ) -> Result<(), ActorProcessingErr> {
        match message {
            NodeMsg::Attach(fabric) => {
                state.fabric = Some(fabric);
                if !state.is_source() {
                    state.arm(&myself);
                }
            },
            NodeMsg::Start(message) => state.start(&myself, message)?,
            NodeMsg::Deliver { from, packet } => {
                debug!("node {} received {packet:?} from {from}", state.address);
                state.deliver(&myself, packet)?;
            },
            NodeMsg::Timeout => {
                if state.phase != Phase::Done {
                    return Err(Error::RoutingTimeout {
                        node: state.address,
                        phase: state.phase,
                        timeout: state.timeout,
                    }.into());
                }
            },
        }
        Ok(())
    }

    async fn post_stop(
        &self,
        _: ActorRef<Self::Msg>,
        state: &mut Self::State,
    ) -> Result<(), ActorProcessingErr> {
        if let Some(timer) = state.timer.take() {
            timer.abort();
        }
        Ok(())
    }
}

impl NodeState {
    fn is_source(&self) -> bool {
        self.address == SOURCE
    }

    fn arm(&mut self, myself: &ActorRef<NodeMsg>) {
        if self.timer.is_none() {
            self.timer = Some(myself.send_after(self.timeout, || NodeMsg::Timeout));
        }
    }

    fn send(&self, to: NodeId, packet: Packet) -> Result<()> {
        self.fabric
            .as_ref()
            .ok_or(Error::NotAttached(self.address))?
            .send(self.address, to, packet)
    }

    fn unexpected(&self, packet: &'static str) -> Error {
        Error::UnexpectedPacket { node: self.address, packet, phase: self.phase }
    }

    fn no_hop(&self, destination: NodeId) -> Error {
        Error::RoutingFailure { node: self.address, destination }
    }

    fn start(&mut self, myself: &ActorRef<NodeMsg>, message: Message) -> Result<()> {
        if !self.is_source() || self.phase != Phase::Idle {
            return Err(self.unexpected("start"));
        }
        let destination = message.destination();
        info!("routing {} bytes from {SOURCE} to {destination}", message.payload().len());
        match self.hypercube.next_hop(SOURCE, destination) {
            Some(next) => {
                self.phase = Phase::Forwarding;
                self.arm(myself);
                self.send(next, Packet::Forward(message))
            },
            // source and destination coincide, nothing to forward
            None if destination == SOURCE => self.complete(myself, message),
            None => Err(self.no_hop(destination)),
        }
    }

    fn deliver(&mut self, myself: &ActorRef<NodeMsg>, packet: Packet) -> Result<()> {
        match (self.phase, packet) {
            (Phase::Idle, Packet::Terminate) if !self.is_source() => {
                self.finish(myself, Role::Bystander)
            },
            (Phase::Idle, Packet::Forward(message)) if !self.is_source() => {
                self.forward(myself, message)
            },
            (Phase::Forwarding, Packet::Reflect(message)) => {
                if self.is_source() {
                    self.complete(myself, message)
                } else {
                    self.relay(myself, message)
                }
            },
            (_, packet) => Err(self.unexpected(packet.kind())),
        }
    }

    fn forward(&mut self, myself: &ActorRef<NodeMsg>, mut message: Message) -> Result<()> {
        message.visit(self.address);
        let destination = message.destination();
        if destination == self.address {
            self.phase = Phase::Reflecting;
            let back = match self.return_leg {
                ReturnLeg::Direct => SOURCE,
                ReturnLeg::Retrace => message
                    .predecessor(self.address)
                    .ok_or_else(|| self.no_hop(SOURCE))?,
            };
            self.send(back, Packet::Reflect(message))?;
            return self.finish(myself, Role::Destination);
        }

        let next = self.hypercube
            .next_hop(self.address, destination)
            .ok_or_else(|| self.no_hop(destination))?;
        self.phase = Phase::Forwarding;
        self.send(next, Packet::Forward(message))?;
        match self.return_leg {
            ReturnLeg::Direct => self.finish(myself, Role::Intermediate),
            // stay around until the reflection passes back through
            ReturnLeg::Retrace => Ok(()),
        }
    }

    fn relay(&mut self, myself: &ActorRef<NodeMsg>, message: Message) -> Result<()> {
        let back = message
            .predecessor(self.address)
            .ok_or_else(|| self.no_hop(SOURCE))?;
        self.send(back, Packet::Reflect(message))?;
        self.finish(myself, Role::Intermediate)
    }

    /// Runs on the source once the message is back: releases every node that
    /// never saw it, then hands the result to the supervisor.
    fn complete(&mut self, myself: &ActorRef<NodeMsg>, message: Message) -> Result<()> {
        let bystanders = self.hypercube
            .addresses()
            .filter(|node| *node != SOURCE && !message.path().contains(node));
        for node in bystanders {
            self.send(node, Packet::Terminate)?;
        }
        cast!(self.supervisor, RouteMsg::Delivered(message))
            .map_err(|err| Error::Aborted(err.to_string()))?;
        self.finish(myself, Role::Source)
    }

    fn finish(&mut self, myself: &ActorRef<NodeMsg>, role: Role) -> Result<()> {
        self.phase = Phase::Done;
        if let Some(timer) = self.timer.take() {
            timer.abort();
        }
        debug!("node {} done as {role:?}", self.address);
        cast!(self.supervisor, RouteMsg::Finished { node: self.address, role })
            .map_err(|err| Error::Aborted(err.to_string()))?;
        myself.stop(None);
        Ok(())
    }
}
