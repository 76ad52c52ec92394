use futures_util::future::join_all;
use ractor::Actor;
use tokio::sync::oneshot;
use tracing::{info, warn};

use crate::{
    actors::supervisor::{RouteArgs, RouteSupervisor},
    config::RouterConfig,
    errors::{Error, Result},
    mesh::{
        Hypercube,
        packet::{Delivery, NodeId},
        path::RouteTrace,
    },
};

/// Entry point for routing messages across a simulated hypercube.
///
/// Every call to [`Router::route`] spins up a fresh set of node actors, so
/// independent routes never share state and may run concurrently.
#[derive(Debug, Clone)]
pub struct Router {
    hypercube: Hypercube,
    config: RouterConfig,
}

impl Router {
    pub fn new(config: RouterConfig) -> Result<Self> {
        let hypercube = Hypercube::new(config.nodes)?;
        Ok(Router { hypercube, config })
    }

    pub fn hypercube(&self) -> &Hypercube {
        &self.hypercube
    }

    pub fn config(&self) -> &RouterConfig {
        &self.config
    }

    pub fn trace(&self, destination: i64) -> Result<RouteTrace> {
        self.hypercube.trace(destination)
    }

    /// Sends `payload` from node `0` to `destination` and back.
    ///
    /// The destination is validated before any node exists. The call returns
    /// only after every node has finished, including the bystanders.
    pub async fn route(&self, payload: Vec<u8>, destination: i64) -> Result<Delivery> {
        let destination = self.hypercube.address(destination)?;
        info!("routing to {destination} across {} nodes", self.hypercube.nodes());

        let (reply, result) = oneshot::channel();
        let (_, handle) = Actor::spawn(None, RouteSupervisor, RouteArgs {
            hypercube: self.hypercube,
            payload,
            destination,
            timeout: self.config.timeout,
            return_leg: self.config.return_leg,
            reply,
        }).await.map_err(|err| Error::Spawn(err.to_string()))?;

        let result = result
            .await
            .map_err(|_| Error::Aborted("route supervisor exited without a result".to_string()))?;
        if let Err(err) = handle.await {
            warn!("route supervisor did not shut down cleanly: {err}");
        }
        result
    }

    /// Routes like [`Router::route`] and checks the observed path against the planner.
    pub async fn route_verified(&self, payload: Vec<u8>, destination: i64) -> Result<Delivery> {
        let trace = self.trace(destination)?;
        let delivery = self.route(payload, destination).await?;
        if delivery.path != *trace {
            return Err(Error::PathMismatch {
                expected: trace.into_inner(),
                observed: delivery.path,
            });
        }
        Ok(delivery)
    }

    /// Routes the same payload to every address concurrently.
    pub async fn survey(&self, payload: &[u8]) -> Vec<(NodeId, Result<Delivery>)> {
        let routes = self.hypercube.addresses().map(|node| async move {
            (node, self.route_verified(payload.to_vec(), i64::from(node)).await)
        });
        join_all(routes).await
    }
}

#[cfg(test)]
mod tests {
    use std::{collections::BTreeSet, time::Duration};

    use crate::{config::ReturnLeg, mesh::packet::RouteStats};

    use super::*;

    fn router(nodes: u32) -> Router {
        Router::new(RouterConfig::new(nodes).with_timeout(Duration::from_secs(5))).unwrap()
    }

    fn retracing(nodes: u32) -> Router {
        Router::new(
            RouterConfig::new(nodes)
                .with_timeout(Duration::from_secs(5))
                .with_return_leg(ReturnLeg::Retrace),
        ).unwrap()
    }

    fn off_path(nodes: u32, path: &[NodeId]) -> BTreeSet<NodeId> {
        (1..nodes).filter(|node| !path.contains(node)).collect()
    }

    #[tokio::test]
    async fn four_nodes() {
        let router = router(4);
        let delivery = router.route(b"aaabbbcccddd".to_vec(), 1).await.unwrap();
        assert_eq!(delivery.path, vec![0, 1]);
        assert_eq!(delivery.payload, b"aaabbbcccddd");

        let delivery = router.route(b"Hiiii :33".to_vec(), 3).await.unwrap();
        assert_eq!(delivery.path, vec![0, 1, 3]);
        assert_eq!(delivery.payload, b"Hiiii :33");

        let delivery = router.route(b"ABCDE".to_vec(), 2).await.unwrap();
        assert_eq!(delivery.path, vec![0, 2]);
    }

    #[tokio::test]
    async fn larger_cubes() {
        let delivery = router(8).route(b"x".to_vec(), 5).await.unwrap();
        assert_eq!(delivery.path, vec![0, 1, 5]);
        let delivery = router(8).route(b"x".to_vec(), 7).await.unwrap();
        assert_eq!(delivery.path, vec![0, 1, 3, 7]);
        let delivery = router(16).route(b"x".to_vec(), 14).await.unwrap();
        assert_eq!(delivery.path, vec![0, 2, 6, 14]);
    }

    #[tokio::test]
    async fn source_as_destination() {
        let delivery = router(8).route(b"stay".to_vec(), 0).await.unwrap();
        assert_eq!(delivery.path, vec![0]);
        assert_eq!(delivery.payload, b"stay");
        assert_eq!(delivery.hops(), 0);
        assert_eq!(delivery.stats, RouteStats { forwarded: 0, reflected: 0, terminated: 7 });
        assert_eq!(delivery.bystanders, off_path(8, &[0]));
    }

    #[tokio::test]
    async fn single_node_cube() {
        let router = router(1);
        let delivery = router.route(b"alone".to_vec(), 0).await.unwrap();
        assert_eq!(delivery.path, vec![0]);
        assert_eq!(delivery.stats.transmissions(), 0);
        assert!(router.route(Vec::new(), 1).await.is_err());
    }

    #[tokio::test]
    async fn payload_sizes_round_trip() {
        let router = router(4);
        for payload in [Vec::new(), vec![42], vec![b'a'; 1_000_000]] {
            let delivery = router.route(payload.clone(), 3).await.unwrap();
            assert_eq!(delivery.payload, payload);
            assert_eq!(delivery.path, vec![0, 1, 3]);
        }
    }

    #[tokio::test]
    async fn rejects_invalid_destination() {
        let router = router(8);
        assert_eq!(
            router.route(b"x".to_vec(), 8).await,
            Err(Error::InvalidDestination { destination: 8, nodes: 8 }),
        );
        assert_eq!(
            router.route(b"x".to_vec(), -1).await,
            Err(Error::InvalidDestination { destination: -1, nodes: 8 }),
        );
    }

    #[test]
    fn rejects_degenerate_topology() {
        assert_eq!(Router::new(RouterConfig::new(6)).unwrap_err(), Error::NotPowerOfTwo(6));
        assert_eq!(Router::new(RouterConfig::new(0)).unwrap_err(), Error::EmptyTopology);
    }

    #[tokio::test]
    async fn bystanders_are_released() {
        let delivery = router(16).route(b"quiet".to_vec(), 14).await.unwrap();
        let bystanders = off_path(16, &delivery.path);
        assert_eq!(delivery.bystanders, bystanders);
        assert_eq!(delivery.stats, RouteStats {
            forwarded: 3,
            reflected: 1,
            terminated: bystanders.len(),
        });
    }

    #[tokio::test]
    async fn retrace_relays_hop_by_hop() {
        let delivery = retracing(8).route(b"back".to_vec(), 7).await.unwrap();
        assert_eq!(delivery.path, vec![0, 1, 3, 7]);
        assert_eq!(delivery.payload, b"back");
        // one reflection per hop back instead of a single direct send
        assert_eq!(delivery.stats, RouteStats { forwarded: 3, reflected: 3, terminated: 4 });
        assert_eq!(delivery.bystanders, off_path(8, &delivery.path));
    }

    #[tokio::test]
    async fn retrace_large_payload() {
        let payload = vec![7u8; 1_000_000];
        let delivery = retracing(16).route(payload.clone(), 11).await.unwrap();
        assert_eq!(delivery.payload, payload);
        assert_eq!(delivery.path, vec![0, 1, 3, 11]);
    }

    #[tokio::test]
    async fn observed_paths_match_planner() {
        for router in [router(32), retracing(32)] {
            for (node, result) in router.survey(b"123 456 789").await {
                let delivery = result.unwrap_or_else(|err| panic!("route to {node}: {err}"));
                assert_eq!(delivery.path, *router.trace(i64::from(node)).unwrap());
                assert_eq!(delivery.payload, b"123 456 789");
            }
        }
    }

    #[tokio::test]
    async fn verified_route_checks_bounds_first() {
        let router = router(4);
        assert!(matches!(
            router.route_verified(b"x".to_vec(), 4).await,
            Err(Error::InvalidDestination { .. }),
        ));
        let delivery = router.route_verified(b"x".to_vec(), 3).await.unwrap();
        assert_eq!(delivery.path_slots(router.hypercube().path_capacity()), vec![0, 1, 3]);
        let delivery = router.route_verified(b"x".to_vec(), 2).await.unwrap();
        assert_eq!(delivery.path_slots(router.hypercube().path_capacity()), vec![0, 2, -1]);
    }
}
