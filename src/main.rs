use std::{path::PathBuf, time::Duration};

use anyhow::{Result, bail};
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use hypercube_routing::{Delivery, NodeId, ReturnLeg, Router, RouterConfig};

#[derive(Debug, Parser)]
struct Args {
    /// Number of nodes, must be a power of two
    #[clap(env = "HYPERCUBE_NODES", long, short, default_value_t = 8)]
    nodes: u32,
    /// How long any node may wait for its packet
    #[clap(env = "HYPERCUBE_TIMEOUT", long, short, default_value = "10s", value_parser = humantime::parse_duration)]
    timeout: Duration,
    #[clap(env = "HYPERCUBE_RETURN_LEG", long, short, value_enum, default_value_t = ReturnLeg::Direct)]
    return_leg: ReturnLeg,
    /// Print results as JSON
    #[clap(long, global = true)]
    json: bool,
    #[clap(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Route a payload from node 0 to DESTINATION and back
    #[clap(alias = "r")]
    Route {
        #[clap(allow_negative_numbers = true)]
        destination: i64,
        payload: Option<String>,
        /// Read the payload from a file instead
        #[clap(long, short, conflicts_with = "payload")]
        file: Option<PathBuf>,
    },
    /// Print the planned path without routing anything
    #[clap(alias = "t")]
    Trace {
        #[clap(allow_negative_numbers = true)]
        destination: i64,
    },
    /// Route a payload to every node and compare against the planned paths
    #[clap(alias = "s")]
    Survey {
        #[clap(default_value = "")]
        payload: String,
    },
}

#[derive(Debug, Serialize)]
struct Report<'a> {
    destination: NodeId,
    payload_len: usize,
    path: &'a [NodeId],
    path_slots: Vec<i64>,
    bystanders: usize,
    transmissions: usize,
}

impl<'a> Report<'a> {
    fn new(router: &Router, delivery: &'a Delivery) -> Self {
        Report {
            destination: delivery.path.last().copied().unwrap_or(0),
            payload_len: delivery.payload.len(),
            path: &delivery.path,
            path_slots: delivery.path_slots(router.hypercube().path_capacity()),
            bystanders: delivery.bystanders.len(),
            transmissions: delivery.stats.transmissions(),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();
    let args = Args::parse();

    let router = Router::new(RouterConfig {
        nodes: args.nodes,
        timeout: args.timeout,
        return_leg: args.return_leg,
    })?;
    info!("routing with {:?}, dimension {}", router.config(), router.hypercube().dimension());

    match args.command {
        Command::Route { destination, payload, file } => {
            let payload = match (payload, file) {
                (_, Some(file)) => tokio::fs::read(file).await?,
                (Some(payload), None) => payload.into_bytes(),
                (None, None) => Vec::new(),
            };
            let delivery = router.route_verified(payload, destination).await?;
            let report = Report::new(&router, &delivery);
            if args.json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                println!("path: {:?}", report.path);
                println!("payload: {} bytes", report.payload_len);
                println!("bystanders released: {}", report.bystanders);
                println!("transmissions: {}", report.transmissions);
            }
        },
        Command::Trace { destination } => {
            let trace = router.trace(destination)?;
            if args.json {
                println!("{}", serde_json::to_string(&trace)?);
            } else {
                println!("{:?}", &*trace);
            }
        },
        Command::Survey { payload } => {
            let mut failed = 0;
            let mut reports = Vec::new();
            let results = router.survey(payload.as_bytes()).await;
            for (node, result) in &results {
                match result {
                    Ok(delivery) => reports.push(Report::new(&router, delivery)),
                    Err(err) => {
                        error!("route to {node} failed: {err}");
                        failed += 1;
                    },
                }
            }
            if args.json {
                println!("{}", serde_json::to_string_pretty(&reports)?);
            } else {
                for report in &reports {
                    println!("{:>4}: {:?}", report.destination, report.path);
                }
            }
            if failed > 0 {
                bail!("{failed} of {} routes failed", results.len());
            }
        },
    }
    Ok(())
}
