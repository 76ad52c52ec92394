use std::time::Duration;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// How the destination hands the message back to the source.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
pub enum ReturnLeg {
    /// Straight to address `0` over an arbitrary point-to-point link.
    #[default]
    Direct,
    /// Hop by hop back along the recorded path, using hypercube links only.
    Retrace,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouterConfig {
    pub nodes: u32,
    /// Upper bound on how long any node waits for its packet.
    pub timeout: Duration,
    pub return_leg: ReturnLeg,
}

impl Default for RouterConfig {
    fn default() -> Self {
        RouterConfig {
            nodes: 8,
            timeout: Duration::from_secs(10),
            return_leg: ReturnLeg::Direct,
        }
    }
}

impl RouterConfig {
    pub fn new(nodes: u32) -> Self {
        RouterConfig { nodes, ..Default::default() }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_return_leg(mut self, return_leg: ReturnLeg) -> Self {
        self.return_leg = return_leg;
        self
    }
}
