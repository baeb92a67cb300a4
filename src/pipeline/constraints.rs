// src/pipeline/constraints.rs

//! Admission preconditions evaluated once when a pipeline is submitted.

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use tokio::net::TcpStream;
use tokio::time::timeout;
use tracing::{debug, info, warn};

use crate::errors::{Result, StagelineError};
use crate::pipeline::unit_info::UnitSpec;

/// Preconditions attached to a single unit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Constraints {
    pub require_network: bool,
}

impl Constraints {
    pub fn network() -> Self {
        Self {
            require_network: true,
        }
    }
}

/// Answers "is the network currently reachable?".
pub trait ConnectivityProbe: Send + Sync {
    fn is_connected(&self) -> Pin<Box<dyn Future<Output = bool> + Send + '_>>;
}

/// Probe that opens a TCP connection to a fixed address.
#[derive(Debug, Clone)]
pub struct TcpProbe {
    addr: String,
    timeout: Duration,
}

impl TcpProbe {
    pub fn new(addr: impl Into<String>, timeout: Duration) -> Self {
        Self {
            addr: addr.into(),
            timeout,
        }
    }
}

impl ConnectivityProbe for TcpProbe {
    fn is_connected(&self) -> Pin<Box<dyn Future<Output = bool> + Send + '_>> {
        Box::pin(async move {
            match timeout(self.timeout, TcpStream::connect(&self.addr)).await {
                Ok(Ok(_stream)) => {
                    debug!(addr = %self.addr, "connectivity probe succeeded");
                    true
                }
                Ok(Err(e)) => {
                    warn!(addr = %self.addr, error = %e, "connectivity probe failed");
                    false
                }
                Err(_) => {
                    warn!(
                        addr = %self.addr,
                        timeout = ?self.timeout,
                        "connectivity probe timed out"
                    );
                    false
                }
            }
        })
    }
}

/// Probe with a fixed answer (tests, `--offline`).
#[derive(Debug, Clone, Copy)]
pub struct FixedConnectivity(pub bool);

impl ConnectivityProbe for FixedConnectivity {
    fn is_connected(&self) -> Pin<Box<dyn Future<Output = bool> + Send + '_>> {
        let connected = self.0;
        Box::pin(async move { connected })
    }
}

/// Evaluate the constraints of every unit once.
///
/// The probe is only consulted when at least one unit requires network.
/// Failure means no unit of the pipeline may start.
pub async fn check_admission(units: &[UnitSpec], probe: &dyn ConnectivityProbe) -> Result<()> {
    let needing_network: Vec<&str> = units
        .iter()
        .filter(|u| u.constraints.require_network)
        .map(|u| u.name.as_str())
        .collect();

    if needing_network.is_empty() {
        debug!("no unit requires network; admission granted");
        return Ok(());
    }

    if probe.is_connected().await {
        info!(units = ?needing_network, "network available; admission granted");
        Ok(())
    } else {
        Err(StagelineError::PreconditionUnmet(format!(
            "network connectivity required by {:?} is unavailable",
            needing_network
        )))
    }
}
