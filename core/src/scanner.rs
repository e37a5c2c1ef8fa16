//! Subnet sweeping.
//!
//! [`SubnetScanner`] fans a [`HostProber`] out over every usable address of a
//! block. Two pools bound the work: `host_concurrency` hosts at once, and
//! inside each host `port_concurrency` port probes at once. Records are
//! collected in completion order; callers must not rely on address order.

use std::sync::Arc;

use ecomap_common::DiscoveryError;
use ecomap_common::config::EngineSettings;
use ecomap_common::network::range::{self, Ipv4Range};
use ecomap_common::network::topology::ServerRecord;
use pnet::ipnetwork::Ipv4Network;
use tokio::sync::Semaphore;
use tokio::task::{JoinError, JoinSet};
use tracing::{debug, error, info};

use crate::network::transport::Transport;

pub mod host;
pub mod resolver;

use host::HostProber;

/// Invoked with the running number of live hosts each time one is found.
pub type ProgressCallback = Arc<dyn Fn(usize) + Send + Sync>;

pub struct SubnetScanner {
    prober: Arc<HostProber>,
    host_concurrency: usize,
    on_host_found: Option<ProgressCallback>,
}

impl SubnetScanner {
    pub fn new(transport: Arc<dyn Transport>, settings: Arc<EngineSettings>) -> Self {
        let sockets = Arc::new(Semaphore::new(settings.config.max_sockets));
        Self::with_sockets(transport, settings, sockets)
    }

    /// Scanner whose probes draw on a socket ceiling owned by the caller.
    pub fn with_sockets(
        transport: Arc<dyn Transport>,
        settings: Arc<EngineSettings>,
        sockets: Arc<Semaphore>,
    ) -> Self {
        let host_concurrency = settings.config.host_concurrency;
        Self {
            prober: Arc::new(HostProber::with_sockets(transport, settings, sockets)),
            host_concurrency,
            on_host_found: None,
        }
    }

    pub fn with_progress(mut self, callback: ProgressCallback) -> Self {
        self.on_host_found = Some(callback);
        self
    }

    /// Sweeps the block named by `subnet` (CIDR notation).
    ///
    /// A malformed subnet is the only error. An unreachable network is a
    /// successful, empty sweep.
    pub async fn scan(&self, subnet: &str) -> Result<Vec<ServerRecord>, DiscoveryError> {
        let net = Self::parse_subnet(subnet)?;
        Ok(self.scan_network(&net).await)
    }

    /// Parses a sweep target, logging the rejection of malformed input.
    pub fn parse_subnet(subnet: &str) -> Result<Ipv4Network, DiscoveryError> {
        range::parse_cidr(subnet).inspect_err(|e| error!("{e}"))
    }

    pub async fn scan_network(&self, net: &Ipv4Network) -> Vec<ServerRecord> {
        let targets: Ipv4Range = range::usable_hosts(net);
        info!(
            "Scanning {net}: {} addresses from {} to {}",
            targets.len(),
            targets.start_addr,
            targets.end_addr
        );

        let pool = Arc::new(Semaphore::new(self.host_concurrency));
        let mut probes: JoinSet<Option<ServerRecord>> = JoinSet::new();
        let mut found: Vec<ServerRecord> = Vec::new();

        for addr in targets.to_iter() {
            let Ok(permit) = pool.clone().acquire_owned().await else {
                break;
            };
            let prober = Arc::clone(&self.prober);
            probes.spawn(async move {
                let _permit = permit;
                prober.probe(addr).await
            });

            while let Some(result) = probes.try_join_next() {
                self.collect(result, &mut found);
            }
        }

        while let Some(result) = probes.join_next().await {
            self.collect(result, &mut found);
        }

        info!("{} of {} addresses answered", found.len(), targets.len());
        found
    }

    fn collect(&self, result: Result<Option<ServerRecord>, JoinError>, found: &mut Vec<ServerRecord>) {
        match result {
            Ok(Some(record)) => {
                info!("Found server: {}", record.display_name());
                found.push(record);
                if let Some(callback) = &self.on_host_found {
                    callback(found.len());
                }
            }
            Ok(None) => {}
            Err(e) => debug!("host probe task failed: {e}"),
        }
    }
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
