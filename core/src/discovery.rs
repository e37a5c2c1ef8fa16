//! # Topology Discovery Service
//!
//! Implements the "map the local ecosystem" use case.
//!
//! A run resolves the local network context once, sweeps its subnet,
//! classifies every live host and freezes the result into a
//! [`TopologySnapshot`]. The service also answers the two health questions
//! of the CLI: is the network reachable, and can the discovered servers be
//! logged into.

use std::collections::BTreeMap;
use std::net::{Ipv4Addr, SocketAddrV4};
use std::sync::Arc;

use ecomap_common::DiscoveryError;
use ecomap_common::config::EngineSettings;
use ecomap_common::network::topology::{
    DiscoveryState, LocalNetworkContext, ServerRecord, TopologySnapshot, UNKNOWN,
};
use pnet::ipnetwork::Ipv4Network;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, info, trace, warn};

use crate::classifier;
use crate::network::transport::{SystemTransport, Transport};
use crate::scanner::{ProgressCallback, SubnetScanner};
use crate::system::{self, ContextSource, SystemContext};

/// Application service for topology discovery.
///
/// Orchestrates a run by:
/// 1. resolving the [`LocalNetworkContext`] through a [`ContextSource`],
/// 2. delegating the sweep to the [`SubnetScanner`],
/// 3. assigning roles with the [`classifier`].
pub struct TopologyService {
    context: Box<dyn ContextSource>,
    transport: Arc<dyn Transport>,
    settings: Arc<EngineSettings>,
    /// `max_sockets` permits, shared by sweeps and health checks.
    sockets: Arc<Semaphore>,
    on_host_found: Option<ProgressCallback>,
}

impl TopologyService {
    pub fn new(
        context: Box<dyn ContextSource>,
        transport: Arc<dyn Transport>,
        settings: Arc<EngineSettings>,
    ) -> Self {
        let sockets = Arc::new(Semaphore::new(settings.config.max_sockets));
        Self {
            context,
            transport,
            settings,
            sockets,
            on_host_found: None,
        }
    }

    /// Real interfaces, real sockets.
    pub fn system(settings: Arc<EngineSettings>) -> Self {
        let transport = SystemTransport::from_system(settings.config.no_dns);
        Self::new(Box::new(SystemContext), Arc::new(transport), settings)
    }

    pub fn with_progress(mut self, callback: ProgressCallback) -> Self {
        self.on_host_found = Some(callback);
        self
    }

    /// Maps the subnet of the local network context.
    ///
    /// Never fails: an unresolvable context yields the "unknown" snapshot in
    /// the `Failed` state, an empty network yields an empty snapshot.
    pub async fn discover(&self) -> TopologySnapshot {
        let mut run = RunState::default();
        run.advance(DiscoveryState::ResolvingContext);

        let context = match self.context.resolve() {
            Ok(context) => context,
            Err(e) => {
                warn!("Discovery aborted: {e}");
                run.advance(DiscoveryState::Failed(e.to_string()));
                return TopologySnapshot::unknown(e.to_string());
            }
        };

        run.advance(DiscoveryState::Scanning);
        let subnet = context.subnet;
        self.assemble(run, context, &subnet).await
    }

    /// Maps an explicit subnet instead of the one of the local context.
    ///
    /// The rest of the context is still resolved; when that fails the
    /// snapshot carries the local hostname and "unknown" for the rest.
    pub async fn discover_subnet(&self, cidr: &str) -> Result<TopologySnapshot, DiscoveryError> {
        let subnet: Ipv4Network = SubnetScanner::parse_subnet(cidr)?;

        let mut run = RunState::default();
        run.advance(DiscoveryState::ResolvingContext);
        let context = match self.context.resolve() {
            Ok(context) => LocalNetworkContext { subnet, ..context },
            Err(e) => {
                debug!("Continuing without local context: {e}");
                detached_context(subnet)
            }
        };

        run.advance(DiscoveryState::Scanning);
        Ok(self.assemble(run, context, &subnet).await)
    }

    async fn assemble(
        &self,
        mut run: RunState,
        context: LocalNetworkContext,
        subnet: &Ipv4Network,
    ) -> TopologySnapshot {
        let mut scanner = SubnetScanner::with_sockets(
            Arc::clone(&self.transport),
            Arc::clone(&self.settings),
            Arc::clone(&self.sockets),
        );
        if let Some(callback) = &self.on_host_found {
            scanner = scanner.with_progress(Arc::clone(callback));
        }
        let mut servers: Vec<ServerRecord> = scanner.scan_network(subnet).await;

        run.advance(DiscoveryState::Classifying);
        classifier::assign_roles(&mut servers, &self.settings.catalog);

        let snapshot = TopologySnapshot::assembled(context, servers);
        run.advance(DiscoveryState::Assembled);
        info!(
            "Topology of {}: {} hosts, {} ecosystem servers",
            snapshot.subnet(),
            snapshot.total_hosts(),
            snapshot.ecosystem_servers().len()
        );
        snapshot
    }

    /// The gateway answers a liveness probe and the external probe address
    /// accepts a connection. A context without a gateway counts as reachable.
    pub async fn connectivity_ok(&self) -> bool {
        let config = &self.settings.config;
        let gateway: Option<Ipv4Addr> = match self.context.resolve() {
            Ok(context) => context.gateway,
            Err(e) => {
                debug!("No context for the gateway check: {e}");
                None
            }
        };

        let gateway_check = async {
            let Some(gateway) = gateway else {
                return true;
            };
            let Ok(_socket) = self.sockets.acquire().await else {
                return false;
            };
            self.transport
                .connect(SocketAddrV4::new(gateway, config.liveness_port), config.liveness_timeout())
                .await
                .host_answered()
        };
        let external_check = async {
            let Ok(_socket) = self.sockets.acquire().await else {
                return false;
            };
            self.transport
                .connect(config.external_probe, config.check_timeout())
                .await
                .is_open()
        };

        let (gateway_ok, external_ok) = tokio::join!(gateway_check, external_check);
        debug!("Gateway reachable: {gateway_ok}, {} reachable: {external_ok}", config.external_probe);
        gateway_ok && external_ok
    }

    /// Whether each record's primary access port accepts a connection.
    ///
    /// Records without an access port map to `false`. Checks run at most
    /// `max_sockets` at a time.
    pub async fn check_access(&self, records: &[ServerRecord]) -> BTreeMap<Ipv4Addr, bool> {
        let check_timeout = self.settings.config.check_timeout();
        let mut access: BTreeMap<Ipv4Addr, bool> = BTreeMap::new();
        let mut checks: JoinSet<(Ipv4Addr, bool)> = JoinSet::new();

        for record in records {
            let address = record.address;
            let Some(port) = record.primary_access_port else {
                access.insert(address, false);
                continue;
            };
            let Ok(socket) = Arc::clone(&self.sockets).acquire_owned().await else {
                access.insert(address, false);
                continue;
            };
            let transport = Arc::clone(&self.transport);
            checks.spawn(async move {
                let _socket = socket;
                let reachable = transport.probe_port(address, port, check_timeout).await;
                (address, reachable)
            });
        }

        while let Some(result) = checks.join_next().await {
            match result {
                Ok((address, reachable)) => {
                    access.insert(address, reachable);
                }
                Err(e) => trace!("access check task failed: {e}"),
            }
        }
        access
    }
}

/// Context for a sweep that does not come from a local interface.
fn detached_context(subnet: Ipv4Network) -> LocalNetworkContext {
    LocalNetworkContext {
        local_ip: Ipv4Addr::UNSPECIFIED,
        gateway: None,
        subnet,
        interface: UNKNOWN.to_string(),
        hostname: system::local_hostname(),
    }
}

/// Tracks the state of one run and logs every transition.
#[derive(Debug, Default)]
struct RunState {
    state: DiscoveryState,
}

impl RunState {
    fn advance(&mut self, next: DiscoveryState) {
        debug_assert!(
            self.state.can_advance_to(&next),
            "illegal transition {} -> {next}",
            self.state
        );
        debug!("Discovery: {} -> {next}", self.state);
        self.state = next;
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
