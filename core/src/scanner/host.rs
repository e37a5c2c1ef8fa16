use std::net::{Ipv4Addr, SocketAddrV4};
use std::sync::Arc;
use std::time::Instant;

use ecomap_common::config::EngineSettings;
use ecomap_common::network::topology::ServerRecord;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio::time::timeout;
use tracing::{debug, trace};

use crate::network::transport::Transport;

/// Builds the [`ServerRecord`] of a single host.
///
/// Every sub-step is best-effort: a failed PTR lookup leaves the hostname
/// empty, a failed port probe leaves the port out. Only a missed liveness
/// probe drops the host.
pub struct HostProber {
    transport: Arc<dyn Transport>,
    settings: Arc<EngineSettings>,
    /// Run-wide socket ceiling: liveness, port probes and PTR lookups
    /// each hold one permit while their socket is open.
    sockets: Arc<Semaphore>,
}

impl HostProber {
    pub fn new(transport: Arc<dyn Transport>, settings: Arc<EngineSettings>) -> Self {
        let sockets = Arc::new(Semaphore::new(settings.config.max_sockets));
        Self::with_sockets(transport, settings, sockets)
    }

    /// Shares an existing socket ceiling instead of opening a new one.
    pub fn with_sockets(
        transport: Arc<dyn Transport>,
        settings: Arc<EngineSettings>,
        sockets: Arc<Semaphore>,
    ) -> Self {
        Self {
            transport,
            settings,
            sockets,
        }
    }

    pub async fn probe(&self, addr: Ipv4Addr) -> Option<ServerRecord> {
        let round_trip_latency: f64 = self.check_liveness(addr).await?;

        let (hostname, open_ports) =
            tokio::join!(self.resolve_hostname(addr), self.scan_ports(addr));

        let primary_access_port = primary_access_port(&open_ports, &self.settings.config.access_ports);
        let service_labels = self.settings.labels.for_ports(&open_ports);

        debug!(
            "{addr} alive in {round_trip_latency:.1}ms, open ports {:?}",
            open_ports
        );

        Some(ServerRecord {
            address: addr,
            hostname,
            open_ports,
            primary_access_port,
            service_labels,
            round_trip_latency,
            classified_role: None,
        })
    }

    /// Round trip in milliseconds, or `None` when nothing answered.
    async fn check_liveness(&self, addr: Ipv4Addr) -> Option<f64> {
        let config = &self.settings.config;
        let _socket = self.sockets.acquire().await.ok()?;

        let target = SocketAddrV4::new(addr, config.liveness_port);
        let started = Instant::now();
        let answer = self.transport.connect(target, config.liveness_timeout()).await;
        let elapsed = started.elapsed();

        if answer.host_answered() {
            Some(elapsed.as_secs_f64() * 1_000.0)
        } else {
            trace!("{addr} did not answer the liveness probe");
            None
        }
    }

    async fn resolve_hostname(&self, addr: Ipv4Addr) -> Option<String> {
        let config = &self.settings.config;
        if config.no_dns {
            return None;
        }
        let _socket = self.sockets.acquire().await.ok()?;
        let limit = config.resolution_timeout();
        timeout(limit, self.transport.reverse_lookup(addr, limit))
            .await
            .ok()
            .flatten()
    }

    /// Open candidate ports in ascending order.
    async fn scan_ports(&self, addr: Ipv4Addr) -> Vec<u16> {
        let config = &self.settings.config;
        let pool = Arc::new(Semaphore::new(config.port_concurrency));
        let mut probes: JoinSet<Option<u16>> = JoinSet::new();

        for &port in &self.settings.candidate_ports {
            let Ok(permit) = pool.clone().acquire_owned().await else {
                break;
            };
            let transport = Arc::clone(&self.transport);
            let sockets = Arc::clone(&self.sockets);
            let port_timeout = config.port_timeout();

            probes.spawn(async move {
                let _permit = permit;
                let _socket = sockets.acquire_owned().await.ok()?;
                transport
                    .probe_port(addr, port, port_timeout)
                    .await
                    .then_some(port)
            });
        }

        let mut open_ports: Vec<u16> = Vec::new();
        while let Some(result) = probes.join_next().await {
            match result {
                Ok(Some(port)) => open_ports.push(port),
                Ok(None) => {}
                Err(e) => trace!("port probe task for {addr} failed: {e}"),
            }
        }

        open_ports.sort_unstable();
        open_ports.dedup();
        open_ports
    }
}

/// First port of `priority` that is open.
pub fn primary_access_port(open_ports: &[u16], priority: &[u16]) -> Option<u16> {
    priority
        .iter()
        .copied()
        .find(|port| open_ports.binary_search(port).is_ok())
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
