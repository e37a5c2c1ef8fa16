//! Loopback fixtures shared by the integration tests.

use std::collections::BTreeMap;
use std::net::{Ipv4Addr, SocketAddr};
use std::sync::Arc;

use ecomap_common::catalog::{PortLabels, ProfileCatalog, ServerProfile};
use ecomap_common::config::{EngineSettings, ScanConfig};
use ecomap_common::network::topology::LocalNetworkContext;
use ecomap_core::TopologyService;
use ecomap_core::network::transport::SystemTransport;
use ecomap_core::system::StaticContext;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

/// Open loopback ports that accept and immediately drop connections.
pub struct OpenPorts {
    pub ports: Vec<u16>,
    tasks: Vec<JoinHandle<()>>,
}

impl OpenPorts {
    pub async fn bind(count: usize) -> anyhow::Result<Self> {
        let mut ports = Vec::with_capacity(count);
        let mut tasks = Vec::with_capacity(count);

        for _ in 0..count {
            let listener = TcpListener::bind((Ipv4Addr::LOCALHOST, 0)).await?;
            ports.push(listener.local_addr()?.port());
            tasks.push(tokio::spawn(async move {
                while let Ok((stream, _)) = listener.accept().await {
                    drop(stream);
                }
            }));
        }

        Ok(Self { ports, tasks })
    }

    /// Stops listening; the ports refuse connections afterwards.
    pub async fn close(self) {
        for task in self.tasks {
            task.abort();
            let _ = task.await;
        }
    }
}

/// A loopback port nothing listens on.
pub async fn closed_port() -> anyhow::Result<u16> {
    let listener = TcpListener::bind((Ipv4Addr::LOCALHOST, 0)).await?;
    let SocketAddr::V4(addr) = listener.local_addr()? else {
        anyhow::bail!("bound to a non-IPv4 address");
    };
    drop(listener);
    Ok(addr.port())
}

/// Settings that only ever touch `candidate_ports`, with short timeouts.
pub fn loopback_settings(
    candidate_ports: Vec<u16>,
    liveness_port: u16,
    access_ports: Vec<u16>,
    profiles: Vec<ServerProfile>,
    labels: BTreeMap<u16, String>,
) -> anyhow::Result<Arc<EngineSettings>> {
    let config = ScanConfig {
        liveness_timeout_ms: 500,
        port_timeout_ms: 500,
        resolution_timeout_ms: 100,
        check_timeout_ms: 500,
        liveness_port,
        candidate_ports,
        access_ports,
        no_dns: true,
        profiles: Vec::new(),
        ..ScanConfig::default()
    };
    let catalog = ProfileCatalog::new(profiles)?;
    Ok(EngineSettings::with_catalog(config, catalog, PortLabels::new(labels))?)
}

pub fn loopback_context() -> LocalNetworkContext {
    LocalNetworkContext {
        local_ip: Ipv4Addr::LOCALHOST,
        gateway: None,
        subnet: "127.0.0.1/32".parse().expect("valid loopback block"),
        interface: "lo".into(),
        hostname: "loopback".into(),
    }
}

/// Real sockets, fixed loopback context, no DNS.
pub fn loopback_service(settings: Arc<EngineSettings>) -> TopologyService {
    TopologyService::new(
        Box::new(StaticContext::new(loopback_context())),
        Arc::new(SystemTransport::new(None)),
        settings,
    )
}
