//! JSON rendering of a [`TopologySnapshot`].

use std::fs;
use std::io;
use std::net::Ipv4Addr;
use std::path::Path;

use ecomap_common::DiscoveryError;
use ecomap_common::network::topology::{ServerRecord, TopologySnapshot};
use serde::Serialize;
use tracing::info;

#[derive(Serialize)]
struct SnapshotView<'a> {
    local_ip: String,
    gateway: String,
    subnet: String,
    interface: String,
    hostname: String,
    state: String,
    total_hosts: usize,
    ecosystem_present: bool,
    servers: &'a [ServerRecord],
    ecosystem_servers: Vec<MemberView<'a>>,
}

/// Abbreviated ecosystem entry.
#[derive(Serialize)]
struct MemberView<'a> {
    address: Ipv4Addr,
    hostname: Option<&'a str>,
    classified_role: Option<&'a str>,
    open_ports: &'a [u16],
}

impl<'a> From<&'a ServerRecord> for MemberView<'a> {
    fn from(record: &'a ServerRecord) -> Self {
        Self {
            address: record.address,
            hostname: record.hostname.as_deref(),
            classified_role: record.classified_role.as_deref(),
            open_ports: &record.open_ports,
        }
    }
}

impl<'a> From<&'a TopologySnapshot> for SnapshotView<'a> {
    fn from(snapshot: &'a TopologySnapshot) -> Self {
        Self {
            local_ip: snapshot.local_ip(),
            gateway: snapshot.gateway(),
            subnet: snapshot.subnet(),
            interface: snapshot.interface(),
            hostname: snapshot.hostname(),
            state: snapshot.state().to_string(),
            total_hosts: snapshot.total_hosts(),
            ecosystem_present: snapshot.ecosystem_present(),
            servers: snapshot.servers(),
            ecosystem_servers: snapshot.ecosystem_servers().iter().map(MemberView::from).collect(),
        }
    }
}

/// Pretty-printed JSON document of `snapshot`.
pub fn to_json(snapshot: &TopologySnapshot) -> serde_json::Result<String> {
    serde_json::to_string_pretty(&SnapshotView::from(snapshot))
}

pub fn write_json(snapshot: &TopologySnapshot, path: &Path) -> Result<(), DiscoveryError> {
    let json = to_json(snapshot).map_err(io::Error::from)?;
    fs::write(path, json)?;
    info!("Topology written to {}", path.display());
    Ok(())
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
