//! # Topology Model
//!
//! The values a discovery run produces: the local network context, one
//! [`ServerRecord`] per live host, and the [`TopologySnapshot`] tying them
//! together.

use std::collections::BTreeMap;
use std::fmt;
use std::net::Ipv4Addr;

use pnet::ipnetwork::Ipv4Network;
use serde::Serialize;

/// Sentinel rendered for every context field of a run that could not
/// determine its local network.
pub const UNKNOWN: &str = "unknown";

/// Where this machine sits on the network. Resolved once per run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalNetworkContext {
    pub local_ip: Ipv4Addr,
    pub gateway: Option<Ipv4Addr>,
    pub subnet: Ipv4Network,
    pub interface: String,
    pub hostname: String,
}

/// A host that answered the liveness probe.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ServerRecord {
    pub address: Ipv4Addr,
    pub hostname: Option<String>,
    /// Strictly ascending, drawn only from the candidate port list.
    pub open_ports: Vec<u16>,
    pub primary_access_port: Option<u16>,
    pub service_labels: BTreeMap<u16, String>,
    /// Liveness round trip in milliseconds.
    pub round_trip_latency: f64,
    pub classified_role: Option<String>,
}

impl ServerRecord {
    /// Ecosystem members carry a role, a remote-access port and more than one
    /// open port. A lone open port is not enough evidence.
    pub fn is_ecosystem_member(&self) -> bool {
        self.classified_role.is_some()
            && self.primary_access_port.is_some()
            && self.open_ports.len() > 1
    }

    pub fn display_name(&self) -> String {
        match &self.hostname {
            Some(name) => format!("{} ({})", self.address, name),
            None => self.address.to_string(),
        }
    }
}

/// Where a discovery run ended up.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum DiscoveryState {
    #[default]
    Idle,
    ResolvingContext,
    Scanning,
    Classifying,
    Assembled,
    Failed(String),
}

impl DiscoveryState {
    /// Whether `next` is a legal successor of `self`.
    ///
    /// `Failed` is only reachable while resolving the local context; every
    /// later stage degrades to partial results instead.
    pub fn can_advance_to(&self, next: &DiscoveryState) -> bool {
        use DiscoveryState::*;
        matches!(
            (self, next),
            (Idle, ResolvingContext)
                | (ResolvingContext, Scanning)
                | (ResolvingContext, Failed(_))
                | (Scanning, Classifying)
                | (Classifying, Assembled)
        )
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, DiscoveryState::Assembled | DiscoveryState::Failed(_))
    }
}

impl fmt::Display for DiscoveryState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DiscoveryState::Idle => write!(f, "idle"),
            DiscoveryState::ResolvingContext => write!(f, "resolving context"),
            DiscoveryState::Scanning => write!(f, "scanning"),
            DiscoveryState::Classifying => write!(f, "classifying"),
            DiscoveryState::Assembled => write!(f, "assembled"),
            DiscoveryState::Failed(reason) => write!(f, "failed: {reason}"),
        }
    }
}

/// The immutable result of one discovery run.
#[derive(Debug, Clone)]
pub struct TopologySnapshot {
    context: Option<LocalNetworkContext>,
    servers: Vec<ServerRecord>,
    ecosystem_servers: Vec<ServerRecord>,
    state: DiscoveryState,
}

impl TopologySnapshot {
    /// Builds an assembled snapshot; membership is derived from `servers`.
    pub fn assembled(context: LocalNetworkContext, servers: Vec<ServerRecord>) -> Self {
        let ecosystem_servers: Vec<ServerRecord> = servers
            .iter()
            .filter(|record| record.is_ecosystem_member())
            .cloned()
            .collect();

        Self {
            context: Some(context),
            servers,
            ecosystem_servers,
            state: DiscoveryState::Assembled,
        }
    }

    /// The snapshot of a run whose local context could not be resolved.
    ///
    /// Callers must treat this as terminal for the run; retrying the same run
    /// will not make the subnet appear.
    pub fn unknown(reason: impl Into<String>) -> Self {
        Self {
            context: None,
            servers: Vec::new(),
            ecosystem_servers: Vec::new(),
            state: DiscoveryState::Failed(reason.into()),
        }
    }

    pub fn servers(&self) -> &[ServerRecord] {
        &self.servers
    }

    pub fn ecosystem_servers(&self) -> &[ServerRecord] {
        &self.ecosystem_servers
    }

    pub fn state(&self) -> &DiscoveryState {
        &self.state
    }

    pub fn total_hosts(&self) -> usize {
        self.servers.len()
    }

    pub fn is_unknown(&self) -> bool {
        self.context.is_none()
    }

    pub fn ecosystem_present(&self) -> bool {
        !self.ecosystem_servers.is_empty()
    }

    pub fn local_ip(&self) -> String {
        self.context
            .as_ref()
            .map_or_else(|| UNKNOWN.to_string(), |ctx| ctx.local_ip.to_string())
    }

    pub fn subnet(&self) -> String {
        self.context
            .as_ref()
            .map_or_else(|| UNKNOWN.to_string(), |ctx| ctx.subnet.to_string())
    }

    pub fn gateway(&self) -> String {
        self.context
            .as_ref()
            .and_then(|ctx| ctx.gateway)
            .map_or_else(|| UNKNOWN.to_string(), |gw| gw.to_string())
    }

    pub fn interface(&self) -> String {
        self.context
            .as_ref()
            .map_or_else(|| UNKNOWN.to_string(), |ctx| ctx.interface.clone())
    }

    pub fn hostname(&self) -> String {
        self.context
            .as_ref()
            .map_or_else(|| UNKNOWN.to_string(), |ctx| ctx.hostname.clone())
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
