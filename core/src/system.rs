//! Local network context: who we are on the LAN and which block to sweep.

use std::net::Ipv4Addr;

use ecomap_common::DiscoveryError;
use ecomap_common::network::interface;
use ecomap_common::network::topology::{LocalNetworkContext, UNKNOWN};
use pnet::datalink::{self, NetworkInterface};
use sysinfo::{System, SystemExt};
use tracing::{debug, warn};

#[cfg(target_os = "linux")]
const ROUTE_TABLE: &str = "/proc/net/route";

/// Source of the [`LocalNetworkContext`] for a run.
pub trait ContextSource: Send + Sync {
    fn resolve(&self) -> Result<LocalNetworkContext, DiscoveryError>;
}

/// Reads the context from the host's interfaces and routing table.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemContext;

impl ContextSource for SystemContext {
    fn resolve(&self) -> Result<LocalNetworkContext, DiscoveryError> {
        let route: Option<(String, Ipv4Addr)> = default_route();
        let route_iface: Option<&str> = route.as_ref().map(|(name, _)| name.as_str());

        let iface: NetworkInterface = interface::select_lan_interface(datalink::interfaces(), route_iface)
            .ok_or_else(|| DiscoveryError::ContextUnavailable("no viable LAN interface".into()))?;

        let local = interface::lan_ipv4(&iface).ok_or_else(|| {
            DiscoveryError::ContextUnavailable(format!("{} has no private IPv4 address", iface.name))
        })?;
        let subnet = interface::scan_network(local)
            .map_err(|e| DiscoveryError::ContextUnavailable(e.to_string()))?;
        if subnet.prefix() > local.prefix() {
            warn!("{local} is wider than /{}, sweeping {subnet} only", interface::MIN_SCAN_PREFIX);
        }

        // The routed gateway only belongs to this context if it leaves through the same interface.
        let gateway: Option<Ipv4Addr> = route
            .filter(|(name, _)| *name == iface.name)
            .map(|(_, gateway)| gateway);

        let context = LocalNetworkContext {
            local_ip: local.ip(),
            gateway,
            subnet,
            interface: iface.name.clone(),
            hostname: local_hostname(),
        };
        debug!(
            "Local context: {} on {} ({}), gateway {:?}",
            context.local_ip, context.interface, context.subnet, context.gateway
        );
        Ok(context)
    }
}

/// A fixed context, or a fixed failure.
#[derive(Debug, Clone)]
pub struct StaticContext(Result<LocalNetworkContext, String>);

impl StaticContext {
    pub fn new(context: LocalNetworkContext) -> Self {
        Self(Ok(context))
    }

    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self(Err(reason.into()))
    }
}

impl ContextSource for StaticContext {
    fn resolve(&self) -> Result<LocalNetworkContext, DiscoveryError> {
        self.0.clone().map_err(DiscoveryError::ContextUnavailable)
    }
}

pub fn local_hostname() -> String {
    System::new().host_name().unwrap_or_else(|| UNKNOWN.to_string())
}

#[cfg(target_os = "linux")]
fn default_route() -> Option<(String, Ipv4Addr)> {
    let table = std::fs::read_to_string(ROUTE_TABLE).ok()?;
    parse_default_route(&table)
}

#[cfg(not(target_os = "linux"))]
fn default_route() -> Option<(String, Ipv4Addr)> {
    None
}

/// Interface and gateway of the default route in a `/proc/net/route` table.
///
/// Addresses in that table are hex in host byte order.
pub fn parse_default_route(table: &str) -> Option<(String, Ipv4Addr)> {
    table.lines().skip(1).find_map(|line| {
        let fields: Vec<&str> = line.split_whitespace().collect();
        let [iface, destination, gateway, ..] = fields.as_slice() else {
            return None;
        };
        if *destination != "00000000" {
            return None;
        }
        let raw = u32::from_str_radix(gateway, 16).ok()?;
        let gateway = Ipv4Addr::from(raw.to_ne_bytes());
        (!gateway.is_unspecified()).then(|| (iface.to_string(), gateway))
    })
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
