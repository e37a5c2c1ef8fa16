use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4};
use std::path::Path;
use std::time::Duration;

use anyhow::Context;
use ecomap_protocols::dns::{self, DNS_PORT};
use tokio::net::UdpSocket;
use tokio::time::{Instant, timeout_at};
use tracing::trace;

const RESOLV_CONF: &str = "/etc/resolv.conf";
const MAX_DNS_PAYLOAD: usize = 512;

/// Reverse (PTR) lookups against a single nameserver over UDP.
#[derive(Debug, Clone)]
pub struct HostnameResolver {
    nameserver: SocketAddrV4,
}

impl HostnameResolver {
    pub fn new(nameserver: SocketAddrV4) -> Self {
        Self { nameserver }
    }

    /// Uses the first IPv4 nameserver of the system resolver configuration.
    pub fn from_system() -> Option<Self> {
        let content = std::fs::read_to_string(Path::new(RESOLV_CONF)).ok()?;
        let nameserver = parse_nameserver(&content)?;
        trace!("Using nameserver {nameserver} for PTR lookups");
        Some(Self::new(SocketAddrV4::new(nameserver, DNS_PORT)))
    }

    /// Resolves `ip` to a hostname, or `None` on any failure or timeout.
    pub async fn lookup(&self, ip: Ipv4Addr, lookup_timeout: Duration) -> Option<String> {
        match self.query(ip, lookup_timeout).await {
            Ok(hostname) => Some(hostname),
            Err(e) => {
                trace!("PTR lookup for {ip} failed: {e:#}");
                None
            }
        }
    }

    async fn query(&self, ip: Ipv4Addr, lookup_timeout: Duration) -> anyhow::Result<String> {
        let deadline: Instant = Instant::now() + lookup_timeout;
        let id: u16 = dns::next_transaction_id();
        let packet: Vec<u8> = dns::create_ptr_packet(&ip, id)?;

        let socket = UdpSocket::bind((Ipv4Addr::UNSPECIFIED, 0))
            .await
            .context("binding udp socket")?;
        socket
            .send_to(&packet, SocketAddr::V4(self.nameserver))
            .await
            .context("sending PTR query")?;

        let mut buf = [0u8; MAX_DNS_PAYLOAD];
        loop {
            let (len, from) = timeout_at(deadline, socket.recv_from(&mut buf))
                .await
                .context("PTR lookup timed out")??;

            if from != SocketAddr::V4(self.nameserver) {
                continue;
            }
            // Stray or malformed datagrams are skipped until the deadline.
            match dns::get_hostname(&buf[..len]) {
                Ok((response_id, hostname)) if response_id == id => return Ok(hostname),
                Ok(_) => continue,
                Err(e) => trace!("ignoring DNS datagram: {e}"),
            }
        }
    }
}

/// First IPv4 `nameserver` entry of a resolv.conf.
pub fn parse_nameserver(content: &str) -> Option<Ipv4Addr> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.starts_with('#') && !line.starts_with(';'))
        .filter_map(|line| {
            let mut fields = line.split_whitespace();
            match fields.next() {
                Some("nameserver") => fields.next()?.parse::<Ipv4Addr>().ok(),
                _ => None,
            }
        })
        .next()
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
