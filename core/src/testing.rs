//! In-memory network used by the unit tests.

use std::collections::{BTreeSet, HashMap};
use std::net::{Ipv4Addr, SocketAddrV4};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use ecomap_common::config::{EngineSettings, ScanConfig};

use crate::network::tcp::Handshake;
use crate::network::transport::Transport;

#[derive(Debug, Clone, Default)]
pub struct FakeHost {
    pub open: BTreeSet<u16>,
    pub hostname: Option<String>,
    /// Drops every packet, including liveness.
    pub firewalled: bool,
}

#[derive(Debug, Default)]
pub struct FakeNetwork {
    hosts: HashMap<Ipv4Addr, FakeHost>,
    dns_delay: Option<Duration>,
    connect_delay: Duration,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    connects: AtomicUsize,
    /// Connects and lookups together.
    sockets_in_flight: AtomicUsize,
    max_sockets_in_flight: AtomicUsize,
}

/// One open socket; released on drop so a timed-out caller still gives it back.
struct OpenSocket<'a> {
    in_flight: &'a AtomicUsize,
}

impl Drop for OpenSocket<'_> {
    fn drop(&mut self) {
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}

impl FakeNetwork {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn host(mut self, addr: Ipv4Addr, open: &[u16], hostname: Option<&str>) -> Self {
        self.hosts.insert(
            addr,
            FakeHost {
                open: open.iter().copied().collect(),
                hostname: hostname.map(String::from),
                firewalled: false,
            },
        );
        self
    }

    pub fn firewalled(mut self, addr: Ipv4Addr) -> Self {
        self.hosts.insert(
            addr,
            FakeHost {
                firewalled: true,
                ..FakeHost::default()
            },
        );
        self
    }

    pub fn dns_delay(mut self, delay: Duration) -> Self {
        self.dns_delay = Some(delay);
        self
    }

    pub fn connect_delay(mut self, delay: Duration) -> Self {
        self.connect_delay = delay;
        self
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    pub fn connects(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }

    pub fn max_sockets_in_flight(&self) -> usize {
        self.max_sockets_in_flight.load(Ordering::SeqCst)
    }

    fn open_socket(&self) -> OpenSocket<'_> {
        let now = self.sockets_in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_sockets_in_flight.fetch_max(now, Ordering::SeqCst);
        OpenSocket {
            in_flight: &self.sockets_in_flight,
        }
    }
}

#[async_trait]
impl Transport for FakeNetwork {
    async fn connect(&self, target: SocketAddrV4, _timeout: Duration) -> Handshake {
        self.connects.fetch_add(1, Ordering::SeqCst);
        let _socket = self.open_socket();
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        if self.connect_delay.is_zero() {
            tokio::task::yield_now().await;
        } else {
            tokio::time::sleep(self.connect_delay).await;
        }

        let result = match self.hosts.get(target.ip()) {
            Some(host) if host.firewalled => Handshake::Silent,
            Some(host) if host.open.contains(&target.port()) => Handshake::Accepted,
            Some(_) => Handshake::Refused,
            None => Handshake::Silent,
        };

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        result
    }

    async fn reverse_lookup(&self, addr: Ipv4Addr, _timeout: Duration) -> Option<String> {
        let _socket = self.open_socket();
        match self.dns_delay {
            Some(delay) => tokio::time::sleep(delay).await,
            None => tokio::task::yield_now().await,
        }
        self.hosts.get(&addr).and_then(|host| host.hostname.clone())
    }
}

/// Short timeouts and the default catalog.
pub fn fast_settings() -> Arc<EngineSettings> {
    let config = ScanConfig {
        liveness_timeout_ms: 50,
        port_timeout_ms: 50,
        resolution_timeout_ms: 50,
        ..ScanConfig::default()
    };
    EngineSettings::new(config).expect("default config is valid")
}
