//! The network seam of the engine.
//!
//! Probers never touch sockets directly; they go through [`Transport`], so
//! tests can replace the whole network with an in-memory fake.

use std::net::{Ipv4Addr, SocketAddrV4};
use std::time::Duration;

use async_trait::async_trait;

use crate::network::tcp::{self, Handshake};
use crate::scanner::resolver::HostnameResolver;

#[async_trait]
pub trait Transport: Send + Sync {
    /// Attempts a TCP handshake with `target` within `timeout`.
    async fn connect(&self, target: SocketAddrV4, timeout: Duration) -> Handshake;

    /// Reverse-resolves `addr`. Failures are `None`, never errors.
    async fn reverse_lookup(&self, addr: Ipv4Addr, timeout: Duration) -> Option<String>;

    /// `true` iff `addr:port` accepts a connection within `timeout`.
    async fn probe_port(&self, addr: Ipv4Addr, port: u16, timeout: Duration) -> bool {
        self.connect(SocketAddrV4::new(addr, port), timeout)
            .await
            .is_open()
    }
}

/// Real TCP connects and PTR lookups through the system nameserver.
#[derive(Debug, Clone, Default)]
pub struct SystemTransport {
    resolver: Option<HostnameResolver>,
}

impl SystemTransport {
    pub fn new(resolver: Option<HostnameResolver>) -> Self {
        Self { resolver }
    }

    /// Resolves hostnames through `/etc/resolv.conf` unless `no_dns` is set.
    pub fn from_system(no_dns: bool) -> Self {
        let resolver = if no_dns {
            None
        } else {
            HostnameResolver::from_system()
        };
        Self { resolver }
    }
}

#[async_trait]
impl Transport for SystemTransport {
    async fn connect(&self, target: SocketAddrV4, timeout: Duration) -> Handshake {
        tcp::handshake(target, timeout).await
    }

    async fn reverse_lookup(&self, addr: Ipv4Addr, timeout: Duration) -> Option<String> {
        match &self.resolver {
            Some(resolver) => resolver.lookup(addr, timeout).await,
            None => None,
        }
    }
}
