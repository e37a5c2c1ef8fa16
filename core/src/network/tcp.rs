use std::io::ErrorKind;
use std::net::{Ipv4Addr, SocketAddrV4};
use std::time::Duration;

use tokio::net::TcpStream;
use tokio::time::timeout;
use tracing::trace;

/// How a target reacted to a TCP connection attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Handshake {
    /// The three-way handshake completed.
    Accepted,
    /// The target answered with a reset: nothing listens, but the host is there.
    Refused,
    /// Timed out, unreachable, or any other failure.
    Silent,
}

impl Handshake {
    pub fn is_open(self) -> bool {
        self == Handshake::Accepted
    }

    /// Whether the attempt proves that something answered at that address.
    pub fn host_answered(self) -> bool {
        matches!(self, Handshake::Accepted | Handshake::Refused)
    }
}

/// Attempts a TCP handshake with `target`. No data is sent; an established
/// stream is dropped (and closed) immediately.
pub async fn handshake(target: SocketAddrV4, probe_timeout: Duration) -> Handshake {
    match timeout(probe_timeout, TcpStream::connect(target)).await {
        Ok(Ok(_stream)) => Handshake::Accepted,
        Ok(Err(e)) if e.kind() == ErrorKind::ConnectionRefused => Handshake::Refused,
        Ok(Err(e)) => {
            trace!("{target}: {e}");
            Handshake::Silent
        }
        Err(_elapsed) => Handshake::Silent,
    }
}

/// `true` iff a handshake with `addr:port` completes within `probe_timeout`.
pub async fn probe_port(addr: Ipv4Addr, port: u16, probe_timeout: Duration) -> bool {
    handshake(SocketAddrV4::new(addr, port), probe_timeout)
        .await
        .is_open()
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
