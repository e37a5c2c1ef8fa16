use std::net::Ipv4Addr;

use pnet::ipnetwork::Ipv4Network;

use crate::error::DiscoveryError;

/// An inclusive span of IPv4 addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Ipv4Range {
    pub start_addr: Ipv4Addr,
    pub end_addr: Ipv4Addr,
}

impl Ipv4Range {
    pub fn new(start_addr: Ipv4Addr, end_addr: Ipv4Addr) -> Self {
        Self {
            start_addr,
            end_addr,
        }
    }

    pub fn to_iter(&self) -> impl Iterator<Item = Ipv4Addr> + use<> {
        let start: u32 = self.start_addr.into();
        let end: u32 = self.end_addr.into();
        (start..=end).map(Ipv4Addr::from)
    }

    pub fn len(&self) -> usize {
        let start: u32 = self.start_addr.into();
        let end: u32 = self.end_addr.into();
        if end < start {
            0
        } else {
            (end - start) as usize + 1
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, addr: Ipv4Addr) -> bool {
        let ip: u32 = addr.into();
        u32::from(self.start_addr) <= ip && ip <= u32::from(self.end_addr)
    }
}

/// Parses CIDR notation like "192.168.1.0/24".
///
/// Host bits are allowed and masked away, so "192.168.1.77/24" names the
/// same block. A bare address is read as a /32.
pub fn parse_cidr(s: &str) -> Result<Ipv4Network, DiscoveryError> {
    let trimmed: &str = s.trim();
    let (ip_str, prefix) = match trimmed.split_once('/') {
        Some((ip_str, prefix_str)) => {
            let prefix = prefix_str
                .parse::<u8>()
                .map_err(|e| DiscoveryError::invalid_subnet(s, format!("bad prefix: {e}")))?;
            (ip_str, prefix)
        }
        None => (trimmed, 32),
    };

    let ipv4_addr = ip_str
        .parse::<Ipv4Addr>()
        .map_err(|e| DiscoveryError::invalid_subnet(s, format!("bad address: {e}")))?;

    let net = Ipv4Network::new(ipv4_addr, prefix).map_err(|e| DiscoveryError::invalid_subnet(s, e))?;
    normalize(net).map_err(|e| DiscoveryError::invalid_subnet(s, e))
}

/// Re-anchors a network on its network address.
pub fn normalize(net: Ipv4Network) -> anyhow::Result<Ipv4Network> {
    Ok(Ipv4Network::new(net.network(), net.prefix())?)
}

/// Usable host range of a block: network and broadcast addresses excluded.
///
/// /31 and /32 blocks have no separate network/broadcast address and are
/// returned whole.
pub fn usable_hosts(net: &Ipv4Network) -> Ipv4Range {
    let net_u32: u32 = u32::from(net.network());
    let broadcast_u32: u32 = u32::from(net.broadcast());

    if net.prefix() >= 31 {
        return Ipv4Range::new(net.network(), net.broadcast());
    }

    let start_u32 = net_u32.saturating_add(1);
    let end_u32 = broadcast_u32.saturating_sub(1);
    Ipv4Range::new(Ipv4Addr::from(start_u32), Ipv4Addr::from(end_u32))
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_cidr_masks_host_bits() {
        let net = parse_cidr("192.168.1.77/24").unwrap();
        assert_eq!(net.network(), Ipv4Addr::new(192, 168, 1, 0));
        assert_eq!(net.ip(), Ipv4Addr::new(192, 168, 1, 0));
        assert_eq!(net.prefix(), 24);
        assert_eq!(net.to_string(), "192.168.1.0/24");
    }

    #[test]
    fn parse_cidr_rejects_garbage() {
        assert!(parse_cidr("not-a-subnet").is_err());
        assert!(parse_cidr("10.0.0.0/33").is_err());
        assert!(parse_cidr("10.0.0.256/24").is_err());
        assert!(parse_cidr("10.0.0.0/").is_err());
        assert!(parse_cidr("").is_err());
        assert!(matches!(
            parse_cidr("10.0.0.0/abc"),
            Err(DiscoveryError::InvalidSubnet { .. })
        ));
    }

    #[test]
    fn bare_address_is_a_single_host() {
        let net = parse_cidr("10.0.0.5").unwrap();
        let range = usable_hosts(&net);
        assert_eq!(range.len(), 1);
        assert!(range.contains(Ipv4Addr::new(10, 0, 0, 5)));
    }

    #[test]
    fn usable_hosts_strips_network_and_broadcast() {
        let net = parse_cidr("192.168.0.0/24").unwrap();
        let range = usable_hosts(&net);
        assert_eq!(range.start_addr, Ipv4Addr::new(192, 168, 0, 1));
        assert_eq!(range.end_addr, Ipv4Addr::new(192, 168, 0, 254));
        assert_eq!(range.len(), 254);
        assert!(!range.contains(Ipv4Addr::new(192, 168, 0, 0)));
        assert!(!range.contains(Ipv4Addr::new(192, 168, 0, 255)));
    }

    #[test]
    fn usable_hosts_small_blocks() {
        let slash30 = usable_hosts(&parse_cidr("10.1.1.4/30").unwrap());
        let addrs: Vec<Ipv4Addr> = slash30.to_iter().collect();
        assert_eq!(addrs, vec![Ipv4Addr::new(10, 1, 1, 5), Ipv4Addr::new(10, 1, 1, 6)]);

        let slash31 = usable_hosts(&parse_cidr("10.1.1.4/31").unwrap());
        assert_eq!(slash31.len(), 2);
    }
}
