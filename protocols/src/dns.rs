use std::net::Ipv4Addr;

use anyhow::{Context, bail};
use dns_parser::{Builder, Packet, QueryClass, QueryType, RData, ResponseCode};

pub const DNS_PORT: u16 = 53;

/// Reverse-lookup name for an address, e.g. `5.0.0.10.in-addr.arpa`.
pub fn reverse_address_to_ptr(ip: &Ipv4Addr) -> String {
    let [a, b, c, d] = ip.octets();
    format!("{d}.{c}.{b}.{a}.in-addr.arpa")
}

pub fn next_transaction_id() -> u16 {
    rand::random()
}

/// Builds a recursive PTR query for `ip`.
pub fn create_ptr_packet(ip: &Ipv4Addr, id: u16) -> anyhow::Result<Vec<u8>> {
    let name: String = reverse_address_to_ptr(ip);
    let mut builder = Builder::new_query(id, true);
    builder.add_question(&name, false, QueryType::PTR, QueryClass::IN);
    match builder.build() {
        Ok(bytes) => Ok(bytes),
        Err(_truncated) => bail!("PTR query for {ip} does not fit a single datagram"),
    }
}

/// Extracts the transaction id and the first PTR target from a response.
pub fn get_hostname(payload: &[u8]) -> anyhow::Result<(u16, String)> {
    let packet = Packet::parse(payload).context("failed to parse DNS packet")?;
    let transaction_id: u16 = packet.header.id;

    if packet.header.query {
        bail!("packet {transaction_id} is a query, not a response");
    }
    if packet.header.response_code != ResponseCode::NoError {
        bail!(
            "server answered {transaction_id} with {:?}",
            packet.header.response_code
        );
    }

    let hostname: String = packet
        .answers
        .iter()
        .find_map(|record| match &record.data {
            RData::PTR(ptr) => Some(ptr.0.to_string()),
            _ => None,
        })
        .filter(|name| !name.is_empty())
        .context("no PTR record in response")?;

    Ok((transaction_id, hostname.trim_end_matches('.').to_string()))
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

    fn encode_name(name: &str) -> Vec<u8> {
        let mut encoded: Vec<u8> = Vec::new();
        for label in name.split('.').filter(|l| !l.is_empty()) {
            encoded.push(label.len() as u8);
            encoded.extend_from_slice(label.as_bytes());
        }
        encoded.push(0);
        encoded
    }

    fn ptr_response(id: u16, rcode: u8, target: Option<&str>) -> Vec<u8> {
        let mut pkt: Vec<u8> = Vec::new();
        pkt.extend_from_slice(&id.to_be_bytes());
        pkt.extend_from_slice(&[0x81, 0x80 | rcode]);
        pkt.extend_from_slice(&1u16.to_be_bytes());
        pkt.extend_from_slice(&(target.is_some() as u16).to_be_bytes());
        pkt.extend_from_slice(&[0, 0, 0, 0]);
        pkt.extend(encode_name("5.0.0.10.in-addr.arpa"));
        pkt.extend_from_slice(&[0, 12, 0, 1]);
        if let Some(target) = target {
            let rdata = encode_name(target);
            // name compressed to the question at offset 12
            pkt.extend_from_slice(&[0xc0, 0x0c, 0, 12, 0, 1, 0, 0, 0x0e, 0x10]);
            pkt.extend_from_slice(&(rdata.len() as u16).to_be_bytes());
            pkt.extend(rdata);
        }
        pkt
    }

    #[test]
    fn reverse_name_flips_octets() {
        let ip = Ipv4Addr::new(192, 168, 0, 42);
        assert_eq!(reverse_address_to_ptr(&ip), "42.0.168.192.in-addr.arpa");
    }

    #[test]
    fn ptr_query_parses_back() {
        let ip = Ipv4Addr::new(10, 0, 0, 5);
        let bytes = create_ptr_packet(&ip, 0xbeef).unwrap();
        let packet = Packet::parse(&bytes).unwrap();

        assert_eq!(packet.header.id, 0xbeef);
        assert!(packet.header.query);
        assert!(packet.header.recursion_desired);
        assert_eq!(packet.questions.len(), 1);
        assert_eq!(packet.questions[0].qname.to_string(), "5.0.0.10.in-addr.arpa");
        assert_eq!(packet.questions[0].qtype, QueryType::PTR);
    }

    #[test]
    fn hostname_from_ptr_answer() {
        let bytes = ptr_response(0x1234, 0, Some("nas.lan"));
        let (id, hostname) = get_hostname(&bytes).unwrap();
        assert_eq!(id, 0x1234);
        assert_eq!(hostname, "nas.lan");
    }

    #[test]
    fn nxdomain_and_empty_answers_fail() {
        assert!(get_hostname(&ptr_response(7, 3, None)).is_err());
        assert!(get_hostname(&ptr_response(7, 0, None)).is_err());
        assert!(get_hostname(&[0u8; 5]).is_err());
    }

    #[test]
    fn queries_are_not_answers() {
        let query = create_ptr_packet(&Ipv4Addr::new(10, 0, 0, 5), 1).unwrap();
        assert!(get_hostname(&query).is_err());
    }
}
