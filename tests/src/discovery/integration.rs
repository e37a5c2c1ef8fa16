#![cfg(test)]
use std::collections::BTreeMap;
use std::net::Ipv4Addr;
use std::sync::Arc;
use std::time::Duration;

use ecomap_common::catalog::ServerProfile;
use ecomap_common::config::EngineSettings;
use ecomap_common::network::topology::{DiscoveryState, UNKNOWN};
use ecomap_core::network::tcp;
use ecomap_core::network::transport::SystemTransport;
use ecomap_core::system::StaticContext;
use ecomap_core::{TopologyService, export};
use ecomap_integration_tests::{OpenPorts, closed_port, loopback_service, loopback_settings};
use serde_json::Value;

const LOCALHOST: Ipv4Addr = Ipv4Addr::LOCALHOST;

#[tokio::test]
async fn port_prober_tells_open_from_closed() -> anyhow::Result<()> {
    let open = OpenPorts::bind(1).await?;
    let closed = closed_port().await?;

    assert!(tcp::probe_port(LOCALHOST, open.ports[0], Duration::from_secs(1)).await);
    assert!(!tcp::probe_port(LOCALHOST, closed, Duration::from_secs(1)).await);
    Ok(())
}

/// Three listeners on loopback look like an inference box: the profile
/// expects four ports, three are open (75%).
#[tokio::test]
async fn loopback_server_is_discovered_and_classified() -> anyhow::Result<()> {
    let open = OpenPorts::bind(3).await?;
    let closed = closed_port().await?;
    let (shell, api, model) = (open.ports[0], open.ports[1], open.ports[2]);

    let mut candidates = open.ports.clone();
    candidates.push(closed);
    let profile = ServerProfile::new("llm_server", candidates.clone(), ["ollama"]);
    let labels = BTreeMap::from([(model, "ollama".to_string()), (closed, "unused".to_string())]);
    // Liveness hits the closed port: a refusal still proves the host exists.
    let settings = loopback_settings(candidates, closed, vec![shell], vec![profile], labels)?;

    let snapshot = loopback_service(settings).discover_subnet("127.0.0.1/32").await?;

    assert_eq!(snapshot.state(), &DiscoveryState::Assembled);
    assert_eq!(snapshot.total_hosts(), 1);
    let record = &snapshot.servers()[0];
    assert_eq!(record.address, LOCALHOST);

    let mut expected = vec![shell, api, model];
    expected.sort_unstable();
    assert_eq!(record.open_ports, expected);
    assert_eq!(record.primary_access_port, Some(shell));
    assert_eq!(record.service_labels, BTreeMap::from([(model, "ollama".to_string())]));
    assert_eq!(record.classified_role.as_deref(), Some("llm_server"));
    assert!(record.hostname.is_none());
    assert!(record.round_trip_latency >= 0.0);

    assert!(snapshot.ecosystem_present());
    assert_eq!(snapshot.ecosystem_servers()[0].address, LOCALHOST);
    Ok(())
}

#[tokio::test]
async fn single_open_port_is_not_a_member() -> anyhow::Result<()> {
    let open = OpenPorts::bind(1).await?;
    let port = open.ports[0];
    let profile = ServerProfile::new("solo", [port], Vec::<String>::new());
    let settings = loopback_settings(vec![port], port, vec![port], vec![profile], BTreeMap::new())?;

    let snapshot = loopback_service(settings).discover_subnet("127.0.0.1").await?;

    let record = &snapshot.servers()[0];
    assert_eq!(record.classified_role.as_deref(), Some("solo"));
    assert_eq!(record.primary_access_port, Some(port));
    assert!(!snapshot.ecosystem_present());
    Ok(())
}

#[tokio::test]
async fn check_access_follows_the_listener() -> anyhow::Result<()> {
    let open = OpenPorts::bind(2).await?;
    let closed = closed_port().await?;
    let access_port = open.ports[0];
    let settings = loopback_settings(open.ports.clone(), closed, vec![access_port], Vec::new(), BTreeMap::new())?;
    let service = loopback_service(settings);

    let snapshot = service.discover_subnet("127.0.0.1/32").await?;
    let access = service.check_access(snapshot.servers()).await;
    assert_eq!(access.get(&LOCALHOST), Some(&true));

    open.close().await;
    let access = service.check_access(snapshot.servers()).await;
    assert_eq!(access.get(&LOCALHOST), Some(&false));
    Ok(())
}

#[tokio::test]
async fn export_of_a_real_scan() -> anyhow::Result<()> {
    let open = OpenPorts::bind(2).await?;
    let closed = closed_port().await?;
    let profile = ServerProfile::new("workstation", open.ports.clone(), Vec::<String>::new());
    let settings = loopback_settings(
        open.ports.clone(),
        closed,
        vec![open.ports[1]],
        vec![profile],
        BTreeMap::new(),
    )?;

    let snapshot = loopback_service(settings).discover_subnet("127.0.0.1/32").await?;
    let json: Value = serde_json::from_str(&export::to_json(&snapshot)?)?;

    assert_eq!(json["subnet"], "127.0.0.1/32");
    assert_eq!(json["local_ip"], "127.0.0.1");
    assert_eq!(json["gateway"], UNKNOWN);
    assert_eq!(json["total_hosts"], 1);
    let member = &json["ecosystem_servers"][0];
    assert_eq!(member["address"], "127.0.0.1");
    assert_eq!(member["classified_role"], "workstation");
    assert_eq!(member["open_ports"].as_array().map(Vec::len), Some(2));
    Ok(())
}

#[tokio::test]
async fn unresolvable_context_gives_unknown_snapshot() -> anyhow::Result<()> {
    let closed = closed_port().await?;
    let settings = loopback_settings(vec![closed], closed, vec![closed], Vec::new(), BTreeMap::new())?;
    let service = TopologyService::new(
        Box::new(StaticContext::unavailable("no LAN interface")),
        Arc::new(SystemTransport::new(None)),
        settings,
    );

    let snapshot = service.discover().await;
    assert!(snapshot.is_unknown());
    assert!(matches!(snapshot.state(), DiscoveryState::Failed(_)));
    assert_eq!(snapshot.total_hosts(), 0);
    assert_eq!(snapshot.subnet(), UNKNOWN);
    Ok(())
}

/// Every 127/8 address routes to `lo` on Linux, so an unbound alias answers
/// the liveness probe with a refusal and is recorded without open ports.
#[cfg(target_os = "linux")]
#[tokio::test]
async fn loopback_block_sweep() -> anyhow::Result<()> {
    let open = OpenPorts::bind(1).await?;
    let closed = closed_port().await?;
    let settings = loopback_settings(open.ports.clone(), closed, Vec::new(), Vec::new(), BTreeMap::new())?;

    let snapshot = loopback_service(settings).discover_subnet("127.0.0.0/30").await?;

    let mut servers: Vec<(Ipv4Addr, Vec<u16>)> = snapshot
        .servers()
        .iter()
        .map(|record| (record.address, record.open_ports.clone()))
        .collect();
    servers.sort();
    assert_eq!(
        servers,
        vec![(LOCALHOST, open.ports.clone()), (Ipv4Addr::new(127, 0, 0, 2), Vec::new())]
    );
    Ok(())
}

#[tokio::test]
async fn invalid_subnet_is_rejected() -> anyhow::Result<()> {
    let closed = closed_port().await?;
    let settings = loopback_settings(vec![closed], closed, Vec::new(), Vec::new(), BTreeMap::new())?;
    let result = loopback_service(settings).discover_subnet("127.0.0.0/99").await;
    assert!(result.is_err());
    Ok(())
}

#[tokio::test]
#[ignore = "needs internet access"]
async fn connectivity_against_real_network() {
    let settings = EngineSettings::new(Default::default()).unwrap();
    let service = TopologyService::system(settings);
    assert!(service.connectivity_ok().await);
}
