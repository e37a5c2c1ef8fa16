use std::net::Ipv4Addr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Context;
use colored::*;
use ecomap_common::config::EngineSettings;
use ecomap_common::network::topology::{ServerRecord, TopologySnapshot};
use ecomap_core::{TopologyService, export};
use tracing::warn;

use crate::terminal::format::{self, Detail};
use crate::terminal::spinner::{self, Spinner};
use crate::terminal::{colors, print};

pub async fn discover(
    subnet: Option<String>,
    export_path: Option<PathBuf>,
    settings: Arc<EngineSettings>,
) -> anyhow::Result<()> {
    let service = TopologyService::system(settings)
        .with_progress(Arc::new(spinner::report_discovery_progress));

    let spinner = Spinner::start("Sweeping the network...");
    let start_time: Instant = Instant::now();
    let result = match subnet.as_deref() {
        Some(cidr) => service.discover_subnet(cidr).await,
        None => Ok(service.discover().await),
    };
    spinner.finish();

    let snapshot: TopologySnapshot = result.context("discovery failed")?;
    discovery_ends(&snapshot, start_time.elapsed());

    if let Some(path) = export_path {
        export::write_json(&snapshot, &path)
            .with_context(|| format!("exporting topology to {}", path.display()))?;
    }
    Ok(())
}

fn discovery_ends(snapshot: &TopologySnapshot, total_time: Duration) {
    print::blank();
    print_context(snapshot);

    if snapshot.is_unknown() {
        warn!("Local network could not be determined: {}", snapshot.state());
        print::no_results("try again with --subnet");
        return;
    }
    if snapshot.servers().is_empty() {
        print::no_results(&format!("nothing in {} answered", snapshot.subnet()));
        return;
    }

    print::blank();
    print::header("Hosts");
    let mut servers: Vec<&ServerRecord> = snapshot.servers().iter().collect();
    servers.sort_by_key(|record| record.address);
    print_hosts(&servers);

    print::blank();
    print_members(snapshot);
    print_summary(snapshot, total_time);
}

fn print_context(snapshot: &TopologySnapshot) {
    print::header("Local network");
    let lines: [(&str, String); 5] = [
        ("Hostname", snapshot.hostname()),
        ("Interface", snapshot.interface()),
        ("Local IP", snapshot.local_ip()),
        ("Gateway", snapshot.gateway()),
        ("Subnet", snapshot.subnet()),
    ];
    let width: usize = lines.iter().map(|(key, _)| key.len()).max().unwrap_or(0);
    for (key, value) in lines {
        print::aligned_line(key, value.color(colors::TEXT_DEFAULT), width);
    }
}

fn print_hosts(servers: &[&ServerRecord]) {
    for (idx, record) in servers.iter().enumerate() {
        let name: &str = record.hostname.as_deref().unwrap_or("No hostname");
        print::tree_head(idx, name);
        let details: Vec<Detail> = format::record_to_details(record);
        print::as_tree_one_level(details);
        if idx + 1 != servers.len() {
            print::blank();
        }
    }
}

fn print_members(snapshot: &TopologySnapshot) {
    print::header("Ecosystem");
    if !snapshot.ecosystem_present() {
        print::print(&format!("{}", "no ecosystem servers found".color(colors::SEPARATOR)));
        return;
    }

    let mut members: Vec<(Ipv4Addr, String, &str)> = snapshot
        .ecosystem_servers()
        .iter()
        .map(|record| {
            (
                record.address,
                record.display_name(),
                record.classified_role.as_deref().unwrap_or_default(),
            )
        })
        .collect();
    members.sort();

    let width: usize = members.iter().map(|(_, name, _)| name.len()).max().unwrap_or(0);
    for (_, name, role) in members {
        print::aligned_line(&name, role.color(colors::ROLE).bold(), width);
    }
}

fn print_summary(snapshot: &TopologySnapshot, total_time: Duration) {
    let hosts_text = format!("{} hosts", snapshot.total_hosts());
    let members_text = format!("{} ecosystem servers", snapshot.ecosystem_servers().len());
    let time_text = format!("{:.2}s", total_time.as_secs_f64());
    let plain: String = format!("Discovery Complete: {hosts_text}, {members_text} in {time_text}");

    let output: String = format!(
        "Discovery Complete: {}, {} in {}",
        hosts_text.bold().green(),
        members_text.bold().magenta(),
        time_text.bold().yellow()
    );

    print::blank();
    print::fat_separator();
    print::centerln(&output, plain.chars().count());
}
