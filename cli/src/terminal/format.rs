use colored::*;
use ecomap_common::network::topology::ServerRecord;

use crate::terminal::colors;

pub type Detail = (String, ColoredString);

pub fn record_to_details(record: &ServerRecord) -> Vec<Detail> {
    let mut details: Vec<Detail> = vec![(
        "IPv4".to_string(),
        record.address.to_string().color(colors::IPV4_ADDR),
    )];

    details.push(("Ports".to_string(), ports_to_value(&record.open_ports)));

    if !record.service_labels.is_empty() {
        let services: String = record
            .service_labels
            .iter()
            .map(|(port, label)| format!("{label}/{port}"))
            .collect::<Vec<String>>()
            .join(", ");
        details.push(("Services".to_string(), services.normal()));
    }

    if let Some(port) = record.primary_access_port {
        details.push(("Access".to_string(), port.to_string().color(colors::PORT)));
    }

    if let Some(role) = &record.classified_role {
        details.push(("Role".to_string(), role.color(colors::ROLE).bold()));
    }

    details.push((
        "Latency".to_string(),
        format!("{:.1}ms", record.round_trip_latency).color(colors::TEXT_DEFAULT),
    ));

    details
}

fn ports_to_value(ports: &[u16]) -> ColoredString {
    if ports.is_empty() {
        return "none".dimmed();
    }
    ports
        .iter()
        .map(u16::to_string)
        .collect::<Vec<String>>()
        .join(", ")
        .color(colors::PORT)
}

pub fn yes_no(value: bool) -> ColoredString {
    if value { "yes".green().bold() } else { "no".red().bold() }
}
