//! # Ecosystem Catalog
//!
//! The read-only fingerprints the classifier scores hosts against, and the
//! port → service-label table the host prober uses to annotate open ports.
//!
//! Both are plain values handed to the engine at construction time, so tests
//! can swap in synthetic profiles.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::error::DiscoveryError;

/// A named role with the ports and services a member of that role exposes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerProfile {
    pub name: String,
    pub ports: BTreeSet<u16>,
    #[serde(default)]
    pub labels: BTreeSet<String>,
}

impl ServerProfile {
    pub fn new<P, L, S>(name: &str, ports: P, labels: L) -> Self
    where
        P: IntoIterator<Item = u16>,
        L: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.to_string(),
            ports: ports.into_iter().collect(),
            labels: labels.into_iter().map(Into::into).collect(),
        }
    }

    /// Number of this profile's ports present in `open_ports`.
    pub fn overlap(&self, open_ports: &[u16]) -> usize {
        open_ports.iter().filter(|port| self.ports.contains(port)).count()
    }
}

/// Profiles in declaration order. Order is significant: it breaks ties
/// between equally good matches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfileCatalog {
    profiles: Vec<ServerProfile>,
}

impl ProfileCatalog {
    pub fn new(profiles: Vec<ServerProfile>) -> Result<Self, DiscoveryError> {
        let mut seen: BTreeSet<&str> = BTreeSet::new();
        for profile in &profiles {
            if !seen.insert(profile.name.as_str()) {
                return Err(DiscoveryError::Config(format!(
                    "duplicate profile name '{}'",
                    profile.name
                )));
            }
        }
        Ok(Self { profiles })
    }

    pub fn iter(&self) -> impl Iterator<Item = &ServerProfile> {
        self.profiles.iter()
    }

    /// Every port any profile expects.
    pub fn all_ports(&self) -> BTreeSet<u16> {
        self.profiles
            .iter()
            .flat_map(|profile| profile.ports.iter().copied())
            .collect()
    }
}

impl Default for ProfileCatalog {
    fn default() -> Self {
        Self {
            profiles: default_profiles(),
        }
    }
}

pub fn default_profiles() -> Vec<ServerProfile> {
    vec![
        ServerProfile::new("workstation", [22, 8000, 3001], ["ssh", "development", "testing"]),
        ServerProfile::new("llm_server", [22, 2222, 8080, 11434], ["ssh", "llm_api", "ollama"]),
        ServerProfile::new(
            "orchestration",
            [22, 2222, 8123, 3000, 9000, 8020],
            ["ssh", "home_assistant", "adguard", "portainer", "zen"],
        ),
        ServerProfile::new(
            "database",
            [22, 2222, 5432, 6379, 3306],
            ["ssh", "postgresql", "redis", "mysql"],
        ),
        ServerProfile::new(
            "monitoring",
            [22, 2222, 9090, 3000, 5601, 9200],
            ["ssh", "prometheus", "grafana", "kibana", "elasticsearch"],
        ),
    ]
}

/// Static port → human-readable service label table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortLabels {
    labels: BTreeMap<u16, String>,
}

impl PortLabels {
    pub fn new(labels: BTreeMap<u16, String>) -> Self {
        Self { labels }
    }

    /// Builds the table from string keys, as they come out of a TOML table.
    pub fn from_raw(raw: &BTreeMap<String, String>) -> Result<Self, DiscoveryError> {
        let mut labels: BTreeMap<u16, String> = BTreeMap::new();
        for (key, label) in raw {
            let port: u16 = key
                .trim()
                .parse()
                .map_err(|e| DiscoveryError::Config(format!("port label key '{key}': {e}")))?;
            labels.insert(port, label.clone());
        }
        Ok(Self { labels })
    }

    pub fn iter(&self) -> impl Iterator<Item = (u16, &str)> {
        self.labels.iter().map(|(port, label)| (*port, label.as_str()))
    }

    /// Labels for the given open ports; ports without a label are skipped.
    pub fn for_ports(&self, open_ports: &[u16]) -> BTreeMap<u16, String> {
        open_ports
            .iter()
            .filter_map(|port| self.labels.get(port).map(|label| (*port, label.clone())))
            .collect()
    }
}

impl Default for PortLabels {
    fn default() -> Self {
        let labels = [
            (22, "ssh"),
            (2222, "ssh-alt"),
            (80, "http"),
            (443, "https"),
            (3000, "grafana/adguard"),
            (3001, "testing"),
            (8000, "development"),
            (8020, "zen"),
            (8080, "http-alt/llm-api"),
            (8123, "home-assistant"),
            (8443, "https-alt"),
            (9000, "portainer"),
            (11434, "ollama"),
            (5432, "postgresql"),
            (6379, "redis"),
            (3306, "mysql"),
            (9090, "prometheus"),
            (5601, "kibana"),
            (9200, "elasticsearch"),
        ]
        .into_iter()
        .map(|(port, label)| (port, label.to_string()))
        .collect();

        Self { labels }
    }
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
    fn overlap_counts_shared_ports() {
        let profile = ServerProfile::new("llm_server", [22, 2222, 8080, 11434], ["ssh"]);
        assert_eq!(profile.overlap(&[22, 8080, 11434]), 3);
        assert_eq!(profile.overlap(&[80, 443]), 0);
        assert_eq!(profile.overlap(&[]), 0);
    }

    #[test]
    fn catalog_rejects_duplicate_names() {
        let profiles = vec![
            ServerProfile::new("db", [5432], ["postgresql"]),
            ServerProfile::new("db", [3306], ["mysql"]),
        ];
        assert!(matches!(
            ProfileCatalog::new(profiles),
            Err(DiscoveryError::Config(_))
        ));
    }

    #[test]
    fn default_catalog_keeps_declaration_order() {
        let catalog = ProfileCatalog::default();
        let names: Vec<&str> = catalog.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(
            names,
            vec!["workstation", "llm_server", "orchestration", "database", "monitoring"]
        );
        assert!(catalog.all_ports().contains(&11434));
        let database = catalog.iter().find(|p| p.name == "database").unwrap();
        assert!(database.ports.contains(&5432));
    }

    #[test]
    fn labels_only_cover_open_ports() {
        let labels = PortLabels::default();
        let found = labels.for_ports(&[22, 8080, 12345]);
        assert_eq!(found.len(), 2);
        assert_eq!(found.get(&22).map(String::as_str), Some("ssh"));
        assert_eq!(found.get(&8080).map(String::as_str), Some("http-alt/llm-api"));
        assert!(!found.contains_key(&12345));
    }

    #[test]
    fn labels_from_raw_rejects_non_numeric_keys() {
        let mut raw = BTreeMap::new();
        raw.insert("22".to_string(), "ssh".to_string());
        let labels = PortLabels::from_raw(&raw).unwrap();
        assert_eq!(labels.iter().collect::<Vec<_>>(), vec![(22, "ssh")]);

        raw.insert("ssh".to_string(), "ssh".to_string());
        assert!(PortLabels::from_raw(&raw).is_err());
    }
}
