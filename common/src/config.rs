use std::collections::{BTreeMap, BTreeSet};
use std::net::SocketAddrV4;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;
use tracing::{debug, warn};

use crate::catalog::{self, PortLabels, ProfileCatalog, ServerProfile};
use crate::error::DiscoveryError;

/// Tunables for one discovery run.
///
/// Every field has a default, so a TOML file only needs the keys it changes.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    /// Timeout for the liveness probe that decides whether a host exists.
    pub liveness_timeout_ms: u64,
    /// Timeout for each individual port probe.
    pub port_timeout_ms: u64,
    /// Timeout for reverse hostname resolution.
    pub resolution_timeout_ms: u64,
    /// Maximum hosts probed at once.
    pub host_concurrency: usize,
    /// Maximum port probes in flight for a single host.
    pub port_concurrency: usize,
    /// Hard ceiling on sockets open across the whole run.
    pub max_sockets: usize,
    /// TCP port used for the liveness probe. A handshake or an active refusal
    /// both count as "alive".
    pub liveness_port: u16,
    /// Ports probed on every live host. Catalog ports are always added.
    pub candidate_ports: Vec<u16>,
    /// Remote-access ports in priority order.
    pub access_ports: Vec<u16>,
    /// Well-known external endpoint used by the connectivity check.
    pub external_probe: SocketAddrV4,
    /// Timeout for the connectivity and access checks.
    pub check_timeout_ms: u64,
    /// Disables PTR lookups entirely.
    pub no_dns: bool,
    pub profiles: Vec<ServerProfile>,
    pub port_labels: BTreeMap<String, String>,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            liveness_timeout_ms: 2_000,
            port_timeout_ms: 1_000,
            resolution_timeout_ms: 1_000,
            host_concurrency: 50,
            port_concurrency: 20,
            max_sockets: 1_000,
            liveness_port: 443,
            candidate_ports: vec![
                22, 80, 443, 2222, 3000, 3001, 3306, 5432, 5601, 6379, 8000, 8020, 8080, 8123,
                8443, 9000, 9090, 9200, 11434,
            ],
            access_ports: vec![22, 2222],
            external_probe: SocketAddrV4::new([8, 8, 8, 8].into(), 53),
            check_timeout_ms: 5_000,
            no_dns: false,
            profiles: catalog::default_profiles(),
            port_labels: default_raw_labels(),
        }
    }
}

fn default_raw_labels() -> BTreeMap<String, String> {
    PortLabels::default()
        .iter()
        .map(|(port, label)| (port.to_string(), label.to_string()))
        .collect()
}

impl ScanConfig {
    pub fn from_toml_str(s: &str) -> Result<Self, DiscoveryError> {
        toml::from_str(s).map_err(|e| DiscoveryError::Config(e.to_string()))
    }

    pub fn load(path: &Path) -> Result<Self, DiscoveryError> {
        let content = std::fs::read_to_string(path)?;
        debug!("Loaded configuration from {}", path.display());
        Self::from_toml_str(&content)
    }

    /// Rejects unusable values and clamps the two pools so that
    /// `host_concurrency * port_concurrency <= max_sockets`.
    pub fn validate(mut self) -> Result<Self, DiscoveryError> {
        let positive = [
            ("liveness_timeout_ms", self.liveness_timeout_ms as usize),
            ("port_timeout_ms", self.port_timeout_ms as usize),
            ("resolution_timeout_ms", self.resolution_timeout_ms as usize),
            ("check_timeout_ms", self.check_timeout_ms as usize),
            ("host_concurrency", self.host_concurrency),
            ("port_concurrency", self.port_concurrency),
            ("max_sockets", self.max_sockets),
        ];
        if let Some((key, _)) = positive.iter().find(|(_, value)| *value == 0) {
            return Err(DiscoveryError::Config(format!("{key} must be greater than zero")));
        }
        if self.candidate_ports.is_empty() {
            return Err(DiscoveryError::Config("candidate_ports must not be empty".into()));
        }
        if self.candidate_ports.contains(&0) || self.liveness_port == 0 {
            return Err(DiscoveryError::Config("port 0 cannot be probed".into()));
        }

        if self.port_concurrency > self.max_sockets {
            warn!(
                "port_concurrency {} exceeds max_sockets {}, clamping",
                self.port_concurrency, self.max_sockets
            );
            self.port_concurrency = self.max_sockets;
        }
        let budget: usize = self.host_concurrency.saturating_mul(self.port_concurrency);
        if budget > self.max_sockets {
            let clamped = (self.max_sockets / self.port_concurrency).max(1);
            warn!(
                "{} hosts x {} ports exceeds max_sockets {}, running {} hosts at once",
                self.host_concurrency, self.port_concurrency, self.max_sockets, clamped
            );
            self.host_concurrency = clamped;
        }

        Ok(self)
    }

    pub fn liveness_timeout(&self) -> Duration {
        Duration::from_millis(self.liveness_timeout_ms)
    }

    pub fn port_timeout(&self) -> Duration {
        Duration::from_millis(self.port_timeout_ms)
    }

    pub fn resolution_timeout(&self) -> Duration {
        Duration::from_millis(self.resolution_timeout_ms)
    }

    pub fn check_timeout(&self) -> Duration {
        Duration::from_millis(self.check_timeout_ms)
    }
}

/// Validated configuration plus the immutable catalog and label table,
/// shared by every task of a run.
#[derive(Debug, Clone)]
pub struct EngineSettings {
    pub config: ScanConfig,
    pub catalog: ProfileCatalog,
    pub labels: PortLabels,
    /// Sorted, duplicate-free union of `candidate_ports` and catalog ports.
    pub candidate_ports: Vec<u16>,
}

impl EngineSettings {
    pub fn new(config: ScanConfig) -> Result<Arc<Self>, DiscoveryError> {
        let config = config.validate()?;
        let catalog = ProfileCatalog::new(config.profiles.clone())?;
        let labels = PortLabels::from_raw(&config.port_labels)?;
        Ok(Arc::new(Self::assemble(config, catalog, labels)))
    }

    /// Uses an explicit catalog and label table instead of the ones in `config`.
    pub fn with_catalog(
        config: ScanConfig,
        catalog: ProfileCatalog,
        labels: PortLabels,
    ) -> Result<Arc<Self>, DiscoveryError> {
        let config = config.validate()?;
        Ok(Arc::new(Self::assemble(config, catalog, labels)))
    }

    fn assemble(config: ScanConfig, catalog: ProfileCatalog, labels: PortLabels) -> Self {
        let mut ports: BTreeSet<u16> = config.candidate_ports.iter().copied().collect();
        ports.extend(catalog.all_ports());
        ports.remove(&0);

        Self {
            candidate_ports: ports.into_iter().collect(),
            config,
            catalog,
            labels,
        }
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
