//! Heuristic role assignment.
//!
//! A profile matches when at least 60% of its ports are open on the host
//! (inclusive). Among matching profiles the highest coverage wins; equal
//! coverage goes to the profile declared first in the catalog.

use std::cmp::Ordering;

use ecomap_common::catalog::{ProfileCatalog, ServerProfile};
use ecomap_common::network::topology::ServerRecord;
use tracing::debug;

/// Match threshold as the exact fraction 3/5, compared in integers so the
/// 0.6 boundary is never lost to float rounding.
const THRESHOLD_NUM: usize = 3;
const THRESHOLD_DEN: usize = 5;

/// Share of a profile's ports found open.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Coverage {
    pub overlap: usize,
    pub expected: usize,
}

impl Coverage {
    pub fn of(open_ports: &[u16], profile: &ServerProfile) -> Self {
        Self {
            overlap: profile.overlap(open_ports),
            expected: profile.ports.len(),
        }
    }

    /// `overlap / expected >= 0.6`. Empty profiles never match.
    pub fn matches(&self) -> bool {
        self.expected > 0 && self.overlap * THRESHOLD_DEN >= self.expected * THRESHOLD_NUM
    }

    /// Exact comparison of the two ratios.
    fn cmp_ratio(&self, other: &Coverage) -> Ordering {
        (self.overlap * other.expected).cmp(&(other.overlap * self.expected))
    }
}

/// Best-matching profile for `open_ports`, if any clears the threshold.
pub fn classify<'a>(open_ports: &[u16], catalog: &'a ProfileCatalog) -> Option<&'a ServerProfile> {
    let mut best: Option<(&ServerProfile, Coverage)> = None;

    for profile in catalog.iter() {
        let coverage = Coverage::of(open_ports, profile);
        if !coverage.matches() {
            continue;
        }
        match &best {
            // Strictly better only: ties keep the earlier declaration.
            Some((_, leader)) if coverage.cmp_ratio(leader) != Ordering::Greater => {}
            _ => best = Some((profile, coverage)),
        }
    }

    best.map(|(profile, _)| profile)
}

/// Fills `classified_role` on every record.
pub fn assign_roles(records: &mut [ServerRecord], catalog: &ProfileCatalog) {
    for record in records.iter_mut() {
        record.classified_role = classify(&record.open_ports, catalog).map(|profile| profile.name.clone());
        if let Some(role) = &record.classified_role {
            debug!("{} classified as {role}", record.address);
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
