//! Errors surfaced across the discovery boundary.
//!
//! Per-probe failures (refusals, timeouts, DNS misses) never become one of
//! these; they collapse into absences inside the probers. Only input
//! validation, configuration and local-context problems reach the caller.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DiscoveryError {
    /// The subnet string is not a valid IPv4 CIDR block.
    #[error("invalid subnet '{input}': {reason}")]
    InvalidSubnet { input: String, reason: String },

    /// The local address, interface or subnet could not be determined.
    #[error("local network context unavailable: {0}")]
    ContextUnavailable(String),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl DiscoveryError {
    pub fn invalid_subnet(input: &str, reason: impl ToString) -> Self {
        Self::InvalidSubnet {
            input: input.to_string(),
            reason: reason.to_string(),
        }
    }
}
