//! Shared building blocks of the discovery engine: the topology models, the
//! ecosystem catalog, configuration and the error type that crosses crate
//! boundaries.

pub mod catalog;
pub mod config;
pub mod error;
pub mod network;

pub use error::DiscoveryError;
