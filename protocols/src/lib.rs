//! Wire formats spoken by the discovery engine.

pub mod dns;
