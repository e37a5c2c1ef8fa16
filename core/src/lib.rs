pub mod classifier;
pub mod discovery;
pub mod export;
pub mod network;
pub mod scanner;
pub mod system;

#[cfg(test)]
mod testing;

pub use discovery::TopologyService;
