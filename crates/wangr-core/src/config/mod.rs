//! Configuration management for endpoints, refresh cadence and limits.

pub mod loader;
pub mod types;


pub use loader::ConfigLoader;
pub use types::*;
