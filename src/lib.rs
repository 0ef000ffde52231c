// Core modules
pub mod api;
pub mod config;
pub mod error;
pub mod execution;
pub mod models;
pub mod risk;
pub mod strategy;

// Re-export commonly used types
pub use api::{MarketDataPort, OrderPort};
pub use config::EngineConfig;
pub use error::*;
pub use execution::{Scheduler, SymbolMonitor, TickOutcome};
pub use models::*;
pub use strategy::LevelCalculator;
