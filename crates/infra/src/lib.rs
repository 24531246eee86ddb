//! Infrastructure layer: in-memory stores, stock ledger, configuration and wiring.

pub mod config;
pub mod services;
pub mod stock;
pub mod store;

pub use config::{ConfigError, LotSplitConfig};
pub use services::{InMemoryAllocator, InMemoryServices};
pub use stock::{InMemoryStock, InventoryDirectory, Quant, QuantKey};
pub use store::InMemoryMoveStore;
