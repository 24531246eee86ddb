//! Stock ledger and the product/location directory it is read against.

pub mod directory;
pub mod ledger;

pub use directory::InventoryDirectory;
pub use ledger::{InMemoryStock, Quant, QuantKey};
