//! Stock move storage.

pub mod move_store;

pub use move_store::InMemoryMoveStore;
