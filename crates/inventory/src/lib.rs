//! Inventory domain module: lots, stock moves and FEFO allocation.
//!
//! This crate contains business rules for splitting outbound stock moves across
//! expiring lots, implemented as deterministic domain logic. Storage and the lot
//! catalog are reached only through the traits declared here
//! ([`LotCatalog`], [`MoveRepository`]).

pub mod allocation;
pub mod catalog;
pub mod error;
pub mod location;
pub mod lot;
pub mod product;
pub mod splitter;
pub mod stock_move;

pub use allocation::{AllocationPlan, Fragment, allocate};
pub use catalog::{LotCatalog, LotQuery, fefo_candidates, is_fefo_ordered};
pub use error::{AllocationError, AllocationResult};
pub use location::{Location, LocationKind};
pub use lot::{Lot, LotCandidate};
pub use product::Product;
pub use splitter::{MoveRepository, MoveSplitter};
pub use stock_move::{MoveOverrides, MoveState, NewStockMove, StockMove};
