//! `lotsplit-core`: domain foundation building blocks.
//!
//! This crate contains **pure domain** primitives (no infrastructure concerns):
//! identifiers, the domain error model, units of measure and the business clock.

pub mod clock;
pub mod entity;
pub mod error;
pub mod id;
pub mod uom;
pub mod value_object;

pub use clock::{Clock, FixedClock, SystemClock};
pub use entity::Entity;
pub use error::{DomainError, DomainResult};
pub use id::{LocationId, LotId, MoveId, ProductId, ShipmentId, UomId};
pub use uom::{Uom, UomCatalog, UomConversion};
pub use value_object::ValueObject;
