//! Outbound shipments (customer deliveries) and their lot assignment.
//!
//! Drives the move splitter for every inventory move of a shipment that needs
//! a lot, then asks the reservation step to assign the resulting fragments and
//! reports whether the whole shipment got covered.

pub mod allocator;
pub mod error;
pub mod policy;
pub mod reservation;
pub mod shipment;

pub use allocator::{AssignReport, LineOutcome, ShipmentAllocator, SplitReport};
pub use error::{ShippingError, ShippingResult};
pub use policy::LotRequirement;
pub use reservation::{Grouping, GroupingKey, Reservation, ReservationOutcome, ReservationReport};
pub use shipment::{ShipmentOut, ShipmentState};
