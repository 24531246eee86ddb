use thiserror::Error;

use lotsplit_core::{DomainError, ShipmentId};

use crate::shipment::ShipmentState;

pub type ShippingResult<T> = Result<T, ShippingError>;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ShippingError {
    #[error("shipment {shipment_id} is {state}; expected {expected}")]
    InvalidShipmentState {
        shipment_id: ShipmentId,
        state: ShipmentState,
        expected: ShipmentState,
    },

    #[error(transparent)]
    Domain(#[from] DomainError),
}
