use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use lotsplit_core::{Entity, MoveId, ShipmentId};

use crate::error::{ShippingError, ShippingResult};

/// Outbound shipment lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShipmentState {
    Draft,
    Waiting,
    Assigned,
    Done,
    Cancel,
}

impl core::fmt::Display for ShipmentState {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let s = match self {
            ShipmentState::Draft => "draft",
            ShipmentState::Waiting => "waiting",
            ShipmentState::Assigned => "assigned",
            ShipmentState::Done => "done",
            ShipmentState::Cancel => "cancel",
        };
        f.write_str(s)
    }
}

/// Customer shipment: the inventory moves that pick its goods from storage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShipmentOut {
    id: ShipmentId,
    reference: String,
    planned_date: Option<NaiveDate>,
    state: ShipmentState,
    inventory_moves: Vec<MoveId>,
}

impl ShipmentOut {
    pub fn new(id: ShipmentId, reference: impl Into<String>, planned_date: Option<NaiveDate>) -> Self {
        Self {
            id,
            reference: reference.into(),
            planned_date,
            state: ShipmentState::Draft,
            inventory_moves: Vec::new(),
        }
    }

    pub fn id_typed(&self) -> ShipmentId {
        self.id
    }

    pub fn reference(&self) -> &str {
        &self.reference
    }

    pub fn planned_date(&self) -> Option<NaiveDate> {
        self.planned_date
    }

    pub fn state(&self) -> ShipmentState {
        self.state
    }

    pub fn inventory_moves(&self) -> &[MoveId] {
        &self.inventory_moves
    }

    /// Attach moves to the shipment, ignoring ids it already holds.
    pub fn attach_moves(&mut self, ids: impl IntoIterator<Item = MoveId>) -> ShippingResult<()> {
        if matches!(self.state, ShipmentState::Done | ShipmentState::Cancel) {
            return Err(self.unexpected_state(ShipmentState::Waiting));
        }
        for id in ids {
            if !self.inventory_moves.contains(&id) {
                self.inventory_moves.push(id);
            }
        }
        Ok(())
    }

    /// Remove a move (e.g. a cancelled residual) from the shipment.
    pub fn detach_move(&mut self, id: MoveId) -> bool {
        let before = self.inventory_moves.len();
        self.inventory_moves.retain(|m| *m != id);
        before != self.inventory_moves.len()
    }

    pub fn wait(&mut self) -> ShippingResult<()> {
        self.transition(&[ShipmentState::Draft, ShipmentState::Assigned], ShipmentState::Waiting)
    }

    pub fn mark_assigned(&mut self) -> ShippingResult<()> {
        self.transition(&[ShipmentState::Waiting], ShipmentState::Assigned)
    }

    pub fn done(&mut self) -> ShippingResult<()> {
        self.transition(&[ShipmentState::Assigned], ShipmentState::Done)
    }

    pub fn cancel(&mut self) -> ShippingResult<()> {
        self.transition(
            &[ShipmentState::Draft, ShipmentState::Waiting, ShipmentState::Assigned],
            ShipmentState::Cancel,
        )
    }

    pub fn ensure_state(&self, expected: ShipmentState) -> ShippingResult<()> {
        if self.state == expected {
            Ok(())
        } else {
            Err(self.unexpected_state(expected))
        }
    }

    fn transition(&mut self, from: &[ShipmentState], to: ShipmentState) -> ShippingResult<()> {
        if !from.contains(&self.state) {
            return Err(self.unexpected_state(from[0]));
        }
        self.state = to;
        Ok(())
    }

    fn unexpected_state(&self, expected: ShipmentState) -> ShippingError {
        ShippingError::InvalidShipmentState {
            shipment_id: self.id,
            state: self.state,
            expected,
        }
    }
}

impl Entity for ShipmentOut {
    type Id = ShipmentId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}
