//! Reservation step: assigns split moves against the stock of their lot.

use serde::{Deserialize, Serialize};

use lotsplit_core::{DomainResult, MoveId};
use lotsplit_inventory::StockMove;

/// Field a reservation groups moves by when checking availability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GroupingKey {
    Product,
    Lot,
}

/// Availability buckets: moves sharing the listed fields draw from the same pool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Grouping(Vec<GroupingKey>);

impl Grouping {
    pub fn new(keys: impl IntoIterator<Item = GroupingKey>) -> Self {
        Self(keys.into_iter().collect())
    }

    /// Group per product and lot, the grouping used after a split.
    pub fn product_and_lot() -> Self {
        Self::new([GroupingKey::Product, GroupingKey::Lot])
    }

    pub fn contains(&self, key: GroupingKey) -> bool {
        self.0.contains(&key)
    }

    pub fn keys(&self) -> &[GroupingKey] {
        &self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReservationOutcome {
    /// Every move passed in could be reserved.
    Complete,
    /// At least one move is still waiting for stock.
    Partial,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReservationReport {
    /// Moves that were reserved by this call, in input order.
    pub assigned: Vec<MoveId>,
    pub outcome: ReservationOutcome,
}

impl ReservationReport {
    pub fn from_assigned(assigned: Vec<MoveId>, requested: usize) -> Self {
        let outcome = if assigned.len() == requested {
            ReservationOutcome::Complete
        } else {
            ReservationOutcome::Partial
        };
        Self { assigned, outcome }
    }

    pub fn is_complete(&self) -> bool {
        self.outcome == ReservationOutcome::Complete
    }
}

/// Reserves stock for moves. Does not change move state: the caller marks
/// the reported moves as assigned.
pub trait Reservation {
    fn assign_try(&self, moves: &[StockMove], grouping: &Grouping) -> DomainResult<ReservationReport>;
}

impl<T: Reservation + ?Sized> Reservation for std::sync::Arc<T> {
    fn assign_try(&self, moves: &[StockMove], grouping: &Grouping) -> DomainResult<ReservationReport> {
        (**self).assign_try(moves, grouping)
    }
}

impl<T: Reservation + ?Sized> Reservation for &T {
    fn assign_try(&self, moves: &[StockMove], grouping: &Grouping) -> DomainResult<ReservationReport> {
        (**self).assign_try(moves, grouping)
    }
}
