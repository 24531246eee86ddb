//! Stock moves: the demand lines the allocator splits.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use lotsplit_core::{
    DomainError, DomainResult, Entity, LocationId, LotId, MoveId, ProductId, ShipmentId, UomConversion,
    UomId,
};

use crate::error::AllocationError;

/// Stock move lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MoveState {
    Draft,
    Assigned,
    Done,
    Cancel,
}

impl MoveState {
    pub fn as_str(&self) -> &'static str {
        match self {
            MoveState::Draft => "draft",
            MoveState::Assigned => "assigned",
            MoveState::Done => "done",
            MoveState::Cancel => "cancel",
        }
    }
}

impl core::fmt::Display for MoveState {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A requested movement of a quantity of product between two locations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockMove {
    pub id: MoveId,
    pub product: ProductId,
    /// Requested amount, in `unit`.
    pub quantity: Decimal,
    pub unit: UomId,
    /// Same amount expressed in the product's base unit. Authoritative for arithmetic.
    pub internal_quantity: Decimal,
    pub base_unit: UomId,
    pub from_location: LocationId,
    pub to_location: LocationId,
    pub effective_date: Option<NaiveDate>,
    pub planned_date: Option<NaiveDate>,
    pub lot: Option<LotId>,
    pub state: MoveState,
    pub shipment: Option<ShipmentId>,
    pub unit_price: Option<Decimal>,
}

/// Input for creating a draft stock move.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewStockMove {
    pub id: MoveId,
    pub product: ProductId,
    pub quantity: Decimal,
    pub unit: UomId,
    pub base_unit: UomId,
    pub from_location: LocationId,
    pub to_location: LocationId,
    pub planned_date: Option<NaiveDate>,
    pub shipment: Option<ShipmentId>,
    pub unit_price: Option<Decimal>,
}

/// The only fields that differ between a split fragment and its original.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MoveOverrides {
    pub lot: Option<LotId>,
    pub quantity: Decimal,
    pub internal_quantity: Decimal,
}

impl StockMove {
    /// Create a draft move, computing its base-unit quantity.
    pub fn draft<U: UomConversion + ?Sized>(new: NewStockMove, uoms: &U) -> DomainResult<Self> {
        if new.quantity <= Decimal::ZERO {
            return Err(DomainError::validation("move quantity must be positive"));
        }
        let internal_quantity = uoms.convert_quantity(new.unit, new.base_unit, new.quantity)?;
        if internal_quantity <= Decimal::ZERO {
            return Err(DomainError::validation(
                "move quantity rounds to zero in the product unit",
            ));
        }
        Ok(Self {
            id: new.id,
            product: new.product,
            quantity: new.quantity,
            unit: new.unit,
            internal_quantity,
            base_unit: new.base_unit,
            from_location: new.from_location,
            to_location: new.to_location,
            effective_date: None,
            planned_date: new.planned_date,
            lot: None,
            state: MoveState::Draft,
            shipment: new.shipment,
            unit_price: new.unit_price,
        })
    }

    /// Date against which lot expiry is compared.
    ///
    /// Effective date if set; otherwise the planned date unless it is already in
    /// the past; otherwise today.
    pub fn as_of_date(&self, today: NaiveDate) -> NaiveDate {
        match (self.effective_date, self.planned_date) {
            (Some(effective), _) => effective,
            (None, Some(planned)) if planned >= today => planned,
            _ => today,
        }
    }

    /// Draft and not yet bound to a lot.
    pub fn is_splittable(&self) -> bool {
        self.state == MoveState::Draft && self.lot.is_none()
    }

    pub fn ensure_splittable(&self) -> Result<(), AllocationError> {
        if self.is_splittable() {
            return Ok(());
        }
        Err(AllocationError::InvalidAllocationState {
            move_id: self.id,
            state: self.state,
            lot: self.lot,
        })
    }

    /// Copy of this move under a new identity, differing only by lot and quantity.
    pub fn fragment(&self, id: MoveId, overrides: MoveOverrides) -> Self {
        Self {
            id,
            lot: overrides.lot,
            quantity: overrides.quantity,
            internal_quantity: overrides.internal_quantity,
            ..self.clone()
        }
    }
}

impl Entity for StockMove {
    type Id = MoveId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lotsplit_core::{Uom, UomCatalog};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn units() -> (UomCatalog, Uom, Uom) {
        let unit = Uom::new(UomId::new(), "Unit", "units", Decimal::ONE, Decimal::ONE).unwrap();
        let dozen =
            Uom::new(UomId::new(), "Dozen", "units", Decimal::from(12), Decimal::new(1, 2)).unwrap();
        let catalog = UomCatalog::new().with(unit.clone()).with(dozen.clone());
        (catalog, unit, dozen)
    }

    fn new_move(quantity: Decimal, unit: UomId, base_unit: UomId) -> NewStockMove {
        NewStockMove {
            id: MoveId::new(),
            product: ProductId::new(),
            quantity,
            unit,
            base_unit,
            from_location: LocationId::new(),
            to_location: LocationId::new(),
            planned_date: None,
            shipment: None,
            unit_price: None,
        }
    }

    #[test]
    fn draft_computes_internal_quantity_in_base_unit() {
        let (catalog, unit, dozen) = units();
        let mv = StockMove::draft(new_move(Decimal::from(2), dozen.id, unit.id), &catalog).unwrap();
        assert_eq!(mv.internal_quantity, Decimal::from(24));
        assert_eq!(mv.state, MoveState::Draft);
        assert!(mv.is_splittable());
    }

    #[test]
    fn draft_rejects_non_positive_quantity() {
        let (catalog, unit, _) = units();
        let err = StockMove::draft(new_move(Decimal::ZERO, unit.id, unit.id), &catalog).unwrap_err();
        assert_eq!(err, DomainError::validation("move quantity must be positive"));
    }

    #[test]
    fn as_of_date_prefers_effective_date() {
        let (catalog, unit, _) = units();
        let mut mv = StockMove::draft(new_move(Decimal::ONE, unit.id, unit.id), &catalog).unwrap();
        mv.planned_date = Some(date(2026, 3, 10));
        mv.effective_date = Some(date(2026, 1, 5));
        assert_eq!(mv.as_of_date(date(2026, 2, 1)), date(2026, 1, 5));
    }

    #[test]
    fn as_of_date_uses_future_planned_date() {
        let (catalog, unit, _) = units();
        let mut mv = StockMove::draft(new_move(Decimal::ONE, unit.id, unit.id), &catalog).unwrap();
        mv.planned_date = Some(date(2026, 3, 10));
        assert_eq!(mv.as_of_date(date(2026, 2, 1)), date(2026, 3, 10));
        assert_eq!(mv.as_of_date(date(2026, 3, 10)), date(2026, 3, 10));
    }

    #[test]
    fn as_of_date_falls_back_to_today_for_past_planned_date() {
        let (catalog, unit, _) = units();
        let mut mv = StockMove::draft(new_move(Decimal::ONE, unit.id, unit.id), &catalog).unwrap();
        mv.planned_date = Some(date(2025, 12, 31));
        assert_eq!(mv.as_of_date(date(2026, 2, 1)), date(2026, 2, 1));

        mv.planned_date = None;
        assert_eq!(mv.as_of_date(date(2026, 2, 1)), date(2026, 2, 1));
    }

    #[test]
    fn lot_bound_or_non_draft_moves_are_not_splittable() {
        let (catalog, unit, _) = units();
        let draft = StockMove::draft(new_move(Decimal::ONE, unit.id, unit.id), &catalog).unwrap();

        for state in [MoveState::Assigned, MoveState::Done, MoveState::Cancel] {
            let mv = StockMove {
                state,
                ..draft.clone()
            };
            let err = mv.ensure_splittable().unwrap_err();
            assert_eq!(
                err,
                AllocationError::InvalidAllocationState {
                    move_id: mv.id,
                    state,
                    lot: None,
                }
            );
        }

        let lot = LotId::new();
        let bound = StockMove {
            lot: Some(lot),
            ..draft
        };
        assert!(!bound.is_splittable());
        assert!(bound.ensure_splittable().is_err());
    }

    #[test]
    fn fragment_keeps_everything_but_lot_and_quantity() {
        let (catalog, unit, _) = units();
        let mut original =
            StockMove::draft(new_move(Decimal::from(10), unit.id, unit.id), &catalog).unwrap();
        original.unit_price = Some(Decimal::new(150, 2));
        original.planned_date = Some(date(2026, 4, 1));

        let lot = LotId::new();
        let id = MoveId::new();
        let copy = original.fragment(
            id,
            MoveOverrides {
                lot: Some(lot),
                quantity: Decimal::from(3),
                internal_quantity: Decimal::from(3),
            },
        );

        assert_eq!(copy.id, id);
        assert_eq!(copy.lot, Some(lot));
        assert_eq!(copy.quantity, Decimal::from(3));
        assert_eq!(copy.product, original.product);
        assert_eq!(copy.from_location, original.from_location);
        assert_eq!(copy.unit_price, original.unit_price);
        assert_eq!(copy.planned_date, original.planned_date);
    }
}
