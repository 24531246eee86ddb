//! Shipment-level orchestration of the expiry-date split.

use lotsplit_core::{Clock, DomainResult, MoveId, UomConversion};
use lotsplit_inventory::{
    AllocationError, LotCatalog, MoveRepository, MoveSplitter, MoveState, StockMove,
};

use crate::error::ShippingResult;
use crate::policy::LotRequirement;
use crate::reservation::{Grouping, Reservation, ReservationReport};
use crate::shipment::{ShipmentOut, ShipmentState};

/// What happened to one inventory move of the shipment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineOutcome {
    /// Not eligible: already has a lot, not draft, or the product needs no lot.
    Skipped { move_id: MoveId },
    /// Eligible, but no lot could serve it.
    Unchanged { move_id: MoveId },
    /// Split into `fragments` (the original first); `residual` is the lot-less part, if any.
    Split {
        move_id: MoveId,
        fragments: Vec<MoveId>,
        residual: Option<MoveId>,
    },
    /// The splitter refused the move. Other lines are unaffected.
    Rejected { move_id: MoveId, error: AllocationError },
}

impl LineOutcome {
    pub fn move_id(&self) -> MoveId {
        match self {
            LineOutcome::Skipped { move_id }
            | LineOutcome::Unchanged { move_id }
            | LineOutcome::Split { move_id, .. }
            | LineOutcome::Rejected { move_id, .. } => *move_id,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SplitReport {
    pub lines: Vec<LineOutcome>,
}

impl SplitReport {
    pub fn rejected(&self) -> impl Iterator<Item = (MoveId, &AllocationError)> {
        self.lines.iter().filter_map(|line| match line {
            LineOutcome::Rejected { move_id, error } => Some((*move_id, error)),
            _ => None,
        })
    }

    pub fn residuals(&self) -> impl Iterator<Item = MoveId> + '_ {
        self.lines.iter().filter_map(|line| match line {
            LineOutcome::Split { residual, .. } => *residual,
            _ => None,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssignReport {
    pub split: SplitReport,
    pub reservation: ReservationReport,
    /// Every live move of the shipment is assigned, and lot-bound where a lot is required.
    pub fully_assigned: bool,
}

/// Drives the move splitter and the reservation step for whole shipments.
pub struct ShipmentAllocator<R, C, U, K, L, V> {
    splitter: MoveSplitter<R, C, U, K>,
    policy: L,
    reservation: V,
}

impl<R, C, U, K, L, V> ShipmentAllocator<R, C, U, K, L, V>
where
    R: MoveRepository,
    C: LotCatalog,
    U: UomConversion,
    K: Clock,
    L: LotRequirement,
    V: Reservation,
{
    pub fn new(splitter: MoveSplitter<R, C, U, K>, policy: L, reservation: V) -> Self {
        Self {
            splitter,
            policy,
            reservation,
        }
    }

    pub fn splitter(&self) -> &MoveSplitter<R, C, U, K> {
        &self.splitter
    }

    /// Lot-less, still open, and its product tracks lots for these locations.
    pub fn needs_split(&self, mv: &StockMove) -> DomainResult<bool> {
        if mv.lot.is_some()
            || matches!(mv.state, MoveState::Cancel | MoveState::Assigned | MoveState::Done)
        {
            return Ok(false);
        }
        self.policy.lot_required(mv)
    }

    /// Split every eligible inventory move of the shipment by lot expiry date.
    ///
    /// New fragments are attached to the shipment. A rejected move is reported
    /// and the remaining moves are still processed.
    pub fn split_moves_by_expiry_date(&self, shipment: &mut ShipmentOut) -> ShippingResult<SplitReport> {
        let moves = self.splitter.moves();
        let lines = shipment.inventory_moves().to_vec();

        let mut eligible = Vec::new();
        for &move_id in &lines {
            if self.needs_split(&moves.get(move_id)?)? {
                eligible.push(move_id);
            }
        }

        let mut created = Vec::new();
        let mut outcomes = self.splitter.split_many(&eligible).into_iter().peekable();
        let mut report = SplitReport::default();
        for move_id in lines {
            let Some((_, result)) = outcomes.next_if(|(id, _)| *id == move_id) else {
                report.lines.push(LineOutcome::Skipped { move_id });
                continue;
            };
            let line = match result {
                Ok(result) if result.len() == 1 && result[0].lot.is_none() => {
                    LineOutcome::Unchanged { move_id }
                }
                Ok(result) => {
                    let residual = result.iter().find(|m| m.lot.is_none()).map(|m| m.id);
                    let fragments: Vec<MoveId> = result.iter().map(|m| m.id).collect();
                    created.extend(fragments.iter().skip(1).copied());
                    LineOutcome::Split {
                        move_id,
                        fragments,
                        residual,
                    }
                }
                Err(error) => {
                    tracing::warn!(move_id = %move_id, error = %error, "move rejected by expiry-date split");
                    LineOutcome::Rejected { move_id, error }
                }
            };
            report.lines.push(line);
        }

        shipment.attach_moves(created)?;
        Ok(report)
    }

    /// Split, then try to reserve every draft move of a waiting shipment.
    ///
    /// The shipment becomes `assigned` only when the fold over its moves says
    /// they are all covered. Anything less is reported, not raised.
    pub fn assign_try(&self, shipment: &mut ShipmentOut) -> ShippingResult<AssignReport> {
        shipment.ensure_state(ShipmentState::Waiting)?;

        let split = self.split_moves_by_expiry_date(shipment)?;

        let pending: Vec<StockMove> = self
            .load_moves(shipment)?
            .into_iter()
            .filter(|m| m.state == MoveState::Draft)
            .collect();
        let reservation = self
            .reservation
            .assign_try(&pending, &Grouping::product_and_lot())?;
        self.splitter
            .moves()
            .set_state(&reservation.assigned, MoveState::Assigned)?;

        let moves = self.load_moves(shipment)?;
        let fully_assigned = moves
            .iter()
            .filter(|m| m.state != MoveState::Cancel)
            .try_fold(true, |all, mv| -> DomainResult<bool> {
                let reserved = matches!(mv.state, MoveState::Assigned | MoveState::Done);
                let lot_satisfied = mv.lot.is_some() || !self.policy.lot_required(mv)?;
                Ok(all && reserved && lot_satisfied)
            })?;

        if fully_assigned {
            shipment.mark_assigned()?;
        }

        tracing::info!(
            shipment_id = %shipment.id_typed(),
            moves = moves.len(),
            assigned = reservation.assigned.len(),
            fully_assigned,
            "assign try finished"
        );
        if !fully_assigned {
            let summary: Vec<_> = moves.iter().map(|m| (m.id, m.state, m.lot)).collect();
            tracing::debug!(shipment_id = %shipment.id_typed(), moves = ?summary, "shipment not fully assigned");
        }

        Ok(AssignReport {
            split,
            reservation,
            fully_assigned,
        })
    }

    fn load_moves(&self, shipment: &ShipmentOut) -> DomainResult<Vec<StockMove>> {
        shipment
            .inventory_moves()
            .iter()
            .map(|id| self.splitter.moves().get(*id))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use std::sync::RwLock;

    use chrono::NaiveDate;
    use rust_decimal::Decimal;
    use uuid::Uuid;

    use lotsplit_core::{
        DomainError, FixedClock, LocationId, LotId, ProductId, ShipmentId, Uom, UomCatalog, UomId,
    };
    use lotsplit_inventory::{LotCandidate, LotQuery, MoveOverrides, NewStockMove, fefo_candidates};

    use crate::reservation::ReservationOutcome;

    #[derive(Default)]
    struct Moves(RwLock<BTreeMap<MoveId, StockMove>>);

    impl Moves {
        fn insert(&self, mv: StockMove) {
            self.0.write().unwrap().insert(mv.id, mv);
        }

        fn update(&self, id: MoveId, f: impl FnOnce(&mut StockMove)) -> DomainResult<()> {
            let mut map = self.0.write().unwrap();
            f(map.get_mut(&id).ok_or_else(|| DomainError::not_found("move"))?);
            Ok(())
        }
    }

    impl MoveRepository for Moves {
        fn get(&self, id: MoveId) -> DomainResult<StockMove> {
            self.0.read().unwrap().get(&id).cloned().ok_or_else(|| DomainError::not_found("move"))
        }

        fn set_state(&self, ids: &[MoveId], state: MoveState) -> DomainResult<()> {
            ids.iter().try_for_each(|id| self.update(*id, |m| m.state = state))
        }

        fn bind_lot(&self, id: MoveId, lot: Option<LotId>) -> DomainResult<()> {
            self.update(id, |m| m.lot = lot)
        }

        fn set_quantity(&self, id: MoveId, quantity: Decimal, internal: Decimal) -> DomainResult<()> {
            self.update(id, |m| {
                m.quantity = quantity;
                m.internal_quantity = internal;
            })
        }

        fn clone_with_overrides(&self, id: MoveId, overrides: MoveOverrides) -> DomainResult<MoveId> {
            let new_id = MoveId::new();
            let copy = self.get(id)?.fragment(new_id, overrides);
            self.insert(copy);
            Ok(new_id)
        }
    }

    struct Lots(Vec<LotCandidate>);

    impl LotCatalog for Lots {
        fn candidate_lots(&self, query: &LotQuery) -> DomainResult<Vec<LotCandidate>> {
            Ok(fefo_candidates(self.0.clone(), query.as_of_date))
        }
    }

    /// Lots are tracked for every product except `untracked`.
    struct Policy {
        untracked: Option<ProductId>,
    }

    impl LotRequirement for Policy {
        fn lot_required(&self, mv: &StockMove) -> DomainResult<bool> {
            Ok(Some(mv.product) != self.untracked)
        }
    }

    /// Reserves every lot-bound move, and lot-less moves of untracked products.
    struct ReserveBound {
        untracked: Option<ProductId>,
    }

    impl Reservation for ReserveBound {
        fn assign_try(&self, moves: &[StockMove], _: &Grouping) -> DomainResult<ReservationReport> {
            let assigned = moves
                .iter()
                .filter(|m| m.lot.is_some() || Some(m.product) == self.untracked)
                .map(|m| m.id)
                .collect();
            Ok(ReservationReport::from_assigned(assigned, moves.len()))
        }
    }

    type Allocator<'a> =
        ShipmentAllocator<&'a Moves, Lots, UomCatalog, FixedClock, Policy, ReserveBound>;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 6, 1).unwrap()
    }

    fn lot_id(n: u128) -> LotId {
        LotId::from_uuid(Uuid::from_u128(n))
    }

    fn unit() -> Uom {
        Uom::new(UomId::from_uuid(Uuid::from_u128(1)), "Unit", "units", Decimal::ONE, Decimal::ONE)
            .unwrap()
    }

    fn lots(quantity: i64) -> Lots {
        Lots(
            (2..=4)
                .map(|n| LotCandidate {
                    lot: lot_id(n),
                    number: format!("{n:05}"),
                    expiry_date: today() + chrono::Duration::days(n as i64 * 10),
                    available_quantity: Decimal::from(quantity),
                })
                .collect(),
        )
    }

    fn allocator(moves: &Moves, lots: Lots, untracked: Option<ProductId>) -> Allocator<'_> {
        let uoms = UomCatalog::new().with(unit());
        let splitter = MoveSplitter::new(moves, lots, uoms, FixedClock(today()));
        ShipmentAllocator::new(splitter, Policy { untracked }, ReserveBound { untracked })
    }

    fn add_move(moves: &Moves, shipment: &mut ShipmentOut, product: ProductId, qty: i64) -> MoveId {
        let uoms = UomCatalog::new().with(unit());
        let mv = StockMove::draft(
            NewStockMove {
                id: MoveId::new(),
                product,
                quantity: Decimal::from(qty),
                unit: unit().id,
                base_unit: unit().id,
                from_location: LocationId::new(),
                to_location: LocationId::new(),
                planned_date: shipment.planned_date(),
                shipment: Some(shipment.id_typed()),
                unit_price: None,
            },
            &uoms,
        )
        .unwrap();
        let id = mv.id;
        moves.insert(mv);
        shipment.attach_moves([id]).unwrap();
        id
    }

    fn waiting_shipment() -> ShipmentOut {
        let mut s = ShipmentOut::new(ShipmentId::new(), "OUT/0001", Some(today()));
        s.wait().unwrap();
        s
    }

    #[test]
    fn under_supply_leaves_shipment_waiting_with_a_residual() {
        let moves = Moves::default();
        let mut shipment = waiting_shipment();
        let line = add_move(&moves, &mut shipment, ProductId::new(), 15);

        let report = allocator(&moves, lots(4), None).assign_try(&mut shipment).unwrap();

        assert!(!report.fully_assigned);
        assert_eq!(report.reservation.outcome, ReservationOutcome::Partial);
        assert_eq!(shipment.state(), ShipmentState::Waiting);
        assert_eq!(shipment.inventory_moves().len(), 4);
        assert_eq!(shipment.inventory_moves()[0], line);

        let residual = report.split.residuals().next().unwrap();
        let residual = moves.get(residual).unwrap();
        assert_eq!(residual.quantity, Decimal::from(3));
        assert_eq!(residual.state, MoveState::Draft);
    }

    #[test]
    fn exact_supply_assigns_the_shipment() {
        let moves = Moves::default();
        let mut shipment = waiting_shipment();
        add_move(&moves, &mut shipment, ProductId::new(), 12);

        let report = allocator(&moves, lots(4), None).assign_try(&mut shipment).unwrap();

        assert!(report.fully_assigned);
        assert_eq!(shipment.state(), ShipmentState::Assigned);
        for id in shipment.inventory_moves() {
            let mv = moves.get(*id).unwrap();
            assert_eq!(mv.state, MoveState::Assigned);
            assert!(mv.lot.is_some());
        }
    }

    #[test]
    fn untracked_products_are_skipped_but_still_reserved() {
        let moves = Moves::default();
        let mut shipment = waiting_shipment();
        let product = ProductId::new();
        let line = add_move(&moves, &mut shipment, product, 5);

        let report = allocator(&moves, lots(4), Some(product))
            .assign_try(&mut shipment)
            .unwrap();

        assert_eq!(report.split.lines, vec![LineOutcome::Skipped { move_id: line }]);
        assert!(report.fully_assigned);
        assert_eq!(moves.get(line).unwrap().lot, None);
    }

    #[test]
    fn no_lots_leaves_line_unchanged() {
        let moves = Moves::default();
        let mut shipment = waiting_shipment();
        let line = add_move(&moves, &mut shipment, ProductId::new(), 5);

        let report = allocator(&moves, Lots(Vec::new()), None)
            .split_moves_by_expiry_date(&mut shipment)
            .unwrap();

        assert_eq!(report.lines, vec![LineOutcome::Unchanged { move_id: line }]);
        assert_eq!(shipment.inventory_moves(), &[line]);
    }

    #[test]
    fn outcomes_follow_shipment_line_order() {
        let moves = Moves::default();
        let mut shipment = waiting_shipment();
        let untracked = ProductId::new();
        let first = add_move(&moves, &mut shipment, ProductId::new(), 3);
        let skipped = add_move(&moves, &mut shipment, untracked, 1);
        let last = add_move(&moves, &mut shipment, ProductId::new(), 6);

        let report = allocator(&moves, lots(4), Some(untracked))
            .split_moves_by_expiry_date(&mut shipment)
            .unwrap();

        let ids: Vec<_> = report.lines.iter().map(LineOutcome::move_id).collect();
        assert_eq!(ids, vec![first, skipped, last]);
        assert!(matches!(
            &report.lines[0],
            LineOutcome::Split { fragments, residual: None, .. } if fragments == &vec![first]
        ));
        assert_eq!(report.lines[1], LineOutcome::Skipped { move_id: skipped });
        assert!(matches!(
            &report.lines[2],
            LineOutcome::Split { fragments, residual: None, .. } if fragments.len() == 2
        ));
        assert_eq!(shipment.inventory_moves().len(), 4);
    }

    #[test]
    fn assign_try_requires_waiting_shipment() {
        let moves = Moves::default();
        let mut shipment = ShipmentOut::new(ShipmentId::new(), "OUT/0002", None);

        let err = allocator(&moves, lots(4), None).assign_try(&mut shipment).unwrap_err();
        assert!(matches!(err, crate::ShippingError::InvalidShipmentState { .. }));
    }

    #[test]
    fn lot_bound_and_closed_moves_are_not_split() {
        let moves = Moves::default();
        let mut shipment = waiting_shipment();
        let bound = add_move(&moves, &mut shipment, ProductId::new(), 2);
        moves.bind_lot(bound, Some(lot_id(3))).unwrap();
        let cancelled = add_move(&moves, &mut shipment, ProductId::new(), 2);
        moves.set_state(&[cancelled], MoveState::Cancel).unwrap();

        let report = allocator(&moves, lots(4), None)
            .split_moves_by_expiry_date(&mut shipment)
            .unwrap();

        assert_eq!(
            report.lines,
            vec![
                LineOutcome::Skipped { move_id: bound },
                LineOutcome::Skipped { move_id: cancelled },
            ]
        );
        assert_eq!(report.rejected().count(), 0);
    }
}
