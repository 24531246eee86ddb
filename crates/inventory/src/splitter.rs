//! Move splitter: turns an allocation plan into stock move records.
//!
//! The original move becomes the first fragment (same identity, now bound to a
//! lot); every further fragment, residual included, becomes a sibling copy.

use rust_decimal::Decimal;

use lotsplit_core::{Clock, DomainResult, LotId, MoveId, UomConversion};

use crate::allocation::allocate;
use crate::catalog::{LotCatalog, LotQuery};
use crate::error::AllocationResult;
use crate::stock_move::{MoveOverrides, MoveState, StockMove};

/// Read/write surface over stored stock moves.
///
/// Only the primitives the splitter needs. Implementations use interior
/// mutability so they can be shared behind an `Arc`.
pub trait MoveRepository {
    fn get(&self, id: MoveId) -> DomainResult<StockMove>;

    fn get_state(&self, id: MoveId) -> DomainResult<MoveState> {
        Ok(self.get(id)?.state)
    }

    fn set_state(&self, ids: &[MoveId], state: MoveState) -> DomainResult<()>;

    fn bind_lot(&self, id: MoveId, lot: Option<LotId>) -> DomainResult<()>;

    /// Set the display quantity and its base-unit counterpart together.
    fn set_quantity(&self, id: MoveId, quantity: Decimal, internal_quantity: Decimal) -> DomainResult<()>;

    /// Store a copy of `id` that differs only by the overridden fields; returns the new id.
    fn clone_with_overrides(&self, id: MoveId, overrides: MoveOverrides) -> DomainResult<MoveId>;
}

impl<R: MoveRepository + ?Sized> MoveRepository for std::sync::Arc<R> {
    fn get(&self, id: MoveId) -> DomainResult<StockMove> {
        (**self).get(id)
    }

    fn get_state(&self, id: MoveId) -> DomainResult<MoveState> {
        (**self).get_state(id)
    }

    fn set_state(&self, ids: &[MoveId], state: MoveState) -> DomainResult<()> {
        (**self).set_state(ids, state)
    }

    fn bind_lot(&self, id: MoveId, lot: Option<LotId>) -> DomainResult<()> {
        (**self).bind_lot(id, lot)
    }

    fn set_quantity(&self, id: MoveId, quantity: Decimal, internal_quantity: Decimal) -> DomainResult<()> {
        (**self).set_quantity(id, quantity, internal_quantity)
    }

    fn clone_with_overrides(&self, id: MoveId, overrides: MoveOverrides) -> DomainResult<MoveId> {
        (**self).clone_with_overrides(id, overrides)
    }
}

impl<R: MoveRepository + ?Sized> MoveRepository for &R {
    fn get(&self, id: MoveId) -> DomainResult<StockMove> {
        (**self).get(id)
    }

    fn get_state(&self, id: MoveId) -> DomainResult<MoveState> {
        (**self).get_state(id)
    }

    fn set_state(&self, ids: &[MoveId], state: MoveState) -> DomainResult<()> {
        (**self).set_state(ids, state)
    }

    fn bind_lot(&self, id: MoveId, lot: Option<LotId>) -> DomainResult<()> {
        (**self).bind_lot(id, lot)
    }

    fn set_quantity(&self, id: MoveId, quantity: Decimal, internal_quantity: Decimal) -> DomainResult<()> {
        (**self).set_quantity(id, quantity, internal_quantity)
    }

    fn clone_with_overrides(&self, id: MoveId, overrides: MoveOverrides) -> DomainResult<MoveId> {
        (**self).clone_with_overrides(id, overrides)
    }
}

/// Splits stock moves by lot expiry date.
#[derive(Debug, Clone)]
pub struct MoveSplitter<R, C, U, K> {
    moves: R,
    catalog: C,
    uoms: U,
    clock: K,
    assignable_only: bool,
}

impl<R, C, U, K> MoveSplitter<R, C, U, K>
where
    R: MoveRepository,
    C: LotCatalog,
    U: UomConversion,
    K: Clock,
{
    pub fn new(moves: R, catalog: C, uoms: U, clock: K) -> Self {
        Self {
            moves,
            catalog,
            uoms,
            clock,
            assignable_only: true,
        }
    }

    /// Count forecast stock as available too (default: only assignable stock).
    pub fn with_assignable_only(mut self, assignable_only: bool) -> Self {
        self.assignable_only = assignable_only;
        self
    }

    pub fn moves(&self) -> &R {
        &self.moves
    }

    /// Split one move across the lots of its source location, earliest expiry first.
    ///
    /// Returns `[original, ...new fragments]`. The original comes back unchanged
    /// when no lot can serve it.
    pub fn split(&self, move_id: MoveId) -> AllocationResult<Vec<StockMove>> {
        let demand = self.moves.get(move_id)?;
        demand.ensure_splittable()?;

        let query = LotQuery {
            product: demand.product,
            location: demand.from_location,
            as_of_date: demand.as_of_date(self.clock.today()),
            assignable_only: self.assignable_only,
        };
        let candidates = self.catalog.candidate_lots(&query)?;
        tracing::debug!(
            move_id = %move_id,
            as_of_date = %query.as_of_date,
            candidates = candidates.len(),
            "queried candidate lots"
        );
        if candidates.is_empty() {
            return Ok(vec![demand]);
        }

        let plan = allocate(&demand, &candidates, &self.uoms)?;
        let Some((first, rest)) = plan.fragments().split_first() else {
            return Ok(vec![demand]);
        };

        let state = demand.state;
        if state != MoveState::Draft {
            self.moves.set_state(&[move_id], MoveState::Draft)?;
        }

        let mut ids = Vec::with_capacity(plan.fragments().len());

        self.moves.bind_lot(move_id, first.lot)?;
        self.moves
            .set_quantity(move_id, first.display_quantity, first.quantity)?;
        ids.push(move_id);

        for fragment in rest {
            let overrides = MoveOverrides {
                lot: fragment.lot,
                quantity: fragment.display_quantity,
                internal_quantity: fragment.quantity,
            };
            let id = self.moves.clone_with_overrides(move_id, overrides)?;
            tracing::debug!(move_id = %id, lot = ?fragment.lot, quantity = %fragment.quantity, "created fragment");
            ids.push(id);
        }

        // Restore the state only once every fragment exists.
        self.moves.set_state(&ids, state)?;

        tracing::info!(
            move_id = %move_id,
            fragments = ids.len(),
            residual = %plan.residual_quantity(),
            "split move by expiry date"
        );

        ids.into_iter()
            .map(|id| self.moves.get(id))
            .collect::<DomainResult<Vec<_>>>()
            .map_err(Into::into)
    }

    /// Split several moves; a failure on one move does not affect the others.
    pub fn split_many(&self, ids: &[MoveId]) -> Vec<(MoveId, AllocationResult<Vec<StockMove>>)> {
        ids.iter().map(|&id| (id, self.split(id))).collect()
    }
}
