//! FEFO allocation engine.
//!
//! Pure function over an already-fetched candidate list: no I/O, no lot
//! mutation. Quantity deduction against a lot only happens later, when a
//! fragment gets reserved.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use lotsplit_core::{LotId, UomConversion, ValueObject};

use crate::catalog::is_fefo_ordered;
use crate::error::AllocationResult;
use crate::lot::LotCandidate;
use crate::stock_move::StockMove;

/// Portion of a demand bound to one lot, or left unallocated (`lot == None`).
///
/// `quantity` is in the base unit and `display_quantity` in the move's own unit;
/// converting the latter back to the base unit gives the former.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fragment {
    pub lot: Option<LotId>,
    pub quantity: Decimal,
    pub display_quantity: Decimal,
}

impl Fragment {
    /// Lot-bound fragment of a demand entered in its base unit.
    pub fn allocated(lot: LotId, quantity: Decimal) -> Self {
        Self {
            lot: Some(lot),
            quantity,
            display_quantity: quantity,
        }
    }

    /// Residual fragment of a demand entered in its base unit.
    pub fn residual(quantity: Decimal) -> Self {
        Self {
            lot: None,
            quantity,
            display_quantity: quantity,
        }
    }

    pub fn displayed_as(mut self, display_quantity: Decimal) -> Self {
        self.display_quantity = display_quantity;
        self
    }

    pub fn is_residual(&self) -> bool {
        self.lot.is_none()
    }
}

impl ValueObject for Fragment {}

/// Ordered result of one allocation.
///
/// Lot-bound fragments come first, in consumption order; the residual, if any,
/// is last. An empty plan means "leave the move as it is".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllocationPlan {
    fragments: Vec<Fragment>,
}

impl AllocationPlan {
    pub fn noop() -> Self {
        Self::default()
    }

    pub fn is_noop(&self) -> bool {
        self.fragments.is_empty()
    }

    pub fn fragments(&self) -> &[Fragment] {
        &self.fragments
    }

    pub fn into_fragments(self) -> Vec<Fragment> {
        self.fragments
    }

    pub fn allocated(&self) -> impl Iterator<Item = &Fragment> {
        self.fragments.iter().filter(|f| !f.is_residual())
    }

    /// Unmet base-unit quantity (zero when fully covered).
    pub fn residual_quantity(&self) -> Decimal {
        self.fragments
            .iter()
            .filter(|f| f.is_residual())
            .map(|f| f.quantity)
            .sum()
    }

    pub fn allocated_quantity(&self) -> Decimal {
        self.allocated().map(|f| f.quantity).sum()
    }

    pub fn is_fully_allocated(&self) -> bool {
        !self.is_noop() && self.fragments.iter().all(|f| !f.is_residual())
    }
}

impl ValueObject for AllocationPlan {}

/// Split `demand` across `candidates` (already in FEFO order), earliest expiry first.
///
/// Lots at or below the base unit's rounding tolerance are skipped. A remainder
/// within tolerance counts as fully covered; a larger one becomes the residual
/// fragment. When no lot contributes anything the plan is a no-op.
///
/// Progress is tracked cumulatively in both units. The covered display quantity
/// is rounded down, then converted back to fix the base quantity, so a lot never
/// shows more than it gives and every fragment converts back exactly. A lot whose
/// share rounds to nothing in the display unit stays untouched and its portion
/// goes to the residual.
pub fn allocate<U>(
    demand: &StockMove,
    candidates: &[LotCandidate],
    uoms: &U,
) -> AllocationResult<AllocationPlan>
where
    U: UomConversion + ?Sized,
{
    demand.ensure_splittable()?;
    debug_assert!(is_fefo_ordered(candidates), "candidates must be in FEFO order");

    let tolerance = uoms.rounding_tolerance(demand.base_unit)?;
    let display_tolerance = uoms.rounding_tolerance(demand.unit)?;
    let mut covered = Decimal::ZERO;
    let mut covered_display = Decimal::ZERO;
    let mut fragments = Vec::new();

    for candidate in candidates {
        let remainder = demand.internal_quantity - covered;
        if remainder <= tolerance {
            break;
        }
        if candidate.available_quantity <= tolerance {
            tracing::trace!(lot = %candidate.lot, "skipping lot with no usable quantity");
            continue;
        }
        let target = covered + candidate.available_quantity.min(remainder);
        let target_display = uoms
            .convert_quantity_down(demand.base_unit, demand.unit, target)?
            .min(demand.quantity);
        let target = uoms.convert_quantity(demand.unit, demand.base_unit, target_display)?;

        let take = target - covered;
        let shown = target_display - covered_display;
        if take <= Decimal::ZERO || shown <= Decimal::ZERO {
            tracing::trace!(lot = %candidate.lot, "skipping lot too small for the move unit");
            continue;
        }
        fragments.push(Fragment::allocated(candidate.lot, take).displayed_as(shown));
        covered = target;
        covered_display = target_display;
    }

    if fragments.is_empty() {
        return Ok(AllocationPlan::noop());
    }

    let residual = demand.internal_quantity - covered;
    let residual_display = demand.quantity - covered_display;
    match (residual > tolerance, residual_display > display_tolerance) {
        (true, true) => fragments.push(Fragment::residual(residual).displayed_as(residual_display)),
        // Base quantity covered, display short by rounding only.
        (false, true) => {
            if let Some(last) = fragments.last_mut() {
                last.display_quantity += residual_display;
            }
        }
        // Nothing left that the move unit can show.
        (true, false) | (false, false) => {}
    }

    Ok(AllocationPlan { fragments })
}
