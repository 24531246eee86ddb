//! Lot catalog query: which lots can serve a move, in which order.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use lotsplit_core::{DomainResult, LocationId, ProductId};

use crate::lot::LotCandidate;

/// Explicit query context for candidate lots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LotQuery {
    pub product: ProductId,
    /// Quantities are computed for this location only.
    pub location: LocationId,
    /// Lots expiring on or before this date are excluded; quantities are as of this date.
    pub as_of_date: NaiveDate,
    /// Count only stock that can be reserved now (no forecast receipts).
    pub assignable_only: bool,
}

/// Source of candidate lots.
///
/// Implementations must return only lots with a positive available quantity and
/// an expiry date strictly after `as_of_date`, sorted by `(expiry_date, lot)`
/// ascending. [`fefo_candidates`] does the filtering and sorting for them.
pub trait LotCatalog {
    fn candidate_lots(&self, query: &LotQuery) -> DomainResult<Vec<LotCandidate>>;
}

impl<C: LotCatalog + ?Sized> LotCatalog for std::sync::Arc<C> {
    fn candidate_lots(&self, query: &LotQuery) -> DomainResult<Vec<LotCandidate>> {
        (**self).candidate_lots(query)
    }
}

impl<C: LotCatalog + ?Sized> LotCatalog for &C {
    fn candidate_lots(&self, query: &LotQuery) -> DomainResult<Vec<LotCandidate>> {
        (**self).candidate_lots(query)
    }
}

/// Keep the usable lots and put them in FEFO order.
pub fn fefo_candidates(
    lots: impl IntoIterator<Item = LotCandidate>,
    as_of_date: NaiveDate,
) -> Vec<LotCandidate> {
    let mut candidates: Vec<_> = lots
        .into_iter()
        .filter(|c| c.expiry_date > as_of_date && c.available_quantity > Decimal::ZERO)
        .collect();
    candidates.sort_by_key(LotCandidate::fefo_key);
    candidates
}

pub fn is_fefo_ordered(candidates: &[LotCandidate]) -> bool {
    candidates
        .windows(2)
        .all(|pair| pair[0].fefo_key() <= pair[1].fefo_key())
}
