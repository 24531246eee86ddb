use lotsplit_core::DomainResult;
use lotsplit_inventory::StockMove;

/// Decides whether a move must be served from a specific lot.
///
/// Typically answered from the product's lot-required location kinds and the
/// kinds of the move's two locations (see `Product::requires_lot`).
pub trait LotRequirement {
    fn lot_required(&self, mv: &StockMove) -> DomainResult<bool>;
}

impl<T: LotRequirement + ?Sized> LotRequirement for std::sync::Arc<T> {
    fn lot_required(&self, mv: &StockMove) -> DomainResult<bool> {
        (**self).lot_required(mv)
    }
}

impl<T: LotRequirement + ?Sized> LotRequirement for &T {
    fn lot_required(&self, mv: &StockMove) -> DomainResult<bool> {
        (**self).lot_required(mv)
    }
}
