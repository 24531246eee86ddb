use thiserror::Error;

use lotsplit_core::{DomainError, LotId, MoveId};

use crate::stock_move::MoveState;

pub type AllocationResult<T> = Result<T, AllocationError>;

/// Errors raised while allocating a stock move to lots.
///
/// Running out of stock is *not* an error: it shows up as a residual fragment.
/// An empty catalog is not an error either: the move is returned unchanged.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AllocationError {
    /// The move is not draft, or it is already bound to a lot.
    #[error(
        "stock move {move_id} cannot be split by expiry date: it is {state} or already has a lot"
    )]
    InvalidAllocationState {
        move_id: MoveId,
        state: MoveState,
        lot: Option<LotId>,
    },

    /// A collaborator (unit conversion, move storage, lot catalog) failed.
    #[error(transparent)]
    Domain(#[from] DomainError),
}

impl AllocationError {
    /// Move the error refers to, when it is about one specific move.
    pub fn move_id(&self) -> Option<MoveId> {
        match self {
            AllocationError::InvalidAllocationState { move_id, .. } => Some(*move_id),
            AllocationError::Domain(_) => None,
        }
    }
}
