use std::collections::BTreeMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use rust_decimal::Decimal;

use lotsplit_core::{DomainError, DomainResult, LotId, MoveId};
use lotsplit_inventory::{MoveOverrides, MoveRepository, MoveState, StockMove};

/// In-memory stock move store for tests/dev.
#[derive(Debug, Default)]
pub struct InMemoryMoveStore {
    inner: RwLock<BTreeMap<MoveId, StockMove>>,
}

impl InMemoryMoveStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, mv: StockMove) -> DomainResult<()> {
        let mut map = self.write()?;
        if map.contains_key(&mv.id) {
            return Err(DomainError::conflict(format!("stock move {} already exists", mv.id)));
        }
        map.insert(mv.id, mv);
        Ok(())
    }

    pub fn list(&self) -> DomainResult<Vec<StockMove>> {
        Ok(self.read()?.values().cloned().collect())
    }

    /// Delete a draft or cancelled move.
    pub fn remove(&self, id: MoveId) -> DomainResult<StockMove> {
        let mut map = self.write()?;
        let state = map.get(&id).map(|m| m.state).ok_or_else(|| not_found(id))?;
        if !matches!(state, MoveState::Draft | MoveState::Cancel) {
            return Err(DomainError::conflict(format!(
                "stock move {id} is {state} and cannot be deleted"
            )));
        }
        map.remove(&id).ok_or_else(|| not_found(id))
    }

    fn read(&self) -> DomainResult<RwLockReadGuard<'_, BTreeMap<MoveId, StockMove>>> {
        self.inner
            .read()
            .map_err(|_| DomainError::invariant("move store lock poisoned"))
    }

    fn write(&self) -> DomainResult<RwLockWriteGuard<'_, BTreeMap<MoveId, StockMove>>> {
        self.inner
            .write()
            .map_err(|_| DomainError::invariant("move store lock poisoned"))
    }

    fn update(&self, id: MoveId, f: impl FnOnce(&mut StockMove)) -> DomainResult<()> {
        let mut map = self.write()?;
        let mv = map.get_mut(&id).ok_or_else(|| not_found(id))?;
        f(mv);
        Ok(())
    }
}

fn not_found(id: MoveId) -> DomainError {
    DomainError::not_found(format!("stock move {id}"))
}

impl MoveRepository for InMemoryMoveStore {
    fn get(&self, id: MoveId) -> DomainResult<StockMove> {
        self.read()?.get(&id).cloned().ok_or_else(|| not_found(id))
    }

    fn set_state(&self, ids: &[MoveId], state: MoveState) -> DomainResult<()> {
        let mut map = self.write()?;
        // All or nothing.
        if let Some(missing) = ids.iter().find(|id| !map.contains_key(id)) {
            return Err(not_found(*missing));
        }
        for id in ids {
            if let Some(mv) = map.get_mut(id) {
                mv.state = state;
            }
        }
        Ok(())
    }

    fn bind_lot(&self, id: MoveId, lot: Option<LotId>) -> DomainResult<()> {
        self.update(id, |mv| mv.lot = lot)
    }

    fn set_quantity(&self, id: MoveId, quantity: Decimal, internal_quantity: Decimal) -> DomainResult<()> {
        self.update(id, |mv| {
            mv.quantity = quantity;
            mv.internal_quantity = internal_quantity;
        })
    }

    fn clone_with_overrides(&self, id: MoveId, overrides: MoveOverrides) -> DomainResult<MoveId> {
        let mut map = self.write()?;
        let copy = map
            .get(&id)
            .ok_or_else(|| not_found(id))?
            .fragment(MoveId::new(), overrides);
        let new_id = copy.id;
        map.insert(new_id, copy);
        Ok(new_id)
    }
}
