//! In-memory wiring: stores, ledger, directory and the shipment allocator over them.

use std::sync::Arc;

use lotsplit_core::{Clock, DomainError, DomainResult, MoveId, UomCatalog};
use lotsplit_inventory::{MoveRepository, MoveSplitter, MoveState, NewStockMove, StockMove};
use lotsplit_shipping::{ShipmentAllocator, ShipmentOut, ShipmentState, ShippingResult};

use crate::config::LotSplitConfig;
use crate::stock::{InMemoryStock, InventoryDirectory};
use crate::store::InMemoryMoveStore;

pub type InMemoryAllocator = ShipmentAllocator<
    Arc<InMemoryMoveStore>,
    Arc<InMemoryStock>,
    Arc<UomCatalog>,
    Arc<dyn Clock>,
    Arc<InventoryDirectory>,
    Arc<InMemoryStock>,
>;

/// Everything a shipment needs, held in memory (dev/test).
pub struct InMemoryServices {
    pub uoms: Arc<UomCatalog>,
    pub moves: Arc<InMemoryMoveStore>,
    pub stock: Arc<InMemoryStock>,
    pub directory: Arc<InventoryDirectory>,
    allocator: InMemoryAllocator,
}

impl InMemoryServices {
    pub fn build(config: &LotSplitConfig, uoms: UomCatalog) -> Self {
        let uoms = Arc::new(uoms);
        let moves = Arc::new(InMemoryMoveStore::new());
        let stock = Arc::new(InMemoryStock::new());
        let directory = Arc::new(
            InventoryDirectory::new().with_default_lot_required(config.lot_required.iter().copied()),
        );

        let splitter = MoveSplitter::new(moves.clone(), stock.clone(), uoms.clone(), config.clock())
            .with_assignable_only(config.assignable_only);
        let allocator = ShipmentAllocator::new(splitter, directory.clone(), stock.clone());

        Self {
            uoms,
            moves,
            stock,
            directory,
            allocator,
        }
    }

    pub fn allocator(&self) -> &InMemoryAllocator {
        &self.allocator
    }

    /// Store a new draft move and attach it to `shipment`.
    pub fn add_move(&self, shipment: &mut ShipmentOut, new: NewStockMove) -> ShippingResult<StockMove> {
        let mv = StockMove::draft(
            NewStockMove {
                shipment: Some(shipment.id_typed()),
                ..new
            },
            self.uoms.as_ref(),
        )?;
        self.moves.insert(mv.clone())?;
        shipment.attach_moves([mv.id])?;
        Ok(mv)
    }

    /// Carry out assigned moves: stock leaves the source location and the moves become done.
    pub fn do_moves(&self, ids: &[MoveId]) -> DomainResult<()> {
        for &id in ids {
            let mv = self.moves.get(id)?;
            if mv.state != MoveState::Assigned {
                return Err(DomainError::conflict(format!(
                    "stock move {id} is {} and cannot be done",
                    mv.state
                )));
            }
            self.stock.complete(&mv)?;
            self.moves.set_state(&[id], MoveState::Done)?;
        }
        Ok(())
    }

    /// Cancel moves, releasing whatever they had reserved.
    pub fn cancel_moves(&self, ids: &[MoveId]) -> DomainResult<()> {
        for &id in ids {
            if self.moves.get_state(id)? == MoveState::Done {
                return Err(DomainError::conflict(format!("stock move {id} is already done")));
            }
        }
        for &id in ids {
            self.stock.release(id)?;
        }
        self.moves.set_state(ids, MoveState::Cancel)
    }

    /// Ship an assigned shipment: every live move is done, then the shipment.
    pub fn ship(&self, shipment: &mut ShipmentOut) -> ShippingResult<()> {
        shipment.ensure_state(ShipmentState::Assigned)?;
        let mut live = Vec::new();
        for &id in shipment.inventory_moves() {
            if self.moves.get_state(id)? != MoveState::Cancel {
                live.push(id);
            }
        }
        self.do_moves(&live)?;
        shipment.done()?;
        tracing::info!(shipment_id = %shipment.id_typed(), moves = live.len(), "shipment done");
        Ok(())
    }
}
