use std::collections::BTreeMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use lotsplit_core::{DomainError, DomainResult, LocationId, LotId, MoveId, ProductId};
use lotsplit_inventory::{Lot, LotCandidate, LotCatalog, LotQuery, StockMove, fefo_candidates};
use lotsplit_shipping::{Grouping, GroupingKey, Reservation, ReservationReport};

/// Where a quantity of stock sits: product, location and (optionally) lot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct QuantKey {
    pub product: ProductId,
    pub location: LocationId,
    pub lot: Option<LotId>,
}

impl QuantKey {
    pub fn new(product: ProductId, location: LocationId, lot: Option<LotId>) -> Self {
        Self {
            product,
            location,
            lot,
        }
    }

    fn serves(&self, mv: &StockMove, grouping: &Grouping) -> bool {
        self.product == mv.product
            && self.location == mv.from_location
            && (!grouping.contains(GroupingKey::Lot) || self.lot == mv.lot)
    }
}

/// On-hand quantity of one [`QuantKey`], in the product's base unit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quant {
    pub quantity: Decimal,
    pub reserved: Decimal,
}

impl Quant {
    pub fn available(&self) -> Decimal {
        self.quantity - self.reserved
    }
}

#[derive(Debug, Clone)]
struct Incoming {
    key: QuantKey,
    quantity: Decimal,
    date: NaiveDate,
}

#[derive(Debug, Default)]
struct Ledger {
    lots: BTreeMap<LotId, Lot>,
    quants: BTreeMap<QuantKey, Quant>,
    incoming: Vec<Incoming>,
    reservations: BTreeMap<MoveId, Vec<(QuantKey, Decimal)>>,
}

impl Ledger {
    fn check_key(&self, key: &QuantKey) -> DomainResult<()> {
        let Some(lot_id) = key.lot else {
            return Ok(());
        };
        let lot = self
            .lots
            .get(&lot_id)
            .ok_or_else(|| DomainError::not_found(format!("lot {lot_id}")))?;
        if lot.product != key.product {
            return Err(DomainError::validation(format!(
                "lot {} belongs to another product",
                lot.number
            )));
        }
        Ok(())
    }

    /// Settle forecasts of `key` against an actual receipt, earliest date first.
    /// Returns the part of `quantity` that matched no forecast.
    fn settle_incoming(&mut self, key: &QuantKey, quantity: Decimal) -> Decimal {
        let mut left = quantity;
        for incoming in self.incoming.iter_mut().filter(|i| i.key == *key) {
            if left <= Decimal::ZERO {
                break;
            }
            let settled = incoming.quantity.min(left);
            incoming.quantity -= settled;
            left -= settled;
        }
        self.incoming.retain(|i| i.quantity > Decimal::ZERO);
        left
    }
}

fn positive(quantity: Decimal) -> DomainResult<()> {
    if quantity <= Decimal::ZERO {
        return Err(DomainError::validation("stock quantity must be positive"));
    }
    Ok(())
}

/// In-memory stock ledger.
///
/// Answers the lot catalog query for the splitter and reserves stock for the
/// shipment allocator. Quantities are kept in each product's base unit.
#[derive(Debug, Default)]
pub struct InMemoryStock {
    inner: RwLock<Ledger>,
}

impl InMemoryStock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_lot(&self, lot: Lot) -> DomainResult<()> {
        let mut ledger = self.write()?;
        if ledger.lots.contains_key(&lot.id) {
            return Err(DomainError::conflict(format!("lot {} already exists", lot.number)));
        }
        ledger.lots.insert(lot.id, lot);
        Ok(())
    }

    pub fn lot(&self, id: LotId) -> DomainResult<Lot> {
        self.read()?
            .lots
            .get(&id)
            .cloned()
            .ok_or_else(|| DomainError::not_found(format!("lot {id}")))
    }

    /// Put stock on hand (inventory receipt).
    ///
    /// The receipt first settles pending forecasts of the same key, so stock
    /// that was announced and then arrives is only counted once.
    pub fn receive(&self, key: QuantKey, quantity: Decimal) -> DomainResult<()> {
        positive(quantity)?;
        let mut ledger = self.write()?;
        ledger.check_key(&key)?;
        let unforecast = ledger.settle_incoming(&key, quantity);
        ledger.quants.entry(key).or_default().quantity += quantity;
        tracing::debug!(
            product = %key.product,
            location = %key.location,
            lot = ?key.lot,
            quantity = %quantity,
            settled = %(quantity - unforecast),
            "stock received"
        );
        Ok(())
    }

    /// Announce a future receipt. Counted only by non-assignable queries dated on or after `date`.
    pub fn forecast(&self, key: QuantKey, quantity: Decimal, date: NaiveDate) -> DomainResult<()> {
        positive(quantity)?;
        let mut ledger = self.write()?;
        ledger.check_key(&key)?;
        // Kept in date order so receipts settle the earliest forecast first.
        let at = ledger.incoming.partition_point(|i| i.date <= date);
        ledger.incoming.insert(
            at,
            Incoming {
                key,
                quantity,
                date,
            },
        );
        Ok(())
    }

    pub fn quant(&self, key: &QuantKey) -> DomainResult<Quant> {
        Ok(self.read()?.quants.get(key).copied().unwrap_or_default())
    }

    /// Quantity reserved for `move_id`; zero when it holds no reservation.
    pub fn reserved_for(&self, move_id: MoveId) -> DomainResult<Decimal> {
        Ok(self
            .read()?
            .reservations
            .get(&move_id)
            .map(|taken| taken.iter().map(|(_, qty)| *qty).sum())
            .unwrap_or_default())
    }

    /// Give back whatever `move_id` reserved. Returns whether it held anything.
    pub fn release(&self, move_id: MoveId) -> DomainResult<bool> {
        let mut ledger = self.write()?;
        let Some(taken) = ledger.reservations.remove(&move_id) else {
            return Ok(false);
        };
        for (key, qty) in taken {
            ledger.quants.entry(key).or_default().reserved -= qty;
        }
        Ok(true)
    }

    /// Carry out a reserved move: its reserved stock leaves the source
    /// location and lands in the destination, keeping its lot.
    pub fn complete(&self, mv: &StockMove) -> DomainResult<()> {
        let mut ledger = self.write()?;
        let taken = ledger.reservations.remove(&mv.id).ok_or_else(|| {
            DomainError::conflict(format!("stock move {} holds no reservation", mv.id))
        })?;
        for (key, qty) in taken {
            let source = ledger.quants.entry(key).or_default();
            source.quantity -= qty;
            source.reserved -= qty;
            let destination = QuantKey {
                location: mv.to_location,
                ..key
            };
            ledger.quants.entry(destination).or_default().quantity += qty;
        }
        tracing::debug!(move_id = %mv.id, quantity = %mv.internal_quantity, "stock move completed");
        Ok(())
    }

    fn read(&self) -> DomainResult<RwLockReadGuard<'_, Ledger>> {
        self.inner
            .read()
            .map_err(|_| DomainError::invariant("stock ledger lock poisoned"))
    }

    fn write(&self) -> DomainResult<RwLockWriteGuard<'_, Ledger>> {
        self.inner
            .write()
            .map_err(|_| DomainError::invariant("stock ledger lock poisoned"))
    }
}

impl LotCatalog for InMemoryStock {
    fn candidate_lots(&self, query: &LotQuery) -> DomainResult<Vec<LotCandidate>> {
        let ledger = self.read()?;
        let in_scope = |key: &QuantKey| key.product == query.product && key.location == query.location;

        let mut per_lot: BTreeMap<LotId, Decimal> = BTreeMap::new();
        for (key, quant) in ledger.quants.iter().filter(|(key, _)| in_scope(key)) {
            if let Some(lot) = key.lot {
                *per_lot.entry(lot).or_default() += quant.available();
            }
        }
        if !query.assignable_only {
            for incoming in ledger
                .incoming
                .iter()
                .filter(|i| in_scope(&i.key) && i.date <= query.as_of_date)
            {
                if let Some(lot) = incoming.key.lot {
                    *per_lot.entry(lot).or_default() += incoming.quantity;
                }
            }
        }

        let candidates = per_lot.into_iter().filter_map(|(id, available_quantity)| {
            let lot = ledger.lots.get(&id)?;
            Some(LotCandidate {
                lot: id,
                number: lot.number.clone(),
                expiry_date: lot.expiry_date?,
                available_quantity,
            })
        });
        Ok(fefo_candidates(candidates, query.as_of_date))
    }
}

impl Reservation for InMemoryStock {
    /// Reserve each move in full from the quants of its bucket, or not at all.
    ///
    /// Stock is always bucketed per product and source location; with
    /// [`GroupingKey::Lot`] the quant's lot must equal the move's lot (a
    /// lot-less move then only draws on lot-less stock).
    fn assign_try(&self, moves: &[StockMove], grouping: &Grouping) -> DomainResult<ReservationReport> {
        let mut ledger = self.write()?;
        let mut assigned = Vec::new();

        for mv in moves {
            if ledger.reservations.contains_key(&mv.id) {
                assigned.push(mv.id);
                continue;
            }

            let bucket: Vec<(QuantKey, Decimal)> = ledger
                .quants
                .iter()
                .filter(|(key, quant)| key.serves(mv, grouping) && quant.available() > Decimal::ZERO)
                .map(|(key, quant)| (*key, quant.available()))
                .collect();
            let available: Decimal = bucket.iter().map(|(_, qty)| *qty).sum();
            if available < mv.internal_quantity {
                tracing::debug!(
                    move_id = %mv.id,
                    lot = ?mv.lot,
                    requested = %mv.internal_quantity,
                    available = %available,
                    "not enough stock to reserve"
                );
                continue;
            }

            let mut remaining = mv.internal_quantity;
            let mut taken = Vec::new();
            for (key, qty) in bucket {
                if remaining <= Decimal::ZERO {
                    break;
                }
                let take = qty.min(remaining);
                ledger.quants.entry(key).or_default().reserved += take;
                remaining -= take;
                taken.push((key, take));
            }
            ledger.reservations.insert(mv.id, taken);
            assigned.push(mv.id);
        }

        Ok(ReservationReport::from_assigned(assigned, moves.len()))
    }
}
