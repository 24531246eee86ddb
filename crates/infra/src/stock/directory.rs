use std::collections::{BTreeSet, HashMap};
use std::sync::RwLock;

use lotsplit_core::{DomainError, DomainResult, Entity, LocationId, ProductId};
use lotsplit_inventory::{Location, LocationKind, Product, StockMove};
use lotsplit_shipping::LotRequirement;

/// Products and locations, and the lot requirement derived from them.
#[derive(Debug, Default)]
pub struct InventoryDirectory {
    products: RwLock<HashMap<ProductId, Product>>,
    locations: RwLock<HashMap<LocationId, Location>>,
    /// Location kinds that require a lot for every product.
    default_lot_required: BTreeSet<LocationKind>,
}

impl InventoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_default_lot_required(mut self, kinds: impl IntoIterator<Item = LocationKind>) -> Self {
        self.default_lot_required.extend(kinds);
        self
    }

    pub fn add_product(&self, product: Product) -> DomainResult<()> {
        register(&self.products, product)
    }

    pub fn add_location(&self, location: Location) -> DomainResult<()> {
        register(&self.locations, location)
    }

    pub fn product(&self, id: ProductId) -> DomainResult<Product> {
        self.products
            .read()
            .map_err(|_| DomainError::invariant("directory lock poisoned"))?
            .get(&id)
            .cloned()
            .ok_or_else(|| DomainError::not_found(format!("product {id}")))
    }

    pub fn location(&self, id: LocationId) -> DomainResult<Location> {
        self.locations
            .read()
            .map_err(|_| DomainError::invariant("directory lock poisoned"))?
            .get(&id)
            .cloned()
            .ok_or_else(|| DomainError::not_found(format!("location {id}")))
    }
}

fn register<E: Entity>(map: &RwLock<HashMap<E::Id, E>>, entity: E) -> DomainResult<()> {
    let mut map = map
        .write()
        .map_err(|_| DomainError::invariant("directory lock poisoned"))?;
    map.insert(*entity.id(), entity);
    Ok(())
}

impl LotRequirement for InventoryDirectory {
    fn lot_required(&self, mv: &StockMove) -> DomainResult<bool> {
        let product = self.product(mv.product)?;
        let from = self.location(mv.from_location)?.kind;
        let to = self.location(mv.to_location)?.kind;
        Ok(product.requires_lot(from, to)
            || self.default_lot_required.contains(&from)
            || self.default_lot_required.contains(&to))
    }
}
