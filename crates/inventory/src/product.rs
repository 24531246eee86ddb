use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use lotsplit_core::{Entity, ProductId, UomId};

use crate::location::LocationKind;

/// A stockable product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    /// Base unit: every internal quantity of this product is expressed in it.
    pub default_uom: UomId,
    /// Location kinds for which a move of this product must carry a lot.
    #[serde(default)]
    pub lot_required: BTreeSet<LocationKind>,
}

impl Product {
    pub fn new(id: ProductId, name: impl Into<String>, default_uom: UomId) -> Self {
        Self {
            id,
            name: name.into(),
            default_uom,
            lot_required: BTreeSet::new(),
        }
    }

    pub fn with_lot_required(mut self, kinds: impl IntoIterator<Item = LocationKind>) -> Self {
        self.lot_required.extend(kinds);
        self
    }

    /// A move needs a lot when either end is a location kind the product tracks.
    pub fn requires_lot(&self, from: LocationKind, to: LocationKind) -> bool {
        self.lot_required.contains(&from) || self.lot_required.contains(&to)
    }
}

impl Entity for Product {
    type Id = ProductId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}
