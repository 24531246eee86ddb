use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use lotsplit_core::{Entity, LotId, ProductId, ValueObject};

/// A traceable batch of a product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lot {
    pub id: LotId,
    pub number: String,
    pub product: ProductId,
    pub expiry_date: Option<NaiveDate>,
}

impl Lot {
    pub fn new(
        id: LotId,
        number: impl Into<String>,
        product: ProductId,
        expiry_date: Option<NaiveDate>,
    ) -> Self {
        Self {
            id,
            number: number.into(),
            product,
            expiry_date,
        }
    }

    /// Whether the lot may still be shipped on `as_of`.
    ///
    /// A lot expiring on `as_of` itself is already unusable. A lot without an
    /// expiry date is not a FEFO candidate at all.
    pub fn is_usable_on(&self, as_of: NaiveDate) -> bool {
        self.expiry_date.is_some_and(|expiry| expiry > as_of)
    }
}

impl Entity for Lot {
    type Id = LotId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

/// One row of a lot catalog answer: a lot and what is available of it in the
/// queried location on the queried date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LotCandidate {
    pub lot: LotId,
    pub number: String,
    pub expiry_date: NaiveDate,
    /// Base-unit quantity, scoped to the query context.
    pub available_quantity: Decimal,
}

impl LotCandidate {
    /// FEFO ordering key: earliest expiry first, lot id breaks ties.
    pub fn fefo_key(&self) -> (NaiveDate, LotId) {
        (self.expiry_date, self.lot)
    }
}

impl ValueObject for LotCandidate {}
