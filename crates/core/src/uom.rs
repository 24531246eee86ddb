//! Units of measure.
//!
//! Every product has a base unit; stock moves are entered in a display unit of
//! the same category. Arithmetic on quantities (allocation, availability) is
//! always done in the base unit, and results are converted back for display.

use std::collections::HashMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{DomainError, DomainResult};
use crate::id::UomId;

/// A unit of measure.
///
/// `factor` is the number of category reference units contained in one of this
/// unit (a dozen has factor 12 in the "unit" category). `rounding` is the
/// smallest representable step of the unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Uom {
    pub id: UomId,
    pub name: String,
    pub category: String,
    pub factor: Decimal,
    pub rounding: Decimal,
}

impl Uom {
    pub fn new(
        id: UomId,
        name: impl Into<String>,
        category: impl Into<String>,
        factor: Decimal,
        rounding: Decimal,
    ) -> DomainResult<Self> {
        if factor <= Decimal::ZERO {
            return Err(DomainError::validation("uom factor must be positive"));
        }
        if rounding <= Decimal::ZERO {
            return Err(DomainError::validation("uom rounding must be positive"));
        }
        Ok(Self {
            id,
            name: name.into(),
            category: category.into(),
            factor,
            rounding,
        })
    }

    /// Round a quantity to the nearest multiple of this unit's rounding step
    /// (ties to even).
    pub fn round(&self, quantity: Decimal) -> Decimal {
        (quantity / self.rounding).round() * self.rounding
    }

    /// Round a quantity toward zero onto this unit's rounding step.
    pub fn round_down(&self, quantity: Decimal) -> Decimal {
        (quantity / self.rounding).trunc() * self.rounding
    }

    /// Largest difference still considered equal to zero in this unit.
    ///
    /// Half a rounding step: anything smaller would round to zero.
    pub fn tolerance(&self) -> Decimal {
        self.rounding / Decimal::TWO
    }
}

/// Quantity/UoM adapter consumed by the allocation layer.
///
/// Implementations must be pure: same arguments, same answer.
pub trait UomConversion {
    /// Convert `quantity` expressed in `from` into `to`, rounded to `to`'s step.
    fn convert_quantity(&self, from: UomId, to: UomId, quantity: Decimal) -> DomainResult<Decimal>;

    /// Like [`convert_quantity`](Self::convert_quantity), but rounded toward zero,
    /// so the result never represents more than `quantity`.
    fn convert_quantity_down(&self, from: UomId, to: UomId, quantity: Decimal) -> DomainResult<Decimal>;

    /// Rounding tolerance of `unit` (see [`Uom::tolerance`]).
    fn rounding_tolerance(&self, unit: UomId) -> DomainResult<Decimal>;
}

impl<T: UomConversion + ?Sized> UomConversion for std::sync::Arc<T> {
    fn convert_quantity(&self, from: UomId, to: UomId, quantity: Decimal) -> DomainResult<Decimal> {
        (**self).convert_quantity(from, to, quantity)
    }

    fn convert_quantity_down(&self, from: UomId, to: UomId, quantity: Decimal) -> DomainResult<Decimal> {
        (**self).convert_quantity_down(from, to, quantity)
    }

    fn rounding_tolerance(&self, unit: UomId) -> DomainResult<Decimal> {
        (**self).rounding_tolerance(unit)
    }
}

impl<T: UomConversion + ?Sized> UomConversion for &T {
    fn convert_quantity(&self, from: UomId, to: UomId, quantity: Decimal) -> DomainResult<Decimal> {
        (**self).convert_quantity(from, to, quantity)
    }

    fn convert_quantity_down(&self, from: UomId, to: UomId, quantity: Decimal) -> DomainResult<Decimal> {
        (**self).convert_quantity_down(from, to, quantity)
    }

    fn rounding_tolerance(&self, unit: UomId) -> DomainResult<Decimal> {
        (**self).rounding_tolerance(unit)
    }
}

/// In-process registry of units.
#[derive(Debug, Default, Clone)]
pub struct UomCatalog {
    units: HashMap<UomId, Uom>,
}

impl UomCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, uom: Uom) {
        self.units.insert(uom.id, uom);
    }

    pub fn with(mut self, uom: Uom) -> Self {
        self.insert(uom);
        self
    }

    pub fn get(&self, id: UomId) -> DomainResult<&Uom> {
        self.units
            .get(&id)
            .ok_or_else(|| DomainError::not_found(format!("uom {id}")))
    }
}

impl UomCatalog {
    /// Unrounded `quantity` of `from` expressed in `to`, plus the target unit.
    fn exact(&self, from: UomId, to: UomId, quantity: Decimal) -> DomainResult<(Decimal, &Uom)> {
        let from_uom = self.get(from)?;
        let to_uom = self.get(to)?;
        if from_uom.category != to_uom.category {
            return Err(DomainError::validation(format!(
                "cannot convert from {} ({}) to {} ({})",
                from_uom.name, from_uom.category, to_uom.name, to_uom.category
            )));
        }
        Ok((quantity * from_uom.factor / to_uom.factor, to_uom))
    }
}

impl UomConversion for UomCatalog {
    fn convert_quantity(&self, from: UomId, to: UomId, quantity: Decimal) -> DomainResult<Decimal> {
        if from == to || quantity.is_zero() {
            return Ok(quantity);
        }
        let (converted, to_uom) = self.exact(from, to, quantity)?;
        Ok(to_uom.round(converted))
    }

    fn convert_quantity_down(&self, from: UomId, to: UomId, quantity: Decimal) -> DomainResult<Decimal> {
        if from == to || quantity.is_zero() {
            return Ok(quantity);
        }
        let (converted, to_uom) = self.exact(from, to, quantity)?;
        Ok(to_uom.round_down(converted))
    }

    fn rounding_tolerance(&self, unit: UomId) -> DomainResult<Decimal> {
        Ok(self.get(unit)?.tolerance())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit() -> Uom {
        Uom::new(UomId::new(), "Unit", "units", Decimal::ONE, Decimal::ONE).unwrap()
    }

    fn dozen() -> Uom {
        Uom::new(UomId::new(), "Dozen", "units", Decimal::from(12), Decimal::new(1, 2)).unwrap()
    }

    fn kilogram() -> Uom {
        Uom::new(UomId::new(), "Kilogram", "weight", Decimal::ONE, Decimal::new(1, 3)).unwrap()
    }

    #[test]
    fn converts_between_units_of_the_same_category() {
        let (u, d) = (unit(), dozen());
        let catalog = UomCatalog::new().with(u.clone()).with(d.clone());

        let in_units = catalog.convert_quantity(d.id, u.id, Decimal::new(15, 1)).unwrap();
        assert_eq!(in_units, Decimal::from(18));

        let in_dozens = catalog.convert_quantity(u.id, d.id, Decimal::from(18)).unwrap();
        assert_eq!(in_dozens, Decimal::new(15, 1));
    }

    #[test]
    fn conversion_rounds_to_target_step() {
        let (u, d) = (unit(), dozen());
        let catalog = UomCatalog::new().with(u.clone()).with(d.clone());

        // 5 units = 0.41666.. dozen, rounded to 0.01
        let q = catalog.convert_quantity(u.id, d.id, Decimal::from(5)).unwrap();
        assert_eq!(q, Decimal::new(42, 2));
    }

    #[test]
    fn downward_conversion_never_overshoots() {
        let gram = Uom::new(UomId::new(), "Gram", "weight", Decimal::new(1, 3), Decimal::ONE).unwrap();
        let kg = Uom::new(UomId::new(), "Kilogram", "weight", Decimal::ONE, Decimal::new(1, 2)).unwrap();
        let catalog = UomCatalog::new().with(gram.clone()).with(kg.clone());

        // 997 g is 1.00 kg to the nearest step, but only 0.99 kg fits in it.
        assert_eq!(catalog.convert_quantity(gram.id, kg.id, Decimal::from(997)).unwrap(), Decimal::ONE);
        let down = catalog.convert_quantity_down(gram.id, kg.id, Decimal::from(997)).unwrap();
        assert_eq!(down, Decimal::new(99, 2));
        assert_eq!(catalog.convert_quantity(kg.id, gram.id, down).unwrap(), Decimal::from(990));
    }

    #[test]
    fn same_unit_is_identity() {
        let u = unit();
        let catalog = UomCatalog::new().with(u.clone());
        let q = Decimal::new(3333, 3);
        assert_eq!(catalog.convert_quantity(u.id, u.id, q).unwrap(), q);
    }

    #[test]
    fn cross_category_conversion_is_rejected() {
        let (u, kg) = (unit(), kilogram());
        let catalog = UomCatalog::new().with(u.clone()).with(kg.clone());
        let err = catalog.convert_quantity(u.id, kg.id, Decimal::ONE).unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn unknown_unit_is_not_found() {
        let catalog = UomCatalog::new();
        let err = catalog.rounding_tolerance(UomId::new()).unwrap_err();
        assert!(matches!(err, DomainError::NotFound(_)));
    }

    #[test]
    fn tolerance_is_half_a_rounding_step() {
        let kg = kilogram();
        assert_eq!(kg.tolerance(), Decimal::new(5, 4));
    }

    #[test]
    fn non_positive_rounding_is_rejected() {
        let err = Uom::new(UomId::new(), "Bad", "units", Decimal::ONE, Decimal::ZERO).unwrap_err();
        assert_eq!(err, DomainError::validation("uom rounding must be positive"));
    }

    mod proptest_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #![proptest_config(ProptestConfig {
                cases: 256,
                ..ProptestConfig::default()
            })]

            /// Property: rounding lands on a step and moves the value by at most the tolerance.
            #[test]
            fn rounding_stays_within_tolerance(raw in -1_000_000i64..1_000_000, step_exp in 0u32..4) {
                let uom = Uom::new(UomId::new(), "U", "units", Decimal::ONE, Decimal::new(1, step_exp)).unwrap();
                let quantity = Decimal::new(raw, 4);
                let rounded = uom.round(quantity);

                prop_assert!((rounded - quantity).abs() <= uom.tolerance());
                prop_assert!((rounded / uom.rounding).fract().is_zero());
            }

            /// Property: rounding down lands on a step no further from zero than the input.
            #[test]
            fn rounding_down_never_grows(raw in 0i64..1_000_000, step_exp in 0u32..4) {
                let uom = Uom::new(UomId::new(), "U", "units", Decimal::ONE, Decimal::new(1, step_exp)).unwrap();
                let quantity = Decimal::new(raw, 4);
                let down = uom.round_down(quantity);

                prop_assert!(down <= quantity);
                prop_assert!(quantity - down < uom.rounding);
                prop_assert!((down / uom.rounding).fract().is_zero());
            }
        }
    }
}
