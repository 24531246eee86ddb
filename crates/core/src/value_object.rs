//! Value object trait: equality by value, not identity.
//!
//! Value objects are domain objects that have **no identity** - they are defined entirely
//! by their attribute values. Two value objects with the same values are considered equal.

/// Marker trait for value objects.
///
/// ## Value Object vs Entity
///
/// - **Value Object**: No identity (two value objects with same values are equal)
/// - **Entity**: Has identity (two entities with same ID are the same entity)
///
/// Example:
/// - An allocation fragment `(lot L2, 4 units)` is a value object
/// - A `StockMove { id: MoveId(...), .. }` is an entity
///
/// Value objects are immutable: to "modify" one, build a new one. Allocation plans
/// are made of value objects so that repeated runs over the same input compare equal.
pub trait ValueObject: Clone + PartialEq + core::fmt::Debug {}
