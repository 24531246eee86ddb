//! Entities: records that keep their identity while their attributes change.

/// A record addressed by a typed identifier.
///
/// A stock move that gets split is still the same move afterwards (bound to a
/// lot, with less quantity); its siblings are new entities with new ids.
pub trait Entity {
    type Id: Copy + Eq + Ord + core::hash::Hash + core::fmt::Debug + core::fmt::Display;

    fn id(&self) -> &Self::Id;
}
