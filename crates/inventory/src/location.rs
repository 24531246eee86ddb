use serde::{Deserialize, Serialize};

use lotsplit_core::{Entity, LocationId};

/// Kind of a stock location. Products declare for which kinds a lot is mandatory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LocationKind {
    Supplier,
    Customer,
    LostFound,
    Storage,
    Production,
    Warehouse,
    View,
}

impl LocationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            LocationKind::Supplier => "supplier",
            LocationKind::Customer => "customer",
            LocationKind::LostFound => "lost_found",
            LocationKind::Storage => "storage",
            LocationKind::Production => "production",
            LocationKind::Warehouse => "warehouse",
            LocationKind::View => "view",
        }
    }
}

impl core::fmt::Display for LocationKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl core::str::FromStr for LocationKind {
    type Err = lotsplit_core::DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "supplier" => Ok(LocationKind::Supplier),
            "customer" => Ok(LocationKind::Customer),
            "lost_found" => Ok(LocationKind::LostFound),
            "storage" => Ok(LocationKind::Storage),
            "production" => Ok(LocationKind::Production),
            "warehouse" => Ok(LocationKind::Warehouse),
            "view" => Ok(LocationKind::View),
            other => Err(lotsplit_core::DomainError::validation(format!(
                "unknown location kind: {other}"
            ))),
        }
    }
}

/// A stock location.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    pub id: LocationId,
    pub code: String,
    pub kind: LocationKind,
}

impl Location {
    pub fn new(id: LocationId, code: impl Into<String>, kind: LocationKind) -> Self {
        Self {
            id,
            code: code.into(),
            kind,
        }
    }
}

impl Entity for Location {
    type Id = LocationId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}
