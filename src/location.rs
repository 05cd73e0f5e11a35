//! Typed references to the two kinds of place stock can reside.
//!
//! A location is always exactly one of a warehouse or a shop. Persisted rows
//! store the pair (`location_type`, `location_id`); this module is the only
//! place where that pair is parsed back into the sum type.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::errors::ServiceError;

/// The two identity spaces a location reference can point into.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, ToSchema,
)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
#[serde(rename_all = "lowercase")]
pub enum LocationKind {
    Warehouse,
    Shop,
}

/// A reference to one concrete location.
///
/// Exactly one identity is ever populated; the representation makes the
/// both-or-neither state unrepresentable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(tag = "kind", content = "id", rename_all = "lowercase")]
pub enum LocationRef {
    Warehouse(Uuid),
    Shop(Uuid),
}

impl LocationRef {
    pub fn new(kind: LocationKind, id: Uuid) -> Self {
        match kind {
            LocationKind::Warehouse => LocationRef::Warehouse(id),
            LocationKind::Shop => LocationRef::Shop(id),
        }
    }

    /// Parses the persisted/request pair form (`"warehouse" | "shop"`, id).
    pub fn parse(kind: &str, id: Uuid) -> Result<Self, ServiceError> {
        let kind = LocationKind::from_str(kind).map_err(|_| {
            ServiceError::ValidationError(format!(
                "Unknown location type '{}' (expected 'warehouse' or 'shop')",
                kind
            ))
        })?;
        Ok(Self::new(kind, id))
    }

    pub fn kind(&self) -> LocationKind {
        match self {
            LocationRef::Warehouse(_) => LocationKind::Warehouse,
            LocationRef::Shop(_) => LocationKind::Shop,
        }
    }

    pub fn id(&self) -> Uuid {
        match self {
            LocationRef::Warehouse(id) | LocationRef::Shop(id) => *id,
        }
    }
}

impl fmt::Display for LocationRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.kind(), self.id())
    }
}
