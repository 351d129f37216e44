//! Plant entity - A cataloged plant with its botanical identity and bench location.
//!
//! Species identity is the (`genus`, `species`) pair; the location fields only
//! tell growers where to find the plant.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use crate::core::dates::SpeciesKey;

/// Plant database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "plants")]
pub struct Model {
    /// Unique identifier for the plant
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Botanical genus (e.g., "Cattleya")
    pub genus: String,
    /// Botanical species epithet (e.g., "trianae")
    pub species: String,
    /// Nursery the plant lives in
    pub nursery: String,
    /// Table or section inside the nursery
    pub bench: String,
    /// Wall or position on the bench
    pub wall: String,
    /// Whether the plant is still in the collection
    pub is_active: bool,
}

impl Model {
    /// Lookup key used by the date tables and the species comparisons.
    #[must_use]
    pub fn species_key(&self) -> SpeciesKey {
        SpeciesKey::new(&self.genus, Some(&self.species))
    }

    /// "Genus species" as displayed in alert titles.
    #[must_use]
    pub fn scientific_name(&self) -> String {
        format!("{} {}", self.genus, self.species)
    }
}

/// Plants are referenced by records but own no relations themselves
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
