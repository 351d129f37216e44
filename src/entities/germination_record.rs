//! Germination record entity - One sowing event and its derived transplant date.
//!
//! The seed source is either another pollination record (internal) or a free-text
//! origin (external); exactly one of the two columns is set. `transplant_days` keeps
//! the duration that produced `estimated_transplant_date` so a later reschedule can
//! reuse an explicit override.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use super::enums::ClimateCode;

/// Germination record database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "germination_records")]
pub struct Model {
    /// Unique identifier for the record
    #[sea_orm(primary_key)]
    pub id: i64,
    /// User responsible for the sowing
    pub responsible: String,
    /// Day the seeds were sown
    pub germination_date: Date,
    /// Derived day the seedlings should be transplanted
    pub estimated_transplant_date: Date,
    /// Plant being germinated
    pub plant_id: i64,
    /// Internal seed source
    pub seed_source_pollination_id: Option<i64>,
    /// External seed source description
    pub seed_source_external: Option<String>,
    /// Climate band of the germination setup
    pub climate: ClimateCode,
    /// Substrate used
    pub substrate: String,
    /// Where the trays are kept
    pub location: String,
    /// Number of seeds sown
    pub seeds_planted: i32,
    /// Number of seedlings that came up
    pub seedlings_germinated: i32,
    /// Days between sowing and the estimated transplant
    pub transplant_days: i32,
    /// Whether the transplant has been confirmed
    pub transplant_confirmed: bool,
    /// Day the transplant was confirmed
    pub transplant_confirmed_on: Option<Date>,
    /// Soft delete flag - if true, record is hidden but data is preserved
    pub is_deleted: bool,
    /// When the record was created (anchor of the weekly alert)
    pub created_at: DateTimeUtc,
}

/// Where the sown seeds came from.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SeedSource {
    /// Seeds harvested from one of our own pollinations
    Internal {
        /// Source pollination record
        pollination_id: i64,
    },
    /// Seeds bought or received from elsewhere
    External {
        /// Supplier or origin description
        origin: String,
    },
}

impl SeedSource {
    /// Splits the variant into the two storage columns.
    #[must_use]
    pub fn into_columns(self) -> (Option<i64>, Option<String>) {
        match self {
            Self::Internal { pollination_id } => (Some(pollination_id), None),
            Self::External { origin } => (None, Some(origin)),
        }
    }
}

impl Model {
    /// Reassembles the seed source variant from its columns.
    #[must_use]
    pub fn seed_source(&self) -> SeedSource {
        match self.seed_source_pollination_id {
            Some(pollination_id) => SeedSource::Internal { pollination_id },
            None => SeedSource::External {
                origin: self.seed_source_external.clone().unwrap_or_default(),
            },
        }
    }
}

/// Defines relationships between `GerminationRecord` and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each germination record grows one plant
    #[sea_orm(
        belongs_to = "super::plant::Entity",
        from = "Column::PlantId",
        to = "super::plant::Column::Id"
    )]
    Plant,
    /// Internal seed source
    #[sea_orm(
        belongs_to = "super::pollination_record::Entity",
        from = "Column::SeedSourcePollinationId",
        to = "super::pollination_record::Column::Id"
    )]
    SourcePollination,
}

impl Related<super::plant::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Plant.def()
    }
}

impl Related<super::pollination_record::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::SourcePollination.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
