//! Pollination record entity - One pollination event and its derived maturation date.
//!
//! The father plant is present exactly when the pollination type is Sibling or
//! Hybrid. `estimated_maturation_date` is written together with
//! `pollination_date` and never edited on its own.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use super::enums::{ClimateCode, PollinationType};

/// Pollination record database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "pollination_records")]
pub struct Model {
    /// Unique identifier for the record
    #[sea_orm(primary_key)]
    pub id: i64,
    /// User responsible for the pollination
    pub responsible: String,
    /// Self, Sibling or Hybrid
    pub pollination_type: PollinationType,
    /// Day the pollination was performed
    pub pollination_date: Date,
    /// Derived day the capsules should be mature
    pub estimated_maturation_date: Date,
    /// Plant that received the pollen
    pub mother_plant_id: i64,
    /// Pollen donor, only for Sibling and Hybrid
    pub father_plant_id: Option<i64>,
    /// Offspring plant entry
    pub new_plant_id: i64,
    /// Climate band at pollination time
    pub climate: ClimateCode,
    /// Number of capsules pollinated
    pub capsules_quantity: i32,
    /// Free-text observations
    pub notes: String,
    /// Whether maturation has been confirmed by a grower
    pub maturation_confirmed: bool,
    /// Day maturation was confirmed
    pub maturation_confirmed_on: Option<Date>,
    /// Soft delete flag - if true, record is hidden but data is preserved
    pub is_deleted: bool,
    /// When the record was created (anchor of the weekly alert)
    pub created_at: DateTimeUtc,
}

/// Defines relationships between `PollinationRecord` and plants
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Mother plant
    #[sea_orm(
        belongs_to = "super::plant::Entity",
        from = "Column::MotherPlantId",
        to = "super::plant::Column::Id"
    )]
    MotherPlant,
    /// Father plant
    #[sea_orm(
        belongs_to = "super::plant::Entity",
        from = "Column::FatherPlantId",
        to = "super::plant::Column::Id"
    )]
    FatherPlant,
    /// Resulting plant
    #[sea_orm(
        belongs_to = "super::plant::Entity",
        from = "Column::NewPlantId",
        to = "super::plant::Column::Id"
    )]
    NewPlant,
}

impl Related<super::plant::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::MotherPlant.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
