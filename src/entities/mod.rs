//! Entity module - Contains all SeaORM entity definitions for the database.
//! These entities represent the database tables and their relationships.
//! Each entity has a Model struct for data and an Entity struct for operations.

pub mod alert;
pub mod enums;
pub mod germination_record;
pub mod plant;
pub mod pollination_record;
pub mod system_state;

// Re-export specific types to avoid conflicts
pub use alert::{Column as AlertColumn, Entity as Alert, Model as AlertModel};
pub use enums::{
    AlertKind, AlertPriority, AlertStatus, Cadence, CadenceAnchor, ClimateCode, PollinationType,
    Repeat, SubjectType,
};
pub use germination_record::{
    Column as GerminationRecordColumn, Entity as GerminationRecord,
    Model as GerminationRecordModel, SeedSource,
};
pub use plant::{Column as PlantColumn, Entity as Plant, Model as PlantModel};
pub use pollination_record::{
    Column as PollinationRecordColumn, Entity as PollinationRecord,
    Model as PollinationRecordModel,
};
pub use system_state::{
    Column as SystemStateColumn, Entity as SystemState, Model as SystemStateModel,
};
