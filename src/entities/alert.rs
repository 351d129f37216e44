//! Alert entity - One time-sensitive reminder emitted by the sweep.
//!
//! `dedup_key` is unique at the table level; it is the guarantee that two sweeps
//! racing on the same record cannot both insert the same alert. The generator only
//! ever inserts rows here; `status` and `status_changed_at` belong to the inbox.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use super::enums::{AlertKind, AlertPriority, AlertStatus, SubjectType};

/// Alert database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "alerts")]
pub struct Model {
    /// Unique identifier for the alert
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Weekly, Preventive or Frequent
    pub kind: AlertKind,
    /// Table the subject lives in
    pub subject_type: SubjectType,
    /// Primary key of the subject record
    pub subject_id: i64,
    /// Anchor date the window was computed from
    pub anchor_date: Date,
    /// Day the window opened (or the reminder day for Frequent)
    pub scheduled_for: Date,
    /// Day the sweep created the row
    pub generated_on: Date,
    /// `subject:id:kind:bucket`
    #[sea_orm(unique)]
    pub dedup_key: String,
    /// Display priority
    pub priority: AlertPriority,
    /// Short human-readable title
    pub title: String,
    /// Pending, Read or Dismissed
    pub status: AlertStatus,
    /// Last time the inbox changed `status`
    pub status_changed_at: Option<DateTimeUtc>,
}

/// Alerts point at their subject polymorphically, so no foreign keys are declared
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
