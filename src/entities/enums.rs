//! String-backed enumerations shared by several tables.
//!
//! Each enum is stored as a short text code so the database stays readable
//! from the `sqlite3` shell.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;

/// How the pollen reached the mother plant.
///
/// Stored as `"self"`, `"sibling"` or `"hybrid"`. The `ActiveEnum` impls below
/// are the hand-expanded output of `DeriveActiveEnum`: the derive cannot be
/// used here because it turns the `"self"` string value into a generated
/// variant named `Self`, which is a reserved keyword.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, EnumIter, Serialize, Deserialize)]
pub enum PollinationType {
    /// Pollen from the same plant; no father plant
    SelfPollination,
    /// Pollen from a sibling of the same species
    Sibling,
    /// Cross between (possibly) different species
    Hybrid,
}

/// Iden naming the [`PollinationType`] enum (mirrors `DeriveActiveEnum`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollinationTypeEnum;

impl sea_orm::sea_query::Iden for PollinationTypeEnum {
    fn unquoted(&self, s: &mut dyn std::fmt::Write) {
        write!(s, "{}", "PollinationType").unwrap();
    }
}

impl sea_orm::ActiveEnum for PollinationType {
    type Value = String;

    type ValueVec = Vec<String>;

    fn name() -> sea_orm::sea_query::DynIden {
        sea_orm::sea_query::SeaRc::new(PollinationTypeEnum) as sea_orm::sea_query::DynIden
    }

    fn to_value(&self) -> <Self as sea_orm::ActiveEnum>::Value {
        match self {
            Self::SelfPollination => "self",
            Self::Sibling => "sibling",
            Self::Hybrid => "hybrid",
        }
        .to_owned()
    }

    fn try_from_value(v: &<Self as sea_orm::ActiveEnum>::Value) -> Result<Self, sea_orm::DbErr> {
        match v.as_ref() {
            "self" => Ok(Self::SelfPollination),
            "sibling" => Ok(Self::Sibling),
            "hybrid" => Ok(Self::Hybrid),
            _ => Err(sea_orm::DbErr::Type(format!(
                "unexpected value for {} enum: {}",
                stringify!(PollinationType),
                v
            ))),
        }
    }

    fn db_type() -> sea_orm::ColumnDef {
        sea_orm::prelude::ColumnTypeTrait::def(sea_orm::ColumnType::Text)
    }
}

#[allow(clippy::from_over_into)]
impl Into<sea_orm::sea_query::Value> for PollinationType {
    fn into(self) -> sea_orm::sea_query::Value {
        <Self as sea_orm::ActiveEnum>::to_value(&self).into()
    }
}

impl sea_orm::TryGetable for PollinationType {
    fn try_get_by<I: sea_orm::ColIdx>(
        res: &sea_orm::QueryResult,
        idx: I,
    ) -> Result<Self, sea_orm::TryGetError> {
        let value = <<Self as sea_orm::ActiveEnum>::Value as sea_orm::TryGetable>::try_get_by(res, idx)?;
        <Self as sea_orm::ActiveEnum>::try_from_value(&value).map_err(sea_orm::TryGetError::DbErr)
    }
}

impl sea_orm::sea_query::ValueType for PollinationType {
    fn try_from(v: sea_orm::sea_query::Value) -> Result<Self, sea_orm::sea_query::ValueTypeErr> {
        let value = <<Self as sea_orm::ActiveEnum>::Value as sea_orm::sea_query::ValueType>::try_from(v)?;
        <Self as sea_orm::ActiveEnum>::try_from_value(&value).map_err(|_| sea_orm::sea_query::ValueTypeErr)
    }

    fn type_name() -> String {
        <<Self as sea_orm::ActiveEnum>::Value as sea_orm::sea_query::ValueType>::type_name()
    }

    fn array_type() -> sea_orm::sea_query::ArrayType {
        <<Self as sea_orm::ActiveEnum>::Value as sea_orm::sea_query::ValueType>::array_type()
    }

    fn column_type() -> sea_orm::sea_query::ColumnType {
        <Self as sea_orm::ActiveEnum>::db_type()
            .get_column_type()
            .to_owned()
    }

    fn enum_type_name() -> Option<&'static str> {
        Some(stringify!(PollinationType))
    }
}

impl sea_orm::sea_query::Nullable for PollinationType {
    fn null() -> sea_orm::sea_query::Value {
        <<Self as sea_orm::ActiveEnum>::Value as sea_orm::sea_query::Nullable>::null()
    }
}

impl PollinationType {
    /// Whether a father plant must be referenced.
    #[must_use]
    pub const fn requires_father(self) -> bool {
        matches!(self, Self::Sibling | Self::Hybrid)
    }
}

impl fmt::Display for PollinationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::SelfPollination => "Self",
            Self::Sibling => "Sibling",
            Self::Hybrid => "Hybrid",
        };
        f.write_str(name)
    }
}

/// Greenhouse climate band the event happened in.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Text")]
pub enum ClimateCode {
    /// 10-18 °C
    #[sea_orm(string_value = "C")]
    Cold,
    /// 15-22 °C
    #[sea_orm(string_value = "IC")]
    IntermediateCold,
    /// 18-25 °C
    #[sea_orm(string_value = "I")]
    Intermediate,
    /// 22-28 °C
    #[sea_orm(string_value = "IW")]
    IntermediateWarm,
    /// 25-35 °C
    #[sea_orm(string_value = "W")]
    Warm,
}

/// The three alert families emitted by the sweep.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Text")]
pub enum AlertKind {
    /// One week after the record was created
    #[sea_orm(string_value = "weekly")]
    Weekly,
    /// During the last week before the estimated date
    #[sea_orm(string_value = "preventive")]
    Preventive,
    /// Daily reminder through the final week, estimated date included
    #[sea_orm(string_value = "frequent")]
    Frequent,
}

/// Which date an alert window is measured from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CadenceAnchor {
    /// The day the record was created
    Creation,
    /// The derived maturation or transplant date
    EstimatedDate,
}

/// Whether an alert kind fires once per record or once per period.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Repeat {
    /// At most once per record
    OneShot,
    /// At most once per calendar day
    Daily,
}

/// Cadence metadata of an [`AlertKind`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Cadence {
    /// Date the offset is applied to
    pub anchor: CadenceAnchor,
    /// Signed day offset from the anchor where the window opens
    pub offset_days: i64,
    /// One-shot or repeating
    pub repeat: Repeat,
}

impl AlertKind {
    /// Window and repetition rules for this kind.
    #[must_use]
    pub const fn cadence(self) -> Cadence {
        match self {
            Self::Weekly => Cadence {
                anchor: CadenceAnchor::Creation,
                offset_days: 7,
                repeat: Repeat::OneShot,
            },
            Self::Preventive => Cadence {
                anchor: CadenceAnchor::EstimatedDate,
                offset_days: -7,
                repeat: Repeat::OneShot,
            },
            Self::Frequent => Cadence {
                anchor: CadenceAnchor::EstimatedDate,
                offset_days: -7,
                repeat: Repeat::Daily,
            },
        }
    }

    /// Lowercase code used inside dedup keys.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::Weekly => "weekly",
            Self::Preventive => "preventive",
            Self::Frequent => "frequent",
        }
    }
}

impl fmt::Display for AlertKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Weekly => "Weekly follow-up",
            Self::Preventive => "Preventive",
            Self::Frequent => "Daily reminder",
        };
        f.write_str(name)
    }
}

/// Record family an alert points at.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Text")]
pub enum SubjectType {
    /// `pollination_records` row
    #[sea_orm(string_value = "pollination")]
    Pollination,
    /// `germination_records` row
    #[sea_orm(string_value = "germination")]
    Germination,
}

impl SubjectType {
    /// Lowercase code used inside dedup keys.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::Pollination => "pollination",
            Self::Germination => "germination",
        }
    }
}

impl fmt::Display for SubjectType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Pollination => "Pollination",
            Self::Germination => "Germination",
        };
        f.write_str(name)
    }
}

/// Display priority of an alert.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Text")]
pub enum AlertPriority {
    /// Informational
    #[sea_orm(string_value = "low")]
    Low,
    /// Routine follow-up
    #[sea_orm(string_value = "medium")]
    Medium,
    /// Action needed soon
    #[sea_orm(string_value = "high")]
    High,
    /// Action needed today
    #[sea_orm(string_value = "urgent")]
    Urgent,
}

/// Lifecycle of an alert on the notification side.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Text")]
pub enum AlertStatus {
    /// Not yet seen
    #[sea_orm(string_value = "pending")]
    Pending,
    /// Seen by the responsible user
    #[sea_orm(string_value = "read")]
    Read,
    /// Dismissed manually or by the stale-alert sweep
    #[sea_orm(string_value = "dismissed")]
    Dismissed,
}
