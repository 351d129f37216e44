use chrono::NaiveDate;
use thiserror::Error;

/// Record rejections produced by the validation gate.
///
/// Every variant is recoverable and meant to be shown to the user; the CRUD
/// layer maps [`ValidationError::kind`] to its own message catalogue.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// The event date lies after "today"
    #[error("Event date {date} is in the future (today is {today})")]
    FutureDateNotAllowed {
        /// Rejected event date
        date: NaiveDate,
        /// Reference day used for the check
        today: NaiveDate,
    },

    /// An identical record already exists
    #[error("An identical record already exists (id {existing_id})")]
    DuplicateRecord {
        /// Id of the record that matched
        existing_id: i64,
    },

    /// Plant species violate the pollination-type rule
    #[error("Incompatible plants: {reason}")]
    IncompatiblePlants {
        /// Which pairing broke the rule
        reason: String,
    },

    /// A father plant is required for this pollination type but absent
    #[error("Pollination type {pollination_type} requires a father plant")]
    MissingParentPlant {
        /// Display name of the pollination type
        pollination_type: String,
    },

    /// Internal seed source does not reference a live pollination record
    #[error("Seed source references pollination record {pollination_id}, which {reason}")]
    InvalidSeedSource {
        /// Referenced pollination record id
        pollination_id: i64,
        /// "does not exist" or "has been deleted"
        reason: String,
    },

    /// A referenced plant id does not resolve
    #[error("Plant {plant_id} does not exist")]
    UnknownPlant {
        /// Unresolved plant id
        plant_id: i64,
    },

    /// A count field is below its minimum
    #[error("{field} must be at least 1 (got {value})")]
    InvalidQuantity {
        /// Offending field name
        field: &'static str,
        /// Rejected value
        value: i32,
    },

    /// More seedlings than seeds planted
    #[error("Seedlings germinated ({germinated}) cannot exceed seeds planted ({planted})")]
    InvalidSeedlingCount {
        /// Seeds planted
        planted: i32,
        /// Seedlings reported as germinated
        germinated: i32,
    },
}

impl ValidationError {
    /// Stable machine-readable kind, independent of the display text.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::FutureDateNotAllowed { .. } => "FutureDateNotAllowed",
            Self::DuplicateRecord { .. } => "DuplicateRecord",
            Self::IncompatiblePlants { .. } => "IncompatiblePlants",
            Self::MissingParentPlant { .. } => "MissingParentPlant",
            Self::InvalidSeedSource { .. } => "InvalidSeedSource",
            Self::UnknownPlant { .. } => "UnknownPlant",
            Self::InvalidQuantity { .. } => "InvalidQuantity",
            Self::InvalidSeedlingCount { .. } => "InvalidSeedlingCount",
        }
    }
}

/// Crate-wide error type.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration could not be read or parsed
    #[error("Configuration error: {message}")]
    Config {
        /// Human-readable cause
        message: String,
    },

    /// Underlying `SeaORM` failure
    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    /// Candidate record rejected by the validator
    #[error("Validation failed: {0}")]
    Validation(#[from] ValidationError),

    /// Lookup by id found nothing
    #[error("{entity} {id} not found")]
    RecordNotFound {
        /// Entity name ("pollination record", "alert", ...)
        entity: &'static str,
        /// Requested id
        id: i64,
    },

    /// Storage could not be read, or no alert could be written at all
    #[error("Storage unavailable: {message}")]
    StorageUnavailable {
        /// What failed
        message: String,
    },

    /// I/O failure (e.g., creating the database directory)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Returns the validation error when this is a rejected record.
    #[must_use]
    pub const fn as_validation(&self) -> Option<&ValidationError> {
        match self {
            Self::Validation(err) => Some(err),
            _ => None,
        }
    }
}

/// Convenience `Result` type
pub type Result<T> = std::result::Result<T, Error>;
