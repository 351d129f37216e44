//! Record validation gate.
//!
//! Checks a candidate pollination or germination record before the CRUD layer
//! stores it, and attaches the derived date on success. Rules run in a fixed
//! order and the first failure is returned:
//!
//! 1. the event date is not in the future
//! 2. no identical record exists
//! 3. plant relationships fit the pollination type (pollination only)
//! 4. an internal seed source points at a live pollination record (germination only)
//! 5. quantities are sane
//!
//! Existing data is reached only through [`RecordLookup`], a read-only
//! capability the caller supplies. The validator never reads the clock; "today"
//! is an argument.

use chrono::NaiveDate;
use sea_orm::{DatabaseConnection, QuerySelect, prelude::*};
use tracing::debug;

use crate::core::dates::{DateCalculator, SpeciesKey, add_days};
use crate::entities::{
    ClimateCode, GerminationRecord, Plant, PollinationRecord, PollinationType, SeedSource,
    germination_record, pollination_record,
};
use crate::errors::{Result, ValidationError};

/// Fields of a pollination record as submitted by the CRUD layer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NewPollination {
    /// User responsible for the pollination
    pub responsible: String,
    /// Self, Sibling or Hybrid
    pub pollination_type: PollinationType,
    /// Day the pollination was performed
    pub pollination_date: NaiveDate,
    /// Plant that received the pollen
    pub mother_plant_id: i64,
    /// Pollen donor
    pub father_plant_id: Option<i64>,
    /// Offspring plant entry
    pub new_plant_id: i64,
    /// Climate band
    pub climate: ClimateCode,
    /// Capsules pollinated
    pub capsules_quantity: i32,
    /// Free-text observations
    pub notes: String,
}

/// Fields of a germination record as submitted by the CRUD layer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NewGermination {
    /// User responsible for the sowing
    pub responsible: String,
    /// Day the seeds were sown
    pub germination_date: NaiveDate,
    /// Plant being germinated
    pub plant_id: i64,
    /// Internal or external seed origin
    pub seed_source: SeedSource,
    /// Climate band of the setup
    pub climate: ClimateCode,
    /// Substrate used
    pub substrate: String,
    /// Where the trays are kept
    pub location: String,
    /// Seeds sown
    pub seeds_planted: i32,
    /// Seedlings already up at creation time
    pub seedlings_germinated: i32,
    /// Explicit transplant duration; bypasses the species table
    pub transplant_days: Option<u32>,
}

/// A pollination candidate that passed every rule.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ValidatedPollination {
    /// The accepted fields
    pub record: NewPollination,
    /// Derived maturation date
    pub estimated_maturation_date: NaiveDate,
}

/// A germination candidate that passed every rule.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ValidatedGermination {
    /// The accepted fields
    pub record: NewGermination,
    /// Duration that produced the estimate
    pub transplant_days: u32,
    /// Derived transplant date
    pub estimated_transplant_date: NaiveDate,
}

/// State of a pollination record referenced as a seed source.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SourceStatus {
    /// No such record
    Missing,
    /// Record exists but was soft-deleted
    Deleted,
    /// Record exists and is live
    Active,
}

/// Read-only queries the validator needs against existing data.
#[allow(async_fn_in_trait)]
pub trait RecordLookup {
    /// Species of a plant, or `None` if the id does not resolve.
    async fn plant_species(&self, plant_id: i64) -> Result<Option<SpeciesKey>>;

    /// Id of a live pollination record with the same plants, type and date.
    async fn find_duplicate_pollination(&self, candidate: &NewPollination) -> Result<Option<i64>>;

    /// Id of a live germination record with the same plant, seed source and date.
    async fn find_duplicate_germination(&self, candidate: &NewGermination) -> Result<Option<i64>>;

    /// Whether a pollination record can serve as a seed source.
    async fn pollination_source_status(&self, pollination_id: i64) -> Result<SourceStatus>;
}

/// Validation gate over a lookup capability and the date tables.
pub struct RecordValidator<'a, L> {
    lookup: &'a L,
    dates: &'a DateCalculator,
}

impl<'a, L: RecordLookup> RecordValidator<'a, L> {
    /// Creates a validator.
    #[must_use]
    pub const fn new(lookup: &'a L, dates: &'a DateCalculator) -> Self {
        Self { lookup, dates }
    }

    /// Runs the pollination rules and derives the maturation date.
    ///
    /// # Errors
    /// [`Error::Validation`](crate::errors::Error::Validation) for a rejected
    /// record, [`Error::Database`](crate::errors::Error::Database) if a lookup fails.
    pub async fn validate_pollination(
        &self,
        candidate: NewPollination,
        today: NaiveDate,
    ) -> Result<ValidatedPollination> {
        check_not_future(candidate.pollination_date, today)?;

        if let Some(existing_id) = self.lookup.find_duplicate_pollination(&candidate).await? {
            return Err(ValidationError::DuplicateRecord { existing_id }.into());
        }

        let mother = self.check_type_relationship(&candidate).await?;

        if candidate.capsules_quantity < 1 {
            return Err(ValidationError::InvalidQuantity {
                field: "capsules_quantity",
                value: candidate.capsules_quantity,
            }
            .into());
        }

        let estimated_maturation_date = self
            .dates
            .compute_maturation_date(candidate.pollination_date, &mother);
        debug!(
            "Pollination of {} on {} accepted, maturation estimated {}",
            mother, candidate.pollination_date, estimated_maturation_date
        );

        Ok(ValidatedPollination {
            record: candidate,
            estimated_maturation_date,
        })
    }

    /// Runs the germination rules and derives the transplant date.
    ///
    /// # Errors
    /// [`Error::Validation`](crate::errors::Error::Validation) for a rejected
    /// record, [`Error::Database`](crate::errors::Error::Database) if a lookup fails.
    pub async fn validate_germination(
        &self,
        candidate: NewGermination,
        today: NaiveDate,
    ) -> Result<ValidatedGermination> {
        check_not_future(candidate.germination_date, today)?;

        if let Some(existing_id) = self.lookup.find_duplicate_germination(&candidate).await? {
            return Err(ValidationError::DuplicateRecord { existing_id }.into());
        }

        if let SeedSource::Internal { pollination_id } = candidate.seed_source {
            let reason = match self.lookup.pollination_source_status(pollination_id).await? {
                SourceStatus::Active => None,
                SourceStatus::Missing => Some("does not exist"),
                SourceStatus::Deleted => Some("has been deleted"),
            };
            if let Some(reason) = reason {
                return Err(ValidationError::InvalidSeedSource {
                    pollination_id,
                    reason: reason.to_string(),
                }
                .into());
            }
        }

        let plant = self.resolve_plant(candidate.plant_id).await?;

        if candidate.seeds_planted < 1 {
            return Err(ValidationError::InvalidQuantity {
                field: "seeds_planted",
                value: candidate.seeds_planted,
            }
            .into());
        }
        check_seedlings(candidate.seeds_planted, candidate.seedlings_germinated)?;

        let transplant_days = candidate
            .transplant_days
            .unwrap_or_else(|| self.dates.transplant_days(&plant));
        let estimated_transplant_date = add_days(candidate.germination_date, transplant_days);

        Ok(ValidatedGermination {
            record: candidate,
            transplant_days,
            estimated_transplant_date,
        })
    }

    async fn resolve_plant(&self, plant_id: i64) -> Result<SpeciesKey> {
        self.lookup
            .plant_species(plant_id)
            .await?
            .ok_or_else(|| ValidationError::UnknownPlant { plant_id }.into())
    }

    /// Checks the plants against the pollination type and returns the mother's species.
    ///
    /// Father presence is decided before any plant is looked up.
    async fn check_type_relationship(&self, candidate: &NewPollination) -> Result<SpeciesKey> {
        let ptype = candidate.pollination_type;
        let father = match (ptype.requires_father(), candidate.father_plant_id) {
            (true, None) => {
                return Err(ValidationError::MissingParentPlant {
                    pollination_type: ptype.to_string(),
                }
                .into());
            }
            (false, Some(_)) => {
                return Err(incompatible("self-pollination takes no father plant"));
            }
            (true, Some(father_id)) => Some(self.resolve_plant(father_id).await?),
            (false, None) => None,
        };
        let mother = self.resolve_plant(candidate.mother_plant_id).await?;

        match ptype {
            PollinationType::SelfPollination => {
                let offspring = self.resolve_plant(candidate.new_plant_id).await?;
                if !mother.same_species(&offspring) {
                    return Err(incompatible(&format!(
                        "new plant {offspring} must match mother species {mother}"
                    )));
                }
            }
            PollinationType::Sibling => {
                let offspring = self.resolve_plant(candidate.new_plant_id).await?;
                if let Some(father) = &father {
                    if !mother.same_species(father) || !mother.same_species(&offspring) {
                        return Err(incompatible(&format!(
                            "sibling pollination needs one species, got {mother} x {father} -> {offspring}"
                        )));
                    }
                }
            }
            PollinationType::Hybrid => {
                self.resolve_plant(candidate.new_plant_id).await?;
            }
        }
        Ok(mother)
    }
}

fn incompatible(reason: &str) -> crate::errors::Error {
    ValidationError::IncompatiblePlants {
        reason: reason.to_string(),
    }
    .into()
}

fn check_not_future(date: NaiveDate, today: NaiveDate) -> Result<()> {
    if date > today {
        return Err(ValidationError::FutureDateNotAllowed { date, today }.into());
    }
    Ok(())
}

/// Seedlings can never outnumber the seeds sown.
pub fn check_seedlings(planted: i32, germinated: i32) -> Result<()> {
    if germinated < 0 {
        return Err(ValidationError::InvalidQuantity {
            field: "seedlings_germinated",
            value: germinated,
        }
        .into());
    }
    if germinated > planted {
        return Err(ValidationError::InvalidSeedlingCount {
            planted,
            germinated,
        }
        .into());
    }
    Ok(())
}

impl RecordLookup for DatabaseConnection {
    async fn plant_species(&self, plant_id: i64) -> Result<Option<SpeciesKey>> {
        Ok(Plant::find_by_id(plant_id)
            .one(self)
            .await?
            .map(|plant| plant.species_key()))
    }

    async fn find_duplicate_pollination(&self, candidate: &NewPollination) -> Result<Option<i64>> {
        let father = match candidate.father_plant_id {
            Some(id) => pollination_record::Column::FatherPlantId.eq(id),
            None => pollination_record::Column::FatherPlantId.is_null(),
        };
        let existing = PollinationRecord::find()
            .filter(pollination_record::Column::MotherPlantId.eq(candidate.mother_plant_id))
            .filter(father)
            .filter(pollination_record::Column::NewPlantId.eq(candidate.new_plant_id))
            .filter(pollination_record::Column::PollinationType.eq(candidate.pollination_type))
            .filter(pollination_record::Column::PollinationDate.eq(candidate.pollination_date))
            .filter(pollination_record::Column::IsDeleted.eq(false))
            .limit(1)
            .one(self)
            .await?;
        Ok(existing.map(|record| record.id))
    }

    async fn find_duplicate_germination(&self, candidate: &NewGermination) -> Result<Option<i64>> {
        let source = match &candidate.seed_source {
            SeedSource::Internal { pollination_id } => {
                germination_record::Column::SeedSourcePollinationId.eq(*pollination_id)
            }
            SeedSource::External { origin } => {
                germination_record::Column::SeedSourceExternal.eq(origin.clone())
            }
        };
        let existing = GerminationRecord::find()
            .filter(germination_record::Column::PlantId.eq(candidate.plant_id))
            .filter(source)
            .filter(germination_record::Column::GerminationDate.eq(candidate.germination_date))
            .filter(germination_record::Column::IsDeleted.eq(false))
            .limit(1)
            .one(self)
            .await?;
        Ok(existing.map(|record| record.id))
    }

    async fn pollination_source_status(&self, pollination_id: i64) -> Result<SourceStatus> {
        let status = match PollinationRecord::find_by_id(pollination_id).one(self).await? {
            None => SourceStatus::Missing,
            Some(record) if record.is_deleted => SourceStatus::Deleted,
            Some(_) => SourceStatus::Active,
        };
        Ok(status)
    }
}
