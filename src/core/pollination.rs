//! Pollination record business logic - Create, confirm, reschedule and delete.
//!
//! Every write that touches `pollination_date` recomputes
//! `estimated_maturation_date` in the same update, so the stored estimate is never
//! stale. Alert eligibility follows on the next sweep; existing alerts are never
//! rewritten.

use crate::{
    core::{
        dates::DateCalculator,
        validation::{NewPollination, RecordValidator},
    },
    entities::{PollinationRecord, pollination_record},
    errors::{Error, Result, ValidationError},
};
use chrono::{DateTime, NaiveDate, Utc};
use sea_orm::{Set, prelude::*};
use tracing::info;

/// Validates and stores a new pollination record, stamped with the current time.
pub async fn create_pollination_record(
    db: &DatabaseConnection,
    dates: &DateCalculator,
    candidate: NewPollination,
) -> Result<pollination_record::Model> {
    create_pollination_record_at(db, dates, candidate, Utc::now()).await
}

/// Validates and stores a new pollination record as if created at `now`.
///
/// The future-date rule is evaluated against `now`'s calendar day.
pub async fn create_pollination_record_at(
    db: &DatabaseConnection,
    dates: &DateCalculator,
    candidate: NewPollination,
    now: DateTime<Utc>,
) -> Result<pollination_record::Model> {
    let validated = RecordValidator::new(db, dates)
        .validate_pollination(candidate, now.date_naive())
        .await?;
    let record = validated.record;

    let model = pollination_record::ActiveModel {
        responsible: Set(record.responsible),
        pollination_type: Set(record.pollination_type),
        pollination_date: Set(record.pollination_date),
        estimated_maturation_date: Set(validated.estimated_maturation_date),
        mother_plant_id: Set(record.mother_plant_id),
        father_plant_id: Set(record.father_plant_id),
        new_plant_id: Set(record.new_plant_id),
        climate: Set(record.climate),
        capsules_quantity: Set(record.capsules_quantity),
        notes: Set(record.notes),
        maturation_confirmed: Set(false),
        maturation_confirmed_on: Set(None),
        is_deleted: Set(false),
        created_at: Set(now),
        ..Default::default()
    };

    let inserted = model.insert(db).await?;
    info!(
        "Created pollination record {} ({}), maturation estimated {}",
        inserted.id, inserted.pollination_type, inserted.estimated_maturation_date
    );
    Ok(inserted)
}

/// Finds a pollination record by id, including soft-deleted ones.
pub async fn get_pollination_record(
    db: &DatabaseConnection,
    record_id: i64,
) -> Result<Option<pollination_record::Model>> {
    PollinationRecord::find_by_id(record_id)
        .one(db)
        .await
        .map_err(Into::into)
}

async fn require_live(
    db: &DatabaseConnection,
    record_id: i64,
) -> Result<pollination_record::Model> {
    get_pollination_record(db, record_id)
        .await?
        .filter(|record| !record.is_deleted)
        .ok_or(Error::RecordNotFound {
            entity: "pollination record",
            id: record_id,
        })
}

/// Marks the capsules as mature. Further preventive and daily alerts stop.
pub async fn confirm_maturation(
    db: &DatabaseConnection,
    record_id: i64,
    confirmed_on: NaiveDate,
) -> Result<pollination_record::Model> {
    let record = require_live(db, record_id).await?;
    let mut active: pollination_record::ActiveModel = record.into();
    active.maturation_confirmed = Set(true);
    active.maturation_confirmed_on = Set(Some(confirmed_on));
    Ok(active.update(db).await?)
}

/// Moves the pollination date and recomputes the maturation estimate.
///
/// The new date is checked against `today` like a new record would be.
pub async fn reschedule_pollination(
    db: &DatabaseConnection,
    dates: &DateCalculator,
    record_id: i64,
    pollination_date: NaiveDate,
    today: NaiveDate,
) -> Result<pollination_record::Model> {
    if pollination_date > today {
        return Err(ValidationError::FutureDateNotAllowed {
            date: pollination_date,
            today,
        }
        .into());
    }

    let record = require_live(db, record_id).await?;
    let mother = crate::core::plant::get_plant(db, record.mother_plant_id)
        .await?
        .ok_or(ValidationError::UnknownPlant {
            plant_id: record.mother_plant_id,
        })?;
    let estimated = dates.compute_maturation_date(pollination_date, &mother.species_key());

    let mut active: pollination_record::ActiveModel = record.into();
    active.pollination_date = Set(pollination_date);
    active.estimated_maturation_date = Set(estimated);
    let updated = active.update(db).await?;
    info!(
        "Rescheduled pollination record {} to {}, maturation now estimated {}",
        updated.id, pollination_date, estimated
    );
    Ok(updated)
}

/// Hides a record. It stops appearing in sweeps and can no longer be a seed source.
pub async fn soft_delete_pollination_record(
    db: &DatabaseConnection,
    record_id: i64,
) -> Result<()> {
    let record = require_live(db, record_id).await?;
    let mut active: pollination_record::ActiveModel = record.into();
    active.is_deleted = Set(true);
    active.update(db).await?;
    Ok(())
}
