//! Germination record business logic - Create, confirm, count and reschedule sowings.

use crate::{
    core::{
        dates::{DateCalculator, add_days},
        validation::{NewGermination, RecordValidator, check_seedlings},
    },
    entities::{GerminationRecord, germination_record},
    errors::{Error, Result, ValidationError},
};
use chrono::{DateTime, NaiveDate, Utc};
use sea_orm::{Set, prelude::*};
use tracing::info;

/// Validates and stores a new germination record, stamped with the current time.
pub async fn create_germination_record(
    db: &DatabaseConnection,
    dates: &DateCalculator,
    candidate: NewGermination,
) -> Result<germination_record::Model> {
    create_germination_record_at(db, dates, candidate, Utc::now()).await
}

/// Validates and stores a new germination record as if created at `now`.
pub async fn create_germination_record_at(
    db: &DatabaseConnection,
    dates: &DateCalculator,
    candidate: NewGermination,
    now: DateTime<Utc>,
) -> Result<germination_record::Model> {
    let validated = RecordValidator::new(db, dates)
        .validate_germination(candidate, now.date_naive())
        .await?;
    let record = validated.record;
    let (source_pollination, source_external) = record.seed_source.into_columns();

    let model = germination_record::ActiveModel {
        responsible: Set(record.responsible),
        germination_date: Set(record.germination_date),
        estimated_transplant_date: Set(validated.estimated_transplant_date),
        plant_id: Set(record.plant_id),
        seed_source_pollination_id: Set(source_pollination),
        seed_source_external: Set(source_external),
        climate: Set(record.climate),
        substrate: Set(record.substrate),
        location: Set(record.location),
        seeds_planted: Set(record.seeds_planted),
        seedlings_germinated: Set(record.seedlings_germinated),
        transplant_days: Set(days_column(validated.transplant_days)),
        transplant_confirmed: Set(false),
        transplant_confirmed_on: Set(None),
        is_deleted: Set(false),
        created_at: Set(now),
        ..Default::default()
    };

    let inserted = model.insert(db).await?;
    info!(
        "Created germination record {} for plant {}, transplant estimated {}",
        inserted.id, inserted.plant_id, inserted.estimated_transplant_date
    );
    Ok(inserted)
}

fn days_column(days: u32) -> i32 {
    i32::try_from(days).unwrap_or(i32::MAX)
}

/// Finds a germination record by id, including soft-deleted ones.
pub async fn get_germination_record(
    db: &DatabaseConnection,
    record_id: i64,
) -> Result<Option<germination_record::Model>> {
    GerminationRecord::find_by_id(record_id)
        .one(db)
        .await
        .map_err(Into::into)
}

async fn require_live(
    db: &DatabaseConnection,
    record_id: i64,
) -> Result<germination_record::Model> {
    get_germination_record(db, record_id)
        .await?
        .filter(|record| !record.is_deleted)
        .ok_or(Error::RecordNotFound {
            entity: "germination record",
            id: record_id,
        })
}

/// Marks the seedlings as transplanted. Further preventive and daily alerts stop.
pub async fn confirm_transplant(
    db: &DatabaseConnection,
    record_id: i64,
    confirmed_on: NaiveDate,
) -> Result<germination_record::Model> {
    let record = require_live(db, record_id).await?;
    let mut active: germination_record::ActiveModel = record.into();
    active.transplant_confirmed = Set(true);
    active.transplant_confirmed_on = Set(Some(confirmed_on));
    Ok(active.update(db).await?)
}

/// Updates the number of seedlings that came up.
pub async fn record_seedlings(
    db: &DatabaseConnection,
    record_id: i64,
    seedlings_germinated: i32,
) -> Result<germination_record::Model> {
    let record = require_live(db, record_id).await?;
    check_seedlings(record.seeds_planted, seedlings_germinated)?;

    let mut active: germination_record::ActiveModel = record.into();
    active.seedlings_germinated = Set(seedlings_germinated);
    Ok(active.update(db).await?)
}

/// Moves the sowing date, keeping the stored transplant duration.
pub async fn reschedule_germination(
    db: &DatabaseConnection,
    record_id: i64,
    germination_date: NaiveDate,
    today: NaiveDate,
) -> Result<germination_record::Model> {
    if germination_date > today {
        return Err(ValidationError::FutureDateNotAllowed {
            date: germination_date,
            today,
        }
        .into());
    }

    let record = require_live(db, record_id).await?;
    let days = u32::try_from(record.transplant_days).unwrap_or_default();
    let estimated = add_days(germination_date, days);

    let mut active: germination_record::ActiveModel = record.into();
    active.germination_date = Set(germination_date);
    active.estimated_transplant_date = Set(estimated);
    let updated = active.update(db).await?;
    info!(
        "Rescheduled germination record {} to {}, transplant now estimated {}",
        updated.id, germination_date, estimated
    );
    Ok(updated)
}

/// Hides a record from sweeps and listings.
pub async fn soft_delete_germination_record(
    db: &DatabaseConnection,
    record_id: i64,
) -> Result<()> {
    let record = require_live(db, record_id).await?;
    let mut active: germination_record::ActiveModel = record.into();
    active.is_deleted = Set(true);
    active.update(db).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::core::pollination::soft_delete_pollination_record;
    use crate::entities::SeedSource;
    use crate::test_utils::*;

    #[tokio::test]
    async fn test_create_with_internal_source() -> Result<()> {
        let db = setup_test_db().await?;
        let source = create_test_pollination(&db, test_now()).await?;
        let now = test_now();

        let record = create_germination_record_at(
            &db,
            &DateCalculator::default(),
            sowing(
                source.new_plant_id,
                SeedSource::Internal {
                    pollination_id: source.id,
                },
                now.date_naive(),
            ),
            now,
        )
        .await?;

        assert_eq!(record.seed_source_pollination_id, Some(source.id));
        assert_eq!(record.seed_source_external, None);
        assert_eq!(record.transplant_days, 90);
        assert_eq!(
            record.estimated_transplant_date,
            add_days(now.date_naive(), 90)
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_deleted_pollination_is_not_a_seed_source() -> Result<()> {
        let db = setup_test_db().await?;
        let source = create_test_pollination(&db, test_now()).await?;
        soft_delete_pollination_record(&db, source.id).await?;

        let result = create_germination_record_at(
            &db,
            &DateCalculator::default(),
            sowing(
                source.new_plant_id,
                SeedSource::Internal {
                    pollination_id: source.id,
                },
                test_now().date_naive(),
            ),
            test_now(),
        )
        .await;

        assert_eq!(
            result.unwrap_err().as_validation().map(ValidationError::kind),
            Some("InvalidSeedSource")
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_record_seedlings_bounded_by_seeds() -> Result<()> {
        let db = setup_test_db().await?;
        let record = create_test_germination(&db, test_now()).await?;

        let updated = record_seedlings(&db, record.id, 40).await?;
        assert_eq!(updated.seedlings_germinated, 40);

        let result = record_seedlings(&db, record.id, record.seeds_planted + 1).await;
        assert_eq!(
            result.unwrap_err().as_validation().map(ValidationError::kind),
            Some("InvalidSeedlingCount")
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_reschedule_keeps_explicit_duration() -> Result<()> {
        let db = setup_test_db().await?;
        let plant = create_test_plant(&db, "Cattleya", "trianae").await?;
        let now = test_now();
        let mut candidate = sowing(
            plant.id,
            SeedSource::External {
                origin: "seed bank".to_string(),
            },
            now.date_naive(),
        );
        candidate.transplant_days = Some(45);
        let record =
            create_germination_record_at(&db, &DateCalculator::default(), candidate, now).await?;

        let earlier = now.date_naive() - chrono::Days::new(5);
        let updated = reschedule_germination(&db, record.id, earlier, now.date_naive()).await?;
        assert_eq!(updated.germination_date, earlier);
        assert_eq!(updated.estimated_transplant_date, add_days(earlier, 45));
        Ok(())
    }

    #[tokio::test]
    async fn test_confirm_transplant_and_delete() -> Result<()> {
        let db = setup_test_db().await?;
        let record = create_test_germination(&db, test_now()).await?;

        let confirmed = confirm_transplant(&db, record.id, test_now().date_naive()).await?;
        assert!(confirmed.transplant_confirmed);

        soft_delete_germination_record(&db, record.id).await?;
        let stored = get_germination_record(&db, record.id).await?.unwrap();
        assert!(stored.is_deleted);
        assert!(matches!(
            record_seedlings(&db, record.id, 1).await,
            Err(Error::RecordNotFound { .. })
        ));
        Ok(())
    }
}
