//! Shared test utilities for the alert engine.
//!
//! This module provides common helper functions for setting up test databases
//! and creating plants and records with sensible defaults.

use crate::{
    core::{
        dates::DateCalculator,
        germination, plant,
        plant::NewPlant,
        pollination,
        validation::{NewGermination, NewPollination},
    },
    entities::{self, ClimateCode, PollinationType, SeedSource},
    errors::Result,
};
use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use sea_orm::DatabaseConnection;

/// Creates an in-memory `SQLite` database with all tables initialized.
/// This is the standard setup for all integration tests.
pub async fn setup_test_db() -> Result<DatabaseConnection> {
    let db = sea_orm::Database::connect("sqlite::memory:").await?;
    crate::config::database::create_tables(&db).await?;
    Ok(db)
}

/// Routes `tracing` output through the test harness. Safe to call repeatedly.
pub fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("debug")
        .with_test_writer()
        .try_init();
}

/// Fixed "now" shared by tests: 2024-06-01 09:00 UTC.
#[must_use]
pub fn test_now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 1, 9, 0, 0)
        .single()
        .unwrap_or_default()
}

/// Creates a plant in the "Test Nursery" with the given botanical names.
pub async fn create_test_plant(
    db: &DatabaseConnection,
    genus: &str,
    species: &str,
) -> Result<entities::plant::Model> {
    plant::create_plant(
        db,
        NewPlant {
            genus: genus.to_string(),
            species: species.to_string(),
            nursery: "Test Nursery".to_string(),
            bench: "M1".to_string(),
            wall: "P1".to_string(),
        },
    )
    .await
}

/// A self-pollination candidate with two capsules.
#[must_use]
pub fn self_pollination(
    mother_plant_id: i64,
    new_plant_id: i64,
    pollination_date: NaiveDate,
) -> NewPollination {
    NewPollination {
        responsible: "test_user".to_string(),
        pollination_type: PollinationType::SelfPollination,
        pollination_date,
        mother_plant_id,
        father_plant_id: None,
        new_plant_id,
        climate: ClimateCode::Intermediate,
        capsules_quantity: 2,
        notes: String::new(),
    }
}

/// A sowing candidate with 100 seeds and no seedlings yet.
#[must_use]
pub fn sowing(plant_id: i64, seed_source: SeedSource, germination_date: NaiveDate) -> NewGermination {
    NewGermination {
        responsible: "test_user".to_string(),
        germination_date,
        plant_id,
        seed_source,
        climate: ClimateCode::Warm,
        substrate: "sphagnum".to_string(),
        location: "Lab shelf 1".to_string(),
        seeds_planted: 100,
        seedlings_germinated: 0,
        transplant_days: None,
    }
}

/// Creates a Cattleya self-pollination dated and created at `created_at`.
///
/// # Defaults
/// * maturation: 120 days (global default)
pub async fn create_test_pollination(
    db: &DatabaseConnection,
    created_at: DateTime<Utc>,
) -> Result<entities::pollination_record::Model> {
    let mother = create_test_plant(db, "Cattleya", "trianae").await?;
    let offspring = create_test_plant(db, "Cattleya", "trianae").await?;
    pollination::create_pollination_record_at(
        db,
        &DateCalculator::default(),
        self_pollination(mother.id, offspring.id, created_at.date_naive()),
        created_at,
    )
    .await
}

/// Creates a sowing of externally sourced seeds dated and created at `created_at`.
///
/// # Defaults
/// * transplant: 90 days (global default)
/// * `seeds_planted`: 100
pub async fn create_test_germination(
    db: &DatabaseConnection,
    created_at: DateTime<Utc>,
) -> Result<entities::germination_record::Model> {
    let plant = create_test_plant(db, "Dendrobium", "nobile").await?;
    germination::create_germination_record_at(
        db,
        &DateCalculator::default(),
        sowing(
            plant.id,
            SeedSource::External {
                origin: "Test seed bank".to_string(),
            },
            created_at.date_naive(),
        ),
        created_at,
    )
    .await
}
