//! Database configuration module for the pollination alert engine.
//!
//! This module handles `SQLite` database connection and table creation using `SeaORM`.
//! Tables are generated from the entity definitions with
//! `Schema::create_table_from_entity`, so the unique constraint on
//! `alerts.dedup_key` comes straight from the `#[sea_orm(unique)]` attribute.

use crate::entities::{Alert, GerminationRecord, Plant, PollinationRecord, SystemState};
use crate::errors::Result;
use sea_orm::{ConnectionTrait, Database, DatabaseConnection, Schema};
use std::path::Path;
use tracing::{debug, info};

const DEFAULT_DATABASE_URL: &str = "sqlite://data/pollination.sqlite?mode=rwc";

/// Gets the database URL from environment variable or returns default `SQLite` path.
#[must_use]
pub fn get_database_url() -> String {
    std::env::var("DATABASE_URL").unwrap_or_else(|_| DEFAULT_DATABASE_URL.to_string())
}

/// Establishes a connection to the database named by `DATABASE_URL`.
///
/// Falls back to a local `SQLite` file if no environment variable is set.
pub async fn create_connection() -> Result<DatabaseConnection> {
    let database_url = get_database_url();
    if let Some(parent) = sqlite_parent_dir(&database_url) {
        std::fs::create_dir_all(parent)?;
    }
    debug!("Connecting to {}", database_url);
    Database::connect(&database_url).await.map_err(Into::into)
}

/// Directory holding the database file of a `sqlite://` URL, if it has one.
fn sqlite_parent_dir(database_url: &str) -> Option<&Path> {
    let file = database_url
        .strip_prefix("sqlite://")?
        .split('?')
        .next()
        .filter(|file| !file.is_empty() && *file != ":memory:")?;
    Path::new(file)
        .parent()
        .filter(|dir| !dir.as_os_str().is_empty())
}

/// Creates all tables if they do not exist yet.
///
/// Plants come first because both record tables reference them, and
/// pollination records before germination records for the seed-source key.
pub async fn create_tables(db: &DatabaseConnection) -> Result<()> {
    let builder = db.get_database_backend();
    let schema = Schema::new(builder);

    let mut plant_table = schema.create_table_from_entity(Plant);
    let mut pollination_table = schema.create_table_from_entity(PollinationRecord);
    let mut germination_table = schema.create_table_from_entity(GerminationRecord);
    let mut alert_table = schema.create_table_from_entity(Alert);
    let mut system_state_table = schema.create_table_from_entity(SystemState);

    for table in [
        plant_table.if_not_exists(),
        pollination_table.if_not_exists(),
        germination_table.if_not_exists(),
        alert_table.if_not_exists(),
        system_state_table.if_not_exists(),
    ] {
        db.execute(builder.build(&*table)).await?;
    }

    info!("Database tables ensured");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::{AlertModel, PlantModel, SystemStateModel};
    use sea_orm::{EntityTrait, QuerySelect};

    #[tokio::test]
    async fn test_create_tables() -> Result<()> {
        let db = Database::connect("sqlite::memory:").await?;
        create_tables(&db).await?;

        let _: Vec<PlantModel> = Plant::find().limit(1).all(&db).await?;
        let _: Vec<AlertModel> = Alert::find().limit(1).all(&db).await?;
        let _: Vec<SystemStateModel> = SystemState::find().limit(1).all(&db).await?;
        let _ = PollinationRecord::find().limit(1).all(&db).await?;
        let _ = GerminationRecord::find().limit(1).all(&db).await?;

        Ok(())
    }

    #[test]
    fn test_sqlite_parent_dir() {
        assert_eq!(
            sqlite_parent_dir(DEFAULT_DATABASE_URL),
            Some(Path::new("data"))
        );
        assert_eq!(sqlite_parent_dir("sqlite://alerts.sqlite?mode=rwc"), None);
        assert_eq!(sqlite_parent_dir("sqlite::memory:"), None);
        assert_eq!(sqlite_parent_dir("postgres://localhost/alerts"), None);
    }

    #[tokio::test]
    async fn test_create_tables_is_repeatable() -> Result<()> {
        let db = Database::connect("sqlite::memory:").await?;
        create_tables(&db).await?;
        create_tables(&db).await?;
        Ok(())
    }
}
