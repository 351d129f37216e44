//! Plant catalog operations.

use crate::{
    entities::{Plant, plant},
    errors::{Error, Result},
};
use sea_orm::{QueryOrder, Set, prelude::*};

/// Botanical identity and location of a new plant.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NewPlant {
    /// Genus, stored title-cased (e.g., "Cattleya")
    pub genus: String,
    /// Species epithet, stored lowercase
    pub species: String,
    /// Nursery name
    pub nursery: String,
    /// Bench or section
    pub bench: String,
    /// Wall or position
    pub wall: String,
}

/// Adds a plant to the catalog.
///
/// Genus and species are normalised the way botanists write them: genus
/// capitalised, epithet lowercase.
pub async fn create_plant(db: &DatabaseConnection, new: NewPlant) -> Result<plant::Model> {
    let genus = title_case(new.genus.trim());
    if genus.is_empty() {
        return Err(Error::Config {
            message: "Plant genus cannot be empty".to_string(),
        });
    }

    let model = plant::ActiveModel {
        genus: Set(genus),
        species: Set(new.species.trim().to_lowercase()),
        nursery: Set(new.nursery),
        bench: Set(new.bench),
        wall: Set(new.wall),
        is_active: Set(true),
        ..Default::default()
    };
    Ok(model.insert(db).await?)
}

/// Finds a plant by id.
pub async fn get_plant(db: &DatabaseConnection, plant_id: i64) -> Result<Option<plant::Model>> {
    Plant::find_by_id(plant_id).one(db).await.map_err(Into::into)
}

/// Lists active plants ordered by genus and species.
pub async fn list_active_plants(db: &DatabaseConnection) -> Result<Vec<plant::Model>> {
    Plant::find()
        .filter(plant::Column::IsActive.eq(true))
        .order_by_asc(plant::Column::Genus)
        .order_by_asc(plant::Column::Species)
        .all(db)
        .await
        .map_err(Into::into)
}

fn title_case(word: &str) -> String {
    let mut chars = word.chars();
    chars.next().map_or_else(String::new, |first| {
        first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect()
    })
}
