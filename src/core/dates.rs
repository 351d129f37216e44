//! Derived-date calculation.
//!
//! Maps an event date and a species to the day capsules should be mature or
//! seedlings ready for transplant. Lookup goes species, then genus, then the
//! table default, so an unknown plant always gets a date. Nothing here reads the
//! clock.

use chrono::{Days, NaiveDate};
use serde::Deserialize;
use std::collections::HashMap;
use std::fmt;

/// Botanical lookup key: a genus plus an optional species epithet.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct SpeciesKey {
    genus: String,
    species: Option<String>,
}

impl SpeciesKey {
    /// Builds a key, trimming whitespace and treating an empty epithet as absent.
    #[must_use]
    pub fn new(genus: &str, species: Option<&str>) -> Self {
        let species = species
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string);
        Self {
            genus: genus.trim().to_string(),
            species,
        }
    }

    /// Parses free text such as `"Cattleya trianae"`. A single word is a genus.
    #[must_use]
    pub fn parse(text: &str) -> Self {
        let mut parts = text.split_whitespace();
        let genus = parts.next().unwrap_or_default();
        let species = parts.collect::<Vec<_>>().join(" ");
        Self::new(genus, Some(species.as_str()))
    }

    /// Genus part of the key.
    #[must_use]
    pub fn genus(&self) -> &str {
        &self.genus
    }

    /// Species epithet, if known.
    #[must_use]
    pub fn species(&self) -> Option<&str> {
        self.species.as_deref()
    }

    /// Whether two plants count as the same species (genus and epithet match).
    #[must_use]
    pub fn same_species(&self, other: &Self) -> bool {
        self.genus.eq_ignore_ascii_case(&other.genus)
            && match (&self.species, &other.species) {
                (Some(a), Some(b)) => a.eq_ignore_ascii_case(b),
                (None, None) => true,
                _ => false,
            }
    }
}

impl fmt::Display for SpeciesKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.species {
            Some(species) => write!(f, "{} {}", self.genus, species),
            None => f.write_str(&self.genus),
        }
    }
}

/// Duration lookup table with species and genus overrides.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct DurationTable {
    /// Days keyed by "Genus species"
    #[serde(default)]
    pub species: HashMap<String, u32>,
    /// Days keyed by genus
    #[serde(default)]
    pub genus: HashMap<String, u32>,
    /// Days used when neither map matches
    pub default_days: u32,
}

impl DurationTable {
    /// Table with only a global default.
    #[must_use]
    pub fn with_default(default_days: u32) -> Self {
        Self {
            species: HashMap::new(),
            genus: HashMap::new(),
            default_days,
        }
    }

    /// Capsule maturation: 120 days unless configured otherwise.
    #[must_use]
    pub fn maturation_defaults() -> Self {
        Self::with_default(120)
    }

    /// Transplant timing per plant family, 90 days otherwise.
    #[must_use]
    pub fn transplant_defaults() -> Self {
        let genus = [("Orchidaceae", 120), ("Bromeliaceae", 90), ("Cactaceae", 60)]
            .into_iter()
            .map(|(name, days)| (name.to_string(), days))
            .collect();
        Self {
            species: HashMap::new(),
            genus,
            default_days: 90,
        }
    }

    /// Resolves the duration for `key`: species, then genus, then default.
    ///
    /// Table names match the way [`SpeciesKey::same_species`] does, ignoring case
    /// and surrounding whitespace.
    #[must_use]
    pub fn days_for(&self, key: &SpeciesKey) -> u32 {
        if key.species().is_some() {
            let species = self
                .species
                .iter()
                .find(|(name, _)| SpeciesKey::parse(name).same_species(key));
            if let Some((_, days)) = species {
                return *days;
            }
        }
        self.genus
            .iter()
            .find(|(name, _)| name.trim().eq_ignore_ascii_case(key.genus()))
            .map_or(self.default_days, |(_, days)| *days)
    }
}

/// Adds `days` to `start`, saturating at the last representable date.
#[must_use]
pub fn add_days(start: NaiveDate, days: u32) -> NaiveDate {
    start
        .checked_add_days(Days::new(u64::from(days)))
        .unwrap_or(NaiveDate::MAX)
}

/// Computes maturation and transplant dates from the configured tables.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DateCalculator {
    maturation: DurationTable,
    transplant: DurationTable,
}

impl Default for DateCalculator {
    fn default() -> Self {
        Self::new(
            DurationTable::maturation_defaults(),
            DurationTable::transplant_defaults(),
        )
    }
}

impl DateCalculator {
    /// Creates a calculator over the two tables.
    #[must_use]
    pub const fn new(maturation: DurationTable, transplant: DurationTable) -> Self {
        Self {
            maturation,
            transplant,
        }
    }

    /// Days from pollination to maturation for this species.
    #[must_use]
    pub fn maturation_days(&self, key: &SpeciesKey) -> u32 {
        self.maturation.days_for(key)
    }

    /// Days from sowing to transplant for this species.
    #[must_use]
    pub fn transplant_days(&self, key: &SpeciesKey) -> u32 {
        self.transplant.days_for(key)
    }

    /// Estimated maturation date of a pollination performed on `pollination_date`.
    #[must_use]
    pub fn compute_maturation_date(&self, pollination_date: NaiveDate, key: &SpeciesKey) -> NaiveDate {
        add_days(pollination_date, self.maturation_days(key))
    }

    /// Estimated transplant date of a sowing performed on `germination_date`.
    #[must_use]
    pub fn compute_transplant_date(&self, germination_date: NaiveDate, key: &SpeciesKey) -> NaiveDate {
        add_days(germination_date, self.transplant_days(key))
    }
}
