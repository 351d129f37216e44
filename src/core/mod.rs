//! Core module - Framework-agnostic business logic for records and alerts.
//! Everything here takes a `DatabaseConnection` (or nothing at all) and can be
//! driven from the CLI, a scheduler, or tests.

pub mod dates;
pub mod generator;
pub mod germination;
pub mod inbox;
pub mod plant;
pub mod policy;
pub mod pollination;
pub mod scheduler;
pub mod validation;

pub use dates::{DateCalculator, DurationTable, SpeciesKey};
pub use generator::{AlertGenerator, SweepReport, format_sweep_summary, last_sweep_at};
pub use policy::{AlertTimeline, Bucket, DueAlert, due_alerts};
pub use scheduler::{AlertScheduler, SchedulerState};
pub use validation::{
    NewGermination, NewPollination, RecordLookup, RecordValidator, SourceStatus,
    ValidatedGermination, ValidatedPollination,
};
