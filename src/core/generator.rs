//! Alert generation sweep
//!
//! Fetches the records that can still produce alerts, asks the policy what is due
//! for each, and inserts whatever is not stored yet. Records are evaluated one at a
//! time and each insert stands alone, so a sweep can stop after any record without
//! leaving anything half written.
//!
//! The existence check before an insert only saves a round trip. The unique
//! `dedup_key` column is what keeps concurrent sweeps from creating the same alert
//! twice: inserts use `ON CONFLICT DO NOTHING` and a zero row count is treated as
//! "already present".
//!
//! The timestamp of the last completed sweep is kept in the `system_state` table so
//! an operator can see after a restart when alerts were last generated.

use crate::{
    core::policy::{AlertTimeline, DueAlert, due_alerts},
    entities::{
        Alert, AlertKind, AlertStatus, GerminationRecord, PollinationRecord, SubjectType,
        SystemState, alert, germination_record, pollination_record, system_state,
    },
    errors::{Error, Result},
};
use chrono::{DateTime, NaiveDate, TimeDelta, Utc};
use sea_orm::{
    Condition, QueryOrder, QueryResult, QuerySelect, QueryTrait, Set, prelude::*,
    sea_query::OnConflict,
};
use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};
use tracing::{debug, info, warn};

const LAST_ALERT_SWEEP_KEY: &str = "last_alert_sweep";

/// Outcome of one sweep.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SweepReport {
    /// Records fetched and evaluated (including failed ones)
    pub records_evaluated: usize,
    /// Alerts inserted by this sweep
    pub alerts_created: usize,
    /// Due alerts whose dedup key was already stored
    pub alerts_already_present: usize,
    /// Records whose alerts could not be written
    pub records_failed: usize,
    /// Whether the sweep stopped early on request
    pub cancelled: bool,
    /// The "now" the sweep ran against
    pub swept_at: DateTime<Utc>,
}

impl SweepReport {
    fn new(swept_at: DateTime<Utc>) -> Self {
        Self {
            records_evaluated: 0,
            alerts_created: 0,
            alerts_already_present: 0,
            records_failed: 0,
            cancelled: false,
            swept_at,
        }
    }
}

/// Turns due-ness decisions into stored alerts.
#[derive(Debug, Clone)]
pub struct AlertGenerator {
    db: DatabaseConnection,
    weekly_grace_days: i64,
    cancel_requested: Arc<AtomicBool>,
}

impl AlertGenerator {
    /// Creates a generator.
    ///
    /// Confirmed records stay in the sweep for `7 + weekly_grace_days` days after
    /// creation so their weekly follow-up can still fire.
    #[must_use]
    pub fn new(db: DatabaseConnection, weekly_grace_days: i64) -> Self {
        Self {
            db,
            weekly_grace_days: weekly_grace_days.max(0),
            cancel_requested: Arc::new(AtomicBool::new(false)),
        }
    }

    /// The connection sweeps run against.
    #[must_use]
    pub const fn connection(&self) -> &DatabaseConnection {
        &self.db
    }

    /// Asks the sweep in flight to stop after the record it is working on.
    ///
    /// The request lasts until that sweep ends. A sweep that starts while a
    /// request is pending stops before its first record.
    pub fn cancel(&self) {
        self.cancel_requested.store(true, Ordering::SeqCst);
    }

    /// Runs one sweep as of `now`.
    ///
    /// Per-record failures, including rows that cannot be decoded, are logged and
    /// counted. The sweep itself fails with [`Error::StorageUnavailable`] only when
    /// the records cannot be queried or no record that had alerts due could write
    /// any of them.
    pub async fn run_sweep(&self, now: DateTime<Utc>) -> Result<SweepReport> {
        let result = self.sweep(now).await;
        self.cancel_requested.store(false, Ordering::SeqCst);
        result
    }

    async fn sweep(&self, now: DateTime<Utc>) -> Result<SweepReport> {
        let today = now.date_naive();
        let mut report = SweepReport::new(now);

        let fetched = self
            .fetch_timelines(now)
            .await
            .map_err(|e| Error::StorageUnavailable {
                message: format!("Failed to read records: {e}"),
            })?;
        info!(
            "Alert sweep for {} over {} records",
            today,
            fetched.timelines.len() + fetched.unreadable.len()
        );

        for problem in &fetched.unreadable {
            warn!("Skipping unreadable record: {}", problem);
            report.records_evaluated += 1;
            report.records_failed += 1;
        }

        let mut records_with_due = 0;
        let mut write_failures = 0;
        for timeline in &fetched.timelines {
            if self.cancel_requested.load(Ordering::SeqCst) {
                info!(
                    "Alert sweep cancelled after {} records",
                    report.records_evaluated
                );
                report.cancelled = true;
                break;
            }
            report.records_evaluated += 1;

            let due = due_alerts(timeline, today);
            if due.is_empty() {
                continue;
            }
            records_with_due += 1;

            match self.store_due(&due, today).await {
                Ok((created, present)) => {
                    report.alerts_created += created;
                    report.alerts_already_present += present;
                }
                Err(e) => {
                    warn!(
                        "Failed to store alerts for {} #{}: {}",
                        timeline.subject_type, timeline.subject_id, e
                    );
                    write_failures += 1;
                    report.records_failed += 1;
                }
            }
        }

        if records_with_due > 0 && write_failures == records_with_due {
            return Err(Error::StorageUnavailable {
                message: format!("No alert could be written for {records_with_due} records"),
            });
        }

        if !report.cancelled {
            set_last_sweep_at(&self.db, now).await?;
        }
        info!("{}", format_sweep_summary(&report));
        Ok(report)
    }

    /// Reads the sweepable records column by column, so one bad row is reported
    /// on its own instead of failing the whole query.
    async fn fetch_timelines(&self, now: DateTime<Utc>) -> Result<FetchedTimelines> {
        let weekly_window = AlertKind::Weekly.cadence().offset_days + self.weekly_grace_days;
        let weekly_cutoff = TimeDelta::try_days(weekly_window)
            .and_then(|window| now.checked_sub_signed(window))
            .unwrap_or(DateTime::<Utc>::MIN_UTC);
        let backend = self.db.get_database_backend();

        let pollinations = PollinationRecord::find()
            .select_only()
            .columns([
                pollination_record::Column::Id,
                pollination_record::Column::CreatedAt,
                pollination_record::Column::EstimatedMaturationDate,
                pollination_record::Column::MaturationConfirmed,
            ])
            .filter(pollination_record::Column::IsDeleted.eq(false))
            .filter(
                Condition::any()
                    .add(pollination_record::Column::MaturationConfirmed.eq(false))
                    .add(pollination_record::Column::CreatedAt.gte(weekly_cutoff)),
            )
            .order_by_asc(pollination_record::Column::Id)
            .build(backend);

        let germinations = GerminationRecord::find()
            .select_only()
            .columns([
                germination_record::Column::Id,
                germination_record::Column::CreatedAt,
                germination_record::Column::EstimatedTransplantDate,
                germination_record::Column::TransplantConfirmed,
            ])
            .filter(germination_record::Column::IsDeleted.eq(false))
            .filter(
                Condition::any()
                    .add(germination_record::Column::TransplantConfirmed.eq(false))
                    .add(germination_record::Column::CreatedAt.gte(weekly_cutoff)),
            )
            .order_by_asc(germination_record::Column::Id)
            .build(backend);

        let mut fetched = FetchedTimelines::default();
        for row in self.db.query_all(pollinations).await? {
            fetched.push(read_timeline(
                &row,
                SubjectType::Pollination,
                "estimated_maturation_date",
                "maturation_confirmed",
            ));
        }
        for row in self.db.query_all(germinations).await? {
            fetched.push(read_timeline(
                &row,
                SubjectType::Germination,
                "estimated_transplant_date",
                "transplant_confirmed",
            ));
        }
        Ok(fetched)
    }

    /// Inserts the missing alerts for one record. Returns (created, already present).
    async fn store_due(&self, due: &[DueAlert], today: NaiveDate) -> Result<(usize, usize)> {
        let mut created = 0;
        let mut present = 0;

        for alert in due {
            let key = alert.dedup_key();
            let existing = Alert::find()
                .filter(alert::Column::DedupKey.eq(key.as_str()))
                .one(&self.db)
                .await?;
            if existing.is_some() {
                present += 1;
                continue;
            }

            if self.insert_alert(alert, today).await? {
                debug!("Created alert {}", key);
                created += 1;
            } else {
                debug!("Alert {} inserted concurrently", key);
                present += 1;
            }
        }

        Ok((created, present))
    }

    /// Inserts one alert unless its dedup key is already stored.
    ///
    /// Returns `false` when the insert hit the unique key and changed nothing.
    async fn insert_alert(&self, alert: &DueAlert, today: NaiveDate) -> Result<bool> {
        let model = alert::ActiveModel {
            kind: Set(alert.kind),
            subject_type: Set(alert.subject_type),
            subject_id: Set(alert.subject_id),
            anchor_date: Set(alert.anchor_date),
            scheduled_for: Set(alert.scheduled_for),
            generated_on: Set(today),
            dedup_key: Set(alert.dedup_key()),
            priority: Set(alert.priority()),
            title: Set(alert.title()),
            status: Set(AlertStatus::Pending),
            status_changed_at: Set(None),
            ..Default::default()
        };
        let rows = Alert::insert(model)
            .on_conflict(
                OnConflict::column(alert::Column::DedupKey)
                    .do_nothing()
                    .to_owned(),
            )
            .exec_without_returning(&self.db)
            .await?;

        Ok(rows > 0)
    }
}

/// Records that can still produce alerts, split by whether their row decoded.
#[derive(Debug, Default)]
struct FetchedTimelines {
    timelines: Vec<AlertTimeline>,
    unreadable: Vec<String>,
}

impl FetchedTimelines {
    fn push(&mut self, row: std::result::Result<AlertTimeline, String>) {
        match row {
            Ok(timeline) => self.timelines.push(timeline),
            Err(problem) => self.unreadable.push(problem),
        }
    }
}

fn read_timeline(
    row: &QueryResult,
    subject_type: SubjectType,
    estimated_column: &str,
    confirmed_column: &str,
) -> std::result::Result<AlertTimeline, String> {
    let subject_id: i64 = row
        .try_get("", "id")
        .map_err(|e| format!("{subject_type} with unreadable id: {e}"))?;

    let decode = || -> std::result::Result<AlertTimeline, DbErr> {
        Ok(AlertTimeline {
            subject_type,
            subject_id,
            created_on: row.try_get::<DateTime<Utc>>("", "created_at")?.date_naive(),
            estimated_on: row.try_get("", estimated_column)?,
            confirmed: row.try_get("", confirmed_column)?,
        })
    };
    decode().map_err(|e| format!("{subject_type} #{subject_id}: {e}"))
}

/// Retrieves the time of the last completed sweep from the `system_state` table.
///
/// # Returns
/// * `Ok(Some(time))` - Last sweep time if one was recorded
/// * `Ok(None)` - No sweep has completed yet
pub async fn last_sweep_at(db: &DatabaseConnection) -> Result<Option<DateTime<Utc>>> {
    let state = SystemState::find()
        .filter(system_state::Column::Key.eq(LAST_ALERT_SWEEP_KEY))
        .one(db)
        .await?;

    state
        .map(|s| {
            DateTime::parse_from_rfc3339(&s.value)
                .map(|time| time.with_timezone(&Utc))
                .map_err(|e| Error::Config {
                    message: format!("Failed to parse last sweep time: {e}"),
                })
        })
        .transpose()
}

async fn set_last_sweep_at<C>(db: &C, swept_at: DateTime<Utc>) -> Result<()>
where
    C: ConnectionTrait,
{
    let value = swept_at.to_rfc3339();

    let existing = SystemState::find()
        .filter(system_state::Column::Key.eq(LAST_ALERT_SWEEP_KEY))
        .one(db)
        .await?;

    if let Some(state) = existing {
        let mut active_model: system_state::ActiveModel = state.into();
        active_model.value = Set(value);
        active_model.updated_at = Set(Utc::now());
        active_model.update(db).await?;
    } else {
        let new_state = system_state::ActiveModel {
            key: Set(LAST_ALERT_SWEEP_KEY.to_string()),
            value: Set(value),
            updated_at: Set(Utc::now()),
            ..Default::default()
        };
        new_state.insert(db).await?;
    }

    Ok(())
}

/// Formats a sweep report as a one-line summary for logs and the CLI.
#[must_use]
pub fn format_sweep_summary(report: &SweepReport) -> String {
    let mut summary = format!(
        "Alert sweep {} - {} records, {} alerts created, {} already present",
        report.swept_at.format("%Y-%m-%d %H:%M UTC"),
        report.records_evaluated,
        report.alerts_created,
        report.alerts_already_present
    );
    if report.records_failed > 0 {
        summary.push_str(&format!(", {} records failed", report.records_failed));
    }
    if report.cancelled {
        summary.push_str(" (cancelled)");
    }
    summary
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::core::{
        germination::confirm_transplant, inbox::alerts_for_subject,
        pollination::confirm_maturation,
    };
    use crate::entities::AlertPriority;
    use crate::test_utils::*;
    use chrono::Days;

    fn days_later(start: DateTime<Utc>, days: u64) -> DateTime<Utc> {
        start.checked_add_days(Days::new(days)).unwrap()
    }

    async fn alerts_of(db: &DatabaseConnection, kind: AlertKind) -> Result<Vec<alert::Model>> {
        Ok(Alert::find()
            .filter(alert::Column::Kind.eq(kind))
            .order_by_asc(alert::Column::Id)
            .all(db)
            .await?)
    }

    #[tokio::test]
    async fn test_cattleya_scenario() -> Result<()> {
        init_test_tracing();
        let db = setup_test_db().await?;
        let created = test_now();
        let record = create_test_pollination(&db, created).await?;
        let generator = AlertGenerator::new(db.clone(), 7);

        // Nothing due on day 6
        let report = generator.run_sweep(days_later(created, 6)).await?;
        assert_eq!(report.records_evaluated, 1);
        assert_eq!(report.alerts_created, 0);

        // Day 7: exactly one weekly alert
        let report = generator.run_sweep(days_later(created, 7)).await?;
        assert_eq!(report.alerts_created, 1);
        let weekly = alerts_of(&db, AlertKind::Weekly).await?;
        assert_eq!(weekly.len(), 1);
        assert_eq!(weekly[0].subject_type, SubjectType::Pollination);
        assert_eq!(weekly[0].subject_id, record.id);
        assert_eq!(weekly[0].priority, AlertPriority::Medium);
        assert_eq!(
            weekly[0].dedup_key,
            format!("pollination:{}:weekly:once", record.id)
        );

        // D - 7: preventive plus the first daily reminder
        let final_week = days_later(created, 113);
        let report = generator.run_sweep(final_week).await?;
        assert_eq!(report.alerts_created, 2);
        assert_eq!(report.alerts_already_present, 1);
        assert_eq!(alerts_of(&db, AlertKind::Preventive).await?.len(), 1);
        let frequent = alerts_of(&db, AlertKind::Frequent).await?;
        assert_eq!(frequent.len(), 1);
        assert_eq!(frequent[0].scheduled_for, final_week.date_naive());

        // Same day again: nothing new
        let report = generator.run_sweep(final_week).await?;
        assert_eq!(report.alerts_created, 0);
        assert_eq!(report.alerts_already_present, 3);
        assert_eq!(Alert::find().count(&db).await?, 3);
        Ok(())
    }

    #[tokio::test]
    async fn test_frequent_alerts_until_confirmation() -> Result<()> {
        let db = setup_test_db().await?;
        let created = test_now();
        let record = create_test_pollination(&db, created).await?;
        let generator = AlertGenerator::new(db.clone(), 7);

        for day in 113..=116 {
            generator.run_sweep(days_later(created, day)).await?;
        }
        assert_eq!(alerts_of(&db, AlertKind::Frequent).await?.len(), 4);

        confirm_maturation(&db, record.id, days_later(created, 116).date_naive()).await?;
        let report = generator.run_sweep(days_later(created, 117)).await?;
        assert_eq!(report.records_evaluated, 0);
        assert_eq!(alerts_of(&db, AlertKind::Frequent).await?.len(), 4);
        Ok(())
    }

    #[tokio::test]
    async fn test_confirmed_record_still_gets_trailing_weekly() -> Result<()> {
        let db = setup_test_db().await?;
        let created = test_now();
        let record = create_test_germination(&db, created).await?;
        confirm_transplant(&db, record.id, created.date_naive()).await?;
        let generator = AlertGenerator::new(db.clone(), 7);

        let report = generator.run_sweep(days_later(created, 10)).await?;
        assert_eq!(report.alerts_created, 1);
        let weekly = alerts_of(&db, AlertKind::Weekly).await?;
        assert_eq!(weekly[0].subject_type, SubjectType::Germination);

        // Past the grace window the record is no longer fetched
        let report = generator.run_sweep(days_later(created, 15)).await?;
        assert_eq!(report.records_evaluated, 0);
        Ok(())
    }

    #[tokio::test]
    async fn test_late_sweep_catches_up_weekly() -> Result<()> {
        let db = setup_test_db().await?;
        let created = test_now();
        create_test_pollination(&db, created).await?;
        let generator = AlertGenerator::new(db.clone(), 7);

        // First sweep ever runs a month later; the weekly alert is still due
        let report = generator.run_sweep(days_later(created, 30)).await?;
        assert_eq!(report.alerts_created, 1);
        let weekly = alerts_of(&db, AlertKind::Weekly).await?;
        assert_eq!(
            weekly[0].scheduled_for,
            days_later(created, 7).date_naive()
        );
        assert_eq!(weekly[0].generated_on, days_later(created, 30).date_naive());
        Ok(())
    }

    #[tokio::test]
    async fn test_concurrent_duplicate_counts_as_present() -> Result<()> {
        let db = setup_test_db().await?;
        let created = test_now();
        let record = create_test_pollination(&db, created).await?;
        let generator = AlertGenerator::new(db.clone(), 7);
        let today = days_later(created, 7).date_naive();

        let due = due_alerts(&AlertTimeline::from(&record), today);
        assert_eq!(due.len(), 1);

        // A second writer racing past the existence check hits the unique key
        assert!(generator.insert_alert(&due[0], today).await?);
        assert!(!generator.insert_alert(&due[0], today).await?);
        assert_eq!(Alert::find().count(&db).await?, 1);

        assert_eq!(generator.store_due(&due, today).await?, (0, 1));
        Ok(())
    }

    #[tokio::test]
    async fn test_unreadable_row_does_not_stop_sweep() -> Result<()> {
        init_test_tracing();
        let db = setup_test_db().await?;
        let created = test_now();
        create_test_pollination(&db, created).await?;
        let odd_type = create_test_pollination(&db, created).await?;
        let broken = create_test_pollination(&db, created).await?;

        // Columns the sweep does not read may hold anything
        db.execute_unprepared(&format!(
            "UPDATE pollination_records SET pollination_type = 'bogus' WHERE id = {}",
            odd_type.id
        ))
        .await?;
        db.execute_unprepared(&format!(
            "UPDATE pollination_records SET estimated_maturation_date = 'garbage' WHERE id = {}",
            broken.id
        ))
        .await?;

        let generator = AlertGenerator::new(db.clone(), 7);
        let report = generator.run_sweep(days_later(created, 7)).await?;
        assert_eq!(report.records_evaluated, 3);
        assert_eq!(report.alerts_created, 2);
        assert_eq!(report.records_failed, 1);
        assert!(!report.cancelled);
        assert!(
            alerts_for_subject(&db, SubjectType::Pollination, broken.id)
                .await?
                .is_empty()
        );
        assert_eq!(last_sweep_at(&db).await?, Some(days_later(created, 7)));
        Ok(())
    }

    #[tokio::test]
    async fn test_cancel_stops_sweep_early() -> Result<()> {
        let db = setup_test_db().await?;
        for _ in 0..3 {
            create_test_pollination(&db, test_now()).await?;
        }
        let generator = AlertGenerator::new(db.clone(), 7);
        let sweep_at = days_later(test_now(), 7);

        generator.cancel();
        let report = generator.run_sweep(sweep_at).await?;
        assert!(report.cancelled);
        assert!(report.records_evaluated < 3);
        assert_eq!(report.alerts_created, 0);
        assert!(last_sweep_at(&db).await?.is_none());

        // The request ended with the cancelled sweep
        let report = generator.run_sweep(sweep_at).await?;
        assert!(!report.cancelled);
        assert_eq!(report.records_evaluated, 3);
        assert_eq!(report.alerts_created, 3);
        assert_eq!(last_sweep_at(&db).await?, Some(sweep_at));
        Ok(())
    }

    #[tokio::test]
    async fn test_sweep_records_last_run() -> Result<()> {
        let db = setup_test_db().await?;
        assert!(last_sweep_at(&db).await?.is_none());

        let generator = AlertGenerator::new(db.clone(), 7);
        generator.run_sweep(test_now()).await?;
        let later = days_later(test_now(), 1);
        generator.run_sweep(later).await?;

        assert_eq!(last_sweep_at(&db).await?, Some(later));
        let rows = SystemState::find()
            .filter(system_state::Column::Key.eq(LAST_ALERT_SWEEP_KEY))
            .count(&db)
            .await?;
        assert_eq!(rows, 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_missing_alert_table_is_storage_outage() -> Result<()> {
        let db = setup_test_db().await?;
        create_test_pollination(&db, test_now()).await?;
        db.execute_unprepared("DROP TABLE alerts").await?;
        let generator = AlertGenerator::new(db.clone(), 7);

        let result = generator.run_sweep(days_later(test_now(), 7)).await;
        assert!(matches!(result, Err(Error::StorageUnavailable { .. })));
        Ok(())
    }

    #[test]
    fn test_format_sweep_summary() {
        let mut report = SweepReport::new(test_now());
        report.records_evaluated = 4;
        report.alerts_created = 2;
        report.alerts_already_present = 1;
        assert_eq!(
            format_sweep_summary(&report),
            "Alert sweep 2024-06-01 09:00 UTC - 4 records, 2 alerts created, 1 already present"
        );

        report.records_failed = 1;
        report.cancelled = true;
        assert!(format_sweep_summary(&report).ends_with(", 1 records failed (cancelled)"));
    }
}
