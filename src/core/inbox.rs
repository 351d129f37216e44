//! Alert inbox - Read and dismiss operations for the notification side.
//!
//! The sweep only ever inserts alerts; every status change happens here.

use crate::{
    entities::{Alert, AlertStatus, SubjectType, alert},
    errors::{Error, Result},
};
use chrono::{DateTime, TimeDelta, Utc};
use sea_orm::{QueryOrder, Set, Value, prelude::*, sea_query::Expr};
use tracing::info;

/// Pending alerts, newest first.
pub async fn list_pending_alerts(db: &DatabaseConnection) -> Result<Vec<alert::Model>> {
    Alert::find()
        .filter(alert::Column::Status.eq(AlertStatus::Pending))
        .order_by_desc(alert::Column::GeneratedOn)
        .order_by_desc(alert::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Every alert ever emitted for one record, oldest first.
pub async fn alerts_for_subject(
    db: &DatabaseConnection,
    subject_type: SubjectType,
    subject_id: i64,
) -> Result<Vec<alert::Model>> {
    Alert::find()
        .filter(alert::Column::SubjectType.eq(subject_type))
        .filter(alert::Column::SubjectId.eq(subject_id))
        .order_by_asc(alert::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

async fn set_status(
    db: &DatabaseConnection,
    alert_id: i64,
    status: AlertStatus,
    now: DateTime<Utc>,
) -> Result<alert::Model> {
    let existing = Alert::find_by_id(alert_id)
        .one(db)
        .await?
        .ok_or(Error::RecordNotFound {
            entity: "alert",
            id: alert_id,
        })?;

    let mut active: alert::ActiveModel = existing.into();
    active.status = Set(status);
    active.status_changed_at = Set(Some(now));
    Ok(active.update(db).await?)
}

/// Marks an alert as read.
pub async fn mark_alert_read(
    db: &DatabaseConnection,
    alert_id: i64,
    now: DateTime<Utc>,
) -> Result<alert::Model> {
    set_status(db, alert_id, AlertStatus::Read, now).await
}

/// Dismisses an alert. Dismissed alerts stay stored and keep their dedup key.
pub async fn mark_alert_dismissed(
    db: &DatabaseConnection,
    alert_id: i64,
    now: DateTime<Utc>,
) -> Result<alert::Model> {
    set_status(db, alert_id, AlertStatus::Dismissed, now).await
}

/// Dismisses pending alerts generated more than `older_than_days` days before `now`.
///
/// Returns how many alerts were dismissed.
pub async fn dismiss_stale_alerts(
    db: &DatabaseConnection,
    older_than_days: i64,
    now: DateTime<Utc>,
) -> Result<u64> {
    let cutoff = TimeDelta::try_days(older_than_days.max(0))
        .and_then(|age| now.checked_sub_signed(age))
        .map_or(chrono::NaiveDate::MIN, |cutoff| cutoff.date_naive());

    let result = Alert::update_many()
        .col_expr(
            alert::Column::Status,
            Expr::value(Into::<Value>::into(AlertStatus::Dismissed)),
        )
        .col_expr(alert::Column::StatusChangedAt, Expr::value(Some(now)))
        .filter(alert::Column::Status.eq(AlertStatus::Pending))
        .filter(alert::Column::GeneratedOn.lt(cutoff))
        .exec(db)
        .await?;

    if result.rows_affected > 0 {
        info!(
            "Dismissed {} pending alerts generated before {}",
            result.rows_affected, cutoff
        );
    }
    Ok(result.rows_affected)
}
