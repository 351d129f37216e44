//! Alert due-ness rules.
//!
//! Given a record's timeline and the current day, decides which alerts are due
//! and under which dedup key. Pure: no storage, no clock. Whether an alert was
//! already emitted is the generator's business; this module answers "is it due",
//! and a due alert stays due for as long as its window is open, which is what
//! lets a late sweep catch up on missed ticks.
//!
//! Windows, for creation day `C` and estimated date `D`, with the offsets taken
//! from [`AlertKind::cadence`]:
//! - Weekly: `today >= C + 7`, one-shot, fires even after confirmation
//! - Preventive: `D - 7 <= today < D`, one-shot, only while unconfirmed
//! - Frequent: `D - 7 <= today <= D`, once per calendar day, only while unconfirmed

use chrono::{Days, NaiveDate};
use std::fmt;

use crate::entities::{
    AlertKind, AlertPriority, CadenceAnchor, GerminationRecordModel, PollinationRecordModel,
    Repeat, SubjectType,
};

/// The dates of one record that alert windows are measured from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AlertTimeline {
    /// Record family
    pub subject_type: SubjectType,
    /// Record id
    pub subject_id: i64,
    /// Day the record was created
    pub created_on: NaiveDate,
    /// Estimated maturation or transplant date
    pub estimated_on: NaiveDate,
    /// Maturation or transplant already confirmed
    pub confirmed: bool,
}

impl From<&PollinationRecordModel> for AlertTimeline {
    fn from(record: &PollinationRecordModel) -> Self {
        Self {
            subject_type: SubjectType::Pollination,
            subject_id: record.id,
            created_on: record.created_at.date_naive(),
            estimated_on: record.estimated_maturation_date,
            confirmed: record.maturation_confirmed,
        }
    }
}

impl From<&GerminationRecordModel> for AlertTimeline {
    fn from(record: &GerminationRecordModel) -> Self {
        Self {
            subject_type: SubjectType::Germination,
            subject_id: record.id,
            created_on: record.created_at.date_naive(),
            estimated_on: record.estimated_transplant_date,
            confirmed: record.transplant_confirmed,
        }
    }
}

impl AlertTimeline {
    /// Day the window of `kind` opens: its cadence anchor shifted by the cadence offset.
    #[must_use]
    pub fn window_opens(&self, kind: AlertKind) -> NaiveDate {
        shift_days(self.anchor(kind), kind.cadence().offset_days)
    }

    const fn anchor(&self, kind: AlertKind) -> NaiveDate {
        match kind.cadence().anchor {
            CadenceAnchor::Creation => self.created_on,
            CadenceAnchor::EstimatedDate => self.estimated_on,
        }
    }
}

/// Moves `date` by a signed number of days, saturating at the representable range.
fn shift_days(date: NaiveDate, days: i64) -> NaiveDate {
    let magnitude = Days::new(days.unsigned_abs());
    if days >= 0 {
        date.checked_add_days(magnitude).unwrap_or(NaiveDate::MAX)
    } else {
        date.checked_sub_days(magnitude).unwrap_or(NaiveDate::MIN)
    }
}

/// Period an alert instance belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Bucket {
    /// One-shot alerts: one per record
    Once,
    /// Repeating alerts: one per calendar day
    Day(NaiveDate),
}

impl fmt::Display for Bucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Once => f.write_str("once"),
            Self::Day(day) => write!(f, "{}", day.format("%Y-%m-%d")),
        }
    }
}

/// An alert instance that is due now.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DueAlert {
    /// Record family
    pub subject_type: SubjectType,
    /// Record id
    pub subject_id: i64,
    /// Weekly, Preventive or Frequent
    pub kind: AlertKind,
    /// Period the instance belongs to
    pub bucket: Bucket,
    /// Date the window is measured from
    pub anchor_date: NaiveDate,
    /// Day this instance became due
    pub scheduled_for: NaiveDate,
    /// Days from `today` to the estimated date (negative once it has passed)
    pub days_remaining: i64,
}

impl DueAlert {
    /// `subject:id:kind:bucket`, unique across all alerts ever emitted.
    #[must_use]
    pub fn dedup_key(&self) -> String {
        format!(
            "{}:{}:{}:{}",
            self.subject_type.code(),
            self.subject_id,
            self.kind.code(),
            self.bucket
        )
    }

    /// Display priority; the reminder on the estimated date itself is urgent.
    #[must_use]
    pub const fn priority(&self) -> AlertPriority {
        match self.kind {
            AlertKind::Weekly => AlertPriority::Medium,
            AlertKind::Preventive => AlertPriority::High,
            AlertKind::Frequent if self.days_remaining <= 0 => AlertPriority::Urgent,
            AlertKind::Frequent => AlertPriority::High,
        }
    }

    /// Short title shown in the notification list.
    #[must_use]
    pub fn title(&self) -> String {
        let milestone = match self.subject_type {
            SubjectType::Pollination => "maturation",
            SubjectType::Germination => "transplant",
        };
        let subject = format!("{} #{}", self.subject_type, self.subject_id);
        match self.kind {
            AlertKind::Weekly => format!("{} - {subject}", self.kind),
            AlertKind::Preventive => format!(
                "{} - {subject}: {milestone} in {} days",
                self.kind, self.days_remaining
            ),
            AlertKind::Frequent if self.days_remaining <= 0 => {
                format!("{} - {subject}: {milestone} is due today", self.kind)
            }
            AlertKind::Frequent => format!(
                "{} - {subject}: {} days to {milestone}",
                self.kind, self.days_remaining
            ),
        }
    }
}

/// Returns every alert instance due for `timeline` on `today`, ordered by kind.
#[must_use]
pub fn due_alerts(timeline: &AlertTimeline, today: NaiveDate) -> Vec<DueAlert> {
    let days_remaining = (timeline.estimated_on - today).num_days();
    let make = |kind: AlertKind, scheduled_for: NaiveDate| {
        let bucket = match kind.cadence().repeat {
            Repeat::OneShot => Bucket::Once,
            Repeat::Daily => Bucket::Day(today),
        };
        DueAlert {
            subject_type: timeline.subject_type,
            subject_id: timeline.subject_id,
            kind,
            bucket,
            anchor_date: timeline.anchor(kind),
            scheduled_for,
            days_remaining,
        }
    };

    let mut due = Vec::new();

    let weekly_due_on = timeline.window_opens(AlertKind::Weekly);
    if today >= weekly_due_on {
        due.push(make(AlertKind::Weekly, weekly_due_on));
    }

    if timeline.confirmed {
        return due;
    }

    let preventive_opens = timeline.window_opens(AlertKind::Preventive);
    if today >= preventive_opens && today < timeline.estimated_on {
        due.push(make(AlertKind::Preventive, preventive_opens));
    }
    if today >= timeline.window_opens(AlertKind::Frequent) && today <= timeline.estimated_on {
        due.push(make(AlertKind::Frequent, today));
    }

    due
}
