//! Search and filter predicates over the complaint collection.
//!
//! All criteria combine with logical AND. Filtering never mutates its input;
//! callers keep the full collection and derive views from it.

use chrono::{DateTime, Datelike, Days, NaiveDate, TimeZone, Utc, Weekday};
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

use crate::model::{Complaint, Priority, Status};

/// Date-range bucket relative to "now" in the caller's time zone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Period {
    #[default]
    All,
    Today,
    Week,
    Month,
}

impl Period {
    const fn as_str(self) -> &'static str {
        match self {
            Self::All => "all",
            Self::Today => "today",
            Self::Week => "week",
            Self::Month => "month",
        }
    }

    /// Lenient parse: anything unrecognized means "no date restriction".
    #[must_use]
    pub fn parse_lenient(raw: &str) -> Self {
        raw.parse().unwrap_or(Self::All)
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Period {
    type Err = crate::model::ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "all" => Ok(Self::All),
            "today" => Ok(Self::Today),
            "week" | "this-week" => Ok(Self::Week),
            "month" | "this-month" => Ok(Self::Month),
            _ => Err(crate::model::ParseEnumError {
                expected: "period",
                got: s.to_string(),
            }),
        }
    }
}

/// The four independent filter dimensions.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterCriteria {
    #[serde(default)]
    pub search: String,
    #[serde(default)]
    pub status: Option<Status>,
    #[serde(default)]
    pub priority: Option<Priority>,
    #[serde(default)]
    pub period: Period,
}

impl FilterCriteria {
    /// True when no criterion restricts the view.
    #[must_use]
    pub fn is_unrestricted(&self) -> bool {
        self.search.is_empty()
            && self.status.is_none()
            && self.priority.is_none()
            && self.period == Period::All
    }
}

/// Case-insensitive substring match over reporter, description, category,
/// assignee and id. Empty fields never match; an empty term matches all.
#[must_use]
pub fn matches_search(record: &Complaint, term: &str) -> bool {
    if term.is_empty() {
        return true;
    }
    let needle = term.to_lowercase();
    [
        record.reporter.as_str(),
        record.description.as_str(),
        record.category.as_str(),
        record.assignee.as_str(),
        record.id.as_str(),
    ]
    .into_iter()
    .filter(|field| !field.is_empty())
    .any(|field| field.to_lowercase().contains(&needle))
}

/// First day of the week containing `today`.
fn week_start_of(today: NaiveDate, first_weekday: Weekday) -> NaiveDate {
    let offset = (7 + today.weekday().num_days_from_monday()
        - first_weekday.num_days_from_monday())
        % 7;
    today - Days::new(u64::from(offset))
}

/// Whether `at` falls in `period`, with day boundaries at local midnight in
/// `now`'s time zone.
#[must_use]
pub fn in_period<Tz: TimeZone>(
    at: &DateTime<Utc>,
    period: Period,
    now: &DateTime<Tz>,
    first_weekday: Weekday,
) -> bool {
    let local = at.with_timezone(&now.timezone()).date_naive();
    let today = now.date_naive();
    match period {
        Period::All => true,
        Period::Today => local == today,
        Period::Week => {
            let start = week_start_of(today, first_weekday);
            let end = start + Days::new(6);
            local >= start && local <= end
        }
        Period::Month => local.year() == today.year() && local.month() == today.month(),
    }
}

/// Whether `record` satisfies every active criterion.
#[must_use]
pub fn matches<Tz: TimeZone>(
    record: &Complaint,
    criteria: &FilterCriteria,
    now: &DateTime<Tz>,
    first_weekday: Weekday,
) -> bool {
    matches_search(record, &criteria.search)
        && criteria.status.is_none_or(|s| record.status == s)
        && criteria.priority.is_none_or(|p| record.priority == p)
        && in_period(&record.created_at, criteria.period, now, first_weekday)
}

/// Derive the filtered view, preserving input order.
#[must_use]
pub fn apply<Tz: TimeZone>(
    records: &[Complaint],
    criteria: &FilterCriteria,
    now: &DateTime<Tz>,
    first_weekday: Weekday,
) -> Vec<Complaint> {
    records
        .iter()
        .filter(|record| matches(record, criteria, now, first_weekday))
        .cloned()
        .collect()
}

/// Newest first; ties keep their relative order.
pub fn sort_newest_first(records: &mut [Complaint]) {
    records.sort_by(|a, b| b.created_at.cmp(&a.created_at));
}
