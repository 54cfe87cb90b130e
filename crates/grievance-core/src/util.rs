//! Stateless helpers: formatting, ID generation, form validation.

use chrono::{DateTime, Datelike, TimeZone, Utc};
use rand::Rng;

use crate::error::GrievanceError;
use crate::model::{ComplaintPatch, NewComplaint};

const MONTHS_SHORT: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "Mei", "Jun", "Jul", "Agu", "Sep", "Okt", "Nov", "Des",
];

const MONTHS_LONG: [&str; 12] = [
    "Januari",
    "Februari",
    "Maret",
    "April",
    "Mei",
    "Juni",
    "Juli",
    "Agustus",
    "September",
    "Oktober",
    "November",
    "Desember",
];

const ID_PREFIX: &str = "BKM";
const ID_SUFFIX_LEN: usize = 9;
const BASE36: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// Placeholder shown for absent values in tables and exports.
pub const PLACEHOLDER: &str = "-";

/// Default width for truncated descriptions.
pub const DEFAULT_TRUNCATE: usize = 50;

fn month_index<T: Datelike>(date: &T) -> usize {
    date.month0() as usize
}

/// `3 Jan 2025`, or `-` when absent.
#[must_use]
pub fn format_date<Tz: TimeZone>(date: Option<&DateTime<Tz>>) -> String {
    date.map_or_else(
        || PLACEHOLDER.to_string(),
        |d| format!("{} {} {}", d.day(), MONTHS_SHORT[month_index(d)], d.year()),
    )
}

/// `03/01/25`, or `-` when absent.
#[must_use]
pub fn format_date_short<Tz: TimeZone>(date: Option<&DateTime<Tz>>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    date.map_or_else(|| PLACEHOLDER.to_string(), |d| d.format("%d/%m/%y").to_string())
}

/// Reporting period label, e.g. `Januari 2025`.
#[must_use]
pub fn month_label<Tz: TimeZone>(now: &DateTime<Tz>) -> String {
    format!("{} {}", MONTHS_LONG[month_index(now)], now.year())
}

/// `Rp 1.500.000` with `.` as the thousands separator.
#[must_use]
pub fn format_currency(amount: u64) -> String {
    let digits = amount.to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(ch);
    }
    format!("Rp {grouped}")
}

/// Cut `text` to `max_chars` characters, appending `...` when shortened.
#[must_use]
pub fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let mut cut: String = text.chars().take(max_chars).collect();
    cut.push_str("...");
    cut
}

/// Rounded share of `part` in `total`, 0 when `total` is 0.
#[must_use]
#[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn percentage(part: usize, total: usize) -> u32 {
    if total == 0 {
        return 0;
    }
    ((part as f64 / total as f64) * 100.0).round() as u32
}

/// Generate a complaint ID: `BKM-<unix millis>-<9 base36 chars>`.
#[must_use]
pub fn generate_id(now: DateTime<Utc>) -> String {
    let mut rng = rand::thread_rng();
    let suffix: String = (0..ID_SUFFIX_LEN)
        .map(|_| char::from(BASE36[rng.gen_range(0..BASE36.len())]))
        .collect();
    format!("{ID_PREFIX}-{}-{suffix}", now.timestamp_millis())
}

/// Check the required fields of a submission.
///
/// Every missing field is reported, in form order.
pub fn validate_submission(form: &NewComplaint) -> Result<(), GrievanceError> {
    let mut errors = Vec::new();
    if form.reporter.trim().is_empty() {
        errors.push("reporter name is required".to_string());
    }
    if form.category.is_none() {
        errors.push("category must be selected".to_string());
    }
    if form.priority.is_none() {
        errors.push("priority must be selected".to_string());
    }
    if form.description.trim().is_empty() {
        errors.push("complaint description is required".to_string());
    }
    if errors.is_empty() {
        Ok(())
    } else {
        Err(GrievanceError::Validation(errors))
    }
}

/// Reject patches that would blank a required text field.
pub fn validate_patch(patch: &ComplaintPatch) -> Result<(), GrievanceError> {
    let mut errors = Vec::new();
    if patch.reporter.as_deref().is_some_and(|v| v.trim().is_empty()) {
        errors.push("reporter name is required".to_string());
    }
    if patch
        .description
        .as_deref()
        .is_some_and(|v| v.trim().is_empty())
    {
        errors.push("complaint description is required".to_string());
    }
    if errors.is_empty() {
        Ok(())
    } else {
        Err(GrievanceError::Validation(errors))
    }
}
