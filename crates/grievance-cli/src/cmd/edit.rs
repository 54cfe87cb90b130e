//! `grv edit` and `grv status`: change an existing complaint.

use anyhow::Result;
use chrono::{DateTime, Utc};
use clap::Args;
use grievance_core::model::{Category, ComplaintPatch, Priority, Status, parse_timestamp};
use std::io::Write;

use super::AppContext;
use super::add::{WriteResult, sync_note};
use super::show::{write_detail, write_row};
use crate::output::{fail, render_mode};

/// Accepts `YYYY-MM-DD` or an RFC 3339 timestamp.
pub fn parse_date(raw: &str) -> Result<DateTime<Utc>, String> {
    parse_timestamp(raw).ok_or_else(|| format!("expected YYYY-MM-DD or RFC 3339, got '{raw}'"))
}

#[derive(Args, Debug)]
pub struct EditArgs {
    pub id: String,

    #[arg(long)]
    pub reporter: Option<String>,

    #[arg(long)]
    pub category: Option<Category>,

    #[arg(long)]
    pub priority: Option<Priority>,

    #[arg(long)]
    pub description: Option<String>,

    #[arg(long)]
    pub resolution: Option<String>,

    #[arg(long)]
    pub cost: Option<u64>,

    #[arg(long)]
    pub status: Option<Status>,

    /// Completion date.
    #[arg(long, value_parser = parse_date, conflicts_with = "clear_completed")]
    pub completed: Option<DateTime<Utc>>,

    /// Remove the completion date.
    #[arg(long)]
    pub clear_completed: bool,
}

impl EditArgs {
    pub fn patch(&self) -> ComplaintPatch {
        let completed_at = if self.clear_completed {
            Some(None)
        } else {
            self.completed.map(Some)
        };
        ComplaintPatch {
            reporter: self.reporter.clone(),
            category: self.category,
            priority: self.priority,
            description: self.description.clone(),
            resolution: self.resolution.clone(),
            cost: self.cost,
            status: self.status,
            completed_at,
        }
    }
}

#[derive(Args, Debug)]
pub struct StatusArgs {
    pub id: String,

    /// New status: ditunda, proses or selesai.
    pub status: Status,

    /// Also record a completion date.
    #[arg(long, value_parser = parse_date)]
    pub completed: Option<DateTime<Utc>>,
}

fn apply(ctx: &AppContext, id: &str, patch: &ComplaintPatch) -> Result<()> {
    let mut tracker = ctx.loaded_tracker()?;
    let (record, outcome) = tracker
        .update_complaint(id, patch)
        .map_err(|err| fail(ctx.output, err))?;

    render_mode(
        ctx.output,
        &WriteResult::new(&record, &outcome),
        |r, w| write_row(w, r.complaint),
        |r, w| {
            writeln!(w, "✓ complaint updated: {}", sync_note(r.mirrored))?;
            write_detail(w, r.complaint)
        },
    )
}

pub fn run_edit(args: &EditArgs, ctx: &AppContext) -> Result<()> {
    let patch = args.patch();
    if patch.is_empty() {
        anyhow::bail!("nothing to change; pass at least one field flag");
    }
    apply(ctx, &args.id, &patch)
}

pub fn run_status(args: &StatusArgs, ctx: &AppContext) -> Result<()> {
    let patch = ComplaintPatch {
        status: Some(args.status),
        completed_at: args.completed.map(Some),
        ..ComplaintPatch::default()
    };
    apply(ctx, &args.id, &patch)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn dates_parse_in_both_shapes() {
        assert_eq!(
            parse_date("2025-02-03").unwrap(),
            Utc.with_ymd_and_hms(2025, 2, 3, 0, 0, 0).unwrap()
        );
        assert!(parse_date("2025-02-03T10:00:00+07:00").is_ok());
        assert!(parse_date("yesterday").is_err());
    }
}
