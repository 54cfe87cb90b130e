//! `grv bulk-status` and `grv bulk-delete`: act on a selection of complaints.
//!
//! The selection is either the ids given on the command line or, with
//! `--all-matching`, every complaint passing the filter flags.

use anyhow::Result;
use chrono::{DateTime, Utc};
use clap::Args;
use grievance_core::Tracker;
use grievance_core::model::Status;
use serde::Serialize;
use std::io::Write;

use super::AppContext;
use super::add::sync_note;
use super::edit::parse_date;
use super::filters::FilterArgs;
use crate::output::{fail, render};

#[derive(Args, Debug)]
pub struct SelectionArgs {
    /// Complaint IDs to act on.
    pub ids: Vec<String>,

    /// Select every complaint matching the filter flags instead of listing ids.
    #[arg(long, conflicts_with = "ids")]
    pub all_matching: bool,

    #[command(flatten)]
    pub filters: FilterArgs,
}

#[derive(Args, Debug)]
pub struct BulkStatusArgs {
    /// New status: ditunda, proses or selesai.
    #[arg(value_name = "STATUS")]
    pub new_status: Status,

    /// Also record a completion date on every record.
    #[arg(long, value_parser = parse_date)]
    pub completed: Option<DateTime<Utc>>,

    #[command(flatten)]
    pub selection: SelectionArgs,
}

#[derive(Args, Debug)]
pub struct BulkDeleteArgs {
    #[command(flatten)]
    pub selection: SelectionArgs,
}

#[derive(Serialize)]
struct BulkResult {
    action: &'static str,
    processed: usize,
    mirrored: bool,
}

/// Fill the tracker's selection and return it.
fn select(tracker: &mut Tracker, args: &SelectionArgs) -> Result<Vec<String>> {
    tracker.clear_selection();
    if args.all_matching {
        tracker.set_criteria(args.filters.criteria());
        tracker.toggle_select_all(true);
        let selected = tracker.selected().to_vec();
        if selected.is_empty() {
            anyhow::bail!("no complaints match the filters");
        }
        return Ok(selected);
    }
    if args.ids.is_empty() {
        anyhow::bail!("no complaints selected; pass ids or --all-matching");
    }
    Ok(args.ids.clone())
}

pub fn run_bulk_status(args: &BulkStatusArgs, ctx: &AppContext) -> Result<()> {
    let mut tracker = ctx.loaded_tracker()?;
    let ids = select(&mut tracker, &args.selection)?;
    let outcome = tracker
        .bulk_update_status(&ids, args.new_status, args.completed.map(Some))
        .map_err(|err| fail(ctx.output, err))?;

    let status = args.new_status;
    render(
        ctx.output,
        &BulkResult {
            action: "status",
            processed: outcome.processed,
            mirrored: outcome.mirrored,
        },
        |r, w| {
            writeln!(
                w,
                "✓ {} complaints set to {status}: {}",
                r.processed,
                sync_note(r.mirrored)
            )
        },
    )
}

pub fn run_bulk_delete(args: &BulkDeleteArgs, ctx: &AppContext) -> Result<()> {
    let mut tracker = ctx.loaded_tracker()?;
    let ids = select(&mut tracker, &args.selection)?;
    let outcome = tracker
        .bulk_delete(&ids)
        .map_err(|err| fail(ctx.output, err))?;

    render(
        ctx.output,
        &BulkResult {
            action: "delete",
            processed: outcome.processed,
            mirrored: outcome.mirrored,
        },
        |r, w| {
            writeln!(
                w,
                "✓ {} complaints deleted: {}",
                r.processed,
                sync_note(r.mirrored)
            )
        },
    )
}
