//! `grv show`: full details of one complaint.

use std::io::{self, Write};

use anyhow::Result;
use chrono::Local;
use clap::Args;
use grievance_core::GrievanceError;
use grievance_core::model::Complaint;
use grievance_core::util::{PLACEHOLDER, format_currency, format_date};
use serde::Serialize;

use super::AppContext;
use crate::output::{fail, pretty_kv, pretty_section, render_mode};

#[derive(Args, Debug)]
pub struct ShowArgs {
    /// Complaint ID, e.g. BKM-1736900000000-k3j9x2m1q.
    pub id: String,
}

#[derive(Serialize)]
pub struct ShowItem<'a> {
    #[serde(flatten)]
    pub record: &'a Complaint,
    pub can_modify: bool,
}

fn or_placeholder(text: &str) -> &str {
    if text.is_empty() { PLACEHOLDER } else { text }
}

pub fn write_detail(w: &mut dyn Write, record: &Complaint) -> io::Result<()> {
    pretty_section(w, &format!("{}  [{}]", record.id, record.status))?;
    pretty_kv(w, "Date", format_date(Some(&record.created_at.with_timezone(&Local))))?;
    pretty_kv(w, "Reporter", &record.reporter)?;
    pretty_kv(w, "Category", record.category.as_str())?;
    pretty_kv(w, "Priority", record.priority.as_str())?;
    pretty_kv(w, "Description", &record.description)?;
    pretty_kv(w, "Resolution", or_placeholder(&record.resolution))?;
    pretty_kv(w, "PIC", or_placeholder(&record.assignee))?;
    pretty_kv(w, "Cost", format_currency(record.cost))?;
    pretty_kv(
        w,
        "Completed",
        format_date(record.completed_at.map(|d| d.with_timezone(&Local)).as_ref()),
    )?;
    pretty_kv(w, "Created by", record.created_by.as_deref().unwrap_or(PLACEHOLDER))
}

pub fn write_row(w: &mut dyn Write, record: &Complaint) -> io::Result<()> {
    writeln!(
        w,
        "{}\t{}\t{}\t{}\t{}\t{}",
        record.id, record.status, record.priority, record.category, record.reporter,
        record.description
    )
}

pub fn run_show(args: &ShowArgs, ctx: &AppContext) -> Result<()> {
    let tracker = ctx.loaded_tracker()?;
    let Some(record) = tracker.find(&args.id) else {
        return Err(fail(ctx.output, GrievanceError::NotFound(args.id.clone())));
    };
    let item = ShowItem {
        record,
        can_modify: tracker.auth().can_modify(record),
    };

    render_mode(
        ctx.output,
        &item,
        |item, w| write_row(w, item.record),
        |item, w| {
            write_detail(w, item.record)?;
            if !item.can_modify {
                writeln!(w, "(read-only for the current user)")?;
            }
            Ok(())
        },
    )
}
