//! `grv add`: submit a new complaint.

use anyhow::Result;
use clap::Args;
use grievance_core::model::{Category, Complaint, NewComplaint, Priority};
use grievance_core::store::SaveOutcome;
use serde::Serialize;
use std::io::Write;

use super::AppContext;
use super::show::{write_detail, write_row};
use crate::output::{fail, render_mode};

#[derive(Args, Debug)]
pub struct AddArgs {
    /// Name of the person reporting.
    #[arg(long, short = 'r')]
    pub reporter: Option<String>,

    /// Layanan, Sarana, Prasarana, Elektronik, Kebersihan, Estetika, Keamanan or Lainnya.
    #[arg(long, short = 'c')]
    pub category: Option<Category>,

    /// Low, Medium or High.
    #[arg(long, short = 'p')]
    pub priority: Option<Priority>,

    /// What is wrong.
    #[arg(long, short = 'd')]
    pub description: Option<String>,

    /// Proposed or applied resolution.
    #[arg(long)]
    pub resolution: Option<String>,

    /// Person in charge.
    #[arg(long)]
    pub assignee: Option<String>,

    /// Estimated cost in rupiah.
    #[arg(long, default_value_t = 0)]
    pub cost: u64,
}

impl AddArgs {
    pub fn form(&self) -> NewComplaint {
        NewComplaint {
            reporter: self.reporter.clone().unwrap_or_default(),
            category: self.category,
            priority: self.priority,
            description: self.description.clone().unwrap_or_default(),
            resolution: self.resolution.clone().unwrap_or_default(),
            assignee: self.assignee.clone().unwrap_or_default(),
            cost: self.cost,
        }
    }
}

#[derive(Serialize)]
pub struct WriteResult<'a> {
    pub complaint: &'a Complaint,
    pub mirrored: bool,
    pub message: &'a str,
}

impl<'a> WriteResult<'a> {
    pub fn new(complaint: &'a Complaint, outcome: &'a SaveOutcome) -> Self {
        Self {
            complaint,
            mirrored: outcome.mirrored,
            message: outcome.message.as_str(),
        }
    }
}

pub fn sync_note(mirrored: bool) -> &'static str {
    if mirrored {
        "saved and sent to the sheet"
    } else {
        "saved locally (sheet not reached)"
    }
}

pub fn run_add(args: &AddArgs, ctx: &AppContext) -> Result<()> {
    let mut tracker = ctx.loaded_tracker()?;
    let (record, outcome) = tracker
        .add_complaint(&args.form())
        .map_err(|err| fail(ctx.output, err))?;

    render_mode(
        ctx.output,
        &WriteResult::new(&record, &outcome),
        |r, w| write_row(w, r.complaint),
        |r, w| {
            writeln!(w, "✓ complaint added: {}", sync_note(r.mirrored))?;
            write_detail(w, r.complaint)
        },
    )
}
