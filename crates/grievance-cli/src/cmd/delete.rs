//! `grv delete`: remove one complaint.

use anyhow::Result;
use clap::Args;
use serde::Serialize;
use std::io::Write;

use super::AppContext;
use super::add::sync_note;
use crate::output::{fail, render};

#[derive(Args, Debug)]
pub struct DeleteArgs {
    pub id: String,
}

#[derive(Serialize)]
struct Deleted<'a> {
    deleted: &'a str,
    mirrored: bool,
}

pub fn run_delete(args: &DeleteArgs, ctx: &AppContext) -> Result<()> {
    let mut tracker = ctx.loaded_tracker()?;
    let outcome = tracker
        .delete_complaint(&args.id)
        .map_err(|err| fail(ctx.output, err))?;

    render(
        ctx.output,
        &Deleted {
            deleted: &args.id,
            mirrored: outcome.mirrored,
        },
        |d, w| writeln!(w, "✓ deleted {}: {}", d.deleted, sync_note(d.mirrored)),
    )
}
