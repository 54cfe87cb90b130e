//! `grv sync`: re-fetch from the sheet and refresh the local cache.

use anyhow::Result;
use chrono::{DateTime, Utc};
use grievance_core::store::FetchSource;
use serde::Serialize;
use std::io::Write;

use super::AppContext;
use crate::output::render;

#[derive(Serialize)]
struct SyncResult {
    source: FetchSource,
    count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    last_sync: Option<DateTime<Utc>>,
}

pub fn run_sync(ctx: &AppContext) -> Result<()> {
    let mut tracker = ctx.tracker()?;
    let source = tracker.refresh();
    let result = SyncResult {
        source,
        count: tracker.records().len(),
        last_sync: tracker.storage().last_sync(),
    };

    render(ctx.output, &result, |r, w| match r.source {
        FetchSource::Remote => writeln!(w, "✓ synced {} complaints from the sheet", r.count),
        FetchSource::Cache => {
            writeln!(
                w,
                "sheet unavailable; using {} complaints from the local cache",
                r.count
            )?;
            if let Some(at) = r.last_sync {
                writeln!(w, "last successful sync: {}", at.format("%Y-%m-%d %H:%M UTC"))?;
            }
            Ok(())
        }
    })
}
