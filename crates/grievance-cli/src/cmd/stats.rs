//! `grv stats`: monthly-report style summary of the whole collection.

use anyhow::Result;
use chrono::{DateTime, Local, Utc};
use grievance_core::report::Stats;
use grievance_core::store::FetchSource;
use grievance_core::util::{format_currency, month_label};
use serde::Serialize;
use std::io::Write;

use super::AppContext;
use crate::output::{pretty_kv, pretty_section, render_mode};

#[derive(Serialize)]
struct StatsReport {
    period: String,
    source: FetchSource,
    #[serde(skip_serializing_if = "Option::is_none")]
    last_sync: Option<DateTime<Utc>>,
    #[serde(flatten)]
    stats: Stats,
}

pub fn run_stats(ctx: &AppContext) -> Result<()> {
    let mut tracker = ctx.tracker()?;
    let source = tracker.load();
    let report = StatsReport {
        period: month_label(&Local::now()),
        source,
        last_sync: tracker.storage().last_sync(),
        stats: tracker.stats(),
    };

    render_mode(
        ctx.output,
        &report,
        |r, w| {
            let s = &r.stats;
            writeln!(
                w,
                "total={} done={} in_progress={} pending={} high={} cost={} completion={}%",
                s.total, s.done, s.in_progress, s.pending, s.high_priority, s.total_cost,
                s.completion_rate
            )
        },
        |r, w| {
            let s = &r.stats;
            pretty_section(w, &format!("Report for {}", r.period))?;
            pretty_kv(w, "Total", s.total.to_string())?;
            pretty_kv(w, "Done", format!("{} ({}%)", s.done, s.completion_rate))?;
            pretty_kv(w, "In progress", s.in_progress.to_string())?;
            pretty_kv(w, "Pending", s.pending.to_string())?;
            pretty_kv(w, "High priority", s.high_priority.to_string())?;
            pretty_kv(w, "Total cost", format_currency(s.total_cost))?;
            writeln!(w)?;
            pretty_section(w, "By category")?;
            for entry in s.by_category.iter().filter(|c| c.count > 0) {
                pretty_kv(w, entry.category.as_str(), entry.count.to_string())?;
            }
            if r.source == FetchSource::Cache {
                writeln!(w)?;
                writeln!(w, "[offline data]")?;
            }
            Ok(())
        },
    )
}
