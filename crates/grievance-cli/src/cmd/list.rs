//! `grv list`: filtered, paginated view of the complaint collection.

use std::io::{self, Write};

use anyhow::Result;
use chrono::Local;
use clap::Args;
use grievance_core::Tracker;
use grievance_core::model::Complaint;
use grievance_core::store::FetchSource;
use grievance_core::util::{DEFAULT_TRUNCATE, format_currency, format_date, truncate};
use serde::Serialize;

use super::AppContext;
use super::filters::FilterArgs;
use crate::output::{OutputMode, Renderable, pretty_rule, render_list};

#[derive(Args, Debug)]
pub struct ListArgs {
    #[command(flatten)]
    pub filters: FilterArgs,

    /// Page to show, starting at 1.
    #[arg(long, default_value_t = 1)]
    pub page: usize,

    /// Rows per page; defaults to `[ui] items_per_page`.
    #[arg(long)]
    pub limit: Option<usize>,

    /// Show every matching row on one page.
    #[arg(long)]
    pub all: bool,
}

/// One row of list output.
pub struct ComplaintRow<'a> {
    pub record: &'a Complaint,
    pub editable: bool,
}

impl Renderable for ComplaintRow<'_> {
    fn render_human(&self, w: &mut dyn Write) -> io::Result<()> {
        let r = self.record;
        let lock = if self.editable { " " } else { "*" };
        writeln!(
            w,
            "{lock}{:<28} {:<12} {:<10} {:<7} {:<8} {}",
            r.id,
            format_date(Some(&r.created_at.with_timezone(&Local))),
            r.category,
            r.priority,
            r.status,
            truncate(&r.description, DEFAULT_TRUNCATE)
        )?;
        writeln!(
            w,
            "  {:<28} reporter: {}  pic: {}  cost: {}",
            "",
            r.reporter,
            if r.assignee.is_empty() { "-" } else { r.assignee.as_str() },
            format_currency(r.cost)
        )
    }

    fn render_json(&self, w: &mut dyn Write) -> io::Result<()> {
        serde_json::to_writer(&mut *w, self.record)?;
        writeln!(w)
    }

    fn render_table(&self, w: &mut dyn Write) -> io::Result<()> {
        let r = self.record;
        writeln!(
            w,
            "{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}",
            r.id,
            r.created_at.with_timezone(&Local).format("%Y-%m-%d"),
            r.reporter,
            r.category,
            r.priority,
            r.status,
            r.cost,
            r.description
        )
    }

    fn table_headers() -> &'static [&'static str] {
        &[
            "ID",
            "DATE",
            "REPORTER",
            "CATEGORY",
            "PRIORITY",
            "STATUS",
            "COST",
            "DESCRIPTION",
        ]
    }
}

/// Slice bounds and page count for `total` rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Page {
    pub page: usize,
    pub pages: usize,
    pub start: usize,
    pub end: usize,
}

impl Page {
    /// Clamp `page` into range; an empty list has one empty page.
    pub fn of(total: usize, page: usize, per_page: usize) -> Self {
        let per_page = per_page.max(1);
        let pages = total.div_ceil(per_page).max(1);
        let page = page.clamp(1, pages);
        let start = ((page - 1) * per_page).min(total);
        let end = (start + per_page).min(total);
        Self {
            page,
            pages,
            start,
            end,
        }
    }
}

#[derive(Serialize)]
struct ListEnvelope<'a> {
    source: FetchSource,
    total: usize,
    matching: usize,
    page: Page,
    items: &'a [Complaint],
}

pub fn run_list(args: &ListArgs, ctx: &AppContext) -> Result<()> {
    let mut tracker = ctx.loaded_tracker()?;
    tracker.set_criteria(args.filters.criteria());

    let per_page = if args.all {
        tracker.view().len()
    } else {
        args.limit.unwrap_or(ctx.config.ui.items_per_page)
    };
    let page = Page::of(tracker.view().len(), args.page, per_page);

    let stdout = io::stdout();
    let mut out = stdout.lock();
    write_list(&tracker, page, ctx.output, &mut out)?;
    Ok(())
}

fn write_list(tracker: &Tracker, page: Page, mode: OutputMode, w: &mut dyn Write) -> Result<()> {
    let slice = &tracker.view()[page.start..page.end];

    if mode.is_json() {
        let envelope = ListEnvelope {
            source: tracker.source().unwrap_or(FetchSource::Cache),
            total: tracker.records().len(),
            matching: tracker.view().len(),
            page,
            items: slice,
        };
        serde_json::to_writer_pretty(&mut *w, &envelope)?;
        writeln!(w)?;
        return Ok(());
    }

    let rows: Vec<ComplaintRow<'_>> = slice
        .iter()
        .map(|record| ComplaintRow {
            record,
            editable: tracker.auth().can_modify(record),
        })
        .collect();

    if mode == OutputMode::Pretty {
        if rows.is_empty() {
            writeln!(w, "No complaints match.")?;
            return Ok(());
        }
        pretty_rule(w)?;
        render_list(&rows, mode, w)?;
        pretty_rule(w)?;
        writeln!(
            w,
            "Page {} of {} ({} of {} complaints){}",
            page.page,
            page.pages,
            tracker.view().len(),
            tracker.records().len(),
            if tracker.source() == Some(FetchSource::Cache) {
                "  [offline data]"
            } else {
                ""
            }
        )?;
        if rows.iter().any(|r| !r.editable) {
            writeln!(w, "* read-only for the current user")?;
        }
    } else {
        render_list(&rows, mode, w)?;
    }
    Ok(())
}
