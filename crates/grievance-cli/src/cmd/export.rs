//! `grv export`: CSV, JSON, text report or paginated table document.

use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::Local;
use clap::{Args, ValueEnum};
use grievance_core::report::{self, DocumentKind};
use serde::Serialize;
use std::io::Write;

use super::AppContext;
use super::filters::FilterArgs;
use crate::output::render;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ExportKind {
    /// Spreadsheet-friendly CSV of the filtered view.
    Csv,
    /// Pretty-printed JSON array of the filtered view.
    Json,
    /// Plain-text monthly report.
    Txt,
    /// Paginated table document with a summary header.
    Table,
}

impl ExportKind {
    const fn extension(self) -> &'static str {
        match self {
            Self::Csv => "csv",
            Self::Json => "json",
            Self::Txt | Self::Table => "txt",
        }
    }
}

#[derive(Args, Debug)]
pub struct ExportArgs {
    /// csv, json, txt or table.
    pub kind: ExportKind,

    #[command(flatten)]
    pub filters: FilterArgs,

    /// Write to this file instead of stdout.
    #[arg(long, short = 'o', conflicts_with = "save")]
    pub output: Option<PathBuf>,

    /// Write to `Laporan_Keluhan_<Month>_<Year>.<ext>` in the current directory.
    #[arg(long)]
    pub save: bool,

    /// Rows per table page; defaults to `[ui] items_per_page`.
    #[arg(long)]
    pub rows: Option<usize>,
}

#[derive(Serialize)]
struct ExportResult {
    path: PathBuf,
    kind: &'static str,
    records: usize,
    bytes: usize,
}

pub fn run_export(args: &ExportArgs, ctx: &AppContext) -> Result<()> {
    let mut tracker = ctx.loaded_tracker()?;
    tracker.set_criteria(args.filters.criteria());
    let now = Local::now();
    let organization = &ctx.config.organization.name;

    let (kind, body) = match args.kind {
        ExportKind::Csv => ("csv", report::to_csv(tracker.view(), &Local)),
        ExportKind::Json => ("json", report::to_json(tracker.view())?),
        ExportKind::Txt => ("txt", report::to_report(tracker.view(), organization, &now)),
        ExportKind::Table => {
            let rows = args.rows.unwrap_or(ctx.config.ui.items_per_page);
            match report::export_document(tracker.records(), tracker.view(), organization, &now, rows)
            {
                (DocumentKind::Table, body) => ("table", body),
                (DocumentKind::TextFallback, body) => ("txt", body),
            }
        }
    };

    let path = if args.save {
        Some(PathBuf::from(format!(
            "{}.{}",
            report::export_file_stem(&now),
            args.kind.extension()
        )))
    } else {
        args.output.clone()
    };

    let Some(path) = path else {
        let stdout = std::io::stdout();
        let mut out = stdout.lock();
        out.write_all(body.as_bytes())?;
        if !body.ends_with('\n') {
            writeln!(out)?;
        }
        return Ok(());
    };

    std::fs::write(&path, &body)
        .with_context(|| format!("Failed to write {}", path.display()))?;
    tracing::info!(path = %path.display(), kind, records = tracker.view().len(), "export written");

    render(
        ctx.output,
        &ExportResult {
            path,
            kind,
            records: tracker.view().len(),
            bytes: body.len(),
        },
        |r, w| {
            writeln!(
                w,
                "✓ exported {} complaints ({}) to {}",
                r.records,
                r.kind,
                r.path.display()
            )
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_and_text_share_the_txt_extension() {
        assert_eq!(ExportKind::Csv.extension(), "csv");
        assert_eq!(ExportKind::Json.extension(), "json");
        assert_eq!(ExportKind::Txt.extension(), "txt");
        assert_eq!(ExportKind::Table.extension(), "txt");
    }
}
