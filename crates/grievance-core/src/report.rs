//! Statistics and export renderings of the complaint collection.

use std::fmt::{Display, Write as _};

use chrono::{DateTime, TimeZone};
use serde::Serialize;

use crate::model::{Category, Complaint, Priority, Status};
use crate::util::{
    DEFAULT_TRUNCATE, PLACEHOLDER, format_currency, format_date, format_date_short, month_label,
    percentage, truncate,
};

const RULE_WIDTH: usize = 70;
pub const REPORT_TITLE: &str = "LAPORAN KELUHAN";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategoryCount {
    pub category: Category,
    pub count: usize,
}

/// Aggregate figures over a set of complaints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Stats {
    pub total: usize,
    pub done: usize,
    pub in_progress: usize,
    pub pending: usize,
    pub high_priority: usize,
    pub total_cost: u64,
    /// Rounded percentage of `done` in `total`.
    pub completion_rate: u32,
    pub by_category: Vec<CategoryCount>,
}

impl Stats {
    #[must_use]
    pub fn compute(records: &[Complaint]) -> Self {
        let count_status = |s: Status| records.iter().filter(|r| r.status == s).count();
        let done = count_status(Status::Done);
        Self {
            total: records.len(),
            done,
            in_progress: count_status(Status::InProgress),
            pending: count_status(Status::Pending),
            high_priority: records
                .iter()
                .filter(|r| r.priority == Priority::High)
                .count(),
            total_cost: records.iter().map(|r| r.cost).sum(),
            completion_rate: percentage(done, records.len()),
            by_category: Category::ALL
                .iter()
                .map(|&category| CategoryCount {
                    category,
                    count: records.iter().filter(|r| r.category == category).count(),
                })
                .collect(),
        }
    }
}

fn csv_quote(text: &str) -> String {
    format!("\"{}\"", text.replace('"', "\"\""))
}

fn or_placeholder(text: &str) -> &str {
    if text.trim().is_empty() { PLACEHOLDER } else { text }
}

/// CSV with a header row. Free-text columns are always quoted.
///
/// Dates are written as calendar days in `tz`.
#[must_use]
pub fn to_csv<Tz: TimeZone>(records: &[Complaint], tz: &Tz) -> String {
    let mut out = String::from(
        "No,ID,Tanggal,Pelapor,Kategori,Prioritas,Uraian,Solusi,Status,PIC,Biaya,Tanggal Selesai\n",
    );
    for (index, r) in records.iter().enumerate() {
        let row = [
            (index + 1).to_string(),
            r.id.clone(),
            format_date(Some(&r.created_at.with_timezone(tz))),
            csv_quote(&r.reporter),
            r.category.to_string(),
            r.priority.to_string(),
            csv_quote(&r.description),
            csv_quote(or_placeholder(&r.resolution)),
            r.status.to_string(),
            or_placeholder(&r.assignee).to_string(),
            r.cost.to_string(),
            format_date(r.completed_at.map(|d| d.with_timezone(tz)).as_ref()),
        ];
        out.push_str(&row.join(","));
        out.push('\n');
    }
    out
}

/// Pretty-printed JSON array using the sheet's field names.
pub fn to_json(records: &[Complaint]) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(records)
}

/// Plain-text report: header, statistics, one block per record, footer.
#[must_use]
pub fn to_report<Tz: TimeZone>(records: &[Complaint], organization: &str, now: &DateTime<Tz>) -> String
where
    Tz::Offset: Display,
{
    let stats = Stats::compute(records);
    let rule = "=".repeat(RULE_WIDTH);
    let mut out = String::new();

    let _ = writeln!(out, "{rule}");
    let _ = writeln!(out, "{REPORT_TITLE} {}", organization.to_uppercase());
    let _ = writeln!(out, "Periode: {}", month_label(now));
    let _ = writeln!(out, "{rule}");
    let _ = writeln!(out);
    let _ = writeln!(out, "STATISTIK:");
    let _ = writeln!(out, "Total Keluhan: {}", stats.total);
    let _ = writeln!(out, "Selesai: {} ({}%)", stats.done, stats.completion_rate);
    let _ = writeln!(out, "Proses: {}", stats.in_progress);
    let _ = writeln!(out, "Tertunda: {}", stats.pending);
    let _ = writeln!(out, "Total Biaya: {}", format_currency(stats.total_cost));
    let _ = writeln!(out);
    let _ = writeln!(out, "DETAIL KELUHAN:");
    let _ = writeln!(out, "{}", "-".repeat(RULE_WIDTH));

    for (index, r) in records.iter().enumerate() {
        let _ = writeln!(out, "{}. [{}] {}", index + 1, r.id, r.description);
        let _ = writeln!(out, "   Pelapor: {} | Kategori: {}", r.reporter, r.category);
        let _ = writeln!(out, "   Status: {} | Prioritas: {}", r.status, r.priority);
        let _ = writeln!(out, "   PIC: {}", or_placeholder(&r.assignee));
        let _ = writeln!(out);
    }

    let _ = writeln!(out, "{rule}");
    let _ = write!(out, "Generated: {}", now.format("%d/%m/%Y %H.%M.%S"));
    out
}

/// Column layout of the table document: header and width in characters.
const COLUMNS: [(&str, usize); 9] = [
    ("No", 4),
    ("Tanggal", 8),
    ("Pelapor", 18),
    ("Kategori", 10),
    ("Prioritas", 9),
    ("Uraian Keluhan", DEFAULT_TRUNCATE + 3),
    ("Status", 8),
    ("PIC", 18),
    ("Biaya", 14),
];

fn fit(cell: &str, width: usize, right: bool) -> String {
    let cell = if cell.chars().count() > width {
        cell.chars().take(width).collect()
    } else {
        cell.to_string()
    };
    if right {
        format!("{cell:>width$}")
    } else {
        format!("{cell:<width$}")
    }
}

/// A paginated, fixed-column report ready to print.
///
/// Summary figures cover the whole collection; rows come from the view that
/// was active when the document was built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableDocument {
    pub organization: String,
    pub period: String,
    pub printed_at: String,
    pub summary: Stats,
    pub rows: Vec<[String; 9]>,
    pub rows_per_page: usize,
}

impl TableDocument {
    /// Returns `None` when there is nothing to tabulate.
    #[must_use]
    pub fn build<Tz: TimeZone>(
        all: &[Complaint],
        view: &[Complaint],
        organization: &str,
        now: &DateTime<Tz>,
        rows_per_page: usize,
    ) -> Option<Self>
    where
        Tz::Offset: Display,
    {
        if view.is_empty() || rows_per_page == 0 {
            return None;
        }
        let tz = now.timezone();
        let rows = view
            .iter()
            .enumerate()
            .map(|(index, r)| {
                [
                    (index + 1).to_string(),
                    format_date_short(Some(&r.created_at.with_timezone(&tz))),
                    r.reporter.clone(),
                    r.category.to_string(),
                    r.priority.to_string(),
                    truncate(&r.description, DEFAULT_TRUNCATE),
                    r.status.to_string(),
                    or_placeholder(&r.assignee).to_string(),
                    format_currency(r.cost),
                ]
            })
            .collect();
        Some(Self {
            organization: organization.to_string(),
            period: month_label(now),
            printed_at: now.format("%d/%m/%Y %H.%M.%S").to_string(),
            summary: Stats::compute(all),
            rows,
            rows_per_page,
        })
    }

    #[must_use]
    pub fn page_count(&self) -> usize {
        self.rows.len().div_ceil(self.rows_per_page)
    }

    fn header_line() -> String {
        COLUMNS
            .iter()
            .enumerate()
            .map(|(i, (name, width))| fit(name, *width, i == 0 || i == 8))
            .collect::<Vec<_>>()
            .join(" | ")
    }

    fn row_line(row: &[String; 9]) -> String {
        row.iter()
            .zip(COLUMNS.iter())
            .enumerate()
            .map(|(i, (cell, (_, width)))| fit(cell, *width, i == 0 || i == 8))
            .collect::<Vec<_>>()
            .join(" | ")
    }

    /// Render every page, separated by form feeds.
    #[must_use]
    pub fn render(&self) -> String {
        let header = Self::header_line();
        let width = header.chars().count();
        let pages = self.page_count();
        let s = &self.summary;

        let mut out = String::new();
        let _ = writeln!(out, "{REPORT_TITLE}");
        let _ = writeln!(out, "{}", self.organization);
        let _ = writeln!(out, "Periode: {}", self.period);
        let _ = writeln!(out, "{}", "=".repeat(width));
        let _ = writeln!(
            out,
            "RINGKASAN: Total: {} | Selesai: {} ({}%) | Proses: {} | Tertunda: {} | Total Biaya: {}",
            s.total,
            s.done,
            s.completion_rate,
            s.in_progress,
            s.pending,
            format_currency(s.total_cost)
        );
        let _ = writeln!(out);

        for (page, chunk) in self.rows.chunks(self.rows_per_page).enumerate() {
            if page > 0 {
                out.push('\u{c}');
                out.push('\n');
            }
            let _ = writeln!(out, "{header}");
            let _ = writeln!(out, "{}", "-".repeat(width));
            for row in chunk {
                let _ = writeln!(out, "{}", Self::row_line(row));
            }
            let _ = writeln!(out, "{}", "-".repeat(width));
            let _ = writeln!(
                out,
                "Halaman {} dari {pages}    Dicetak: {}",
                page + 1,
                self.printed_at
            );
        }
        out
    }
}

/// Which rendering an export produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentKind {
    Table,
    TextFallback,
}

/// Build the table document, falling back to the plain-text report when the
/// table cannot be produced.
#[must_use]
pub fn export_document<Tz: TimeZone>(
    all: &[Complaint],
    view: &[Complaint],
    organization: &str,
    now: &DateTime<Tz>,
    rows_per_page: usize,
) -> (DocumentKind, String)
where
    Tz::Offset: Display,
{
    match TableDocument::build(all, view, organization, now, rows_per_page) {
        Some(doc) => (DocumentKind::Table, doc.render()),
        None => {
            tracing::warn!("table document unavailable; exporting text report instead");
            (DocumentKind::TextFallback, to_report(view, organization, now))
        }
    }
}

/// Default export file stem, e.g. `Laporan_Keluhan_Januari_2025`.
#[must_use]
pub fn export_file_stem<Tz: TimeZone>(now: &DateTime<Tz>) -> String {
    format!("Laporan_Keluhan_{}", month_label(now).replace(' ', "_"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{FixedOffset, Utc};

    fn record(id: &str, status: Status, cost: u64) -> Complaint {
        Complaint {
            id: id.to_string(),
            created_at: Utc.with_ymd_and_hms(2025, 1, 15, 9, 0, 0).unwrap(),
            reporter: "Jamaah, \"Pak\" Ahmad".to_string(),
            category: Category::Facility,
            priority: Priority::High,
            description: "Sound system berdengung saat khutbah".to_string(),
            resolution: String::new(),
            assignee: String::new(),
            cost,
            status,
            completed_at: None,
            created_by: None,
        }
    }

    fn sample() -> Vec<Complaint> {
        vec![
            record("a", Status::Pending, 0),
            record("b", Status::InProgress, 250_000),
            record("c", Status::Done, 1_000_000),
        ]
    }

    #[test]
    fn stats_of_one_per_status() {
        let stats = Stats::compute(&sample());
        assert_eq!(stats.total, 3);
        assert_eq!(stats.done, 1);
        assert_eq!(stats.in_progress, 1);
        assert_eq!(stats.pending, 1);
        assert_eq!(stats.completion_rate, 33);
        assert_eq!(stats.high_priority, 3);
        assert_eq!(stats.total_cost, 1_250_000);
        let facility = stats
            .by_category
            .iter()
            .find(|c| c.category == Category::Facility)
            .unwrap();
        assert_eq!(facility.count, 3);
        assert_eq!(Stats::compute(&[]).completion_rate, 0);
    }

    #[test]
    fn csv_quotes_text_and_uses_placeholders() {
        let csv = to_csv(&sample(), &Utc);
        let mut lines = csv.lines();
        assert_eq!(
            lines.next().unwrap(),
            "No,ID,Tanggal,Pelapor,Kategori,Prioritas,Uraian,Solusi,Status,PIC,Biaya,Tanggal Selesai"
        );
        let first = lines.next().unwrap();
        assert!(first.starts_with("1,a,15 Jan 2025,\"Jamaah, \"\"Pak\"\" Ahmad\",Sarana,High,"));
        assert!(first.ends_with(",\"-\",Ditunda,-,0,-"));
        assert_eq!(csv.lines().count(), 4);
    }

    #[test]
    fn dates_follow_the_local_calendar_day() {
        let wib = FixedOffset::east_opt(7 * 3600).unwrap();
        let mut late = record("a", Status::Done, 0);
        late.created_at = Utc.with_ymd_and_hms(2025, 1, 2, 23, 0, 0).unwrap();
        late.completed_at = Some(Utc.with_ymd_and_hms(2025, 1, 31, 18, 30, 0).unwrap());

        let csv = to_csv(std::slice::from_ref(&late), &wib);
        let row = csv.lines().nth(1).unwrap();
        assert!(row.starts_with("1,a,3 Jan 2025,"));
        assert!(row.ends_with(",1 Feb 2025"));
        assert!(to_csv(std::slice::from_ref(&late), &Utc).contains(",2 Jan 2025,"));

        let now = wib.with_ymd_and_hms(2025, 1, 20, 10, 30, 0).unwrap();
        let view = [late];
        let doc = TableDocument::build(&view, &view, "Masjid", &now, 20).unwrap();
        assert_eq!(doc.rows[0][1], "03/01/25");
    }

    #[test]
    fn text_report_layout() {
        let now = Utc.with_ymd_and_hms(2025, 1, 20, 10, 30, 0).unwrap();
        let report = to_report(&sample(), "Masjid Al-Fajar", &now);
        let lines: Vec<&str> = report.lines().collect();
        assert_eq!(lines[0], "=".repeat(70));
        assert_eq!(lines[1], "LAPORAN KELUHAN MASJID AL-FAJAR");
        assert_eq!(lines[2], "Periode: Januari 2025");
        assert!(report.contains("Selesai: 1 (33%)"));
        assert!(report.contains("1. [a] Sound system berdengung saat khutbah"));
        assert!(report.contains("   PIC: -"));
        assert!(report.ends_with("Generated: 20/01/2025 10.30.00"));
    }

    #[test]
    fn table_document_paginates() {
        let now = Utc.with_ymd_and_hms(2025, 1, 20, 10, 30, 0).unwrap();
        let records: Vec<Complaint> = (0..5)
            .map(|i| record(&format!("r{i}"), Status::Pending, 1_500))
            .collect();
        let doc = TableDocument::build(&records, &records, "Masjid", &now, 2).unwrap();
        assert_eq!(doc.page_count(), 3);

        let rendered = doc.render();
        assert!(rendered.contains("Halaman 1 dari 3"));
        assert!(rendered.contains("Halaman 3 dari 3"));
        assert!(rendered.contains("Rp 1.500"));
        assert_eq!(rendered.matches('\u{c}').count(), 2);
    }

    #[test]
    fn empty_view_falls_back_to_text_report() {
        let now = Utc.with_ymd_and_hms(2025, 1, 20, 10, 30, 0).unwrap();
        let (kind, body) = export_document(&sample(), &[], "Masjid", &now, 20);
        assert_eq!(kind, DocumentKind::TextFallback);
        assert!(body.contains("Total Keluhan: 0"));
    }

    #[test]
    fn file_stem_uses_month_label() {
        let now = Utc.with_ymd_and_hms(2025, 3, 1, 0, 0, 0).unwrap();
        assert_eq!(export_file_stem(&now), "Laporan_Keluhan_Maret_2025");
    }
}
