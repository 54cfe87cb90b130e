//! Filter flags shared by `list`, `export` and the bulk commands.

use clap::Args;
use grievance_core::filter::{FilterCriteria, Period};
use grievance_core::model::{Priority, Status};

#[derive(Args, Debug, Clone, Default)]
pub struct FilterArgs {
    /// Case-insensitive text search over reporter, description, category,
    /// assignee and id.
    #[arg(long, short = 's')]
    pub search: Option<String>,

    /// Only complaints with this status (ditunda, proses, selesai).
    #[arg(long)]
    pub status: Option<Status>,

    /// Only complaints with this priority (low, medium, high).
    #[arg(long)]
    pub priority: Option<Priority>,

    /// Date range: all, today, week, month. Unknown values mean all.
    #[arg(long, default_value = "all")]
    pub period: String,
}

impl FilterArgs {
    pub fn criteria(&self) -> FilterCriteria {
        FilterCriteria {
            search: self.search.clone().unwrap_or_default(),
            status: self.status,
            priority: self.priority,
            period: Period::parse_lenient(&self.period),
        }
    }
}
