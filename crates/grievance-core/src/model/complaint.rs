use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use std::{fmt, str::FromStr};

/// What the complaint is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Category {
    Service,
    Facility,
    Infrastructure,
    Electronics,
    Cleanliness,
    Aesthetics,
    Security,
    Other,
}

impl Category {
    pub const ALL: [Self; 8] = [
        Self::Service,
        Self::Facility,
        Self::Infrastructure,
        Self::Electronics,
        Self::Cleanliness,
        Self::Aesthetics,
        Self::Security,
        Self::Other,
    ];

    /// Label stored in the spreadsheet.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Service => "Layanan",
            Self::Facility => "Sarana",
            Self::Infrastructure => "Prasarana",
            Self::Electronics => "Elektronik",
            Self::Cleanliness => "Kebersihan",
            Self::Aesthetics => "Estetika",
            Self::Security => "Keamanan",
            Self::Other => "Lainnya",
        }
    }

    const fn slug(self) -> &'static str {
        match self {
            Self::Service => "service",
            Self::Facility => "facility",
            Self::Infrastructure => "infrastructure",
            Self::Electronics => "electronics",
            Self::Cleanliness => "cleanliness",
            Self::Aesthetics => "aesthetics",
            Self::Security => "security",
            Self::Other => "other",
        }
    }
}

/// Triage priority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Priority {
    Low,
    Medium,
    High,
}

impl Priority {
    pub const ALL: [Self; 3] = [Self::Low, Self::Medium, Self::High];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Low => "Low",
            Self::Medium => "Medium",
            Self::High => "High",
        }
    }
}

/// Workflow status. Any status may be set from any other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub enum Status {
    #[default]
    Pending,
    InProgress,
    Done,
}

impl Status {
    pub const ALL: [Self; 3] = [Self::Pending, Self::InProgress, Self::Done];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "Ditunda",
            Self::InProgress => "Proses",
            Self::Done => "Selesai",
        }
    }

    const fn slug(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::InProgress => "in-progress",
            Self::Done => "done",
        }
    }
}

/// Error returned when parsing an enum value from text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseEnumError {
    pub expected: &'static str,
    pub got: String,
}

impl fmt::Display for ParseEnumError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid {}: '{}'", self.expected, self.got)
    }
}

impl std::error::Error for ParseEnumError {}

fn normalize(input: &str) -> String {
    input.trim().to_lowercase().replace(['_', ' '], "-")
}

impl FromStr for Category {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = normalize(s);
        if normalized == "pelayanan" {
            return Ok(Self::Service);
        }
        Self::ALL
            .into_iter()
            .find(|c| normalized == c.slug() || normalized == c.as_str().to_lowercase())
            .ok_or_else(|| ParseEnumError {
                expected: "category",
                got: s.to_string(),
            })
    }
}

impl FromStr for Priority {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize(s).as_str() {
            "low" | "rutin" => Ok(Self::Low),
            "medium" | "penting" => Ok(Self::Medium),
            "high" | "urgent" => Ok(Self::High),
            _ => Err(ParseEnumError {
                expected: "priority",
                got: s.to_string(),
            }),
        }
    }
}

impl FromStr for Status {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize(s).as_str() {
            "ditunda" | "pending" => Ok(Self::Pending),
            "proses" | "dalam-proses" | "in-progress" => Ok(Self::InProgress),
            "selesai" | "done" => Ok(Self::Done),
            _ => Err(ParseEnumError {
                expected: "status",
                got: s.to_string(),
            }),
        }
    }
}

macro_rules! wire_label_serde {
    ($($ty:ty),+ $(,)?) => {$(
        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl Serialize for $ty {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_str(self.as_str())
            }
        }

        impl<'de> Deserialize<'de> for $ty {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let raw = String::deserialize(deserializer)?;
                raw.parse().map_err(serde::de::Error::custom)
            }
        }
    )+};
}

wire_label_serde!(Category, Priority, Status);

/// A tracked complaint, keyed by the spreadsheet's column names on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Complaint {
    pub id: String,
    #[serde(rename = "tanggal", deserialize_with = "de_timestamp")]
    pub created_at: DateTime<Utc>,
    #[serde(rename = "nama")]
    pub reporter: String,
    #[serde(rename = "kategori")]
    pub category: Category,
    #[serde(rename = "prioritas")]
    pub priority: Priority,
    #[serde(rename = "uraian")]
    pub description: String,
    #[serde(rename = "solusi", default, deserialize_with = "de_text")]
    pub resolution: String,
    #[serde(rename = "penanggungjawab", default, deserialize_with = "de_text")]
    pub assignee: String,
    #[serde(rename = "biaya", default, deserialize_with = "de_cost")]
    pub cost: u64,
    #[serde(default)]
    pub status: Status,
    #[serde(
        rename = "tanggalSelesai",
        default,
        deserialize_with = "de_opt_timestamp"
    )]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(rename = "createdBy", default, deserialize_with = "de_opt_text")]
    pub created_by: Option<String>,
}

/// Fields a user supplies when submitting a complaint.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewComplaint {
    pub reporter: String,
    pub category: Option<Category>,
    pub priority: Option<Priority>,
    pub description: String,
    pub resolution: String,
    pub assignee: String,
    pub cost: u64,
}

/// Partial update: `None` leaves the stored field untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ComplaintPatch {
    pub reporter: Option<String>,
    pub category: Option<Category>,
    pub priority: Option<Priority>,
    pub description: Option<String>,
    pub resolution: Option<String>,
    pub cost: Option<u64>,
    pub status: Option<Status>,
    /// `Some(None)` clears the completion date.
    pub completed_at: Option<Option<DateTime<Utc>>>,
}

impl ComplaintPatch {
    #[must_use]
    pub fn status(status: Status) -> Self {
        Self {
            status: Some(status),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

impl Complaint {
    /// Build a pending complaint from a validated submission.
    ///
    /// Returns `None` when category or priority is missing.
    #[must_use]
    pub fn from_submission(
        id: String,
        created_at: DateTime<Utc>,
        form: &NewComplaint,
        created_by: Option<String>,
    ) -> Option<Self> {
        Some(Self {
            id,
            created_at,
            reporter: form.reporter.trim().to_string(),
            category: form.category?,
            priority: form.priority?,
            description: form.description.trim().to_string(),
            resolution: form.resolution.trim().to_string(),
            assignee: form.assignee.trim().to_string(),
            cost: form.cost,
            status: Status::Pending,
            completed_at: None,
            created_by,
        })
    }

    /// Merge `patch` into this record. `id`, `created_at`, `assignee` and
    /// `created_by` are fixed once the complaint is filed.
    pub fn apply(&mut self, patch: &ComplaintPatch) {
        if let Some(reporter) = &patch.reporter {
            self.reporter = reporter.trim().to_string();
        }
        if let Some(category) = patch.category {
            self.category = category;
        }
        if let Some(priority) = patch.priority {
            self.priority = priority;
        }
        if let Some(description) = &patch.description {
            self.description = description.trim().to_string();
        }
        if let Some(resolution) = &patch.resolution {
            self.resolution = resolution.trim().to_string();
        }
        if let Some(cost) = patch.cost {
            self.cost = cost;
        }
        if let Some(status) = patch.status {
            self.status = status;
        }
        if let Some(completed_at) = patch.completed_at {
            self.completed_at = completed_at;
        }
    }
}

/// Parse the timestamp shapes found in the sheet: RFC 3339 or a bare date.
#[must_use]
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    let date_part = raw.split('T').next().unwrap_or(raw);
    NaiveDate::parse_from_str(date_part, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

fn de_timestamp<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
    let raw = String::deserialize(deserializer)?;
    parse_timestamp(&raw)
        .ok_or_else(|| serde::de::Error::custom(format!("invalid timestamp '{raw}'")))
}

fn de_opt_timestamp<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<DateTime<Utc>>, D::Error> {
    let raw = Option::<String>::deserialize(deserializer)?;
    match raw.as_deref().map(str::trim) {
        None | Some("" | "-") => Ok(None),
        Some(value) => parse_timestamp(value)
            .map(Some)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid timestamp '{value}'"))),
    }
}

fn de_text<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

fn de_opt_text<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(raw.filter(|value| !value.trim().is_empty()))
}

/// Parse a cost cell the way the sheet's users type it.
///
/// Accepts `150000`, `Rp 1.500.000` (dot-grouped thousands) and decimals
/// such as `150000.50`, keeping only the integer part. Text without leading
/// digits reads as 0. Negative amounts are rejected.
#[must_use]
pub fn parse_cost(raw: &str) -> Option<u64> {
    let mut text = raw.trim();
    if text.get(..2).is_some_and(|prefix| prefix.eq_ignore_ascii_case("rp")) {
        text = text[2..].trim_start();
    }
    if text.starts_with('-') {
        return None;
    }
    let text = text.strip_prefix('+').unwrap_or(text);

    let mut groups = text.split('.');
    let head = groups.next().unwrap_or_default();
    let thousands = text.contains('.')
        && (1..=3).contains(&head.len())
        && head.bytes().all(|b| b.is_ascii_digit())
        && groups.all(|g| g.len() == 3 && g.bytes().all(|b| b.is_ascii_digit()));

    let integer: String = if thousands {
        text.chars().filter(|c| *c != '.').collect()
    } else {
        text.chars().take_while(char::is_ascii_digit).collect()
    };
    if integer.is_empty() {
        return Some(0);
    }
    integer.parse().ok()
}

/// Cost arrives as a number, a numeric string, or an empty string.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn cost_from_value(value: &Value) -> Option<u64> {
    match value {
        Value::Null => Some(0),
        Value::Number(n) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| f.is_finite() && *f >= 0.0).map(|f| f.trunc() as u64)),
        Value::String(text) => parse_cost(text),
        _ => None,
    }
}

fn de_cost<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
    let value = Value::deserialize(deserializer)?;
    cost_from_value(&value).ok_or_else(|| serde::de::Error::custom(format!("invalid cost {value}")))
}

impl Complaint {
    /// Best-effort reading of a row that failed strict decoding.
    ///
    /// Unknown or blank labels fall back to `Other`/`Low`/`Pending`, a bad
    /// creation date to the Unix epoch, a bad cost to 0. Only a row without
    /// an id is unrecoverable.
    #[must_use]
    pub fn recover(row: &Value) -> Option<Self> {
        let fields = row.as_object()?;
        let text = |key: &str| match fields.get(key) {
            Some(Value::String(s)) => s.trim().to_string(),
            Some(Value::Number(n)) => n.to_string(),
            _ => String::new(),
        };

        let id = text("id");
        if id.is_empty() {
            return None;
        }
        Some(Self {
            id,
            created_at: parse_timestamp(&text("tanggal")).unwrap_or(DateTime::<Utc>::UNIX_EPOCH),
            reporter: text("nama"),
            category: text("kategori").parse().unwrap_or(Category::Other),
            priority: text("prioritas").parse().unwrap_or(Priority::Low),
            description: text("uraian"),
            resolution: text("solusi"),
            assignee: text("penanggungjawab"),
            cost: fields.get("biaya").and_then(cost_from_value).unwrap_or(0),
            status: text("status").parse().unwrap_or_default(),
            completed_at: parse_timestamp(&text("tanggalSelesai")),
            created_by: Some(text("createdBy")).filter(|s| !s.is_empty()),
        })
    }
}

/// A collection decoded row by row.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DecodedRows {
    pub records: Vec<Complaint>,
    /// Rows kept through [`Complaint::recover`].
    pub repaired: Vec<String>,
    /// Rows that could not be read at all.
    pub dropped: usize,
}

/// Decode rows one at a time so a single bad row cannot sink the rest.
#[must_use]
pub fn decode_rows(rows: Vec<Value>) -> DecodedRows {
    let mut decoded = DecodedRows::default();
    for row in rows {
        match Complaint::deserialize(&row) {
            Ok(record) => decoded.records.push(record),
            Err(err) => match Complaint::recover(&row) {
                Some(record) => {
                    tracing::warn!(id = %record.id, error = %err, "repaired malformed complaint row");
                    decoded.repaired.push(record.id.clone());
                    decoded.records.push(record);
                }
                None => {
                    tracing::warn!(error = %err, "complaint row without an id");
                    decoded.dropped += 1;
                }
            },
        }
    }
    decoded
}
