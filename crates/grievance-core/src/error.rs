use std::fmt;

/// Machine-readable error codes for scripting against the CLI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    ConfigParseError,
    ValidationFailed,
    ItemNotFound,
    DuplicateId,
    NotLoggedIn,
    PermissionDenied,
    NotRegistered,
    IdentityRejected,
    CacheWriteFailed,
    LockContention,
    CacheCorrupt,
}

impl ErrorCode {
    /// Stable code identifier (`E####`) for machine parsing.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::ConfigParseError => "E1001",
            Self::ValidationFailed => "E2001",
            Self::ItemNotFound => "E2003",
            Self::DuplicateId => "E2004",
            Self::NotLoggedIn => "E3001",
            Self::PermissionDenied => "E3002",
            Self::NotRegistered => "E3003",
            Self::IdentityRejected => "E3004",
            Self::CacheWriteFailed => "E5001",
            Self::LockContention => "E5002",
            Self::CacheCorrupt => "E5003",
        }
    }

    /// Short human-facing summary for logs and terminal output.
    #[must_use]
    pub const fn message(self) -> &'static str {
        match self {
            Self::ConfigParseError => "Config file parse error",
            Self::ValidationFailed => "Complaint form is incomplete",
            Self::ItemNotFound => "Complaint not found",
            Self::DuplicateId => "Complaint ID already exists",
            Self::NotLoggedIn => "Login required",
            Self::PermissionDenied => "Permission denied",
            Self::NotRegistered => "Email is not registered in the role table",
            Self::IdentityRejected => "Identity service rejected the request",
            Self::CacheWriteFailed => "Local cache write failed",
            Self::LockContention => "Lock contention",
            Self::CacheCorrupt => "Local cache is unreadable",
        }
    }

    /// Optional remediation hint that can be surfaced to operators.
    #[must_use]
    pub const fn hint(self) -> Option<&'static str> {
        match self {
            Self::ConfigParseError => Some("Fix syntax in config.toml and retry."),
            Self::ValidationFailed => Some("Fill in reporter, category, priority and description."),
            Self::ItemNotFound => Some("Run `grv list` to see available complaint IDs."),
            Self::DuplicateId => None,
            Self::NotLoggedIn => Some("Run `grv login --email <email>` first."),
            Self::PermissionDenied => {
                Some("Only admins or the complaint's creator may change it.")
            }
            Self::NotRegistered => Some("Ask an admin to add your email to [auth.users]."),
            Self::IdentityRejected => Some("Check the email and password and retry."),
            Self::CacheWriteFailed => Some("Check disk space and write permissions."),
            Self::LockContention => Some("Retry after the other `grv` process finishes."),
            Self::CacheCorrupt => {
                Some("Run `grv sync` to reload from the sheet, or repair complaints.json by hand.")
            }
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Errors surfaced by tracker operations.
///
/// Remote transport failures never appear here for writes: the storage
/// façade degrades them to a local-only save.
#[derive(Debug, thiserror::Error)]
pub enum GrievanceError {
    #[error("{}", .0.join("; "))]
    Validation(Vec<String>),

    #[error("complaint not found: {0}")]
    NotFound(String),

    #[error("complaint id already exists: {0}")]
    DuplicateId(String),

    #[error("login required")]
    NotLoggedIn,

    #[error("you do not have permission to {action} complaint {id}")]
    PermissionDenied { action: &'static str, id: String },

    #[error("access denied: {0} is not registered")]
    NotRegistered(String),

    #[error("login failed: {0}")]
    Identity(String),

    #[error("failed to write local cache: {0}")]
    Cache(String),

    /// The cache exists but cannot be read back in full; writing over it
    /// would lose rows.
    #[error("local cache is unreadable: {0}")]
    CorruptCache(String),

    #[error(transparent)]
    Lock(#[from] crate::lock::LockError),

    /// A bulk operation stopped part-way; records before the failure stay
    /// updated.
    #[error("stopped after {done} of {total} complaints: {source}")]
    PartialBatch {
        done: usize,
        total: usize,
        #[source]
        source: Box<GrievanceError>,
    },
}

impl GrievanceError {
    /// Machine-readable code associated with this error.
    #[must_use]
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::Validation(_) => ErrorCode::ValidationFailed,
            Self::NotFound(_) => ErrorCode::ItemNotFound,
            Self::DuplicateId(_) => ErrorCode::DuplicateId,
            Self::NotLoggedIn => ErrorCode::NotLoggedIn,
            Self::PermissionDenied { .. } => ErrorCode::PermissionDenied,
            Self::NotRegistered(_) => ErrorCode::NotRegistered,
            Self::Identity(_) => ErrorCode::IdentityRejected,
            Self::Cache(_) => ErrorCode::CacheWriteFailed,
            Self::CorruptCache(_) => ErrorCode::CacheCorrupt,
            Self::Lock(err) => err.code(),
            Self::PartialBatch { source, .. } => source.code(),
        }
    }

    /// Remediation hint, falling back to the generic code summary.
    #[must_use]
    pub fn suggestion(&self) -> String {
        let code = self.code();
        code.hint().unwrap_or_else(|| code.message()).to_string()
    }
}
