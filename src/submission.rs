//! Submission row model — column layout, parsed rows, status lifecycle,
//! and the identity key used for duplicate detection.

// Column offsets (0-based) in a sheet row.
pub const COL_TIMESTAMP: usize = 0;
pub const COL_EMAIL: usize = 1;
pub const COL_FIRST_NAME: usize = 2;
pub const COL_LAST_NAME: usize = 3;
pub const COL_COURSE: usize = 4;
pub const COL_PERIOD: usize = 5;
pub const COL_MOBILE: usize = 6;
pub const COL_STATUS: usize = 7;
pub const COL_PROCESSED_AT: usize = 8;

/// Minimum cell count for a row to be processable (through the mobile column).
pub const MIN_PROCESSABLE_COLS: usize = COL_MOBILE + 1;

/// Processing state of a submission row, as written to the status cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowStatus {
    /// No status written yet (empty or absent cell).
    Pending,
    /// Fulfillment is in flight for this row.
    Processing,
    /// Certificate delivered.
    CertificateSent,
    /// Delivery failed; not retried.
    EmailFailed,
    /// Identity already fulfilled on an earlier row.
    Duplicate,
}

impl RowStatus {
    /// The exact cell text for this status. `Pending` rows have no text.
    pub fn as_cell(&self) -> &'static str {
        match self {
            Self::Pending => "",
            Self::Processing => "Processing",
            Self::CertificateSent => "Certificate Sent",
            Self::EmailFailed => "Email Failed",
            Self::Duplicate => "Duplicate - No Certificate Sent",
        }
    }

    /// Parse a status cell. Unknown text is treated as `Pending` so that
    /// hand-edited cells never wedge a row.
    pub fn from_cell(cell: &str) -> Self {
        match cell.trim() {
            "Processing" => Self::Processing,
            "Certificate Sent" => Self::CertificateSent,
            "Email Failed" => Self::EmailFailed,
            "Duplicate - No Certificate Sent" => Self::Duplicate,
            _ => Self::Pending,
        }
    }

    /// Terminal statuses are never overwritten.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::CertificateSent | Self::EmailFailed | Self::Duplicate)
    }
}

impl std::fmt::Display for RowStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Pending => "Pending",
            other => other.as_cell(),
        };
        write!(f, "{s}")
    }
}

/// Canonical dedup key for a submitter: trimmed, lowercased fields joined
/// with a colon. Two submissions differing only by case or surrounding
/// whitespace map to the same key.
pub fn identity_key(email: &str, first_name: &str, last_name: &str) -> String {
    format!(
        "{}:{}:{}",
        email.trim().to_lowercase(),
        first_name.trim().to_lowercase(),
        last_name.trim().to_lowercase(),
    )
}

/// A submission row parsed out of the raw cell vector.
#[derive(Debug, Clone)]
pub struct Submission {
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub course: String,
    pub status: RowStatus,
}

impl Submission {
    /// Parse a raw row. Returns `None` when the row is shorter than the
    /// minimum field set; such rows are skipped by the watcher.
    pub fn from_row(row: &[String]) -> Option<Self> {
        if row.len() < MIN_PROCESSABLE_COLS {
            return None;
        }
        Some(Self {
            email: row[COL_EMAIL].trim().to_string(),
            first_name: row[COL_FIRST_NAME].trim().to_string(),
            last_name: row[COL_LAST_NAME].trim().to_string(),
            course: row[COL_COURSE].trim().to_string(),
            status: RowStatus::from_cell(row.get(COL_STATUS).map(String::as_str).unwrap_or("")),
        })
    }

    /// Whether the row carries the fields required for fulfillment.
    pub fn has_identity(&self) -> bool {
        !self.email.is_empty() && !self.first_name.is_empty()
    }

    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    pub fn identity_key(&self) -> String {
        identity_key(&self.email, &self.first_name, &self.last_name)
    }
}
