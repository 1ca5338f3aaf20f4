//! Status query service — read-only projections over the submission sheet.
//!
//! Every call performs a fresh store read (no cache), so results are
//! eventually consistent with the watch loop's writes.

use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;

use crate::error::StoreError;
use crate::sheet::SubmissionStore;
use crate::submission::{
    COL_COURSE, COL_EMAIL, COL_FIRST_NAME, COL_LAST_NAME, COL_MOBILE, COL_PERIOD,
    COL_PROCESSED_AT, COL_STATUS, COL_TIMESTAMP, RowStatus,
};
use crate::watcher::WatcherState;

/// How many submissions the human-facing status page shows.
pub const RECENT_LIMIT: usize = 10;

/// One submission row, normalized for display.
#[derive(Debug, Clone, Serialize)]
pub struct SubmissionView {
    pub timestamp: String,
    pub email: String,
    pub name: String,
    pub course: String,
    pub period: String,
    pub mobile: String,
    pub status: String,
    pub processed_at: String,
}

/// Health payload for machine probes.
#[derive(Debug, Clone, Serialize)]
pub struct HealthSummary {
    pub status: &'static str,
    pub timestamp: String,
    pub processed_users_count: usize,
    pub last_processed_row: usize,
    pub actively_processing: bool,
}

/// Read-only view builder over the store.
pub struct StatusService {
    store: Arc<dyn SubmissionStore>,
}

impl StatusService {
    pub fn new(store: Arc<dyn SubmissionStore>) -> Self {
        Self { store }
    }

    /// All submissions in source order.
    pub async fn all(&self) -> Result<Vec<SubmissionView>, StoreError> {
        let rows = self.store.list_rows().await?;
        Ok(build_views(&rows))
    }

    /// The most recent `limit` submissions, oldest first.
    pub async fn recent(&self, limit: usize) -> Result<Vec<SubmissionView>, StoreError> {
        let mut views = self.all().await?;
        let excess = views.len().saturating_sub(limit);
        views.drain(..excess);
        Ok(views)
    }
}

/// Current health snapshot from the watcher's shared state.
pub fn health_summary(state: &WatcherState) -> HealthSummary {
    HealthSummary {
        status: "up",
        timestamp: Utc::now().to_rfc3339(),
        processed_users_count: state.ledger.len(),
        last_processed_row: state.high_water_mark(),
        actively_processing: state.in_flight(),
    }
}

/// Normalize raw rows into display records: header auto-detected and dropped,
/// short rows (missing basic fields) skipped, status defaulted to `Pending`
/// and processed-at to empty.
pub fn build_views(rows: &[Vec<String>]) -> Vec<SubmissionView> {
    let has_header = rows
        .first()
        .and_then(|row| row.first())
        .is_some_and(|cell| cell.eq_ignore_ascii_case("timestamp"));
    let start = usize::from(has_header);

    rows[start.min(rows.len())..]
        .iter()
        .filter(|row| row.len() > COL_COURSE)
        .map(|row| {
            let cell = |i: usize| row.get(i).map(|c| c.trim().to_string()).unwrap_or_default();
            let status_cell = cell(COL_STATUS);
            let status = if status_cell.is_empty() {
                RowStatus::Pending.to_string()
            } else {
                status_cell
            };
            SubmissionView {
                timestamp: cell(COL_TIMESTAMP),
                email: cell(COL_EMAIL),
                name: format!("{} {}", cell(COL_FIRST_NAME), cell(COL_LAST_NAME))
                    .trim()
                    .to_string(),
                course: cell(COL_COURSE),
                period: cell(COL_PERIOD),
                mobile: cell(COL_MOBILE),
                status,
                processed_at: cell(COL_PROCESSED_AT),
            }
        })
        .collect()
}
