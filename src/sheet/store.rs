//! Backend-agnostic submission store trait.

use async_trait::async_trait;

use crate::error::StoreError;

/// Row-oriented access to the external submission source.
///
/// Rows are sequences of string cells; the first row may be a header.
/// Indices into the sheet are 1-based, header row included, matching the
/// upstream spreadsheet API.
#[async_trait]
pub trait SubmissionStore: Send + Sync {
    /// Fetch every row of the sheet in source order.
    async fn list_rows(&self) -> Result<Vec<Vec<String>>, StoreError>;

    /// Write a single cell. `row` and `col` are 1-based.
    async fn update_cell(&self, row: usize, col: usize, value: &str) -> Result<(), StoreError>;
}
