//! Seam between the bookkeeping layer and whatever owns actual cell payloads.

use crate::errors::WorkbookError;

/// Narrow view of a cell-storage backend. The directory and range layers
/// never persist cell values themselves; deep copies and content lookups go
/// through this trait so the backing model stays swappable.
pub trait CellStore {
    fn content(&self, sheet: &str, row: u32, col: u32) -> Option<String>;

    fn set_content(
        &mut self,
        sheet: &str,
        row: u32,
        col: u32,
        value: &str,
    ) -> Result<(), WorkbookError>;

    /// Deep-copies every populated cell of `source_sheet` into
    /// `target_sheet`, creating the target when the backend does not have it
    /// yet.
    fn copy_region(&mut self, source_sheet: &str, target_sheet: &str)
    -> Result<(), WorkbookError>;

    fn row_count(&self, sheet: &str) -> u32;

    fn col_count(&self, sheet: &str) -> u32;
}
