//! Merged-range bookkeeping for one worksheet.
//!
//! A `RangeManager` owns the set of live merged regions and keeps it
//! consistent under structural edits: a new merge displaces anything it
//! overlaps, and row/column insertions and deletions renumber every stored
//! range. Cell contents live elsewhere; this layer only answers "which
//! rectangle covers this cell" and "where did that rectangle move".

use crate::addr::range_address;
use crate::errors::WorkbookError;
use smallvec::SmallVec;
use std::collections::BTreeSet;

/// Rectangular cell region, 1-based inclusive on both axes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellRange {
    row_start: u32,
    row_end: u32,
    col_start: u32,
    col_end: u32,
}

impl CellRange {
    /// Corner-pair constructor. Bounds must be positive and ends must not
    /// precede starts.
    pub fn new(
        row_start: u32,
        row_end: u32,
        col_start: u32,
        col_end: u32,
    ) -> Result<Self, WorkbookError> {
        if row_start == 0 || col_start == 0 {
            return Err(WorkbookError::InvalidRange(format!(
                "bounds must be 1-based, got rows {row_start}..={row_end} cols {col_start}..={col_end}"
            )));
        }
        if row_end < row_start || col_end < col_start {
            return Err(WorkbookError::InvalidRange(format!(
                "end precedes start: rows {row_start}..={row_end} cols {col_start}..={col_end}"
            )));
        }
        Ok(Self {
            row_start,
            row_end,
            col_start,
            col_end,
        })
    }

    /// Origin+span constructor: `rows`/`cols` are extents, both at least 1.
    pub fn from_span(row: u32, col: u32, rows: u32, cols: u32) -> Result<Self, WorkbookError> {
        if rows == 0 || cols == 0 {
            return Err(WorkbookError::InvalidRange(format!(
                "span must cover at least one cell, got {rows}x{cols}"
            )));
        }
        Self::new(row, row + rows - 1, col, col + cols - 1)
    }

    pub fn row_start(&self) -> u32 {
        self.row_start
    }

    pub fn row_end(&self) -> u32 {
        self.row_end
    }

    pub fn col_start(&self) -> u32 {
        self.col_start
    }

    pub fn col_end(&self) -> u32 {
        self.col_end
    }

    /// Top-left cell as `(row, col)`.
    pub fn anchor(&self) -> (u32, u32) {
        (self.row_start, self.col_start)
    }

    pub fn contains_cell(&self, row: u32, col: u32) -> bool {
        row >= self.row_start && row <= self.row_end && col >= self.col_start && col <= self.col_end
    }

    pub fn contains(&self, other: &CellRange) -> bool {
        other.row_start >= self.row_start
            && other.row_end <= self.row_end
            && other.col_start >= self.col_start
            && other.col_end <= self.col_end
    }

    pub fn intersects(&self, other: &CellRange) -> bool {
        self.row_start <= other.row_end
            && other.row_start <= self.row_end
            && self.col_start <= other.col_end
            && other.col_start <= self.col_end
    }

    pub fn is_single_cell(&self) -> bool {
        self.row_start == self.row_end && self.col_start == self.col_end
    }

    pub fn to_a1(&self) -> String {
        range_address(self.col_start, self.row_start, self.col_end, self.row_end)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeOutcome {
    /// The rectangle was stored; any overlapping prior ranges were dropped.
    Merged,
    /// The rectangle matched an existing range exactly; nothing changed.
    AlreadyMerged,
}

#[derive(Debug, Clone, Copy)]
enum Axis {
    Rows,
    Cols,
}

#[derive(Debug, Clone, Default)]
pub struct RangeManager {
    ranges: SmallVec<[CellRange; 4]>,
    hidden_rows: BTreeSet<u32>,
    hidden_cols: BTreeSet<u32>,
}

impl RangeManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Live ranges in insertion order.
    pub fn ranges(&self) -> &[CellRange] {
        &self.ranges
    }

    pub fn range_at(&self, row: u32, col: u32) -> Option<&CellRange> {
        self.ranges.iter().find(|r| r.contains_cell(row, col))
    }

    /// Resolves a cell to the top-left anchor of its covering range, or to
    /// itself when unmerged. Readers and writers use this to redirect merged
    /// cell access.
    pub fn anchor_of(&self, row: u32, col: u32) -> (u32, u32) {
        match self.range_at(row, col) {
            Some(range) => range.anchor(),
            None => (row, col),
        }
    }

    /// Stores a merge request. The newest request wins: every existing range
    /// it overlaps, fully or partially, is dropped. Re-merging an identical
    /// rectangle is a no-op success.
    pub fn merge(&mut self, range: CellRange) -> MergeOutcome {
        if self.ranges.contains(&range) {
            return MergeOutcome::AlreadyMerged;
        }
        let before = self.ranges.len();
        self.ranges.retain(|existing| !existing.intersects(&range));
        let dropped = before - self.ranges.len();
        if dropped > 0 {
            tracing::debug!(range = %range.to_a1(), dropped, "merge displaced overlapping ranges");
        }
        self.ranges.push(range);
        MergeOutcome::Merged
    }

    /// Inserts (`count > 0`) or deletes (`count < 0`) rows at `at`,
    /// renumbering every stored range. `count == 0` is a no-op.
    pub fn shift_rows(&mut self, at: u32, count: i32) -> Result<(), WorkbookError> {
        self.shift(Axis::Rows, at, count)
    }

    /// Column counterpart of [`shift_rows`](Self::shift_rows).
    pub fn shift_cols(&mut self, at: u32, count: i32) -> Result<(), WorkbookError> {
        self.shift(Axis::Cols, at, count)
    }

    pub fn set_row_hidden(&mut self, at: u32, hidden: bool) -> Result<(), WorkbookError> {
        Self::set_hidden_flag(&mut self.hidden_rows, at, hidden)
    }

    pub fn set_col_hidden(&mut self, at: u32, hidden: bool) -> Result<(), WorkbookError> {
        Self::set_hidden_flag(&mut self.hidden_cols, at, hidden)
    }

    pub fn is_row_hidden(&self, at: u32) -> bool {
        self.hidden_rows.contains(&at)
    }

    pub fn is_col_hidden(&self, at: u32) -> bool {
        self.hidden_cols.contains(&at)
    }

    fn set_hidden_flag(flags: &mut BTreeSet<u32>, at: u32, hidden: bool) -> Result<(), WorkbookError> {
        if at == 0 {
            return Err(WorkbookError::IndexOutOfRange(
                "hidden flag index must be 1-based".to_string(),
            ));
        }
        if hidden {
            flags.insert(at);
        } else {
            flags.remove(&at);
        }
        Ok(())
    }

    fn shift(&mut self, axis: Axis, at: u32, count: i32) -> Result<(), WorkbookError> {
        if at == 0 {
            return Err(WorkbookError::IndexOutOfRange(
                "shift index must be 1-based".to_string(),
            ));
        }
        if count == 0 {
            return Ok(());
        }
        if count > 0 {
            self.apply_insert(axis, at, count as u32);
        } else {
            self.apply_delete(axis, at, count.unsigned_abs());
        }
        Ok(())
    }

    fn apply_insert(&mut self, axis: Axis, at: u32, count: u32) {
        for range in self.ranges.iter_mut() {
            let (start, end) = bounds_mut(range, axis);
            if *start >= at {
                *start += count;
            }
            if *end >= at {
                *end += count;
            }
        }
        let flags = self.hidden_flags_mut(axis);
        *flags = flags
            .iter()
            .map(|&index| if index >= at { index + count } else { index })
            .collect();
    }

    fn apply_delete(&mut self, axis: Axis, at: u32, count: u32) {
        let block_end = at + count - 1;
        self.ranges.retain(|range| {
            let (start, end) = bounds_mut(range, axis);
            if *end < at {
                return true;
            }
            if *start > block_end {
                *start -= count;
                *end -= count;
                return true;
            }
            if *start >= at && *end <= block_end {
                return false;
            }
            // Straddler: clip away the deleted overlap.
            let new_start = if *start >= at { at } else { *start };
            let new_end = if *end > block_end { *end - count } else { at - 1 };
            if new_end < new_start {
                return false;
            }
            *start = new_start;
            *end = new_end;
            true
        });
        let flags = self.hidden_flags_mut(axis);
        *flags = flags
            .iter()
            .filter(|&&index| index < at || index > block_end)
            .map(|&index| if index > block_end { index - count } else { index })
            .collect();
    }

    fn hidden_flags_mut(&mut self, axis: Axis) -> &mut BTreeSet<u32> {
        match axis {
            Axis::Rows => &mut self.hidden_rows,
            Axis::Cols => &mut self.hidden_cols,
        }
    }
}

fn bounds_mut(range: &mut CellRange, axis: Axis) -> (&mut u32, &mut u32) {
    match axis {
        Axis::Rows => (&mut range.row_start, &mut range.row_end),
        Axis::Cols => (&mut range.col_start, &mut range.col_end),
    }
}
