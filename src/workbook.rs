//! Fail-soft editing session over one XLSX document.
//!
//! `Workbook` pairs the backing spreadsheet model with the bookkeeping
//! layers: a [`SheetDirectory`] for sheet identity and ordering, and one
//! [`RangeManager`] per sheet for merged regions. Public operations return a
//! success flag and latch the most recent failure behind
//! [`err_code`](Workbook::err_code)/[`err_description`](Workbook::err_description)
//! instead of raising, so generated callers can keep issuing calls and poll
//! the error state afterwards.

use crate::addr;
use crate::cells::Cells;
use crate::context::DocumentContext;
use crate::errors::{ErrorState, WorkbookError};
use crate::ranges::{CellRange, MergeOutcome, RangeManager};
use crate::sheets::{SheetDirectory, SheetRecord};
use crate::store::CellStore;
use crate::style::CellStyle;
use chrono::{Duration, NaiveDate, NaiveDateTime, Timelike};
use serde::Serialize;
use std::collections::BTreeSet;
use std::fs::File;
use std::path::{Path, PathBuf};
use umya_spreadsheet::Spreadsheet;

const DEFAULT_SHEET_NAME: &str = "Sheet1";
const DEFAULT_EXTENSION: &str = "xlsx";
const MIN_COLUMN_WIDTH: f64 = 8.43;
const MAX_COLUMN_WIDTH: f64 = 80.0;

#[derive(Debug, Clone, Serialize)]
pub struct SheetInfo {
    pub name: String,
    pub index: usize,
    pub hidden: bool,
    pub protected: bool,
}

pub struct Workbook {
    book: Spreadsheet,
    path: PathBuf,
    context: DocumentContext,
    directory: SheetDirectory,
    /// One manager per sheet, parallel to the directory order.
    ranges: Vec<RangeManager>,
    errors: ErrorState,
    autofit: bool,
}

impl Workbook {
    /// Opens the document at `path`, creating a fresh in-memory one when the
    /// file does not exist yet. A path without an extension gets `.xlsx`
    /// appended. Open failures (unreadable file, lock held elsewhere) are
    /// latched in the error state and leave an empty session behind.
    pub fn open(path: impl AsRef<Path>) -> Self {
        Self::open_with_context(path, DocumentContext::default())
    }

    pub fn open_with_context(path: impl AsRef<Path>, context: DocumentContext) -> Self {
        let path = normalize_extension(path.as_ref());
        let mut errors = ErrorState::default();

        let loaded = match load_book(&path) {
            Ok(loaded) => loaded,
            Err(err) => {
                tracing::warn!(path = %path.display(), error = %err, "open failed");
                errors.record(err.code(), context.messages.describe(&err));
                None
            }
        };

        let (book, directory, ranges) = match loaded {
            Some(book) => match seed_from_book(&book) {
                Ok((directory, ranges)) => (book, directory, ranges),
                Err(err) => {
                    tracing::warn!(path = %path.display(), error = %err, "document bookkeeping rejected");
                    errors.record(err.code(), context.messages.describe(&err));
                    fresh_document()
                }
            },
            None => fresh_document(),
        };

        Self {
            book,
            path,
            context,
            directory,
            ranges,
            errors,
            autofit: false,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn err_code(&self) -> i32 {
        self.errors.code()
    }

    pub fn err_description(&self) -> &str {
        self.errors.description()
    }

    pub fn clear_error(&mut self) {
        self.errors.clear();
    }

    /// When enabled, column widths are fitted to their content at save time.
    pub fn set_autofit(&mut self, autofit: bool) {
        self.autofit = autofit;
    }

    // ----- persistence ------------------------------------------------------

    pub fn save(&mut self) -> bool {
        let path = self.path.clone();
        self.save_to(&path)
    }

    /// Writes a copy to `target` without retargeting the session.
    pub fn save_as(&mut self, target: impl AsRef<Path>) -> bool {
        let target = normalize_extension(target.as_ref());
        self.save_to(&target)
    }

    /// Explicit end of the session. Nothing is flushed; call
    /// [`save`](Self::save) first.
    pub fn close(self) {}

    fn save_to(&mut self, target: &Path) -> bool {
        self.run(|wb| {
            wb.sync_merges();
            if wb.autofit {
                wb.apply_autofit();
            }
            let parent = match target.parent() {
                Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
                _ => PathBuf::from("."),
            };
            if !parent.is_dir() {
                return Err(WorkbookError::Io(format!(
                    "directory '{}' does not exist",
                    parent.display()
                )));
            }
            // Write through a sibling temp file so a failed save never
            // truncates an existing document.
            let tmp = tempfile::Builder::new()
                .prefix(".workbook-")
                .suffix(".xlsx")
                .tempfile_in(&parent)
                .map_err(|err| WorkbookError::Io(err.to_string()))?;
            umya_spreadsheet::writer::xlsx::write(&wb.book, tmp.path())
                .map_err(|err| WorkbookError::Io(err.to_string()))?;
            tmp.persist(target)
                .map_err(|err| WorkbookError::Io(err.to_string()))?;
            tracing::debug!(path = %target.display(), "document saved");
            Ok(())
        })
    }

    // ----- cell access ------------------------------------------------------

    /// Origin+span cursor over the current sheet: `rows`/`cols` are extents,
    /// so `cells(2, 2, 5, 10)` covers rows 2..=6 and columns 2..=11.
    pub fn cells(&mut self, row: u32, col: u32, rows: u32, cols: u32) -> Cells<'_> {
        match CellRange::from_span(row, col, rows, cols) {
            Ok(bounds) => Cells::new(self, Some(bounds)),
            Err(err) => {
                self.fail(err);
                Cells::new(self, None)
            }
        }
    }

    pub fn cell(&mut self, row: u32, col: u32) -> Cells<'_> {
        self.cells(row, col, 1, 1)
    }

    // ----- sheet management -------------------------------------------------

    /// Appends a new sheet and makes it the current one.
    pub fn insert_sheet(&mut self, name: &str) -> bool {
        self.run(|wb| {
            wb.directory.insert(name)?;
            wb.book
                .new_sheet(name)
                .map_err(|_| WorkbookError::DuplicateName(name.to_string()))?;
            wb.ranges.push(RangeManager::new());
            Ok(())
        })
    }

    pub fn delete_sheet(&mut self, index: u32) -> bool {
        self.run(|wb| {
            let removed = wb.directory.delete(index as usize)?;
            wb.book
                .remove_sheet_by_name(removed.name())
                .map_err(|_| WorkbookError::NotFound(removed.name().to_string()))?;
            wb.ranges.remove(index as usize - 1);
            Ok(())
        })
    }

    pub fn rename_sheet(&mut self, index: u32, new_name: &str) -> bool {
        self.run(|wb| {
            wb.directory.rename(index as usize, new_name)?;
            wb.book
                .set_sheet_name(index as usize - 1, new_name.to_string())
                .map_err(|err| WorkbookError::InvalidName(err.to_string()))?;
            Ok(())
        })
    }

    pub fn set_current_sheet(&mut self, index: u32) -> bool {
        self.run(|wb| wb.directory.set_current(index as usize))
    }

    pub fn set_current_sheet_by_name(&mut self, name: &str) -> bool {
        self.run(|wb| wb.directory.set_current_by_name(name).map(|_| ()))
    }

    /// Copies `source_name` (cells, styles, merges) under `new_name`,
    /// appended at the end. The current sheet pointer does not move.
    pub fn clone_sheet(&mut self, source_name: &str, new_name: &str) -> bool {
        self.run(|wb| {
            let source_index = wb
                .directory
                .index_of(source_name)
                .ok_or_else(|| WorkbookError::NotFound(source_name.to_string()))?;
            let Workbook {
                directory,
                book,
                ranges,
                ..
            } = wb;
            directory.copy(source_index, new_name, &mut BookStore { book })?;
            let manager = ranges[source_index - 1].clone();
            ranges.push(manager);
            Ok(())
        })
    }

    pub fn sheets(&self) -> Vec<SheetInfo> {
        self.directory
            .records()
            .iter()
            .enumerate()
            .map(|(i, record)| SheetInfo {
                name: record.name().to_string(),
                index: i + 1,
                hidden: record.is_hidden(),
                protected: record.is_protected(),
            })
            .collect()
    }

    pub fn sheet_count(&self) -> usize {
        self.directory.sheet_count()
    }

    pub fn current_sheet_name(&self) -> &str {
        self.directory.current().name()
    }

    pub fn current_sheet(&mut self) -> WorksheetRef<'_> {
        let index = self.directory.current_index();
        WorksheetRef { wb: self, index }
    }

    // ----- row/column structure ---------------------------------------------

    pub fn insert_rows(&mut self, at: u32, count: u32) -> bool {
        self.run(|wb| {
            if count == 0 {
                return Ok(());
            }
            wb.current_ranges_mut().shift_rows(at, count as i32)?;
            let sheet = wb.current_backing_sheet()?;
            sheet.insert_new_row(&at, &count);
            Ok(())
        })
    }

    pub fn delete_rows(&mut self, at: u32, count: u32) -> bool {
        self.run(|wb| {
            if count == 0 {
                return Ok(());
            }
            wb.current_ranges_mut().shift_rows(at, -(count as i32))?;
            let sheet = wb.current_backing_sheet()?;
            sheet.remove_row(&at, &count);
            Ok(())
        })
    }

    pub fn insert_columns(&mut self, at: u32, count: u32) -> bool {
        self.run(|wb| {
            if count == 0 {
                return Ok(());
            }
            wb.current_ranges_mut().shift_cols(at, count as i32)?;
            let letters = addr::column_letters(at);
            let sheet = wb.current_backing_sheet()?;
            sheet.insert_new_column(&letters, &count);
            Ok(())
        })
    }

    pub fn delete_columns(&mut self, at: u32, count: u32) -> bool {
        self.run(|wb| {
            if count == 0 {
                return Ok(());
            }
            wb.current_ranges_mut().shift_cols(at, -(count as i32))?;
            let letters = addr::column_letters(at);
            let sheet = wb.current_backing_sheet()?;
            sheet.remove_column(&letters, &count);
            Ok(())
        })
    }

    pub fn set_row_hidden(&mut self, row: u32, hidden: bool) -> bool {
        self.run(|wb| {
            wb.current_ranges_mut().set_row_hidden(row, hidden)?;
            let sheet = wb.current_backing_sheet()?;
            sheet.get_row_dimension_mut(&row).set_hidden(hidden);
            Ok(())
        })
    }

    pub fn set_column_hidden(&mut self, col: u32, hidden: bool) -> bool {
        self.run(|wb| {
            wb.current_ranges_mut().set_col_hidden(col, hidden)?;
            let sheet = wb.current_backing_sheet()?;
            sheet
                .get_column_dimension_by_number_mut(&col)
                .set_hidden(hidden);
            Ok(())
        })
    }

    /// Authoritative merged regions of the current sheet, in merge order.
    pub fn merged_ranges(&self) -> &[CellRange] {
        self.current_ranges().ranges()
    }

    pub fn is_row_hidden(&self, row: u32) -> bool {
        self.current_ranges().is_row_hidden(row)
    }

    pub fn is_column_hidden(&self, col: u32) -> bool {
        self.current_ranges().is_col_hidden(col)
    }

    pub fn set_row_height(&mut self, row: u32, height: f64) -> bool {
        self.run(|wb| {
            if row == 0 {
                return Err(WorkbookError::IndexOutOfRange(
                    "row index must be 1-based".to_string(),
                ));
            }
            let sheet = wb.current_backing_sheet()?;
            sheet.get_row_dimension_mut(&row).set_height(height);
            Ok(())
        })
    }

    pub fn set_column_width(&mut self, col: u32, width: f64) -> bool {
        self.run(|wb| {
            if col == 0 {
                return Err(WorkbookError::IndexOutOfRange(
                    "column index must be 1-based".to_string(),
                ));
            }
            let sheet = wb.current_backing_sheet()?;
            sheet.get_column_dimension_by_number_mut(&col).set_width(width);
            Ok(())
        })
    }

    // ----- crate-internal plumbing ------------------------------------------

    pub(crate) fn fail(&mut self, err: WorkbookError) -> bool {
        tracing::warn!(error = %err, code = err.code(), "operation failed");
        self.errors
            .record(err.code(), self.context.messages.describe(&err));
        false
    }

    fn run(&mut self, op: impl FnOnce(&mut Self) -> Result<(), WorkbookError>) -> bool {
        match op(self) {
            Ok(()) => true,
            Err(err) => self.fail(err),
        }
    }

    pub(crate) fn merge_current(&mut self, range: CellRange) -> MergeOutcome {
        self.current_ranges_mut().merge(range)
    }

    fn current_ranges(&self) -> &RangeManager {
        &self.ranges[self.directory.current_index() - 1]
    }

    fn current_ranges_mut(&mut self) -> &mut RangeManager {
        let index = self.directory.current_index() - 1;
        &mut self.ranges[index]
    }

    fn current_backing_sheet(&mut self) -> Result<&mut umya_spreadsheet::Worksheet, WorkbookError> {
        let name = self.directory.current().name().to_string();
        self.book
            .get_sheet_by_name_mut(&name)
            .ok_or(WorkbookError::NotFound(name))
    }

    pub(crate) fn write_text(&mut self, row: u32, col: u32, text: &str) -> Result<(), WorkbookError> {
        let (row, col) = self.current_ranges().anchor_of(row, col);
        let sheet = self.current_backing_sheet()?;
        let cell = sheet.get_cell_mut((col, row));
        if let Some(formula) = text.strip_prefix('=') {
            cell.set_formula(formula.to_string());
            cell.get_cell_value_mut()
                .set_formula_result_default(String::new());
        } else {
            cell.set_value(text.to_string());
        }
        Ok(())
    }

    pub(crate) fn write_number(&mut self, row: u32, col: u32, value: f64) -> Result<(), WorkbookError> {
        let (row, col) = self.current_ranges().anchor_of(row, col);
        let sheet = self.current_backing_sheet()?;
        sheet.get_cell_mut((col, row)).set_value_number(value);
        Ok(())
    }

    pub(crate) fn write_date(
        &mut self,
        row: u32,
        col: u32,
        when: NaiveDateTime,
    ) -> Result<(), WorkbookError> {
        let (row, col) = self.current_ranges().anchor_of(row, col);
        let format = self.context.locale.date_format.clone();
        let sheet = self.current_backing_sheet()?;
        sheet.get_cell_mut((col, row)).set_value_number(excel_serial(when));
        sheet
            .get_style_mut((col, row))
            .get_number_format_mut()
            .set_format_code(format.as_str());
        Ok(())
    }

    pub(crate) fn apply_style(
        &mut self,
        row: u32,
        col: u32,
        style: &CellStyle,
    ) -> Result<(), WorkbookError> {
        let sheet = self.current_backing_sheet()?;
        style.apply_to(sheet.get_style_mut((col, row)));
        Ok(())
    }

    pub(crate) fn read_text(&self, row: u32, col: u32) -> Option<String> {
        let (row, col) = self.current_ranges().anchor_of(row, col);
        let sheet = self.book.get_sheet_by_name(self.directory.current().name())?;
        sheet
            .get_cell((col, row))
            .map(|cell| cell.get_value().to_string())
    }

    pub(crate) fn read_date(&self, row: u32, col: u32) -> Option<NaiveDateTime> {
        let raw = self.read_text(row, col)?;
        let serial: f64 = raw.trim().parse().ok()?;
        from_excel_serial(serial)
    }

    /// Rewrites every sheet's merged-region list from its range manager.
    fn sync_merges(&mut self) {
        for (i, manager) in self.ranges.iter().enumerate() {
            let Some(record) = self.directory.get(i + 1) else {
                continue;
            };
            let Some(sheet) = self.book.get_sheet_by_name_mut(record.name()) else {
                continue;
            };
            sheet.get_merge_cells_mut().clear();
            for range in manager.ranges() {
                sheet.add_merge_cells(range.to_a1());
            }
        }
    }

    fn apply_autofit(&mut self) {
        let names: Vec<String> = self
            .directory
            .records()
            .iter()
            .map(|record| record.name().to_string())
            .collect();
        for name in names {
            let Some(sheet) = self.book.get_sheet_by_name_mut(&name) else {
                continue;
            };
            let mut populated: BTreeSet<u32> = BTreeSet::new();
            for cell in sheet.get_cell_collection() {
                populated.insert(*cell.get_coordinate().get_col_num());
            }
            for col in &populated {
                sheet
                    .get_column_dimension_by_number_mut(col)
                    .set_auto_width(true);
            }
            sheet.calculation_auto_width();
            for col in &populated {
                let col_dim = sheet.get_column_dimension_by_number_mut(col);
                col_dim.set_auto_width(false);
                col_dim.set_best_fit(true);
                let width = (*col_dim.get_width()).clamp(MIN_COLUMN_WIDTH, MAX_COLUMN_WIDTH);
                col_dim.set_width(width);
            }
        }
    }
}

/// Borrowed handle over one sheet of an open workbook, addressed by its
/// directory index.
pub struct WorksheetRef<'a> {
    wb: &'a mut Workbook,
    index: usize,
}

impl WorksheetRef<'_> {
    pub fn name(&self) -> String {
        self.wb
            .directory
            .get(self.index)
            .map(|record| record.name().to_string())
            .unwrap_or_default()
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn is_hidden(&self) -> bool {
        self.wb
            .directory
            .get(self.index)
            .map(SheetRecord::is_hidden)
            .unwrap_or(false)
    }

    pub fn set_hidden(&mut self, hidden: bool) -> bool {
        let index = self.index;
        self.wb.run(|wb| wb.directory.set_hidden(index, hidden))
    }

    pub fn is_protected(&self) -> bool {
        self.wb
            .directory
            .get(self.index)
            .map(SheetRecord::is_protected)
            .unwrap_or(false)
    }

    /// Flags the sheet as protected. Only a digest of the password is kept;
    /// enforcement belongs to the storage backend.
    pub fn set_protected(&mut self, password: &str) -> bool {
        let index = self.index;
        self.wb.run(|wb| wb.directory.set_protected(index, password))
    }

    pub fn rename(&mut self, new_name: &str) -> bool {
        self.wb.rename_sheet(self.index as u32, new_name)
    }

    pub fn copy(&mut self, new_name: &str) -> bool {
        let source = self.name();
        self.wb.clone_sheet(&source, new_name)
    }
}

/// [`CellStore`] view over the umya model, handed to the directory for deep
/// copies so the bookkeeping layer never touches cell payloads directly.
struct BookStore<'a> {
    book: &'a mut Spreadsheet,
}

impl CellStore for BookStore<'_> {
    fn content(&self, sheet: &str, row: u32, col: u32) -> Option<String> {
        self.book
            .get_sheet_by_name(sheet)?
            .get_cell((col, row))
            .map(|cell| cell.get_value().to_string())
    }

    fn set_content(
        &mut self,
        sheet: &str,
        row: u32,
        col: u32,
        value: &str,
    ) -> Result<(), WorkbookError> {
        let worksheet = self
            .book
            .get_sheet_by_name_mut(sheet)
            .ok_or_else(|| WorkbookError::NotFound(sheet.to_string()))?;
        worksheet.get_cell_mut((col, row)).set_value(value.to_string());
        Ok(())
    }

    fn copy_region(
        &mut self,
        source_sheet: &str,
        target_sheet: &str,
    ) -> Result<(), WorkbookError> {
        if self.book.get_sheet_by_name(target_sheet).is_none() {
            self.book
                .new_sheet(target_sheet)
                .map_err(|_| WorkbookError::DuplicateName(target_sheet.to_string()))?;
        }

        let (src_index, dst_index) = {
            let sheets = self.book.get_sheet_collection_no_check();
            let src = sheets
                .iter()
                .position(|s| s.get_name() == source_sheet)
                .ok_or_else(|| WorkbookError::NotFound(source_sheet.to_string()))?;
            let dst = sheets
                .iter()
                .position(|s| s.get_name() == target_sheet)
                .ok_or_else(|| WorkbookError::NotFound(target_sheet.to_string()))?;
            (src, dst)
        };

        let sheets = self.book.get_sheet_collection_mut();
        let (src, dst) = if src_index < dst_index {
            let (left, right) = sheets.split_at_mut(dst_index);
            (&left[src_index], &mut right[0])
        } else {
            let (left, right) = sheets.split_at_mut(src_index);
            (&right[0], &mut left[dst_index])
        };

        for cell in src.get_cell_collection() {
            let col = *cell.get_coordinate().get_col_num();
            let row = *cell.get_coordinate().get_row_num();
            let style = cell.get_style().clone();
            let formula = if cell.is_formula() {
                Some(cell.get_formula().to_string())
            } else {
                None
            };
            let value = cell.get_value().to_string();

            let target = dst.get_cell_mut((col, row));
            target.set_style(style);
            target.get_cell_value_mut().remove_formula();
            if let Some(formula) = formula {
                target.set_formula(formula);
                target.set_formula_result_default("");
            } else {
                target.set_value(value);
            }
        }
        Ok(())
    }

    fn row_count(&self, sheet: &str) -> u32 {
        let Some(worksheet) = self.book.get_sheet_by_name(sheet) else {
            return 0;
        };
        let mut max_row = 0;
        for cell in worksheet.get_cell_collection() {
            max_row = max_row.max(*cell.get_coordinate().get_row_num());
        }
        max_row
    }

    fn col_count(&self, sheet: &str) -> u32 {
        let Some(worksheet) = self.book.get_sheet_by_name(sheet) else {
            return 0;
        };
        let mut max_col = 0;
        for cell in worksheet.get_cell_collection() {
            max_col = max_col.max(*cell.get_coordinate().get_col_num());
        }
        max_col
    }
}

fn fresh_document() -> (Spreadsheet, SheetDirectory, Vec<RangeManager>) {
    (
        umya_spreadsheet::new_file(),
        SheetDirectory::new(DEFAULT_SHEET_NAME),
        vec![RangeManager::new()],
    )
}

fn normalize_extension(path: &Path) -> PathBuf {
    if path.extension().is_some() {
        path.to_path_buf()
    } else {
        path.with_extension(DEFAULT_EXTENSION)
    }
}

fn load_book(path: &Path) -> Result<Option<Spreadsheet>, WorkbookError> {
    if !path.exists() {
        return Ok(None);
    }
    check_not_locked(path)?;
    let book = umya_spreadsheet::reader::xlsx::read(path).map_err(|err| {
        WorkbookError::Io(format!("failed to read '{}': {err}", path.display()))
    })?;
    Ok(Some(book))
}

fn check_not_locked(path: &Path) -> Result<(), WorkbookError> {
    let file = File::open(path).map_err(|err| WorkbookError::Io(err.to_string()))?;
    match file.try_lock() {
        Ok(()) => Ok(()),
        Err(std::fs::TryLockError::WouldBlock) => Err(WorkbookError::FileLocked),
        Err(std::fs::TryLockError::Error(err)) => Err(WorkbookError::Io(err.to_string())),
    }
}

fn seed_from_book(book: &Spreadsheet) -> Result<(SheetDirectory, Vec<RangeManager>), WorkbookError> {
    let mut records = Vec::new();
    let mut ranges = Vec::new();
    for sheet in book.get_sheet_collection() {
        records.push(SheetRecord::new(sheet.get_name()));
        let mut manager = RangeManager::new();
        for merged in sheet.get_merge_cells() {
            let Ok(((col_start, row_start), (col_end, row_end))) =
                addr::parse_range(&merged.get_range())
            else {
                continue;
            };
            if let Ok(range) = CellRange::new(row_start, row_end, col_start, col_end) {
                manager.merge(range);
            }
        }
        ranges.push(manager);
    }
    let directory = SheetDirectory::seed(records)?;
    Ok((directory, ranges))
}

/// Days (with a time fraction) since the 1900 date system epoch.
fn excel_serial(when: NaiveDateTime) -> f64 {
    let epoch = NaiveDate::from_ymd_opt(1899, 12, 30).expect("fixed epoch");
    let days = when.date().signed_duration_since(epoch).num_days() as f64;
    let seconds = when.time().num_seconds_from_midnight() as f64;
    days + seconds / 86_400.0
}

fn from_excel_serial(serial: f64) -> Option<NaiveDateTime> {
    let epoch = NaiveDate::from_ymd_opt(1899, 12, 30)?;
    let days = serial.floor() as i64;
    let seconds = ((serial - serial.floor()) * 86_400.0).round() as i64;
    let date = epoch.checked_add_signed(Duration::days(days))?;
    date.and_hms_opt(0, 0, 0)?
        .checked_add_signed(Duration::seconds(seconds))
}
