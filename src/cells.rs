//! Origin+span cursor over a rectangle of the current sheet.

use crate::errors::WorkbookError;
use crate::ranges::CellRange;
use crate::style::{CellStyle, stable_style_id};
use crate::workbook::Workbook;
use chrono::NaiveDateTime;

/// Cursor returned by [`Workbook::cells`]. Writers touch every cell in the
/// rectangle; cells covered by a merged region are redirected to the
/// region's anchor. Readers resolve the rectangle's top-left cell the same
/// way. A cursor created from an invalid rectangle is inert: every write
/// returns `false` and reads come back empty.
pub struct Cells<'a> {
    wb: &'a mut Workbook,
    bounds: Option<CellRange>,
}

impl<'a> Cells<'a> {
    pub(crate) fn new(wb: &'a mut Workbook, bounds: Option<CellRange>) -> Self {
        Self { wb, bounds }
    }

    pub fn row_start(&self) -> u32 {
        self.bounds.map(|b| b.row_start()).unwrap_or(0)
    }

    pub fn row_end(&self) -> u32 {
        self.bounds.map(|b| b.row_end()).unwrap_or(0)
    }

    pub fn col_start(&self) -> u32 {
        self.bounds.map(|b| b.col_start()).unwrap_or(0)
    }

    pub fn col_end(&self) -> u32 {
        self.bounds.map(|b| b.col_end()).unwrap_or(0)
    }

    pub fn address(&self) -> String {
        self.bounds.map(|b| b.to_a1()).unwrap_or_default()
    }

    /// Declares the rectangle a merged region. The newest merge displaces any
    /// overlapping earlier ones; repeating an identical merge is a no-op
    /// success.
    pub fn merge(&mut self) -> bool {
        let Some(bounds) = self.bounds else {
            return false;
        };
        self.wb.merge_current(bounds);
        true
    }

    /// Writes text into every cell. A leading `=` marks a formula.
    pub fn set_text(&mut self, text: &str) -> bool {
        self.write_each(|wb, row, col| wb.write_text(row, col, text))
    }

    pub fn set_number(&mut self, value: f64) -> bool {
        self.write_each(|wb, row, col| wb.write_number(row, col, value))
    }

    /// Writes a date as a serial number and stamps the context's date format
    /// on the cells.
    pub fn set_date(&mut self, when: NaiveDateTime) -> bool {
        self.write_each(|wb, row, col| wb.write_date(row, col, when))
    }

    pub fn set_style(&mut self, style: &CellStyle) -> bool {
        let Some(bounds) = self.bounds else {
            return false;
        };
        tracing::debug!(
            style = %stable_style_id(style),
            range = %bounds.to_a1(),
            "applying cell style"
        );
        self.write_each(|wb, row, col| wb.apply_style(row, col, style))
    }

    /// Text of the rectangle's top-left cell (through its merge anchor, if
    /// any). Empty when the cell has never been written.
    pub fn text(&self) -> String {
        let Some(bounds) = self.bounds else {
            return String::new();
        };
        self.wb
            .read_text(bounds.row_start(), bounds.col_start())
            .unwrap_or_default()
    }

    /// Numeric value of the top-left cell, `0.0` when absent or not a
    /// number.
    pub fn number(&self) -> f64 {
        self.text().trim().parse().unwrap_or(0.0)
    }

    pub fn date(&self) -> Option<NaiveDateTime> {
        let bounds = self.bounds?;
        self.wb.read_date(bounds.row_start(), bounds.col_start())
    }

    fn write_each(
        &mut self,
        op: impl Fn(&mut Workbook, u32, u32) -> Result<(), WorkbookError>,
    ) -> bool {
        let Some(bounds) = self.bounds else {
            return false;
        };
        for row in bounds.row_start()..=bounds.row_end() {
            for col in bounds.col_start()..=bounds.col_end() {
                if let Err(err) = op(self.wb, row, col) {
                    return self.wb.fail(err);
                }
            }
        }
        true
    }
}
