#![allow(dead_code)]

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Once;
use tempfile::TempDir;
use umya_spreadsheet::Spreadsheet;
use workbook_kit::{CellStore, WorkbookError};

static TRACING: Once = Once::new();

pub fn init_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

/// Temp directory holding workbook files for one test.
pub struct TestWorkspace {
    root: TempDir,
}

impl TestWorkspace {
    pub fn new() -> Self {
        init_tracing();
        Self {
            root: TempDir::new().expect("create test workspace"),
        }
    }

    pub fn root(&self) -> &Path {
        self.root.path()
    }

    pub fn path(&self, name: &str) -> PathBuf {
        self.root.path().join(name)
    }

    /// Materializes a fixture workbook through the backing model directly,
    /// bypassing the facade under test.
    pub fn create_workbook(&self, name: &str, build: impl FnOnce(&mut Spreadsheet)) -> PathBuf {
        let mut book = umya_spreadsheet::new_file();
        build(&mut book);
        let path = self.path(name);
        umya_spreadsheet::writer::xlsx::write(&book, &path).expect("write fixture workbook");
        path
    }

    pub fn read_workbook(&self, path: &Path) -> Spreadsheet {
        umya_spreadsheet::reader::xlsx::read(path).expect("read workbook fixture")
    }
}

/// In-memory [`CellStore`] so directory tests can observe deep copies
/// without a backing file.
#[derive(Debug, Default)]
pub struct MemoryStore {
    sheets: BTreeMap<String, BTreeMap<(u32, u32), String>>,
}

impl MemoryStore {
    pub fn with_sheet(name: &str, cells: &[(u32, u32, &str)]) -> Self {
        let mut store = Self::default();
        store.sheets.insert(
            name.to_string(),
            cells
                .iter()
                .map(|&(row, col, value)| ((row, col), value.to_string()))
                .collect(),
        );
        store
    }

    pub fn add_sheet(&mut self, name: &str) {
        self.sheets.entry(name.to_string()).or_default();
    }

    pub fn sheet_names(&self) -> Vec<&str> {
        self.sheets.keys().map(String::as_str).collect()
    }
}

impl CellStore for MemoryStore {
    fn content(&self, sheet: &str, row: u32, col: u32) -> Option<String> {
        self.sheets.get(sheet)?.get(&(row, col)).cloned()
    }

    fn set_content(
        &mut self,
        sheet: &str,
        row: u32,
        col: u32,
        value: &str,
    ) -> Result<(), WorkbookError> {
        let cells = self
            .sheets
            .get_mut(sheet)
            .ok_or_else(|| WorkbookError::NotFound(sheet.to_string()))?;
        cells.insert((row, col), value.to_string());
        Ok(())
    }

    fn copy_region(&mut self, source_sheet: &str, target_sheet: &str) -> Result<(), WorkbookError> {
        let cells = self
            .sheets
            .get(source_sheet)
            .ok_or_else(|| WorkbookError::NotFound(source_sheet.to_string()))?
            .clone();
        self.sheets.insert(target_sheet.to_string(), cells);
        Ok(())
    }

    fn row_count(&self, sheet: &str) -> u32 {
        self.sheets
            .get(sheet)
            .and_then(|cells| cells.keys().map(|&(row, _)| row).max())
            .unwrap_or(0)
    }

    fn col_count(&self, sheet: &str) -> u32 {
        self.sheets
            .get(sheet)
            .and_then(|cells| cells.keys().map(|&(_, col)| col).max())
            .unwrap_or(0)
    }
}
