//! Ordered, uniquely-named sheet bookkeeping for one document.

use crate::errors::WorkbookError;
use crate::store::CellStore;
use sha2::{Digest, Sha256};

#[derive(Debug, Clone)]
pub struct SheetRecord {
    name: String,
    hidden: bool,
    /// SHA-256 of the protection password when the sheet is protected.
    protection: Option<String>,
}

impl SheetRecord {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            hidden: false,
            protection: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_hidden(&self) -> bool {
        self.hidden
    }

    pub fn is_protected(&self) -> bool {
        self.protection.is_some()
    }
}

/// Ordered collection of uniquely-named sheets plus the "current sheet"
/// pointer. Indices are 1-based and contiguous; every structural edit keeps
/// them that way. Cell payloads are delegated to a [`CellStore`].
#[derive(Debug, Clone)]
pub struct SheetDirectory {
    sheets: Vec<SheetRecord>,
    /// 0-based position of the current sheet.
    current: usize,
}

impl SheetDirectory {
    pub fn new(default_name: impl Into<String>) -> Self {
        Self {
            sheets: vec![SheetRecord::new(default_name)],
            current: 0,
        }
    }

    /// Rebuilds a directory from an already-open document. The first sheet
    /// becomes current.
    pub fn seed<I>(records: I) -> Result<Self, WorkbookError>
    where
        I: IntoIterator<Item = SheetRecord>,
    {
        let sheets: Vec<SheetRecord> = records.into_iter().collect();
        assert!(!sheets.is_empty(), "a document always has at least one sheet");
        for (i, record) in sheets.iter().enumerate() {
            if sheets[..i].iter().any(|other| other.name == record.name) {
                return Err(WorkbookError::DuplicateName(record.name.clone()));
            }
        }
        Ok(Self { sheets, current: 0 })
    }

    pub fn sheet_count(&self) -> usize {
        self.sheets.len()
    }

    pub fn records(&self) -> &[SheetRecord] {
        &self.sheets
    }

    pub fn get(&self, index: usize) -> Option<&SheetRecord> {
        if index == 0 {
            return None;
        }
        self.sheets.get(index - 1)
    }

    /// 1-based index of the named sheet.
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.sheets
            .iter()
            .position(|record| record.name == name)
            .map(|zero_based| zero_based + 1)
    }

    /// 1-based index of the current sheet.
    pub fn current_index(&self) -> usize {
        self.current + 1
    }

    pub fn current(&self) -> &SheetRecord {
        &self.sheets[self.current]
    }

    /// Appends a new sheet and makes it current.
    pub fn insert(&mut self, name: &str) -> Result<usize, WorkbookError> {
        self.validate_new_name(name)?;
        self.sheets.push(SheetRecord::new(name));
        self.current = self.sheets.len() - 1;
        Ok(self.sheets.len())
    }

    /// Removes the sheet at `index`; later sheets shift down by one. The
    /// last remaining sheet cannot be removed.
    pub fn delete(&mut self, index: usize) -> Result<SheetRecord, WorkbookError> {
        self.check_index(index)?;
        if self.sheets.len() == 1 {
            return Err(WorkbookError::IndexOutOfRange(
                "cannot delete the last remaining sheet".to_string(),
            ));
        }
        let removed = self.sheets.remove(index - 1);
        if self.current + 1 > self.sheets.len() {
            self.current = self.sheets.len() - 1;
        } else if self.current >= index {
            self.current -= 1;
        }
        Ok(removed)
    }

    pub fn rename(&mut self, index: usize, new_name: &str) -> Result<(), WorkbookError> {
        self.check_index(index)?;
        if self.sheets[index - 1].name == new_name {
            return Ok(());
        }
        self.validate_new_name(new_name)?;
        self.sheets[index - 1].name = new_name.to_string();
        Ok(())
    }

    pub fn set_current(&mut self, index: usize) -> Result<(), WorkbookError> {
        self.check_index(index)?;
        self.current = index - 1;
        Ok(())
    }

    pub fn set_current_by_name(&mut self, name: &str) -> Result<usize, WorkbookError> {
        let index = self
            .index_of(name)
            .ok_or_else(|| WorkbookError::NotFound(name.to_string()))?;
        self.current = index - 1;
        Ok(index)
    }

    pub fn set_hidden(&mut self, index: usize, hidden: bool) -> Result<(), WorkbookError> {
        self.check_index(index)?;
        self.sheets[index - 1].hidden = hidden;
        Ok(())
    }

    /// Marks the sheet protected, keeping only a digest of the password for
    /// the storage backend to consume at save time.
    pub fn set_protected(&mut self, index: usize, password: &str) -> Result<(), WorkbookError> {
        self.check_index(index)?;
        let digest = Sha256::digest(password.as_bytes());
        self.sheets[index - 1].protection = Some(format!("{digest:x}"));
        Ok(())
    }

    /// Copies the sheet at `index` under `new_name`, appending the copy at
    /// the end. Cell contents are duplicated through the store; the current
    /// pointer is untouched.
    pub fn copy(
        &mut self,
        index: usize,
        new_name: &str,
        store: &mut dyn CellStore,
    ) -> Result<usize, WorkbookError> {
        self.check_index(index)?;
        self.validate_new_name(new_name)?;
        let source = self.sheets[index - 1].clone();
        store.copy_region(&source.name, new_name)?;
        self.sheets.push(SheetRecord {
            name: new_name.to_string(),
            hidden: false,
            protection: source.protection,
        });
        Ok(self.sheets.len())
    }

    /// Same as [`copy`](Self::copy), addressed by source name.
    pub fn clone_sheet(
        &mut self,
        source_name: &str,
        new_name: &str,
        store: &mut dyn CellStore,
    ) -> Result<usize, WorkbookError> {
        let index = self
            .index_of(source_name)
            .ok_or_else(|| WorkbookError::NotFound(source_name.to_string()))?;
        self.copy(index, new_name, store)
    }

    fn check_index(&self, index: usize) -> Result<(), WorkbookError> {
        if index == 0 || index > self.sheets.len() {
            return Err(WorkbookError::IndexOutOfRange(format!(
                "sheet index {index} (have {})",
                self.sheets.len()
            )));
        }
        Ok(())
    }

    fn validate_new_name(&self, name: &str) -> Result<(), WorkbookError> {
        if name.is_empty() {
            return Err(WorkbookError::InvalidName("name is empty".to_string()));
        }
        if self.sheets.iter().any(|record| record.name == name) {
            tracing::warn!(name, "rejected duplicate sheet name");
            return Err(WorkbookError::DuplicateName(name.to_string()));
        }
        Ok(())
    }
}
