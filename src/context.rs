//! Per-document context threaded explicitly through the facade instead of
//! process-wide statics, so two open documents never share mutable state.

use crate::errors::{
    ERR_DUPLICATE_NAME, ERR_FILE_LOCKED, ERR_INDEX_OUT_OF_RANGE, ERR_INVALID_RANGE, ERR_IO,
    ERR_NOT_FOUND, WorkbookError,
};
use indexmap::IndexMap;
use once_cell::sync::Lazy;

static DEFAULT_MESSAGES: Lazy<IndexMap<i32, &'static str>> = Lazy::new(|| {
    IndexMap::from([
        (ERR_INVALID_RANGE, "Invalid range"),
        (ERR_INDEX_OUT_OF_RANGE, "Index out of range"),
        (ERR_DUPLICATE_NAME, "A sheet with that name already exists"),
        (ERR_NOT_FOUND, "Sheet not found"),
        (ERR_IO, "Could not read or write the document"),
        (ERR_FILE_LOCKED, "File is locked"),
    ])
});

/// Maps error codes to caller-facing descriptions. Entries can be replaced
/// wholesale for localization; codes without an entry fall back to the
/// error's own display text.
#[derive(Debug, Clone, Default)]
pub struct MessageCatalog {
    overrides: IndexMap<i32, String>,
}

impl MessageCatalog {
    pub fn set(&mut self, code: i32, message: impl Into<String>) {
        self.overrides.insert(code, message.into());
    }

    pub fn describe(&self, error: &WorkbookError) -> String {
        let code = error.code();
        if let Some(message) = self.overrides.get(&code) {
            return message.clone();
        }
        match DEFAULT_MESSAGES.get(&code) {
            Some(message) => (*message).to_string(),
            None => error.to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct LocaleSettings {
    /// Number format code applied to cells written through the date setters.
    pub date_format: String,
}

impl Default for LocaleSettings {
    fn default() -> Self {
        Self {
            date_format: "yyyy-mm-dd hh:mm:ss".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct DocumentContext {
    pub locale: LocaleSettings,
    pub messages: MessageCatalog,
}
