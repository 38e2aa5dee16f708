//! Per-file record of registrations, so a re-parsed file can retract what
//! it added.

use strix_core::MultiMap;
use strix_types::{
    FullyQualifiedClassConstantName, FullyQualifiedClassName, FullyQualifiedFunctionName,
    FullyQualifiedGlobalConstantName, FullyQualifiedMethodName, FullyQualifiedPropertyName,
};

/// One registration that can be retracted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UndoEntry {
    Class(FullyQualifiedClassName),
    Method(FullyQualifiedMethodName),
    Property(FullyQualifiedPropertyName),
    ClassConstant(FullyQualifiedClassConstantName),
    Function(FullyQualifiedFunctionName),
    GlobalConstant(FullyQualifiedGlobalConstantName),
}

#[derive(Debug, Default)]
pub struct UndoLog {
    current_file: Option<String>,
    entries: MultiMap<String, UndoEntry>,
}

impl UndoLog {
    pub fn set_current_file(&mut self, file: Option<&str>) {
        self.current_file = file.map(str::to_string);
    }

    pub fn current_file(&self) -> Option<&str> {
        self.current_file.as_deref()
    }

    /// Attribute `entry` to the current file. Registrations made while no
    /// file is current are permanent.
    pub fn record(&mut self, entry: UndoEntry) {
        if let Some(file) = &self.current_file {
            self.entries.insert(file.clone(), entry);
        }
    }

    /// Take the entries recorded for `file`, most recent first.
    pub fn take_file(&mut self, file: &str) -> Option<Vec<UndoEntry>> {
        let mut entries = self.entries.remove(&file.to_string())?;
        entries.reverse();
        Some(entries)
    }

    pub fn file_count(&self) -> usize {
        self.entries.len()
    }
}
