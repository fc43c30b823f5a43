use super::{ChangedFiles, Transaction};
use anyhow::{Result, anyhow};
use indexmap::IndexMap;
use std::cell::Cell;
use std::rc::Rc;

#[derive(Debug, Clone)]
struct MemoryFile {
    kind: String,
    contents: Vec<u8>,
}

/// A transaction held entirely in memory, for tests and dry runs.
#[derive(Debug, Clone)]
pub struct MemoryTransaction {
    files: IndexMap<String, MemoryFile>,
    message: String,
    user: String,
    revision: String,
    cleanups: Rc<Cell<usize>>,
}

impl Default for MemoryTransaction {
    fn default() -> Self {
        Self {
            files: IndexMap::new(),
            message: String::new(),
            user: "hookwarden".to_string(),
            revision: "0".to_string(),
            cleanups: Rc::new(Cell::new(0)),
        }
    }
}

impl MemoryTransaction {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn file(mut self, path: &str, kind: &str, contents: impl Into<Vec<u8>>) -> Self {
        self.files.insert(
            path.to_string(),
            MemoryFile {
                kind: kind.to_string(),
                contents: contents.into(),
            },
        );
        self
    }

    pub fn message(mut self, message: &str) -> Self {
        self.message = message.to_string();
        self
    }

    pub fn user(mut self, user: &str) -> Self {
        self.user = user.to_string();
        self
    }

    pub fn revision(mut self, revision: &str) -> Self {
        self.revision = revision.to_string();
        self
    }

    /// Shared counter incremented by every [`Transaction::cleanup`] call.
    pub fn cleanup_counter(&self) -> Rc<Cell<usize>> {
        Rc::clone(&self.cleanups)
    }
}

impl Transaction for MemoryTransaction {
    fn changed_files(&self) -> Result<ChangedFiles> {
        Ok(self
            .files
            .iter()
            .map(|(path, file)| (path.clone(), file.kind.clone()))
            .collect())
    }

    fn file_contents(&self, path: &str) -> Result<Vec<u8>> {
        self.files
            .get(path)
            .map(|file| file.contents.clone())
            .ok_or_else(|| anyhow!("File not in transaction: {path}"))
    }

    fn commit_msg(&self) -> Result<String> {
        Ok(self.message.clone())
    }

    fn user_id(&self) -> Result<String> {
        Ok(self.user.clone())
    }

    fn revision(&self) -> Result<String> {
        Ok(self.revision.clone())
    }

    fn cleanup(&self) -> Result<()> {
        self.cleanups.set(self.cleanups.get() + 1);
        Ok(())
    }
}
