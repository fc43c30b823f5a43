//! Access to the changes a hook is running against
//!
//! A [`Transaction`] is the version-control side: which files changed, their
//! contents and the commit metadata. A [`Changeset`] wraps one for the
//! duration of a run and adds the current profile's file view, pattern
//! filtering and a temporary directory for checks that need real files.

mod git;
mod memory;

pub use git::GitTransaction;
pub use memory::MemoryTransaction;

use crate::matcher::ProfileScope;
use anyhow::{Context, Result};
use indexmap::IndexMap;
use regex::Regex;
use std::cell::RefCell;
use std::path::{Component, Path, PathBuf};
use tempfile::TempDir;
use tracing::debug;

/// Changed paths mapped to their change kind (`A`, `U`, `D`).
pub type ChangedFiles = IndexMap<String, String>;

pub trait Transaction {
    /// Every path touched by the transaction.
    fn changed_files(&self) -> Result<ChangedFiles>;

    /// Contents of `path` as committed (or staged).
    fn file_contents(&self, path: &str) -> Result<Vec<u8>>;

    fn file_exists(&self, path: &str) -> Result<bool> {
        Ok(self
            .changed_files()?
            .get(path)
            .is_some_and(|kind| kind != "D"))
    }

    fn commit_msg(&self) -> Result<String>;

    fn user_id(&self) -> Result<String>;

    fn revision(&self) -> Result<String>;

    /// Release resources held by the transaction.
    fn cleanup(&self) -> Result<()> {
        Ok(())
    }
}

pub struct Changeset {
    txn: Box<dyn Transaction>,
    scope: ProfileScope,
    files: RefCell<Option<ChangedFiles>>,
    tmpdir: RefCell<Option<TempDir>>,
}

impl Changeset {
    pub fn new(txn: impl Transaction + 'static) -> Self {
        Self {
            txn: Box::new(txn),
            scope: ProfileScope::all(),
            files: RefCell::new(None),
            tmpdir: RefCell::new(None),
        }
    }

    pub fn transaction(&self) -> &dyn Transaction {
        self.txn.as_ref()
    }

    pub fn scope(&self) -> &ProfileScope {
        &self.scope
    }

    /// Restrict the file view to one profile.
    pub fn set_scope(&mut self, scope: ProfileScope) {
        self.scope = scope;
    }

    /// Every changed file, ignoring the profile scope. Cached for the run.
    pub fn all_files(&self) -> Result<ChangedFiles> {
        if let Some(files) = self.files.borrow().as_ref() {
            return Ok(files.clone());
        }
        let files = self
            .txn
            .changed_files()
            .context("Failed to list changed files")?;
        debug!(count = files.len(), "Loaded changed files");
        *self.files.borrow_mut() = Some(files.clone());
        Ok(files)
    }

    /// Every changed file in the current scope.
    pub fn files(&self) -> Result<ChangedFiles> {
        Ok(self
            .all_files()?
            .into_iter()
            .filter(|(path, _)| self.scope.matches(path))
            .collect())
    }

    /// Files in the current scope matching any of `check` and none of `ignore`.
    pub fn get_files(&self, check: &[Regex], ignore: &[Regex]) -> Result<ChangedFiles> {
        Ok(self
            .all_files()?
            .into_iter()
            .filter(|(path, _)| {
                self.scope.matches(path)
                    && check.iter().any(|pattern| pattern.is_match(path))
                    && !ignore.iter().any(|pattern| pattern.is_match(path))
            })
            .collect())
    }

    /// [`Changeset::get_files`] with patterns given as strings.
    pub fn get_files_matching(&self, check: &[String], ignore: &[String]) -> Result<ChangedFiles> {
        self.get_files(&compile_all(check)?, &compile_all(ignore)?)
    }

    /// Whether the current scope holds any changed file.
    pub fn has_files(&self) -> Result<bool> {
        Ok(self
            .all_files()?
            .keys()
            .any(|path| self.scope.matches(path)))
    }

    pub fn file_contents(&self, path: &str) -> Result<Vec<u8>> {
        self.txn
            .file_contents(path)
            .with_context(|| format!("Failed to read contents of {path}"))
    }

    /// Write `path` into the run's temporary directory and return its location.
    pub fn get_file(&self, path: &str) -> Result<PathBuf> {
        let relative = safe_relative(path)?;
        let base = {
            let mut tmpdir = self.tmpdir.borrow_mut();
            match tmpdir.as_ref() {
                Some(dir) => dir.path().to_path_buf(),
                None => {
                    let dir = tempfile::Builder::new()
                        .prefix("hookwarden-")
                        .tempdir()
                        .context("Failed to create temporary directory")?;
                    debug!(path = %dir.path().display(), "Created temporary directory");
                    let base = dir.path().to_path_buf();
                    *tmpdir = Some(dir);
                    base
                }
            }
        };

        let target = base.join(relative);
        if !target.exists() {
            if let Some(parent) = target.parent() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create {}", parent.display()))?;
            }
            std::fs::write(&target, self.file_contents(path)?)
                .with_context(|| format!("Failed to write {}", target.display()))?;
        }
        Ok(target)
    }

    pub fn commit_msg(&self) -> Result<String> {
        self.txn.commit_msg()
    }

    pub fn user_id(&self) -> Result<String> {
        self.txn.user_id()
    }

    pub fn revision(&self) -> Result<String> {
        self.txn.revision()
    }

    /// Remove the temporary directory and release the transaction.
    pub fn cleanup(&self) -> Result<()> {
        if let Some(dir) = self.tmpdir.borrow_mut().take() {
            let path = dir.path().to_path_buf();
            dir.close()
                .with_context(|| format!("Failed to remove {}", path.display()))?;
            debug!(path = %path.display(), "Removed temporary directory");
        }
        self.txn.cleanup()
    }
}

fn compile_all(patterns: &[String]) -> Result<Vec<Regex>> {
    patterns
        .iter()
        .map(|pattern| Regex::new(pattern).with_context(|| format!("Invalid file pattern '{pattern}'")))
        .collect()
}

fn safe_relative(path: &str) -> Result<&Path> {
    let relative = Path::new(path);
    if relative
        .components()
        .all(|component| matches!(component, Component::Normal(_) | Component::CurDir))
    {
        Ok(relative)
    } else {
        anyhow::bail!("Refusing to materialize path outside the repository: {path}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn changeset() -> Changeset {
        Changeset::new(
            MemoryTransaction::new()
                .file("src/main.py", "A", "print('hi')\n")
                .file("src/util.py", "U", "x = 1\n")
                .file("docs/readme.txt", "U", "docs\n")
                .file("old.py", "D", ""),
        )
    }

    #[test]
    fn test_get_files_filters_by_patterns() {
        let changeset = changeset();
        let files = changeset
            .get_files_matching(&[r"\.py$".to_string()], &["^src/util".to_string()])
            .unwrap();
        let paths: Vec<&str> = files.keys().map(String::as_str).collect();
        assert_eq!(paths, vec!["src/main.py", "old.py"]);
        assert_eq!(files["old.py"], "D");
    }

    #[test]
    fn test_scope_restricts_view() {
        let mut changeset = changeset();
        changeset.set_scope(ProfileScope::new(Regex::new("^docs/").unwrap(), None));
        let files = changeset.get_files_matching(&[".*".to_string()], &[]).unwrap();
        assert_eq!(files.len(), 1);
        assert!(changeset.has_files().unwrap());

        changeset.set_scope(ProfileScope::new(Regex::new("^nothing/").unwrap(), None));
        assert!(!changeset.has_files().unwrap());
    }

    #[test]
    fn test_get_file_materializes_and_cleanup_removes() {
        let txn = MemoryTransaction::new().file("src/main.py", "A", "print('hi')\n");
        let counter = txn.cleanup_counter();
        let changeset = Changeset::new(txn);

        let path = changeset.get_file("src/main.py").unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "print('hi')\n");

        changeset.cleanup().unwrap();
        assert!(!path.exists());
        assert_eq!(counter.get(), 1);
    }

    #[test]
    fn test_get_file_rejects_escaping_paths() {
        let changeset = changeset();
        assert!(changeset.get_file("../etc/passwd").is_err());
        assert!(changeset.get_file("/etc/passwd").is_err());
    }

    #[test]
    fn test_file_exists() {
        let changeset = changeset();
        assert!(changeset.transaction().file_exists("src/main.py").unwrap());
        assert!(!changeset.transaction().file_exists("old.py").unwrap());
        assert!(!changeset.transaction().file_exists("missing").unwrap());
    }
}
