//! Git transactions through git2
//!
//! Before a commit the staged index is compared with `HEAD`; after a commit
//! `HEAD` is compared with its first parent.

use super::{ChangedFiles, Transaction};
use crate::config::Hook;
use anyhow::{Context, Result};
use git2::{Delta, Diff, Repository, Tree};
use std::path::Path;
use tracing::debug;

pub struct GitTransaction {
    repo: Repository,
    hook: Hook,
    message: Option<String>,
}

impl GitTransaction {
    /// Open the repository containing `path`.
    pub fn open<P: AsRef<Path>>(path: P, hook: Hook) -> Result<Self> {
        let repo = Repository::discover(path).context("No Git repository found")?;
        debug!(path = %repo.path().display(), %hook, "Opened repository");
        Ok(Self {
            repo,
            hook,
            message: None,
        })
    }

    /// Use `message` instead of the one git provides.
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn hook(&self) -> Hook {
        self.hook
    }

    pub fn repo_path(&self) -> &Path {
        self.repo.path()
    }

    pub fn workdir(&self) -> Option<&Path> {
        self.repo.workdir()
    }

    /// `HEAD`'s tree, or `None` in a repository without commits.
    fn head_tree(&self) -> Result<Option<Tree<'_>>> {
        match self.repo.head() {
            Ok(head) => Ok(Some(
                head.peel_to_tree().context("Failed to resolve HEAD tree")?,
            )),
            Err(err) if err.code() == git2::ErrorCode::UnbornBranch => Ok(None),
            Err(err) if err.code() == git2::ErrorCode::NotFound => Ok(None),
            Err(err) => Err(err).context("Failed to get HEAD reference"),
        }
    }

    fn diff(&self) -> Result<Diff<'_>> {
        match self.hook {
            Hook::PreCommit => {
                let tree = self.head_tree()?;
                let index = self.repo.index().context("Failed to read index")?;
                self.repo
                    .diff_tree_to_index(tree.as_ref(), Some(&index), None)
                    .context("Failed to diff index against HEAD")
            }
            Hook::PostCommit => {
                let head = self
                    .repo
                    .head()
                    .and_then(|head| head.peel_to_commit())
                    .context("Failed to resolve HEAD commit")?;
                let parent = if head.parent_count() > 0 {
                    Some(head.parent(0)?.tree()?)
                } else {
                    None
                };
                let tree = head.tree()?;
                self.repo
                    .diff_tree_to_tree(parent.as_ref(), Some(&tree), None)
                    .context("Failed to diff HEAD against its parent")
            }
        }
    }
}

impl Transaction for GitTransaction {
    fn changed_files(&self) -> Result<ChangedFiles> {
        let diff = self.diff()?;
        let mut files = ChangedFiles::new();
        for delta in diff.deltas() {
            let (kind, file) = match delta.status() {
                Delta::Added | Delta::Copied | Delta::Renamed => ("A", delta.new_file()),
                Delta::Modified | Delta::Typechange => ("U", delta.new_file()),
                Delta::Deleted => ("D", delta.old_file()),
                _ => continue,
            };
            if let Some(path) = file.path() {
                files.insert(path.to_string_lossy().into_owned(), kind.to_string());
            }
        }
        Ok(files)
    }

    fn file_contents(&self, path: &str) -> Result<Vec<u8>> {
        let oid = match self.hook {
            Hook::PreCommit => {
                let index = self.repo.index().context("Failed to read index")?;
                index
                    .get_path(Path::new(path), 0)
                    .map(|entry| entry.id)
                    .with_context(|| format!("{path} is not staged"))?
            }
            Hook::PostCommit => {
                let tree = self
                    .head_tree()?
                    .context("Repository has no commits")?;
                tree.get_path(Path::new(path))
                    .with_context(|| format!("{path} is not in HEAD"))?
                    .id()
            }
        };
        let blob = self.repo.find_blob(oid)?;
        Ok(blob.content().to_vec())
    }

    fn commit_msg(&self) -> Result<String> {
        if let Some(message) = &self.message {
            return Ok(message.clone());
        }
        match self.hook {
            // Not known yet; git writes it only after pre-commit succeeds.
            Hook::PreCommit => Ok(String::new()),
            Hook::PostCommit => {
                let head = self.repo.head()?.peel_to_commit()?;
                Ok(head.message().unwrap_or_default().to_string())
            }
        }
    }

    fn user_id(&self) -> Result<String> {
        match self.hook {
            Hook::PreCommit => {
                let config = self.repo.config().context("Failed to read git config")?;
                Ok(config.get_string("user.name").unwrap_or_default())
            }
            Hook::PostCommit => {
                let head = self.repo.head()?.peel_to_commit()?;
                Ok(head.author().name().unwrap_or_default().to_string())
            }
        }
    }

    fn revision(&self) -> Result<String> {
        match self.hook {
            Hook::PreCommit => Ok("index".to_string()),
            Hook::PostCommit => Ok(self.repo.head()?.peel_to_commit()?.id().to_string()),
        }
    }
}
