use super::{is_binary, with_contents, with_file_filter};
use crate::module::{Check, Outcome};
use crate::schema::{ConfigObject, FromConfig, Schema, SchemaError};
use crate::transaction::Changeset;
use anyhow::Result;
use lazy_static::lazy_static;
use regex::Regex;
use tracing::debug;

lazy_static! {
    static ref LEADING_TAB: Regex = Regex::new(r"^\s*\t").unwrap();
}

/// Rejects files indented with tabs.
pub struct RejectTabs;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RejectTabsConfig {
    pub check_files: Vec<String>,
    pub ignore_files: Vec<String>,
}

impl FromConfig for RejectTabsConfig {
    fn schema() -> Schema {
        with_file_filter(Schema::new("RejectTabs"))
    }

    fn from_object(object: &ConfigObject) -> Result<Self, SchemaError> {
        Ok(Self {
            check_files: object.get_strings("check_files"),
            ignore_files: object.get_strings("ignore_files"),
        })
    }
}

impl Check for RejectTabs {
    fn schema(&self) -> Schema {
        RejectTabsConfig::schema()
    }

    fn check(&mut self, config: &ConfigObject, changeset: &Changeset) -> Result<Outcome> {
        let config = RejectTabsConfig::from_object(config)?;
        let files = changeset.get_files_matching(&config.check_files, &config.ignore_files)?;

        let mut errors = Vec::new();
        for path in with_contents(files) {
            let contents = changeset.file_contents(&path)?;
            if is_binary(&contents) {
                debug!(file = %path, "Skipping binary file");
                continue;
            }
            let text = String::from_utf8_lossy(&contents);
            if text.lines().any(|line| LEADING_TAB.is_match(line)) {
                errors.push(format!("File {path} contains leading tabs"));
            }
        }

        if errors.is_empty() {
            Ok(Outcome::success(""))
        } else {
            Ok(Outcome::error(errors.join("\n")))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{FlatConfig, Leaf};
    use crate::protocol::ResultTag;
    use crate::schema::from_config;
    use crate::transaction::MemoryTransaction;
    use pretty_assertions::assert_eq;

    fn run(config: &FlatConfig, txn: MemoryTransaction) -> Outcome {
        let object = from_config(&RejectTabsConfig::schema(), config).unwrap();
        RejectTabs.check(&object, &Changeset::new(txn)).unwrap()
    }

    #[test]
    fn test_defaults() {
        let config = RejectTabsConfig::from_flat(&FlatConfig::new()).unwrap();
        assert_eq!(config.check_files, vec![".*"]);
        assert!(config.ignore_files.is_empty());
    }

    #[test]
    fn test_leading_tabs_rejected() {
        let txn = MemoryTransaction::new()
            .file("a.py", "A", "def f():\n\treturn 1\n")
            .file("b.py", "U", "x = 1\t# trailing tab is fine\n")
            .file("c.py", "U", "if x:\n    \tpass\n")
            .file("d.py", "D", "");
        let outcome = run(&FlatConfig::new(), txn);
        assert_eq!(outcome.result, ResultTag::Error);
        assert_eq!(
            outcome.msg,
            "File a.py contains leading tabs\nFile c.py contains leading tabs"
        );
    }

    #[test]
    fn test_ignored_files_pass() {
        let mut config = FlatConfig::new();
        config.insert("check_files".into(), Leaf::from(vec![r"\.py$"]));
        config.insert("ignore_files".into(), Leaf::from(vec!["^vendor/"]));
        let txn = MemoryTransaction::new()
            .file("vendor/lib.py", "A", "\tx = 1\n")
            .file("Makefile", "U", "all:\n\tmake\n");
        let outcome = run(&config, txn);
        assert_eq!(outcome, Outcome::success(""));
    }
}
