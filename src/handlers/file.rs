use crate::module::{Handler, handler_schema};
use crate::protocol::{Protocol, ProtocolEntry};
use crate::schema::{ConfigObject, Field, FromConfig, Schema, SchemaError};
use crate::transaction::Changeset;
use anyhow::{Context, Result, bail};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;

const SEPARATOR: &str = "\n====================\n";

/// Appends entries and protocols to a log file.
pub struct File;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileConfig {
    pub file: PathBuf,
}

impl FromConfig for FileConfig {
    fn schema() -> Schema {
        handler_schema("File").field(Field::string("file").min_len(1))
    }

    fn from_object(object: &ConfigObject) -> Result<Self, SchemaError> {
        let file = object.get_str("file").ok_or_else(|| SchemaError::MissingField {
            schema: "File".to_string(),
            field: "file".to_string(),
        })?;
        Ok(Self {
            file: PathBuf::from(file),
        })
    }
}

impl FileConfig {
    fn append(&self, text: &str) -> Result<()> {
        if let Some(parent) = self.file.parent().filter(|dir| !dir.as_os_str().is_empty()) {
            if !parent.is_dir() {
                bail!(
                    "Could not write logfile because directory does not exist: {}",
                    parent.display()
                );
            }
        }
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.file)
            .with_context(|| format!("Failed to open {}", self.file.display()))?;
        write!(file, "{text}{SEPARATOR}")
            .with_context(|| format!("Failed to write {}", self.file.display()))?;
        Ok(())
    }
}

impl Handler for File {
    fn schema(&self) -> Schema {
        FileConfig::schema()
    }

    fn singularize(&mut self, config: &ConfigObject, entry: &ProtocolEntry, _: &Changeset) -> Result<()> {
        FileConfig::from_object(config)?.append(&entry.to_string())
    }

    fn summarize(&mut self, config: &ConfigObject, protocol: &Protocol, _: &Changeset) -> Result<()> {
        FileConfig::from_object(config)?.append(&protocol.to_string())
    }
}
