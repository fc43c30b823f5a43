use super::{with_contents, with_file_filter};
use crate::module::{Check, Outcome};
use crate::schema::{ConfigObject, Field, FromConfig, Schema, SchemaError};
use crate::transaction::Changeset;
use anyhow::{Context, Result};
use std::process::Command as Process;
use tracing::debug;

/// Runs an external command against the changed files.
///
/// `$FILES` in the command is replaced by the quoted paths of the matching
/// files, materialized from the transaction into a temporary directory.
pub struct Command;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandConfig {
    pub command: String,
    pub description: Option<String>,
    pub check_files: Vec<String>,
    pub ignore_files: Vec<String>,
}

impl CommandConfig {
    fn label(&self) -> &str {
        self.description.as_deref().unwrap_or(&self.command)
    }
}

impl FromConfig for CommandConfig {
    fn schema() -> Schema {
        with_file_filter(
            Schema::new("Command")
                .field(Field::string("command").min_len(1))
                .field(Field::string("description").optional()),
        )
    }

    fn from_object(object: &ConfigObject) -> Result<Self, SchemaError> {
        let command = object
            .get_str("command")
            .ok_or_else(|| SchemaError::MissingField {
                schema: "Command".to_string(),
                field: "command".to_string(),
            })?
            .to_string();
        Ok(Self {
            command,
            description: object.get_str("description").map(str::to_string),
            check_files: object.get_strings("check_files"),
            ignore_files: object.get_strings("ignore_files"),
        })
    }
}

impl Check for Command {
    fn schema(&self) -> Schema {
        CommandConfig::schema()
    }

    fn check(&mut self, config: &ConfigObject, changeset: &Changeset) -> Result<Outcome> {
        let config = CommandConfig::from_object(config)?;
        let files = changeset.get_files_matching(&config.check_files, &config.ignore_files)?;

        let mut paths = Vec::new();
        for path in with_contents(files) {
            paths.push(shell_quote(&changeset.get_file(&path)?.to_string_lossy()));
        }
        if paths.is_empty() && config.command.contains("$FILES") {
            debug!(command = %config.command, "No files to check");
            return Ok(Outcome::success(""));
        }

        let command = config.command.replace("$FILES", &paths.join(" "));
        debug!(command = %command, "Running command");
        let output = Process::new("sh")
            .arg("-c")
            .arg(&command)
            .output()
            .with_context(|| format!("Failed to execute command: {}", command))?;

        if output.status.success() {
            return Ok(Outcome::success(""));
        }

        let mut msg = format!("{} failed ({})", config.label(), output.status);
        for stream in [&output.stdout, &output.stderr] {
            let text = String::from_utf8_lossy(stream);
            let text = text.trim_end();
            if !text.is_empty() {
                msg.push('\n');
                msg.push_str(text);
            }
        }
        Ok(Outcome::error(msg))
    }
}

fn shell_quote(text: &str) -> String {
    format!("'{}'", text.replace('\'', r"'\''"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{FlatConfig, Leaf};
    use crate::protocol::ResultTag;
    use crate::schema::from_config;
    use crate::transaction::MemoryTransaction;

    fn run(command: &str, txn: MemoryTransaction) -> Outcome {
        let mut config = FlatConfig::new();
        config.insert("command".into(), Leaf::from(command));
        config.insert("check_files".into(), Leaf::from(vec![r"\.sh$"]));
        let object = from_config(&CommandConfig::schema(), &config).unwrap();
        let changeset = Changeset::new(txn);
        let outcome = Command.check(&object, &changeset).unwrap();
        changeset.cleanup().unwrap();
        outcome
    }

    #[test]
    fn test_command_sees_staged_contents() {
        let txn = MemoryTransaction::new()
            .file("bin/run.sh", "A", "echo ok\n")
            .file("README", "A", "docs\n");
        let outcome = run("grep -q 'echo ok' $FILES", txn);
        assert_eq!(outcome, Outcome::success(""));
    }

    #[test]
    fn test_failure_reports_output() {
        let txn = MemoryTransaction::new().file("it's.sh", "U", "exit 1\n");
        let outcome = run("cat $FILES; exit 3", txn);
        assert_eq!(outcome.result, ResultTag::Error);
        assert!(outcome.msg.starts_with("cat $FILES; exit 3 failed"));
        assert!(outcome.msg.ends_with("\nexit 1"));
    }

    #[test]
    fn test_no_matching_files() {
        let txn = MemoryTransaction::new().file("README", "A", "docs\n");
        assert_eq!(run("false $FILES", txn), Outcome::success(""));
    }

    #[test]
    fn test_command_is_required() {
        assert!(CommandConfig::from_flat(&FlatConfig::new()).is_err());
    }
}
