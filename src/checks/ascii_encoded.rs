use super::{with_contents, with_file_filter};
use crate::module::{Check, Outcome};
use crate::schema::{ConfigObject, Field, FromConfig, Schema, SchemaError, Value};
use crate::transaction::Changeset;
use anyhow::Result;

/// Rejects characters outside printable ASCII.
pub struct AsciiEncoded;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AsciiEncodedConfig {
    pub check_files: Vec<String>,
    pub ignore_files: Vec<String>,
    /// Extra characters to accept.
    pub include: String,
    /// Characters to reject even though they are printable.
    pub exclude: String,
}

impl AsciiEncodedConfig {
    fn allows(&self, letter: char) -> bool {
        (is_printable(letter) || self.include.contains(letter)) && !self.exclude.contains(letter)
    }
}

impl FromConfig for AsciiEncodedConfig {
    fn schema() -> Schema {
        with_file_filter(Schema::new("AsciiEncoded"))
            .field(Field::string("include").default_value(Value::from("")))
            .field(Field::string("exclude").default_value(Value::from("")))
    }

    fn from_object(object: &ConfigObject) -> Result<Self, SchemaError> {
        Ok(Self {
            check_files: object.get_strings("check_files"),
            ignore_files: object.get_strings("ignore_files"),
            include: object.get_str("include").unwrap_or_default().to_string(),
            exclude: object.get_str("exclude").unwrap_or_default().to_string(),
        })
    }
}

/// ASCII letters, digits, punctuation and whitespace.
fn is_printable(letter: char) -> bool {
    letter.is_ascii_graphic() || matches!(letter, ' ' | '\t' | '\n' | '\r' | '\x0b' | '\x0c')
}

impl Check for AsciiEncoded {
    fn schema(&self) -> Schema {
        AsciiEncodedConfig::schema()
    }

    fn check(&mut self, config: &ConfigObject, changeset: &Changeset) -> Result<Outcome> {
        let config = AsciiEncodedConfig::from_object(config)?;
        let files = changeset.get_files_matching(&config.check_files, &config.ignore_files)?;

        let mut messages = Vec::new();
        for path in with_contents(files) {
            let contents = changeset.file_contents(&path)?;
            let text = String::from_utf8_lossy(&contents);

            let mut report = Vec::new();
            for (row, line) in text.split_inclusive('\n').enumerate() {
                let row = (row + 1).to_string();
                let line = line.trim_end_matches(['\r', '\n']);
                for (col, _) in line
                    .chars()
                    .enumerate()
                    .filter(|(_, letter)| !config.allows(*letter))
                {
                    report.push(format!("{row}: {line}"));
                    report.push(format!("{} {}^", " ".repeat(row.len()), " ".repeat(col + 1)));
                }
            }

            if !report.is_empty() {
                messages.push(format!("Unexpected letters in file {path}:"));
                messages.append(&mut report);
                messages.push(String::new());
            }
        }

        if messages.is_empty() {
            Ok(Outcome::success(""))
        } else {
            Ok(Outcome::error(messages.join("\n")))
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
        let object = from_config(&AsciiEncodedConfig::schema(), config).unwrap();
        AsciiEncoded.check(&object, &Changeset::new(txn)).unwrap()
    }

    #[test]
    fn test_plain_ascii_passes() {
        let txn = MemoryTransaction::new().file("a.txt", "A", "hello world\n\tindented\r\n");
        assert_eq!(run(&FlatConfig::new(), txn), Outcome::success(""));
    }

    #[test]
    fn test_marks_offending_column() {
        let txn = MemoryTransaction::new().file("a.txt", "U", "ok\nna\u{ef}ve\n");
        let outcome = run(&FlatConfig::new(), txn);
        assert_eq!(outcome.result, ResultTag::Error);
        assert_eq!(
            outcome.msg,
            "Unexpected letters in file a.txt:\n2: na\u{ef}ve\n     ^\n"
        );
    }

    #[test]
    fn test_include_and_exclude() {
        let mut config = FlatConfig::new();
        config.insert("include".into(), Leaf::from("\u{e4}"));
        config.insert("exclude".into(), Leaf::from("#"));
        let txn = MemoryTransaction::new()
            .file("a.txt", "A", "K\u{e4}se\n")
            .file("b.txt", "A", "# comment\n")
            .file("c.txt", "D", "\u{ff}");
        let outcome = run(&config, txn);
        assert_eq!(outcome.result, ResultTag::Error);
        assert!(!outcome.msg.contains("a.txt"));
        assert!(outcome.msg.contains("Unexpected letters in file b.txt:"));
        assert!(!outcome.msg.contains("c.txt"));
    }
}
