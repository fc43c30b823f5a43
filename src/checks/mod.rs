//! Built-in checks
//!
//! Each check is a unit struct registered by name in
//! [`Registry::builtin`](crate::module::Registry::builtin). Its preset is
//! described by a config struct implementing [`FromConfig`].

mod ascii_encoded;
mod command;
mod log;
mod reject_tabs;

pub use ascii_encoded::{AsciiEncoded, AsciiEncodedConfig};
pub use command::{Command, CommandConfig};
pub use log::{Log, LogConfig, ViewVc};
pub use reject_tabs::{RejectTabs, RejectTabsConfig};

use crate::schema::{Field, FieldKind, Schema};
use crate::transaction::ChangedFiles;

/// Add `check_files` (default: everything) and `ignore_files` (default:
/// nothing) to a check schema.
fn with_file_filter(schema: Schema) -> Schema {
    schema
        .field(Field::array("check_files", FieldKind::string()).default_value(vec![".*"]))
        .field(Field::array("ignore_files", FieldKind::string()).default_value(Vec::<&str>::new()))
}

/// Keep added and updated files; deletions have no contents to inspect.
fn with_contents(files: ChangedFiles) -> impl Iterator<Item = String> {
    files
        .into_iter()
        .filter(|(_, kind)| kind == "A" || kind == "U")
        .map(|(path, _)| path)
}

/// Content looks binary when a NUL byte shows up near the start.
fn is_binary(contents: &[u8]) -> bool {
    contents.iter().take(8000).any(|byte| *byte == 0)
}
