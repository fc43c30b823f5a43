use crate::module::Handler;
use crate::protocol::{Protocol, ProtocolEntry};
use crate::schema::ConfigObject;
use crate::transaction::Changeset;
use anyhow::Result;
use console::Term;

/// Prints entries and protocols to the terminal: successes to stdout,
/// everything else to stderr.
pub struct Console;

impl Console {
    fn emit(&self, success: bool, rendered: &str) -> Result<()> {
        let term = if success { Term::stdout() } else { Term::stderr() };
        term.write_str(&frame(rendered))?;
        Ok(())
    }
}

fn frame(rendered: &str) -> String {
    format!("\n{}\n{}\n", rendered, "-".repeat(80))
}

impl Handler for Console {
    fn singularize(&mut self, _: &ConfigObject, entry: &ProtocolEntry, _: &Changeset) -> Result<()> {
        self.emit(entry.success(), &entry.to_string())
    }

    fn summarize(&mut self, _: &ConfigObject, protocol: &Protocol, _: &Changeset) -> Result<()> {
        self.emit(protocol.success(), &protocol.to_string())
    }
}
