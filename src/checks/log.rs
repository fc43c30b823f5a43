use crate::module::{Check, Outcome};
use crate::schema::{ConfigObject, Field, FromConfig, Schema, SchemaError, Value};
use crate::transaction::Changeset;
use anyhow::Result;
use chrono::Local;
use std::fmt::Write;

/// Reports what a commit contains. Never fails.
pub struct Log;

/// Link target for a ViewVC installation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewVc {
    pub url: String,
    pub root: String,
    pub view: String,
}

impl ViewVc {
    fn schema() -> Schema {
        Schema::new("ViewVC")
            .field(Field::string("url"))
            .field(Field::string("root"))
            .field(Field::string("view").default_value(Value::from("rev")))
    }

    pub fn link(&self, revision: &str) -> String {
        format!(
            "{}?view={}&root={}&revision={}",
            self.url,
            urlencoding::encode(&self.view),
            urlencoding::encode(&self.root),
            urlencoding::encode(revision)
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LogConfig {
    pub viewvc: Option<ViewVc>,
}

impl FromConfig for LogConfig {
    fn schema() -> Schema {
        Schema::new("Log").field(Field::nested("viewvc", ViewVc::schema()).optional())
    }

    fn from_object(object: &ConfigObject) -> Result<Self, SchemaError> {
        let viewvc = object.get_object("viewvc").map(|viewvc| ViewVc {
            url: viewvc.get_str("url").unwrap_or_default().to_string(),
            root: viewvc.get_str("root").unwrap_or_default().to_string(),
            view: viewvc.get_str("view").unwrap_or("rev").to_string(),
        });
        Ok(Self { viewvc })
    }
}

impl Check for Log {
    fn schema(&self) -> Schema {
        LogConfig::schema()
    }

    fn check(&mut self, config: &ConfigObject, changeset: &Changeset) -> Result<Outcome> {
        let config = LogConfig::from_object(config)?;
        let revision = changeset.revision()?;

        let mut msg = String::new();
        writeln!(msg, "Date: {}", Local::now().format("%H:%M - %d.%m.%Y"))?;
        writeln!(msg, "Author: {}", changeset.user_id()?)?;
        writeln!(msg, "Revision: {revision}\n")?;

        if let Some(viewvc) = &config.viewvc {
            write!(msg, "{}\n\n", viewvc.link(&revision))?;
        }

        msg.push_str("Modified Files:\n");
        for (path, kind) in changeset.files()? {
            writeln!(msg, "{kind}\t{path}")?;
        }
        msg.push('\n');

        msg.push_str("Log Message:\n");
        writeln!(msg, "{}", changeset.commit_msg()?)?;

        Ok(Outcome::success(msg))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{FlatConfig, Leaf};
    use crate::protocol::ResultTag;
    use crate::schema::from_config;
    use crate::transaction::MemoryTransaction;

    fn changeset() -> Changeset {
        Changeset::new(
            MemoryTransaction::new()
                .file("src/main.rs", "A", "fn main() {}\n")
                .file("README.md", "D", "")
                .message("Initial import")
                .user("alice")
                .revision("42"),
        )
    }

    #[test]
    fn test_log_message() {
        let object = from_config(&LogConfig::schema(), &FlatConfig::new()).unwrap();
        let outcome = Log.check(&object, &changeset()).unwrap();
        assert_eq!(outcome.result, ResultTag::Success);
        assert!(outcome.msg.starts_with("Date: "));
        assert!(outcome.msg.contains("Author: alice\nRevision: 42\n\nModified Files:\n"));
        assert!(outcome.msg.contains("A\tsrc/main.rs\nD\tREADME.md\n\n"));
        assert!(outcome.msg.ends_with("Log Message:\nInitial import\n"));
    }

    #[test]
    fn test_viewvc_link() {
        let mut config = FlatConfig::new();
        config.insert("viewvc.url".into(), Leaf::from("http://vc.example.org/viewvc"));
        config.insert("viewvc.root".into(), Leaf::from("my repo"));
        let object = from_config(&LogConfig::schema(), &config).unwrap();
        let outcome = Log.check(&object, &changeset()).unwrap();
        assert!(outcome.msg.contains(
            "Revision: 42\n\nhttp://vc.example.org/viewvc?view=rev&root=my%20repo&revision=42\n\nModified Files:"
        ));
    }

    #[test]
    fn test_viewvc_requires_url() {
        let mut config = FlatConfig::new();
        config.insert("viewvc.root".into(), Leaf::from("repo"));
        assert!(LogConfig::from_flat(&config).is_err());
        assert_eq!(LogConfig::from_flat(&FlatConfig::new()).unwrap(), LogConfig::default());
    }
}
