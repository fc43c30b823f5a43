//! Pluggable checks and handlers
//!
//! Checks inspect a changeset and report an [`Outcome`]; handlers are told
//! about outcomes, one entry at a time and once per process with the whole
//! protocol. Both are created by name from a [`Registry`] and wrapped so
//! that their failures never escape into the run.

mod manager;
mod registry;
mod wrapper;

pub use manager::ModuleManager;
pub use registry::{CheckFactory, HandlerFactory, Registry};
pub use wrapper::{CheckModule, HandlerModule};

use crate::protocol::{Protocol, ProtocolEntry, ResultTag};
use crate::schema::{ConfigObject, Field, FieldKind, Schema};
use crate::transaction::Changeset;
use anyhow::Result;

/// Result tag and message reported by a check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outcome {
    pub result: ResultTag,
    pub msg: String,
}

impl Outcome {
    pub fn success(msg: impl Into<String>) -> Self {
        Self {
            result: ResultTag::Success,
            msg: msg.into(),
        }
    }

    pub fn error(msg: impl Into<String>) -> Self {
        Self {
            result: ResultTag::Error,
            msg: msg.into(),
        }
    }
}

pub trait Check {
    /// Shape of the check's configuration.
    fn schema(&self) -> Schema;

    fn check(&mut self, config: &ConfigObject, changeset: &Changeset) -> Result<Outcome>;
}

pub trait Handler {
    fn schema(&self) -> Schema {
        handler_schema("Handler")
    }

    /// Called after every check that produced a message.
    fn singularize(
        &mut self,
        _config: &ConfigObject,
        _entry: &ProtocolEntry,
        _changeset: &Changeset,
    ) -> Result<()> {
        Ok(())
    }

    /// Called once per process with the (filtered) protocol.
    fn summarize(
        &mut self,
        _config: &ConfigObject,
        _protocol: &Protocol,
        _changeset: &Changeset,
    ) -> Result<()> {
        Ok(())
    }
}

/// Base handler schema: the optional `protocol` include/exclude filter.
/// Handlers append their own fields.
pub fn handler_schema(name: &str) -> Schema {
    Schema::new(name).field(
        Field::nested(
            "protocol",
            Schema::new("Protocol")
                .field(Field::array("include", FieldKind::string()).optional())
                .field(Field::array("exclude", FieldKind::string()).optional())
                .field(Field::string("template").optional()),
        )
        .hydrate_default(),
    )
}
