//! Uniform invocation of checks and handlers
//!
//! The wrappers deserialize the preset, time the call, and turn errors or
//! panics from module logic into protocol entries (checks) or log records
//! (handlers). In debug mode failures are returned instead.

use super::{Check, Handler, Outcome};
use crate::config::{FlatConfig, Interpretation};
use crate::protocol::{Protocol, ProtocolEntry, ResultTag};
use crate::schema::{ConfigObject, from_config};
use crate::transaction::Changeset;
use anyhow::{Result, anyhow};
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use tracing::{debug, error};

pub struct CheckModule {
    name: String,
    check: Box<dyn Check>,
}

impl CheckModule {
    pub fn new(name: impl Into<String>, check: Box<dyn Check>) -> Self {
        Self {
            name: name.into(),
            check,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Run the check and record its outcome. Only fails when `debug` is set.
    pub fn run(
        &mut self,
        config: Option<&FlatConfig>,
        interp: Interpretation,
        changeset: &Changeset,
        debug: bool,
    ) -> Result<ProtocolEntry> {
        let mut entry = ProtocolEntry::new(&self.name);
        entry.start();
        let outcome = self.invoke(config, changeset, &mut entry);
        entry.end();

        match outcome {
            Ok(Outcome { result, msg }) => {
                entry.result = result;
                entry.msg = msg;
            }
            Err(err) if debug => return Err(err),
            Err(err) => {
                entry.result = ResultTag::Exception;
                entry.msg = format!("Exception in check '{}': {:#}", self.name, err);
                error!(check = %self.name, error = ?err, "{}", entry.msg);
            }
        }

        if entry.result == ResultTag::Error && interp == Interpretation::Warning {
            entry.result = ResultTag::Warning;
        }
        Ok(entry)
    }

    fn invoke(
        &mut self,
        config: Option<&FlatConfig>,
        changeset: &Changeset,
        entry: &mut ProtocolEntry,
    ) -> Result<Outcome> {
        let empty = FlatConfig::new();
        let object = from_config(&self.check.schema(), config.unwrap_or(&empty))?;
        entry.config = Some(object.clone());
        let check = &mut self.check;
        guard(|| check.check(&object, changeset))
    }
}

pub struct HandlerModule {
    name: String,
    handler: Box<dyn Handler>,
}

impl HandlerModule {
    pub fn new(name: impl Into<String>, handler: Box<dyn Handler>) -> Self {
        Self {
            name: name.into(),
            handler,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Pass one entry to the handler unless its `protocol` filter rejects it.
    pub fn singularize(
        &mut self,
        config: Option<&FlatConfig>,
        entry: &ProtocolEntry,
        changeset: &Changeset,
        debug: bool,
    ) -> Result<()> {
        let handler = &mut self.handler;
        let name = &self.name;
        let outcome = deserialize(handler.as_ref(), config).and_then(|config| {
            let (include, exclude) = protocol_filter(&config);
            if !entry.is_included(include.as_deref(), exclude.as_deref()) {
                debug!(handler = %name, check = %entry.check, "Handler skipped");
                return Ok(());
            }
            guard(|| handler.singularize(&config, entry, changeset))
        });
        self.finish("singularize", outcome, debug)
    }

    /// Pass the protocol, restricted by the handler's `protocol` filter.
    pub fn summarize(
        &mut self,
        config: Option<&FlatConfig>,
        protocol: &Protocol,
        changeset: &Changeset,
        debug: bool,
    ) -> Result<()> {
        let handler = &mut self.handler;
        let name = &self.name;
        let outcome = deserialize(handler.as_ref(), config).and_then(|config| {
            let (include, exclude) = protocol_filter(&config);
            let protocol = protocol.filter(include.as_deref(), exclude.as_deref());
            debug!(
                handler = %name,
                checks = ?protocol.iter().map(|e| e.check.as_str()).collect::<Vec<_>>(),
                "Summarizing protocol"
            );
            guard(|| handler.summarize(&config, &protocol, changeset))
        });
        self.finish("summarize", outcome, debug)
    }

    fn finish(&self, method: &str, outcome: Result<()>, debug: bool) -> Result<()> {
        match outcome {
            Ok(()) => Ok(()),
            Err(err) if debug => Err(err),
            Err(err) => {
                error!(
                    handler = %self.name,
                    error = ?err,
                    "Exception in {} handler in method {}: {:#}",
                    self.name,
                    method,
                    err
                );
                Ok(())
            }
        }
    }
}

fn deserialize(handler: &dyn Handler, config: Option<&FlatConfig>) -> Result<ConfigObject> {
    let empty = FlatConfig::new();
    Ok(from_config(&handler.schema(), config.unwrap_or(&empty))?)
}

fn protocol_filter(config: &ConfigObject) -> (Option<Vec<String>>, Option<Vec<String>>) {
    match config.get_object("protocol") {
        Some(protocol) => (
            protocol.get_opt_strings("include"),
            protocol.get_opt_strings("exclude"),
        ),
        None => (None, None),
    }
}

/// Run module logic, converting a panic into an error.
fn guard<T>(f: impl FnOnce() -> Result<T>) -> Result<T> {
    match panic::catch_unwind(AssertUnwindSafe(f)) {
        Ok(result) => result,
        Err(payload) => Err(anyhow!("panicked: {}", panic_message(payload.as_ref()))),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::module::handler_schema;
    use crate::schema::{Field, Schema};
    use crate::transaction::MemoryTransaction;
    use crate::config::Leaf;
    use std::cell::RefCell;
    use std::rc::Rc;

    struct Fixed(Outcome);

    impl Check for Fixed {
        fn schema(&self) -> Schema {
            Schema::new("Fixed")
        }

        fn check(&mut self, _: &ConfigObject, _: &Changeset) -> Result<Outcome> {
            Ok(self.0.clone())
        }
    }

    struct Failing;

    impl Check for Failing {
        fn schema(&self) -> Schema {
            Schema::new("Failing")
        }

        fn check(&mut self, _: &ConfigObject, _: &Changeset) -> Result<Outcome> {
            Err(anyhow!("disk on fire"))
        }
    }

    struct Panicking;

    impl Check for Panicking {
        fn schema(&self) -> Schema {
            Schema::new("Panicking")
        }

        fn check(&mut self, _: &ConfigObject, _: &Changeset) -> Result<Outcome> {
            panic!("boom")
        }
    }

    struct Strict;

    impl Check for Strict {
        fn schema(&self) -> Schema {
            Schema::new("Strict").field(Field::string("required"))
        }

        fn check(&mut self, _: &ConfigObject, _: &Changeset) -> Result<Outcome> {
            Ok(Outcome::success(""))
        }
    }

    #[derive(Default)]
    struct Recorder {
        seen: Rc<RefCell<Vec<String>>>,
        fail: bool,
    }

    impl Handler for Recorder {
        fn singularize(&mut self, _: &ConfigObject, entry: &ProtocolEntry, _: &Changeset) -> Result<()> {
            self.seen.borrow_mut().push(format!("entry:{}", entry.check));
            if self.fail {
                anyhow::bail!("mail server down");
            }
            Ok(())
        }

        fn summarize(&mut self, _: &ConfigObject, protocol: &Protocol, _: &Changeset) -> Result<()> {
            self.seen.borrow_mut().push(format!("protocol:{}", protocol.len()));
            Ok(())
        }
    }

    fn changeset() -> Changeset {
        Changeset::new(MemoryTransaction::new())
    }

    #[test]
    fn test_error_downgraded_under_warning() {
        let mut module = CheckModule::new("Fixed", Box::new(Fixed(Outcome::error("bad"))));
        let entry = module
            .run(None, Interpretation::Warning, &changeset(), false)
            .unwrap();
        assert_eq!(entry.result, ResultTag::Warning);
        assert_eq!(entry.msg, "bad");

        let entry = module
            .run(None, Interpretation::DelayOnError, &changeset(), false)
            .unwrap();
        assert_eq!(entry.result, ResultTag::Error);
        assert!(entry.start.is_some() && entry.end.is_some());
    }

    #[test]
    fn test_failure_becomes_exception_entry() {
        let mut module = CheckModule::new("Failing", Box::new(Failing));
        let entry = module
            .run(None, Interpretation::Warning, &changeset(), false)
            .unwrap();
        assert_eq!(entry.result, ResultTag::Exception);
        assert_eq!(entry.msg, "Exception in check 'Failing': disk on fire");
    }

    #[test]
    fn test_panic_becomes_exception_entry() {
        let mut module = CheckModule::new("Panicking", Box::new(Panicking));
        let entry = module
            .run(None, Interpretation::AbortOnError, &changeset(), false)
            .unwrap();
        assert_eq!(entry.result, ResultTag::Exception);
        assert!(entry.msg.contains("boom"));
    }

    #[test]
    fn test_debug_returns_failures() {
        let mut module = CheckModule::new("Failing", Box::new(Failing));
        assert!(module
            .run(None, Interpretation::AbortOnError, &changeset(), true)
            .is_err());
    }

    #[test]
    fn test_invalid_config_becomes_exception_entry() {
        let mut module = CheckModule::new("Strict", Box::new(Strict));
        let entry = module
            .run(None, Interpretation::AbortOnError, &changeset(), false)
            .unwrap();
        assert_eq!(entry.result, ResultTag::Exception);
        assert!(entry.msg.contains("required"));

        let mut config = FlatConfig::new();
        config.insert("required".into(), Leaf::from("yes"));
        let entry = module
            .run(Some(&config), Interpretation::AbortOnError, &changeset(), false)
            .unwrap();
        assert_eq!(entry.result, ResultTag::Success);
        assert_eq!(
            entry.config.unwrap().get_str("required"),
            Some("yes")
        );
    }

    #[test]
    fn test_handler_filter_and_failures() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let mut module = HandlerModule::new(
            "Recorder",
            Box::new(Recorder {
                seen: Rc::clone(&seen),
                fail: true,
            }),
        );
        let mut config = FlatConfig::new();
        config.insert("protocol.exclude".into(), Leaf::from(vec!["Log"]));

        let log = ProtocolEntry::new("Log").with_result(ResultTag::Success, "msg");
        let tabs = ProtocolEntry::new("RejectTabs").with_result(ResultTag::Error, "tab");
        let changeset = changeset();

        module.singularize(Some(&config), &log, &changeset, false).unwrap();
        module.singularize(Some(&config), &tabs, &changeset, false).unwrap();
        assert!(module.singularize(Some(&config), &tabs, &changeset, true).is_err());

        let mut protocol = Protocol::new("default");
        protocol.push(log);
        protocol.push(tabs);
        module.summarize(Some(&config), &protocol, &changeset, false).unwrap();

        assert_eq!(
            *seen.borrow(),
            vec!["entry:RejectTabs", "entry:RejectTabs", "protocol:1"]
        );
    }

    #[test]
    fn test_handler_schema_defaults_protocol() {
        let object = from_config(&handler_schema("Console"), &FlatConfig::new()).unwrap();
        assert!(object.get_object("protocol").is_some());
        assert_eq!(protocol_filter(&object), (None, None));
    }
}
