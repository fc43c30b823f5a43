use super::{CheckModule, HandlerModule, Registry};
use crate::config::{Process, ResolvedCheck};
use crate::error::ModuleError;
use crate::protocol::{Protocol, ProtocolEntry};
use crate::transaction::Changeset;
use anyhow::Result;
use std::collections::HashMap;
use std::collections::hash_map::Entry;
use tracing::debug;

/// Creates modules on first use and keeps one instance per name for the run.
pub struct ModuleManager {
    registry: Registry,
    checks: HashMap<String, CheckModule>,
    handlers: HashMap<String, HandlerModule>,
    debug: bool,
}

impl ModuleManager {
    pub fn new(registry: Registry) -> Self {
        Self {
            registry,
            checks: HashMap::new(),
            handlers: HashMap::new(),
            debug: false,
        }
    }

    /// Return module failures instead of recording or logging them.
    pub fn set_debug(&mut self, debug: bool) {
        self.debug = debug;
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn check(&mut self, name: &str) -> Result<&mut CheckModule, ModuleError> {
        match self.checks.entry(name.to_string()) {
            Entry::Occupied(entry) => Ok(entry.into_mut()),
            Entry::Vacant(entry) => {
                let check = self.registry.create_check(name)?;
                debug!(check = %name, "Loaded check");
                Ok(entry.insert(CheckModule::new(name, check)))
            }
        }
    }

    pub fn handler(&mut self, name: &str) -> Result<&mut HandlerModule, ModuleError> {
        match self.handlers.entry(name.to_string()) {
            Entry::Occupied(entry) => Ok(entry.into_mut()),
            Entry::Vacant(entry) => {
                let handler = self.registry.create_handler(name)?;
                debug!(handler = %name, "Loaded handler");
                Ok(entry.insert(HandlerModule::new(name, handler)))
            }
        }
    }

    pub fn run_check(&mut self, check: &ResolvedCheck, changeset: &Changeset) -> Result<ProtocolEntry> {
        let debug = self.debug;
        self.check(&check.name)?
            .run(check.config.as_ref(), check.interp, changeset, debug)
    }

    /// Hand one entry to the process's success or error handlers, chosen by
    /// the entry's own result.
    pub fn singularize(
        &mut self,
        process: &Process<'_>,
        entry: &ProtocolEntry,
        changeset: &Changeset,
    ) -> Result<()> {
        let debug = self.debug;
        for handler in process.handlers(entry.success())? {
            self.handler(&handler.name)?
                .singularize(handler.config.as_ref(), entry, changeset, debug)?;
        }
        Ok(())
    }

    /// Hand the protocol to the success or error handlers, chosen by the
    /// protocol's cumulative result.
    pub fn summarize(
        &mut self,
        process: &Process<'_>,
        protocol: &Protocol,
        changeset: &Changeset,
    ) -> Result<()> {
        let debug = self.debug;
        for handler in process.handlers(protocol.success())? {
            self.handler(&handler.name)?
                .summarize(handler.config.as_ref(), protocol, changeset, debug)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::module::{Check, Outcome};
    use crate::schema::{ConfigObject, Schema};
    use std::cell::Cell;
    use std::rc::Rc;

    struct Noop;

    impl Check for Noop {
        fn schema(&self) -> Schema {
            Schema::new("Noop")
        }

        fn check(&mut self, _: &ConfigObject, _: &Changeset) -> Result<Outcome> {
            Ok(Outcome::success(""))
        }
    }

    #[test]
    fn test_one_instance_per_name() {
        let created = Rc::new(Cell::new(0));
        let counter = Rc::clone(&created);
        let mut registry = Registry::new();
        registry.register_check("Noop", move || {
            counter.set(counter.get() + 1);
            Box::new(Noop)
        });

        let mut manager = ModuleManager::new(registry);
        manager.check("Noop").unwrap();
        manager.check("Noop").unwrap();
        assert_eq!(created.get(), 1);
        assert!(matches!(
            manager.check("Missing"),
            Err(ModuleError::NotFound { .. })
        ));
    }
}
