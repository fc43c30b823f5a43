use super::{Check, Handler};
use crate::checks::{AsciiEncoded, Command, Log, RejectTabs};
use crate::error::{ModuleError, ModuleKind};
use crate::handlers::{Console, File};
use crate::schema::Schema;
use indexmap::IndexMap;

pub type CheckFactory = Box<dyn Fn() -> Box<dyn Check>>;
pub type HandlerFactory = Box<dyn Fn() -> Box<dyn Handler>>;

/// Checks and handlers known by name.
#[derive(Default)]
pub struct Registry {
    checks: IndexMap<String, CheckFactory>,
    handlers: IndexMap<String, HandlerFactory>,
}

impl Registry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry with every built-in check and handler.
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        registry.register_check("AsciiEncoded", || Box::new(AsciiEncoded));
        registry.register_check("Command", || Box::new(Command));
        registry.register_check("Log", || Box::new(Log));
        registry.register_check("RejectTabs", || Box::new(RejectTabs));
        registry.register_handler("Console", || Box::new(Console));
        registry.register_handler("File", || Box::new(File));
        registry
    }

    pub fn register_check<F>(&mut self, name: &str, factory: F)
    where
        F: Fn() -> Box<dyn Check> + 'static,
    {
        self.checks.insert(name.to_string(), Box::new(factory));
    }

    pub fn register_handler<F>(&mut self, name: &str, factory: F)
    where
        F: Fn() -> Box<dyn Handler> + 'static,
    {
        self.handlers.insert(name.to_string(), Box::new(factory));
    }

    pub fn check_names(&self) -> impl Iterator<Item = &str> {
        self.checks.keys().map(String::as_str)
    }

    pub fn handler_names(&self) -> impl Iterator<Item = &str> {
        self.handlers.keys().map(String::as_str)
    }

    pub fn has_check(&self, name: &str) -> bool {
        self.checks.contains_key(name)
    }

    pub fn has_handler(&self, name: &str) -> bool {
        self.handlers.contains_key(name)
    }

    pub fn create_check(&self, name: &str) -> Result<Box<dyn Check>, ModuleError> {
        self.checks
            .get(name)
            .map(|factory| factory())
            .ok_or_else(|| ModuleError::NotFound {
                kind: ModuleKind::Check,
                name: name.to_string(),
            })
    }

    pub fn create_handler(&self, name: &str) -> Result<Box<dyn Handler>, ModuleError> {
        self.handlers
            .get(name)
            .map(|factory| factory())
            .ok_or_else(|| ModuleError::NotFound {
                kind: ModuleKind::Handler,
                name: name.to_string(),
            })
    }

    pub fn check_schema(&self, name: &str) -> Result<Schema, ModuleError> {
        Ok(self.create_check(name)?.schema())
    }

    pub fn handler_schema(&self, name: &str) -> Result<Schema, ModuleError> {
        Ok(self.create_handler(name)?.schema())
    }
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("checks", &self.checks.keys().collect::<Vec<_>>())
            .field("handlers", &self.handlers.keys().collect::<Vec<_>>())
            .finish()
    }
}
