//! Static validation of a resolved project configuration
//!
//! Everything the runner would trip over at run time is reported up front:
//! profile layout, process sections, reference grammar, unknown modules and
//! presets that do not fit their module's schema.

use super::project::{CheckRef, HandlerRef, Interpretation, ProjectConfig};
use super::{FlatConfig, Hook};
use crate::error::ModuleKind;
use crate::module::Registry;
use crate::schema::{SchemaError, from_config};
use regex::Regex;
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ValidationMode {
    /// Stop at the first error.
    FailFast,
    /// Collect every error.
    #[default]
    Accumulate,
}

#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("'extends' must be a single template name")]
    ExtendsNotScalar,

    #[error("No default profile found")]
    NoDefaultProfile,

    #[error("Default profile already exists. Only one default profile is allowed")]
    MultipleDefaultProfiles,

    #[error("Invalid regex for profile '{profile}': {message}")]
    InvalidProfileRegex { profile: String, message: String },

    #[error("No {key} found for profile '{profile}' in {hook} process")]
    MissingProcessKey {
        profile: String,
        hook: Hook,
        key: &'static str,
    },

    #[error("Unknown default value '{value}' in profile '{profile}'")]
    UnknownInterpretation { profile: String, value: String },

    #[error("Invalid {kind} reference '{reference}' in profile '{profile}'")]
    InvalidReference {
        profile: String,
        kind: ModuleKind,
        reference: String,
    },

    #[error("The {kind} '{name}' is not available. Check the spelling")]
    UnknownModule { kind: ModuleKind, name: String },

    #[error("Configuration '{preset}' for {kind} '{name}' is not defined")]
    UndefinedPreset {
        kind: ModuleKind,
        name: String,
        preset: String,
    },

    #[error("Validation error in {kind} '{name}': {source}")]
    InvalidConfig {
        kind: ModuleKind,
        name: String,
        #[source]
        source: SchemaError,
    },
}

/// Marks that validation stopped early in fail-fast mode.
struct Stop;

type Step = Result<(), Stop>;

pub struct ConfigValidator<'a> {
    registry: &'a Registry,
    mode: ValidationMode,
    errors: Vec<ValidationError>,
}

impl<'a> ConfigValidator<'a> {
    pub fn new(registry: &'a Registry, mode: ValidationMode) -> Self {
        Self {
            registry,
            mode,
            errors: Vec::new(),
        }
    }

    pub fn mode(&self) -> ValidationMode {
        self.mode
    }

    /// Validate `config`, returning every error found (only the first in
    /// fail-fast mode).
    pub fn validate(mut self, config: &ProjectConfig) -> Result<(), Vec<ValidationError>> {
        info!(mode = ?self.mode, "Starting validation");
        // A stop only ends the walk; the error is already recorded.
        let _ = self.walk(config);
        info!(errors = self.errors.len(), "Validation finished");
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(self.errors)
        }
    }

    fn report(&mut self, error: ValidationError) -> Step {
        warn!("{}", error);
        self.errors.push(error);
        match self.mode {
            ValidationMode::FailFast => Err(Stop),
            ValidationMode::Accumulate => Ok(()),
        }
    }

    fn walk(&mut self, config: &ProjectConfig) -> Step {
        if config.tree().contains("extends") && config.tree().scalar("extends").is_none() {
            self.report(ValidationError::ExtendsNotScalar)?;
        }

        debug!("Validating profiles");
        let profiles = config.profiles();
        let defaults = profiles.iter().filter(|profile| profile.is_default()).count();
        match defaults {
            0 => self.report(ValidationError::NoDefaultProfile)?,
            1 => {}
            _ => self.report(ValidationError::MultipleDefaultProfiles)?,
        }

        for profile in &profiles {
            if let Some(regex) = profile.regex() {
                if let Err(err) = Regex::new(regex) {
                    self.report(ValidationError::InvalidProfileRegex {
                        profile: profile.name().to_string(),
                        message: err.to_string(),
                    })?;
                }
            }
            for hook in Hook::ALL {
                if let Some(process) = profile.process(hook) {
                    self.process(config, profile.name(), hook, process.tree())?;
                }
            }
        }

        debug!("Validating check configurations");
        for check in config.check_catalog() {
            if !self.registry.has_check(check) {
                self.report(ValidationError::UnknownModule {
                    kind: ModuleKind::Check,
                    name: check.to_string(),
                })?;
                continue;
            }
            for preset in config.check_presets(check).values() {
                self.module_config(ModuleKind::Check, check, preset)?;
            }
        }

        debug!("Validating handler configurations");
        for handler in config.handler_catalog() {
            if !self.registry.has_handler(handler) {
                self.report(ValidationError::UnknownModule {
                    kind: ModuleKind::Handler,
                    name: handler.to_string(),
                })?;
                continue;
            }
            for preset in config.handler_presets(handler).values() {
                self.module_config(ModuleKind::Handler, handler, preset)?;
            }
        }
        Ok(())
    }

    fn process(
        &mut self,
        config: &ProjectConfig,
        profile: &str,
        hook: Hook,
        tree: &super::ConfigTree,
    ) -> Step {
        for key in ["checks", "success", "error"] {
            if !tree.contains(key) {
                self.report(ValidationError::MissingProcessKey {
                    profile: profile.to_string(),
                    hook,
                    key,
                })?;
            }
        }
        if let Some(value) = tree.scalar("default") {
            if value.parse::<Interpretation>().is_err() {
                self.report(ValidationError::UnknownInterpretation {
                    profile: profile.to_string(),
                    value: value.to_string(),
                })?;
            }
        }

        for reference in tree.strings("checks").unwrap_or_default() {
            match reference.parse::<CheckRef>() {
                Ok(check) => self.reference(config, ModuleKind::Check, &check.name, check.config)?,
                Err(_) => self.report(ValidationError::InvalidReference {
                    profile: profile.to_string(),
                    kind: ModuleKind::Check,
                    reference,
                })?,
            }
        }

        let handlers = tree
            .strings("success")
            .unwrap_or_default()
            .into_iter()
            .chain(tree.strings("error").unwrap_or_default());
        for reference in handlers {
            match reference.parse::<HandlerRef>() {
                Ok(handler) => {
                    self.reference(config, ModuleKind::Handler, &handler.name, handler.config)?
                }
                Err(_) => self.report(ValidationError::InvalidReference {
                    profile: profile.to_string(),
                    kind: ModuleKind::Handler,
                    reference,
                })?,
            }
        }
        Ok(())
    }

    /// A module named in a process: it must exist, and so must its preset.
    /// Without a preset the module has to accept an empty configuration.
    fn reference(
        &mut self,
        config: &ProjectConfig,
        kind: ModuleKind,
        name: &str,
        preset: Option<String>,
    ) -> Step {
        let known = match kind {
            ModuleKind::Check => self.registry.has_check(name),
            ModuleKind::Handler => self.registry.has_handler(name),
        };
        if !known {
            return self.report(ValidationError::UnknownModule {
                kind,
                name: name.to_string(),
            });
        }

        match preset {
            Some(preset) => {
                let stored = match kind {
                    ModuleKind::Check => config.check_preset(name, &preset),
                    ModuleKind::Handler => config.handler_preset(name, &preset),
                };
                if stored.is_none() {
                    self.report(ValidationError::UndefinedPreset {
                        kind,
                        name: name.to_string(),
                        preset,
                    })?;
                }
                Ok(())
            }
            None => self.module_config(kind, name, &FlatConfig::new()),
        }
    }

    fn module_config(&mut self, kind: ModuleKind, name: &str, preset: &FlatConfig) -> Step {
        let schema = match kind {
            ModuleKind::Check => self.registry.check_schema(name),
            ModuleKind::Handler => self.registry.handler_schema(name),
        };
        // Unknown modules are reported before their presets are looked at.
        let Ok(schema) = schema else {
            return Ok(());
        };
        match from_config(&schema, preset) {
            Ok(_) => Ok(()),
            Err(source) => self.report(ValidationError::InvalidConfig {
                kind,
                name: name.to_string(),
                source,
            }),
        }
    }
}
