//! Typed errors for configuration resolution and module lookup
//!
//! Check and handler logic, transactions and the CLI use `anyhow` with
//! context; the errors below are the ones callers are expected to match on.

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while loading, resolving or reading a project configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse {origin}: {source}")]
    Parse {
        origin: String,
        #[source]
        source: toml::de::Error,
    },

    #[error("Unsupported value for '{key}': {kind} cannot be stored in a config tree")]
    UnsupportedValue { key: String, kind: &'static str },

    #[error("Unable to extend '{name}': no template directory configured")]
    NoTemplateDirs { name: String },

    #[error("Unable to find template '{name}' in {searched}")]
    TemplateNotFound { name: String, searched: String },

    #[error("Template inheritance cycle: {chain}")]
    TemplateCycle { chain: String },

    #[error("Missing interpolation value '{name}' referenced by '{key}'")]
    MissingInterpolation { key: String, name: String },

    #[error("Interpolation of '{key}' exceeds the maximum depth of {depth}")]
    InterpolationDepth { key: String, depth: usize },

    #[error("Invalid {kind} reference '{reference}'")]
    InvalidReference {
        kind: &'static str,
        reference: String,
    },

    #[error("Unknown interpretation '{0}'")]
    UnknownInterpretation(String),

    #[error("Unknown hook '{0}'")]
    UnknownHook(String),

    #[error("Unknown {kind} config '{preset}' for '{module}'")]
    UnknownPreset {
        kind: &'static str,
        module: String,
        preset: String,
    },

    #[error("Invalid regex for profile '{profile}': {source}")]
    InvalidRegex {
        profile: String,
        #[source]
        source: regex::Error,
    },

    #[error("Unable to find profile '{0}'")]
    UnknownProfile(String),
}

/// The two families of pluggable modules.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModuleKind {
    Check,
    Handler,
}

impl std::fmt::Display for ModuleKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ModuleKind::Check => write!(f, "check"),
            ModuleKind::Handler => write!(f, "handler"),
        }
    }
}

/// Errors raised by the module registry.
#[derive(Debug, Error)]
pub enum ModuleError {
    #[error("The {kind} '{name}' was not found")]
    NotFound { kind: ModuleKind, name: String },
}
