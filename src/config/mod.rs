//! Project configuration and application settings
//!
//! Project configurations are TOML files read into a [`ConfigTree`], resolved
//! through their template chain and viewed through [`ProjectConfig`].
//! Application [`Settings`] (template search paths and the like) are layered
//! separately with figment.

pub mod project;
pub mod settings;
pub mod template;
pub mod tree;
pub mod validator;

pub use crate::error::ConfigError;
pub use project::{
    CheckRef, HandlerRef, Hook, Interpretation, Process, ProcessSpec, Profile, ProjectConfig,
    ResolvedCheck, ResolvedHandler, Template,
};
pub use settings::Settings;
pub use template::{TEMPLATE_SUFFIX, TemplateResolver};
pub use tree::{ConfigTree, FlatConfig, Leaf, Node};
pub use validator::{ConfigValidator, ValidationError, ValidationMode};
