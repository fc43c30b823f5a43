//! Project configuration model
//!
//! A [`Template`] is a thin typed view over a [`ConfigTree`]; a
//! [`ProjectConfig`] is a template with its inheritance chain already applied.
//! Profiles and processes are borrowed views, so reading a configuration
//! never copies the underlying tree.

use super::tree::{ConfigTree, FlatConfig, Leaf};
use crate::error::ConfigError;
use indexmap::IndexMap;
use lazy_static::lazy_static;
use regex::Regex;
use std::fmt;
use std::ops::{Deref, DerefMut};
use std::path::PathBuf;
use std::str::FromStr;

pub const DEFAULT_SECTION: &str = "DEFAULT";
pub const PROFILES: &str = "profiles";
pub const CHECKS: &str = "checks";
pub const HANDLERS: &str = "handlers";

lazy_static! {
    static ref CHECK_REF: Regex = Regex::new(
        r"^(?P<name>[A-Za-z]\w*)(?:\.(?P<config>\w*))?(?:\.(?P<interp>warning|delayonerror|abortonerror))?$"
    )
    .unwrap();
    static ref HANDLER_REF: Regex =
        Regex::new(r"^(?P<name>[A-Za-z]\w*)(?:\.(?P<config>\w*))?$").unwrap();
}

/// The two points of the commit lifecycle a process can be bound to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Hook {
    PreCommit,
    PostCommit,
}

impl Hook {
    pub const ALL: [Hook; 2] = [Hook::PreCommit, Hook::PostCommit];

    pub fn as_str(&self) -> &'static str {
        match self {
            Hook::PreCommit => "precommit",
            Hook::PostCommit => "postcommit",
        }
    }
}

impl fmt::Display for Hook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Hook {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "precommit" => Ok(Hook::PreCommit),
            "postcommit" => Ok(Hook::PostCommit),
            other => Err(ConfigError::UnknownHook(other.to_string())),
        }
    }
}

/// How a failing check affects the rest of its process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Interpretation {
    /// Downgrade errors to warnings and continue.
    Warning,
    /// Keep the error and continue with the next check.
    DelayOnError,
    /// Keep the error and stop the process.
    #[default]
    AbortOnError,
}

impl Interpretation {
    pub const ALL: [Interpretation; 3] = [
        Interpretation::Warning,
        Interpretation::DelayOnError,
        Interpretation::AbortOnError,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Interpretation::Warning => "warning",
            Interpretation::DelayOnError => "delayonerror",
            Interpretation::AbortOnError => "abortonerror",
        }
    }
}

impl fmt::Display for Interpretation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Interpretation {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Interpretation::ALL
            .into_iter()
            .find(|interp| interp.as_str() == s)
            .ok_or_else(|| ConfigError::UnknownInterpretation(s.to_string()))
    }
}

/// `Name[.Config][.Interpretation]` as written in a process check list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckRef {
    pub name: String,
    pub config: Option<String>,
    pub interp: Option<Interpretation>,
}

impl CheckRef {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            config: None,
            interp: None,
        }
    }

    pub fn with_config(mut self, config: impl Into<String>) -> Self {
        self.config = Some(config.into());
        self
    }

    pub fn with_interp(mut self, interp: Interpretation) -> Self {
        self.interp = Some(interp);
        self
    }
}

impl FromStr for CheckRef {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let caps = CHECK_REF
            .captures(s)
            .ok_or_else(|| ConfigError::InvalidReference {
                kind: "check",
                reference: s.to_string(),
            })?;
        let interp = match caps.name("interp") {
            Some(m) => Some(m.as_str().parse()?),
            None => None,
        };
        Ok(Self {
            name: caps["name"].to_string(),
            config: non_empty(caps.name("config").map(|m| m.as_str())),
            interp,
        })
    }
}

impl fmt::Display for CheckRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)?;
        match (&self.config, self.interp) {
            (Some(config), Some(interp)) => write!(f, ".{config}.{interp}"),
            (Some(config), None) => write!(f, ".{config}"),
            (None, Some(interp)) => write!(f, "..{interp}"),
            (None, None) => Ok(()),
        }
    }
}

/// `Name[.Config]` as written in a process handler list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandlerRef {
    pub name: String,
    pub config: Option<String>,
}

impl HandlerRef {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            config: None,
        }
    }

    pub fn with_config(mut self, config: impl Into<String>) -> Self {
        self.config = Some(config.into());
        self
    }
}

impl FromStr for HandlerRef {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let caps = HANDLER_REF
            .captures(s)
            .ok_or_else(|| ConfigError::InvalidReference {
                kind: "handler",
                reference: s.to_string(),
            })?;
        Ok(Self {
            name: caps["name"].to_string(),
            config: non_empty(caps.name("config").map(|m| m.as_str())),
        })
    }
}

impl fmt::Display for HandlerRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)?;
        if let Some(config) = &self.config {
            write!(f, ".{config}")?;
        }
        Ok(())
    }
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value.filter(|v| !v.is_empty()).map(str::to_string)
}

/// A check reference with its preset looked up and its interpretation
/// defaulted from the process.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedCheck {
    pub name: String,
    /// `None` when the reference names no preset.
    pub config: Option<FlatConfig>,
    pub interp: Interpretation,
}

/// A handler reference with its preset looked up.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedHandler {
    pub name: String,
    pub config: Option<FlatConfig>,
}

/// Owned description of a process, used to build configurations in code.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProcessSpec {
    pub default: Interpretation,
    pub checks: Vec<CheckRef>,
    pub success: Vec<HandlerRef>,
    pub error: Vec<HandlerRef>,
}

/// A reusable configuration fragment.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Template {
    tree: ConfigTree,
}

impl Template {
    pub fn new(tree: ConfigTree) -> Self {
        Self { tree }
    }

    pub fn tree(&self) -> &ConfigTree {
        &self.tree
    }

    pub fn tree_mut(&mut self) -> &mut ConfigTree {
        &mut self.tree
    }

    pub fn into_tree(self) -> ConfigTree {
        self.tree
    }

    /// Name of the parent template, if any.
    pub fn extends(&self) -> Option<&str> {
        self.tree.scalar("extends").filter(|name| !name.is_empty())
    }

    pub fn vcs(&self) -> &str {
        self.tree.scalar("vcs").unwrap_or("git")
    }

    /// The `DEFAULT` property bag used for interpolation.
    pub fn properties(&self) -> Option<&ConfigTree> {
        self.tree.section(DEFAULT_SECTION)
    }

    pub fn property(&self, key: &str) -> Option<&str> {
        self.properties()?.scalar(key)
    }

    pub fn set_property(&mut self, key: &str, value: &str) {
        self.tree
            .insert(&format!("{DEFAULT_SECTION}.{key}"), Leaf::from(value));
    }

    /// Profiles in declaration order.
    pub fn profiles(&self) -> Vec<Profile<'_>> {
        self.tree
            .section(PROFILES)
            .map(|profiles| {
                profiles
                    .sections()
                    .map(|(name, tree)| Profile {
                        template: self,
                        name,
                        tree,
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn profile(&self, name: &str) -> Option<Profile<'_>> {
        self.profiles().into_iter().find(|p| p.name == name)
    }

    pub fn has_profile(&self, name: &str) -> bool {
        self.profile(name).is_some()
    }

    /// Add a profile. An empty or missing regex makes it the default profile.
    pub fn add_profile(&mut self, name: &str, regex: Option<&str>) {
        let mut profile = ConfigTree::new();
        if let Some(regex) = regex.filter(|r| !r.is_empty()) {
            profile.insert("regex", regex);
        }
        match self.tree.section_mut(PROFILES) {
            Some(profiles) => profiles.insert(name, profile),
            None => {
                let mut profiles = ConfigTree::new();
                profiles.insert(name, profile);
                self.tree.insert(PROFILES, profiles);
            }
        }
    }

    pub fn remove_profile(&mut self, name: &str) {
        if let Some(profiles) = self.tree.section_mut(PROFILES) {
            profiles.remove(name);
            if profiles.is_empty() {
                self.tree.remove(PROFILES);
            }
        }
    }

    /// Store `process` under `profile.hook`, checking that every preset it
    /// names exists in the catalogs.
    pub fn set_process(
        &mut self,
        profile: &str,
        hook: Hook,
        process: &ProcessSpec,
    ) -> Result<(), ConfigError> {
        if !self.has_profile(profile) {
            return Err(ConfigError::UnknownProfile(profile.to_string()));
        }
        for check in &process.checks {
            if let Some(preset) = &check.config {
                self.require_preset(CHECKS, &check.name, preset)?;
            }
        }
        for handler in process.success.iter().chain(&process.error) {
            if let Some(preset) = &handler.config {
                self.require_preset(HANDLERS, &handler.name, preset)?;
            }
        }

        let mut tree = ConfigTree::new();
        tree.insert("default", process.default.as_str());
        tree.insert("checks", Leaf::List(to_strings(&process.checks)));
        tree.insert("success", Leaf::List(to_strings(&process.success)));
        tree.insert("error", Leaf::List(to_strings(&process.error)));
        if let Some(profiles) = self.tree.section_mut(PROFILES) {
            profiles.insert(&format!("{profile}.{hook}"), tree);
        }
        Ok(())
    }

    pub fn remove_process(&mut self, profile: &str, hook: Hook) {
        if let Some(profiles) = self.tree.section_mut(PROFILES) {
            profiles.remove(&format!("{profile}.{hook}"));
        }
    }

    fn require_preset(&self, kind: &'static str, module: &str, preset: &str) -> Result<(), ConfigError> {
        if self.preset(kind, module, preset).is_some() {
            Ok(())
        } else {
            Err(ConfigError::UnknownPreset {
                kind: catalog_kind(kind),
                module: module.to_string(),
                preset: preset.to_string(),
            })
        }
    }

    fn presets(&self, kind: &str, module: &str) -> Option<&ConfigTree> {
        self.tree.section(kind)?.section(module)
    }

    fn preset(&self, kind: &str, module: &str, preset: &str) -> Option<FlatConfig> {
        self.presets(kind, module)?.section(preset).map(ConfigTree::flatten)
    }

    /// Names of the modules that have presets in the given catalog.
    fn catalog(&self, kind: &str) -> Vec<&str> {
        self.tree
            .section(kind)
            .map(|catalog| catalog.sections().map(|(name, _)| name).collect())
            .unwrap_or_default()
    }

    fn set_preset(&mut self, kind: &str, module: &str, preset: &str, config: &FlatConfig) {
        self.tree
            .insert(&format!("{kind}.{module}.{preset}"), ConfigTree::from_flat(config));
    }

    fn remove_preset(&mut self, kind: &str, module: &str, preset: &str) {
        let Some(catalog) = self.tree.section_mut(kind) else {
            return;
        };
        if let Some(presets) = catalog.section_mut(module) {
            presets.remove(preset);
            if presets.is_empty() {
                catalog.remove(module);
            }
        }
        if catalog.is_empty() {
            self.tree.remove(kind);
        }
    }

    /// Presets stored for a check, by preset name.
    pub fn check_presets(&self, check: &str) -> IndexMap<String, FlatConfig> {
        collect_presets(self.presets(CHECKS, check))
    }

    pub fn check_preset(&self, check: &str, preset: &str) -> Option<FlatConfig> {
        self.preset(CHECKS, check, preset)
    }

    pub fn handler_presets(&self, handler: &str) -> IndexMap<String, FlatConfig> {
        collect_presets(self.presets(HANDLERS, handler))
    }

    pub fn handler_preset(&self, handler: &str, preset: &str) -> Option<FlatConfig> {
        self.preset(HANDLERS, handler, preset)
    }

    pub fn check_catalog(&self) -> Vec<&str> {
        self.catalog(CHECKS)
    }

    pub fn handler_catalog(&self) -> Vec<&str> {
        self.catalog(HANDLERS)
    }

    pub fn set_check_preset(&mut self, check: &str, preset: &str, config: &FlatConfig) {
        self.set_preset(CHECKS, check, preset, config);
    }

    pub fn set_handler_preset(&mut self, handler: &str, preset: &str, config: &FlatConfig) {
        self.set_preset(HANDLERS, handler, preset, config);
    }

    pub fn remove_check_preset(&mut self, check: &str, preset: &str) {
        self.remove_preset(CHECKS, check, preset);
    }

    pub fn remove_handler_preset(&mut self, handler: &str, preset: &str) {
        self.remove_preset(HANDLERS, handler, preset);
    }
}

fn collect_presets(presets: Option<&ConfigTree>) -> IndexMap<String, FlatConfig> {
    presets
        .map(|presets| {
            presets
                .sections()
                .map(|(name, tree)| (name.to_string(), tree.flatten()))
                .collect()
        })
        .unwrap_or_default()
}

fn catalog_kind(kind: &str) -> &'static str {
    if kind == CHECKS { "check" } else { "handler" }
}

fn to_strings<T: ToString>(items: &[T]) -> Vec<String> {
    items.iter().map(ToString::to_string).collect()
}

/// A named partition of the repository.
#[derive(Debug, Clone, Copy)]
pub struct Profile<'a> {
    template: &'a Template,
    name: &'a str,
    tree: &'a ConfigTree,
}

impl<'a> Profile<'a> {
    pub fn name(&self) -> &'a str {
        self.name
    }

    pub fn regex(&self) -> Option<&'a str> {
        self.tree.scalar("regex").filter(|r| !r.is_empty())
    }

    /// The default profile is the one without a regex.
    pub fn is_default(&self) -> bool {
        self.regex().is_none()
    }

    pub fn process(&self, hook: Hook) -> Option<Process<'a>> {
        self.tree.section(hook.as_str()).map(|tree| Process {
            template: self.template,
            profile: self.name,
            hook,
            tree,
        })
    }
}

/// Checks and handlers configured for one (profile, hook) pair.
#[derive(Debug, Clone, Copy)]
pub struct Process<'a> {
    template: &'a Template,
    profile: &'a str,
    hook: Hook,
    tree: &'a ConfigTree,
}

impl<'a> Process<'a> {
    pub fn profile(&self) -> &'a str {
        self.profile
    }

    pub fn hook(&self) -> Hook {
        self.hook
    }

    pub fn tree(&self) -> &'a ConfigTree {
        self.tree
    }

    /// Interpretation applied to checks that do not name one.
    pub fn default(&self) -> Result<Interpretation, ConfigError> {
        match self.tree.scalar("default") {
            Some(value) => value.parse(),
            None => Ok(Interpretation::default()),
        }
    }

    pub fn check_refs(&self) -> Result<Vec<CheckRef>, ConfigError> {
        self.refs("checks")
    }

    pub fn handler_refs(&self, success: bool) -> Result<Vec<HandlerRef>, ConfigError> {
        self.refs(if success { "success" } else { "error" })
    }

    fn refs<T: FromStr<Err = ConfigError>>(&self, key: &str) -> Result<Vec<T>, ConfigError> {
        self.tree
            .strings(key)
            .unwrap_or_default()
            .iter()
            .map(|reference| reference.parse())
            .collect()
    }

    /// Checks in declaration order with presets and interpretations resolved.
    pub fn checks(&self) -> Result<Vec<ResolvedCheck>, ConfigError> {
        let default = self.default()?;
        self.check_refs()?
            .into_iter()
            .map(|check| {
                let config = match &check.config {
                    Some(preset) => Some(self.template.check_preset(&check.name, preset).ok_or_else(
                        || ConfigError::UnknownPreset {
                            kind: "check",
                            module: check.name.clone(),
                            preset: preset.clone(),
                        },
                    )?),
                    None => None,
                };
                Ok(ResolvedCheck {
                    interp: check.interp.unwrap_or(default),
                    name: check.name,
                    config,
                })
            })
            .collect()
    }

    /// Success handlers when `success` is true, error handlers otherwise.
    pub fn handlers(&self, success: bool) -> Result<Vec<ResolvedHandler>, ConfigError> {
        self.handler_refs(success)?
            .into_iter()
            .map(|handler| {
                let config = match &handler.config {
                    Some(preset) => Some(
                        self.template
                            .handler_preset(&handler.name, preset)
                            .ok_or_else(|| ConfigError::UnknownPreset {
                                kind: "handler",
                                module: handler.name.clone(),
                                preset: preset.clone(),
                            })?,
                    ),
                    None => None,
                };
                Ok(ResolvedHandler {
                    name: handler.name,
                    config,
                })
            })
            .collect()
    }

    pub fn success_handlers(&self) -> Result<Vec<ResolvedHandler>, ConfigError> {
        self.handlers(true)
    }

    pub fn error_handlers(&self) -> Result<Vec<ResolvedHandler>, ConfigError> {
        self.handlers(false)
    }

    pub fn to_spec(&self) -> Result<ProcessSpec, ConfigError> {
        Ok(ProcessSpec {
            default: self.default()?,
            checks: self.check_refs()?,
            success: self.handler_refs(true)?,
            error: self.handler_refs(false)?,
        })
    }
}

/// A project configuration with its template chain applied.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProjectConfig {
    template: Template,
    /// Applied templates, root first, mapped to the file they came from.
    pub extended: IndexMap<String, PathBuf>,
}

impl ProjectConfig {
    pub fn new(template: Template, extended: IndexMap<String, PathBuf>) -> Self {
        Self { template, extended }
    }

    pub fn template(&self) -> &Template {
        &self.template
    }

    /// The hook scripts directory injected as `DEFAULT.hooks`.
    pub fn hooks_dir(&self) -> Option<&str> {
        self.template.property("hooks")
    }
}

impl Deref for ProjectConfig {
    type Target = Template;

    fn deref(&self) -> &Self::Target {
        &self.template
    }
}

impl DerefMut for ProjectConfig {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.template
    }
}
