//! Template inheritance
//!
//! A project configuration names its parent with `extends = "<name>"`; the
//! parent is read from `<name>.tpl.toml` in the first search directory that
//! has it. Parents are resolved recursively and the child is merged on top.

use super::project::{DEFAULT_SECTION, ProjectConfig, Template};
use super::tree::ConfigTree;
use crate::error::ConfigError;
use indexmap::IndexMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

pub const TEMPLATE_SUFFIX: &str = ".tpl.toml";

#[derive(Debug, Clone, Default)]
pub struct TemplateResolver {
    search_paths: Vec<PathBuf>,
}

impl TemplateResolver {
    pub fn new(search_paths: Vec<PathBuf>) -> Self {
        Self { search_paths }
    }

    pub fn search_paths(&self) -> &[PathBuf] {
        &self.search_paths
    }

    /// Load a project file and resolve it.
    pub fn load(&self, path: &Path, hooks_dir: &Path) -> Result<ProjectConfig, ConfigError> {
        self.resolve(ConfigTree::load(path)?, hooks_dir)
    }

    /// Apply the `extends` chain of `raw`, seed `DEFAULT.hooks` and
    /// interpolate the result.
    pub fn resolve(&self, raw: ConfigTree, hooks_dir: &Path) -> Result<ProjectConfig, ConfigError> {
        if let Some(name) = extends_of(&raw) {
            if self.search_paths.is_empty() {
                return Err(ConfigError::NoTemplateDirs { name });
            }
        }

        let mut extended = IndexMap::new();
        let merged = self.extend(raw, &mut Vec::new(), &mut extended)?;

        let mut tree = ConfigTree::new();
        tree.insert(
            &format!("{DEFAULT_SECTION}.hooks"),
            hooks_dir.display().to_string(),
        );
        tree.merge(&merged);
        tree.interpolate(DEFAULT_SECTION)?;

        info!(
            templates = extended.len(),
            "Resolved project configuration"
        );
        Ok(ProjectConfig::new(Template::new(tree), extended))
    }

    fn extend(
        &self,
        config: ConfigTree,
        chain: &mut Vec<String>,
        extended: &mut IndexMap<String, PathBuf>,
    ) -> Result<ConfigTree, ConfigError> {
        let Some(name) = extends_of(&config) else {
            return Ok(config);
        };
        let cyclic = chain.contains(&name);
        chain.push(name.clone());
        if cyclic {
            return Err(ConfigError::TemplateCycle {
                chain: chain.join(" -> "),
            });
        }

        let path = self.find(&name)?;
        debug!(template = %name, path = %path.display(), "Extending template");
        let parent = ConfigTree::load(&path)?;
        let mut base = self.extend(parent, chain, extended)?;
        base.merge(&config);
        extended.insert(name, path);
        Ok(base)
    }

    /// Locate `<name>.tpl.toml`; the first search directory containing it wins.
    pub fn find(&self, name: &str) -> Result<PathBuf, ConfigError> {
        let file = format!("{name}{TEMPLATE_SUFFIX}");
        self.search_paths
            .iter()
            .map(|dir| dir.join(&file))
            .find(|path| path.is_file())
            .ok_or_else(|| ConfigError::TemplateNotFound {
                name: name.to_string(),
                searched: self
                    .search_paths
                    .iter()
                    .map(|dir| dir.display().to_string())
                    .collect::<Vec<_>>()
                    .join(", "),
            })
    }
}

fn extends_of(tree: &ConfigTree) -> Option<String> {
    tree.scalar("extends")
        .filter(|name| !name.is_empty())
        .map(str::to_string)
}
