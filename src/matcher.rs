//! Assignment of changed files to profiles
//!
//! Every profile with a regex claims the files matching it. The default
//! profile (the one without a regex) claims whatever no named profile
//! matched, expressed as a single combined exclusion pattern.

use crate::config::{ConfigError, Profile};
use crate::transaction::ChangedFiles;
use indexmap::IndexMap;
use lazy_static::lazy_static;
use regex::Regex;
use tracing::debug;

lazy_static! {
    static ref ANY: Regex = Regex::new(".*").unwrap();
}

/// The file view of one profile.
#[derive(Debug, Clone)]
pub struct ProfileScope {
    include: Regex,
    exclude: Option<Regex>,
}

impl ProfileScope {
    pub fn new(include: Regex, exclude: Option<Regex>) -> Self {
        Self { include, exclude }
    }

    /// A scope admitting every file.
    pub fn all() -> Self {
        Self::new(ANY.clone(), None)
    }

    pub fn include(&self) -> &Regex {
        &self.include
    }

    pub fn exclude(&self) -> Option<&Regex> {
        self.exclude.as_ref()
    }

    pub fn matches(&self, path: &str) -> bool {
        self.include.is_match(path)
            && !self.exclude.as_ref().is_some_and(|exclude| exclude.is_match(path))
    }
}

impl Default for ProfileScope {
    fn default() -> Self {
        Self::all()
    }
}

#[derive(Debug, Clone)]
pub struct ProfileMatcher {
    exclusion: Option<Regex>,
    scopes: IndexMap<String, ProfileScope>,
}

impl ProfileMatcher {
    /// Compile the scopes of `profiles`, keeping declaration order.
    pub fn new(profiles: &[Profile<'_>]) -> Result<Self, ConfigError> {
        let mut named = Vec::new();
        let mut scopes = IndexMap::new();
        for profile in profiles {
            if let Some(pattern) = profile.regex() {
                let include = compile(profile.name(), pattern)?;
                scopes.insert(profile.name().to_string(), ProfileScope::new(include, None));
                named.push(format!("(?:{pattern})"));
            }
        }

        // No named profiles: the default profile excludes nothing.
        let exclusion = if named.is_empty() {
            None
        } else {
            Some(compile("default", &named.join("|"))?)
        };
        debug!(
            exclusion = exclusion.as_ref().map(Regex::as_str).unwrap_or(""),
            "Default profile exclusion"
        );

        for profile in profiles.iter().filter(|p| p.is_default()) {
            scopes.insert(
                profile.name().to_string(),
                ProfileScope::new(ANY.clone(), exclusion.clone()),
            );
        }
        // Restore declaration order after inserting defaults last.
        let order: Vec<&str> = profiles.iter().map(|p| p.name()).collect();
        scopes.sort_by_cached_key(|name, _| order.iter().position(|n| n == name));

        Ok(Self { exclusion, scopes })
    }

    /// Union of every named profile's regex.
    pub fn exclusion(&self) -> Option<&Regex> {
        self.exclusion.as_ref()
    }

    pub fn scope(&self, profile: &str) -> Option<&ProfileScope> {
        self.scopes.get(profile)
    }

    /// Files of `files` that belong to `profile`.
    pub fn files_for(&self, profile: &str, files: &ChangedFiles) -> ChangedFiles {
        match self.scope(profile) {
            Some(scope) => files
                .iter()
                .filter(|(path, _)| scope.matches(path))
                .map(|(path, kind)| (path.clone(), kind.clone()))
                .collect(),
            None => ChangedFiles::new(),
        }
    }

    /// Names of the profiles that claim at least one of `files`, in
    /// declaration order.
    pub fn matching_profiles(&self, files: &ChangedFiles) -> Vec<&str> {
        self.scopes
            .iter()
            .filter(|(_, scope)| files.keys().any(|path| scope.matches(path)))
            .map(|(name, _)| name.as_str())
            .collect()
    }
}

fn compile(profile: &str, pattern: &str) -> Result<Regex, ConfigError> {
    Regex::new(pattern).map_err(|source| ConfigError::InvalidRegex {
        profile: profile.to_string(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ConfigTree, Template};
    use pretty_assertions::assert_eq;

    fn template() -> Template {
        Template::new(
            ConfigTree::from_toml_str(
                r#"
[profiles.default]
[profiles.ProjectA]
regex = "^ProjectA"
[profiles.ProjectB]
regex = "^ProjectB"
"#,
                "test",
            )
            .unwrap(),
        )
    }

    fn files(paths: &[&str]) -> ChangedFiles {
        paths
            .iter()
            .map(|path| (path.to_string(), "A".to_string()))
            .collect()
    }

    #[test]
    fn test_named_profile_claims_its_files() {
        let template = template();
        let matcher = ProfileMatcher::new(&template.profiles()).unwrap();
        assert_eq!(
            matcher.matching_profiles(&files(&["ProjectA/foo.txt"])),
            vec!["ProjectA"]
        );
    }

    #[test]
    fn test_unclaimed_files_go_to_default() {
        let template = template();
        let matcher = ProfileMatcher::new(&template.profiles()).unwrap();
        assert_eq!(
            matcher.matching_profiles(&files(&["Project/foo.txt"])),
            vec!["default"]
        );
        assert_eq!(
            matcher.matching_profiles(&files(&["ProjectB/x", "README"])),
            vec!["default", "ProjectB"]
        );
    }

    #[test]
    fn test_files_for_partitions() {
        let template = template();
        let matcher = ProfileMatcher::new(&template.profiles()).unwrap();
        let changed = files(&["ProjectA/a", "ProjectB/b", "other"]);
        assert_eq!(matcher.files_for("default", &changed), files(&["other"]));
        assert_eq!(matcher.files_for("ProjectA", &changed), files(&["ProjectA/a"]));
        assert!(matcher.files_for("missing", &changed).is_empty());
    }

    #[test]
    fn test_overlapping_profiles_both_match() {
        let template = Template::new(
            ConfigTree::from_toml_str(
                "[profiles.src]\nregex = \"^src/\"\n[profiles.rust]\nregex = '\\.rs$'",
                "test",
            )
            .unwrap(),
        );
        let matcher = ProfileMatcher::new(&template.profiles()).unwrap();
        assert_eq!(
            matcher.matching_profiles(&files(&["src/main.rs"])),
            vec!["src", "rust"]
        );
    }

    #[test]
    fn test_default_only_excludes_nothing() {
        let template = Template::new(
            ConfigTree::from_toml_str("[profiles.default]", "test").unwrap(),
        );
        let matcher = ProfileMatcher::new(&template.profiles()).unwrap();
        assert!(matcher.exclusion().is_none());
        assert_eq!(matcher.matching_profiles(&files(&["anything"])), vec!["default"]);
    }

    #[test]
    fn test_invalid_regex() {
        let template = Template::new(
            ConfigTree::from_toml_str("[profiles.bad]\nregex = \"(\"", "test").unwrap(),
        );
        assert!(matches!(
            ProfileMatcher::new(&template.profiles()),
            Err(ConfigError::InvalidRegex { .. })
        ));
    }
}
