//! Hierarchical key/value tree used for project configurations
//!
//! A tree is an ordered mapping of keys to nodes. A node is either a leaf
//! (a scalar or an ordered list of scalars) or a nested section. Dotted
//! composite keys such as `checks.RejectTabs.default.check_files` address a
//! path through nested sections. A key may also be stored verbatim with dots
//! in it (`"name.foo1.var"`), which is how arrays of nested objects are
//! written; lookups resolve both forms.

use crate::error::ConfigError;
use indexmap::IndexMap;
use lazy_static::lazy_static;
use regex::Regex;
use serde::Serialize;
use std::path::Path;

/// Maximum nesting of `${name}` references inside DEFAULT values.
pub const MAX_INTERPOLATION_DEPTH: usize = 10;

lazy_static! {
    // `$$` escape, `${name}` or `$name`
    static ref INTERPOLATION: Regex =
        Regex::new(r"\$(?:(\$)|\{([^}]*)\}|([A-Za-z_][A-Za-z0-9_]*))").unwrap();
}

/// A terminal value in the tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Leaf {
    Scalar(String),
    List(Vec<String>),
}

impl Leaf {
    pub fn as_scalar(&self) -> Option<&str> {
        match self {
            Leaf::Scalar(value) => Some(value),
            Leaf::List(_) => None,
        }
    }

    pub fn as_list(&self) -> Option<&[String]> {
        match self {
            Leaf::List(items) => Some(items),
            Leaf::Scalar(_) => None,
        }
    }

    /// Returns the leaf as a list, treating a scalar as a single element.
    pub fn to_strings(&self) -> Vec<String> {
        match self {
            Leaf::Scalar(value) => vec![value.clone()],
            Leaf::List(items) => items.clone(),
        }
    }
}

impl From<&str> for Leaf {
    fn from(value: &str) -> Self {
        Leaf::Scalar(value.to_string())
    }
}

impl From<String> for Leaf {
    fn from(value: String) -> Self {
        Leaf::Scalar(value)
    }
}

impl From<Vec<String>> for Leaf {
    fn from(items: Vec<String>) -> Self {
        Leaf::List(items)
    }
}

impl From<Vec<&str>> for Leaf {
    fn from(items: Vec<&str>) -> Self {
        Leaf::List(items.into_iter().map(str::to_string).collect())
    }
}

/// A node of the tree: either a leaf or a nested section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Node {
    Leaf(Leaf),
    Section(ConfigTree),
}

impl From<Leaf> for Node {
    fn from(leaf: Leaf) -> Self {
        Node::Leaf(leaf)
    }
}

impl From<&str> for Node {
    fn from(value: &str) -> Self {
        Node::Leaf(value.into())
    }
}

impl From<String> for Node {
    fn from(value: String) -> Self {
        Node::Leaf(value.into())
    }
}

impl From<Vec<String>> for Node {
    fn from(items: Vec<String>) -> Self {
        Node::Leaf(items.into())
    }
}

impl From<Vec<&str>> for Node {
    fn from(items: Vec<&str>) -> Self {
        Node::Leaf(items.into())
    }
}

impl From<ConfigTree> for Node {
    fn from(tree: ConfigTree) -> Self {
        Node::Section(tree)
    }
}

/// Flat view of a section: dotted keys mapped to leaves, in tree order.
pub type FlatConfig = IndexMap<String, Leaf>;

/// An ordered section of the configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ConfigTree {
    entries: IndexMap<String, Node>,
}

impl ConfigTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse TOML content. `origin` names the source in error messages.
    pub fn from_toml_str(content: &str, origin: &str) -> Result<Self, ConfigError> {
        let table: toml::Table = toml::from_str(content).map_err(|source| ConfigError::Parse {
            origin: origin.to_string(),
            source,
        })?;
        Self::from_table(&table, "")
    }

    /// Load and parse a TOML file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content, &path.display().to_string())
    }

    fn from_table(table: &toml::Table, prefix: &str) -> Result<Self, ConfigError> {
        let mut tree = ConfigTree::new();
        for (key, value) in table {
            let path = join_key(prefix, key);
            let node = match value {
                toml::Value::Table(inner) => Node::Section(Self::from_table(inner, &path)?),
                toml::Value::Array(items) => Node::Leaf(Leaf::List(
                    items
                        .iter()
                        .map(|item| scalar_string(item, &path))
                        .collect::<Result<_, _>>()?,
                )),
                other => Node::Leaf(Leaf::Scalar(scalar_string(other, &path)?)),
            };
            tree.entries.insert(key.clone(), node);
        }
        Ok(tree)
    }

    /// Build a tree from a flat mapping.
    ///
    /// Where a prefix of a key is already a leaf (an array of nested objects
    /// stores its item ids under `name` and the items under `name.<id>.*`),
    /// the remainder is kept as a literal dotted key next to that leaf.
    pub fn from_flat(flat: &FlatConfig) -> Self {
        let mut tree = ConfigTree::new();
        for (key, leaf) in flat {
            tree.place(key, leaf.clone());
        }
        tree
    }

    fn place(&mut self, key: &str, leaf: Leaf) {
        match key.split_once('.') {
            None => {
                if let Some(Node::Section(existing)) = self.entries.get(key) {
                    let moved: Vec<(String, Leaf)> = existing
                        .flatten()
                        .into_iter()
                        .map(|(inner, value)| (format!("{key}.{inner}"), value))
                        .collect();
                    self.entries.shift_remove(key);
                    self.entries.insert(key.to_string(), Node::Leaf(leaf));
                    for (inner, value) in moved {
                        self.entries.insert(inner, Node::Leaf(value));
                    }
                } else {
                    self.entries.insert(key.to_string(), Node::Leaf(leaf));
                }
            }
            Some((head, rest)) => match self.entries.get_mut(head) {
                Some(Node::Section(child)) => child.place(rest, leaf),
                Some(Node::Leaf(_)) => {
                    self.entries.insert(key.to_string(), Node::Leaf(leaf));
                }
                None => {
                    let mut child = ConfigTree::new();
                    child.place(rest, leaf);
                    self.entries.insert(head.to_string(), Node::Section(child));
                }
            },
        }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Direct children in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Node)> {
        self.entries.iter().map(|(key, node)| (key.as_str(), node))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Direct child sections in declaration order.
    pub fn sections(&self) -> impl Iterator<Item = (&str, &ConfigTree)> {
        self.entries.iter().filter_map(|(key, node)| match node {
            Node::Section(section) => Some((key.as_str(), section)),
            Node::Leaf(_) => None,
        })
    }

    /// Look up a node by dotted path.
    pub fn get(&self, path: &str) -> Option<&Node> {
        let segments: Vec<&str> = path.split('.').collect();
        self.lookup(&segments)
    }

    fn lookup(&self, segments: &[&str]) -> Option<&Node> {
        // Longest literal key first, so verbatim dotted keys win over nesting.
        for split in (1..=segments.len()).rev() {
            let key = segments[..split].join(".");
            match self.entries.get(&key) {
                Some(node) if split == segments.len() => return Some(node),
                Some(Node::Section(child)) => {
                    if let Some(found) = child.lookup(&segments[split..]) {
                        return Some(found);
                    }
                }
                _ => {}
            }
        }
        None
    }

    pub fn contains(&self, path: &str) -> bool {
        self.get(path).is_some()
    }

    pub fn leaf(&self, path: &str) -> Option<&Leaf> {
        match self.get(path)? {
            Node::Leaf(leaf) => Some(leaf),
            Node::Section(_) => None,
        }
    }

    pub fn scalar(&self, path: &str) -> Option<&str> {
        self.leaf(path)?.as_scalar()
    }

    /// List value at `path`; a scalar is returned as a single element.
    pub fn strings(&self, path: &str) -> Option<Vec<String>> {
        self.leaf(path).map(Leaf::to_strings)
    }

    pub fn section(&self, path: &str) -> Option<&ConfigTree> {
        match self.get(path)? {
            Node::Section(section) => Some(section),
            Node::Leaf(_) => None,
        }
    }

    pub fn section_mut(&mut self, path: &str) -> Option<&mut ConfigTree> {
        let (head, rest) = match path.split_once('.') {
            Some((head, rest)) => (head, Some(rest)),
            None => (path, None),
        };
        match (self.entries.get_mut(head)?, rest) {
            (Node::Section(section), None) => Some(section),
            (Node::Section(section), Some(rest)) => section.section_mut(rest),
            (Node::Leaf(_), _) => None,
        }
    }

    /// Set `path` to `node`, creating intermediate sections. A leaf standing
    /// where a section is needed is replaced.
    pub fn insert(&mut self, path: &str, node: impl Into<Node>) {
        let node = node.into();
        match path.split_once('.') {
            None => {
                self.entries.insert(path.to_string(), node);
            }
            Some((head, rest)) => {
                let entry = self
                    .entries
                    .entry(head.to_string())
                    .or_insert_with(|| Node::Section(ConfigTree::new()));
                if !matches!(entry, Node::Section(_)) {
                    *entry = Node::Section(ConfigTree::new());
                }
                if let Node::Section(child) = entry {
                    child.insert(rest, node);
                }
            }
        }
    }

    pub fn remove(&mut self, path: &str) -> Option<Node> {
        if let Some(node) = self.entries.shift_remove(path) {
            return Some(node);
        }
        let (head, rest) = path.split_once('.')?;
        match self.entries.get_mut(head)? {
            Node::Section(child) => child.remove(rest),
            Node::Leaf(_) => None,
        }
    }

    /// Deep-merge `overrides` on top of this tree. Leaves from `overrides`
    /// replace existing nodes; sections merge key-wise.
    pub fn merge(&mut self, overrides: &ConfigTree) {
        for (key, node) in &overrides.entries {
            match (self.entries.get_mut(key), node) {
                (Some(Node::Section(base)), Node::Section(over)) => base.merge(over),
                _ => {
                    self.entries.insert(key.clone(), node.clone());
                }
            }
        }
    }

    /// Flatten into dotted keys. Empty sections are dropped.
    pub fn flatten(&self) -> FlatConfig {
        let mut flat = FlatConfig::new();
        self.flatten_into("", &mut flat);
        flat
    }

    fn flatten_into(&self, prefix: &str, flat: &mut FlatConfig) {
        for (key, node) in &self.entries {
            let path = join_key(prefix, key);
            match node {
                Node::Leaf(leaf) => {
                    flat.insert(path, leaf.clone());
                }
                Node::Section(section) => section.flatten_into(&path, flat),
            }
        }
    }

    /// Replace `${name}`, `$name` and `$$` in every string of the tree.
    ///
    /// Names resolve against the scalar values of the section at
    /// `defaults_key`, which are themselves expanded first.
    pub fn interpolate(&mut self, defaults_key: &str) -> Result<(), ConfigError> {
        let raw: IndexMap<String, String> = self
            .section(defaults_key)
            .map(|defaults| {
                defaults
                    .entries
                    .iter()
                    .filter_map(|(key, node)| match node {
                        Node::Leaf(Leaf::Scalar(value)) => Some((key.clone(), value.clone())),
                        _ => None,
                    })
                    .collect()
            })
            .unwrap_or_default();

        for (key, node) in self.entries.iter_mut() {
            interpolate_node(node, key, &raw)?;
        }
        Ok(())
    }
}

fn interpolate_node(
    node: &mut Node,
    path: &str,
    defaults: &IndexMap<String, String>,
) -> Result<(), ConfigError> {
    match node {
        Node::Leaf(Leaf::Scalar(value)) => *value = expand(value, path, defaults, 0)?,
        Node::Leaf(Leaf::List(items)) => {
            for item in items.iter_mut() {
                *item = expand(item, path, defaults, 0)?;
            }
        }
        Node::Section(section) => {
            for (key, child) in section.entries.iter_mut() {
                interpolate_node(child, &join_key(path, key), defaults)?;
            }
        }
    }
    Ok(())
}

fn expand(
    value: &str,
    key: &str,
    defaults: &IndexMap<String, String>,
    depth: usize,
) -> Result<String, ConfigError> {
    if !value.contains('$') {
        return Ok(value.to_string());
    }
    if depth > MAX_INTERPOLATION_DEPTH {
        return Err(ConfigError::InterpolationDepth {
            key: key.to_string(),
            depth: MAX_INTERPOLATION_DEPTH,
        });
    }

    let mut expanded = String::with_capacity(value.len());
    let mut last = 0;
    for caps in INTERPOLATION.captures_iter(value) {
        let Some(whole) = caps.get(0) else { continue };
        expanded.push_str(&value[last..whole.start()]);
        if caps.get(1).is_some() {
            expanded.push('$');
        } else {
            let name = caps
                .get(2)
                .or_else(|| caps.get(3))
                .map(|m| m.as_str())
                .unwrap_or_default();
            let replacement =
                defaults
                    .get(name)
                    .ok_or_else(|| ConfigError::MissingInterpolation {
                        key: key.to_string(),
                        name: name.to_string(),
                    })?;
            expanded.push_str(&expand(replacement, key, defaults, depth + 1)?);
        }
        last = whole.end();
    }
    expanded.push_str(&value[last..]);
    Ok(expanded)
}

fn scalar_string(value: &toml::Value, key: &str) -> Result<String, ConfigError> {
    match value {
        toml::Value::String(text) => Ok(text.clone()),
        toml::Value::Integer(number) => Ok(number.to_string()),
        toml::Value::Float(number) => Ok(number.to_string()),
        toml::Value::Boolean(flag) => Ok(flag.to_string()),
        toml::Value::Datetime(datetime) => Ok(datetime.to_string()),
        toml::Value::Array(_) => Err(ConfigError::UnsupportedValue {
            key: key.to_string(),
            kind: "a nested array",
        }),
        toml::Value::Table(_) => Err(ConfigError::UnsupportedValue {
            key: key.to_string(),
            kind: "an array of tables",
        }),
    }
}

pub(crate) fn join_key(prefix: &str, key: &str) -> String {
    if prefix.is_empty() {
        key.to_string()
    } else {
        format!("{prefix}.{key}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn parse(content: &str) -> ConfigTree {
        ConfigTree::from_toml_str(content, "test").unwrap()
    }

    #[test]
    fn test_dotted_and_nested_keys_are_interchangeable() {
        let dotted = parse("protocol.include = [\"Log\"]\nprotocol.template = \"x\"");
        let nested = parse("[protocol]\ninclude = [\"Log\"]\ntemplate = \"x\"");
        assert_eq!(dotted.flatten(), nested.flatten());
        assert_eq!(
            nested.strings("protocol.include"),
            Some(vec!["Log".to_string()])
        );
    }

    #[test]
    fn test_literal_dotted_keys_resolve() {
        let tree = parse("name = [\"foo1\"]\n\"name.foo1.var\" = \"test1\"");
        assert_eq!(tree.scalar("name.foo1.var"), Some("test1"));
        assert_eq!(tree.strings("name"), Some(vec!["foo1".to_string()]));
    }

    #[test]
    fn test_scalars_become_strings() {
        let tree = parse("count = 3\nenabled = true\nratio = 0.5");
        assert_eq!(tree.scalar("count"), Some("3"));
        assert_eq!(tree.scalar("enabled"), Some("true"));
        assert_eq!(tree.scalar("ratio"), Some("0.5"));
    }

    #[test]
    fn test_arrays_of_tables_are_rejected() {
        let err = ConfigTree::from_toml_str("[[items]]\nname = \"a\"", "test").unwrap_err();
        assert!(matches!(err, ConfigError::UnsupportedValue { .. }));
    }

    #[test]
    fn test_merge_child_wins_and_sections_merge() {
        let mut parent = parse(
            r#"
vcs = "git"
[profiles.default.precommit]
checks = ["RejectTabs"]
success = ["Console"]
"#,
        );
        let child = parse(
            r#"
[profiles.default.precommit]
checks = ["Log"]
[profiles.web]
regex = "^web/"
"#,
        );
        parent.merge(&child);

        assert_eq!(parent.scalar("vcs"), Some("git"));
        assert_eq!(
            parent.strings("profiles.default.precommit.checks"),
            Some(vec!["Log".to_string()])
        );
        assert_eq!(
            parent.strings("profiles.default.precommit.success"),
            Some(vec!["Console".to_string()])
        );
        assert_eq!(parent.scalar("profiles.web.regex"), Some("^web/"));
    }

    #[test]
    fn test_merge_preserves_parent_order() {
        let mut parent = parse("[profiles.a]\n[profiles.b]");
        let child = parse("[profiles.c]\n[profiles.a]\nregex = \"x\"");
        parent.merge(&child);
        let order: Vec<&str> = parent.section("profiles").unwrap().keys().collect();
        assert_eq!(order, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_from_flat_keeps_item_keys_beside_list() {
        let mut flat = FlatConfig::new();
        flat.insert("name".into(), Leaf::from(vec!["foo1", "foo2"]));
        flat.insert("name.foo1.var".into(), Leaf::from("test1"));
        flat.insert("subclass.var".into(), Leaf::from("test"));

        let tree = ConfigTree::from_flat(&flat);
        assert_eq!(tree.scalar("name.foo1.var"), Some("test1"));
        assert_eq!(tree.scalar("subclass.var"), Some("test"));
        assert_eq!(tree.flatten(), flat);
    }

    #[test]
    fn test_insert_and_remove() {
        let mut tree = ConfigTree::new();
        tree.insert("checks.Log.default.viewvc.url", "http://example.org");
        assert!(tree.section("checks.Log.default").is_some());
        assert!(tree.remove("checks.Log.default.viewvc.url").is_some());
        assert!(!tree.contains("checks.Log.default.viewvc.url"));
    }

    #[test]
    fn test_interpolation() {
        let mut tree = parse(
            r#"
[DEFAULT]
hooks = "/repo/hooks"
scripts = "${hooks}/scripts"

[handlers.File.default]
file = "$scripts/log.txt"
price = "$$5"
patterns = ["${hooks}/a", '\.py$']
"#,
        );
        tree.interpolate("DEFAULT").unwrap();
        assert_eq!(
            tree.scalar("handlers.File.default.file"),
            Some("/repo/hooks/scripts/log.txt")
        );
        assert_eq!(tree.scalar("handlers.File.default.price"), Some("$5"));
        assert_eq!(
            tree.strings("handlers.File.default.patterns"),
            Some(vec!["/repo/hooks/a".to_string(), r"\.py$".to_string()])
        );
        assert_eq!(tree.scalar("DEFAULT.scripts"), Some("/repo/hooks/scripts"));
    }

    #[test]
    fn test_interpolation_missing_name() {
        let mut tree = parse("value = \"${nowhere}\"");
        let err = tree.interpolate("DEFAULT").unwrap_err();
        assert!(matches!(err, ConfigError::MissingInterpolation { name, .. } if name == "nowhere"));
    }

    #[test]
    fn test_interpolation_depth_limit() {
        let mut tree = parse("[DEFAULT]\nloop = \"$loop\"\n[x]\nvalue = \"$loop\"");
        let err = tree.interpolate("DEFAULT").unwrap_err();
        assert!(matches!(err, ConfigError::InterpolationDepth { .. }));
    }
}
