//! Declarative configuration schemas
//!
//! Checks and handlers describe their configuration as a [`Schema`]: an
//! ordered list of [`Field`]s. The serializer turns a flat preset into a
//! [`ConfigObject`] holding typed [`Value`]s and back again. Schemas only
//! describe shape; values live in the separate object type.

mod serializer;

pub use serializer::{from_config, to_config};

use serde::Serialize;
use indexmap::IndexMap;
use thiserror::Error;

/// Type of a single field.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldKind {
    String {
        min_len: Option<usize>,
        max_len: Option<usize>,
        /// Must match at the start of the value.
        pattern: Option<String>,
    },
    Integer,
    Boolean,
    Array {
        element: Box<FieldKind>,
        min_items: Option<usize>,
        max_items: Option<usize>,
    },
    Nested(Schema),
}

impl FieldKind {
    pub fn string() -> Self {
        FieldKind::String {
            min_len: None,
            max_len: None,
            pattern: None,
        }
    }

    pub fn array(element: FieldKind) -> Self {
        FieldKind::Array {
            element: Box::new(element),
            min_items: None,
            max_items: None,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            FieldKind::String { .. } => "a string",
            FieldKind::Integer => "an integer",
            FieldKind::Boolean => "a boolean",
            FieldKind::Array { .. } => "a list",
            FieldKind::Nested(_) => "a section",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    pub name: String,
    pub kind: FieldKind,
    pub optional: bool,
    pub default: Option<Value>,
    /// When absent, build the nested object from empty input instead of
    /// leaving the field unset.
    pub hydrate_default: bool,
}

impl Field {
    pub fn new(name: impl Into<String>, kind: FieldKind) -> Self {
        Self {
            name: name.into(),
            kind,
            optional: false,
            default: None,
            hydrate_default: false,
        }
    }

    pub fn string(name: impl Into<String>) -> Self {
        Self::new(name, FieldKind::string())
    }

    pub fn integer(name: impl Into<String>) -> Self {
        Self::new(name, FieldKind::Integer)
    }

    pub fn boolean(name: impl Into<String>) -> Self {
        Self::new(name, FieldKind::Boolean)
    }

    pub fn array(name: impl Into<String>, element: FieldKind) -> Self {
        Self::new(name, FieldKind::array(element))
    }

    pub fn nested(name: impl Into<String>, schema: Schema) -> Self {
        Self::new(name, FieldKind::Nested(schema))
    }

    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    /// Optional field with a default used when the key is absent.
    pub fn default_value(mut self, value: impl Into<Value>) -> Self {
        self.optional = true;
        self.default = Some(value.into());
        self
    }

    pub fn hydrate_default(mut self) -> Self {
        self.optional = true;
        self.hydrate_default = true;
        self
    }

    pub fn min_len(mut self, min: usize) -> Self {
        if let FieldKind::String { min_len, .. } = &mut self.kind {
            *min_len = Some(min);
        }
        self
    }

    pub fn max_len(mut self, max: usize) -> Self {
        if let FieldKind::String { max_len, .. } = &mut self.kind {
            *max_len = Some(max);
        }
        self
    }

    pub fn pattern(mut self, regex: impl Into<String>) -> Self {
        if let FieldKind::String { pattern, .. } = &mut self.kind {
            *pattern = Some(regex.into());
        }
        self
    }

    pub fn min_items(mut self, min: usize) -> Self {
        if let FieldKind::Array { min_items, .. } = &mut self.kind {
            *min_items = Some(min);
        }
        self
    }

    pub fn max_items(mut self, max: usize) -> Self {
        if let FieldKind::Array { max_items, .. } = &mut self.kind {
            *max_items = Some(max);
        }
        self
    }
}

/// Ordered field declarations for one configuration type.
#[derive(Debug, Clone, PartialEq)]
pub struct Schema {
    pub name: String,
    pub fields: Vec<Field>,
}

impl Schema {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: Vec::new(),
        }
    }

    pub fn field(mut self, field: Field) -> Self {
        self.fields.push(field);
        self
    }

    /// Append the fields of `other`, keeping this schema's name.
    pub fn extend(mut self, other: Schema) -> Self {
        self.fields.extend(other.fields);
        self
    }

    pub fn get(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|field| field.name == name)
    }
}

/// A typed configuration value.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    String(String),
    Integer(i64),
    Boolean(bool),
    List(Vec<Value>),
    Object(ConfigObject),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Empty strings and lists, zero, `false` and null are falsy.
    pub fn is_falsy(&self) -> bool {
        match self {
            Value::Null => true,
            Value::String(text) => text.is_empty(),
            Value::Integer(number) => *number == 0,
            Value::Boolean(flag) => !flag,
            Value::List(items) => items.is_empty(),
            Value::Object(_) => false,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(text) => Some(text),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Integer(number) => Some(*number),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Boolean(flag) => Some(*flag),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&ConfigObject> {
        match self {
            Value::Object(object) => Some(object),
            _ => None,
        }
    }
}

impl From<&str> for Value {
    fn from(text: &str) -> Self {
        Value::String(text.to_string())
    }
}

impl From<String> for Value {
    fn from(text: String) -> Self {
        Value::String(text)
    }
}

impl From<i64> for Value {
    fn from(number: i64) -> Self {
        Value::Integer(number)
    }
}

impl From<bool> for Value {
    fn from(flag: bool) -> Self {
        Value::Boolean(flag)
    }
}

impl From<Vec<&str>> for Value {
    fn from(items: Vec<&str>) -> Self {
        Value::List(items.into_iter().map(Value::from).collect())
    }
}

impl From<Vec<String>> for Value {
    fn from(items: Vec<String>) -> Self {
        Value::List(items.into_iter().map(Value::from).collect())
    }
}

impl From<ConfigObject> for Value {
    fn from(object: ConfigObject) -> Self {
        Value::Object(object)
    }
}

/// Values produced from a schema. Items of an array of nested objects carry
/// the identifier they were listed under.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ConfigObject {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(flatten)]
    pub fields: IndexMap<String, Value>,
}

impl ConfigObject {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_id(id: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
            fields: IndexMap::new(),
        }
    }

    pub fn set(&mut self, name: impl Into<String>, value: impl Into<Value>) -> &mut Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    /// Field value; unset and null fields both read as `None`.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.get(name).filter(|value| !value.is_null())
    }

    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.get(name)?.as_str()
    }

    pub fn get_int(&self, name: &str) -> Option<i64> {
        self.get(name)?.as_int()
    }

    pub fn get_bool(&self, name: &str) -> Option<bool> {
        self.get(name)?.as_bool()
    }

    /// String items of a list field; empty when unset.
    pub fn get_strings(&self, name: &str) -> Vec<String> {
        self.get(name)
            .and_then(Value::as_list)
            .map(|items| {
                items
                    .iter()
                    .filter_map(|item| item.as_str().map(str::to_string))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Optional list field: `None` when unset, the items otherwise.
    pub fn get_opt_strings(&self, name: &str) -> Option<Vec<String>> {
        self.get(name).map(|_| self.get_strings(name))
    }

    pub fn get_object(&self, name: &str) -> Option<&ConfigObject> {
        self.get(name)?.as_object()
    }

    pub fn get_objects(&self, name: &str) -> Vec<&ConfigObject> {
        self.get(name)
            .and_then(Value::as_list)
            .map(|items| items.iter().filter_map(Value::as_object).collect())
            .unwrap_or_default()
    }
}

/// Build a concrete configuration struct from its schema.
pub trait FromConfig: Sized {
    fn schema() -> Schema;

    fn from_object(object: &ConfigObject) -> Result<Self, SchemaError>;

    fn from_flat(config: &crate::config::FlatConfig) -> Result<Self, SchemaError> {
        Self::from_object(&from_config(&Self::schema(), config)?)
    }
}

#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("Missing required field '{field}' in {schema} configuration")]
    MissingField { schema: String, field: String },

    #[error("Field '{field}' expects {expected}, got '{found}'")]
    Type {
        field: String,
        expected: &'static str,
        found: String,
    },

    #[error("Field '{field}' is shorter than {min} characters")]
    TooShort { field: String, min: usize },

    #[error("Field '{field}' is longer than {max} characters")]
    TooLong { field: String, max: usize },

    #[error("Field '{field}' value '{value}' does not match '{pattern}'")]
    Pattern {
        field: String,
        value: String,
        pattern: String,
    },

    #[error("Field '{field}' has {count} items, expected at least {min}")]
    TooFew {
        field: String,
        count: usize,
        min: usize,
    },

    #[error("Field '{field}' has {count} items, expected at most {max}")]
    TooMany {
        field: String,
        count: usize,
        max: usize,
    },

    #[error("Field '{field}' declares an invalid pattern: {source}")]
    InvalidRegex {
        field: String,
        #[source]
        source: regex::Error,
    },

    #[error("Required field '{field}' has no value")]
    Inconsistent { field: String },

    #[error("An item of '{field}' has no identifier")]
    MissingId { field: String },
}
