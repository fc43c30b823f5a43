//! Conversion between flat dotted-key presets and [`ConfigObject`]s

use super::{ConfigObject, Field, FieldKind, Schema, SchemaError, Value};
use crate::config::tree::join_key;
use crate::config::{FlatConfig, Leaf};
use regex::Regex;

/// Build a typed object from a flat preset, validating every field.
pub fn from_config(schema: &Schema, config: &FlatConfig) -> Result<ConfigObject, SchemaError> {
    hydrate(schema, config, "", None)
}

/// Flatten an object back into dotted keys. Falsy values are omitted.
pub fn to_config(schema: &Schema, object: &ConfigObject) -> Result<FlatConfig, SchemaError> {
    let mut flat = FlatConfig::new();
    flatten(schema, object, "", &mut flat)?;
    Ok(flat)
}

fn hydrate(
    schema: &Schema,
    config: &FlatConfig,
    prefix: &str,
    id: Option<String>,
) -> Result<ConfigObject, SchemaError> {
    let mut object = ConfigObject {
        id,
        ..ConfigObject::default()
    };
    for field in &schema.fields {
        let path = join_key(prefix, &field.name);
        let value = if is_present(config, &path) {
            read(&field.kind, config, &path)?
        } else if field.optional {
            absent(field, &path)?
        } else {
            return Err(SchemaError::MissingField {
                schema: schema.name.clone(),
                field: path,
            });
        };
        object.fields.insert(field.name.clone(), value);
    }
    Ok(object)
}

fn absent(field: &Field, path: &str) -> Result<Value, SchemaError> {
    if let Some(default) = &field.default {
        return Ok(default.clone());
    }
    match &field.kind {
        FieldKind::Nested(schema) if field.hydrate_default => Ok(Value::Object(hydrate(
            schema,
            &FlatConfig::new(),
            path,
            None,
        )?)),
        _ => Ok(Value::Null),
    }
}

fn is_present(config: &FlatConfig, path: &str) -> bool {
    let nested = format!("{path}.");
    config.contains_key(path) || config.keys().any(|key| key.starts_with(&nested))
}

fn read(kind: &FieldKind, config: &FlatConfig, path: &str) -> Result<Value, SchemaError> {
    match kind {
        FieldKind::Nested(schema) => Ok(Value::Object(hydrate(schema, config, path, None)?)),
        FieldKind::Array {
            element,
            min_items,
            max_items,
        } => {
            let items = config.get(path).map(Leaf::to_strings).unwrap_or_default();
            check_count(path, items.len(), *min_items, *max_items)?;
            let values = match element.as_ref() {
                FieldKind::Nested(schema) => items
                    .into_iter()
                    .map(|id| {
                        let prefix = format!("{path}.{id}");
                        hydrate(schema, config, &prefix, Some(id)).map(Value::Object)
                    })
                    .collect::<Result<Vec<_>, _>>()?,
                FieldKind::Array { .. } => {
                    return Err(SchemaError::Type {
                        field: path.to_string(),
                        expected: "a list of scalars",
                        found: "a nested list".to_string(),
                    });
                }
                scalar => items
                    .iter()
                    .map(|item| coerce(scalar, path, item))
                    .collect::<Result<Vec<_>, _>>()?,
            };
            Ok(Value::List(values))
        }
        scalar => match config.get(path) {
            Some(Leaf::Scalar(raw)) => coerce(scalar, path, raw),
            Some(Leaf::List(items)) => Err(SchemaError::Type {
                field: path.to_string(),
                expected: scalar.type_name(),
                found: format!("[{}]", items.join(", ")),
            }),
            None => Err(SchemaError::Type {
                field: path.to_string(),
                expected: scalar.type_name(),
                found: "a section".to_string(),
            }),
        },
    }
}

fn check_count(
    path: &str,
    count: usize,
    min: Option<usize>,
    max: Option<usize>,
) -> Result<(), SchemaError> {
    if let Some(min) = min.filter(|min| count < *min) {
        return Err(SchemaError::TooFew {
            field: path.to_string(),
            count,
            min,
        });
    }
    if let Some(max) = max.filter(|max| count > *max) {
        return Err(SchemaError::TooMany {
            field: path.to_string(),
            count,
            max,
        });
    }
    Ok(())
}

fn coerce(kind: &FieldKind, path: &str, raw: &str) -> Result<Value, SchemaError> {
    let type_error = || SchemaError::Type {
        field: path.to_string(),
        expected: kind.type_name(),
        found: raw.to_string(),
    };
    match kind {
        FieldKind::String {
            min_len,
            max_len,
            pattern,
        } => {
            let length = raw.chars().count();
            if let Some(min) = min_len.filter(|min| length < *min) {
                return Err(SchemaError::TooShort {
                    field: path.to_string(),
                    min,
                });
            }
            if let Some(max) = max_len.filter(|max| length > *max) {
                return Err(SchemaError::TooLong {
                    field: path.to_string(),
                    max,
                });
            }
            if let Some(pattern) = pattern {
                let regex = Regex::new(&format!("^(?:{pattern})")).map_err(|source| {
                    SchemaError::InvalidRegex {
                        field: path.to_string(),
                        source,
                    }
                })?;
                if !regex.is_match(raw) {
                    return Err(SchemaError::Pattern {
                        field: path.to_string(),
                        value: raw.to_string(),
                        pattern: pattern.clone(),
                    });
                }
            }
            Ok(Value::String(raw.to_string()))
        }
        FieldKind::Integer => raw
            .trim()
            .parse::<i64>()
            .map(Value::Integer)
            .map_err(|_| type_error()),
        FieldKind::Boolean => match raw.trim().to_ascii_lowercase().as_str() {
            "true" | "yes" | "on" | "1" => Ok(Value::Boolean(true)),
            "false" | "no" | "off" | "0" => Ok(Value::Boolean(false)),
            _ => Err(type_error()),
        },
        FieldKind::Array { .. } | FieldKind::Nested(_) => Err(type_error()),
    }
}

fn flatten(
    schema: &Schema,
    object: &ConfigObject,
    prefix: &str,
    flat: &mut FlatConfig,
) -> Result<(), SchemaError> {
    for field in &schema.fields {
        let path = join_key(prefix, &field.name);
        let value = object.fields.get(&field.name).unwrap_or(&Value::Null);
        if value.is_falsy() {
            if !field.optional {
                return Err(SchemaError::Inconsistent { field: path });
            }
            continue;
        }

        match (&field.kind, value) {
            (FieldKind::Nested(nested), Value::Object(inner)) => {
                flatten(nested, inner, &path, flat)?;
            }
            (FieldKind::Array { element, .. }, Value::List(items)) => match element.as_ref() {
                FieldKind::Nested(nested) => {
                    // Reserve the id list's position ahead of the items.
                    flat.insert(path.clone(), Leaf::List(Vec::new()));
                    let mut ids = Vec::with_capacity(items.len());
                    for item in items {
                        let Value::Object(inner) = item else {
                            return Err(mismatch(&path, "a section", item));
                        };
                        let id = inner
                            .id
                            .clone()
                            .ok_or_else(|| SchemaError::MissingId { field: path.clone() })?;
                        flatten(nested, inner, &format!("{path}.{id}"), flat)?;
                        ids.push(id);
                    }
                    flat.insert(path, Leaf::List(ids));
                }
                scalar => {
                    let texts = items
                        .iter()
                        .map(|item| scalar_text(item).ok_or_else(|| mismatch(&path, scalar.type_name(), item)))
                        .collect::<Result<Vec<_>, _>>()?;
                    flat.insert(path, Leaf::List(texts));
                }
            },
            (kind, value) => {
                let text = scalar_text(value).ok_or_else(|| mismatch(&path, kind.type_name(), value))?;
                flat.insert(path, Leaf::Scalar(text));
            }
        }
    }
    Ok(())
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(text) => Some(text.clone()),
        Value::Integer(number) => Some(number.to_string()),
        Value::Boolean(flag) => Some(flag.to_string()),
        _ => None,
    }
}

fn mismatch(path: &str, expected: &'static str, value: &Value) -> SchemaError {
    SchemaError::Type {
        field: path.to_string(),
        expected,
        found: format!("{value:?}"),
    }
}
