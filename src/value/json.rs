//! JSON and YAML import/export for object graphs.

use super::object::{Array, Composite, Object};
use super::value::Value;
use crate::error::{Error, Result};
use crate::fieldpath::{Path, PathElement};

impl From<serde_json::Value> for Value {
    fn from(json: serde_json::Value) -> Self {
        match json {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Value::Int(i),
                None => Value::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            serde_json::Value::String(s) => Value::String(s),
            serde_json::Value::Array(items) => {
                Value::Array(Array::from_values(items.into_iter().map(Value::from)))
            }
            serde_json::Value::Object(map) => {
                Value::Object(Object::from_pairs(map.into_iter().map(|(k, v)| (k, Value::from(v)))))
            }
        }
    }
}

/// Converts an acyclic graph to a JSON tree.
///
/// Functions and `Undefined` properties are left out of objects; inside
/// arrays they become `null`, as do natives and non-finite floats. Shared
/// sub-objects are written out once per occurrence.
pub fn to_json_value(value: &Value) -> Result<serde_json::Value> {
    let mut ancestors = Vec::new();
    export(value, &mut Path::new(), &mut ancestors)
}

fn export(
    value: &Value,
    path: &mut Path,
    ancestors: &mut Vec<Composite>,
) -> Result<serde_json::Value> {
    Ok(match value {
        Value::Undefined | Value::Null | Value::Function(_) | Value::Native(_) => {
            serde_json::Value::Null
        }
        Value::Bool(b) => serde_json::Value::Bool(*b),
        Value::Int(i) => serde_json::Value::from(*i),
        Value::Float(f) => serde_json::Number::from_f64(*f)
            .map(serde_json::Value::Number)
            .unwrap_or(serde_json::Value::Null),
        Value::String(s) => serde_json::Value::String(s.clone()),
        Value::Array(_) | Value::Object(_) => {
            let node = match value.as_composite() {
                Some(node) => node,
                None => return Ok(serde_json::Value::Null),
            };
            if ancestors.iter().any(|a| a.ptr_eq(&node)) {
                return Err(Error::Cycle { path: path.clone() });
            }
            ancestors.push(node.clone());
            let out = match &node {
                Composite::Array(a) => {
                    let mut items = Vec::with_capacity(a.len());
                    for (i, item) in a.items().iter().enumerate() {
                        path.push(PathElement::Index(i));
                        items.push(export(item, path, ancestors)?);
                        path.pop();
                    }
                    serde_json::Value::Array(items)
                }
                Composite::Object(o) => {
                    let mut map = serde_json::Map::new();
                    for (k, v) in o.entries() {
                        if v.is_undefined() || v.is_function() {
                            continue;
                        }
                        path.push(PathElement::FieldName(k.clone()));
                        let exported = export(&v, path, ancestors)?;
                        path.pop();
                        map.insert(k, exported);
                    }
                    serde_json::Value::Object(map)
                }
            };
            ancestors.pop();
            out
        }
    })
}

/// Parse a fresh, untokened graph from JSON.
pub fn from_json(json: &str) -> Result<Value> {
    let parsed: serde_json::Value = serde_json::from_str(json)?;
    Ok(Value::from(parsed))
}

/// Serialize an acyclic graph to JSON.
pub fn to_json(value: &Value) -> Result<String> {
    Ok(serde_json::to_string(&to_json_value(value)?)?)
}

/// Parse a fresh, untokened graph from YAML.
pub fn from_yaml(yaml: &str) -> Result<Value> {
    let parsed: serde_json::Value = serde_yaml::from_str(yaml)?;
    Ok(Value::from(parsed))
}

/// Serialize an acyclic graph to YAML.
pub fn to_yaml(value: &Value) -> Result<String> {
    Ok(serde_yaml::to_string(&to_json_value(value)?)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Function;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_json_roundtrip() {
        let value = from_json(r#"{"name":"test","count":42,"tags":["a",null,1.5]}"#).unwrap();
        let obj = value.as_object().unwrap();
        assert_eq!(obj.keys(), vec!["name", "count", "tags"]);
        assert_eq!(obj.get("count"), Value::Int(42));

        assert_eq!(
            to_json_value(&value).unwrap(),
            json!({"name": "test", "count": 42, "tags": ["a", null, 1.5]})
        );
    }

    #[test]
    fn test_yaml_import() {
        let value = from_yaml("a: 1\nb:\n  - x\n  - y\n").unwrap();
        assert_eq!(to_json_value(&value).unwrap(), json!({"a": 1, "b": ["x", "y"]}));
        assert!(to_yaml(&value).unwrap().contains("a: 1"));
    }

    #[test]
    fn test_export_skips_functions_and_undefined() {
        let obj = Object::new();
        obj.set("f", Function::new(|_| Value::Null));
        obj.set("u", Value::Undefined);
        obj.set("n", Value::Null);
        obj.set("list", Array::from_values([Value::Undefined, Value::from(1)]));
        assert_eq!(
            to_json_value(&obj.into()).unwrap(),
            json!({"n": null, "list": [null, 1]})
        );
    }

    #[test]
    fn test_export_rejects_cycles() {
        let obj = Object::new();
        let child = Object::new();
        obj.set("child", child.clone());
        child.set("parent", obj.clone());

        match to_json(&obj.into()) {
            Err(Error::Cycle { path }) => assert_eq!(path.to_string(), ".child.parent"),
            other => panic!("expected cycle error, got {:?}", other),
        }
    }

    #[test]
    fn test_export_allows_shared_subobjects() {
        let shared = Object::from_pairs([("v", 1)]);
        let root = Object::new();
        root.set("a", shared.clone());
        root.set("b", shared);
        assert_eq!(
            to_json_value(&root.into()).unwrap(),
            json!({"a": {"v": 1}, "b": {"v": 1}})
        );
    }
}
