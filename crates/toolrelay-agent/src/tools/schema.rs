//! Structural translation of provider JSON Schemas.
//!
//! MCP providers describe tool inputs with arbitrary JSON Schema. Before a
//! schema is handed to the model it is parsed into [`SchemaType`] and
//! re-emitted, which normalizes it to the subset the chat completions API
//! accepts. The conversion is total: anything unrecognized becomes
//! [`SchemaType::Any`] and is logged.

use std::collections::BTreeMap;

use serde_json::{json, Map, Value};
use tracing::warn;

/// A JSON Schema type, reduced to what tool inputs need.
#[derive(Clone, Debug, PartialEq)]
pub enum SchemaType {
    String,
    Number,
    Integer,
    Boolean,
    /// Closed set of literal values.
    Enum(Vec<Value>),
    Array(Box<SchemaType>),
    Object(ObjectSchema),
    /// Unset or unrecognized type; accepts anything.
    Any,
}

/// An object schema with described properties.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ObjectSchema {
    pub properties: BTreeMap<String, Property>,
    pub required: Vec<String>,
}

/// One object property.
#[derive(Clone, Debug, PartialEq)]
pub struct Property {
    pub schema: SchemaType,
    pub description: Option<String>,
}

impl SchemaType {
    /// Translate a JSON Schema node. `path` names the node in warnings.
    pub fn from_json(value: &Value, path: &str) -> SchemaType {
        let Some(obj) = value.as_object() else {
            warn!(path, "schema node is not an object, accepting any value");
            return SchemaType::Any;
        };

        if let Some(values) = obj.get("enum").and_then(Value::as_array) {
            return SchemaType::Enum(values.clone());
        }

        match declared_type(obj) {
            Some("string") => SchemaType::String,
            Some("number") => SchemaType::Number,
            Some("integer") => SchemaType::Integer,
            Some("boolean") => SchemaType::Boolean,
            Some("array") => SchemaType::Array(Box::new(array_items(obj, path))),
            Some("object") => SchemaType::Object(ObjectSchema::from_map(obj, path)),
            None if obj.contains_key("properties") => {
                SchemaType::Object(ObjectSchema::from_map(obj, path))
            }
            None if obj.contains_key("items") => SchemaType::Array(Box::new(array_items(obj, path))),
            other => {
                warn!(path, declared = ?other, "unsupported schema type, accepting any value");
                SchemaType::Any
            }
        }
    }

    /// Emit the JSON Schema form.
    pub fn to_json(&self) -> Value {
        match self {
            SchemaType::String => json!({ "type": "string" }),
            SchemaType::Number => json!({ "type": "number" }),
            SchemaType::Integer => json!({ "type": "integer" }),
            SchemaType::Boolean => json!({ "type": "boolean" }),
            SchemaType::Enum(values) => {
                if values.iter().all(Value::is_string) {
                    json!({ "type": "string", "enum": values })
                } else {
                    json!({ "enum": values })
                }
            }
            SchemaType::Array(items) => json!({ "type": "array", "items": items.to_json() }),
            SchemaType::Object(object) => object.to_json(),
            SchemaType::Any => json!({}),
        }
    }
}

/// The `type` keyword. For a list like `["string", "null"]` the first
/// non-null entry is used.
fn declared_type(obj: &Map<String, Value>) -> Option<&str> {
    match obj.get("type")? {
        Value::String(s) => Some(s.as_str()),
        Value::Array(types) => types
            .iter()
            .filter_map(Value::as_str)
            .find(|t| *t != "null"),
        _ => None,
    }
}

fn array_items(obj: &Map<String, Value>, path: &str) -> SchemaType {
    match obj.get("items") {
        Some(items) => SchemaType::from_json(items, &format!("{path}[]")),
        None => SchemaType::Any,
    }
}

impl ObjectSchema {
    fn from_map(obj: &Map<String, Value>, path: &str) -> ObjectSchema {
        let properties = obj
            .get("properties")
            .and_then(Value::as_object)
            .map(|props| {
                props
                    .iter()
                    .map(|(name, node)| {
                        let schema = SchemaType::from_json(node, &format!("{path}.{name}"));
                        let description = node
                            .get("description")
                            .and_then(Value::as_str)
                            .map(String::from);
                        (name.clone(), Property { schema, description })
                    })
                    .collect()
            })
            .unwrap_or_default();

        let required = obj
            .get("required")
            .and_then(Value::as_array)
            .map(|names| {
                names
                    .iter()
                    .filter_map(Value::as_str)
                    .map(String::from)
                    .collect()
            })
            .unwrap_or_default();

        ObjectSchema {
            properties,
            required,
        }
    }

    /// Translate a tool's input schema. A missing or non-object schema
    /// becomes an object with no properties.
    pub fn for_tool_input(value: Option<&Value>, tool_name: &str) -> ObjectSchema {
        match value.map(|v| SchemaType::from_json(v, tool_name)) {
            Some(SchemaType::Object(object)) => object,
            Some(other) => {
                warn!(tool = tool_name, schema = ?other, "tool input is not an object schema");
                ObjectSchema::default()
            }
            None => ObjectSchema::default(),
        }
    }

    /// Emit the JSON Schema form.
    pub fn to_json(&self) -> Value {
        let properties: Map<String, Value> = self
            .properties
            .iter()
            .map(|(name, prop)| {
                let mut node = prop.schema.to_json();
                if let (Some(desc), Some(map)) = (&prop.description, node.as_object_mut()) {
                    map.insert("description".into(), Value::String(desc.clone()));
                }
                (name.clone(), node)
            })
            .collect();

        json!({
            "type": "object",
            "properties": properties,
            "required": self.required,
        })
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_primitives() {
        assert_eq!(SchemaType::from_json(&json!({"type": "string"}), "x"), SchemaType::String);
        assert_eq!(SchemaType::from_json(&json!({"type": "number"}), "x"), SchemaType::Number);
        assert_eq!(SchemaType::from_json(&json!({"type": "integer"}), "x"), SchemaType::Integer);
        assert_eq!(SchemaType::from_json(&json!({"type": "boolean"}), "x"), SchemaType::Boolean);
    }

    #[test]
    fn test_unknown_and_missing_become_any() {
        assert_eq!(SchemaType::from_json(&json!({}), "x"), SchemaType::Any);
        assert_eq!(SchemaType::from_json(&json!({"type": "null"}), "x"), SchemaType::Any);
        assert_eq!(SchemaType::from_json(&json!({"type": "tuple"}), "x"), SchemaType::Any);
        assert_eq!(SchemaType::from_json(&json!(true), "x"), SchemaType::Any);
    }

    #[test]
    fn test_nullable_type_list() {
        let schema = SchemaType::from_json(&json!({"type": ["null", "integer"]}), "x");
        assert_eq!(schema, SchemaType::Integer);
    }

    #[test]
    fn test_nested_object_and_array() {
        let schema = SchemaType::from_json(
            &json!({
                "type": "object",
                "properties": {
                    "repo": {"type": "string", "description": "owner/name"},
                    "labels": {"type": "array", "items": {"type": "string"}},
                    "meta": {"properties": {"draft": {"type": "boolean"}}}
                },
                "required": ["repo"]
            }),
            "create_issue",
        );

        let SchemaType::Object(object) = schema else {
            panic!("expected object");
        };
        assert_eq!(object.required, vec!["repo"]);
        assert_eq!(object.properties["repo"].description.as_deref(), Some("owner/name"));
        assert_eq!(
            object.properties["labels"].schema,
            SchemaType::Array(Box::new(SchemaType::String))
        );
        assert!(matches!(object.properties["meta"].schema, SchemaType::Object(_)));
    }

    #[test]
    fn test_enum_round_trip() {
        let schema = SchemaType::from_json(&json!({"type": "string", "enum": ["utc", "local"]}), "x");
        assert_eq!(schema.to_json(), json!({"type": "string", "enum": ["utc", "local"]}));
    }

    #[test]
    fn test_object_to_json_keeps_descriptions() {
        let input = json!({
            "type": "object",
            "properties": {
                "path": {"type": "string", "description": "File path"},
                "anything": {}
            },
            "required": ["path"]
        });
        let object = ObjectSchema::for_tool_input(Some(&input), "read");
        let out = object.to_json();

        assert_eq!(out["type"], "object");
        assert_eq!(out["properties"]["path"]["type"], "string");
        assert_eq!(out["properties"]["path"]["description"], "File path");
        assert_eq!(out["properties"]["anything"], json!({}));
        assert_eq!(out["required"], json!(["path"]));
    }

    #[test]
    fn test_non_object_tool_input_is_empty_object() {
        let object = ObjectSchema::for_tool_input(Some(&json!({"type": "string"})), "odd");
        assert!(object.properties.is_empty());
        assert_eq!(ObjectSchema::for_tool_input(None, "none").to_json()["type"], "object");
    }
}
