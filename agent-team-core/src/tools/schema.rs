use serde::Serialize;
use serde_json::{json, Map, Value};

use crate::error::{Error, Result};

/// Parameter names that carry call context and never appear in a schema.
pub const CONTEXT_PARAMS: [&str; 3] = ["self", "ctx", "context"];

#[derive(Debug, Clone, PartialEq)]
pub enum ParamType {
    String,
    Integer,
    Float,
    Boolean,
    /// Enumerated literals; all strings or all numbers.
    Enum(Vec<Value>),
    Optional(Box<ParamType>),
    Union(Vec<ParamType>),
    List(Box<ParamType>),
    Map(Box<ParamType>),
    Null,
}

impl ParamType {
    pub fn optional(inner: ParamType) -> Self {
        ParamType::Optional(Box::new(inner))
    }

    pub fn string_enum<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        ParamType::Enum(values.into_iter().map(|value| Value::String(value.into())).collect())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParamSpec {
    pub name: String,
    /// `None` models a parameter declared without a type.
    pub ty: Option<ParamType>,
}

impl ParamSpec {
    pub fn new(name: impl Into<String>, ty: ParamType) -> Self {
        Self {
            name: name.into(),
            ty: Some(ty),
        }
    }

    pub fn untyped(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ty: None,
        }
    }

    pub fn is_context(&self) -> bool {
        CONTEXT_PARAMS.contains(&self.name.as_str())
    }
}

/// Declared shape of a callable tool.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolSignature {
    pub name: String,
    pub description: Option<String>,
    pub params: Vec<ParamSpec>,
}

impl ToolSignature {
    pub fn new(name: impl Into<String>, description: impl Into<String>, params: Vec<ParamSpec>) -> Self {
        Self {
            name: name.into(),
            description: Some(description.into()),
            params,
        }
    }

    pub fn undocumented(name: impl Into<String>, params: Vec<ParamSpec>) -> Self {
        Self {
            name: name.into(),
            description: None,
            params,
        }
    }
}

/// Function-calling schema offered to the model for one tool.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolSchema {
    #[serde(rename = "type")]
    pub kind: String,
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

impl ToolSchema {
    pub fn from_signature(signature: &ToolSignature) -> Result<Self> {
        let mut properties = Map::new();
        let mut required = Vec::new();

        for param in signature.params.iter().filter(|param| !param.is_context()) {
            let ty = param.ty.as_ref().ok_or_else(|| {
                Error::Schema(format!(
                    "parameter '{}' of tool '{}' has no type annotation",
                    param.name, signature.name
                ))
            })?;
            let property = property_schema(ty).map_err(|reason| {
                Error::Schema(format!(
                    "parameter '{}' of tool '{}': {reason}",
                    param.name, signature.name
                ))
            })?;
            properties.insert(param.name.clone(), property);
            required.push(Value::String(param.name.clone()));
        }

        Ok(Self {
            kind: "function".to_owned(),
            name: signature.name.clone(),
            description: signature.description.clone().unwrap_or_default(),
            parameters: json!({
                "type": "object",
                "properties": properties,
                "required": required,
                "additionalProperties": false,
            }),
        })
    }

    pub fn required(&self) -> Vec<&str> {
        self.parameters["required"]
            .as_array()
            .map(|names| names.iter().filter_map(Value::as_str).collect())
            .unwrap_or_default()
    }
}

fn property_schema(ty: &ParamType) -> std::result::Result<Value, String> {
    match ty {
        ParamType::String => Ok(json!({ "type": "string" })),
        ParamType::Integer => Ok(json!({ "type": "integer" })),
        ParamType::Float => Ok(json!({ "type": "number" })),
        ParamType::Boolean => Ok(json!({ "type": "boolean" })),
        ParamType::Enum(values) => enum_schema(values),
        ParamType::Optional(inner) => nullable(inner),
        ParamType::Union(variants) => {
            let non_null: Vec<&ParamType> = variants
                .iter()
                .filter(|variant| **variant != ParamType::Null)
                .collect();
            if variants.len() == 2 && non_null.len() == 1 {
                nullable(non_null[0])
            } else {
                Err(format!(
                    "unions are only supported as a single type plus null (got {} variants)",
                    variants.len()
                ))
            }
        }
        ParamType::List(_) | ParamType::Map(_) => {
            Err("container types are not supported".to_owned())
        }
        ParamType::Null => Err("a bare null type is not supported".to_owned()),
    }
}

fn enum_schema(values: &[Value]) -> std::result::Result<Value, String> {
    if values.is_empty() {
        return Err("enum must list at least one value".to_owned());
    }

    let kind = if values.iter().all(Value::is_string) {
        "string"
    } else if values.iter().all(Value::is_number) {
        "number"
    } else {
        return Err("enum values must be all strings or all numbers".to_owned());
    };

    Ok(json!({ "type": kind, "enum": values }))
}

fn nullable(inner: &ParamType) -> std::result::Result<Value, String> {
    let mut schema = match inner {
        ParamType::String
        | ParamType::Integer
        | ParamType::Float
        | ParamType::Boolean
        | ParamType::Enum(_) => property_schema(inner)?,
        _ => return Err("optional must wrap exactly one scalar type".to_owned()),
    };

    let base = schema["type"].clone();
    schema["type"] = json!([base, "null"]);
    if let Some(values) = schema.get_mut("enum").and_then(Value::as_array_mut) {
        values.push(Value::Null);
    }
    Ok(schema)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn signature(params: Vec<ParamSpec>) -> ToolSignature {
        ToolSignature::new("probe", "Probe tool.", params)
    }

    #[test]
    fn required_lists_every_non_context_param() {
        let schema = ToolSchema::from_signature(&signature(vec![
            ParamSpec::untyped("ctx"),
            ParamSpec::new("path", ParamType::String),
            ParamSpec::new("limit", ParamType::optional(ParamType::Integer)),
            ParamSpec::untyped("self"),
        ]))
        .expect("schema should build");

        assert_eq!(schema.required(), vec!["path", "limit"]);
        let properties = schema.parameters["properties"]
            .as_object()
            .expect("properties object");
        assert!(!properties.contains_key("ctx"));
        assert!(!properties.contains_key("self"));
        assert_eq!(schema.parameters["additionalProperties"], json!(false));
        assert_eq!(schema.kind, "function");
    }

    #[test]
    fn optional_changes_type_shape_only() {
        let schema = ToolSchema::from_signature(&signature(vec![
            ParamSpec::new("note", ParamType::optional(ParamType::String)),
            ParamSpec::new(
                "mode",
                ParamType::Union(vec![
                    ParamType::Null,
                    ParamType::string_enum(["fast", "slow"]),
                ]),
            ),
        ]))
        .expect("schema should build");

        assert_eq!(
            schema.parameters["properties"]["note"],
            json!({ "type": ["string", "null"] })
        );
        assert_eq!(
            schema.parameters["properties"]["mode"],
            json!({ "type": ["string", "null"], "enum": ["fast", "slow", null] })
        );
        assert_eq!(schema.required(), vec!["note", "mode"]);
    }

    #[test]
    fn maps_scalar_and_numeric_enum_types() {
        let schema = ToolSchema::from_signature(&signature(vec![
            ParamSpec::new("ratio", ParamType::Float),
            ParamSpec::new("flag", ParamType::Boolean),
            ParamSpec::new("level", ParamType::Enum(vec![json!(1), json!(2)])),
        ]))
        .expect("schema should build");

        let properties = &schema.parameters["properties"];
        assert_eq!(properties["ratio"], json!({ "type": "number" }));
        assert_eq!(properties["flag"], json!({ "type": "boolean" }));
        assert_eq!(properties["level"], json!({ "type": "number", "enum": [1, 2] }));
    }

    #[test]
    fn missing_description_becomes_empty_string() {
        let schema = ToolSchema::from_signature(&ToolSignature::undocumented("probe", Vec::new()))
            .expect("schema should build");
        assert_eq!(schema.description, "");
        assert!(schema.required().is_empty());
    }

    #[test]
    fn rejects_untyped_parameters() {
        let error = ToolSchema::from_signature(&signature(vec![ParamSpec::untyped("path")]))
            .expect_err("untyped param should fail");
        assert!(matches!(error, Error::Schema(_)));
        assert!(error.to_string().contains("no type annotation"));
    }

    #[test]
    fn rejects_wide_unions_and_containers() {
        let wide = ParamType::Union(vec![ParamType::String, ParamType::Integer, ParamType::Null]);
        let error = ToolSchema::from_signature(&signature(vec![ParamSpec::new("value", wide)]))
            .expect_err("three-way union should fail");
        assert!(matches!(error, Error::Schema(_)));

        let list = ParamType::List(Box::new(ParamType::String));
        let error = ToolSchema::from_signature(&signature(vec![ParamSpec::new("items", list)]))
            .expect_err("list should fail");
        assert!(error.to_string().contains("container types"));

        let mixed = ParamType::Enum(vec![json!("a"), json!(1)]);
        let error = ToolSchema::from_signature(&signature(vec![ParamSpec::new("mixed", mixed)]))
            .expect_err("mixed enum should fail");
        assert!(error.to_string().contains("all strings or all numbers"));
    }
}
