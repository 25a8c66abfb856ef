//! Schema derivation from declared parameter shapes.
//!
//! [`derive_parameters`] is a pure mapping from a function's [`ParamSpec`]s to
//! the JSON-schema fragment shown to the model and the set of required
//! parameter names.

use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::{RegistrationError, RegistrationResult};
use crate::shape::TypeShape;

/// Primitive JSON schema kinds.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PrimitiveKind {
    /// `"string"`
    String,
    /// `"integer"`
    Integer,
    /// `"number"`
    Number,
    /// `"boolean"`
    Boolean,
    /// `"array"`
    Array,
    /// `"object"`
    Object,
}

/// Schema entry for a single parameter.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct SchemaEntry {
    /// Primitive kind; absent for mixed-literal enums.
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<PrimitiveKind>,
    /// Closed set of allowed values.
    #[serde(rename = "enum", skip_serializing_if = "Option::is_none")]
    pub choices: Option<Vec<Value>>,
    /// Element schema for arrays.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub items: Option<Box<SchemaEntry>>,
    /// Value schema for string-keyed objects.
    #[serde(
        rename = "additionalProperties",
        skip_serializing_if = "Option::is_none"
    )]
    pub additional_properties: Option<Box<SchemaEntry>>,
    /// Declared non-null default.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
}

impl SchemaEntry {
    fn of(kind: PrimitiveKind) -> Self {
        Self {
            kind: Some(kind),
            ..Self::default()
        }
    }

    /// Renders the entry as a JSON value.
    #[must_use]
    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

/// Declaration of one tool parameter.
#[derive(Clone, Debug, PartialEq)]
pub struct ParamSpec {
    name: String,
    shape: TypeShape,
    default: Option<Value>,
}

impl ParamSpec {
    /// Declares a parameter without a default.
    #[must_use]
    pub fn new(name: impl Into<String>, shape: TypeShape) -> Self {
        Self {
            name: name.into(),
            shape,
            default: None,
        }
    }

    /// Attaches a default value. A `null` default makes the parameter
    /// optional without advertising a default.
    #[must_use]
    pub fn with_default(mut self, default: impl Into<Value>) -> Self {
        self.default = Some(default.into());
        self
    }

    /// Parameter name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declared shape.
    #[must_use]
    pub fn shape(&self) -> &TypeShape {
        &self.shape
    }

    /// Declared default, if any.
    #[must_use]
    pub fn default(&self) -> Option<&Value> {
        self.default.as_ref()
    }

    /// Whether the model must supply this parameter.
    #[must_use]
    pub fn is_required(&self) -> bool {
        self.default.is_none() && !self.shape.is_optional()
    }
}

/// Derived schema for a whole function.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DerivedSchema {
    properties: Vec<(String, SchemaEntry)>,
    required: Vec<String>,
}

impl DerivedSchema {
    /// Parameter entries in declaration order.
    #[must_use]
    pub fn properties(&self) -> &[(String, SchemaEntry)] {
        &self.properties
    }

    /// Required parameter names in declaration order.
    #[must_use]
    pub fn required(&self) -> &[String] {
        &self.required
    }

    /// Returns `true` if `name` is a declared parameter.
    #[must_use]
    pub fn has_property(&self, name: &str) -> bool {
        self.properties.iter().any(|(key, _)| key == name)
    }

    /// Renders `{"type": "object", "properties": ..., "required": [...]}`.
    #[must_use]
    pub fn to_json_schema(&self) -> Value {
        let properties: Map<String, Value> = self
            .properties
            .iter()
            .map(|(name, entry)| (name.clone(), entry.to_value()))
            .collect();

        let mut schema = Map::new();
        schema.insert("type".into(), Value::from("object"));
        schema.insert("properties".into(), Value::Object(properties));
        schema.insert(
            "required".into(),
            Value::Array(self.required.iter().cloned().map(Value::from).collect()),
        );
        Value::Object(schema)
    }
}

/// Derives the schema for `params`, declared on the function `function`.
///
/// # Errors
///
/// Returns [`RegistrationError::UnsupportedType`] if any parameter, or any
/// nested element/value shape, is [`TypeShape::Unsupported`].
pub fn derive_parameters(function: &str, params: &[ParamSpec]) -> RegistrationResult<DerivedSchema> {
    let mut schema = DerivedSchema::default();

    for param in params.iter().filter(|param| param.name != "self") {
        let mut entry = derive_shape(&param.shape).map_err(|type_name| {
            RegistrationError::UnsupportedType {
                function: function.to_owned(),
                parameter: param.name.clone(),
                type_name,
            }
        })?;

        if let Some(default) = param.default.as_ref().filter(|value| !value.is_null()) {
            entry.default = Some(default.clone());
        }

        if param.is_required() {
            schema.required.push(param.name.clone());
        }
        schema.properties.push((param.name.clone(), entry));
    }

    Ok(schema)
}

/// Maps a single shape to its entry; the error carries the unsupported type.
fn derive_shape(shape: &TypeShape) -> Result<SchemaEntry, String> {
    let entry = match shape {
        TypeShape::Any | TypeShape::Text => SchemaEntry::of(PrimitiveKind::String),
        TypeShape::Integer => SchemaEntry::of(PrimitiveKind::Integer),
        TypeShape::Number => SchemaEntry::of(PrimitiveKind::Number),
        TypeShape::Boolean => SchemaEntry::of(PrimitiveKind::Boolean),
        TypeShape::Choice(values) => SchemaEntry {
            kind: choice_kind(values),
            choices: Some(values.clone()),
            ..SchemaEntry::default()
        },
        TypeShape::Optional(inner) => derive_shape(inner)?,
        TypeShape::Sequence(element) => SchemaEntry {
            items: Some(Box::new(derive_nested(element.as_deref())?)),
            ..SchemaEntry::of(PrimitiveKind::Array)
        },
        TypeShape::Mapping(value) => SchemaEntry {
            additional_properties: Some(Box::new(derive_nested(value.as_deref())?)),
            ..SchemaEntry::of(PrimitiveKind::Object)
        },
        TypeShape::Unsupported(type_name) => return Err(type_name.clone()),
    };
    Ok(entry)
}

fn derive_nested(shape: Option<&TypeShape>) -> Result<SchemaEntry, String> {
    shape.map_or_else(|| Ok(SchemaEntry::of(PrimitiveKind::String)), derive_shape)
}

fn choice_kind(values: &[Value]) -> Option<PrimitiveKind> {
    if values.is_empty() {
        None
    } else if values.iter().all(Value::is_string) {
        Some(PrimitiveKind::String)
    } else if values.iter().all(|value| value.is_i64() || value.is_u64()) {
        Some(PrimitiveKind::Integer)
    } else {
        None
    }
}
