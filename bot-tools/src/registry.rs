//! Registry of tool functions grouped behind a single model-facing tool.

use std::any::type_name;
use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::debug;

use crate::error::{DispatchError, RegistrationError, RegistrationResult};
use crate::function::ToolFunction;
use crate::schema::{DerivedSchema, derive_parameters};

const LIST_HINT: &str =
    "To see the parameters of a method, call op=\"help\" with method=\"<method name>\".";

/// Model-facing description of one registered function.
#[derive(Clone, Debug, PartialEq)]
pub struct ToolDescriptor {
    qualified_name: String,
    description: String,
    schema: DerivedSchema,
}

impl ToolDescriptor {
    /// Group prefix followed by the function name.
    #[must_use]
    pub fn qualified_name(&self) -> &str {
        &self.qualified_name
    }

    /// First documentation line, or the qualified name.
    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Derived parameter schema.
    #[must_use]
    pub fn schema(&self) -> &DerivedSchema {
        &self.schema
    }

    /// Required parameter names in declaration order.
    #[must_use]
    pub fn required(&self) -> &[String] {
        self.schema.required()
    }

    /// Text returned for `op="help"`.
    #[must_use]
    pub fn help_text(&self) -> String {
        let schema = self.schema.to_json_schema();
        let rendered = serde_json::to_string_pretty(&schema).unwrap_or_else(|_| schema.to_string());
        format!("{}\n\n{rendered}", self.description)
    }
}

/// Declaration advertised to the model-facing tool registry.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ToolDeclaration {
    /// Tool name.
    pub name: String,
    /// Human-facing description.
    pub description: String,
    /// JSON schema of the `list | help | call` request.
    pub json_schema: Value,
}

pub(crate) struct RegisteredTool<C> {
    pub(crate) descriptor: ToolDescriptor,
    pub(crate) function: ToolFunction<C>,
}

/// A set of plain functions exposed to the model as one tool.
///
/// Registration is a setup-phase activity: it needs `&mut self`, so once the
/// bunch is shared for dispatch the registry is read-only.
pub struct ToolBunch<C = ()> {
    name: String,
    description: String,
    context_type: Option<&'static str>,
    entries: Vec<RegisteredTool<C>>,
    index: HashMap<String, usize>,
}

impl<C> fmt::Debug for ToolBunch<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<_> = self.method_names().collect();
        f.debug_struct("ToolBunch")
            .field("name", &self.name)
            .field("context_type", &self.context_type)
            .field("registered", &names)
            .finish()
    }
}

impl<C> ToolBunch<C> {
    /// Creates an adapter whose functions take no caller context.
    #[must_use]
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            context_type: None,
            entries: Vec::new(),
            index: HashMap::new(),
        }
    }

    /// Creates an adapter that injects a `C` as every function's first
    /// parameter.
    #[must_use]
    pub fn with_context(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            context_type: Some(type_name::<C>()),
            ..Self::new(name, description)
        }
    }

    /// Registers `functions` under `group_prefix`.
    ///
    /// A qualified name that is already present is overwritten.
    ///
    /// # Errors
    ///
    /// Returns a [`RegistrationError`] if a function's context declaration
    /// disagrees with the adapter or a parameter type is unsupported.
    /// Functions preceding the failing one stay registered.
    pub fn register<I>(&mut self, group_prefix: &str, functions: I) -> RegistrationResult<()>
    where
        I: IntoIterator<Item = ToolFunction<C>>,
    {
        for function in functions {
            function.ensure_named()?;
            let qualified_name = format!("{group_prefix}{}", function.name());
            self.check_context(&qualified_name, &function)?;

            let schema = derive_parameters(&qualified_name, function.params())?;
            let description = function
                .summary()
                .map_or_else(|| qualified_name.clone(), str::to_owned);

            debug!(
                tool = %self.name,
                method = %qualified_name,
                params = schema.properties().len(),
                required = schema.required().len(),
                "registered tool method"
            );

            let entry = RegisteredTool {
                descriptor: ToolDescriptor {
                    qualified_name: qualified_name.clone(),
                    description,
                    schema,
                },
                function,
            };

            if let Some(&position) = self.index.get(&qualified_name) {
                debug!(method = %qualified_name, "overwriting tool method");
                self.entries[position] = entry;
            } else {
                self.index.insert(qualified_name, self.entries.len());
                self.entries.push(entry);
            }
        }
        Ok(())
    }

    /// Registers `functions` and returns the adapter for chaining.
    ///
    /// # Errors
    ///
    /// See [`ToolBunch::register`].
    pub fn with_group<I>(mut self, group_prefix: &str, functions: I) -> RegistrationResult<Self>
    where
        I: IntoIterator<Item = ToolFunction<C>>,
    {
        self.register(group_prefix, functions)?;
        Ok(self)
    }

    fn check_context(&self, qualified_name: &str, function: &ToolFunction<C>) -> RegistrationResult<()> {
        match (self.context_type, function.context_param()) {
            (Some(context_type), None) => Err(RegistrationError::MissingContext {
                function: qualified_name.to_owned(),
                context_type: context_type.to_owned(),
            }),
            (None, Some(parameter)) => Err(RegistrationError::UnexpectedContext {
                function: qualified_name.to_owned(),
                parameter: parameter.to_owned(),
            }),
            _ => Ok(()),
        }
    }

    /// Tool name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Tool description.
    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Declared context type, if any.
    #[must_use]
    pub fn context_type(&self) -> Option<&'static str> {
        self.context_type
    }

    /// Number of registered methods.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` when nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Qualified names in registration order.
    pub fn method_names(&self) -> impl Iterator<Item = &str> {
        self.entries
            .iter()
            .map(|entry| entry.descriptor.qualified_name.as_str())
    }

    /// Descriptor for `method`.
    #[must_use]
    pub fn descriptor(&self, method: &str) -> Option<&ToolDescriptor> {
        self.entry(method).map(|entry| &entry.descriptor)
    }

    pub(crate) fn entry(&self, method: &str) -> Option<&RegisteredTool<C>> {
        self.index.get(method).map(|&position| &self.entries[position])
    }

    /// Text returned for `op="list"`.
    #[must_use]
    pub fn listing(&self) -> String {
        let mut text: String = self
            .entries
            .iter()
            .map(|entry| {
                let descriptor = &entry.descriptor;
                format!("{} — {}\n", descriptor.qualified_name, descriptor.description)
            })
            .collect();
        text.push('\n');
        text.push_str(LIST_HINT);
        text
    }

    /// Text returned for `op="help"`.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::UnknownMethod`] if `method` is not registered.
    pub fn help(&self, method: &str) -> Result<String, DispatchError> {
        self.descriptor(method)
            .map(ToolDescriptor::help_text)
            .ok_or_else(|| DispatchError::UnknownMethod {
                method: method.to_owned(),
            })
    }

    /// Outward-facing declaration of this adapter as a single tool.
    #[must_use]
    pub fn tool_declaration(&self) -> ToolDeclaration {
        ToolDeclaration {
            name: self.name.clone(),
            description: self.description.clone(),
            json_schema: json!({
                "type": "object",
                "properties": {
                    "op": {
                        "type": "string",
                        "enum": ["list", "help", "call"],
                        "description": "\"list\" shows the methods, \"help\" shows one method's parameters, \"call\" runs a method."
                    },
                    "method": {
                        "type": "string",
                        "description": "Method name as shown by op=\"list\", required for help and call."
                    },
                    "args": {
                        "type": "object",
                        "description": "Arguments for op=\"call\", as described by op=\"help\"."
                    }
                },
                "required": ["op"]
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use serde_json::json;

    use super::*;
    use crate::function::Arguments;
    use crate::schema::ParamSpec;
    use crate::shape::TypeShape;

    fn add() -> ToolFunction<()> {
        ToolFunction::from_sync("add", |(), args: Arguments| {
            args.get::<i64>("a").and_then(|a| Ok(a + args.get::<i64>("b")?))
        })
        .with_doc("Adds two integers.\n\nReturns the sum.")
        .param("a", TypeShape::Integer)
        .param("b", TypeShape::Integer)
    }

    fn undocumented() -> ToolFunction<()> {
        ToolFunction::from_sync("noop", |(), _args: Arguments| "done")
    }

    #[test]
    fn listing_shows_descriptions_in_registration_order() {
        let bunch = ToolBunch::new("math", "Arithmetic")
            .with_group("math.", [add(), undocumented()])
            .expect("register");

        let listing = bunch.listing();
        assert!(listing.starts_with("math.add — Adds two integers.\nmath.noop — math.noop\n\n"));
        assert!(listing.ends_with(LIST_HINT));
        assert_eq!(listing, bunch.listing());
    }

    #[test]
    fn help_renders_description_and_pretty_schema() {
        let bunch = ToolBunch::new("math", "Arithmetic")
            .with_group("math.", [add()])
            .expect("register");

        let help = bunch.help("math.add").expect("help");
        let (description, schema) = help.split_once("\n\n").expect("separator");
        assert_eq!(description, "Adds two integers.");
        assert!(schema.contains("\n  \"type\": \"object\""));

        let schema: Value = serde_json::from_str(schema).expect("json");
        assert_eq!(
            schema,
            json!({
                "type": "object",
                "properties": {"a": {"type": "integer"}, "b": {"type": "integer"}},
                "required": ["a", "b"]
            })
        );
    }

    #[test]
    fn later_registration_overwrites() {
        let mut bunch = ToolBunch::new("math", "Arithmetic");
        bunch.register("math.", [add()]).expect("first");
        bunch
            .register("math.", [add().with_doc("Replacement.")])
            .expect("second");

        assert_eq!(bunch.len(), 1);
        assert_eq!(
            bunch.descriptor("math.add").map(ToolDescriptor::description),
            Some("Replacement.")
        );
    }

    #[test]
    fn unsupported_type_fails_at_registration() {
        let function = undocumented().with_param(ParamSpec::new(
            "origin",
            TypeShape::Unsupported("Point".into()),
        ));

        let err = ToolBunch::new("geo", "Geometry")
            .with_group("geo.", [function])
            .expect_err("unsupported");
        assert!(matches!(err, RegistrationError::UnsupportedType { .. }));
    }

    #[test]
    fn context_adapter_rejects_plain_functions() {
        let err = ToolBunch::<Arc<String>>::with_context("ctx", "Context tools")
            .with_group("ctx.", [ToolFunction::from_sync("plain", |_ctx, _args| "x")])
            .expect_err("missing context");
        assert!(matches!(err, RegistrationError::MissingContext { .. }));
    }

    #[test]
    fn plain_adapter_rejects_context_functions() {
        let function = undocumented().with_context_param("rcx");
        let err = ToolBunch::new("plain", "Plain tools")
            .with_group("p.", [function])
            .expect_err("unexpected context");
        assert_eq!(
            err,
            RegistrationError::UnexpectedContext {
                function: "p.noop".into(),
                parameter: "rcx".into(),
            }
        );
    }

    #[test]
    fn declaration_advertises_three_ops() {
        let declaration = ToolBunch::<()>::new("math", "Arithmetic").tool_declaration();
        assert_eq!(declaration.name, "math");
        assert_eq!(
            declaration.json_schema["properties"]["op"]["enum"],
            json!(["list", "help", "call"])
        );
        assert_eq!(declaration.json_schema["properties"]["args"]["type"], "object");
    }
}
