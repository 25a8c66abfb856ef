//! Provider dispatcher for SaaS-style integrations.
//!
//! Integrations that wrap several interchangeable backends (ad platforms,
//! survey platforms, ...) expose one tool answering
//! `op ∈ {help, status, list_providers, list_methods, call}`. Providers are
//! looked up in a static registry built at startup and constructed per request
//! from the caller context.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use crate::error::{CallError, DispatchError};
use crate::normalize::normalize_args;

const RESERVED_KEYS: &[&str] = &["op", "provider", "method", "args"];
const VALID_OPS: &str = "help, status, list_providers, list_methods, call";

/// A method exposed by a provider.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProviderMethod {
    /// Method identifier used in `call` requests.
    pub name: String,
    /// One-line description.
    pub description: String,
}

impl ProviderMethod {
    /// Creates a method description.
    #[must_use]
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
        }
    }
}

/// One backend of a provider dispatcher.
#[async_trait]
pub trait Provider: Send + Sync {
    /// Methods callable through `op="call"`.
    fn methods(&self) -> Vec<ProviderMethod>;

    /// Short status line, e.g. whether credentials are configured.
    async fn status(&self) -> String {
        "ok".to_owned()
    }

    /// Executes `method` with normalized arguments.
    async fn call(&self, method: &str, args: Map<String, Value>) -> Result<String, CallError>;
}

type Factory<C> = dyn Fn(C) -> Arc<dyn Provider> + Send + Sync;

/// Routes provider requests to statically registered constructors.
pub struct ProviderDispatcher<C> {
    name: String,
    factories: BTreeMap<String, Arc<Factory<C>>>,
}

impl<C> fmt::Debug for ProviderDispatcher<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderDispatcher")
            .field("name", &self.name)
            .field("providers", &self.factories.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl<C: Clone + Send + 'static> ProviderDispatcher<C> {
    /// Creates an empty dispatcher for the tool `name`.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            factories: BTreeMap::new(),
        }
    }

    /// Registers the constructor for `provider`, replacing any previous one.
    #[must_use]
    pub fn with_provider<F, P>(mut self, provider: impl Into<String>, factory: F) -> Self
    where
        F: Fn(C) -> P + Send + Sync + 'static,
        P: Provider + 'static,
    {
        let factory: Arc<Factory<C>> =
            Arc::new(move |context| -> Arc<dyn Provider> { Arc::new(factory(context)) });
        self.factories.insert(provider.into(), factory);
        self
    }

    /// Registered provider names, sorted.
    pub fn providers(&self) -> impl Iterator<Item = &str> {
        self.factories.keys().map(String::as_str)
    }

    /// Handles one request and returns the model-facing text.
    pub async fn handle(&self, context: C, request: &Value) -> String {
        match self.dispatch(context, request).await {
            Ok(text) => text,
            Err(err) => err.to_model_text(),
        }
    }

    /// Handles one request, keeping failures tagged.
    ///
    /// # Errors
    ///
    /// Returns a [`DispatchError`] for malformed requests, unknown providers
    /// or methods, and provider failures.
    pub async fn dispatch(&self, context: C, request: &Value) -> Result<String, DispatchError> {
        let empty = Map::new();
        let request = request.as_object().unwrap_or(&empty);
        let op = match request.get("op") {
            None | Some(Value::Null) => "help",
            Some(Value::String(op)) if op.is_empty() => "help",
            Some(Value::String(op)) => op.as_str(),
            Some(other) => {
                return Err(DispatchError::UnknownOp {
                    op: other.to_string(),
                    expected: VALID_OPS,
                });
            }
        };

        match op {
            "help" => Ok(self.help_text()),
            "list_providers" => Ok(self.providers().collect::<Vec<_>>().join("\n")),
            "status" => match text_field(request, "provider") {
                Some(name) => {
                    let provider = self.construct(name, context)?;
                    Ok(format!("{name}: {}", provider.status().await))
                }
                None => {
                    let mut lines = Vec::with_capacity(self.factories.len());
                    for (name, factory) in &self.factories {
                        let status = factory(context.clone()).status().await;
                        lines.push(format!("{name}: {status}"));
                    }
                    Ok(lines.join("\n"))
                }
            },
            "list_methods" => {
                let name = require(request, "provider", op)?;
                let provider = self.construct(name, context)?;
                Ok(provider
                    .methods()
                    .iter()
                    .map(|method| format!("{} — {}", method.name, method.description))
                    .collect::<Vec<_>>()
                    .join("\n"))
            }
            "call" => {
                let name = require(request, "provider", op)?;
                let method = require(request, "method", op)?;
                let provider = self.construct(name, context)?;
                if !provider.methods().iter().any(|known| known.name == method) {
                    return Err(DispatchError::UnknownMethod {
                        method: format!("{name}.{method}"),
                    });
                }
                let args = normalize_args(request, RESERVED_KEYS)?;
                debug!(tool = %self.name, provider = name, method, "calling provider");
                provider.call(method, args).await.map_err(|err| {
                    if err.is_unexpected() {
                        warn!(provider = name, method, error = ?err, "provider call failed");
                    } else {
                        info!(provider = name, method, error = %err, "provider returned an error");
                    }
                    DispatchError::Call(err)
                })
            }
            other => Err(DispatchError::UnknownOp {
                op: other.to_owned(),
                expected: VALID_OPS,
            }),
        }
    }

    fn construct(&self, name: &str, context: C) -> Result<Arc<dyn Provider>, DispatchError> {
        self.factories
            .get(name)
            .map(|factory| factory(context))
            .ok_or_else(|| DispatchError::UnknownProvider {
                provider: name.to_owned(),
            })
    }

    fn help_text(&self) -> String {
        let providers = self.providers().collect::<Vec<_>>().join(", ");
        format!(
            "{name}(op=\"help\") shows this text.\n\
             {name}(op=\"status\", provider=\"...\") reports provider status; omit provider for all.\n\
             {name}(op=\"list_providers\") lists providers.\n\
             {name}(op=\"list_methods\", provider=\"...\") lists the methods of a provider.\n\
             {name}(op=\"call\", provider=\"...\", method=\"...\", args={{...}}) calls a method.\n\n\
             Providers: {providers}",
            name = self.name
        )
    }
}

fn text_field<'a>(request: &'a Map<String, Value>, field: &str) -> Option<&'a str> {
    request
        .get(field)
        .and_then(Value::as_str)
        .filter(|value| !value.is_empty())
}

fn require<'a>(
    request: &'a Map<String, Value>,
    field: &'static str,
    op: &str,
) -> Result<&'a str, DispatchError> {
    text_field(request, field).ok_or_else(|| DispatchError::MissingField {
        field,
        op: op.to_owned(),
    })
}
