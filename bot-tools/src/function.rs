//! Callable tool functions and their invocation plumbing.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::error::{ArgumentError, CallError, RegistrationError, RegistrationResult};
use crate::schema::ParamSpec;
use crate::shape::TypeShape;

/// Result produced by a tool function.
pub type CallResult = Result<String, CallError>;

/// Future alias for asynchronously completing tool functions.
pub type ToolFuture = Pin<Box<dyn Future<Output = CallResult> + Send>>;

/// Outcome of calling a tool handler: already computed, or still pending.
pub enum Invocation {
    /// The handler completed synchronously.
    Ready(CallResult),
    /// The handler returned a future that must be awaited.
    Pending(ToolFuture),
}

impl fmt::Debug for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ready(result) => f.debug_tuple("Ready").field(result).finish(),
            Self::Pending(_) => f.write_str("Pending(..)"),
        }
    }
}

type Handler<C> = dyn Fn(C, Arguments) -> Invocation + Send + Sync;

/// Arguments handed to a tool handler after normalization and filtering.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Arguments(Map<String, Value>);

impl Arguments {
    /// Wraps an argument map.
    #[must_use]
    pub fn new(map: Map<String, Value>) -> Self {
        Self(map)
    }

    /// Decodes the parameter `name`. A missing key decodes from `null`, so
    /// `Option<T>` parameters read as `None`.
    ///
    /// # Errors
    ///
    /// Returns [`ArgumentError`] if the value does not match `T`.
    pub fn get<T: DeserializeOwned>(&self, name: &str) -> Result<T, ArgumentError> {
        let value = self.0.get(name).cloned().unwrap_or(Value::Null);
        serde_json::from_value(value).map_err(|err| ArgumentError::new(name, err))
    }

    /// Raw value for `name`.
    #[must_use]
    pub fn raw(&self, name: &str) -> Option<&Value> {
        self.0.get(name)
    }

    /// Returns `true` if `name` was supplied.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    /// Number of supplied arguments.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` if no arguments were supplied.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Consumes the wrapper.
    #[must_use]
    pub fn into_map(self) -> Map<String, Value> {
        self.0
    }
}

impl From<Map<String, Value>> for Arguments {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

/// Conversion of a tool's return value into the model-facing string channel.
pub trait ToolOutput {
    /// Renders the value, or surfaces the error it carries.
    ///
    /// # Errors
    ///
    /// Returns the [`CallError`] carried by `Result` values.
    fn into_tool_output(self) -> CallResult;
}

impl ToolOutput for String {
    fn into_tool_output(self) -> CallResult {
        Ok(self)
    }
}

impl ToolOutput for &str {
    fn into_tool_output(self) -> CallResult {
        Ok(self.to_owned())
    }
}

impl ToolOutput for Value {
    fn into_tool_output(self) -> CallResult {
        Ok(match self {
            Value::String(text) => text,
            other => other.to_string(),
        })
    }
}

macro_rules! display_output {
    ($($ty:ty),+ $(,)?) => {
        $(
            impl ToolOutput for $ty {
                fn into_tool_output(self) -> CallResult {
                    Ok(self.to_string())
                }
            }
        )+
    };
}

display_output!(i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize, f32, f64, bool);

impl<T, E> ToolOutput for Result<T, E>
where
    T: ToolOutput,
    E: Into<CallError>,
{
    fn into_tool_output(self) -> CallResult {
        match self {
            Ok(value) => value.into_tool_output(),
            Err(err) => Err(err.into()),
        }
    }
}

/// A function exposed to the model, together with its declared signature.
///
/// `C` is the caller-supplied context type. Functions that do not read the
/// context still receive it and ignore it.
pub struct ToolFunction<C> {
    name: String,
    doc: Option<String>,
    params: Vec<ParamSpec>,
    context_param: Option<String>,
    handler: Arc<Handler<C>>,
}

impl<C> Clone for ToolFunction<C> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            doc: self.doc.clone(),
            params: self.params.clone(),
            context_param: self.context_param.clone(),
            handler: Arc::clone(&self.handler),
        }
    }
}

impl<C> fmt::Debug for ToolFunction<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ToolFunction")
            .field("name", &self.name)
            .field("params", &self.params)
            .field("context_param", &self.context_param)
            .finish_non_exhaustive()
    }
}

impl<C: Send + 'static> ToolFunction<C> {
    /// Wraps a synchronous handler.
    pub fn from_sync<F, R>(name: impl Into<String>, handler: F) -> Self
    where
        F: Fn(C, Arguments) -> R + Send + Sync + 'static,
        R: ToolOutput,
    {
        let handler: Arc<Handler<C>> = Arc::new(move |context, args| {
            Invocation::Ready(handler(context, args).into_tool_output())
        });
        Self::with_handler(name.into(), handler)
    }

    /// Wraps a handler whose result completes asynchronously.
    pub fn from_async<F, Fut, R>(name: impl Into<String>, handler: F) -> Self
    where
        F: Fn(C, Arguments) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = R> + Send + 'static,
        R: ToolOutput + 'static,
    {
        let handler: Arc<Handler<C>> = Arc::new(move |context, args| {
            let pending = handler(context, args);
            Invocation::Pending(Box::pin(async move { pending.await.into_tool_output() }))
        });
        Self::with_handler(name.into(), handler)
    }

    fn with_handler(name: String, handler: Arc<Handler<C>>) -> Self {
        Self {
            name,
            doc: None,
            params: Vec::new(),
            context_param: None,
            handler,
        }
    }
}

impl<C> ToolFunction<C> {
    /// Sets the documentation; its first non-empty line is the description.
    #[must_use]
    pub fn with_doc(mut self, doc: impl Into<String>) -> Self {
        let doc = doc.into();
        self.doc = (!doc.trim().is_empty()).then_some(doc);
        self
    }

    /// Appends a model-supplied parameter.
    #[must_use]
    pub fn with_param(mut self, param: ParamSpec) -> Self {
        self.params.push(param);
        self
    }

    /// Shorthand for a required parameter of the given shape.
    #[must_use]
    pub fn param(self, name: impl Into<String>, shape: TypeShape) -> Self {
        self.with_param(ParamSpec::new(name, shape))
    }

    /// Declares that the first parameter, `name`, receives the caller context.
    #[must_use]
    pub fn with_context_param(mut self, name: impl Into<String>) -> Self {
        self.context_param = Some(name.into());
        self
    }

    /// Callable name, without group prefix.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// First non-empty documentation line.
    #[must_use]
    pub fn summary(&self) -> Option<&str> {
        self.doc
            .as_deref()
            .and_then(|doc| doc.lines().map(str::trim).find(|line| !line.is_empty()))
    }

    /// Declared parameters, context excluded.
    #[must_use]
    pub fn params(&self) -> &[ParamSpec] {
        &self.params
    }

    /// Name of the context parameter, if declared.
    #[must_use]
    pub fn context_param(&self) -> Option<&str> {
        self.context_param.as_deref()
    }

    pub(crate) fn ensure_named(&self) -> RegistrationResult<()> {
        if self.name.trim().is_empty() {
            return Err(RegistrationError::EmptyName);
        }
        Ok(())
    }

    /// Runs the handler without awaiting it.
    pub fn invoke(&self, context: C, args: Arguments) -> Invocation {
        (self.handler)(context, args)
    }
}
