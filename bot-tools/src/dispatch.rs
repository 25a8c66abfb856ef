//! The `list | help | call` protocol.
//!
//! Every outcome, success or failure, reaches the model as plain text. Inside
//! the crate failures stay tagged as [`DispatchError`] and are only flattened
//! to `ERROR: ...` by [`ToolBunch::handle`].

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};

use futures::FutureExt;
use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use crate::error::{CallError, DispatchError};
use crate::function::{Arguments, CallResult, Invocation, ToolFunction};
use crate::normalize::normalize_args;
use crate::registry::{RegisteredTool, ToolBunch};

const RESERVED_KEYS: &[&str] = &["op", "method", "args"];
const VALID_OPS: &str = "list, help, call";

impl<C: Send + 'static> ToolBunch<C> {
    /// Handles one model request and returns the text shown to the model.
    ///
    /// A `null` or empty request lists the registered methods.
    pub async fn handle(&self, context: C, request: &Value) -> String {
        match self.dispatch(context, request).await {
            Ok(text) => text,
            Err(err) => err.to_model_text(),
        }
    }

    /// Handles one model request, keeping failures tagged.
    ///
    /// # Errors
    ///
    /// Returns a [`DispatchError`] describing why the request could not be
    /// served or why the invoked function failed.
    pub async fn dispatch(&self, context: C, request: &Value) -> Result<String, DispatchError> {
        let empty = Map::new();
        let request = request.as_object().unwrap_or(&empty);

        match request_op(request)? {
            "list" => Ok(self.listing()),
            "help" => self.help(required_method(request, "help")?),
            "call" => {
                let method = required_method(request, "call")?;
                let entry = self
                    .entry(method)
                    .ok_or_else(|| DispatchError::UnknownMethod {
                        method: method.to_owned(),
                    })?;
                let args = normalize_args(request, RESERVED_KEYS)?;
                call_entry(entry, context, args).await
            }
            other => Err(DispatchError::UnknownOp {
                op: other.to_owned(),
                expected: VALID_OPS,
            }),
        }
    }
}

fn request_op(request: &Map<String, Value>) -> Result<&str, DispatchError> {
    match request.get("op") {
        None | Some(Value::Null) => Ok("list"),
        Some(Value::String(op)) if op.is_empty() => Ok("list"),
        Some(Value::String(op)) => Ok(op.as_str()),
        Some(other) => Err(DispatchError::UnknownOp {
            op: other.to_string(),
            expected: VALID_OPS,
        }),
    }
}

fn required_method<'a>(request: &'a Map<String, Value>, op: &str) -> Result<&'a str, DispatchError> {
    request
        .get("method")
        .and_then(Value::as_str)
        .filter(|method| !method.is_empty())
        .ok_or_else(|| DispatchError::MissingMethod { op: op.to_owned() })
}

async fn call_entry<C: Send + 'static>(
    entry: &RegisteredTool<C>,
    context: C,
    mut args: Map<String, Value>,
) -> Result<String, DispatchError> {
    let method = entry.descriptor.qualified_name();

    let missing: Vec<String> = entry
        .descriptor
        .required()
        .iter()
        .filter(|name| !args.contains_key(name.as_str()))
        .cloned()
        .collect();
    if !missing.is_empty() {
        debug!(method, ?missing, "rejecting call with missing parameters");
        return Err(DispatchError::MissingParameters {
            method: method.to_owned(),
            missing,
        });
    }

    let mut call_args = Map::new();
    for param in entry.function.params() {
        let name = param.name();
        if let Some(value) = args.remove(name) {
            call_args.insert(name.to_owned(), value);
        } else if let Some(default) = param.default() {
            call_args.insert(name.to_owned(), default.clone());
        }
    }
    if !args.is_empty() {
        let dropped: Vec<&String> = args.keys().collect();
        debug!(method, ?dropped, "ignoring undeclared arguments");
    }

    debug!(method, "invoking tool method");
    match invoke(&entry.function, context, Arguments::new(call_args)).await {
        Ok(output) => Ok(output),
        Err(err) => {
            if err.is_unexpected() {
                warn!(method, error = ?err, "tool method failed");
            } else {
                info!(method, error = %err, "tool method returned an error");
            }
            Err(DispatchError::Call(err))
        }
    }
}

/// Runs the handler once, awaiting only when the result is pending.
async fn invoke<C>(function: &ToolFunction<C>, context: C, args: Arguments) -> CallResult {
    let invocation = match panic::catch_unwind(AssertUnwindSafe(|| function.invoke(context, args))) {
        Ok(invocation) => invocation,
        Err(payload) => return Err(CallError::Panicked(panic_message(payload.as_ref()))),
    };

    match invocation {
        Invocation::Ready(result) => result,
        Invocation::Pending(future) => AssertUnwindSafe(future)
            .catch_unwind()
            .await
            .unwrap_or_else(|payload| Err(CallError::Panicked(panic_message(payload.as_ref())))),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|message| (*message).to_owned())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_owned())
}
