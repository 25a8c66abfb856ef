//! Error taxonomy for registration, invocation and dispatch.

use serde_json::Error as SerdeError;
use thiserror::Error;

/// Result alias for registration-time operations.
pub type RegistrationResult<T> = Result<T, RegistrationError>;

/// Wiring mistakes detected while building an adapter.
///
/// These indicate a programming error in the integration and are meant to
/// abort bot startup.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistrationError {
    /// A parameter type cannot be described to the model.
    #[error("unsupported type `{type_name}` for parameter `{parameter}` of `{function}`")]
    UnsupportedType {
        /// Qualified name of the offending function.
        function: String,
        /// Parameter carrying the type.
        parameter: String,
        /// Rendered type.
        type_name: String,
    },

    /// The adapter injects a context but the function does not take one first.
    #[error("`{function}` must take the `{context_type}` context as its first parameter")]
    MissingContext {
        /// Qualified name of the offending function.
        function: String,
        /// Context type declared by the adapter.
        context_type: String,
    },

    /// The function expects a context the adapter never supplies.
    #[error("`{function}` declares context parameter `{parameter}` but the adapter has no context type")]
    UnexpectedContext {
        /// Qualified name of the offending function.
        function: String,
        /// Name of the declared context parameter.
        parameter: String,
    },

    /// Function name was blank.
    #[error("tool function name cannot be empty")]
    EmptyName,
}

/// User-facing failure raised deliberately by a tool.
///
/// Rendered to the model as `ERROR: {message}` and logged without a trace.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{message}")]
pub struct OperationalError {
    message: String,
}

impl OperationalError {
    /// Creates an operational error with the supplied message.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// Returns the message shown to the model.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

/// A model-supplied argument could not be decoded into the declared type.
#[derive(Debug, Error)]
#[error("invalid value for parameter `{name}`: {source}")]
pub struct ArgumentError {
    name: String,
    #[source]
    source: SerdeError,
}

impl ArgumentError {
    pub(crate) fn new(name: impl Into<String>, source: SerdeError) -> Self {
        Self {
            name: name.into(),
            source,
        }
    }

    /// Name of the parameter that failed to decode.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Failure produced while invoking a tool function.
#[derive(Debug, Error)]
pub enum CallError {
    /// Deliberate user-facing error.
    #[error(transparent)]
    Operational(#[from] OperationalError),

    /// Argument decoding failed before the function body ran.
    #[error(transparent)]
    InvalidArgument(#[from] ArgumentError),

    /// Any other failure.
    #[error("{0}")]
    Unexpected(anyhow::Error),

    /// The function panicked.
    #[error("tool panicked: {0}")]
    Panicked(String),
}

impl CallError {
    /// Shorthand for [`CallError::Operational`].
    #[must_use]
    pub fn operational(message: impl Into<String>) -> Self {
        Self::Operational(OperationalError::new(message))
    }

    /// Returns `true` when the failure should be logged with a full trace.
    #[must_use]
    pub fn is_unexpected(&self) -> bool {
        matches!(self, Self::Unexpected(_) | Self::Panicked(_))
    }
}

impl From<anyhow::Error> for CallError {
    fn from(err: anyhow::Error) -> Self {
        match err.downcast::<OperationalError>() {
            Ok(operational) => Self::Operational(operational),
            Err(err) => Self::Unexpected(err),
        }
    }
}

/// Internal, tagged outcome of a failed dispatch.
///
/// Only flattened into an `ERROR: ...` string at the adapter boundary.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// `help`/`call` without a `method` field.
    #[error("'method' is required for op=\"{op}\"")]
    MissingMethod {
        /// Operation that needed the method.
        op: String,
    },

    /// Method name not registered.
    #[error("unknown method '{method}', call op=\"list\" to see available methods")]
    UnknownMethod {
        /// Requested method.
        method: String,
    },

    /// Operation outside the supported set.
    #[error("unknown op '{op}', expected one of: {expected}")]
    UnknownOp {
        /// Requested operation.
        op: String,
        /// Comma separated list of valid operations.
        expected: &'static str,
    },

    /// `args` was a string that is not valid JSON.
    #[error("args must be an object, got unparseable string")]
    UnparseableArgs,

    /// `args` decoded to something other than an object.
    #[error("args must be an object, got {found}")]
    ArgsNotObject {
        /// JSON type that was found.
        found: &'static str,
    },

    /// Required parameters absent from the arguments.
    #[error("missing required parameters for {method}: {}", .missing.join(", "))]
    MissingParameters {
        /// Method being called.
        method: String,
        /// Names of the missing parameters, in declaration order.
        missing: Vec<String>,
    },

    /// A field the provider dispatcher needs was absent.
    #[error("'{field}' is required for op=\"{op}\"")]
    MissingField {
        /// Missing field name.
        field: &'static str,
        /// Operation that needed the field.
        op: String,
    },

    /// Provider name not present in the static registry.
    #[error("unknown provider '{provider}', call op=\"list_providers\" to see available providers")]
    UnknownProvider {
        /// Requested provider.
        provider: String,
    },

    /// The invoked function failed.
    #[error(transparent)]
    Call(#[from] CallError),
}

impl DispatchError {
    /// Renders the error in the model-facing string channel.
    #[must_use]
    pub fn to_model_text(&self) -> String {
        format!("ERROR: {self}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn anyhow_wrapping_operational_error_stays_operational() {
        let err: CallError = anyhow::Error::new(OperationalError::new("insufficient balance")).into();
        assert!(matches!(err, CallError::Operational(_)));
        assert!(!err.is_unexpected());
        assert_eq!(err.to_string(), "insufficient balance");
    }

    #[test]
    fn anyhow_context_is_unexpected() {
        let err: CallError = anyhow::anyhow!("connection reset").into();
        assert!(err.is_unexpected());
        assert_eq!(err.to_string(), "connection reset");
    }

    #[test]
    fn dispatch_errors_carry_prefix() {
        let err = DispatchError::MissingParameters {
            method: "math.add".into(),
            missing: vec!["b".into()],
        };
        assert_eq!(
            err.to_model_text(),
            "ERROR: missing required parameters for math.add: b"
        );
    }
}
