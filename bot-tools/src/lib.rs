//! Function-to-tool adapter for language-model bots.
//!
//! A [`ToolBunch`] turns a set of plain functions into one model-callable tool
//! speaking a `list | help | call` protocol. Each function's parameters are
//! described by [`TypeShape`]s, either written by hand or generated by the
//! [`tool`] attribute, and the derived JSON schema is what the model sees.
//!
//! ```rust
//! use bot_tools::{ToolBunch, tool};
//! use serde_json::json;
//!
//! /// Adds two integers.
//! #[tool]
//! fn add(a: i64, b: i64) -> i64 {
//!     a + b
//! }
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let bunch = ToolBunch::new("math", "Arithmetic helpers")
//!     .with_group("math.", [add_tool()])
//!     .expect("valid tools");
//!
//! let reply = bunch
//!     .handle((), &json!({"op": "call", "method": "math.add", "args": {"a": 3, "b": 4}}))
//!     .await;
//! assert_eq!(reply, "7");
//! # }
//! ```

#![warn(missing_docs, clippy::pedantic)]

extern crate self as bot_tools;

mod dispatch;
mod error;
mod function;
mod normalize;
mod provider;
mod registry;
mod schema;
mod shape;

/// Attribute generating a `<name>_tool()` constructor for a function.
pub use bot_tools_macros::tool;
/// Error taxonomy shared by registration and dispatch.
pub use error::{
    ArgumentError, CallError, DispatchError, OperationalError, RegistrationError,
    RegistrationResult,
};
/// Callable wrappers and output conversion.
pub use function::{Arguments, CallResult, Invocation, ToolFunction, ToolFuture, ToolOutput};
/// Argument recovery for malformed model requests.
pub use normalize::normalize_args;
/// Provider dispatcher for multi-backend integrations.
pub use provider::{Provider, ProviderDispatcher, ProviderMethod};
/// Registry and model-facing declarations.
pub use registry::{ToolBunch, ToolDeclaration, ToolDescriptor};
/// Schema derivation.
pub use schema::{DerivedSchema, ParamSpec, PrimitiveKind, SchemaEntry, derive_parameters};
/// Declared parameter types.
pub use shape::{ToolParam, TypeShape};

#[doc(hidden)]
pub mod __private {
    pub use serde_json;
}
