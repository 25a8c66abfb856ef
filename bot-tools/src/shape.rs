//! Declared parameter types.
//!
//! A [`TypeShape`] is the static stand-in for a runtime type annotation: every
//! tool parameter carries one, and the schema deriver maps it to a JSON schema
//! entry. The [`ToolParam`] trait lets the `#[tool]` macro obtain the shape of
//! an ordinary Rust type.

use std::collections::{BTreeMap, HashMap};

use serde_json::Value;

/// Declared type of a single tool parameter.
#[derive(Clone, Debug, PartialEq)]
pub enum TypeShape {
    /// No meaningful constraint; described to the model as free text.
    Any,
    /// Textual value.
    Text,
    /// Integral number.
    Integer,
    /// Floating-point number.
    Number,
    /// `true` or `false`.
    Boolean,
    /// Closed set of literal values, in declaration order.
    Choice(Vec<Value>),
    /// Nullable wrapper around another shape.
    Optional(Box<TypeShape>),
    /// Sequence with an optional element shape.
    Sequence(Option<Box<TypeShape>>),
    /// String-keyed mapping with an optional value shape.
    Mapping(Option<Box<TypeShape>>),
    /// Any type the deriver cannot describe. Registration rejects it.
    Unsupported(String),
}

impl TypeShape {
    /// Builds a closed-choice shape from literal values.
    #[must_use]
    pub fn choice<I, V>(values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        Self::Choice(values.into_iter().map(Into::into).collect())
    }

    /// Wraps `inner` as nullable.
    #[must_use]
    pub fn optional(inner: TypeShape) -> Self {
        Self::Optional(Box::new(inner))
    }

    /// Sequence of `element`.
    #[must_use]
    pub fn sequence_of(element: TypeShape) -> Self {
        Self::Sequence(Some(Box::new(element)))
    }

    /// Mapping from strings to `value`.
    #[must_use]
    pub fn mapping_of(value: TypeShape) -> Self {
        Self::Mapping(Some(Box::new(value)))
    }

    /// Returns `true` for the nullable wrapper.
    #[must_use]
    pub fn is_optional(&self) -> bool {
        matches!(self, Self::Optional(_))
    }
}

/// Rust types that can appear as tool parameters.
///
/// Implement this for closed-choice enums so the model sees the allowed
/// values:
///
/// ```rust
/// use bot_tools::{ToolParam, TypeShape};
///
/// #[derive(serde::Deserialize)]
/// #[serde(rename_all = "lowercase")]
/// enum Unit {
///     Celsius,
///     Fahrenheit,
/// }
///
/// impl ToolParam for Unit {
///     fn shape() -> TypeShape {
///         TypeShape::choice(["celsius", "fahrenheit"])
///     }
/// }
///
/// assert_eq!(Unit::shape(), TypeShape::choice(["celsius", "fahrenheit"]));
/// ```
pub trait ToolParam {
    /// Shape advertised for this type.
    fn shape() -> TypeShape;
}

macro_rules! impl_tool_param {
    ($shape:expr => $($ty:ty),+ $(,)?) => {
        $(
            impl ToolParam for $ty {
                fn shape() -> TypeShape {
                    $shape
                }
            }
        )+
    };
}

impl_tool_param!(TypeShape::Text => String);
impl_tool_param!(TypeShape::Integer => i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize);
impl_tool_param!(TypeShape::Number => f32, f64);
impl_tool_param!(TypeShape::Boolean => bool);
impl_tool_param!(TypeShape::Any => Value);

impl<T: ToolParam> ToolParam for Option<T> {
    fn shape() -> TypeShape {
        TypeShape::optional(T::shape())
    }
}

impl<T: ToolParam> ToolParam for Vec<T> {
    fn shape() -> TypeShape {
        TypeShape::sequence_of(T::shape())
    }
}

impl<T: ToolParam, S> ToolParam for HashMap<String, T, S> {
    fn shape() -> TypeShape {
        TypeShape::mapping_of(T::shape())
    }
}

impl<T: ToolParam> ToolParam for BTreeMap<String, T> {
    fn shape() -> TypeShape {
        TypeShape::mapping_of(T::shape())
    }
}
