use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use bot_tools::{
    Arguments, CallError, OperationalError, ParamSpec, RegistrationError, ToolBunch, ToolFunction,
    ToolParam, TypeShape, tool,
};
use serde::Deserialize;
use serde_json::{Value, json};

static DIVIDE_CALLS: AtomicUsize = AtomicUsize::new(0);

/// Adds two integers.
#[tool]
fn add(a: i64, b: i64) -> i64 {
    a + b
}

/// Multiplies two integers.
///
/// The product may overflow for very large inputs.
#[tool]
async fn mul(a: i64, b: i64) -> i64 {
    a * b
}

/// Divides `a` by `b`.
#[tool]
fn divide(a: f64, b: f64) -> Result<f64, OperationalError> {
    DIVIDE_CALLS.fetch_add(1, Ordering::SeqCst);
    if b == 0.0 {
        return Err(OperationalError::new("division by zero"));
    }
    Ok(a / b)
}

/// Rounds a number to the given precision.
#[tool(default(digits = 2))]
fn round(value: f64, digits: u32, label: Option<String>) -> String {
    let rendered = format!("{value:.prec$}", prec = digits as usize);
    match label {
        Some(label) => format!("{label}={rendered}"),
        None => rendered,
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "lowercase")]
enum Unit {
    Celsius,
    Fahrenheit,
}

impl ToolParam for Unit {
    fn shape() -> TypeShape {
        TypeShape::choice(["celsius", "fahrenheit"])
    }
}

/// Converts a temperature.
#[tool]
fn convert(degrees: f64, to: Unit) -> String {
    match to {
        Unit::Celsius => format!("{:.1}", (degrees - 32.0) * 5.0 / 9.0),
        Unit::Fahrenheit => format!("{:.1}", degrees * 9.0 / 5.0 + 32.0),
    }
}

/// Fetches the remote quote.
#[tool(name = "quote")]
async fn fetch_quote() -> anyhow::Result<String> {
    Err(anyhow::Error::new(OperationalError::new("quote service unavailable")))
}

fn math() -> ToolBunch {
    ToolBunch::new("math", "Arithmetic helpers")
        .with_group(
            "math.",
            [
                add_tool(),
                mul_tool(),
                divide_tool(),
                round_tool(),
                convert_tool(),
                fetch_quote_tool(),
            ],
        )
        .expect("tools register")
}

fn call(method: &str, args: Value) -> Value {
    json!({"op": "call", "method": method, "args": args})
}

#[tokio::test]
async fn sync_and_async_functions_answer_the_same_way() {
    let bunch = math();
    assert_eq!(bunch.handle((), &call("math.add", json!({"a": 3, "b": 4}))).await, "7");
    assert_eq!(bunch.handle((), &call("math.mul", json!({"a": 3, "b": 4}))).await, "12");
}

#[tokio::test]
async fn listing_is_stable_and_uses_first_doc_line() {
    let bunch = math();
    let first = bunch.handle((), &json!({"op": "list"})).await;
    let second = bunch.handle((), &json!({"op": "list"})).await;
    assert_eq!(first, second);

    let lines: Vec<&str> = first.lines().collect();
    assert_eq!(lines[0], "math.add — Adds two integers.");
    assert_eq!(lines[1], "math.mul — Multiplies two integers.");
    assert_eq!(lines[5], "math.quote — Fetches the remote quote.");
    assert!(first.contains("op=\"help\""));
}

#[tokio::test]
async fn flattened_and_string_encoded_args_are_recovered() {
    let bunch = math();
    let flattened = json!({"op": "call", "method": "math.add", "a": 1, "b": 2});
    assert_eq!(bunch.handle((), &flattened).await, "3");

    let encoded = call("math.add", json!("{\"a\": 10, \"b\": 5}"));
    assert_eq!(bunch.handle((), &encoded).await, "15");

    let mixed = json!({"op": "call", "method": "math.add", "args": "{\"a\": 10}", "b": 1});
    assert_eq!(bunch.handle((), &mixed).await, "11");
}

#[tokio::test]
async fn unparseable_args_are_rejected() {
    let text = math().handle((), &call("math.add", json!("not a json"))).await;
    assert_eq!(text, "ERROR: args must be an object, got unparseable string");
}

#[tokio::test]
async fn missing_parameters_are_named_before_invocation() {
    let before = DIVIDE_CALLS.load(Ordering::SeqCst);
    let text = math().handle((), &call("math.divide", json!({"a": 1.0}))).await;
    assert_eq!(text, "ERROR: missing required parameters for math.divide: b");
    assert_eq!(DIVIDE_CALLS.load(Ordering::SeqCst), before);
}

#[tokio::test]
async fn operational_errors_become_text() {
    let bunch = math();
    let text = bunch.handle((), &call("math.divide", json!({"a": 1.0, "b": 0.0}))).await;
    assert_eq!(text, "ERROR: division by zero");

    let text = bunch.handle((), &call("math.quote", json!({}))).await;
    assert_eq!(text, "ERROR: quote service unavailable");
}

#[tokio::test]
async fn unknown_methods_point_at_list() {
    let bunch = math();
    for op in ["call", "help"] {
        let text = bunch.handle((), &json!({"op": op, "method": "math.pow"})).await;
        assert!(text.starts_with("ERROR: unknown method 'math.pow'"), "{text}");
        assert!(text.contains("op=\"list\""));
    }
}

#[tokio::test]
async fn undeclared_args_are_ignored() {
    let text = math()
        .handle((), &call("math.add", json!({"a": 2, "b": 2, "c": 99})))
        .await;
    assert_eq!(text, "4");
}

#[tokio::test]
async fn defaults_fill_omitted_parameters() {
    let bunch = math();
    assert_eq!(bunch.handle((), &call("math.round", json!({"value": 3.14159}))).await, "3.14");
    assert_eq!(
        bunch
            .handle((), &call("math.round", json!({"value": 3.14159, "digits": 0, "label": "pi"})))
            .await,
        "pi=3"
    );

    let schema = bunch.descriptor("math.round").expect("registered").schema().to_json_schema();
    assert_eq!(schema["properties"]["digits"], json!({"type": "integer", "default": 2}));
    assert_eq!(schema["properties"]["label"], json!({"type": "string"}));
    assert_eq!(schema["required"], json!(["value"]));
}

#[tokio::test]
async fn choices_are_advertised_and_decoded() {
    let bunch = math();
    let help = bunch.handle((), &json!({"op": "help", "method": "math.convert"})).await;
    assert!(help.starts_with("Converts a temperature.\n\n"));
    assert!(help.contains("\"enum\""));

    let text = bunch
        .handle((), &call("math.convert", json!({"degrees": 212.0, "to": "celsius"})))
        .await;
    assert_eq!(text, "100.0");

    let text = bunch
        .handle((), &call("math.convert", json!({"degrees": 1.0, "to": "kelvin"})))
        .await;
    assert!(text.starts_with("ERROR: invalid value for parameter `to`"), "{text}");
}

struct Session {
    user: String,
    calls: AtomicUsize,
}

/// Greets the current user.
#[tool(context)]
async fn greet(session: Arc<Session>, greeting: String) -> String {
    session.calls.fetch_add(1, Ordering::SeqCst);
    format!("{greeting}, {}", session.user)
}

/// Reports how many calls the session served.
#[tool(context)]
fn served(session: Arc<Session>) -> usize {
    session.calls.load(Ordering::SeqCst)
}

#[tokio::test]
async fn context_is_injected_and_hidden_from_the_schema() {
    let bunch = ToolBunch::<Arc<Session>>::with_context("session", "Session helpers")
        .with_group("session.", [greet_tool(), served_tool()])
        .expect("context tools register");

    let schema = bunch.descriptor("session.greet").expect("registered").schema();
    assert!(!schema.has_property("session"));
    assert_eq!(schema.required(), ["greeting".to_owned()]);

    let session = Arc::new(Session {
        user: "ada".to_owned(),
        calls: AtomicUsize::new(0),
    });
    let text = bunch
        .handle(Arc::clone(&session), &call("session.greet", json!({"greeting": "hello"})))
        .await;
    assert_eq!(text, "hello, ada");
    assert_eq!(bunch.handle(session, &call("session.served", json!({}))).await, "1");
}

#[test]
fn plain_functions_are_rejected_by_context_adapters() {
    let handwritten = ToolFunction::from_sync("ping", |_session: Arc<Session>, _args: Arguments| "pong");
    let err = ToolBunch::<Arc<Session>>::with_context("session", "Session helpers")
        .with_group("session.", [handwritten])
        .expect_err("context is required");
    assert!(matches!(err, RegistrationError::MissingContext { .. }));
}

#[test]
fn unsupported_parameter_types_fail_registration() {
    /// Moves a point.
    #[tool]
    fn shift(origin: (i64, i64), by: i64) -> i64 {
        origin.0 + by
    }

    let err = ToolBunch::new("geo", "Geometry")
        .with_group("geo.", [shift_tool()])
        .expect_err("tuples are unsupported");
    match err {
        RegistrationError::UnsupportedType { parameter, .. } => assert_eq!(parameter, "origin"),
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn handwritten_functions_mix_with_generated_ones() {
    let echo = ToolFunction::from_sync("echo", |(), args: Arguments| {
        args.get::<Vec<String>>("words").map(|words| words.join(" "))
    })
    .with_doc("Echoes words.")
    .with_param(ParamSpec::new("words", TypeShape::sequence_of(TypeShape::Text)));

    let bunch = ToolBunch::new("misc", "Miscellaneous")
        .with_group("", [echo, add_tool()])
        .expect("register");

    let text = bunch.handle((), &call("echo", json!({"words": ["a", "b"]}))).await;
    assert_eq!(text, "a b");
    assert_eq!(bunch.handle((), &call("add", json!({"a": 1, "b": 1}))).await, "2");
}

#[tokio::test]
async fn handwritten_operational_errors_render_like_generated_ones() {
    let refuse = ToolFunction::from_sync("refuse", |(), _args: Arguments| {
        Err::<String, _>(CallError::operational("not allowed"))
    });
    let bunch = ToolBunch::new("misc", "Miscellaneous")
        .with_group("misc.", [refuse])
        .expect("register");
    assert_eq!(bunch.handle((), &call("misc.refuse", json!(null))).await, "ERROR: not allowed");
}
