//! Math bot demo: exposes a handful of arithmetic functions as one tool and a
//! unit-conversion provider dispatcher, answering JSON requests from the
//! command line or from stdin, one request per line.

use std::io::{self, BufRead};
use std::path::PathBuf;

use anyhow::{Context, Result};
use async_trait::async_trait;
use bot_config::ToolkitConfig;
use bot_tools::{
    CallError, OperationalError, Provider, ProviderDispatcher, ProviderMethod, ToolBunch, tool,
};
use clap::{Parser, ValueEnum};
use serde_json::{Map, Value};
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "math-bot", about = "Answer list/help/call requests for a math tool")]
struct Cli {
    /// JSON configuration file.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Which tool receives the requests.
    #[arg(long, value_enum, default_value_t = Target::Math)]
    target: Target,

    /// Print the tool declaration advertised to the model and exit.
    #[arg(long)]
    declaration: bool,

    /// Requests as JSON objects; stdin is read when none are given.
    requests: Vec<String>,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Target {
    Math,
    Units,
}

/// Adds two integers.
#[tool]
fn add(a: i64, b: i64) -> i64 {
    a + b
}

/// Multiplies two integers.
#[tool]
async fn mul(a: i64, b: i64) -> i64 {
    a * b
}

/// Divides `a` by `b`.
///
/// Fails when `b` is zero.
#[tool]
fn divide(a: f64, b: f64) -> Result<f64, OperationalError> {
    if b == 0.0 {
        return Err(OperationalError::new("division by zero"));
    }
    Ok(a / b)
}

/// Sums a list of numbers, optionally rounding the result.
#[tool(default(round = false))]
fn sum(values: Vec<f64>, round: bool) -> f64 {
    let total: f64 = values.iter().sum();
    if round { total.round() } else { total }
}

struct Metric;

#[async_trait]
impl Provider for Metric {
    fn methods(&self) -> Vec<ProviderMethod> {
        vec![
            ProviderMethod::new("km_to_miles", "Convert kilometres to miles"),
            ProviderMethod::new("kg_to_pounds", "Convert kilograms to pounds"),
        ]
    }

    async fn call(&self, method: &str, args: Map<String, Value>) -> Result<String, CallError> {
        let value = args
            .get("value")
            .and_then(Value::as_f64)
            .ok_or_else(|| OperationalError::new("'value' must be a number"))?;
        let factor = match method {
            "km_to_miles" => 0.621_371,
            "kg_to_pounds" => 2.204_62,
            other => return Err(CallError::operational(format!("unsupported conversion {other}"))),
        };
        Ok(format!("{:.3}", value * factor))
    }
}

fn math_tool(config: &ToolkitConfig) -> Result<ToolBunch> {
    let identity = &config.tool;
    ToolBunch::new(&identity.name, &identity.description)
        .with_group("math.", [add_tool(), mul_tool(), divide_tool(), sum_tool()])
        .context("failed to register math functions")
}

fn units_tool() -> ProviderDispatcher<()> {
    ProviderDispatcher::new("units").with_provider("metric", |()| Metric)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = ToolkitConfig::load(cli.config.as_deref())?;
    bot_telemetry::init_tracing(&config.log)?;

    let math = math_tool(&config)?;
    if cli.declaration {
        println!("{}", serde_json::to_string_pretty(&math.tool_declaration())?);
        return Ok(());
    }
    let units = units_tool();
    info!(tool = math.name(), methods = math.len(), "math bot ready");

    let requests = if cli.requests.is_empty() {
        io::stdin()
            .lock()
            .lines()
            .collect::<io::Result<Vec<_>>>()
            .context("failed to read requests from stdin")?
    } else {
        cli.requests
    };

    for line in requests.iter().filter(|line| !line.trim().is_empty()) {
        let request: Value = serde_json::from_str(line)
            .with_context(|| format!("request is not valid JSON: {line}"))?;
        let reply = match cli.target {
            Target::Math => math.handle((), &request).await,
            Target::Units => units.handle((), &request).await,
        };
        println!("{reply}");
    }
    Ok(())
}
