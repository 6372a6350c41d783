use clap::Args;
use serde_json::{json, Value};

use amortization_core::resolver;
use amortization_core::CalculatorConfig;

use crate::input;

/// Arguments for listing payee identifiers
#[derive(Args)]
pub struct PayeesArgs {
    /// Data source files (.xlsx, .csv or .json), scanned in the order given
    #[arg(long = "source", short = 's', required = true)]
    pub sources: Vec<String>,

    /// Identifier column (overrides config)
    #[arg(long)]
    pub identifier_field: Option<String>,
}

/// Arguments for resolving a single payee
#[derive(Args)]
pub struct ResolveArgs {
    /// Data source files (.xlsx, .csv or .json), scanned in the order given
    #[arg(long = "source", short = 's', required = true)]
    pub sources: Vec<String>,

    /// Payee identifier to look up
    #[arg(long)]
    pub payee_id: String,

    /// Identifier column (overrides config)
    #[arg(long)]
    pub identifier_field: Option<String>,
}

pub fn run_payees(
    args: PayeesArgs,
    config: &CalculatorConfig,
) -> Result<Value, Box<dyn std::error::Error>> {
    let sources = input::table::load_sources(&args.sources)?;
    let field = args
        .identifier_field
        .unwrap_or_else(|| config.identifier_field.clone());
    let ids = resolver::payee_ids(&sources, &field);
    if ids.is_empty() {
        tracing::warn!(field = %field, "no source carries the identifier column");
    }
    Ok(json!({
        "identifier_field": field,
        "sources": sources.iter().map(|s| s.name.as_str()).collect::<Vec<_>>(),
        "payee_ids": ids,
    }))
}

pub fn run_resolve(
    args: ResolveArgs,
    config: &CalculatorConfig,
) -> Result<Value, Box<dyn std::error::Error>> {
    let sources = input::table::load_sources(&args.sources)?;
    let mut config = config.clone();
    if let Some(field) = args.identifier_field {
        config.identifier_field = field;
    }
    let resolution = resolver::resolve(&sources, &args.payee_id, &config)?;
    Ok(serde_json::to_value(resolution)?)
}
