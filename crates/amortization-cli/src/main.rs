mod commands;
mod input;
mod output;

use amortization_core::AmortizationError;
use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use std::process;
use tracing_subscriber::EnvFilter;

use commands::resolver::{PayeesArgs, ResolveArgs};
use commands::schedule::ScheduleArgs;

/// Incentive payee amortization schedules
#[derive(Parser)]
#[command(
    name = "amort",
    version,
    about = "Incentive payee amortization schedules",
    long_about = "Resolve incentive payees from uploaded CSV/JSON data sources and \
                  compute flat payment schedules with decimal precision. Monthly \
                  and quarterly cadences step fixed 30/90-day intervals."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format
    #[arg(long, default_value = "json", global = true)]
    output: OutputFormat,

    /// Calculator config file (.yaml, .yml or .json)
    #[arg(long, global = true)]
    config: Option<String>,

    /// Enable debug logging (RUST_LOG takes precedence)
    #[arg(long, short = 'v', global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// List distinct payee identifiers across data sources
    Payees(PayeesArgs),
    /// Resolve one payee to a record (or its ambiguous candidates)
    Resolve(ResolveArgs),
    /// Generate a payment schedule
    Schedule(ScheduleArgs),
    /// Print version information
    Version,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Csv,
    Minimal,
}

/// Report a recoverable problem on stderr.
pub(crate) fn print_warning(msg: &str) {
    eprintln!("{}: {}", "warning".yellow().bold(), msg);
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = match input::file::read_config(cli.config.as_deref()) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("{}: {}", "error".red().bold(), e);
            process::exit(1);
        }
    };

    let result: Result<serde_json::Value, Box<dyn std::error::Error>> = match cli.command {
        Commands::Payees(args) => commands::resolver::run_payees(args, &config),
        Commands::Resolve(args) => commands::resolver::run_resolve(args, &config),
        Commands::Schedule(args) => commands::schedule::run_schedule(args, &config),
        Commands::Version => {
            println!("amort {}", env!("CARGO_PKG_VERSION"));
            return;
        }
    };

    match result {
        Ok(value) => {
            // The table formatter prints its own warnings section
            if !matches!(cli.output, OutputFormat::Table) {
                if let Some(serde_json::Value::Array(warnings)) = value.get("warnings") {
                    for w in warnings.iter().filter_map(|w| w.as_str()) {
                        print_warning(w);
                    }
                }
            }
            output::format_output(&cli.output, &value);
            process::exit(0);
        }
        Err(e) => match e.downcast_ref::<AmortizationError>() {
            // Zero term: nothing to schedule, reported as a warning
            Some(ae) if ae.is_warning() => {
                print_warning(&ae.to_string());
                process::exit(2);
            }
            _ => {
                eprintln!("{}: {}", "error".red().bold(), e);
                process::exit(1);
            }
        },
    }
}
