use chrono::{Local, NaiveDate};
use clap::{Args, ValueEnum};
use rust_decimal::Decimal;
use serde_json::Value;
use std::path::Path;

use amortization_core::overrides::RecordOverrides;
use amortization_core::resolver::{self, coerce, Resolution};
use amortization_core::schedule::{self, ScheduleInput};
use amortization_core::{AccumulationPolicy, AmortizationError, CalculatorConfig, Frequency, PayeeRecord};

use crate::input;
use crate::output::csv_out::{self, DEFAULT_EXPORT_FILE};
use crate::print_warning;

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum FrequencyArg {
    Monthly,
    Quarterly,
}

impl From<FrequencyArg> for Frequency {
    fn from(f: FrequencyArg) -> Self {
        match f {
            FrequencyArg::Monthly => Frequency::Monthly,
            FrequencyArg::Quarterly => Frequency::Quarterly,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum AccumulationArg {
    /// Accumulate unrounded payments, round for display only
    Unrounded,
    /// Accumulate the rounded payments
    RoundedIncrements,
}

impl From<AccumulationArg> for AccumulationPolicy {
    fn from(a: AccumulationArg) -> Self {
        match a {
            AccumulationArg::Unrounded => AccumulationPolicy::Unrounded,
            AccumulationArg::RoundedIncrements => AccumulationPolicy::RoundedIncrements,
        }
    }
}

/// Arguments for schedule generation
#[derive(Args)]
pub struct ScheduleArgs {
    /// Path to JSON input file (overrides sources and individual flags)
    #[arg(long)]
    pub input: Option<String>,

    /// Data source files (.xlsx, .csv or .json), scanned in the order given
    #[arg(long = "source", short = 's')]
    pub sources: Vec<String>,

    /// Payee identifier
    #[arg(long)]
    pub payee_id: Option<String>,

    /// Candidate to use when several rows match the payee (0-indexed)
    #[arg(long)]
    pub select: Option<usize>,

    /// Identifier column (overrides config)
    #[arg(long)]
    pub identifier_field: Option<String>,

    /// Total incentive
    #[arg(long)]
    pub total_incentive: Option<Decimal>,

    /// Cap as a percentage (90 = 90%)
    #[arg(long, alias = "cap-percent")]
    pub cap: Option<Decimal>,

    /// Number of payments
    #[arg(long)]
    pub term: Option<u32>,

    /// Payment frequency
    #[arg(long, value_enum)]
    pub frequency: Option<FrequencyArg>,

    /// Payment start date
    #[arg(long, value_parser = parse_start_date)]
    pub start_date: Option<NaiveDate>,

    /// Cumulative total accumulation (overrides config)
    #[arg(long, value_enum)]
    pub accumulation: Option<AccumulationArg>,

    /// Also write the schedule as CSV (default file: amortization_schedule.csv)
    #[arg(long, num_args = 0..=1, default_missing_value = DEFAULT_EXPORT_FILE)]
    pub export: Option<String>,
}

impl ScheduleArgs {
    fn overrides(&self) -> RecordOverrides {
        RecordOverrides {
            payee_id: self.payee_id.clone(),
            total_incentive: self.total_incentive,
            cap_percent: self.cap,
            term: self.term,
            frequency: self.frequency.map(Frequency::from),
            start_date: self.start_date,
        }
    }
}

pub fn run_schedule(
    args: ScheduleArgs,
    config: &CalculatorConfig,
) -> Result<Value, Box<dyn std::error::Error>> {
    let mut config = config.clone();
    if let Some(ref field) = args.identifier_field {
        config.identifier_field = field.clone();
    }
    if let Some(acc) = args.accumulation {
        config.accumulation = acc.into();
    }

    let mut schedule_input: ScheduleInput = if let Some(ref path) = args.input {
        input::file::read_json(path)?
    } else if args.sources.is_empty() && args.overrides().is_empty() {
        input::stdin::read_stdin()?.ok_or(
            "--source <file> with --payee-id, manual fields, --input <file.json> or stdin required",
        )?
    } else {
        ScheduleInput {
            record: build_record(&args, &config)?,
            accumulation: config.accumulation,
        }
    };
    if let Some(acc) = args.accumulation {
        schedule_input.accumulation = acc.into();
    }

    let output = schedule::generate_schedule(&schedule_input)?;

    if let Some(ref path) = args.export {
        csv_out::export_schedule(&output.result.rows, Path::new(path))?;
        eprintln!("Schedule written to {}", path);
    }

    Ok(serde_json::to_value(output)?)
}

/// Resolve from the sources when possible, then lay manual fields on top.
fn build_record(
    args: &ScheduleArgs,
    config: &CalculatorConfig,
) -> Result<PayeeRecord, Box<dyn std::error::Error>> {
    let resolved = if args.sources.is_empty() {
        None
    } else {
        let sources = input::table::load_sources(&args.sources)?;
        let Some(ref payee_id) = args.payee_id else {
            let ids = resolver::payee_ids(&sources, &config.identifier_field);
            return Err(format!(
                "--payee-id is required with --source (available: {})",
                if ids.is_empty() { "none".to_string() } else { ids.join(", ") }
            )
            .into());
        };
        auto_populate(&sources, payee_id, args.select, config)?
    };
    Ok(args.overrides().apply(resolved, Local::now().date_naive()))
}

/// Auto-population from the sources. Not finding the payee, or failing to
/// coerce its row, is reported and leaves the record to manual entry.
fn auto_populate(
    sources: &[resolver::DataSource],
    payee_id: &str,
    select: Option<usize>,
    config: &CalculatorConfig,
) -> Result<Option<PayeeRecord>, Box<dyn std::error::Error>> {
    let selected = match resolver::resolve(sources, payee_id, config) {
        Ok(Resolution::Found {
            record,
            source,
            row_index,
        }) => {
            tracing::info!(%source, row_index, "auto-populated payee");
            Ok(record)
        }
        Ok(Resolution::Ambiguous(m)) => match select {
            Some(index) => m.select(index),
            None => {
                let listing: Vec<String> = m
                    .candidates
                    .iter()
                    .enumerate()
                    .map(|(i, c)| format!("  [{}] {}", i, c.summary))
                    .collect();
                return Err(format!(
                    "Multiple entries found for {} in {}. Re-run with --select <n>:\n{}",
                    m.payee_id,
                    m.source,
                    listing.join("\n")
                )
                .into());
            }
        },
        Ok(Resolution::NotFound { payee_id }) => {
            print_warning(&format!(
                "Payee '{}' not found in any source; using manual entry.",
                payee_id
            ));
            return Ok(None);
        }
        Err(e) => Err(e),
    };

    match selected {
        Ok(record) => Ok(Some(record)),
        Err(e @ AmortizationError::CoercionError { .. }) => {
            print_warning(&format!("{}; using manual entry.", e));
            Ok(None)
        }
        Err(e) => Err(e.into()),
    }
}

fn parse_start_date(s: &str) -> Result<NaiveDate, String> {
    coerce::parse_date("start-date", s).map_err(|e| e.to_string())
}
