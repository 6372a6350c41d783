use amortization_core::PaymentRow;
use serde_json::Value;
use std::fs::File;
use std::io::{self, Write};
use std::path::Path;

/// Column headers of the schedule export.
pub const EXPORT_HEADERS: [&str; 6] = [
    "Payee ID",
    "Payment No",
    "Payment Date",
    "Payment Amount",
    "Cumulative Amount",
    "End Date",
];

/// File name used when `--export` is given without a path.
pub const DEFAULT_EXPORT_FILE: &str = "amortization_schedule.csv";

/// Write a schedule as UTF-8 CSV: dates `YYYY-MM-DD`, amounts to two places.
pub fn write_schedule_csv<W: Write>(
    rows: &[PaymentRow],
    writer: W,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut wtr = csv::Writer::from_writer(writer);
    wtr.write_record(EXPORT_HEADERS)?;
    for row in rows {
        wtr.write_record([
            row.payee_id.clone(),
            row.payment_number.to_string(),
            row.payment_date.format("%Y-%m-%d").to_string(),
            format!("{:.2}", row.payment_amount),
            format!("{:.2}", row.cumulative_amount),
            row.schedule_end_date.format("%Y-%m-%d").to_string(),
        ])?;
    }
    wtr.flush()?;
    Ok(())
}

/// Write the schedule export to `path`.
pub fn export_schedule(rows: &[PaymentRow], path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let file = File::create(path)
        .map_err(|e| format!("Failed to create '{}': {}", path.display(), e))?;
    write_schedule_csv(rows, file)
}

/// Write output as CSV to stdout. Schedules use the export layout; any
/// other result falls back to field/value pairs.
pub fn print_csv(value: &Value) {
    let result = value
        .as_object()
        .and_then(|m| m.get("result"))
        .unwrap_or(value);

    if let Some(rows) = result.get("rows") {
        match serde_json::from_value::<Vec<PaymentRow>>(rows.clone()) {
            Ok(rows) => {
                if let Err(e) = write_schedule_csv(&rows, io::stdout().lock()) {
                    eprintln!("CSV write error: {}", e);
                }
                return;
            }
            Err(e) => eprintln!("CSV conversion error: {}", e),
        }
    }

    let stdout = io::stdout();
    let mut wtr = csv::Writer::from_writer(stdout.lock());
    match result {
        Value::Object(map) => {
            let _ = wtr.write_record(["field", "value"]);
            for (key, val) in map {
                let _ = wtr.write_record([key.as_str(), &format_csv_value(val)]);
            }
        }
        Value::Array(arr) => {
            for item in arr {
                let _ = wtr.write_record([&format_csv_value(item)]);
            }
        }
        _ => {
            let _ = wtr.write_record([&format_csv_value(result)]);
        }
    }
    let _ = wtr.flush();
}

fn format_csv_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => String::new(),
        Value::Array(arr) => arr.iter().map(format_csv_value).collect::<Vec<_>>().join("; "),
        Value::Object(_) => serde_json::to_string(value).unwrap_or_default(),
    }
}
