//! Tabular loader: uploaded sheets into [`DataSource`]s.
//!
//! CSV files go through the `csv` reader with every cell kept as text.
//! Excel workbooks are read from their first sheet with `calamine`, row 0
//! as headers. JSON files must hold an array of flat objects.

use amortization_core::resolver::DataSource;
use calamine::{open_workbook_auto, Data, Reader};
use serde_json::Value;
use std::fs;
use std::path::Path;

use super::file::{extension, resolve_path};

/// Load every path in order. Order matters: the resolver lets the first
/// source holding a payee win.
pub fn load_sources(paths: &[String]) -> Result<Vec<DataSource>, Box<dyn std::error::Error>> {
    paths.iter().map(|p| load_source(p)).collect()
}

pub fn load_source(path: &str) -> Result<DataSource, Box<dyn std::error::Error>> {
    let canonical = resolve_path(path)?;
    let name = canonical
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or(path)
        .to_string();

    let source = match extension(&canonical).as_deref() {
        Some("csv") | Some("txt") => read_csv(&canonical, name)?,
        Some("json") => read_json_rows(&canonical, name)?,
        Some("xlsx") | Some("xlsm") | Some("xls") | Some("ods") => read_xlsx(&canonical, name)?,
        _ => {
            return Err(format!(
                "Unsupported source '{}': expected .xlsx, .csv or .json",
                canonical.display()
            )
            .into())
        }
    };

    tracing::debug!(
        source = %source.name,
        rows = source.len(),
        columns = ?source.columns(),
        "loaded data source"
    );
    Ok(source)
}

fn read_csv(path: &Path, name: String) -> Result<DataSource, Box<dyn std::error::Error>> {
    let mut rdr = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(|e| format!("Failed to read '{}': {}", path.display(), e))?;

    let headers: Vec<String> = rdr.headers()?.iter().map(str::to_string).collect();
    let mut records: Vec<Vec<String>> = Vec::new();
    for record in rdr.records() {
        let record = record.map_err(|e| format!("Failed to parse '{}': {}", path.display(), e))?;
        records.push(record.iter().map(str::to_string).collect());
    }
    Ok(DataSource::from_records(name, &headers, records))
}

fn read_xlsx(path: &Path, name: String) -> Result<DataSource, Box<dyn std::error::Error>> {
    let mut workbook = open_workbook_auto(path)
        .map_err(|e| format!("Failed to open '{}': {}", path.display(), e))?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| format!("'{}' has no worksheets", path.display()))?
        .map_err(|e| format!("Failed to read '{}': {}", path.display(), e))?;

    let mut rows = range.rows();
    let headers: Vec<String> = match rows.next() {
        Some(header) => header.iter().map(excel_cell_text).collect(),
        None => Vec::new(),
    };
    let records: Vec<Vec<String>> = rows
        .map(|row| row.iter().map(excel_cell_text).collect::<Vec<_>>())
        .filter(|cells| cells.iter().any(|c| !c.is_empty()))
        .collect();
    Ok(DataSource::from_records(name, &headers, records))
}

/// Cell text in the forms the coercion step parses: whole floats without a
/// trailing `.0`, date cells as `YYYY-MM-DD`.
fn excel_cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) | Data::DateTimeIso(s) | Data::DurationIso(s) => s.trim().to_string(),
        Data::Float(f) => f.to_string(),
        Data::Int(i) => i.to_string(),
        Data::Bool(b) => b.to_string(),
        Data::DateTime(dt) => match dt.as_datetime() {
            Some(ts) => ts.date().format("%Y-%m-%d").to_string(),
            None => dt.as_f64().to_string(),
        },
        Data::Error(e) => e.to_string(),
    }
}

fn read_json_rows(path: &Path, name: String) -> Result<DataSource, Box<dyn std::error::Error>> {
    let contents = fs::read_to_string(path)
        .map_err(|e| format!("Failed to read '{}': {}", path.display(), e))?;
    let value: Value = serde_json::from_str(&contents)
        .map_err(|e| format!("Failed to parse '{}': {}", path.display(), e))?;

    let Value::Array(items) = value else {
        return Err(format!("'{}' must contain a JSON array of rows", path.display()).into());
    };

    let mut rows: Vec<Vec<(String, String)>> = Vec::with_capacity(items.len());
    for (i, item) in items.into_iter().enumerate() {
        let Value::Object(map) = item else {
            return Err(format!("'{}': row {} is not an object", path.display(), i).into());
        };
        rows.push(map.into_iter().map(|(k, v)| (k, cell_text(v))).collect());
    }
    Ok(DataSource::from_rows(name, rows))
}

fn cell_text(value: Value) -> String {
    match value {
        Value::String(s) => s,
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn temp_with(suffix: &str, contents: &str) -> tempfile::NamedTempFile {
        let mut f = tempfile::Builder::new().suffix(suffix).tempfile().unwrap();
        f.write_all(contents.as_bytes()).unwrap();
        f
    }

    #[test]
    fn test_load_csv_normalizes() {
        let f = temp_with(
            ".csv",
            "Payee ID , Total Incentive,Cap %,Term,Payment Frequency,Payment Start Date\n\
             P1,\"12,000\",90,12, Monthly ,2025-02-01\n",
        );
        let src = load_source(f.path().to_str().unwrap()).unwrap();
        assert_eq!(src.len(), 1);
        let row = &src.rows()[0];
        assert_eq!(row.get("payee id").unwrap(), "P1");
        assert_eq!(row.get("total incentive").unwrap(), "12,000");
        assert_eq!(row.get("payment frequency").unwrap(), "Monthly");
        assert!(src.has_field("payee id"));
    }

    #[test]
    fn test_load_json_rows() {
        let f = temp_with(
            ".json",
            r#"[{"Payee ID": "P1", "Term": 12, "Cap %": 90.5, "Note": null}]"#,
        );
        let src = load_source(f.path().to_str().unwrap()).unwrap();
        let row = &src.rows()[0];
        assert_eq!(row.get("term").unwrap(), "12");
        assert_eq!(row.get("cap %").unwrap(), "90.5");
        assert_eq!(row.get("note").unwrap(), "");
    }

    #[test]
    fn test_json_must_be_array() {
        let f = temp_with(".json", r#"{"Payee ID": "P1"}"#);
        assert!(load_source(f.path().to_str().unwrap()).is_err());
    }

    fn workbook_with_payees() -> tempfile::NamedTempFile {
        use rust_xlsxwriter::{ExcelDateTime, Format, Workbook};

        let f = tempfile::Builder::new().suffix(".xlsx").tempfile().unwrap();
        let mut workbook = Workbook::new();
        let sheet = workbook.add_worksheet();
        let headers = ["Payee ID", "Total Incentive", "Cap %", "Term", "Payment Frequency", "Payment Start Date"];
        for (col, h) in headers.iter().enumerate() {
            sheet.write_string(0, col as u16, *h).unwrap();
        }
        let date_format = Format::new().set_num_format("yyyy-mm-dd");
        sheet.write_string(1, 0, "P1").unwrap();
        sheet.write_number(1, 1, 12000).unwrap();
        sheet.write_number(1, 2, 90.5).unwrap();
        sheet.write_number(1, 3, 12).unwrap();
        sheet.write_string(1, 4, "Monthly").unwrap();
        sheet
            .write_datetime_with_format(1, 5, &ExcelDateTime::from_ymd(2025, 2, 1).unwrap(), &date_format)
            .unwrap();
        // Unformatted serial, as some exports store dates
        sheet.write_string(2, 0, "P2").unwrap();
        sheet.write_number(2, 1, 4000).unwrap();
        sheet.write_number(2, 2, 100).unwrap();
        sheet.write_number(2, 3, 4).unwrap();
        sheet.write_string(2, 4, "Quarterly").unwrap();
        sheet.write_number(2, 5, 45689).unwrap();
        workbook.save(f.path()).unwrap();
        f
    }

    #[test]
    fn test_load_xlsx_first_sheet() {
        let f = workbook_with_payees();
        let src = load_source(f.path().to_str().unwrap()).unwrap();
        assert_eq!(src.len(), 2);
        assert!(src.has_field("payee id"));
        let row = &src.rows()[0];
        assert_eq!(row.get("total incentive").unwrap(), "12000");
        assert_eq!(row.get("cap %").unwrap(), "90.5");
        assert_eq!(row.get("term").unwrap(), "12");
        assert_eq!(row.get("payment start date").unwrap(), "2025-02-01");
    }

    #[test]
    fn test_xlsx_rows_resolve_to_records() {
        use amortization_core::resolver::resolve;
        use amortization_core::{CalculatorConfig, Frequency};
        use chrono::NaiveDate;

        let f = workbook_with_payees();
        let sources = vec![load_source(f.path().to_str().unwrap()).unwrap()];
        let p2 = resolve(&sources, "P2", &CalculatorConfig::default()).unwrap();
        let record = p2.record().unwrap();
        assert_eq!(record.term, 4);
        assert_eq!(record.frequency, Frequency::Quarterly);
        assert_eq!(record.start_date, NaiveDate::from_ymd_opt(2025, 2, 1).unwrap());
    }

    #[test]
    fn test_corrupt_xlsx_is_error() {
        let f = temp_with(".xlsx", "not really a workbook");
        let err = load_source(f.path().to_str().unwrap()).unwrap_err();
        assert!(err.to_string().contains("Failed to open"));
    }
}
