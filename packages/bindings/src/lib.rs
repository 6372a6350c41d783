use amortization_core::resolver::{self, DataSource, Resolution};
use amortization_core::schedule::{self, ScheduleInput};
use amortization_core::CalculatorConfig;
use napi::Result as NapiResult;
use napi_derive::napi;
use serde::Deserialize;
use serde_json::{Map, Value};

/// Convert any Display error into a napi::Error.
fn to_napi_error(e: impl std::fmt::Display) -> napi::Error {
    napi::Error::from_reason(e.to_string())
}

// ---------------------------------------------------------------------------
// Request shapes
// ---------------------------------------------------------------------------

/// One uploaded sheet as parsed on the JS side.
#[derive(Deserialize)]
struct SourceJson {
    name: String,
    rows: Vec<Map<String, Value>>,
}

impl SourceJson {
    fn into_source(self) -> DataSource {
        let rows = self
            .rows
            .into_iter()
            .map(|row| row.into_iter().map(|(k, v)| (k, cell_text(v))).collect::<Vec<_>>());
        DataSource::from_rows(self.name, rows)
    }
}

#[derive(Deserialize)]
struct ResolveRequest {
    sources: Vec<SourceJson>,
    #[serde(default)]
    payee_id: String,
    #[serde(default)]
    config: CalculatorConfig,
    /// Candidate index for the second disambiguation step
    #[serde(default)]
    select: Option<usize>,
}

impl ResolveRequest {
    fn into_parts(self) -> (Vec<DataSource>, String, CalculatorConfig, Option<usize>) {
        let sources = self.sources.into_iter().map(SourceJson::into_source).collect();
        (sources, self.payee_id, self.config, self.select)
    }
}

fn cell_text(value: Value) -> String {
    match value {
        Value::String(s) => s,
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

// ---------------------------------------------------------------------------
// Resolution
// ---------------------------------------------------------------------------

#[napi]
pub fn list_payee_ids(request_json: String) -> NapiResult<String> {
    let request: ResolveRequest = serde_json::from_str(&request_json).map_err(to_napi_error)?;
    let (sources, _, config, _) = request.into_parts();
    let ids = resolver::payee_ids(&sources, &config.identifier_field);
    serde_json::to_string(&ids).map_err(to_napi_error)
}

/// Resolve a payee. With `select` set, an ambiguous match is settled in the
/// same call and reported as found.
#[napi]
pub fn resolve_payee(request_json: String) -> NapiResult<String> {
    let request: ResolveRequest = serde_json::from_str(&request_json).map_err(to_napi_error)?;
    let (sources, payee_id, config, select) = request.into_parts();
    let resolution = resolver::resolve(&sources, &payee_id, &config).map_err(to_napi_error)?;
    let resolution = match (resolution, select) {
        (Resolution::Ambiguous(m), Some(index)) => {
            let record = m.select(index).map_err(to_napi_error)?;
            let row_index = m.candidates[index].row_index;
            Resolution::Found {
                source: m.source,
                row_index,
                record,
            }
        }
        (other, _) => other,
    };
    serde_json::to_string(&resolution).map_err(to_napi_error)
}

// ---------------------------------------------------------------------------
// Schedule
// ---------------------------------------------------------------------------

#[napi]
pub fn generate_schedule(input_json: String) -> NapiResult<String> {
    let input = ScheduleInput::from_json(&input_json).map_err(to_napi_error)?;
    let output = schedule::generate_schedule(&input).map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}
