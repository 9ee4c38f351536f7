pub mod csv_out;
pub mod minimal;
pub mod table;

use crate::OutputFormat;
use portfolio_sim_core::{ErrorReport, PortfolioSimError};
use serde_json::{Map, Value};

/// Dispatch output to the appropriate formatter.
pub fn format_output(format: &OutputFormat, value: &Value) {
    match format {
        OutputFormat::Json => print_json(value),
        OutputFormat::Table => table::print_table(value),
        OutputFormat::Csv => csv_out::print_csv(value),
        OutputFormat::Minimal => minimal::print_minimal(value),
    }
}

fn print_json(value: &Value) {
    match serde_json::to_string_pretty(value) {
        Ok(s) => println!("{}", s),
        Err(e) => eprintln!("JSON serialization error: {}", e),
    }
}

/// `{ error_kind, message }` as a JSON value, plus the computed `record`
/// when the run finished but could not be persisted.
pub fn failure_report(err: &PortfolioSimError) -> Value {
    let report = ErrorReport::from(err);
    let mut value =
        serde_json::to_value(&report).unwrap_or_else(|_| Value::String(report.message.clone()));
    if let (Some(record), Value::Object(map)) = (err.unpersisted_record(), &mut value) {
        if let Ok(record) = serde_json::to_value(record) {
            map.insert("record".to_string(), record);
        }
    }
    value
}

/// Flatten nested objects into dotted keys (`results.median`). Arrays are
/// left in place for the formatter to handle.
pub fn flatten(map: &Map<String, Value>) -> Vec<(String, Value)> {
    let mut out = Vec::new();
    flatten_into(&mut out, None, map);
    out
}

fn flatten_into(out: &mut Vec<(String, Value)>, prefix: Option<&str>, map: &Map<String, Value>) {
    for (key, val) in map {
        let full = match prefix {
            Some(p) => format!("{p}.{key}"),
            None => key.clone(),
        };
        match val {
            Value::Object(inner) => flatten_into(out, Some(&full), inner),
            other => out.push((full, other.clone())),
        }
    }
}

/// Render a scalar for a table cell or CSV field.
pub fn scalar(value: &Value, null: &str) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => null.to_string(),
        _ => serde_json::to_string(value).unwrap_or_default(),
    }
}
