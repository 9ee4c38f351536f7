use serde_json::Value;

use super::scalar;

/// Headline figure first: VaR for a simulation, then the median.
const PRIORITY_KEYS: [&str; 4] = ["value_at_risk_95", "median", "message", "simulation_id"];

/// Print just the key answer value from the output.
///
/// Looks in the envelope's `result`, then in its nested `results` block, for
/// the first priority key; otherwise prints the first field it finds.
pub fn print_minimal(value: &Value) {
    let result_obj = value
        .as_object()
        .and_then(|m| m.get("result"))
        .unwrap_or(value);

    let scopes = [Some(result_obj), result_obj.get("results")];
    for key in PRIORITY_KEYS {
        for scope in scopes.iter().flatten() {
            if let Some(val) = scope.get(key).filter(|v| !v.is_null()) {
                println!("{}", scalar(val, "null"));
                return;
            }
        }
    }

    match result_obj {
        Value::Object(map) => {
            if let Some((key, val)) = map.iter().next() {
                println!("{}: {}", key, scalar(val, "null"));
            }
        }
        Value::Array(arr) => {
            for item in arr {
                match item.get("scenario_id") {
                    Some(id) => println!("{}", scalar(id, "null")),
                    None => println!("{}", scalar(item, "null")),
                }
            }
        }
        other => println!("{}", scalar(other, "null")),
    }
}
