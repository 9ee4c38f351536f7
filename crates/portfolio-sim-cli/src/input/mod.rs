pub mod file;
pub mod stdin;

use serde::de::DeserializeOwned;

use portfolio_sim_core::{PortfolioSimError, PortfolioSimResult};

/// JSON input from `--input <file>` if given, otherwise from piped stdin.
pub fn file_or_stdin<T: DeserializeOwned>(
    path: Option<&str>,
    field: &str,
) -> PortfolioSimResult<Option<T>> {
    match path {
        Some(p) => file::read_json(p, field).map(Some),
        None => stdin::read_stdin(field),
    }
}

/// Parse JSON text from `source`; a decode failure is a validation error.
pub fn decode<T: DeserializeOwned>(text: &str, source: &str, field: &str) -> PortfolioSimResult<T> {
    serde_json::from_str(text).map_err(|e| {
        PortfolioSimError::validation(field, format!("Failed to parse {source}: {e}"))
    })
}
