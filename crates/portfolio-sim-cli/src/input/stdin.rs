use serde::de::DeserializeOwned;
use std::io::{self, Read};

use portfolio_sim_core::{PortfolioSimError, PortfolioSimResult};

/// Deserialise piped JSON from stdin.
/// Returns None when stdin is a TTY or carries no data.
pub fn read_stdin<T: DeserializeOwned>(field: &str) -> PortfolioSimResult<Option<T>> {
    if atty::is(atty::Stream::Stdin) {
        return Ok(None);
    }

    let mut buffer = String::new();
    io::stdin()
        .read_to_string(&mut buffer)
        .map_err(|e| PortfolioSimError::validation(field, format!("Failed to read stdin: {e}")))?;

    let trimmed = buffer.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    super::decode(trimmed, "stdin", field).map(Some)
}
