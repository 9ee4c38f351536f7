use serde::de::DeserializeOwned;
use std::fs;
use std::path::{Path, PathBuf};

use portfolio_sim_core::{PortfolioSimError, PortfolioSimResult};

/// Read a JSON file and deserialise into a typed struct. Unreadable or
/// malformed input is a validation error on `field`.
pub fn read_json<T: DeserializeOwned>(path: &str, field: &str) -> PortfolioSimResult<T> {
    let resolved = resolve_path(path, field)?;
    let contents = fs::read_to_string(&resolved).map_err(|e| {
        PortfolioSimError::validation(
            field,
            format!("Failed to read '{}': {}", resolved.display(), e),
        )
    })?;
    super::decode(&contents, &format!("'{}'", resolved.display()), field)
}

/// Resolve a path against the working directory and require an existing file.
pub fn resolve_path(path: &str, field: &str) -> PortfolioSimResult<PathBuf> {
    let p = Path::new(path);
    let resolved = if p.is_absolute() {
        p.to_path_buf()
    } else {
        std::env::current_dir()
            .map_err(|e| PortfolioSimError::validation(field, e.to_string()))?
            .join(p)
    };

    if !resolved.is_file() {
        return Err(PortfolioSimError::validation(
            field,
            format!("Not a readable file: {}", resolved.display()),
        ));
    }
    Ok(resolved)
}
