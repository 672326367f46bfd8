use serde::de::DeserializeOwned;
use serde_json::Value;
use std::io::{self, Read};
use std::path::Path;

/// Read a JSON file and deserialise into a typed struct.
pub fn read_json<T: DeserializeOwned>(path: &str) -> Result<T, Box<dyn std::error::Error>> {
    let p = Path::new(path);
    if !p.is_file() {
        return Err(format!("File not found: {}", p.display()).into());
    }
    let contents = std::fs::read_to_string(p)
        .map_err(|e| format!("Failed to read '{}': {}", p.display(), e))?;
    let value: T = serde_json::from_str(&contents)
        .map_err(|e| format!("Failed to parse '{}': {}", p.display(), e))?;
    Ok(value)
}

/// Attempt to read JSON from stdin if data is being piped.
/// Returns None if stdin is a TTY (interactive).
pub fn read_stdin() -> Result<Option<Value>, Box<dyn std::error::Error>> {
    if atty::is(atty::Stream::Stdin) {
        return Ok(None);
    }

    let mut buffer = String::new();
    io::stdin().read_to_string(&mut buffer)?;

    let trimmed = buffer.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }

    let value: Value = serde_json::from_str(trimmed)?;
    Ok(Some(value))
}
