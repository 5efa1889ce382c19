use serde::de::DeserializeOwned;
use std::io::{self, Read};

use super::file::{parse_document, DocumentFormat};

/// Read a JSON (or YAML) document from stdin if data is being piped.
/// Returns None if stdin is a TTY (interactive) or empty.
pub fn read_stdin<T: DeserializeOwned>() -> Result<Option<T>, Box<dyn std::error::Error>> {
    if atty::is(atty::Stream::Stdin) {
        return Ok(None);
    }

    let mut buffer = String::new();
    io::stdin().read_to_string(&mut buffer)?;

    let trimmed = buffer.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }

    let format = if trimmed.starts_with('{') {
        DocumentFormat::Json
    } else {
        DocumentFormat::Yaml
    };
    parse_document(trimmed, format).map(Some)
}
