//! Capture file parsing.
//!
//! One notification per line as hex (whitespace and `:` separators are
//! ignored). A line reading `disconnect` marks the end of the link
//! session. Blank lines and `#` comments are skipped.

use std::path::Path;

use bledrop_receiver::LinkEvent;

/// Errors produced while reading a capture.
#[derive(Debug, thiserror::Error)]
pub enum CaptureError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("line {line}: invalid hex: {source}")]
    InvalidHex {
        line: usize,
        #[source]
        source: hex::FromHexError,
    },
}

/// Reads a capture file.
pub fn load(path: &Path) -> Result<Vec<LinkEvent>, CaptureError> {
    let text = std::fs::read_to_string(path)?;
    parse(&text)
}

/// Parses capture text into link events.
pub fn parse(text: &str) -> Result<Vec<LinkEvent>, CaptureError> {
    let mut events = Vec::new();
    for (idx, raw) in text.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        if line.eq_ignore_ascii_case("disconnect") {
            events.push(LinkEvent::Disconnected);
            continue;
        }

        let digits: String = line
            .chars()
            .filter(|c| !c.is_whitespace() && *c != ':')
            .collect();
        let data = hex::decode(&digits).map_err(|source| CaptureError::InvalidHex {
            line: idx + 1,
            source,
        })?;
        events.push(LinkEvent::Notification(data));
    }
    Ok(events)
}
