use super::chunker;
use crate::domain::{LogRecord, ShipError};

/// Raw caller input: one message or an ordered list of messages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawEvents {
    Single(String),
    Many(Vec<String>),
}

impl RawEvents {
    /// A bare message becomes a one-element list.
    pub fn into_messages(self) -> Vec<String> {
        match self {
            RawEvents::Single(message) => vec![message],
            RawEvents::Many(messages) => messages,
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, RawEvents::Many(messages) if messages.is_empty())
    }
}

impl From<String> for RawEvents {
    fn from(message: String) -> Self {
        RawEvents::Single(message)
    }
}

impl From<&str> for RawEvents {
    fn from(message: &str) -> Self {
        RawEvents::Single(message.to_string())
    }
}

impl From<&String> for RawEvents {
    fn from(message: &String) -> Self {
        RawEvents::Single(message.clone())
    }
}

impl From<Vec<String>> for RawEvents {
    fn from(messages: Vec<String>) -> Self {
        RawEvents::Many(messages)
    }
}

impl From<Vec<&str>> for RawEvents {
    fn from(messages: Vec<&str>) -> Self {
        RawEvents::Many(messages.into_iter().map(str::to_string).collect())
    }
}

impl From<&[&str]> for RawEvents {
    fn from(messages: &[&str]) -> Self {
        RawEvents::Many(messages.iter().map(|m| (*m).to_string()).collect())
    }
}

impl<const N: usize> From<[&str; N]> for RawEvents {
    fn from(messages: [&str; N]) -> Self {
        RawEvents::Many(messages.iter().map(|m| (*m).to_string()).collect())
    }
}

/// Turns raw events into transport-ready records, one per chunk.
///
/// Records keep input order and, within one input, chunk order. Each record
/// message is `"<label> <segment>"`; the timestamp is taken as the record is
/// built.
pub fn batch(
    raw_events: impl Into<RawEvents>,
    level_label: &str,
    max_bytes: usize,
) -> Result<Vec<LogRecord>, ShipError> {
    let messages = raw_events.into().into_messages();
    if messages.is_empty() {
        return Err(ShipError::InvalidInput("Empty log event".to_string()));
    }

    let mut records = Vec::with_capacity(messages.len());
    for message in &messages {
        for segment in chunker::split(message, max_bytes) {
            records.push(LogRecord::new(format!("{level_label} {segment}")));
        }
    }
    Ok(records)
}
