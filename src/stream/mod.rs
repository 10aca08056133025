pub mod decoder;
pub mod ingest;

use serde::Deserialize;
use serde_json::Value as JsonValue;

pub use self::decoder::{ LineDecoder, Utf8Decoder };
pub use self::ingest::StreamIngestor;

pub const EVENT_MARKER: &str = "data: ";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamFrame {
    Error(String),
    Done,
    Content(String),
    /// A payload carrying none of the recognised keys.
    KeepAlive,
}

#[derive(Deserialize)]
struct RawPayload {
    #[serde(default)]
    error: Option<JsonValue>,
    #[serde(default)]
    done: Option<JsonValue>,
    #[serde(default)]
    content: Option<JsonValue>,
}

fn is_truthy(value: &JsonValue) -> bool {
    match value {
        JsonValue::Null => false,
        JsonValue::Bool(b) => *b,
        JsonValue::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(true),
        JsonValue::String(s) => !s.is_empty(),
        JsonValue::Array(_) | JsonValue::Object(_) => true,
    }
}

/// Parses one line of the completion stream. Blank lines and lines without
/// the event marker yield `Ok(None)`.
pub fn parse_frame(line: &str) -> Result<Option<StreamFrame>, serde_json::Error> {
    let data = match line.strip_prefix(EVENT_MARKER) {
        Some(data) => data,
        None => return Ok(None),
    };
    let payload: RawPayload = serde_json::from_str(data)?;

    if let Some(error) = payload.error.filter(is_truthy) {
        let message = match error {
            JsonValue::String(s) => s,
            other => other.to_string(),
        };
        return Ok(Some(StreamFrame::Error(message)));
    }
    if payload.done.as_ref().map(is_truthy).unwrap_or(false) {
        return Ok(Some(StreamFrame::Done));
    }
    match payload.content {
        Some(JsonValue::String(text)) if !text.is_empty() => Ok(Some(StreamFrame::Content(text))),
        _ => Ok(Some(StreamFrame::KeepAlive)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ignores_blank_and_unmarked_lines() {
        assert_eq!(parse_frame("").unwrap(), None);
        assert_eq!(parse_frame(": ping").unwrap(), None);
        assert_eq!(parse_frame("event: message").unwrap(), None);
    }

    #[test]
    fn error_takes_priority_over_other_keys() {
        let frame = parse_frame(r#"data: {"error":"rate limited","done":true,"content":"x"}"#);
        assert_eq!(frame.unwrap(), Some(StreamFrame::Error("rate limited".into())));
    }

    #[test]
    fn done_takes_priority_over_content() {
        let frame = parse_frame(r#"data: {"done":true,"content":"tail"}"#);
        assert_eq!(frame.unwrap(), Some(StreamFrame::Done));
    }

    #[test]
    fn content_with_done_false_is_a_fragment() {
        let frame = parse_frame(r#"data: {"content":"안녕","done":false}"#);
        assert_eq!(frame.unwrap(), Some(StreamFrame::Content("안녕".into())));
    }

    #[test]
    fn empty_values_fall_through_to_keep_alive() {
        let frame = parse_frame(r#"data: {"error":"","content":""}"#);
        assert_eq!(frame.unwrap(), Some(StreamFrame::KeepAlive));
    }

    #[test]
    fn structured_errors_are_rendered_as_json() {
        let frame = parse_frame(r#"data: {"error":{"code":429}}"#);
        assert_eq!(frame.unwrap(), Some(StreamFrame::Error(r#"{"code":429}"#.into())));
    }

    #[test]
    fn malformed_payload_is_an_error() {
        assert!(parse_frame("data: [DONE]").is_err());
        assert!(parse_frame("data: {\"content\":").is_err());
    }
}
