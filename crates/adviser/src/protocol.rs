//! Line-oriented data stream protocol spoken between the relay server and chat
//! surfaces. Every line is `<code>:<json>\n`:
//! - `0:` a text fragment (JSON string)
//! - `3:` an error message (JSON string)
//! - `d:` finish, with a reason and token usage
use serde_json::{json, Value};

use crate::errors::{RelayError, RelayResult};

#[derive(Debug, Clone, PartialEq)]
pub enum DataStreamPart {
    Text(String),
    Error(String),
    Finish { reason: String },
}

pub fn format_text(text: &str) -> String {
    let encoded_text = serde_json::to_string(text).unwrap_or_else(|_| String::from("\"\""));
    format!("0:{}\n", encoded_text)
}

pub fn format_error(message: &str) -> String {
    let encoded = serde_json::to_string(message).unwrap_or_else(|_| String::from("\"\""));
    format!("3:{}\n", encoded)
}

pub fn format_finish(reason: &str) -> String {
    let finish = json!({
        "finishReason": reason,
        "usage": {
            "promptTokens": 0,
            "completionTokens": 0
        }
    });
    format!("d:{}\n", finish)
}

/// Parse one protocol line. Returns `Ok(None)` for blank lines and part types
/// a chat surface does not act on.
pub fn decode_line(line: &str) -> RelayResult<Option<DataStreamPart>> {
    let line = line.trim_end_matches(['\r', '\n']);
    if line.is_empty() {
        return Ok(None);
    }

    let (code, payload) = line
        .split_once(':')
        .ok_or_else(|| RelayError::InvalidResponse(format!("malformed stream line: {}", line)))?;

    let part = match code {
        "0" => DataStreamPart::Text(serde_json::from_str(payload)?),
        "3" => DataStreamPart::Error(serde_json::from_str(payload)?),
        "d" => {
            let value: Value = serde_json::from_str(payload)?;
            let reason = value
                .get("finishReason")
                .and_then(Value::as_str)
                .unwrap_or("unknown")
                .to_string();
            DataStreamPart::Finish { reason }
        }
        _ => return Ok(None),
    };
    Ok(Some(part))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_is_json_escaped() {
        let line = format_text("Rad ett\n\"citat\"");
        assert_eq!(line, "0:\"Rad ett\\n\\\"citat\\\"\"\n");
        assert_eq!(
            decode_line(&line).unwrap(),
            Some(DataStreamPart::Text("Rad ett\n\"citat\"".to_string()))
        );
    }

    #[test]
    fn test_finish_line() {
        let line = format_finish("stop");
        assert!(line.starts_with("d:{"));
        assert_eq!(
            decode_line(&line).unwrap(),
            Some(DataStreamPart::Finish {
                reason: "stop".to_string()
            })
        );
    }

    #[test]
    fn test_error_line() {
        assert_eq!(
            decode_line(&format_error("Assistant run failed")).unwrap(),
            Some(DataStreamPart::Error("Assistant run failed".to_string()))
        );
    }

    #[test]
    fn test_ignored_and_malformed_lines() {
        assert_eq!(decode_line("").unwrap(), None);
        assert_eq!(decode_line("9:{\"toolCallId\":\"x\"}").unwrap(), None);
        assert!(decode_line("no separator").is_err());
        assert!(decode_line("0:not json").is_err());
    }
}
