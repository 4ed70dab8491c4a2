//! Message codec: requests to JSON text, JSON text to [`Message`].
//!
//! Both functions are pure. Framing (Content-Length headers) lives in
//! [`crate::framing`]; the text handled here is one newline-free frame.

use crate::error::{DapError, DecodeError};
use crate::protocol::{Message, Request};

/// Serialize a request envelope into a single text frame.
pub fn encode(request: &Request) -> Result<String, DapError> {
    serde_json::to_string(&Message::Request(request.clone()))
        .map_err(|e| DapError::Serialization(e.to_string()))
}

/// Parse one text frame.
///
/// Fails for invalid JSON, a missing or unknown `type` discriminator, or a
/// shape that lacks the variant's required fields.
pub fn decode(text: &str) -> Result<Message, DecodeError> {
    Ok(serde_json::from_str(text)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codec_round_trip_request() {
        let req = Request {
            seq: 9,
            command: "evaluate".into(),
            arguments: Some(serde_json::json!({"expression": "a + b", "frameId": 3})),
        };
        let text = encode(&req).unwrap();
        assert!(!text.contains('\n'));
        match decode(&text).unwrap() {
            Message::Request(decoded) => {
                assert_eq!(decoded.seq, req.seq);
                assert_eq!(decoded.command, req.command);
                assert_eq!(decoded.arguments, req.arguments);
            }
            other => panic!("expected request, got {other:?}"),
        }
    }

    #[test]
    fn codec_decodes_event() {
        let msg = decode(
            r#"{"seq":3,"type":"event","event":"stopped","body":{"reason":"step","threadId":1}}"#,
        )
        .unwrap();
        assert_eq!(msg.seq(), 3);
        assert!(matches!(msg, Message::Event(ref e) if e.event == "stopped"));
    }

    #[test]
    fn codec_rejects_invalid_json() {
        let err = decode("{not json").unwrap_err();
        assert!(matches!(err, DecodeError::Json(_)));
    }

    #[test]
    fn codec_rejects_unknown_type() {
        assert!(decode(r#"{"seq":1,"type":"notification","method":"x"}"#).is_err());
    }

    #[test]
    fn codec_rejects_missing_type() {
        assert!(decode(r#"{"seq":1,"command":"threads"}"#).is_err());
    }

    #[test]
    fn codec_rejects_response_without_request_seq() {
        assert!(decode(r#"{"seq":1,"type":"response","success":true,"command":"x"}"#).is_err());
    }
}
