//! Content-Length based message framing for stream transports.
//!
//! Adapters reached over stdio or TCP wrap each JSON text frame in a
//! `Content-Length: N\r\n\r\n` header. Hosts with a message-oriented
//! channel do not need this module.

use crate::error::DecodeError;

const SEPARATOR: &[u8] = b"\r\n\r\n";

/// Largest body accepted from the wire (64 MiB).
pub const MAX_CONTENT_LENGTH: usize = 64 * 1024 * 1024;

/// Wrap a text frame with its Content-Length header.
pub fn encode_frame(text: &str) -> Vec<u8> {
    let header = format!("Content-Length: {}\r\n\r\n", text.len());
    let mut buf = Vec::with_capacity(header.len() + text.len());
    buf.extend_from_slice(header.as_bytes());
    buf.extend_from_slice(text.as_bytes());
    buf
}

/// Decode one framed message from the front of `data`.
///
/// Returns the body text and the number of bytes consumed. When `data`
/// does not yet hold a complete frame, returns [`DecodeError::Incomplete`]
/// and the caller should read more bytes. A complete frame whose body is
/// not UTF-8 yields [`DecodeError::Body`] with the frame's length, so the
/// caller can skip it. Header errors are [`DecodeError::Framing`].
pub fn decode_frame(data: &[u8]) -> Result<(String, usize), DecodeError> {
    let sep_pos = data
        .windows(SEPARATOR.len())
        .position(|w| w == SEPARATOR)
        .ok_or_else(|| DecodeError::Incomplete("missing header terminator".into()))?;

    let header = std::str::from_utf8(&data[..sep_pos])
        .map_err(|e| DecodeError::Framing(format!("header is not UTF-8: {e}")))?;
    let content_length = parse_content_length(header)?;
    if content_length > MAX_CONTENT_LENGTH {
        return Err(DecodeError::Framing(format!(
            "Content-Length {content_length} exceeds limit of {MAX_CONTENT_LENGTH}"
        )));
    }

    let body_start = sep_pos + SEPARATOR.len();
    let total = body_start.checked_add(content_length).ok_or_else(|| {
        DecodeError::Framing(format!("Content-Length {content_length} overflows"))
    })?;
    if data.len() < total {
        return Err(DecodeError::Incomplete(format!(
            "expected {content_length} body bytes, have {}",
            data.len() - body_start
        )));
    }

    match std::str::from_utf8(&data[body_start..total]) {
        Ok(body) => Ok((body.to_string(), total)),
        Err(e) => Err(DecodeError::Body {
            reason: format!("body is not UTF-8: {e}"),
            consumed: total,
        }),
    }
}

/// Parse the Content-Length value from the header section.
fn parse_content_length(header: &str) -> Result<usize, DecodeError> {
    for line in header.split("\r\n") {
        let line = line.trim();
        if let Some(value) = line.strip_prefix("Content-Length:") {
            let value = value.trim();
            return value.parse::<usize>().map_err(|e| {
                DecodeError::Framing(format!("invalid Content-Length value '{value}': {e}"))
            });
        }
    }
    Err(DecodeError::Framing("missing Content-Length header".into()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn framing_encode_then_decode() {
        let text = r#"{"seq":1,"type":"request","command":"threads"}"#;
        let encoded = encode_frame(text);
        assert!(encoded.starts_with(b"Content-Length: "));

        let (decoded, consumed) = decode_frame(&encoded).unwrap();
        assert_eq!(decoded, text);
        assert_eq!(consumed, encoded.len());
    }

    #[test]
    fn framing_counts_bytes_not_chars() {
        let text = r#"{"output":"héllo"}"#;
        let encoded = encode_frame(text);
        let header = format!("Content-Length: {}\r\n\r\n", text.len());
        assert!(encoded.starts_with(header.as_bytes()));
        let (decoded, _) = decode_frame(&encoded).unwrap();
        assert_eq!(decoded, text);
    }

    #[test]
    fn framing_missing_content_length() {
        let err = decode_frame(b"Bad-Header: 42\r\n\r\n{}").unwrap_err();
        assert!(matches!(err, DecodeError::Framing(_)));
        assert!(err.to_string().contains("missing Content-Length"), "got: {err}");
    }

    #[test]
    fn framing_incomplete_body() {
        let err = decode_frame(b"Content-Length: 100\r\n\r\n{\"short\":true}").unwrap_err();
        assert!(matches!(err, DecodeError::Incomplete(_)), "got: {err}");
    }

    #[test]
    fn framing_incomplete_header() {
        let err = decode_frame(b"Content-Length: 2\r\n{}").unwrap_err();
        assert!(matches!(err, DecodeError::Incomplete(_)), "got: {err}");
    }

    #[test]
    fn framing_back_to_back_messages() {
        let mut buf = encode_frame(r#"{"seq":1}"#);
        buf.extend_from_slice(&encode_frame(r#"{"seq":2}"#));

        let (first, consumed) = decode_frame(&buf).unwrap();
        assert_eq!(first, r#"{"seq":1}"#);
        let (second, rest) = decode_frame(&buf[consumed..]).unwrap();
        assert_eq!(second, r#"{"seq":2}"#);
        assert_eq!(consumed + rest, buf.len());
    }

    #[test]
    fn framing_rejects_overflowing_length() {
        let err = decode_frame(b"Content-Length: 18446744073709551615\r\n\r\n{}").unwrap_err();
        assert!(matches!(err, DecodeError::Framing(_)), "got: {err}");
    }

    #[test]
    fn framing_rejects_oversized_length() {
        let header = format!("Content-Length: {}\r\n\r\n{{}}", MAX_CONTENT_LENGTH + 1);
        let err = decode_frame(header.as_bytes()).unwrap_err();
        assert!(matches!(err, DecodeError::Framing(_)), "got: {err}");
        assert!(err.to_string().contains("exceeds limit"), "got: {err}");
    }

    #[test]
    fn framing_non_utf8_body_reports_frame_length() {
        let mut buf = b"Content-Length: 2\r\n\r\n\xff\xfe".to_vec();
        let bad_len = buf.len();
        buf.extend_from_slice(&encode_frame(r#"{"seq":2}"#));

        match decode_frame(&buf).unwrap_err() {
            DecodeError::Body { consumed, .. } => assert_eq!(consumed, bad_len),
            other => panic!("expected a body error, got {other}"),
        }
        let (next, _) = decode_frame(&buf[bad_len..]).unwrap();
        assert_eq!(next, r#"{"seq":2}"#);
    }
}
