//! Content decoding for fetched messages.
//!
//! The [`ContentDecoder`] turns a [`RawMessage`] into [`ScannableText`] using
//! the configured [`ScanStrategy`]:
//!
//! - `Subject` uses the envelope subject as-is.
//! - `Body` locates the base64 transfer-encoded part of the body literal,
//!   strips line folding and decodes it.
//!
//! Decode failures are local to one message; the poll cycle skips the message
//! and carries on.

use base64::{engine::general_purpose::STANDARD, Engine};
use mailparse::MailHeaderMap;

use crate::domain::{RawMessage, ScanStrategy, ScannableText, SeqNum};

/// Transfer-encoding marker searched for in the body.
const TRANSFER_MARKER: &str = "base64";

/// Errors that can occur while decoding a message.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    /// The message was fetched without an envelope subject.
    #[error("message {0} has no envelope subject")]
    MissingSubject(SeqNum),

    /// The message was fetched without a body literal.
    #[error("message {0} has no body literal")]
    MissingBody(SeqNum),

    /// The header block could not be parsed.
    #[error("malformed message headers: {0}")]
    Headers(String),

    /// No transfer-encoding marker in the body.
    #[error("no transfer-encoding marker found")]
    MissingMarker,

    /// The encoded payload is not followed by a boundary or blank line.
    #[error("no terminating boundary after encoded payload")]
    MissingTerminator,

    /// The marker was found but no payload follows it.
    #[error("encoded payload is empty")]
    EmptyPayload,

    /// The payload is not valid base64.
    #[error("invalid base64 payload: {0}")]
    Base64(#[from] base64::DecodeError),
}

/// Decodes messages into scannable text under one scan strategy.
#[derive(Debug, Clone, Copy, Default)]
pub struct ContentDecoder {
    strategy: ScanStrategy,
}

impl ContentDecoder {
    pub fn new(strategy: ScanStrategy) -> Self {
        Self { strategy }
    }

    pub fn strategy(&self) -> ScanStrategy {
        self.strategy
    }

    /// Produces the scannable text of `message`.
    pub fn decode(&self, message: &RawMessage) -> Result<ScannableText, DecodeError> {
        match self.strategy {
            ScanStrategy::Subject => message
                .subject
                .clone()
                .map(ScannableText::from)
                .ok_or(DecodeError::MissingSubject(message.seq)),
            ScanStrategy::Body => {
                let literal = message
                    .body
                    .as_deref()
                    .ok_or(DecodeError::MissingBody(message.seq))?;
                let bytes = decode_body(literal)?;
                Ok(ScannableText::from(
                    String::from_utf8_lossy(&bytes).into_owned(),
                ))
            }
        }
    }
}

/// Decodes the base64 payload of an RFC 5322 message literal.
///
/// If the top-level headers declare a base64 transfer encoding the whole body
/// is the payload. Otherwise the payload is the first part whose headers carry
/// the marker, up to the next boundary or blank line.
pub fn decode_body(literal: &[u8]) -> Result<Vec<u8>, DecodeError> {
    let (headers, offset) =
        mailparse::parse_headers(literal).map_err(|e| DecodeError::Headers(e.to_string()))?;
    let body = String::from_utf8_lossy(&literal[offset..]);

    let top_level_base64 = headers
        .get_first_value("Content-Transfer-Encoding")
        .is_some_and(|v| v.trim().eq_ignore_ascii_case(TRANSFER_MARKER));

    let encoded = if top_level_base64 {
        collect_payload(body.split('\n'), true)?
    } else {
        let lowered = body.to_ascii_lowercase();
        let marker = lowered
            .find(TRANSFER_MARKER)
            .ok_or(DecodeError::MissingMarker)?;
        let mut lines = body[marker + TRANSFER_MARKER.len()..].split('\n');
        // rest of the marker line, then any remaining part headers
        lines.next();
        if !lines.by_ref().any(|line| line.trim().is_empty()) {
            return Err(DecodeError::EmptyPayload);
        }
        collect_payload(lines, false)?
    };

    Ok(STANDARD.decode(encoded)?)
}

/// Joins payload lines up to the terminator, dropping line folding.
fn collect_payload<'a>(
    lines: impl Iterator<Item = &'a str>,
    end_terminates: bool,
) -> Result<String, DecodeError> {
    let mut encoded = String::new();
    let mut terminated = end_terminates;
    for line in lines {
        let line = line.trim_end_matches('\r');
        if line.trim().is_empty() || line.starts_with("--") {
            terminated = true;
            break;
        }
        encoded.push_str(line.trim());
    }

    if encoded.is_empty() {
        return Err(DecodeError::EmptyPayload);
    }
    if !terminated {
        return Err(DecodeError::MissingTerminator);
    }
    Ok(encoded)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    /// Wraps `payload` in a multipart message the way the booking service does.
    fn multipart(payload: &[u8]) -> Vec<u8> {
        let encoded = STANDARD.encode(payload);
        let folded: Vec<&str> = encoded
            .as_bytes()
            .chunks(76)
            .map(|c| std::str::from_utf8(c).unwrap())
            .collect();
        format!(
            "From: reservations@example.com\r\n\
             Subject: Your reservation\r\n\
             MIME-Version: 1.0\r\n\
             Content-Type: multipart/alternative; boundary=\"b1\"\r\n\
             \r\n\
             --b1\r\n\
             Content-Type: text/plain; charset=utf-8\r\n\
             Content-Transfer-Encoding: base64\r\n\
             \r\n\
             {}\r\n\
             --b1--\r\n",
            folded.join("\r\n")
        )
        .into_bytes()
    }

    #[test]
    fn subject_strategy_uses_subject() {
        let decoder = ContentDecoder::new(ScanStrategy::Subject);
        let message = RawMessage::new(1).with_subject("Check in now");
        assert_eq!(decoder.decode(&message).unwrap().as_str(), "Check in now");
    }

    #[test]
    fn subject_strategy_without_subject_fails() {
        let decoder = ContentDecoder::new(ScanStrategy::Subject);
        let message = RawMessage::new(4).with_body(b"Subject: x\r\n\r\nbody".to_vec());
        assert_eq!(
            decoder.decode(&message),
            Err(DecodeError::MissingSubject(4))
        );
    }

    #[test]
    fn body_strategy_decodes_multipart_payload() {
        let decoder = ContentDecoder::new(ScanStrategy::Body);
        let message = RawMessage::new(2).with_body(multipart(b"Hello, please check in."));
        assert_eq!(
            decoder.decode(&message).unwrap().as_str(),
            "Hello, please check in."
        );
    }

    #[test]
    fn body_strategy_without_body_fails() {
        let decoder = ContentDecoder::new(ScanStrategy::Body);
        let message = RawMessage::new(3).with_subject("only subject");
        assert_eq!(decoder.decode(&message), Err(DecodeError::MissingBody(3)));
    }

    #[test]
    fn missing_marker_is_reported() {
        let literal = b"Subject: plain\r\nContent-Type: text/plain\r\n\r\nJust text.\r\n";
        assert_eq!(decode_body(literal), Err(DecodeError::MissingMarker));
    }

    #[test]
    fn missing_terminator_is_reported() {
        let literal = b"Subject: x\r\n\r\n--b\r\nContent-Transfer-Encoding: base64\r\n\r\naGVsbG8=";
        assert_eq!(decode_body(literal), Err(DecodeError::MissingTerminator));
    }

    #[test]
    fn marker_without_payload_is_empty() {
        let literal = b"Subject: x\r\n\r\n--b\r\nContent-Transfer-Encoding: base64\r\n";
        assert_eq!(decode_body(literal), Err(DecodeError::EmptyPayload));
    }

    #[test]
    fn invalid_base64_is_reported() {
        let literal =
            b"Subject: x\r\n\r\n--b\r\nContent-Transfer-Encoding: base64\r\n\r\n!!!not base64!!!\r\n--b--\r\n";
        assert!(matches!(decode_body(literal), Err(DecodeError::Base64(_))));
    }

    #[test]
    fn marker_is_matched_case_insensitively() {
        let literal =
            b"Subject: x\r\n\r\n--b\r\nContent-Transfer-Encoding: BASE64\r\n\r\naGVsbG8=\r\n--b--\r\n";
        assert_eq!(decode_body(literal).unwrap(), b"hello");
    }

    #[test]
    fn single_part_base64_message() {
        let literal =
            b"Subject: x\r\nContent-Transfer-Encoding: base64\r\n\r\naGVs\r\nbG8=";
        assert_eq!(decode_body(literal).unwrap(), b"hello");
    }

    #[test]
    fn extra_part_headers_are_skipped() {
        let literal = b"Subject: x\r\n\r\n--b\r\nContent-Transfer-Encoding: base64\r\nContent-Disposition: inline\r\n\r\naGVsbG8=\r\n--b--\r\n";
        assert_eq!(decode_body(literal).unwrap(), b"hello");
    }

    #[test]
    fn invalid_utf8_is_decoded_lossily() {
        let decoder = ContentDecoder::new(ScanStrategy::Body);
        let message = RawMessage::new(1).with_body(multipart(&[0x68, 0x69, 0xff]));
        assert_eq!(decoder.decode(&message).unwrap().as_str(), "hi\u{fffd}");
    }

    proptest! {
        #[test]
        fn body_round_trip(payload in prop::collection::vec(any::<u8>(), 1..2048)) {
            let literal = multipart(&payload);
            prop_assert_eq!(decode_body(&literal).unwrap(), payload);
        }
    }
}
