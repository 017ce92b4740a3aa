//! Line frame format for the V2 metadata protocol.
//!
//! Frame layout (single line, space separated):
//!
//! ```text
//! V2 <body_length> <body_checksum> <request_id> <code>[ <base64 payload>]\n
//!    |             |               |<------------- body ---------------->|
//!    |             +-- CRC-32 (IEEE) of body, 8 lowercase hex digits
//!    +-- length of body in bytes
//! ```
//!
//! The body excludes the length and checksum fields. The payload field is
//! omitted when the payload is empty.

use crate::error::ProtocolError;
use crate::PROTOCOL_PREFIX;
use base64::alphabet;
use base64::engine::general_purpose::{GeneralPurpose, GeneralPurposeConfig, STANDARD};
use base64::Engine;
use bytes::Bytes;
use rand::rngs::OsRng;
use rand::RngCore;

/// Length of a request ID in hex characters.
pub const REQUEST_ID_LEN: usize = 8;

/// Length of the checksum field in hex characters.
const CHECKSUM_LEN: usize = 8;

/// Payload decoder that tolerates non-zero trailing bits, leaving corruption
/// of the final symbol to the checksum.
const LENIENT: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new().with_decode_allow_trailing_bits(true),
);

/// Computes the wire checksum of a body string.
pub fn body_checksum(body: &str) -> String {
    format!("{:08x}", crc32fast::hash(body.as_bytes()))
}

/// A V2 protocol frame.
///
/// Length and checksum are derived from the other fields and are recomputed
/// whenever the code or payload changes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    request_id: String,
    code: String,
    /// Raw payload bytes (not base64 encoded).
    payload: Bytes,
    body_length: usize,
    body_checksum: String,
}

impl Frame {
    /// Creates a new frame with a fresh random request ID.
    ///
    /// The code is upper-cased. Fails only if the OS random source is
    /// unavailable.
    pub fn new(code: &str, payload: impl Into<Bytes>) -> Result<Self, ProtocolError> {
        let mut id = [0u8; REQUEST_ID_LEN / 2];
        OsRng.try_fill_bytes(&mut id)?;
        Ok(Self::assemble(hex::encode(id), code, payload.into()))
    }

    /// Creates a frame with a caller-chosen request ID.
    pub fn with_request_id(
        request_id: impl Into<String>,
        code: &str,
        payload: impl Into<Bytes>,
    ) -> Result<Self, ProtocolError> {
        let request_id = request_id.into();
        if !is_valid_request_id(&request_id) {
            return Err(ProtocolError::InvalidRequestId(request_id));
        }
        Ok(Self::assemble(request_id, code, payload.into()))
    }

    fn assemble(request_id: String, code: &str, payload: Bytes) -> Self {
        let mut frame = Self {
            request_id,
            code: code.to_ascii_uppercase(),
            payload,
            body_length: 0,
            body_checksum: String::new(),
        };
        frame.update_metadata();
        frame
    }

    fn update_metadata(&mut self) {
        let body = self.body();
        self.body_length = body.len();
        self.body_checksum = body_checksum(&body);
    }

    pub fn request_id(&self) -> &str {
        &self.request_id
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn payload(&self) -> &Bytes {
        &self.payload
    }

    pub fn body_length(&self) -> usize {
        self.body_length
    }

    pub fn body_checksum(&self) -> &str {
        &self.body_checksum
    }

    /// Replaces the code, recomputing length and checksum.
    pub fn set_code(&mut self, code: &str) {
        self.code = code.to_ascii_uppercase();
        self.update_metadata();
    }

    /// Replaces the payload, recomputing length and checksum.
    pub fn set_payload(&mut self, payload: impl Into<Bytes>) {
        self.payload = payload.into();
        self.update_metadata();
    }

    /// Returns the canonical body string covered by the checksum.
    pub fn body(&self) -> String {
        let mut body = format!("{} {}", self.request_id, self.code);
        if !self.payload.is_empty() {
            body.push(' ');
            body.push_str(&STANDARD.encode(&self.payload));
        }
        body
    }

    /// Encodes the frame as a single newline-terminated wire line.
    pub fn encode(&self) -> String {
        format!(
            "{}{} {} {}\n",
            PROTOCOL_PREFIX,
            self.body_length,
            self.body_checksum,
            self.body()
        )
    }

    /// Decodes and validates one wire line.
    ///
    /// A single trailing newline is optional. The checksum and the declared
    /// body length are checked against the body as received, before any
    /// body field is interpreted.
    pub fn decode(line: &[u8]) -> Result<Self, ProtocolError> {
        let text = std::str::from_utf8(line).map_err(|_| ProtocolError::InvalidUtf8)?;
        let rest = text
            .strip_prefix(PROTOCOL_PREFIX)
            .ok_or(ProtocolError::InvalidPrefix)?;
        let rest = rest.strip_suffix('\n').unwrap_or(rest);

        let fields: Vec<&str> = rest.split_ascii_whitespace().collect();
        if fields.len() < 3 {
            return Err(ProtocolError::InvalidFormat(fields.len()));
        }

        let declared_length: usize =
            fields[0]
                .parse()
                .map_err(|source| ProtocolError::InvalidBodyLength {
                    value: fields[0].to_string(),
                    source,
                })?;

        let checksum = fields[1];
        if checksum.len() != CHECKSUM_LEN {
            return Err(ProtocolError::InvalidChecksumFormat(checksum.to_string()));
        }

        let body = &fields[2..];
        let received = body.join(" ");
        let actual = body_checksum(&received);
        if actual != checksum {
            return Err(ProtocolError::ChecksumMismatch {
                expected: checksum.to_string(),
                actual,
            });
        }
        if declared_length != received.len() {
            return Err(ProtocolError::LengthMismatch {
                declared: declared_length,
                actual: received.len(),
            });
        }

        if body.len() < 2 {
            return Err(ProtocolError::InvalidBody);
        }
        if let Some(extra) = body.get(3) {
            return Err(ProtocolError::UnexpectedField(extra.to_string()));
        }

        let payload = match body.get(2) {
            Some(encoded) => Bytes::from(LENIENT.decode(encoded)?),
            None => Bytes::new(),
        };

        Ok(Self {
            request_id: body[0].to_string(),
            code: body[1].to_string(),
            payload,
            body_length: declared_length,
            body_checksum: checksum.to_string(),
        })
    }
}

fn is_valid_request_id(id: &str) -> bool {
    id.len() == REQUEST_ID_LEN && id.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
}
