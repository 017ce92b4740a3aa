//! # mdata-protocol
//!
//! Wire protocol implementation for the Version 2 metadata protocol.
//!
//! This crate provides:
//! - Line framing with a CRC-32 checked, base64-armoured body
//! - Version negotiation literals
//! - Request command codes and the success status
//! - A line decoder for reassembling newline-terminated responses

pub mod codec;
pub mod error;
pub mod frame;
pub mod message;

pub use codec::LineDecoder;
pub use error::ProtocolError;
pub use frame::{body_checksum, Frame, REQUEST_ID_LEN};
pub use message::{Command, NOT_FOUND, SUCCESS};

/// Prefix carried by every V2 frame, including the trailing space.
pub const PROTOCOL_PREFIX: &str = "V2 ";

/// Negotiation request sent once before any frame.
pub const NEGOTIATE_REQUEST: &[u8] = b"NEGOTIATE V2\n";

/// The only negotiation reply that confirms V2 support.
pub const NEGOTIATE_OK: &[u8] = b"V2_OK\n";

/// Key prefix reserved for read-only host metadata.
pub const RESERVED_PREFIX: &str = "sdc:";

/// Maximum accepted length of a single response line (1 MiB).
pub const MAX_LINE_LENGTH: usize = 1024 * 1024;
