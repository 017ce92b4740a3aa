//! Client error types.

use mdata_protocol::{Command, ProtocolError, NOT_FOUND};
use thiserror::Error;

/// Client errors.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to connect to {target}: {source}")]
    Connect {
        target: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to open serial port {port}: {source}")]
    Serial {
        port: String,
        #[source]
        source: tokio_serial::Error,
    },

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("read timed out")]
    Timeout,

    #[error("connection closed")]
    ConnectionClosed,

    #[error("protocol negotiation failed: {0}")]
    Negotiation(#[source] Box<ClientError>),

    #[error("server does not support Version 2 protocol")]
    UnsupportedProtocol,

    #[error("failed to create frame: {0}")]
    Frame(#[source] ProtocolError),

    #[error("failed to parse response: {0}")]
    MalformedResponse(#[source] ProtocolError),

    #[error("{op} request failed with code: {code}")]
    Request { op: Command, code: String },

    #[error("cannot update key {key:?} in the read-only sdc: namespace")]
    ReservedKey { key: String },
}

impl ClientError {
    /// Returns the response code if the host rejected the request.
    pub fn code(&self) -> Option<&str> {
        match self {
            ClientError::Request { code, .. } => Some(code),
            _ => None,
        }
    }

    /// Returns whether the host reported that the key does not exist.
    pub fn is_not_found(&self) -> bool {
        self.code() == Some(NOT_FOUND)
    }

    /// Returns whether this error came from the byte stream itself.
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            ClientError::Io(_)
                | ClientError::Connect { .. }
                | ClientError::Serial { .. }
                | ClientError::Timeout
                | ClientError::ConnectionClosed
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_classification() {
        let err = ClientError::Request {
            op: Command::Get,
            code: "NOTFOUND".to_string(),
        };
        assert!(err.is_not_found());
        assert_eq!(err.code(), Some("NOTFOUND"));
        assert!(!err.is_transport());
        assert_eq!(err.to_string(), "GET request failed with code: NOTFOUND");

        let err = ClientError::Request {
            op: Command::Put,
            code: "FAILURE".to_string(),
        };
        assert!(!err.is_not_found());
        assert_eq!(err.code(), Some("FAILURE"));
    }

    #[test]
    fn test_transport_classification() {
        assert!(ClientError::Timeout.is_transport());
        assert!(ClientError::ConnectionClosed.is_transport());
        assert!(ClientError::Io(std::io::Error::other("boom")).is_transport());

        assert!(!ClientError::UnsupportedProtocol.is_transport());
        assert!(!ClientError::MalformedResponse(ProtocolError::InvalidPrefix).is_transport());
        assert!(!ClientError::ReservedKey {
            key: "sdc:uuid".into()
        }
        .is_transport());
        assert_eq!(ClientError::Timeout.code(), None);
    }

    #[test]
    fn test_negotiation_wraps_cause() {
        let err = ClientError::Negotiation(Box::new(ClientError::ConnectionClosed));
        assert!(err.to_string().contains("connection closed"));
        assert!(!err.is_not_found());
    }
}
