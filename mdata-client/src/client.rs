//! High-level client API.

use crate::config::ClientConfig;
use crate::connection::Connection;
use crate::error::ClientError;
use crate::negotiate::negotiate;
use crate::stream::ClientStream;
use crate::transport::Transport;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use bytes::Bytes;
use mdata_protocol::{Command, Frame, RESERVED_PREFIX, SUCCESS};
use std::time::Duration;

/// Client for the V2 metadata protocol.
///
/// Each operation performs exactly one request/response round trip and takes
/// `&mut self`, so a client never has more than one request outstanding. The
/// request ID of a response is not matched against the request; correctness
/// relies on that strict in-order use.
pub struct Client<T = ClientStream> {
    conn: Connection<T>,
}

impl Client<ClientStream> {
    /// Opens the configured transport and negotiates V2.
    pub async fn connect(config: &ClientConfig) -> Result<Self, ClientError> {
        let stream = ClientStream::open(&config.transport).await?;
        Self::handshake(stream).await
    }
}

impl<T: Transport> Client<T> {
    /// Negotiates V2 over an already open transport.
    ///
    /// On any negotiation failure the transport is closed before returning.
    pub async fn handshake(transport: T) -> Result<Self, ClientError> {
        let mut conn = Connection::new(transport);

        match negotiate(&mut conn).await {
            Ok(true) => {
                tracing::debug!("Handshake complete");
                Ok(Self { conn })
            }
            Ok(false) => {
                tracing::debug!("Peer rejected V2 negotiation");
                let _ = conn.close().await;
                Err(ClientError::UnsupportedProtocol)
            }
            Err(e) => {
                tracing::debug!("Negotiation failed: {}", e);
                let _ = conn.close().await;
                Err(ClientError::Negotiation(Box::new(e)))
            }
        }
    }

    /// Returns the underlying connection.
    pub fn connection(&self) -> &Connection<T> {
        &self.conn
    }

    /// Adjusts the transport read timeout for subsequent requests.
    pub fn set_read_timeout(&mut self, timeout: Option<Duration>) -> Result<(), ClientError> {
        self.conn.transport_mut().set_read_timeout(timeout)?;
        Ok(())
    }

    // =========================================================================
    // Helper methods
    // =========================================================================

    async fn request(&mut self, op: Command, payload: Bytes) -> Result<Bytes, ClientError> {
        let frame = Frame::new(op.as_str(), payload).map_err(ClientError::Frame)?;
        tracing::debug!("Sending request id={} op={}", frame.request_id(), op);

        self.conn.send(frame.encode().as_bytes()).await?;

        let line = self.conn.read_line().await?;
        if !line.ends_with(b"\n") {
            tracing::debug!("Response truncated by peer hangup");
            return Err(ClientError::ConnectionClosed);
        }

        let response = Frame::decode(&line).map_err(ClientError::MalformedResponse)?;
        tracing::debug!(
            "Request id={} got response id={} code={}",
            frame.request_id(),
            response.request_id(),
            response.code()
        );

        if response.code() != SUCCESS {
            return Err(ClientError::Request {
                op,
                code: response.code().to_string(),
            });
        }

        Ok(response.payload().clone())
    }

    // =========================================================================
    // Metadata operations
    // =========================================================================

    /// Gets the value of a key.
    ///
    /// The value is returned exactly as the host sent it; it need not be UTF-8.
    pub async fn get(&mut self, key: &str) -> Result<Bytes, ClientError> {
        self.request(Command::Get, text_payload(key)).await
    }

    /// Lists keys. The listing format is owned by the host.
    pub async fn keys(&mut self) -> Result<Bytes, ClientError> {
        self.request(Command::Keys, Bytes::new()).await
    }

    /// Deletes a key.
    pub async fn delete(&mut self, key: &str) -> Result<(), ClientError> {
        self.request(Command::Delete, text_payload(key)).await?;
        Ok(())
    }

    /// Sets a key. Keys in the reserved `sdc:` namespace are rejected without
    /// contacting the host.
    pub async fn put(&mut self, key: &str, value: &str) -> Result<(), ClientError> {
        if key.starts_with(RESERVED_PREFIX) {
            return Err(ClientError::ReservedKey {
                key: key.to_string(),
            });
        }

        // Key and value are armoured separately so the host can split on the space.
        let payload = format!("{} {}", STANDARD.encode(key), STANDARD.encode(value));
        self.request(Command::Put, Bytes::from(payload)).await?;
        Ok(())
    }

    /// Closes the connection.
    pub async fn close(self) -> Result<(), ClientError> {
        self.conn.close().await
    }
}

fn text_payload(text: &str) -> Bytes {
    Bytes::copy_from_slice(text.as_bytes())
}
