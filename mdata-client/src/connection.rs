//! Line-oriented I/O over a transport.

use crate::error::ClientError;
use crate::transport::Transport;
use bytes::Bytes;
use mdata_protocol::LineDecoder;
use tokio::io::{AsyncReadExt, AsyncWriteExt};

/// Default read buffer size (4 KiB).
pub const DEFAULT_READ_BUFFER_SIZE: usize = 4 * 1024;

/// A transport plus the buffered state needed to read whole lines from it.
///
/// Owns the transport exclusively. Bytes received past the end of a line are
/// kept for the next read.
pub struct Connection<T> {
    transport: T,
    decoder: LineDecoder,
    read_buffer_size: usize,
}

impl<T: Transport> Connection<T> {
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            decoder: LineDecoder::new(),
            read_buffer_size: DEFAULT_READ_BUFFER_SIZE,
        }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    /// Writes `data` and flushes it onto the wire.
    pub async fn send(&mut self, data: &[u8]) -> Result<(), ClientError> {
        self.transport.write_all(data).await?;
        self.transport.flush().await?;
        tracing::trace!("Sent {} bytes", data.len());
        Ok(())
    }

    /// Reads one line, honouring the transport's read timeout.
    ///
    /// The line normally ends with `\n`. If the peer closes the stream after
    /// a partial line, that partial line is returned as-is; if nothing at all
    /// was buffered, the result is `ConnectionClosed`.
    pub async fn read_line(&mut self) -> Result<Bytes, ClientError> {
        match self.transport.read_timeout() {
            Some(limit) => tokio::time::timeout(limit, self.fill_line())
                .await
                .map_err(|_| {
                    tracing::debug!("Read timeout after {:?}", limit);
                    ClientError::Timeout
                })?,
            None => self.fill_line().await,
        }
    }

    async fn fill_line(&mut self) -> Result<Bytes, ClientError> {
        let mut buf = vec![0u8; self.read_buffer_size];

        loop {
            if let Some(line) = self
                .decoder
                .decode_line()
                .map_err(ClientError::MalformedResponse)?
            {
                return Ok(line);
            }

            let n = self.transport.read(&mut buf).await?;
            tracing::trace!("Read {} bytes from transport", n);

            if n == 0 {
                tracing::debug!("Connection closed by peer");
                return self
                    .decoder
                    .take_remaining()
                    .ok_or(ClientError::ConnectionClosed);
            }

            self.decoder.extend(&buf[..n]);
        }
    }

    /// Closes the transport.
    pub async fn close(mut self) -> Result<(), ClientError> {
        tracing::debug!("Closing connection...");
        self.transport.shutdown().await?;
        tracing::debug!("Connection closed");
        Ok(())
    }
}
