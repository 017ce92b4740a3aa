//! Byte-stream contract consumed by the protocol client.

use std::io;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite};

/// A byte stream to the metadata host.
///
/// Reads, writes and close (`shutdown`) come from the async I/O traits. The
/// read timeout is owned by the transport and applied by the client to every
/// blocking line read.
pub trait Transport: AsyncRead + AsyncWrite + Unpin + Send {
    /// Sets the read timeout. `None` waits indefinitely.
    ///
    /// Transports whose timeout is fixed when opened accept the call and
    /// keep their original timeout.
    fn set_read_timeout(&mut self, timeout: Option<Duration>) -> io::Result<()>;

    /// Returns the timeout applied to each read.
    fn read_timeout(&self) -> Option<Duration>;
}
