//! In-memory transports for tests.

use crate::transport::Transport;
use mdata_protocol::Frame;
use parking_lot::Mutex;
use std::io::{self, Cursor};
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};
use tokio_test::io::Mock;

/// What a scripted transport observed.
#[derive(Debug, Default)]
pub(crate) struct TransportLog {
    pub written: Vec<u8>,
    pub flushes: usize,
    pub closed: bool,
}

/// Replays a fixed byte script and records everything written to it.
pub(crate) struct ScriptedTransport {
    input: Cursor<Vec<u8>>,
    /// Once the script is drained, reads pend instead of hitting EOF.
    stall: bool,
    read_timeout: Option<Duration>,
    log: Arc<Mutex<TransportLog>>,
}

impl ScriptedTransport {
    pub fn new(script: impl Into<Vec<u8>>) -> (Self, Arc<Mutex<TransportLog>>) {
        let log = Arc::new(Mutex::new(TransportLog::default()));
        let transport = Self {
            input: Cursor::new(script.into()),
            stall: false,
            read_timeout: None,
            log: log.clone(),
        };
        (transport, log)
    }

    pub fn stalling(script: impl Into<Vec<u8>>) -> (Self, Arc<Mutex<TransportLog>>) {
        let (mut transport, log) = Self::new(script);
        transport.stall = true;
        (transport, log)
    }

    fn drained(&self) -> bool {
        self.input.position() as usize >= self.input.get_ref().len()
    }
}

impl AsyncRead for ScriptedTransport {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let this = self.get_mut();
        if this.log.lock().closed {
            return Poll::Ready(Err(io::ErrorKind::NotConnected.into()));
        }
        if this.stall && this.drained() {
            return Poll::Pending;
        }
        Pin::new(&mut this.input).poll_read(cx, buf)
    }
}

impl AsyncWrite for ScriptedTransport {
    fn poll_write(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        let mut log = self.log.lock();
        if log.closed {
            return Poll::Ready(Err(io::ErrorKind::BrokenPipe.into()));
        }
        log.written.extend_from_slice(buf);
        Poll::Ready(Ok(buf.len()))
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        self.log.lock().flushes += 1;
        Poll::Ready(Ok(()))
    }

    fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        self.log.lock().closed = true;
        Poll::Ready(Ok(()))
    }
}

impl Transport for ScriptedTransport {
    fn set_read_timeout(&mut self, timeout: Option<Duration>) -> io::Result<()> {
        self.read_timeout = timeout;
        Ok(())
    }

    fn read_timeout(&self) -> Option<Duration> {
        self.read_timeout
    }
}

impl Transport for Mock {
    fn set_read_timeout(&mut self, _timeout: Option<Duration>) -> io::Result<()> {
        Ok(())
    }

    fn read_timeout(&self) -> Option<Duration> {
        None
    }
}

/// Encodes a response line as the metadata host would send it.
pub(crate) fn response(code: &str, payload: &str) -> String {
    Frame::new(code, payload.to_string()).unwrap().encode()
}

/// Splits everything written after the negotiation line into decoded frames.
pub(crate) fn sent_frames(log: &TransportLog) -> Vec<Frame> {
    log.written
        .split_inclusive(|&b| b == b'\n')
        .skip(1)
        .map(|line| Frame::decode(line).unwrap())
        .collect()
}
