//! Concrete transports: serial line, TCP socket and Unix domain socket.

use crate::config::{SerialConfig, SocketConfig, TransportConfig};
use crate::error::ClientError;
use crate::transport::Transport;
use std::future::Future;
use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};
use tokio::net::TcpStream;
#[cfg(unix)]
use tokio::net::UnixStream;
use tokio_serial::{DataBits, Parity, SerialPortBuilderExt, SerialStream, StopBits};

enum StreamKind {
    Serial(SerialStream),
    Tcp(TcpStream),
    #[cfg(unix)]
    Unix(UnixStream),
}

/// A client stream over one of the supported transports.
pub struct ClientStream {
    kind: StreamKind,
    read_timeout: Option<Duration>,
}

impl ClientStream {
    /// Opens the transport described by `config`.
    pub async fn open(config: &TransportConfig) -> Result<Self, ClientError> {
        tracing::debug!("Opening {}", config);
        match config {
            TransportConfig::Serial(serial) => Self::open_serial(serial),
            TransportConfig::Tcp(socket) => Self::dial_tcp(socket).await,
            TransportConfig::Unix(socket) => Self::dial_unix(socket).await,
        }
    }

    fn open_serial(config: &SerialConfig) -> Result<Self, ClientError> {
        if config.port.is_empty() {
            return Err(ClientError::Config(
                "serial port not specified in config".to_string(),
            ));
        }

        let stream = tokio_serial::new(config.port.as_str(), config.baud_rate)
            .data_bits(DataBits::Eight)
            .parity(Parity::None)
            .stop_bits(StopBits::One)
            .timeout(config.read_timeout)
            .open_native_async()
            .map_err(|source| ClientError::Serial {
                port: config.port.clone(),
                source,
            })?;

        Ok(Self {
            kind: StreamKind::Serial(stream),
            read_timeout: non_zero(Some(config.read_timeout)),
        })
    }

    async fn dial_tcp(config: &SocketConfig) -> Result<Self, ClientError> {
        let stream = dial_within(config.timeout, TcpStream::connect(&config.address))
            .await?
            .map_err(|source| ClientError::Connect {
                target: format!("tcp {}", config.address),
                source,
            })?;

        stream.set_nodelay(true).ok();

        Ok(Self {
            kind: StreamKind::Tcp(stream),
            read_timeout: non_zero(Some(config.timeout)),
        })
    }

    #[cfg(unix)]
    async fn dial_unix(config: &SocketConfig) -> Result<Self, ClientError> {
        let stream = dial_within(config.timeout, UnixStream::connect(&config.address))
            .await?
            .map_err(|source| ClientError::Connect {
                target: format!("unix {}", config.address),
                source,
            })?;

        Ok(Self {
            kind: StreamKind::Unix(stream),
            read_timeout: non_zero(Some(config.timeout)),
        })
    }

    #[cfg(not(unix))]
    async fn dial_unix(_config: &SocketConfig) -> Result<Self, ClientError> {
        Err(ClientError::Config(
            "unix sockets are not supported on this platform".to_string(),
        ))
    }

    /// Returns the transport name.
    pub fn kind(&self) -> &'static str {
        match self.kind {
            StreamKind::Serial(_) => "serial",
            StreamKind::Tcp(_) => "tcp",
            #[cfg(unix)]
            StreamKind::Unix(_) => "unix",
        }
    }
}

/// Awaits a dial under `limit`. A zero limit waits indefinitely.
async fn dial_within<S>(
    limit: Duration,
    dial: impl Future<Output = io::Result<S>>,
) -> Result<io::Result<S>, ClientError> {
    if limit.is_zero() {
        return Ok(dial.await);
    }
    tokio::time::timeout(limit, dial).await.map_err(|_| {
        tracing::debug!("Connection timeout");
        ClientError::Timeout
    })
}

/// A zero timeout means "no deadline".
fn non_zero(timeout: Option<Duration>) -> Option<Duration> {
    timeout.filter(|t| !t.is_zero())
}

impl Transport for ClientStream {
    fn set_read_timeout(&mut self, timeout: Option<Duration>) -> io::Result<()> {
        match self.kind {
            // Fixed when the port was opened.
            StreamKind::Serial(_) => Ok(()),
            _ => {
                self.read_timeout = non_zero(timeout);
                Ok(())
            }
        }
    }

    fn read_timeout(&self) -> Option<Duration> {
        self.read_timeout
    }
}

impl AsyncRead for ClientStream {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        match &mut self.get_mut().kind {
            StreamKind::Serial(stream) => Pin::new(stream).poll_read(cx, buf),
            StreamKind::Tcp(stream) => Pin::new(stream).poll_read(cx, buf),
            #[cfg(unix)]
            StreamKind::Unix(stream) => Pin::new(stream).poll_read(cx, buf),
        }
    }
}

impl AsyncWrite for ClientStream {
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        match &mut self.get_mut().kind {
            StreamKind::Serial(stream) => Pin::new(stream).poll_write(cx, buf),
            StreamKind::Tcp(stream) => Pin::new(stream).poll_write(cx, buf),
            #[cfg(unix)]
            StreamKind::Unix(stream) => Pin::new(stream).poll_write(cx, buf),
        }
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        match &mut self.get_mut().kind {
            StreamKind::Serial(stream) => Pin::new(stream).poll_flush(cx),
            StreamKind::Tcp(stream) => Pin::new(stream).poll_flush(cx),
            #[cfg(unix)]
            StreamKind::Unix(stream) => Pin::new(stream).poll_flush(cx),
        }
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        match &mut self.get_mut().kind {
            StreamKind::Serial(stream) => Pin::new(stream).poll_shutdown(cx),
            StreamKind::Tcp(stream) => Pin::new(stream).poll_shutdown(cx),
            #[cfg(unix)]
            StreamKind::Unix(stream) => Pin::new(stream).poll_shutdown(cx),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    #[tokio::test]
    async fn test_tcp_stream_roundtrip() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let server = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 13];
            socket.read_exact(&mut buf).await.unwrap();
            assert_eq!(&buf, b"NEGOTIATE V2\n");
            socket.write_all(b"V2_OK\n").await.unwrap();
        });

        let config = TransportConfig::Tcp(SocketConfig::new(addr.to_string()));
        let mut stream = ClientStream::open(&config).await.unwrap();
        assert_eq!(stream.kind(), "tcp");
        assert_eq!(stream.read_timeout(), Some(Duration::from_secs(5)));

        stream.write_all(b"NEGOTIATE V2\n").await.unwrap();
        let mut buf = [0u8; 6];
        stream.read_exact(&mut buf).await.unwrap();
        assert_eq!(&buf, b"V2_OK\n");

        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_socket_read_timeout_adjustable() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let accept = tokio::spawn(async move { listener.accept().await.unwrap() });

        let config = TransportConfig::Tcp(SocketConfig::new(addr.to_string()));
        let mut stream = ClientStream::open(&config).await.unwrap();

        stream.set_read_timeout(Some(Duration::from_millis(250))).unwrap();
        assert_eq!(stream.read_timeout(), Some(Duration::from_millis(250)));

        stream.set_read_timeout(Some(Duration::ZERO)).unwrap();
        assert_eq!(stream.read_timeout(), None);

        drop(accept.await.unwrap());
    }

    #[tokio::test]
    async fn test_zero_timeout_dials_without_deadline() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let accept = tokio::spawn(async move { listener.accept().await.unwrap() });

        let config =
            TransportConfig::Tcp(SocketConfig::new(addr.to_string()).with_timeout(Duration::ZERO));
        let stream = ClientStream::open(&config).await.unwrap();
        assert_eq!(stream.read_timeout(), None);

        drop(accept.await.unwrap());
    }

    #[tokio::test]
    async fn test_tcp_connect_refused() {
        // Bind then drop to get a port nobody listens on.
        let addr = TcpListener::bind("127.0.0.1:0")
            .await
            .unwrap()
            .local_addr()
            .unwrap();

        let config = TransportConfig::Tcp(SocketConfig::new(addr.to_string()));
        let result = ClientStream::open(&config).await;
        assert!(matches!(result, Err(ClientError::Connect { .. })));
    }

    #[tokio::test]
    async fn test_serial_requires_port() {
        let config = TransportConfig::Serial(SerialConfig::new(""));
        let result = ClientStream::open(&config).await;
        assert!(matches!(result, Err(ClientError::Config(_))));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_unix_missing_socket() {
        let config = TransportConfig::Unix(SocketConfig::new("/nonexistent/mdata/metadata.sock"));
        let result = ClientStream::open(&config).await;
        assert!(matches!(result, Err(ClientError::Connect { .. })));
    }
}
