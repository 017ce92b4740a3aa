//! Transport configuration and environment probing.
//!
//! Detection order:
//! 1. LX-branded zone socket (`/native/.zonecontrol/metadata.sock`)
//! 2. Native zone socket (`/.zonecontrol/metadata.sock`)
//! 3. Serial port for hardware-virtualized guests

use std::fmt;
use std::path::Path;
use std::time::Duration;

/// Metadata socket inside an LX-branded zone.
pub const LX_ZONE_SOCKET: &str = "/native/.zonecontrol/metadata.sock";

/// Metadata socket inside a native zone.
pub const ZONE_SOCKET: &str = "/.zonecontrol/metadata.sock";

/// Default dial and read timeout for socket transports.
pub const DEFAULT_SOCKET_TIMEOUT: Duration = Duration::from_secs(5);

/// Default read timeout for the serial transport.
pub const DEFAULT_SERIAL_TIMEOUT: Duration = Duration::from_secs(60);

/// Serial line speed used by the metadata host.
pub const DEFAULT_BAUD_RATE: u32 = 115_200;

/// Serial line configuration (always 8N1).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SerialConfig {
    /// Device path or COM port name.
    pub port: String,
    /// Line speed.
    pub baud_rate: u32,
    /// Read timeout, fixed when the port is opened.
    pub read_timeout: Duration,
}

impl SerialConfig {
    pub fn new(port: impl Into<String>) -> Self {
        Self {
            port: port.into(),
            baud_rate: DEFAULT_BAUD_RATE,
            read_timeout: DEFAULT_SERIAL_TIMEOUT,
        }
    }

    pub fn with_read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = timeout;
        self
    }

    /// Returns the metadata serial port for the target OS, if known.
    pub fn default_port() -> Option<&'static str> {
        if cfg!(target_os = "linux") {
            Some("/dev/ttyS1")
        } else if cfg!(windows) {
            Some("COM1")
        } else if cfg!(any(target_os = "solaris", target_os = "illumos")) {
            Some("/dev/ttyb")
        } else {
            None
        }
    }
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self::new(Self::default_port().unwrap_or_default())
    }
}

/// Socket configuration shared by the TCP and Unix transports.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SocketConfig {
    /// `host:port` for TCP, a filesystem path for Unix sockets.
    pub address: String,
    /// Dial timeout and initial read timeout.
    pub timeout: Duration,
}

impl SocketConfig {
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            timeout: DEFAULT_SOCKET_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Which byte stream to open.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportConfig {
    Serial(SerialConfig),
    Tcp(SocketConfig),
    Unix(SocketConfig),
}

impl TransportConfig {
    /// Short transport name.
    pub fn name(&self) -> &'static str {
        match self {
            TransportConfig::Serial(_) => "serial",
            TransportConfig::Tcp(_) => "tcp",
            TransportConfig::Unix(_) => "unix",
        }
    }

    /// Device path or socket address.
    pub fn target(&self) -> &str {
        match self {
            TransportConfig::Serial(serial) => &serial.port,
            TransportConfig::Tcp(socket) | TransportConfig::Unix(socket) => &socket.address,
        }
    }
}

impl fmt::Display for TransportConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.name(), self.target())
    }
}

/// Client configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub transport: TransportConfig,
}

impl ClientConfig {
    pub fn new(transport: TransportConfig) -> Self {
        Self { transport }
    }

    pub fn serial(port: impl Into<String>) -> Self {
        Self::new(TransportConfig::Serial(SerialConfig::new(port)))
    }

    pub fn tcp(address: impl Into<String>) -> Self {
        Self::new(TransportConfig::Tcp(SocketConfig::new(address)))
    }

    pub fn unix(path: impl Into<String>) -> Self {
        Self::new(TransportConfig::Unix(SocketConfig::new(path)))
    }

    /// Probes the local filesystem for zone sockets, falling back to serial.
    pub fn detect() -> Self {
        Self::detect_with(|path| path.exists())
    }

    /// Runs detection with a caller-supplied existence check.
    pub fn detect_with(exists: impl Fn(&Path) -> bool) -> Self {
        for (socket, kind) in [(LX_ZONE_SOCKET, "LX-branded"), (ZONE_SOCKET, "native")] {
            if exists(Path::new(socket)) {
                tracing::debug!("Detected {} zone socket: {}", kind, socket);
                return Self::unix(socket);
            }
        }

        let serial = SerialConfig::default();
        if serial.port.is_empty() {
            tracing::warn!(
                "No metadata serial port known for {}, port left empty",
                std::env::consts::OS
            );
        } else {
            tracing::debug!("No zone socket found, using serial port {}", serial.port);
        }
        Self::new(TransportConfig::Serial(serial))
    }

    /// Overrides the transport timeout (serial read timeout or socket timeout).
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        match &mut self.transport {
            TransportConfig::Serial(serial) => serial.read_timeout = timeout,
            TransportConfig::Tcp(socket) | TransportConfig::Unix(socket) => {
                socket.timeout = timeout
            }
        }
        self
    }
}
