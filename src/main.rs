//! mdata - command-line client for the V2 metadata protocol
//!
//! Reads and writes the host-provided metadata store from inside a guest.

mod commands;

use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use mdata_client::config::ZONE_SOCKET;
use mdata_client::{Client, ClientConfig, SerialConfig, TransportConfig};
use std::io::Write;
use std::process::ExitCode;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "mdata")]
#[command(about = "Query and update guest metadata over the V2 metadata protocol")]
#[command(version)]
struct Cli {
    /// Transport to use; auto probes for zone sockets, then falls back to serial
    #[arg(long, value_enum, default_value = "auto", env = "MDATA_TRANSPORT")]
    transport: TransportKind,

    /// Socket address: host:port for tcp, a path for unix (not used with auto or serial)
    #[arg(short, long, env = "MDATA_ADDRESS")]
    address: Option<String>,

    /// Serial device for serial, or for auto when it falls back to serial
    #[arg(long, env = "MDATA_SERIAL_PORT")]
    serial_port: Option<String>,

    /// Timeout in seconds (socket dial and read, or serial read)
    #[arg(long, env = "MDATA_TIMEOUT")]
    timeout: Option<u64>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum TransportKind {
    Auto,
    Serial,
    Unix,
    Tcp,
}

impl TransportKind {
    fn as_str(&self) -> &'static str {
        match self {
            TransportKind::Auto => "auto",
            TransportKind::Serial => "serial",
            TransportKind::Unix => "unix",
            TransportKind::Tcp => "tcp",
        }
    }
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Commands {
    /// Get a metadata key
    Get {
        /// Key to read
        key: String,
    },

    /// List metadata keys
    Keys,

    /// Put a metadata key-value pair
    Put {
        /// Key to write (keys under sdc: are read-only)
        key: String,

        /// Value to store
        value: String,
    },

    /// Delete a metadata key
    Delete {
        /// Key to delete
        key: String,
    },
}

impl Cli {
    /// Builds the client configuration from flags, probing when asked to.
    fn client_config(&self) -> Result<ClientConfig, String> {
        match self.transport {
            TransportKind::Auto | TransportKind::Serial if self.address.is_some() => {
                return Err(format!(
                    "--address cannot be used with the {} transport",
                    self.transport.as_str()
                ));
            }
            TransportKind::Unix | TransportKind::Tcp if self.serial_port.is_some() => {
                return Err(format!(
                    "--serial-port cannot be used with the {} transport",
                    self.transport.as_str()
                ));
            }
            _ => {}
        }

        let mut config = match self.transport {
            TransportKind::Auto => {
                let mut config = ClientConfig::detect();
                if let (TransportConfig::Serial(serial), Some(port)) =
                    (&mut config.transport, &self.serial_port)
                {
                    serial.port = port.clone();
                }
                config
            }
            TransportKind::Serial => {
                let serial = match &self.serial_port {
                    Some(port) => SerialConfig::new(port.clone()),
                    None => SerialConfig::default(),
                };
                ClientConfig::new(TransportConfig::Serial(serial))
            }
            TransportKind::Unix => {
                ClientConfig::unix(self.address.as_deref().unwrap_or(ZONE_SOCKET))
            }
            TransportKind::Tcp => match &self.address {
                Some(address) => ClientConfig::tcp(address.clone()),
                None => return Err("--address is required for the tcp transport".to_string()),
            },
        };

        if let Some(secs) = self.timeout {
            config = config.with_timeout(Duration::from_secs(secs));
        }
        Ok(config)
    }
}

/// Writes a result to stdout verbatim, followed by a newline.
fn write_output(output: &[u8]) -> std::io::Result<()> {
    let mut stdout = std::io::stdout().lock();
    stdout.write_all(output)?;
    stdout.write_all(b"\n")?;
    stdout.flush()
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    // Logs go to stderr; stdout carries only results.
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();

    let cli = Cli::parse();

    let config = match cli.client_config() {
        Ok(config) => config,
        Err(msg) => {
            eprintln!("{}: {}", "Error".red(), msg);
            return ExitCode::from(commands::EXIT_FAILURE);
        }
    };
    tracing::debug!("Using {}", config.transport);

    let mut client = match Client::connect(&config).await {
        Ok(client) => client,
        Err(e) => {
            eprintln!(
                "{}: failed to create client ({}): {}",
                "Connection failed".red(),
                config.transport.name(),
                e
            );
            return ExitCode::from(commands::exit_code(&e));
        }
    };

    let result = commands::execute(&mut client, cli.command).await;

    if let Err(e) = client.close().await {
        tracing::debug!("Error while closing connection: {}", e);
    }

    match result {
        Ok(output) => {
            if output.is_empty() {
                return ExitCode::SUCCESS;
            }
            match write_output(&output) {
                Ok(()) => ExitCode::SUCCESS,
                Err(e) => {
                    tracing::debug!("Failed to write output: {}", e);
                    ExitCode::from(commands::EXIT_FAILURE)
                }
            }
        }
        Err(e) => {
            eprintln!("{}: {}", "Error".red(), e);
            ExitCode::from(commands::exit_code(&e))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_put() {
        let cli = Cli::try_parse_from(["mdata", "put", "foo", "bar"]).unwrap();
        assert_eq!(
            cli.command,
            Commands::Put {
                key: "foo".into(),
                value: "bar".into()
            }
        );
    }

    #[test]
    fn test_get_requires_key() {
        assert!(Cli::try_parse_from(["mdata", "get"]).is_err());
        assert!(Cli::try_parse_from(["mdata", "keys", "extra"]).is_err());
    }

    #[test]
    fn test_tcp_config() {
        let cli = Cli::try_parse_from([
            "mdata",
            "--transport",
            "tcp",
            "--address",
            "127.0.0.1:8000",
            "--timeout",
            "2",
            "keys",
        ])
        .unwrap();

        let config = cli.client_config().unwrap();
        assert_eq!(
            config,
            ClientConfig::tcp("127.0.0.1:8000").with_timeout(Duration::from_secs(2))
        );
    }

    #[test]
    fn test_tcp_requires_address() {
        let cli = Cli::try_parse_from(["mdata", "--transport", "tcp", "keys"]).unwrap();
        assert!(cli.client_config().is_err());
    }

    #[test]
    fn test_flags_must_match_transport() {
        let cli = Cli::try_parse_from(["mdata", "--address", "127.0.0.1:8000", "keys"]).unwrap();
        let err = cli.client_config().unwrap_err();
        assert!(err.contains("--address"), "{err}");

        let cli = Cli::try_parse_from([
            "mdata",
            "--transport",
            "unix",
            "--serial-port",
            "/dev/ttyS0",
            "keys",
        ])
        .unwrap();
        let err = cli.client_config().unwrap_err();
        assert!(err.contains("--serial-port"), "{err}");

        let cli = Cli::try_parse_from([
            "mdata",
            "--transport",
            "serial",
            "--address",
            "/run/metadata.sock",
            "keys",
        ])
        .unwrap();
        assert!(cli.client_config().is_err());
    }

    #[test]
    fn test_unix_default_socket() {
        let cli = Cli::try_parse_from(["mdata", "--transport", "unix", "keys"]).unwrap();
        assert_eq!(cli.client_config().unwrap(), ClientConfig::unix(ZONE_SOCKET));
    }

    #[test]
    fn test_serial_port_override() {
        let cli = Cli::try_parse_from([
            "mdata",
            "--transport",
            "serial",
            "--serial-port",
            "/dev/ttyS0",
            "delete",
            "foo",
        ])
        .unwrap();
        assert_eq!(cli.client_config().unwrap(), ClientConfig::serial("/dev/ttyS0"));
    }
}
