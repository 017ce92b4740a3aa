//! Command execution.

use crate::Commands;
use bytes::Bytes;
use mdata_client::{Client, ClientError, Transport};

/// Exit status when the host reports that the key does not exist.
pub const EXIT_NOT_FOUND: u8 = 1;

/// Exit status for every other failure.
pub const EXIT_FAILURE: u8 = 2;

/// Executes a command and returns the bytes to print.
pub async fn execute<T: Transport>(
    client: &mut Client<T>,
    cmd: Commands,
) -> Result<Bytes, ClientError> {
    match cmd {
        Commands::Get { key } => client.get(&key).await,
        Commands::Keys => client.keys().await,
        Commands::Put { key, value } => {
            client.put(&key, &value).await?;
            Ok(Bytes::new())
        }
        Commands::Delete { key } => {
            client.delete(&key).await?;
            Ok(Bytes::new())
        }
    }
}

/// Maps an error to the process exit status.
pub fn exit_code(err: &ClientError) -> u8 {
    if err.is_not_found() {
        EXIT_NOT_FOUND
    } else {
        EXIT_FAILURE
    }
}
