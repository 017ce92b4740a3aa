//! Version 2 protocol negotiation.

use crate::connection::Connection;
use crate::error::ClientError;
use crate::transport::Transport;
use mdata_protocol::{NEGOTIATE_OK, NEGOTIATE_REQUEST};

/// Performs the V2 handshake.
///
/// Returns `Ok(true)` only if the peer replies with exactly `V2_OK\n`. Any
/// other reply is `Ok(false)`; I/O failures are errors.
pub async fn negotiate<T: Transport>(conn: &mut Connection<T>) -> Result<bool, ClientError> {
    tracing::debug!("Sending negotiation request");
    conn.send(NEGOTIATE_REQUEST).await?;

    let reply = conn.read_line().await?;
    let supported = reply.as_ref() == NEGOTIATE_OK;
    tracing::debug!("Negotiation reply {:?} (supported={})", reply, supported);
    Ok(supported)
}
