//! # mdata-client
//!
//! Client library for the Version 2 metadata protocol.
//!
//! This crate provides:
//! - The `Transport` contract and serial, TCP and Unix socket streams
//! - Environment probing to pick a transport
//! - V2 negotiation
//! - An async request/response client with one request in flight at a time

pub mod client;
pub mod config;
pub mod connection;
pub mod error;
pub mod negotiate;
pub mod stream;
pub mod transport;

#[cfg(test)]
pub(crate) mod testing;

pub use client::Client;
pub use config::{ClientConfig, SerialConfig, SocketConfig, TransportConfig};
pub use connection::Connection;
pub use error::ClientError;
pub use negotiate::negotiate;
pub use stream::ClientStream;
pub use transport::Transport;
