//! An async client for a cluster-membership agent's persistent, bidirectional
//! RPC channel.
//!
//! A single [`Client`] multiplexes short request/reply calls (`join`,
//! `members`, `leave`, `event`, `tags`, keyring management, `stats`,
//! `get_coordinate`) and long-lived subscriptions (`monitor`, `stream`,
//! `query`) over one TCP connection, demultiplexing inbound frames by
//! sequence number. See [`Client::connect`] to get started.
//!
//! ```rust,no_run
//! use meshrpc::{Client, Config};
//!
//! #[tokio::main]
//! async fn main() -> meshrpc::Result<()> {
//!     let config = Config::builder("127.0.0.1:7373").build()?;
//!     let client = Client::connect(config).await?;
//!
//!     let members = client.members().await?;
//!     println!("{} members", members.len());
//!
//!     client.close().await;
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod codec;
pub mod config;
pub mod connection;
pub mod dispatch;
pub mod error;
pub mod handler;
pub mod messages;
pub mod seq;

pub use client::Client;
pub use config::{Config, ConfigBuilder};
pub use error::{Error, Result};
pub use messages::{
    Coordinate, EventRecord, ForceLeaveRequest, GetCoordinateResponse, KeyResponse, Member, MembersFilteredRequest,
    QueryAck, QueryRecordType, QueryRequest, QueryResponseRecord, Stats,
};
