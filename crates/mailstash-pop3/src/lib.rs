//! # mailstash-pop3
//!
//! Async POP3 retrieval (RFC 1939): USER/PASS, STAT, LIST, RETR, NOOP and
//! QUIT over TCP or implicit TLS. Nothing is ever deleted; DELE is not
//! implemented.
//!
//! A [`Client`] starts in [`Authorization`] and [`Client::login`] either
//! moves it to [`Transaction`] or hands it back through
//! [`Transition::Refused`]. Each command round-trip, greeting included, is
//! bounded by the I/O timeout; multi-line answers are dot-unstuffed.
//!
//! ```ignore
//! use mailstash_pop3::{Client, Config, Transition, connect};
//!
//! let config = Config::new("pop.example.com");
//! let stream = connect(&config).await?;
//! let client = Client::from_stream_with_timeout(stream, config.io_timeout).await?;
//! let client = client.login("user@example.com", "password").await?;
//! let Transition::Accepted(mut client) = client else {
//!     return Ok(());
//! };
//! for info in client.list().await? {
//!     let raw = client.retr(&info.id).await?;
//!     println!("{}: {} bytes", info.id, raw.len());
//! }
//! client.quit().await?;
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

pub mod command;
pub mod connection;
mod error;
pub mod parser;
pub mod types;

pub use connection::{
    Authorization, Client, Config, LineStream, Pop3Stream, Security, Transaction, Transition,
    connect,
};
pub use error::{Error, Result};
pub use types::{MailboxStat, MessageInfo, Reply, Status};
