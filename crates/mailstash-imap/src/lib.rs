//! # mailstash-imap
//!
//! A small async IMAP4rev1 client for read-only retrieval: log in, list and
//! examine folders, search, and download whole messages.
//!
//! ## Features
//!
//! - **Type-state connection management**: `NotAuthenticated` →
//!   `Authenticated` → `Selected`, checked at compile time
//! - **Recoverable refusals**: a rejected LOGIN or EXAMINE hands the
//!   connection back through [`Transition::Refused`]
//! - **Timeouts everywhere**: connect and every command round-trip are bounded
//! - **TLS via rustls**: no OpenSSL dependency
//! - **Sans-I/O parser**: protocol parsing separated from network I/O
//!
//! ## Quick Start
//!
//! ```ignore
//! use mailstash_imap::{Client, Config, MailboxArg, Transition};
//!
//! #[tokio::main]
//! async fn main() -> mailstash_imap::Result<()> {
//!     let config = Config::new("imap.example.com");
//!     let stream = mailstash_imap::connect(&config).await?;
//!     let client = Client::from_stream_with_timeout(stream, config.io_timeout).await?;
//!
//!     let Transition::Accepted(client) = client.login("user@example.com", "password").await?
//!     else {
//!         return Ok(());
//!     };
//!     let inbox = client.examine(MailboxArg::Quoted("INBOX".into())).await?;
//!     let Transition::Accepted(mut inbox) = inbox else {
//!         return Ok(());
//!     };
//!
//!     for seq in inbox.search_all().await? {
//!         let raw = inbox.fetch_rfc822(seq).await?;
//!         println!("{seq}: {} bytes", raw.len());
//!     }
//!
//!     inbox.logout().await;
//!     Ok(())
//! }
//! ```
//!
//! ## Connection States
//!
//! ```text
//! NotAuthenticated ── login() ──→ Authenticated ── examine() ──→ Selected
//!        ↑  refused                     ↑  refused                   │
//!        └──────────                    └──────── examine() refused ─┘
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

pub use command::{Command, MailboxArg, TagGenerator};
pub use connection::{
    Authenticated, Client, Config, FramedStream, ImapStream, NotAuthenticated, Security, Selected,
    Transition, connect,
};
pub use error::{Error, Result};
pub use parser::{FetchItem, Response, ResponseParser, UntaggedResponse};
pub use types::{
    Capability, ExamineSummary, ListResponse, MailboxAttribute, ResponseCode, SeqNum, Status,
};
