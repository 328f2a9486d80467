//! IMAP connection management.
//!
//! - Configuration (host, port, security mode, timeouts)
//! - TLS/plaintext stream abstraction
//! - Framed I/O for IMAP protocol
//! - Type-state client

mod client;
mod config;
mod framed;
mod stream;

pub use client::{Authenticated, Client, NotAuthenticated, Selected, Transition};
pub use config::{Config, DEFAULT_CONNECT_TIMEOUT, DEFAULT_IO_TIMEOUT, Security};
pub use framed::{Bye, FramedStream};
pub use stream::{ImapStream, connect};
