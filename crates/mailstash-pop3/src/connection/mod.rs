//! POP3 connection management with type-state pattern.

mod client;
mod config;
mod framed;
mod stream;

pub use client::{Authorization, Client, Transaction, Transition};
pub use config::{Config, DEFAULT_CONNECT_TIMEOUT, DEFAULT_IO_TIMEOUT, Security};
pub use framed::LineStream;
pub use stream::{Pop3Stream, connect};
