//! Protocol vocabulary shared by the parser and the client.
//!
//! Covers what a read-only session needs: status words, capabilities,
//! response codes, LIST entries and sequence numbers.

#![allow(clippy::missing_const_for_fn)]

mod capability;
mod identifiers;
mod mailbox;
mod response_code;
mod status;

pub use capability::Capability;
pub use identifiers::SeqNum;
pub use mailbox::{ExamineSummary, ListResponse, MailboxAttribute};
pub use response_code::ResponseCode;
pub use status::Status;
