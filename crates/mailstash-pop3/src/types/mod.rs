//! Core POP3 types.

mod listing;
mod reply;

pub use listing::{MailboxStat, MessageInfo};
pub use reply::{Reply, Status};
