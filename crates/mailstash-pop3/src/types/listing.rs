//! Maildrop listing types.

/// One entry of a LIST scan listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageInfo {
    /// Message number, kept as the server sent it.
    pub id: String,
    /// Size in octets, when the server reported a numeric one.
    pub size: Option<u64>,
}

/// Drop listing returned by STAT.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MailboxStat {
    /// Number of messages in the maildrop.
    pub count: u32,
    /// Total size in octets.
    pub size: u64,
}
