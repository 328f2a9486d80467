//! Command arguments.

/// How a mailbox name is put on the wire.
///
/// Servers disagree on quoting, so EXAMINE can be retried with the other form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MailboxArg {
    /// Always a quoted string: `"Sent Items"`.
    Quoted(String),
    /// The name exactly as given, without quotes or escapes.
    Raw(String),
}

impl MailboxArg {
    /// Returns the mailbox name without wire decoration.
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Quoted(name) | Self::Raw(name) => name,
        }
    }
}
