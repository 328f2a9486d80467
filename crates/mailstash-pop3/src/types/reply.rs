//! POP3 reply types.

use crate::error::Error;

/// Status indicator of a POP3 reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    /// `+OK`
    Ok,
    /// `-ERR`
    Err,
}

/// POP3 status line from the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    /// Status indicator.
    pub status: Status,
    /// Text after the indicator, possibly empty.
    pub text: String,
}

impl Reply {
    /// Creates a new reply.
    #[must_use]
    pub fn new(status: Status, text: impl Into<String>) -> Self {
        Self {
            status,
            text: text.into(),
        }
    }

    /// Returns true for `+OK`.
    #[must_use]
    pub const fn is_ok(&self) -> bool {
        matches!(self.status, Status::Ok)
    }

    /// Turns a `-ERR` reply into [`Error::Negative`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::Negative`] carrying the reply text for `-ERR`.
    pub fn into_result(self) -> crate::Result<Self> {
        match self.status {
            Status::Ok => Ok(self),
            Status::Err => Err(Error::Negative(self.text)),
        }
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::redundant_clone,
    clippy::manual_string_new,
    clippy::needless_collect,
    clippy::unreadable_literal,
    clippy::used_underscore_items,
    clippy::similar_names,
)]
mod tests {
    use super::*;

    #[test]
    fn test_ok_reply_passes_through() {
        let reply = Reply::new(Status::Ok, "maildrop ready");
        assert!(reply.is_ok());
        assert_eq!(reply.into_result().unwrap().text, "maildrop ready");
    }

    #[test]
    fn test_err_reply_becomes_negative() {
        let err = Reply::new(Status::Err, "invalid password").into_result().unwrap_err();
        assert!(matches!(err, Error::Negative(ref text) if text == "invalid password"));
    }
}
