//! Marker types for the three client states.

use crate::types::ExamineSummary;

/// Greeting read, LOGIN not yet accepted.
#[derive(Debug, Clone, Copy, Default)]
pub struct NotAuthenticated;

/// Logged in, no folder open.
#[derive(Debug, Clone, Copy, Default)]
pub struct Authenticated;

/// A folder is open read-only.
#[derive(Debug, Clone)]
pub struct Selected {
    folder: String,
    summary: ExamineSummary,
}

impl Selected {
    pub(crate) const fn new(folder: String, summary: ExamineSummary) -> Self {
        Self { folder, summary }
    }

    /// Name the folder was opened with, without quoting.
    #[must_use]
    pub fn folder(&self) -> &str {
        &self.folder
    }

    /// What the server reported when the folder was opened.
    #[must_use]
    pub const fn summary(&self) -> ExamineSummary {
        self.summary
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
    clippy::similar_names
)]
mod tests {
    use super::*;

    fn requires_send<T: Send + 'static>() {}

    #[test]
    fn test_states_cross_tasks() {
        requires_send::<NotAuthenticated>();
        requires_send::<Authenticated>();
        requires_send::<Selected>();
    }

    #[test]
    fn test_selected_keeps_summary() {
        let summary = ExamineSummary {
            exists: 12,
            uid_validity: Some(7),
            read_only: true,
        };
        let selected = Selected::new("Archiv.2023".to_string(), summary);
        assert_eq!(selected.folder(), "Archiv.2023");
        assert_eq!(selected.summary(), summary);
    }
}
