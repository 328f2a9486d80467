//! Checks applied to a profile before it is stored or used.

use super::model::AccountProfile;

/// One thing wrong with an [`AccountProfile`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    /// Display name is blank.
    #[error("display name must not be blank")]
    EmptyName,
    /// Mail address is blank.
    #[error("mail address must not be blank")]
    EmptyEmail,
    /// Mail address is not of the form `local@domain.tld`.
    #[error("mail address is not of the form local@domain.tld")]
    InvalidEmail,
    /// Incoming server is blank.
    #[error("incoming server must not be blank")]
    EmptyInboundHost,
    /// Incoming port is 0.
    #[error("incoming port must be between 1 and 65535")]
    InvalidInboundPort,
    /// Outgoing server is present but blank.
    #[error("outgoing server must not be blank")]
    EmptyOutboundHost,
    /// Outgoing port is present but 0.
    #[error("outgoing port must be between 1 and 65535")]
    InvalidOutboundPort,
    /// A field holds a comma or a line break, which the accounts file has no
    /// way to store. Carries the column name.
    #[error("{0} must not contain commas or line breaks")]
    Unstorable(&'static str),
    /// Display name starts with `#`, which would turn its line into a comment.
    #[error("display name must not start with '#'")]
    CommentName,
}

impl ValidationError {
    /// Accounts-file column the problem is in.
    #[must_use]
    pub const fn field(self) -> &'static str {
        match self {
            Self::EmptyName | Self::CommentName => "name",
            Self::EmptyEmail | Self::InvalidEmail => "email",
            Self::EmptyInboundHost => "server",
            Self::InvalidInboundPort => "port",
            Self::EmptyOutboundHost => "smtp_server",
            Self::InvalidOutboundPort => "smtp_port",
            Self::Unstorable(column) => column,
        }
    }
}

/// `Err` carries every problem found, in column order.
pub type ValidationResult = Result<(), Vec<ValidationError>>;

/// Checks every field of `profile`.
///
/// # Errors
///
/// Returns all problems at once rather than stopping at the first.
pub fn validate_profile(profile: &AccountProfile) -> ValidationResult {
    let email = if blank(&profile.id) {
        Some(ValidationError::EmptyEmail)
    } else if looks_like_address(&profile.id) {
        None
    } else {
        Some(ValidationError::InvalidEmail)
    };

    let outbound = profile.outbound.as_ref();
    let problems: Vec<ValidationError> = [
        blank(&profile.display_name).then_some(ValidationError::EmptyName),
        profile
            .display_name
            .trim_start()
            .starts_with('#')
            .then_some(ValidationError::CommentName),
        unstorable(&profile.display_name, "name"),
        email,
        unstorable(&profile.id, "email"),
        blank(&profile.inbound_host).then_some(ValidationError::EmptyInboundHost),
        unstorable(&profile.inbound_host, "server"),
        (profile.inbound_port == 0).then_some(ValidationError::InvalidInboundPort),
        outbound
            .filter(|server| blank(&server.host))
            .map(|_| ValidationError::EmptyOutboundHost),
        outbound.and_then(|server| unstorable(&server.host, "smtp_server")),
        outbound
            .filter(|server| server.port == 0)
            .map(|_| ValidationError::InvalidOutboundPort),
    ]
    .into_iter()
    .flatten()
    .collect();

    if problems.is_empty() { Ok(()) } else { Err(problems) }
}

fn blank(s: &str) -> bool {
    s.trim().is_empty()
}

fn unstorable(value: &str, column: &'static str) -> Option<ValidationError> {
    value
        .contains([',', '\r', '\n'])
        .then_some(ValidationError::Unstorable(column))
}

/// Joins problems into one line for error messages.
pub(crate) fn describe(problems: &[ValidationError]) -> String {
    problems.iter().map(ToString::to_string).collect::<Vec<_>>().join(", ")
}

/// Exactly one `@`, something before it, and a dotted domain with no empty
/// labels after it.
fn looks_like_address(address: &str) -> bool {
    match address.trim().split_once('@') {
        Some((local, domain)) if !local.is_empty() && !domain.contains('@') => {
            domain.contains('.') && !domain.split('.').any(str::is_empty)
        }
        _ => false,
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
    use crate::account::Protocol;

    fn profile() -> AccountProfile {
        AccountProfile::new("Work", "anna@example.com", "imap.example.com", 993, Protocol::Imap)
    }

    #[test]
    fn test_address_shapes() {
        for good in ["anna@example.com", "a.b+tag@mail.example.co.uk", " anna@example.com "] {
            assert!(looks_like_address(good), "{good}");
        }
        for bad in [
            "",
            "anna",
            "@example.com",
            "anna@",
            "anna@localhost",
            "a@@example.com",
            "a@example..com",
            "a@.example.com",
        ] {
            assert!(!looks_like_address(bad), "{bad}");
        }
    }

    #[test]
    fn test_complete_profile_passes() {
        assert!(validate_profile(&profile()).is_ok());
        assert!(validate_profile(&profile().with_outbound("smtp.example.com", 465)).is_ok());
    }

    #[test]
    fn test_all_problems_reported_in_column_order() {
        let mut p = profile();
        p.display_name = "  ".to_string();
        p.id = "not-an-address".to_string();
        p.inbound_host = String::new();
        p.inbound_port = 0;

        assert_eq!(
            validate_profile(&p).unwrap_err(),
            vec![
                ValidationError::EmptyName,
                ValidationError::InvalidEmail,
                ValidationError::EmptyInboundHost,
                ValidationError::InvalidInboundPort,
            ]
        );
    }

    #[test]
    fn test_blank_outbound_server() {
        let errors = validate_profile(&profile().with_outbound(" ", 0)).unwrap_err();
        assert_eq!(
            errors,
            vec![ValidationError::EmptyOutboundHost, ValidationError::InvalidOutboundPort]
        );
        assert_eq!(errors[0].field(), "smtp_server");
        assert_eq!(
            describe(&errors),
            "outgoing server must not be blank, outgoing port must be between 1 and 65535"
        );
    }

    #[test]
    fn test_values_the_accounts_file_cannot_hold() {
        let mut p = profile();
        p.display_name = "Work, Inc".to_string();
        p.inbound_host = "imap.example.com\nHome".to_string();
        assert_eq!(
            validate_profile(&p).unwrap_err(),
            vec![
                ValidationError::Unstorable("name"),
                ValidationError::Unstorable("server")
            ]
        );

        let p = profile().with_outbound("smtp.example.com,465", 587);
        let errors = validate_profile(&p).unwrap_err();
        assert_eq!(errors, vec![ValidationError::Unstorable("smtp_server")]);
        assert_eq!(errors[0].field(), "smtp_server");

        let mut p = profile();
        p.id = "anna,bob@example.com".to_string();
        assert_eq!(
            validate_profile(&p).unwrap_err(),
            vec![ValidationError::Unstorable("email")]
        );
    }

    #[test]
    fn test_comment_marker_name() {
        let mut p = profile();
        p.display_name = " #private".to_string();
        let errors = validate_profile(&p).unwrap_err();
        assert_eq!(errors, vec![ValidationError::CommentName]);
        assert_eq!(errors[0].to_string(), "display name must not start with '#'");

        p.display_name = "Team #2".to_string();
        assert!(validate_profile(&p).is_ok());
    }
}
