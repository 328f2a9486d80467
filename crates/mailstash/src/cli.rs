//! Command line definition.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// Archive IMAP and POP3 mailboxes into a dated directory tree.
#[derive(Debug, Parser)]
#[command(name = "mailstash", version, about)]
pub struct Cli {
    /// Accounts file (default: ./accounts.txt, then the user config dir)
    #[arg(long, global = true, value_name = "FILE")]
    pub accounts: Option<PathBuf>,

    /// Archive root directory
    #[arg(long, global = true, value_name = "DIR")]
    pub root: Option<PathBuf>,

    /// Print machine-readable JSON instead of text
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// Subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Download and archive the mail of one account
    Archive {
        /// Account name or email address
        #[arg(long)]
        account: String,

        /// Comma-separated folders (default: INBOX, or inbox for POP3)
        #[arg(long, value_delimiter = ',')]
        folders: Vec<String>,

        /// Messages older than this many days go to the archive tree
        #[arg(long = "age-days", default_value_t = 30, allow_negative_numbers = true)]
        age_days: i64,
    },

    /// List the selectable folders of an account
    Folders {
        /// Account name or email address
        #[arg(long)]
        account: String,
    },

    /// Fuzzy-search archived messages
    Search {
        /// Text to look for in subject, sender, recipient and body
        term: String,
    },

    /// List or edit configured accounts
    Accounts {
        #[command(subcommand)]
        action: Option<AccountAction>,
    },

    /// Store or delete an account password in the system keyring
    Password {
        /// Account name or email address
        #[arg(long)]
        account: String,

        /// Delete the stored password instead of setting one
        #[arg(long)]
        delete: bool,
    },
}

/// Account file edits.
#[derive(Debug, Subcommand)]
pub enum AccountAction {
    /// Add or replace an account
    Add(NewAccount),
    /// Remove an account by email address
    Remove {
        /// Email address of the account
        email: String,
    },
}

/// Fields of a new account line.
#[derive(Debug, Args)]
pub struct NewAccount {
    /// Display name, also the archive directory name
    #[arg(long)]
    pub name: String,

    /// Inbound server host
    #[arg(long)]
    pub server: String,

    /// Inbound server port
    #[arg(long)]
    pub port: u16,

    /// Email address, also the login name
    #[arg(long)]
    pub email: String,

    /// IMAP or POP3
    #[arg(long, default_value = "IMAP")]
    pub protocol: String,

    /// Outbound server host
    #[arg(long, requires = "smtp_port")]
    pub smtp_server: Option<String>,

    /// Outbound server port
    #[arg(long, requires = "smtp_server")]
    pub smtp_port: Option<u16>,
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
    use clap::CommandFactory;

    #[test]
    fn test_cli_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_archive_arguments() {
        let cli = Cli::try_parse_from([
            "mailstash",
            "--root",
            "/tmp/arch",
            "archive",
            "--account",
            "Work",
            "--folders",
            "INBOX,Sent",
            "--age-days",
            "-5",
        ])
        .unwrap();

        assert_eq!(cli.root, Some(PathBuf::from("/tmp/arch")));
        let Command::Archive {
            account,
            folders,
            age_days,
        } = cli.command
        else {
            panic!("wrong subcommand");
        };
        assert_eq!(account, "Work");
        assert_eq!(folders, vec!["INBOX", "Sent"]);
        assert_eq!(age_days, -5);
    }

    #[test]
    fn test_archive_defaults() {
        let cli =
            Cli::try_parse_from(["mailstash", "archive", "--account", "Work", "--json"]).unwrap();
        assert!(cli.json);
        let Command::Archive { folders, age_days, .. } = cli.command else {
            panic!("wrong subcommand");
        };
        assert!(folders.is_empty());
        assert_eq!(age_days, 30);
    }

    #[test]
    fn test_smtp_pair_required() {
        let result = Cli::try_parse_from([
            "mailstash",
            "accounts",
            "add",
            "--name",
            "W",
            "--server",
            "imap.example.com",
            "--port",
            "993",
            "--email",
            "w@example.com",
            "--smtp-server",
            "smtp.example.com",
        ]);
        assert!(result.is_err());
    }
}
