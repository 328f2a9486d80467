//! Plain-text accounts file.
//!
//! One profile per line:
//!
//! ```text
//! # name,server,port,email,protocol[,smtp_server,smtp_port]
//! Work,imap.example.com,993,anna@example.com,IMAP,smtp.example.com,465
//! Home,pop.example.org,995,bob@example.org,pop3
//! ```

use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use super::model::{AccountProfile, Protocol};
use super::validation::{describe, validate_profile};
use crate::{Error, Result};

/// File name looked up in the working directory and the config directory.
const ACCOUNTS_FILE: &str = "accounts.txt";

/// Application directory below the platform config directory.
const APP_DIR: &str = "mailstash";

/// Resolves the accounts file location.
///
/// An explicit path wins. Otherwise `./accounts.txt` is used when it exists,
/// falling back to `<config dir>/mailstash/accounts.txt`.
#[must_use]
pub fn resolve_accounts_path(explicit: Option<&Path>) -> PathBuf {
    if let Some(path) = explicit {
        return path.to_path_buf();
    }

    let local = PathBuf::from(ACCOUNTS_FILE);
    if local.exists() {
        return local;
    }

    dirs::config_dir().map_or(local, |dir| dir.join(APP_DIR).join(ACCOUNTS_FILE))
}

/// In-memory set of account profiles backed by the accounts file.
#[derive(Debug, Clone, Default)]
pub struct AccountStore {
    profiles: Vec<AccountProfile>,
}

impl AccountStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads the accounts file. A missing file yields an empty store.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Filesystem`] if the file exists but cannot be read.
    pub fn load(path: &Path) -> Result<Self> {
        match std::fs::read_to_string(path) {
            Ok(text) => {
                let store = Self::parse(&text);
                debug!(path = %path.display(), count = store.profiles.len(), "Loaded accounts");
                Ok(store)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "No accounts file");
                Ok(Self::new())
            }
            Err(source) => Err(Error::Filesystem {
                path: path.to_path_buf(),
                source,
            }),
        }
    }

    /// Parses accounts file contents, skipping malformed lines with a warning.
    #[must_use]
    pub fn parse(text: &str) -> Self {
        let mut profiles = Vec::new();

        for (index, line) in text.lines().enumerate() {
            let line_no = index + 1;
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            match parse_line(line) {
                Ok(profile) => profiles.push(profile),
                Err(reason) => warn!(line = line_no, "Skipping account line: {reason}"),
            }
        }

        Self { profiles }
    }

    /// Writes all profiles to `path`, creating parent directories.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Filesystem`] if the directory or file cannot be
    /// written.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).map_err(|source| Error::Filesystem {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        std::fs::write(path, self.to_text()).map_err(|source| Error::Filesystem {
            path: path.to_path_buf(),
            source,
        })?;
        debug!(path = %path.display(), count = self.profiles.len(), "Saved accounts");
        Ok(())
    }

    /// Renders the store in accounts file format.
    #[must_use]
    pub fn to_text(&self) -> String {
        let mut out = String::new();
        for p in &self.profiles {
            let _ = write!(
                out,
                "{},{},{},{},{}",
                p.display_name, p.inbound_host, p.inbound_port, p.id, p.protocol
            );
            if let Some(outbound) = &p.outbound {
                let _ = write!(out, ",{},{}", outbound.host, outbound.port);
            }
            out.push('\n');
        }
        out
    }

    /// All profiles in file order.
    #[must_use]
    pub fn profiles(&self) -> &[AccountProfile] {
        &self.profiles
    }

    /// Finds a profile by exact id, then by display name ignoring case.
    #[must_use]
    pub fn find(&self, key: &str) -> Option<&AccountProfile> {
        self.profiles.iter().find(|p| p.id == key).or_else(|| {
            let key = key.to_lowercase();
            self.profiles.iter().find(|p| p.display_name.to_lowercase() == key)
        })
    }

    /// Adds a validated profile, replacing one with the same id.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] listing the validation failures.
    pub fn upsert(&mut self, profile: AccountProfile) -> Result<()> {
        validate_profile(&profile).map_err(|errors| Error::Config(describe(&errors)))?;

        if let Some(existing) = self.profiles.iter_mut().find(|p| p.id == profile.id) {
            *existing = profile;
        } else {
            self.profiles.push(profile);
        }
        Ok(())
    }

    /// Removes a profile by id. Returns the removed profile.
    pub fn remove(&mut self, id: &str) -> Option<AccountProfile> {
        let index = self.profiles.iter().position(|p| p.id == id)?;
        Some(self.profiles.remove(index))
    }
}

fn parse_line(line: &str) -> std::result::Result<AccountProfile, String> {
    let fields: Vec<&str> = line.split(',').map(str::trim).collect();
    if fields.len() < 5 {
        return Err(format!("expected at least 5 fields, found {}", fields.len()));
    }

    let port = parse_port(fields[2])?;
    let protocol =
        Protocol::parse(fields[4]).ok_or_else(|| format!("unknown protocol {:?}", fields[4]))?;
    let mut profile = AccountProfile::new(fields[0], fields[3], fields[1], port, protocol);

    match (fields.get(5), fields.get(6)) {
        (Some(host), Some(port)) if !host.is_empty() || !port.is_empty() => {
            profile = profile.with_outbound(*host, parse_port(port)?);
        }
        (Some(host), None) if !host.is_empty() => {
            return Err("outgoing server given without port".to_string());
        }
        _ => {}
    }

    validate_profile(&profile).map_err(|errors| describe(&errors))?;
    Ok(profile)
}

fn parse_port(s: &str) -> std::result::Result<u16, String> {
    s.parse::<u16>().map_err(|_| format!("invalid port {s:?}"))
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

    const SAMPLE: &str = "\
# accounts
Work,imap.example.com,993,anna@example.com,IMAP,smtp.example.com,465

Home , pop.example.org , 995 , bob@example.org , pop3
Broken,imap.example.com,99999,c@example.com,IMAP
Short,imap.example.com,993
Odd,imap.example.com,993,d@example.com,NNTP
Bad,imap.example.com,993,not-an-address,IMAP
";

    #[test]
    fn test_parse_skips_malformed_lines() {
        let store = AccountStore::parse(SAMPLE);
        let ids: Vec<&str> = store.profiles().iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["anna@example.com", "bob@example.org"]);

        let home = &store.profiles()[1];
        assert_eq!(home.display_name, "Home");
        assert_eq!(home.inbound_host, "pop.example.org");
        assert_eq!(home.protocol, Protocol::Pop3);
        assert!(home.outbound.is_none());
    }

    #[test]
    fn test_find_by_id_and_name() {
        let store = AccountStore::parse(SAMPLE);
        assert_eq!(store.find("bob@example.org").unwrap().display_name, "Home");
        assert_eq!(store.find("WORK").unwrap().id, "anna@example.com");
        assert!(store.find("nobody").is_none());
    }

    #[test]
    fn test_to_text_round_trips() {
        let store = AccountStore::parse(SAMPLE);
        let text = store.to_text();
        assert_eq!(
            text,
            "Work,imap.example.com,993,anna@example.com,IMAP,smtp.example.com,465\n\
             Home,pop.example.org,995,bob@example.org,POP3\n"
        );
        assert_eq!(AccountStore::parse(&text).profiles(), store.profiles());
    }

    #[test]
    fn test_load_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = AccountStore::load(&dir.path().join("absent.txt")).unwrap();
        assert!(store.profiles().is_empty());
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("accounts.txt");

        let mut store = AccountStore::new();
        store
            .upsert(AccountProfile::new(
                "Work",
                "anna@example.com",
                "imap.example.com",
                993,
                Protocol::Imap,
            ))
            .unwrap();
        store.save(&path).unwrap();

        let loaded = AccountStore::load(&path).unwrap();
        assert_eq!(loaded.profiles(), store.profiles());
    }

    #[test]
    fn test_upsert_rejects_invalid() {
        let mut store = AccountStore::new();
        let err = store
            .upsert(AccountProfile::new(
                "",
                "anna@example.com",
                "imap.example.com",
                993,
                Protocol::Imap,
            ))
            .unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_upsert_keeps_file_loadable() {
        let mut store = AccountStore::new();
        let err = store
            .upsert(AccountProfile::new(
                "Work, Inc",
                "anna@example.com",
                "imap.example.com",
                993,
                Protocol::Imap,
            ))
            .unwrap_err();
        assert!(matches!(err, Error::Config(ref text) if text.contains("commas")));
        assert!(store.profiles().is_empty());

        store
            .upsert(AccountProfile::new(
                "Work & Co",
                "anna@example.com",
                "imap.example.com",
                993,
                Protocol::Imap,
            ))
            .unwrap();
        assert_eq!(AccountStore::parse(&store.to_text()).profiles(), store.profiles());
    }

    #[test]
    fn test_upsert_replaces_and_remove() {
        let mut store = AccountStore::parse(SAMPLE);
        let mut changed = store.profiles()[0].clone();
        changed.inbound_port = 143;
        store.upsert(changed).unwrap();
        assert_eq!(store.profiles().len(), 2);
        assert_eq!(store.profiles()[0].inbound_port, 143);

        assert!(store.remove("anna@example.com").is_some());
        assert!(store.remove("anna@example.com").is_none());
    }

    #[test]
    fn test_resolve_explicit_path() {
        let path = Path::new("/tmp/custom.txt");
        assert_eq!(resolve_accounts_path(Some(path)), PathBuf::from("/tmp/custom.txt"));
    }
}
