//! Subcommand handlers.
//!
//! Every error returned from here is a configuration problem and ends the
//! process with exit code 1. Problems talking to a server are reported and
//! end with exit code 0.

use std::io::BufRead;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result, anyhow, bail};
use mailstash_core::{
    AccountProfile, AccountStore, ArchivePipeline, ArchiveWriter, JobRequest, JobRunner,
    KeyringSecretStore, NetworkConnector, Protocol, SecretStore, list_folders,
    resolve_accounts_path, search_archive,
};
use tracing::{error, info};

use crate::cli::{AccountAction, Cli, Command, NewAccount};
use crate::output;

/// Runs the selected subcommand.
pub async fn run(cli: Cli) -> Result<()> {
    let accounts_path = resolve_accounts_path(cli.accounts.as_deref());
    let writer = cli.root.map_or_else(ArchiveWriter::default, ArchiveWriter::new);

    match cli.command {
        Command::Archive {
            account,
            folders,
            age_days,
        } => {
            let store = load_store(&accounts_path)?;
            let profile = find_account(&store, &account)?;
            archive(profile, folders, age_days, writer, cli.json).await
        }
        Command::Folders { account } => {
            let store = load_store(&accounts_path)?;
            let profile = find_account(&store, &account)?;
            folders(&profile, cli.json).await
        }
        Command::Search { term } => {
            let hits = search_archive(writer.root(), &term);
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&hits)?);
            } else {
                print!("{}", output::search_hits(&hits));
            }
            Ok(())
        }
        Command::Accounts { action } => accounts(&accounts_path, action, cli.json),
        Command::Password { account, delete } => {
            let store = load_store(&accounts_path)?;
            let profile = find_account(&store, &account)?;
            password(&profile, delete)
        }
    }
}

fn load_store(path: &Path) -> Result<AccountStore> {
    AccountStore::load(path)
        .with_context(|| format!("cannot read accounts file {}", path.display()))
}

fn find_account(store: &AccountStore, key: &str) -> Result<AccountProfile> {
    store
        .find(key)
        .cloned()
        .ok_or_else(|| anyhow!("unknown account {key:?}"))
}

async fn archive(
    profile: AccountProfile,
    folders: Vec<String>,
    age_days: i64,
    writer: ArchiveWriter,
    json: bool,
) -> Result<()> {
    let pipeline = Arc::new(ArchivePipeline::new(
        NetworkConnector::default(),
        Arc::new(KeyringSecretStore::new()),
        writer,
    ));
    let request = JobRequest::new(profile.clone())
        .with_folders(folders)
        .with_age_threshold(age_days);

    let mut handle = JobRunner::spawn(pipeline, request);
    while let Some(snapshot) = handle.next_progress().await {
        info!(
            processed = snapshot.processed,
            total = snapshot.total,
            errors = snapshot.errors,
            "{}",
            snapshot.status_text
        );
    }
    let result = handle.wait().await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        print!("{}", output::job_summary(&profile, &result));
    }
    Ok(())
}

async fn folders(profile: &AccountProfile, json: bool) -> Result<()> {
    let secret = if profile.protocol == Protocol::Pop3 {
        String::new()
    } else {
        KeyringSecretStore::new()
            .get_secret(&profile.id)?
            .ok_or_else(|| anyhow!("no password stored for {}", profile.id))?
    };

    match list_folders(&NetworkConnector::default(), profile, &secret).await {
        Ok(names) if json => println!("{}", serde_json::to_string_pretty(&names)?),
        Ok(names) => {
            for name in names {
                println!("{name}");
            }
        }
        Err(e) => {
            error!(account = %profile.id, error = %e, "Folder listing failed");
            eprintln!("Cannot list folders: {e}");
        }
    }
    Ok(())
}

fn accounts(path: &Path, action: Option<AccountAction>, json: bool) -> Result<()> {
    let mut store = load_store(path)?;

    match action {
        None => {
            if json {
                println!("{}", serde_json::to_string_pretty(store.profiles())?);
            } else {
                print!("{}", output::accounts(store.profiles()));
            }
            return Ok(());
        }
        Some(AccountAction::Add(new)) => {
            let profile = new_profile(new)?;
            let label = format!("{} <{}>", profile.display_name, profile.id);
            store.upsert(profile)?;
            println!("Saved {label}");
        }
        Some(AccountAction::Remove { email }) => {
            if store.remove(&email).is_none() {
                bail!("unknown account {email:?}");
            }
            println!("Removed {email}");
        }
    }

    store.save(path)?;
    info!(path = %path.display(), "Accounts file written");
    Ok(())
}

fn new_profile(new: NewAccount) -> Result<AccountProfile> {
    let protocol = Protocol::parse(&new.protocol)
        .ok_or_else(|| anyhow!("unknown protocol {:?}", new.protocol))?;
    let mut profile = AccountProfile::new(new.name, new.email, new.server, new.port, protocol);
    if let (Some(host), Some(port)) = (new.smtp_server, new.smtp_port) {
        profile = profile.with_outbound(host, port);
    }
    Ok(profile)
}

fn password(profile: &AccountProfile, delete: bool) -> Result<()> {
    let secrets = KeyringSecretStore::new();
    if delete {
        secrets.delete_secret(&profile.id)?;
        println!("Password for {} deleted", profile.id);
        return Ok(());
    }

    eprintln!("Password for {}:", profile.id);
    let mut line = String::new();
    std::io::stdin().lock().read_line(&mut line)?;
    let secret = line.trim_end_matches(['\r', '\n']);
    if secret.is_empty() {
        bail!("empty password");
    }

    secrets.set_secret(&profile.id, secret)?;
    println!("Password for {} stored", profile.id);
    Ok(())
}
