//! Listing the folders an account can archive.

use tracing::debug;

use crate::account::{AccountProfile, Protocol};
use crate::session::{MailSession, SessionConnector, SessionError};

/// Lists the selectable folders of `account`, sorted case-insensitively.
///
/// POP3 accounts always have the single folder `inbox`; no connection is
/// made for them.
///
/// # Errors
///
/// Returns the session error if connecting, logging in or listing fails.
pub async fn list_folders<C: SessionConnector>(
    connector: &C,
    account: &AccountProfile,
    secret: &str,
) -> Result<Vec<String>, SessionError> {
    if account.protocol == Protocol::Pop3 {
        return Ok(vec![Protocol::Pop3.default_folder().to_string()]);
    }

    let mut session = connector.connect(account).await?;
    let listed = match session.authenticate(&account.id, secret).await {
        Ok(()) => session.list_folders().await,
        Err(e) => Err(e),
    };
    session.close().await;

    let mut folders = listed?;
    folders.sort_by_key(|name| name.to_lowercase());
    debug!(account = %account.id, count = folders.len(), "Folders listed");
    Ok(folders)
}
