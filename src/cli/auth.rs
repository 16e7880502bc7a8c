//! Keyring-based storage for the iBroadcast access token

use anyhow::{Context, Result};
use dialoguer::Password;
use keyring::Entry;
use tracing::{debug, info};

use crate::config::RemoteConfig;
use crate::ibroadcast::IbroadcastSession;

const KEYRING_SERVICE: &str = "ibsync";
const TOKEN_ENTRY: &str = "ibroadcast:token";

/// Manages the stored access token
pub struct AuthManager;

impl AuthManager {
    /// Connect to iBroadcast, storing a new token if needed
    ///
    /// Uses the token from the keyring unless `force` is set. A new token is
    /// taken from `token` or prompted for, and only stored once a library
    /// fetch with it succeeded.
    pub async fn authenticate(
        remote: &RemoteConfig,
        token: Option<String>,
        force: bool,
    ) -> Result<IbroadcastSession> {
        if !force {
            if let Ok(stored) = Self::load() {
                info!("Found existing access token in keyring");
                return IbroadcastSession::connect(remote, &stored).await;
            }
        } else {
            debug!("Force flag set, ignoring stored token");
        }

        let token = match token {
            Some(token) => token,
            None => Password::new()
                .with_prompt("iBroadcast access token")
                .interact()
                .context("Failed to read access token")?,
        };
        let token = token.trim().to_string();
        if token.is_empty() {
            anyhow::bail!("No access token given");
        }

        let session = IbroadcastSession::connect(remote, &token)
            .await
            .context("Failed to verify access token")?;
        info!("Access token verified successfully");

        Self::store(&token)?;
        info!("Access token stored in keyring");
        Ok(session)
    }

    /// Load the access token from the keyring
    pub fn load() -> Result<String> {
        Self::entry()?
            .get_password()
            .context("No iBroadcast access token in keyring")
    }

    pub fn store(token: &str) -> Result<()> {
        Self::entry()?
            .set_password(token)
            .context("Failed to store access token in keyring")?;
        debug!("Access token stored in keyring");
        Ok(())
    }

    /// Remove the stored token
    pub fn clear() -> Result<()> {
        let _ = Self::entry()?.delete_credential();
        info!("Access token cleared from keyring");
        Ok(())
    }

    fn entry() -> Result<Entry> {
        Entry::new(KEYRING_SERVICE, TOKEN_ENTRY).context("Failed to access keyring")
    }
}
