use anyhow::{Context, Result};
use keyring::Entry;

use super::CredentialStore;
use crate::models::Tokens;

const SERVICE_NAME: &str = "userdesk";

/// Keychain account under which the credential pair is stored
const DEFAULT_ACCOUNT: &str = "session";

pub struct KeyringStore {
    account: String,
}

impl KeyringStore {
    pub fn new() -> Self {
        Self::with_account(DEFAULT_ACCOUNT)
    }

    /// Separate entry per account, e.g. per API base URL
    pub fn with_account(account: &str) -> Self {
        Self {
            account: account.to_string(),
        }
    }

    fn entry(&self) -> Result<Entry> {
        Entry::new(SERVICE_NAME, &self.account).context("Failed to create keyring entry")
    }
}

impl Default for KeyringStore {
    fn default() -> Self {
        Self::new()
    }
}

impl CredentialStore for KeyringStore {
    fn load(&self) -> Result<Option<Tokens>> {
        match self.entry()?.get_password() {
            Ok(secret) => {
                let tokens: Tokens = serde_json::from_str(&secret)
                    .context("Failed to parse credentials from keychain")?;
                Ok(tokens.is_complete().then_some(tokens))
            }
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(e).context("Failed to retrieve credentials from keychain"),
        }
    }

    fn save(&self, tokens: &Tokens) -> Result<()> {
        let secret = serde_json::to_string(tokens)?;
        self.entry()?
            .set_password(&secret)
            .context("Failed to store credentials in keychain")
    }

    fn clear(&self) -> Result<()> {
        match self.entry()?.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(e).context("Failed to delete credentials from keychain"),
        }
    }
}
