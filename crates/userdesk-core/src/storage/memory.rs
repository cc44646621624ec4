use std::sync::Mutex;

use anyhow::{anyhow, Result};

use super::CredentialStore;
use crate::models::Tokens;

#[derive(Default)]
pub struct MemoryStore {
    slot: Mutex<Option<Tokens>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-seeded with a pair, as if written by an earlier process
    pub fn with_tokens(tokens: Tokens) -> Self {
        Self {
            slot: Mutex::new(Some(tokens)),
        }
    }
}

impl CredentialStore for MemoryStore {
    fn load(&self) -> Result<Option<Tokens>> {
        let slot = self.slot.lock().map_err(|_| anyhow!("credential slot poisoned"))?;
        Ok(slot.clone().filter(Tokens::is_complete))
    }

    fn save(&self, tokens: &Tokens) -> Result<()> {
        let mut slot = self.slot.lock().map_err(|_| anyhow!("credential slot poisoned"))?;
        *slot = Some(tokens.clone());
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        let mut slot = self.slot.lock().map_err(|_| anyhow!("credential slot poisoned"))?;
        *slot = None;
        Ok(())
    }
}
