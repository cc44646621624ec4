use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use super::CredentialStore;
use crate::models::Tokens;

/// Credential file name in cache directory
const CREDENTIALS_FILE: &str = "credentials.json";

pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path(&self) -> PathBuf {
        self.dir.join(CREDENTIALS_FILE)
    }

    fn temp_path(&self) -> PathBuf {
        self.dir.join(format!("{}.tmp", CREDENTIALS_FILE))
    }

    #[cfg(unix)]
    fn restrict_permissions(path: &Path) -> Result<()> {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))
            .context("Failed to restrict credential file permissions")
    }

    #[cfg(not(unix))]
    fn restrict_permissions(_path: &Path) -> Result<()> {
        Ok(())
    }
}

impl CredentialStore for FileStore {
    fn load(&self) -> Result<Option<Tokens>> {
        let path = self.path();
        if !path.exists() {
            return Ok(None);
        }
        let contents = std::fs::read_to_string(&path)
            .context("Failed to read credential file")?;
        let tokens: Tokens = serde_json::from_str(&contents)
            .context("Failed to parse credential file")?;
        Ok(tokens.is_complete().then_some(tokens))
    }

    fn save(&self, tokens: &Tokens) -> Result<()> {
        std::fs::create_dir_all(&self.dir)
            .context("Failed to create credential directory")?;

        // Write aside and rename so a crash never leaves half a pair behind
        let temp = self.temp_path();
        let contents = serde_json::to_string_pretty(tokens)?;
        std::fs::write(&temp, contents).context("Failed to write credential file")?;
        Self::restrict_permissions(&temp)?;
        std::fs::rename(&temp, self.path()).context("Failed to replace credential file")?;
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        let path = self.path();
        if path.exists() {
            std::fs::remove_file(path).context("Failed to remove credential file")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = FileStore::new(dir.path());
        assert!(store.load().expect("load").is_none());
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = FileStore::new(dir.path().join("nested"));
        let tokens = Tokens::new("access-1", "refresh-1");

        store.save(&tokens).expect("save");
        assert_eq!(store.load().expect("load"), Some(tokens));
        assert!(!store.temp_path().exists());

        // A second store over the same directory sees the same pair
        let reopened = FileStore::new(dir.path().join("nested"));
        assert_eq!(reopened.load().expect("load").map(|t| t.token), Some("access-1".to_string()));
    }

    #[test]
    fn test_clear_is_idempotent() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = FileStore::new(dir.path());
        store.save(&Tokens::new("a", "r")).expect("save");

        store.clear().expect("first clear");
        store.clear().expect("second clear");
        assert!(store.load().expect("load").is_none());
    }

    #[test]
    fn test_corrupt_file_is_an_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = FileStore::new(dir.path());
        std::fs::write(store.path(), "{not json").expect("write");
        assert!(store.load().is_err());
    }

    #[test]
    fn test_half_empty_pair_loads_as_nothing() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = FileStore::new(dir.path());
        std::fs::write(store.path(), r#"{"token":"a","refresh_token":""}"#).expect("write");
        assert!(store.load().expect("load").is_none());
    }
}
