//! API credential storage
//!
//! The credential is read from, and saved to, the config file. No other source
//! is consulted. The generation client only sees it through
//! [`CredentialProvider`], so tests can hand it a fixed key.

use std::path::PathBuf;
use std::sync::RwLock;
use anyhow::{Result, anyhow};
use tracing::info;

use crate::config::Config;

/// Value shipped in sample configs; never a real key.
pub const PLACEHOLDER_KEY: &str = "YOUR_API_KEY_HERE";

pub trait CredentialProvider: Send + Sync {
    /// The current usable credential, if any
    fn credential(&self) -> Option<String>;
}

pub fn is_usable_credential(value: &str) -> bool {
    let trimmed = value.trim();
    !trimmed.is_empty() && trimmed != PLACEHOLDER_KEY
}

pub struct CredentialStore {
    value: RwLock<Option<String>>,
    config_path: Option<PathBuf>,
}

impl CredentialStore {
    /// Load the stored key from the config file at `config_path`
    pub fn load(config_path: PathBuf) -> Result<Self> {
        let config = Config::load_from(&config_path)?;
        Ok(Self {
            value: RwLock::new(config.api_key),
            config_path: Some(config_path),
        })
    }

    /// A store that never touches disk
    pub fn in_memory(initial: Option<String>) -> Self {
        Self {
            value: RwLock::new(initial),
            config_path: None,
        }
    }

    pub fn is_set(&self) -> bool {
        self.get().is_some()
    }

    pub fn get(&self) -> Option<String> {
        let guard = self.value.read().ok()?;
        guard
            .as_deref()
            .filter(|v| is_usable_credential(v))
            .map(|v| v.trim().to_string())
    }

    /// Overwrite the stored key. Blank input is rejected.
    pub fn save(&self, value: &str) -> Result<()> {
        let value = value.trim();
        if value.is_empty() {
            return Err(anyhow!("API key cannot be blank"));
        }

        if let Some(path) = &self.config_path {
            let mut config = Config::load_from(path).unwrap_or_default();
            config.api_key = Some(value.to_string());
            config.save_to(path)?;
        }

        let mut guard = self
            .value
            .write()
            .map_err(|_| anyhow!("credential lock poisoned"))?;
        *guard = Some(value.to_string());
        info!(persisted = self.config_path.is_some(), "credential saved");
        Ok(())
    }
}

impl CredentialProvider for CredentialStore {
    fn credential(&self) -> Option<String> {
        self.get()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_set_false_for_absent_empty_and_placeholder() {
        assert!(!CredentialStore::in_memory(None).is_set());
        assert!(!CredentialStore::in_memory(Some(String::new())).is_set());
        assert!(!CredentialStore::in_memory(Some("   ".to_string())).is_set());
        assert!(!CredentialStore::in_memory(Some(PLACEHOLDER_KEY.to_string())).is_set());
        assert!(CredentialStore::in_memory(Some("AIza-real".to_string())).is_set());
    }

    #[test]
    fn test_save_overwrites_and_rejects_blank() {
        let store = CredentialStore::in_memory(Some("old".to_string()));
        store.save("  new-key  ").unwrap();
        assert_eq!(store.get().as_deref(), Some("new-key"));

        assert!(store.save("   ").is_err());
        assert_eq!(store.get().as_deref(), Some("new-key"));
    }

    #[test]
    fn test_save_persists_to_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        Config {
            api_key: None,
            model: Some("gemini-2.0-flash".to_string()),
        }
        .save_to(&path)
        .unwrap();

        let store = CredentialStore::load(path.clone()).unwrap();
        assert!(!store.is_set());
        store.save("AIza-persisted").unwrap();

        let reloaded = CredentialStore::load(path.clone()).unwrap();
        assert_eq!(reloaded.get().as_deref(), Some("AIza-persisted"));
        // Other settings survive the rewrite
        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.model.as_deref(), Some("gemini-2.0-flash"));
    }
}
