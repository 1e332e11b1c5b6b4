//! Where the API key comes from.
//!
//! The environment wins; otherwise the key saved earlier with `gpt --keyring`
//! is read from the operating system's credential store (service `gpt`,
//! user `key`).

use crate::error::{Error, Result};

/// Environment variable consulted before the key store.
pub const API_KEY_ENV: &str = "OPENAI_API_KEY";

/// Keyring service the key is saved under.
pub const KEYRING_SERVICE: &str = "gpt";

/// Keyring user the key is saved under.
pub const KEYRING_USER: &str = "key";

/// A place an API key can be saved to and loaded from.
pub trait CredentialStore {
    /// Load the saved key, or `None` if nothing has been saved.
    fn load(&self) -> Result<Option<String>>;

    /// Save `key`, replacing any previous key.
    fn store(&self, key: &str) -> Result<()>;
}

/// A key kept in the platform keyring (Secret Service, Keychain or the
/// Windows credential manager).
pub struct Keyring {
    entry: keyring::Entry,
}

impl Keyring {
    /// The entry for `service` and `user`.
    pub fn new(service: &str, user: &str) -> Result<Self> {
        let entry = keyring::Entry::new(service, user)
            .map_err(|e| Error::credential(format!("keyring: {e}")))?;
        Ok(Self { entry })
    }

    /// The entry `gpt --keyring` writes to.
    pub fn default_entry() -> Result<Self> {
        Self::new(KEYRING_SERVICE, KEYRING_USER)
    }
}

impl CredentialStore for Keyring {
    fn load(&self) -> Result<Option<String>> {
        match self.entry.get_password() {
            Ok(key) => {
                let key = key.trim();
                Ok((!key.is_empty()).then(|| key.to_string()))
            }
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(Error::credential(format!("keyring: {e}"))),
        }
    }

    fn store(&self, key: &str) -> Result<()> {
        self.entry
            .set_password(key)
            .map_err(|e| Error::credential(format!("keyring: {e}")))
    }
}

/// Pick the API key: a non-empty `env_key` first, then `store`.
pub fn resolve_api_key(env_key: Option<String>, store: &dyn CredentialStore) -> Result<String> {
    if let Some(key) = env_key.filter(|key| !key.trim().is_empty()) {
        tracing::debug!("using API key from {API_KEY_ENV}");
        return Ok(key);
    }
    match store.load()? {
        Some(key) => {
            tracing::debug!("using API key from key store");
            Ok(key)
        }
        None => Err(Error::credential(format!(
            "{API_KEY_ENV} is not set and no key has been stored (use --keyring KEY)"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    #[derive(Default)]
    struct MemoryStore {
        key: RefCell<Option<String>>,
    }

    impl CredentialStore for MemoryStore {
        fn load(&self) -> Result<Option<String>> {
            Ok(self.key.borrow().clone())
        }

        fn store(&self, key: &str) -> Result<()> {
            *self.key.borrow_mut() = Some(key.to_string());
            Ok(())
        }
    }

    #[test]
    fn environment_wins() {
        let store = MemoryStore::default();
        store.store("stored").unwrap();
        let key = resolve_api_key(Some("from-env".to_string()), &store).unwrap();
        assert_eq!(key, "from-env");
    }

    #[test]
    fn blank_environment_falls_back_to_store() {
        let store = MemoryStore::default();
        store.store("stored").unwrap();
        let key = resolve_api_key(Some("  ".to_string()), &store).unwrap();
        assert_eq!(key, "stored");
    }

    #[test]
    fn missing_everywhere_is_credential_error() {
        let err = resolve_api_key(None, &MemoryStore::default()).unwrap_err();
        assert!(err.is_credential());
        assert!(err.is_usage());
    }

    #[test]
    fn keyring_round_trip() {
        keyring::set_default_credential_builder(keyring::mock::default_credential_builder());
        let store = Keyring::default_entry().unwrap();
        assert_eq!(store.load().unwrap(), None);

        store.store("sk-one").unwrap();
        assert_eq!(store.load().unwrap(), Some("sk-one".to_string()));

        store.store("sk-two").unwrap();
        assert_eq!(store.load().unwrap(), Some("sk-two".to_string()));
        assert_eq!(
            resolve_api_key(None, &store).unwrap(),
            "sk-two".to_string()
        );
    }
}
