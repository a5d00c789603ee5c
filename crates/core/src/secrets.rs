//! Secret storage for OAuth tokens.

use std::collections::HashMap;
use std::sync::RwLock;

use crate::errors::{Error, Result};

pub const ACCESS_TOKEN_KEY: &str = "salesforce_access_token";
pub const REFRESH_TOKEN_KEY: &str = "salesforce_refresh_token";
pub const INSTANCE_URL_KEY: &str = "salesforce_instance_url";

/// Key/value store for credentials (keyring, vault, encrypted settings...).
pub trait SecretStore: Send + Sync {
    fn get_secret(&self, key: &str) -> Result<Option<String>>;
    fn set_secret(&self, key: &str, value: &str) -> Result<()>;
    fn delete_secret(&self, key: &str) -> Result<()>;
}

/// Process-local secret store.
#[derive(Debug, Default)]
pub struct InMemorySecretStore {
    values: RwLock<HashMap<String, String>>,
}

impl InMemorySecretStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_secret(self, key: &str, value: &str) -> Self {
        if let Ok(mut values) = self.values.write() {
            values.insert(key.to_string(), value.to_string());
        }
        self
    }
}

impl SecretStore for InMemorySecretStore {
    fn get_secret(&self, key: &str) -> Result<Option<String>> {
        let values = self
            .values
            .read()
            .map_err(|_| Error::Storage("Secret store lock is poisoned".to_string()))?;
        Ok(values.get(key).cloned())
    }

    fn set_secret(&self, key: &str, value: &str) -> Result<()> {
        let mut values = self
            .values
            .write()
            .map_err(|_| Error::Storage("Secret store lock is poisoned".to_string()))?;
        values.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn delete_secret(&self, key: &str) -> Result<()> {
        let mut values = self
            .values
            .write()
            .map_err(|_| Error::Storage("Secret store lock is poisoned".to_string()))?;
        values.remove(key);
        Ok(())
    }
}
